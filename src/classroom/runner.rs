//! `attendex classroom`: run a live session from the command line.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use yansi::Paint;

use super::{ClassroomPoller, DirectoryFrames, FaceApiClient, StopReason};
use crate::attendance::{AttendanceStatus, LiveSession, RosterEntry};
use crate::cli::ClassroomArgs;

/// Read a JSON array of student names.
pub async fn load_roster(path: &Path) -> Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read roster file {}", path.display()))?;
    let names: Vec<String> = serde_json::from_str(&text)
        .with_context(|| format!("Roster file {} is not a JSON array of names", path.display()))?;
    Ok(names
        .into_iter()
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .collect())
}

pub async fn run(args: ClassroomArgs) -> Result<()> {
    let names = match &args.roster {
        Some(path) => load_roster(path).await?,
        None => Vec::new(),
    };
    let session = LiveSession::from_names(names, Utc::now());

    let frames = DirectoryFrames::open(&args.frames, !args.once)
        .await
        .context("Failed to open frame directory")?;
    info!(frames = frames.len(), dir = %args.frames.display(), "frame source ready");

    let client = FaceApiClient::new(args.api_url.clone(), args.timeout)
        .context("Failed to create face API client")?;
    match client.status().await {
        Ok(status) => info!(
            known_faces = status.total_reid_database,
            detector = %status.face_detector,
            "connected to face API"
        ),
        Err(e) => warn!(error = %e, "face API status check failed, polling anyway"),
    }

    let mut poller = ClassroomPoller::new(client, Box::new(frames), session)
        .with_interval(args.interval)
        .with_tracking(!args.no_tracking);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let reason = poller.run(cancel).await;
    print_summary(&poller, reason);
    Ok(())
}

fn status_label(status: AttendanceStatus) -> String {
    let label = format!("{:<8}", status.as_str());
    match status {
        AttendanceStatus::Present => label.green().to_string(),
        AttendanceStatus::Absent => label.red().to_string(),
        AttendanceStatus::Late => label.yellow().to_string(),
        AttendanceStatus::Excused => label.dim().to_string(),
    }
}

fn roster_line(entry: &RosterEntry) -> String {
    let last_seen = entry
        .last_seen
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_owned());
    format!(
        "{:>3}  {:<28} {} {:>3}%  {}",
        entry.id,
        entry.name,
        status_label(entry.status),
        entry.confidence,
        last_seen
    )
}

fn print_summary(poller: &ClassroomPoller, reason: StopReason) {
    let session = poller.session();
    let stats = session.stats();
    let stopped = match reason {
        StopReason::Cancelled => "interrupted",
        StopReason::Exhausted => "all frames sent",
    };

    println!();
    println!(
        "{} ({stopped}, {} frames, {} detections, {} min)",
        "Classroom session".bold(),
        poller.frames_sent(),
        stats.total_detections,
        stats.elapsed_minutes(Utc::now())
    );
    for entry in session.roster() {
        println!("{}", roster_line(entry));
    }
    println!("Attendance rate: {}%", session.attendance_rate().bold());

    let unknown = poller.unknown_faces();
    if !unknown.is_empty() {
        let ids: Vec<String> = unknown.iter().map(|f| f.reid_num.to_string()).collect();
        println!(
            "{} unidentified face(s), ReIDs {}",
            unknown.len().yellow(),
            ids.join(", ")
        );
    }
    if let Some(error) = poller.last_error() {
        println!("{} {error}", "Last error:".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roster_file_is_trimmed() {
        let dir = std::env::temp_dir().join(format!("attendex-roster-{}", ulid::Ulid::new()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("roster.json");
        tokio::fs::write(&path, r#"[" Ana Ruiz ", "", "Ben Ito"]"#)
            .await
            .unwrap();

        let names = load_roster(&path).await.unwrap();
        assert_eq!(names, vec!["Ana Ruiz", "Ben Ito"]);

        tokio::fs::write(&path, r#"{"names": []}"#).await.unwrap();
        assert!(load_roster(&path).await.is_err());

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[test]
    fn roster_lines_show_dash_when_never_seen() {
        yansi::disable();
        let line = roster_line(&RosterEntry::absent(3, "Ana Ruiz"));
        assert!(line.contains("Ana Ruiz"));
        assert!(line.contains("absent"));
        assert!(line.trim_end().ends_with('-'));
    }
}
