//! Live-classroom session state fed by successive analysis results.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use ts_rs::TS;

use super::reconcile::{
    Detected, Reconciliation, RosterEntry, attendance_rate, enroll, is_placeholder, reconcile,
};
use crate::face::FrameAnalysis;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SessionStats {
    #[ts(type = "number")]
    pub total_detections: u64,
    pub unique_faces: BTreeSet<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionStats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            total_detections: 0,
            unique_faces: BTreeSet::new(),
            started_at: Some(started_at),
        }
    }

    fn record(&mut self, analysis: &FrameAnalysis) {
        self.total_detections += analysis.head_count as u64;
        self.unique_faces.extend(
            analysis
                .names
                .iter()
                .filter(|n| !is_placeholder(n))
                .cloned(),
        );
    }

    /// Whole minutes since the session started.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        self.started_at
            .map_or(0, |start| (now - start).num_seconds().max(0) / 60)
    }
}

/// Roster plus running stats for one live classroom.
///
/// Results are applied with the sequence number of the request that produced
/// them. A result older than the last applied one is dropped, so when polled
/// requests finish out of order the newest frame always wins.
#[derive(Debug, Clone)]
pub struct LiveSession {
    roster: Vec<RosterEntry>,
    stats: SessionStats,
    last_applied: Option<u64>,
}

impl LiveSession {
    pub fn new(roster: Vec<RosterEntry>, now: DateTime<Utc>) -> Self {
        Self {
            roster,
            stats: SessionStats::new(now),
            last_applied: None,
        }
    }

    /// Build a session from a plain list of student names, all absent.
    pub fn from_names<I, S>(names: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roster = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| RosterEntry::absent(i as u32 + 1, name))
            .collect();
        Self::new(roster, now)
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn attendance_rate(&self) -> u8 {
        attendance_rate(&self.roster)
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }

    /// Apply the result of request `seq`. Returns `None` for a stale result.
    pub fn apply(
        &mut self,
        seq: u64,
        analysis: &FrameAnalysis,
        now: DateTime<Utc>,
    ) -> Option<Reconciliation> {
        if self.last_applied.is_some_and(|last| seq <= last) {
            debug!(seq, last = ?self.last_applied, "dropping stale analysis result");
            return None;
        }
        self.last_applied = Some(seq);
        self.stats.record(analysis);

        let faces: Vec<Detected> = analysis.face_info.iter().map(Detected::from).collect();
        let result = reconcile(&self.roster, &analysis.names, &faces, now);
        if !result.added.is_empty() {
            info!(added = ?result.added, "new students joined the roster");
        }
        self.roster = result.roster.clone();
        Some(result)
    }

    /// Record a student identified by hand.
    pub fn enroll(&mut self, name: &str, now: DateTime<Utc>) -> RosterEntry {
        enroll(&mut self.roster, name, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceStatus;
    use crate::face::{DetectionStatus, FaceInfo};
    use crate::face::geometry::BBox;

    fn analysis(names: &[&str]) -> FrameAnalysis {
        FrameAnalysis {
            image: None,
            head_count: names.len(),
            names: names.iter().map(|s| s.to_string()).collect(),
            face_info: names
                .iter()
                .enumerate()
                .map(|(i, n)| FaceInfo {
                    detection_id: i as u64,
                    name: n.to_string(),
                    reid_num: i as u32 + 1,
                    bbox: BBox::new(0, 0, 10, 10),
                    confidence: 0.9,
                    status: DetectionStatus::of(n),
                })
                .collect(),
            tracking_enabled: true,
            message: String::new(),
        }
    }

    #[test]
    fn last_response_wins() {
        let now = Utc::now();
        let mut session = LiveSession::from_names(["Adil Sharma", "Mohan Yadav"], now);

        assert!(session.apply(2, &analysis(&["Mohan Yadav"]), now).is_some());
        // Request 1 finished after request 2: ignored.
        assert!(session.apply(1, &analysis(&["Adil Sharma"]), now).is_none());
        assert!(session.apply(2, &analysis(&["Adil Sharma"]), now).is_none());

        assert_eq!(session.roster()[0].status, AttendanceStatus::Absent);
        assert_eq!(session.roster()[1].status, AttendanceStatus::Present);
        assert_eq!(session.last_applied(), Some(2));
        assert_eq!(session.attendance_rate(), 50);
    }

    #[test]
    fn stats_exclude_placeholders() {
        let now = Utc::now();
        let mut session = LiveSession::from_names(Vec::<String>::new(), now);
        session.apply(1, &analysis(&["Priya Nair", "Unknown_4"]), now);
        session.apply(2, &analysis(&["Priya Nair"]), now);

        let stats = session.stats();
        assert_eq!(stats.total_detections, 3);
        assert_eq!(stats.unique_faces.len(), 1);
        assert_eq!(session.roster().len(), 1);
        assert_eq!(stats.elapsed_minutes(now + chrono::Duration::seconds(130)), 2);
    }

    #[test]
    fn manual_enrolment_is_present() {
        let now = Utc::now();
        let mut session = LiveSession::from_names(["A"], now);
        let entry = session.enroll("B", now);
        assert_eq!(entry.id, 2);
        assert_eq!(session.attendance_rate(), 50);
    }
}
