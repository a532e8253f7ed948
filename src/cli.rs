use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

/// Campus attendance service: face analysis, live classroom and campus data API.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log formatter to use
    #[arg(long, value_enum, global = true, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP and WebSocket server (default)
    Serve,
    /// Drive a live classroom from a directory of frames
    Classroom(ClassroomArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ClassroomArgs {
    /// Base URL of the face-analysis service
    #[arg(long, default_value = "http://localhost:8000")]
    pub api_url: url::Url,

    /// Directory of JPEG/PNG frames, sent in file-name order
    #[arg(long)]
    pub frames: PathBuf,

    /// JSON file holding an array of expected student names
    #[arg(long)]
    pub roster: Option<PathBuf>,

    /// Delay between frames, e.g. `2s` or `500ms`
    #[arg(long, default_value = "2s", value_parser = crate::config::parse_duration)]
    pub interval: Duration,

    /// Send every frame once and stop instead of cycling
    #[arg(long)]
    pub once: bool,

    /// Analyse frames without the IoU tracker
    #[arg(long)]
    pub no_tracking: bool,

    /// Per-request timeout, e.g. `10s`
    #[arg(long, default_value = "10s", value_parser = crate::config::parse_duration)]
    pub timeout: Duration,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable output
    Pretty,
    /// One JSON object per line
    Json,
}

fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default() {
        let args = Args::parse_from(["attendex"]);
        assert!(args.command.is_none());
    }

    #[test]
    fn classroom_arguments() {
        let args = Args::parse_from([
            "attendex",
            "--tracing",
            "json",
            "classroom",
            "--frames",
            "./frames",
            "--interval",
            "500ms",
            "--once",
        ]);
        assert_eq!(args.tracing, TracingFormat::Json);
        let Some(Command::Classroom(classroom)) = args.command else {
            panic!("expected classroom subcommand");
        };
        assert_eq!(classroom.interval, Duration::from_millis(500));
        assert!(classroom.once);
        assert!(!classroom.no_tracking);
        assert_eq!(classroom.api_url.as_str(), "http://localhost:8000/");
    }
}
