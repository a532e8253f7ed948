//! Live-classroom client: polls the analysis service and keeps a roster.

pub mod client;
pub mod frames;
pub mod poller;
pub mod runner;

use std::path::PathBuf;

pub use client::FaceApiClient;
pub use frames::{DirectoryFrames, Frame, FrameSource};
pub use poller::{ClassroomPoller, StopReason};

#[derive(Debug, thiserror::Error)]
pub enum ClassroomError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("no JPEG or PNG frames in {}", .0.display())]
    NoFrames(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
