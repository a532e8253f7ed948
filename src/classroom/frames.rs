//! Frame sources for the classroom poller.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::ClassroomError;

#[derive(Debug, Clone)]
pub struct Frame {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait FrameSource: Send {
    /// The next frame, or `None` once the source is exhausted.
    async fn next_frame(&mut self) -> Result<Option<Frame>, ClassroomError>;
}

/// JPEG and PNG files from a directory, in file-name order.
pub struct DirectoryFrames {
    files: Vec<PathBuf>,
    index: usize,
    cycle: bool,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg" | "png"))
}

impl DirectoryFrames {
    /// List the images in `dir`. With `cycle`, the source restarts from the
    /// first file instead of ending.
    pub async fn open(dir: &Path, cycle: bool) -> Result<Self, ClassroomError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_image(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(ClassroomError::NoFrames(dir.to_path_buf()));
        }
        files.sort();
        debug!(dir = %dir.display(), frames = files.len(), "frame directory opened");
        Ok(Self {
            files,
            index: 0,
            cycle,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[async_trait]
impl FrameSource for DirectoryFrames {
    async fn next_frame(&mut self) -> Result<Option<Frame>, ClassroomError> {
        if self.index >= self.files.len() {
            if !self.cycle {
                return Ok(None);
            }
            self.index = 0;
        }
        let path = &self.files[self.index];
        self.index += 1;
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Some(Frame { name, bytes }))
    }
}
