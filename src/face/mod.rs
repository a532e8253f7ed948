//! Face recognition: tracking, the ReID gallery, and the analysis engine.

pub mod embedding;
pub mod engine;
pub mod geometry;
pub mod image;
pub mod inference;
pub mod registry;
pub mod store;
pub mod tracker;

pub use engine::{DetectionStatus, EngineConfig, FaceEngine, FaceInfo, FrameAnalysis};
pub use inference::{Detection, FaceDetector, InferenceError, RemoteDetector, UnavailableDetector};
pub use registry::{FaceRegistry, FaceStatus, FaceSummary};
pub use store::{FaceImages, FaceStore, MemoryFaceStore};

#[derive(Debug, thiserror::Error)]
pub enum FaceError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("ReID {0} not found")]
    NotFound(u32),
    #[error("Source and target ReID cannot be the same")]
    SelfMerge,
    #[error("Source ReID {0} not found")]
    MergeSourceMissing(u32),
    #[error("Target ReID {0} not found")]
    MergeTargetMissing(u32),
    #[error("Invalid image file")]
    InvalidImage,
    #[error("Base64 decoding failed.")]
    Base64,
    #[error("Face image not found")]
    ImageNotFound(u32),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("face storage failed")]
    Store(#[source] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
