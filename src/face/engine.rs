//! Frame analysis: detection, tracking, identification and enrolment.
//!
//! Frames are processed strictly one at a time. The whole pipeline runs under
//! a single async mutex, so the tracker always sees frames in arrival order
//! and two concurrent unknown faces can never be given the same ReID.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use ts_rs::TS;

use super::FaceError;
use super::geometry::BBox;
use super::image;
use super::inference::FaceDetector;
use super::registry::{
    DuplicatePair, FaceIdentity, FaceRegistry, FaceStatus, FaceSummary, dismissed_name,
    merged_name,
};
use super::store::{FaceImages, FaceStore};
use super::tracker::IouTracker;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub similarity_threshold: f32,
    pub iou_threshold: f32,
    pub max_age: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: super::registry::DEFAULT_SIMILARITY_THRESHOLD,
            iou_threshold: super::tracker::DEFAULT_IOU_THRESHOLD,
            max_age: super::tracker::DEFAULT_MAX_AGE,
        }
    }
}

/// Per-face status reported to clients: anything not `Unknown_*` counts as
/// recognised, including dismissed and merged identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DetectionStatus {
    Recognized,
    Unknown,
}

impl DetectionStatus {
    pub fn of(name: &str) -> Self {
        match FaceStatus::of(name) {
            FaceStatus::Unknown => DetectionStatus::Unknown,
            _ => DetectionStatus::Recognized,
        }
    }
}

/// One identified face in an analysed frame.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FaceInfo {
    /// Track id when tracking is enabled, detection index otherwise.
    #[ts(type = "number")]
    pub detection_id: u64,
    pub name: String,
    pub reid_num: u32,
    pub bbox: BBox,
    pub confidence: f32,
    pub status: DetectionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FrameAnalysis {
    /// The analysed frame, base64-encoded.
    #[serde(default)]
    pub image: Option<String>,
    pub head_count: usize,
    /// Distinct names in first-seen order.
    pub names: Vec<String>,
    pub face_info: Vec<FaceInfo>,
    pub tracking_enabled: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EngineStatus {
    pub known_faces_in_session: usize,
    pub total_reid_database: usize,
    pub similarity_threshold: f32,
    pub face_storage_path: String,
    pub face_detector: String,
    #[ts(type = "number")]
    pub frames_processed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UnknownFace {
    pub reid_num: u32,
    pub name: String,
    pub has_image: bool,
}

struct EngineInner {
    registry: FaceRegistry,
    tracker: IouTracker,
    frame_count: u64,
}

pub struct FaceEngine {
    inner: Mutex<EngineInner>,
    config: EngineConfig,
    store: Arc<dyn FaceStore>,
    detector: Arc<dyn FaceDetector>,
    images: FaceImages,
}

impl FaceEngine {
    /// Build an engine, loading every stored identity into memory.
    pub async fn load(
        config: EngineConfig,
        store: Arc<dyn FaceStore>,
        detector: Arc<dyn FaceDetector>,
        images: FaceImages,
    ) -> Result<Self, FaceError> {
        let rows = store.load_all().await.map_err(FaceError::Store)?;
        let registry = FaceRegistry::from_identities(config.similarity_threshold, rows);
        images.ensure_dir().await?;
        info!(
            identities = registry.len(),
            threshold = config.similarity_threshold,
            detector = %detector.describe(),
            "face registry loaded"
        );
        Ok(Self {
            inner: Mutex::new(EngineInner {
                registry,
                tracker: IouTracker::new(config.iou_threshold, config.max_age),
                frame_count: 0,
            }),
            config,
            store,
            detector,
            images,
        })
    }

    pub fn images(&self) -> &FaceImages {
        &self.images
    }

    /// Detect, track and identify every face in `frame`.
    ///
    /// Faces that match no stored identity are enrolled as `Unknown_{n}` and
    /// their crop is saved. With tracking enabled, a track is bound to its
    /// identity on first sight and keeps it for as long as the track lives.
    #[instrument(skip_all, fields(bytes = frame.len(), use_tracking = use_tracking))]
    pub async fn analyze(&self, frame: &[u8], use_tracking: bool) -> Result<FrameAnalysis, FaceError> {
        image::validate_frame(frame)?;

        let mut inner = self.inner.lock().await;
        let detections = self.detector.detect(frame).await?;
        let boxes: Vec<BBox> = detections.iter().map(|d| d.bbox).collect();
        let assignments = use_tracking.then(|| inner.tracker.update(&boxes));

        let mut face_info = Vec::with_capacity(detections.len());
        let mut names: Vec<String> = Vec::new();

        for (index, detection) in detections.iter().enumerate() {
            let Some(embedding) = detection.embedding.as_ref() else {
                debug!(bbox = ?detection.bbox, "skipping detection without embedding");
                continue;
            };
            let assignment = assignments.as_ref().map(|a| &a[index]);

            let locked = assignment.and_then(|a| a.reid.zip(a.name.clone()));
            let (reid_num, name) = match locked {
                Some(identity) => identity,
                None => {
                    let (reid_num, name) = match inner.registry.find_match(embedding) {
                        Some((reid_num, similarity)) => {
                            let name = inner
                                .registry
                                .name_of(reid_num)
                                .map(str::to_owned)
                                .unwrap_or_else(|| format!("Unknown_{reid_num}"));
                            debug!(reid_num, similarity, name = %name, "face matched");
                            (reid_num, name)
                        }
                        None => {
                            let identity = inner.registry.enroll_unknown(embedding.clone());
                            self.persist_new_face(&identity, detection.crop.as_deref())
                                .await;
                            (identity.reid_num, identity.name)
                        }
                    };
                    if let Some(a) = assignment {
                        inner.tracker.lock(a.track_id, reid_num, &name);
                    }
                    (reid_num, name)
                }
            };

            if !names.contains(&name) {
                names.push(name.clone());
            }
            face_info.push(FaceInfo {
                detection_id: assignment.map_or(index as u64, |a| a.track_id),
                status: DetectionStatus::of(&name),
                name,
                reid_num,
                bbox: detection.bbox,
                confidence: detection.confidence,
            });
        }

        inner.frame_count += 1;
        let head_count = detections.len();
        Ok(FrameAnalysis {
            image: Some(image::encode(frame)),
            head_count,
            names,
            face_info,
            tracking_enabled: use_tracking,
            message: format!("Successfully analyzed frame with {head_count} faces detected"),
        })
    }

    /// Write a freshly enrolled face through to storage.
    ///
    /// Failures are logged rather than failing the frame: the identity is
    /// already live in memory and the next restart simply forgets it.
    async fn persist_new_face(&self, identity: &FaceIdentity, crop: Option<&[u8]>) {
        info!(reid_num = identity.reid_num, "enrolled new face");
        if let Some(crop) = crop
            && let Err(e) = self.images.save(identity.reid_num, crop).await
        {
            warn!(reid_num = identity.reid_num, error = %e, "failed to save face crop");
        }
        if let Err(e) = self.store.insert(identity).await {
            error!(reid_num = identity.reid_num, error = ?e, "failed to persist face identity");
        }
    }

    /// Rename an identity everywhere: storage, registry and live tracks.
    pub async fn rename(&self, reid_num: u32, new_name: &str) -> Result<String, FaceError> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(FaceError::EmptyName);
        }

        let mut inner = self.inner.lock().await;
        if inner.registry.get(reid_num).is_none() {
            return Err(FaceError::NotFound(reid_num));
        }
        let updated = self
            .store
            .update_name(reid_num, trimmed)
            .await
            .map_err(FaceError::Store)?;
        if !updated {
            warn!(reid_num, "identity missing from storage during rename");
        }
        let name = inner.registry.rename(reid_num, trimmed)?;
        inner.tracker.rename(reid_num, &name);
        info!(reid_num, name = %name, "face renamed");
        Ok(name)
    }

    /// Give an unknown face a student's name.
    pub async fn add_student(&self, reid_num: u32, student_name: &str) -> Result<String, FaceError> {
        self.rename(reid_num, student_name).await
    }

    /// Hide a face from the unknown list without forgetting it.
    pub async fn dismiss(&self, reid_num: u32) -> Result<(), FaceError> {
        self.rename(reid_num, &dismissed_name(reid_num)).await.map(|_| ())
    }

    pub async fn merge(&self, source: u32, target: u32) -> Result<String, FaceError> {
        let mut inner = self.inner.lock().await;
        inner.registry.check_merge(source, target)?;
        let merged = merged_name(target);
        self.store
            .update_name(source, &merged)
            .await
            .map_err(FaceError::Store)?;
        let target_name = inner.registry.merge(source, target)?;
        inner.tracker.rebind(source, target, &target_name);
        info!(source, target, "faces merged");
        Ok(format!("Merged ReID {source} into {target}"))
    }

    /// Forget all live tracks. Identities are untouched.
    pub async fn reset_tracker(&self) {
        let mut inner = self.inner.lock().await;
        inner.tracker.reset();
        inner.frame_count = 0;
        info!("tracker reset");
    }

    pub async fn status(&self) -> EngineStatus {
        let inner = self.inner.lock().await;
        EngineStatus {
            known_faces_in_session: inner.tracker.locked_count(),
            total_reid_database: inner.registry.len(),
            similarity_threshold: self.config.similarity_threshold,
            face_storage_path: self.images.dir().display().to_string(),
            face_detector: self.detector.describe(),
            frames_processed: inner.frame_count,
        }
    }

    pub async fn all_faces(&self) -> Vec<FaceSummary> {
        self.inner.lock().await.registry.all_faces()
    }

    pub async fn roster(&self) -> Vec<FaceSummary> {
        self.inner.lock().await.registry.roster()
    }

    pub async fn unknown_faces(&self) -> Vec<UnknownFace> {
        let faces = self.inner.lock().await.registry.unknown_faces();
        let mut out = Vec::with_capacity(faces.len());
        for face in faces {
            let has_image = self.images.exists(face.reid_num).await;
            out.push(UnknownFace {
                reid_num: face.reid_num,
                name: face.name,
                has_image,
            });
        }
        out
    }

    /// The saved crop for a face, base64-encoded.
    pub async fn face_image(&self, reid_num: u32) -> Result<String, FaceError> {
        self.images
            .load(reid_num)
            .await?
            .map(|bytes| image::encode(&bytes))
            .ok_or(FaceError::ImageNotFound(reid_num))
    }

    pub async fn duplicates(&self, threshold: Option<f32>) -> Vec<DuplicatePair> {
        self.inner
            .lock()
            .await
            .registry
            .find_potential_duplicates(threshold)
    }
}
