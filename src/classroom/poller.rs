//! Interval polling loop: frame in, reconciled roster out.

use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ClassroomError;
use super::client::FaceApiClient;
use super::frames::FrameSource;
use crate::attendance::LiveSession;
use crate::face::DetectionStatus;
use crate::face::engine::UnknownFace;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    Exhausted,
}

pub struct ClassroomPoller {
    client: FaceApiClient,
    source: Box<dyn FrameSource>,
    session: LiveSession,
    interval: Duration,
    use_tracking: bool,
    seq: u64,
    frames_sent: u64,
    unknown_faces: Vec<UnknownFace>,
    last_error: Option<String>,
}

impl ClassroomPoller {
    pub fn new(client: FaceApiClient, source: Box<dyn FrameSource>, session: LiveSession) -> Self {
        Self {
            client,
            source,
            session,
            interval: DEFAULT_INTERVAL,
            use_tracking: true,
            seq: 0,
            frames_sent: 0,
            unknown_faces: Vec::new(),
            last_error: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_tracking(mut self, use_tracking: bool) -> Self {
        self.use_tracking = use_tracking;
        self
    }

    pub fn session(&self) -> &LiveSession {
        &self.session
    }

    pub fn unknown_faces(&self) -> &[UnknownFace] {
        &self.unknown_faces
    }

    /// The most recent failure, cleared by the next successful analysis.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    fn notice(&mut self, message: String) {
        warn!(notice = %message, "classroom poll failed");
        self.last_error = Some(message);
    }

    /// Poll until cancelled or the frame source runs out.
    pub async fn run(&mut self, cancel: CancellationToken) -> StopReason {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, tracking = self.use_tracking, "classroom polling started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(frames = self.frames_sent, "classroom polling cancelled");
                    return StopReason::Cancelled;
                }
                _ = ticker.tick() => {
                    // An in-flight request is abandoned on cancel.
                    let more = tokio::select! {
                        _ = cancel.cancelled() => None,
                        more = self.poll_once() => Some(more),
                    };
                    match more {
                        None => {
                            info!(frames = self.frames_sent, "classroom polling cancelled mid-request");
                            return StopReason::Cancelled;
                        }
                        Some(false) => {
                            info!(frames = self.frames_sent, "frame source exhausted");
                            return StopReason::Exhausted;
                        }
                        Some(true) => {}
                    }
                }
            }
        }
    }

    /// Send one frame and apply the result. Returns `false` once the source is
    /// exhausted. Failures become a notice and never stop the loop.
    pub async fn poll_once(&mut self) -> bool {
        let frame = match self.source.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return false,
            Err(e) => {
                self.notice(format!("Error reading frame: {e}"));
                return true;
            }
        };

        self.seq += 1;
        let seq = self.seq;
        self.frames_sent += 1;
        debug!(seq, frame = %frame.name, bytes = frame.bytes.len(), "sending frame");

        let analysis = match self.client.analyze_frame(frame.bytes, self.use_tracking).await {
            Ok(analysis) => analysis,
            Err(e) => {
                self.notice(format!("Error analyzing frame: {e}"));
                return true;
            }
        };
        self.last_error = None;

        let has_unknown = analysis
            .face_info
            .iter()
            .any(|f| f.status == DetectionStatus::Unknown);
        if let Some(result) = self.session.apply(seq, &analysis, Utc::now()) {
            info!(
                seq,
                present = result.present.len(),
                absent = result.absent.len(),
                added = result.added.len(),
                rate = self.session.attendance_rate(),
                "roster reconciled"
            );
        }

        if has_unknown {
            self.refresh_unknown_faces().await;
        }
        true
    }

    pub async fn refresh_unknown_faces(&mut self) {
        match self.client.unknown_faces().await {
            Ok(response) => self.unknown_faces = response.unknown_faces,
            Err(e) => self.notice(format!("Error fetching unknown faces: {e}")),
        }
    }

    /// Name an unknown face and put the student on the roster.
    pub async fn add_student(&mut self, reid_num: u32, name: &str) -> Result<(), ClassroomError> {
        self.client.add_student(reid_num, name, None).await?;
        self.session.enroll(name, Utc::now());
        self.refresh_unknown_faces().await;
        Ok(())
    }
}
