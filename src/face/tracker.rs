//! Frame-to-frame face tracking by bounding-box overlap.
//!
//! A track survives as long as a detection overlaps it in at least one of the
//! last `max_age` frames. Once a track has been bound to a ReID, later frames
//! reuse that identity instead of querying the registry again.

use std::collections::{BTreeMap, HashSet};

use super::geometry::BBox;

pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;
pub const DEFAULT_MAX_AGE: u32 = 5;

#[derive(Debug, Clone)]
pub struct Track {
    pub bbox: BBox,
    age: u32,
    pub reid: Option<u32>,
    pub name: Option<String>,
}

/// Tracker output for one detection, in detection order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackAssignment {
    pub track_id: u64,
    /// ReID the track was already bound to, if any.
    pub reid: Option<u32>,
    pub name: Option<String>,
}

#[derive(Debug)]
pub struct IouTracker {
    iou_threshold: f32,
    max_age: u32,
    tracks: BTreeMap<u64, Track>,
    next_id: u64,
}

impl Default for IouTracker {
    fn default() -> Self {
        Self::new(DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_AGE)
    }
}

impl IouTracker {
    pub fn new(iou_threshold: f32, max_age: u32) -> Self {
        Self {
            iou_threshold,
            max_age,
            tracks: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Advance one frame.
    ///
    /// Each detection is greedily matched, in order, to the not-yet-matched
    /// track with the highest IoU strictly above the threshold. Unmatched
    /// detections open new tracks; stale tracks are dropped afterwards.
    pub fn update(&mut self, boxes: &[BBox]) -> Vec<TrackAssignment> {
        for track in self.tracks.values_mut() {
            track.age += 1;
        }

        let mut matched: HashSet<u64> = HashSet::new();
        let mut assignments = Vec::with_capacity(boxes.len());

        for bbox in boxes {
            let mut best: Option<(u64, f32)> = None;
            for (&tid, track) in &self.tracks {
                if matched.contains(&tid) {
                    continue;
                }
                let iou = bbox.iou(&track.bbox);
                let floor = best.map_or(self.iou_threshold, |(_, b)| b);
                if iou > floor {
                    best = Some((tid, iou));
                }
            }

            let hit = best.and_then(|(tid, _)| self.tracks.get_mut(&tid).map(|t| (tid, t)));
            let assignment = match hit {
                Some((tid, track)) => {
                    matched.insert(tid);
                    track.bbox = *bbox;
                    track.age = 0;
                    TrackAssignment {
                        track_id: tid,
                        reid: track.reid,
                        name: track.name.clone(),
                    }
                }
                None => {
                    let tid = self.next_id;
                    self.next_id += 1;
                    self.tracks.insert(
                        tid,
                        Track {
                            bbox: *bbox,
                            age: 0,
                            reid: None,
                            name: None,
                        },
                    );
                    matched.insert(tid);
                    TrackAssignment {
                        track_id: tid,
                        reid: None,
                        name: None,
                    }
                }
            };
            assignments.push(assignment);
        }

        let max_age = self.max_age;
        self.tracks.retain(|_, t| t.age < max_age);
        assignments
    }

    /// Bind a track to an identity. Returns `false` if the track is gone.
    pub fn lock(&mut self, track_id: u64, reid: u32, name: &str) -> bool {
        match self.tracks.get_mut(&track_id) {
            Some(track) => {
                track.reid = Some(reid);
                track.name = Some(name.to_owned());
                true
            }
            None => false,
        }
    }

    /// Propagate a registry rename to every track bound to `reid`.
    pub fn rename(&mut self, reid: u32, name: &str) {
        for track in self.tracks.values_mut() {
            if track.reid == Some(reid) {
                track.name = Some(name.to_owned());
            }
        }
    }

    /// Rebind tracks of a merged identity to its merge target.
    pub fn rebind(&mut self, from: u32, to: u32, name: &str) {
        for track in self.tracks.values_mut() {
            if track.reid == Some(from) {
                track.reid = Some(to);
                track.name = Some(name.to_owned());
            }
        }
    }

    pub fn get(&self, track_id: u64) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of live tracks already bound to an identity.
    pub fn locked_count(&self) -> usize {
        self.tracks.values().filter(|t| t.reid.is_some()).count()
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_detections_open_tracks() {
        let mut tracker = IouTracker::default();
        let out = tracker.update(&[BBox::new(0, 0, 10, 10), BBox::new(100, 100, 120, 120)]);
        assert_eq!(out[0].track_id, 0);
        assert_eq!(out[1].track_id, 1);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn overlapping_detection_keeps_track_and_identity() {
        let mut tracker = IouTracker::default();
        let first = tracker.update(&[BBox::new(0, 0, 100, 100)]);
        assert!(tracker.lock(first[0].track_id, 7, "Adil Sharma"));

        let second = tracker.update(&[BBox::new(5, 5, 105, 105)]);
        assert_eq!(second[0].track_id, first[0].track_id);
        assert_eq!(second[0].reid, Some(7));
        assert_eq!(second[0].name.as_deref(), Some("Adil Sharma"));
    }

    #[test]
    fn low_overlap_opens_a_new_track() {
        let mut tracker = IouTracker::default();
        tracker.update(&[BBox::new(0, 0, 100, 100)]);
        let out = tracker.update(&[BBox::new(80, 80, 180, 180)]);
        assert_eq!(out[0].track_id, 1);
    }

    #[test]
    fn a_track_matches_at_most_one_detection() {
        let mut tracker = IouTracker::default();
        tracker.update(&[BBox::new(0, 0, 100, 100)]);
        let out = tracker.update(&[BBox::new(0, 0, 100, 100), BBox::new(2, 2, 102, 102)]);
        assert_eq!(out[0].track_id, 0);
        assert_ne!(out[1].track_id, 0);
    }

    #[test]
    fn stale_tracks_expire_after_max_age() {
        let mut tracker = IouTracker::new(0.3, 2);
        tracker.update(&[BBox::new(0, 0, 10, 10)]);
        tracker.update(&[]);
        assert_eq!(tracker.len(), 1);
        tracker.update(&[]);
        assert!(tracker.is_empty());
    }

    #[test]
    fn rename_and_rebind_follow_registry_changes() {
        let mut tracker = IouTracker::default();
        let out = tracker.update(&[BBox::new(0, 0, 10, 10)]);
        tracker.lock(out[0].track_id, 3, "Unknown_3");
        tracker.rename(3, "Mohan Yadav");
        assert_eq!(tracker.get(0).unwrap().name.as_deref(), Some("Mohan Yadav"));

        tracker.rebind(3, 1, "Bhushan Kumar");
        let track = tracker.get(0).unwrap();
        assert_eq!(track.reid, Some(1));
        assert_eq!(track.name.as_deref(), Some("Bhushan Kumar"));
        assert_eq!(tracker.locked_count(), 1);
    }

    #[test]
    fn reset_restarts_ids() {
        let mut tracker = IouTracker::default();
        tracker.update(&[BBox::new(0, 0, 10, 10)]);
        tracker.reset();
        let out = tracker.update(&[BBox::new(50, 50, 60, 60)]);
        assert_eq!(out[0].track_id, 0);
    }
}
