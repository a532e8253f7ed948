//! The ReID gallery: every face the service has ever enrolled.
//!
//! Identities are never deleted. Dismissing or merging a face renames it with
//! a reserved prefix so that it stops showing up as unknown (and, for merges,
//! stops being matched) while its number stays allocated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::FaceError;
use super::embedding::Embedding;

pub const UNKNOWN_PREFIX: &str = "Unknown_";
pub const DISMISSED_PREFIX: &str = "Dismissed_";
pub const MERGED_PREFIX: &str = "Merged_to_";

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.4;

/// How the registry treats a name. Clients only ever see [`DetectionStatus`].
///
/// [`DetectionStatus`]: super::engine::DetectionStatus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceStatus {
    Recognized,
    Unknown,
    Dismissed,
    Merged,
}

impl FaceStatus {
    pub fn of(name: &str) -> Self {
        if name.starts_with(UNKNOWN_PREFIX) {
            FaceStatus::Unknown
        } else if name.starts_with(DISMISSED_PREFIX) {
            FaceStatus::Dismissed
        } else if name.starts_with(MERGED_PREFIX) {
            FaceStatus::Merged
        } else {
            FaceStatus::Recognized
        }
    }
}

pub fn dismissed_name(reid_num: u32) -> String {
    format!("{DISMISSED_PREFIX}{reid_num}")
}

pub fn merged_name(target: u32) -> String {
    format!("{MERGED_PREFIX}{target}")
}

/// `true` for names the registry generates itself rather than a real person's.
pub fn is_generated_name(name: &str) -> bool {
    FaceStatus::of(name) != FaceStatus::Recognized
}

#[derive(Debug, Clone)]
pub struct FaceIdentity {
    pub reid_num: u32,
    pub name: String,
    pub embedding: Embedding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FaceSummary {
    pub reid_num: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct DuplicatePair {
    pub reid1: u32,
    pub name1: String,
    pub reid2: u32,
    pub name2: String,
    pub similarity: f32,
}

#[derive(Debug)]
pub struct FaceRegistry {
    threshold: f32,
    identities: BTreeMap<u32, FaceIdentity>,
    counter: u32,
}

impl FaceRegistry {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            identities: BTreeMap::new(),
            counter: 0,
        }
    }

    /// Rebuild from persisted rows. Numbering resumes after the highest stored ReID.
    pub fn from_identities(threshold: f32, rows: impl IntoIterator<Item = FaceIdentity>) -> Self {
        let identities: BTreeMap<u32, FaceIdentity> =
            rows.into_iter().map(|f| (f.reid_num, f)).collect();
        let counter = identities.keys().next_back().copied().unwrap_or(0);
        Self {
            threshold,
            identities,
            counter,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn get(&self, reid_num: u32) -> Option<&FaceIdentity> {
        self.identities.get(&reid_num)
    }

    pub fn name_of(&self, reid_num: u32) -> Option<&str> {
        self.identities.get(&reid_num).map(|f| f.name.as_str())
    }

    /// Allocate the next ReID number. Numbers are never reused.
    pub fn next_reid(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    /// Best-matching identity whose similarity is strictly above the threshold.
    ///
    /// Merged identities are excluded; their embedding lives on in the target.
    pub fn find_match(&self, embedding: &Embedding) -> Option<(u32, f32)> {
        self.identities
            .values()
            .filter(|f| FaceStatus::of(&f.name) != FaceStatus::Merged)
            .map(|f| (f.reid_num, f.embedding.similarity(embedding)))
            .filter(|&(_, sim)| sim > self.threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Enrol a face nobody has seen before under a fresh `Unknown_{n}` name.
    pub fn enroll_unknown(&mut self, embedding: Embedding) -> FaceIdentity {
        let reid_num = self.next_reid();
        let identity = FaceIdentity {
            reid_num,
            name: format!("{UNKNOWN_PREFIX}{reid_num}"),
            embedding,
        };
        self.identities.insert(reid_num, identity.clone());
        identity
    }

    /// Insert an identity loaded from elsewhere, keeping the counter ahead of it.
    pub fn insert(&mut self, identity: FaceIdentity) {
        self.counter = self.counter.max(identity.reid_num);
        self.identities.insert(identity.reid_num, identity);
    }

    /// Rename an identity. Returns the trimmed name that was stored.
    pub fn rename(&mut self, reid_num: u32, new_name: &str) -> Result<String, FaceError> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(FaceError::EmptyName);
        }
        let identity = self
            .identities
            .get_mut(&reid_num)
            .ok_or(FaceError::NotFound(reid_num))?;
        identity.name = trimmed.to_owned();
        Ok(identity.name.clone())
    }

    /// Check a merge without applying it. Returns the target's name.
    pub fn check_merge(&self, source: u32, target: u32) -> Result<String, FaceError> {
        if source == target {
            return Err(FaceError::SelfMerge);
        }
        if !self.identities.contains_key(&source) {
            return Err(FaceError::MergeSourceMissing(source));
        }
        self.name_of(target)
            .map(str::to_owned)
            .ok_or(FaceError::MergeTargetMissing(target))
    }

    /// Fold `source` into `target`. Returns the target's name.
    pub fn merge(&mut self, source: u32, target: u32) -> Result<String, FaceError> {
        let target_name = self.check_merge(source, target)?;
        self.rename(source, &merged_name(target))?;
        Ok(target_name)
    }

    pub fn all_faces(&self) -> Vec<FaceSummary> {
        self.identities
            .values()
            .map(|f| FaceSummary {
                reid_num: f.reid_num,
                name: f.name.clone(),
            })
            .collect()
    }

    pub fn unknown_faces(&self) -> Vec<FaceSummary> {
        self.faces_with_status(|s| s == FaceStatus::Unknown)
    }

    /// Identities that carry a real person's name.
    pub fn roster(&self) -> Vec<FaceSummary> {
        self.faces_with_status(|s| s == FaceStatus::Recognized)
    }

    fn faces_with_status(&self, keep: impl Fn(FaceStatus) -> bool) -> Vec<FaceSummary> {
        self.identities
            .values()
            .filter(|f| keep(FaceStatus::of(&f.name)))
            .map(|f| FaceSummary {
                reid_num: f.reid_num,
                name: f.name.clone(),
            })
            .collect()
    }

    /// Pairs of live identities that look like the same person.
    ///
    /// Defaults to a threshold slightly stricter than the matching one.
    /// Sorted by similarity, most similar first.
    pub fn find_potential_duplicates(&self, threshold: Option<f32>) -> Vec<DuplicatePair> {
        let threshold = threshold.unwrap_or(self.threshold + 0.1);
        let live: Vec<&FaceIdentity> = self
            .identities
            .values()
            .filter(|f| FaceStatus::of(&f.name) != FaceStatus::Merged)
            .collect();

        let mut pairs = Vec::new();
        for (i, a) in live.iter().enumerate() {
            for b in &live[i + 1..] {
                let similarity = a.embedding.similarity(&b.embedding);
                if similarity > threshold {
                    pairs.push(DuplicatePair {
                        reid1: a.reid_num,
                        name1: a.name.clone(),
                        reid2: b.reid_num,
                        name2: b.name.clone(),
                        similarity,
                    });
                }
            }
        }
        pairs.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    fn identity(reid_num: u32, name: &str, values: &[f32]) -> FaceIdentity {
        FaceIdentity {
            reid_num,
            name: name.to_owned(),
            embedding: emb(values),
        }
    }

    #[test]
    fn numbering_resumes_after_highest_stored_reid() {
        let mut registry = FaceRegistry::from_identities(
            0.4,
            vec![
                identity(3, "Adil Sharma", &[1.0, 0.0]),
                identity(9, "Unknown_9", &[0.0, 1.0]),
            ],
        );
        assert_eq!(registry.next_reid(), 10);
        assert_eq!(registry.next_reid(), 11);
    }

    #[test]
    fn match_requires_similarity_above_threshold() {
        let registry =
            FaceRegistry::from_identities(0.4, vec![identity(1, "Adil Sharma", &[1.0, 0.0])]);
        let (reid, sim) = registry.find_match(&emb(&[0.9, 0.1])).unwrap();
        assert_eq!(reid, 1);
        assert!(sim > 0.9);
        assert!(registry.find_match(&emb(&[0.0, 1.0])).is_none());
    }

    #[test]
    fn best_match_wins() {
        let registry = FaceRegistry::from_identities(
            0.4,
            vec![
                identity(1, "Adil Sharma", &[1.0, 0.2]),
                identity(2, "Bhushan Kumar", &[1.0, 0.0]),
            ],
        );
        assert_eq!(registry.find_match(&emb(&[1.0, 0.01])).unwrap().0, 2);
    }

    #[test]
    fn unknown_enrollment_uses_generated_name() {
        let mut registry = FaceRegistry::new(0.4);
        let face = registry.enroll_unknown(emb(&[1.0, 0.0]));
        assert_eq!(face.reid_num, 1);
        assert_eq!(face.name, "Unknown_1");
        assert_eq!(registry.unknown_faces().len(), 1);
        assert!(registry.roster().is_empty());
    }

    #[test]
    fn rename_rejects_blank_and_missing() {
        let mut registry = FaceRegistry::new(0.4);
        registry.enroll_unknown(emb(&[1.0]));
        assert!(matches!(registry.rename(1, "   "), Err(FaceError::EmptyName)));
        assert!(matches!(registry.rename(5, "X"), Err(FaceError::NotFound(5))));
        assert_eq!(registry.rename(1, "  Mohan Yadav ").unwrap(), "Mohan Yadav");
        assert_eq!(registry.roster()[0].name, "Mohan Yadav");
    }

    #[test]
    fn merge_validates_and_hides_source_from_matching() {
        let mut registry = FaceRegistry::from_identities(
            0.4,
            vec![
                identity(1, "Adil Sharma", &[1.0, 0.0]),
                identity(2, "Unknown_2", &[0.99, 0.05]),
            ],
        );
        assert!(matches!(registry.merge(1, 1), Err(FaceError::SelfMerge)));
        assert!(matches!(
            registry.merge(7, 1),
            Err(FaceError::MergeSourceMissing(7))
        ));
        assert!(matches!(
            registry.merge(2, 8),
            Err(FaceError::MergeTargetMissing(8))
        ));

        assert_eq!(registry.merge(2, 1).unwrap(), "Adil Sharma");
        assert_eq!(registry.name_of(2), Some("Merged_to_1"));
        assert_eq!(registry.find_match(&emb(&[0.99, 0.05])).unwrap().0, 1);
        assert!(registry.unknown_faces().is_empty());
        assert_eq!(registry.roster().len(), 1);
    }

    #[test]
    fn dismissed_faces_leave_both_lists() {
        let mut registry = FaceRegistry::new(0.4);
        registry.enroll_unknown(emb(&[1.0, 0.0]));
        registry.rename(1, "Dismissed_1").unwrap();
        assert!(registry.unknown_faces().is_empty());
        assert!(registry.roster().is_empty());
        assert_eq!(registry.all_faces().len(), 1);
    }

    #[test]
    fn duplicates_sorted_most_similar_first() {
        let registry = FaceRegistry::from_identities(
            0.4,
            vec![
                identity(1, "A", &[1.0, 0.0, 0.0]),
                identity(2, "B", &[0.95, 0.3, 0.0]),
                identity(3, "C", &[1.0, 0.05, 0.0]),
                identity(4, "D", &[0.0, 0.0, 1.0]),
            ],
        );
        let pairs = registry.find_potential_duplicates(None);
        assert!(!pairs.is_empty());
        assert_eq!((pairs[0].reid1, pairs[0].reid2), (1, 3));
        assert!(pairs.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert!(pairs.iter().all(|p| p.reid1 != 4 && p.reid2 != 4));
    }

    #[test]
    fn status_classification() {
        assert_eq!(FaceStatus::of("Unknown_4"), FaceStatus::Unknown);
        assert_eq!(FaceStatus::of("Dismissed_4"), FaceStatus::Dismissed);
        assert_eq!(FaceStatus::of("Merged_to_2"), FaceStatus::Merged);
        assert_eq!(FaceStatus::of("Adil Sharma"), FaceStatus::Recognized);
        assert!(is_generated_name("Unknown_1"));
        assert!(!is_generated_name("Adil Sharma"));
    }
}
