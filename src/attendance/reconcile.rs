//! Roster reconciliation against a single analysis result.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::face::FaceInfo;
use crate::face::registry::is_generated_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AttendanceStatus {
    Present,
    Absent,
    /// Manual entry only.
    Late,
    /// Manual entry only.
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            other => Err(format!("unknown attendance status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RosterEntry {
    pub id: u32,
    pub name: String,
    pub status: AttendanceStatus,
    pub last_seen: Option<DateTime<Utc>>,
    /// Percentage, 0 when absent.
    pub confidence: u8,
}

impl RosterEntry {
    /// A roster entry that has not been seen yet.
    pub fn absent(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            status: AttendanceStatus::Absent,
            last_seen: None,
            confidence: 0,
        }
    }
}

/// A recognised face as seen by reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Detected {
    pub name: String,
    /// Detector confidence in `0.0..=1.0`.
    pub confidence: f32,
}

impl From<&FaceInfo> for Detected {
    fn from(face: &FaceInfo) -> Self {
        Self {
            name: face.name.clone(),
            confidence: face.confidence,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export)]
pub struct Reconciliation {
    pub roster: Vec<RosterEntry>,
    pub present: Vec<String>,
    pub absent: Vec<String>,
    pub added: Vec<String>,
}

/// Names that must never be added to a roster.
pub fn is_placeholder(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    lower.is_empty() || lower == "unknown" || lower.contains("processing") || is_generated_name(name)
}

fn percent(confidence: f32) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// Comparison key for roster names: trimmed and lowercased.
fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn max_id(roster: &[RosterEntry]) -> u32 {
    roster.iter().map(|e| e.id).max().unwrap_or(0)
}

/// Mark detected students present and everyone else absent, then append
/// detected names that are not on the roster yet.
///
/// Name comparison ignores case and surrounding whitespace. Absent entries keep `last_seen` so
/// the roster still shows when a student was last in the room.
pub fn reconcile(
    roster: &[RosterEntry],
    detected_names: &[String],
    faces: &[Detected],
    now: DateTime<Utc>,
) -> Reconciliation {
    let detected: HashSet<String> = detected_names.iter().map(|n| name_key(n)).collect();
    let confidence_of = |lower: &str| {
        faces
            .iter()
            .find(|f| name_key(&f.name) == lower)
            .map_or(0, |f| percent(f.confidence))
    };

    let mut out = Reconciliation::default();
    for entry in roster {
        let lower = name_key(&entry.name);
        if detected.contains(&lower) {
            out.present.push(entry.name.clone());
            out.roster.push(RosterEntry {
                status: AttendanceStatus::Present,
                last_seen: Some(now),
                confidence: confidence_of(&lower),
                ..entry.clone()
            });
        } else {
            out.absent.push(entry.name.clone());
            out.roster.push(RosterEntry {
                status: AttendanceStatus::Absent,
                confidence: 0,
                ..entry.clone()
            });
        }
    }

    let mut enrolled: HashSet<String> = roster.iter().map(|e| name_key(&e.name)).collect();
    let mut next_id = max_id(roster);
    for name in detected_names {
        let lower = name_key(name);
        if is_placeholder(name) || enrolled.contains(&lower) {
            continue;
        }
        next_id += 1;
        enrolled.insert(lower.clone());
        let name = name.trim().to_owned();
        out.present.push(name.clone());
        out.added.push(name.clone());
        out.roster.push(RosterEntry {
            id: next_id,
            name,
            status: AttendanceStatus::Present,
            last_seen: Some(now),
            confidence: confidence_of(&lower),
        });
    }

    out
}

/// Append a manually identified student, present with full confidence.
pub fn enroll(roster: &mut Vec<RosterEntry>, name: &str, now: DateTime<Utc>) -> RosterEntry {
    let entry = RosterEntry {
        id: max_id(roster) + 1,
        name: name.trim().to_owned(),
        status: AttendanceStatus::Present,
        last_seen: Some(now),
        confidence: 100,
    };
    roster.push(entry.clone());
    entry
}

/// Percentage of the roster currently present, rounded.
pub fn attendance_rate(roster: &[RosterEntry]) -> u8 {
    if roster.is_empty() {
        return 0;
    }
    let present = roster
        .iter()
        .filter(|e| e.status == AttendanceStatus::Present)
        .count();
    ((present as f64 / roster.len() as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(names: &[&str]) -> Vec<RosterEntry> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| RosterEntry::absent(i as u32 + 1, *n))
            .collect()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn face(name: &str, confidence: f32) -> Detected {
        Detected {
            name: name.to_owned(),
            confidence,
        }
    }

    #[test]
    fn partitions_present_and_absent_case_insensitively() {
        let now = Utc::now();
        let base = roster(&["Adil Sharma", "Bhushan Kumar", "Mohan Yadav"]);
        let result = reconcile(
            &base,
            &names(&["adil sharma", "Mohan Yadav"]),
            &[face("ADIL SHARMA", 0.914), face("Mohan Yadav", 0.5)],
            now,
        );

        assert_eq!(result.present, names(&["Adil Sharma", "Mohan Yadav"]));
        assert_eq!(result.absent, names(&["Bhushan Kumar"]));
        assert!(result.added.is_empty());
        assert_eq!(result.roster[0].status, AttendanceStatus::Present);
        assert_eq!(result.roster[0].confidence, 91);
        assert_eq!(result.roster[0].last_seen, Some(now));
        assert_eq!(result.roster[2].confidence, 50);
    }

    #[test]
    fn padded_names_match_existing_entries() {
        let base = roster(&["Ana Ruiz"]);
        let result = reconcile(
            &base,
            &names(&["Ana Ruiz ", " ana ruiz"]),
            &[face(" Ana Ruiz", 0.8)],
            Utc::now(),
        );

        assert!(result.added.is_empty());
        assert_eq!(result.roster.len(), 1);
        assert_eq!(result.roster[0].status, AttendanceStatus::Present);
        assert_eq!(result.roster[0].confidence, 80);
    }

    #[test]
    fn absent_entries_keep_last_seen_and_lose_confidence() {
        let seen = Utc::now();
        let mut base = roster(&["Adil Sharma"]);
        base[0].status = AttendanceStatus::Present;
        base[0].last_seen = Some(seen);
        base[0].confidence = 88;

        let result = reconcile(&base, &[], &[], Utc::now());
        let entry = &result.roster[0];
        assert_eq!(entry.status, AttendanceStatus::Absent);
        assert_eq!(entry.confidence, 0);
        assert_eq!(entry.last_seen, Some(seen));
    }

    #[test]
    fn appends_each_unseen_name_once_with_continuing_ids() {
        let mut base = roster(&["Adil Sharma"]);
        base[0].id = 7;
        let result = reconcile(
            &base,
            &names(&["Priya Nair", "priya nair", "Ravi Das"]),
            &[face("Priya Nair", 0.8)],
            Utc::now(),
        );

        assert_eq!(result.added, names(&["Priya Nair", "Ravi Das"]));
        assert_eq!(result.roster.len(), 3);
        assert_eq!(result.roster[1].id, 8);
        assert_eq!(result.roster[1].confidence, 80);
        assert_eq!(result.roster[2].id, 9);
        assert_eq!(result.roster[2].confidence, 0);
    }

    #[test]
    fn placeholders_are_never_appended() {
        let result = reconcile(
            &[],
            &names(&["", "Unknown", "Processing...", "Unknown_3", "Dismissed_4", "Merged_to_1"]),
            &[],
            Utc::now(),
        );
        assert!(result.roster.is_empty());
        assert!(result.added.is_empty());
    }

    #[test]
    fn enroll_and_rate() {
        let now = Utc::now();
        let mut base = roster(&["A", "B", "C"]);
        assert_eq!(attendance_rate(&base), 0);

        let added = enroll(&mut base, "  Dee ", now);
        assert_eq!(added.id, 4);
        assert_eq!(added.name, "Dee");
        assert_eq!(added.confidence, 100);
        assert_eq!(attendance_rate(&base), 25);

        base[0].status = AttendanceStatus::Present;
        assert_eq!(attendance_rate(&base), 50);
        assert_eq!(attendance_rate(&[]), 0);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Late".parse::<AttendanceStatus>(), Ok(AttendanceStatus::Late));
        assert!("sleeping".parse::<AttendanceStatus>().is_err());
        assert_eq!(AttendanceStatus::Excused.to_string(), "excused");
    }
}
