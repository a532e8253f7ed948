//! Attendance sessions and per-student records.
//!
//! A record is unique per (session, student). Automatic marks from the live
//! classroom and manual sheets both upsert, so the last writer wins; manual
//! writes set `manual_override` so reports can tell them apart.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::PgPool;
use ts_rs::TS;
use uuid::Uuid;

use crate::attendance::{AttendanceStatus, RosterEntry};
use crate::data::models::{AttendanceRecord, AttendanceSession, ManualMark, RosterStudent};

const SESSION_COLUMNS: &str =
    "id, class_id, teacher_id, topic, ai_enabled, session_date, start_time, end_time, is_active";

const RECORD_COLUMNS: &str = "id, session_id, student_id, status, confidence_score, \
     manual_override, marked_by, notes, marked_at";

pub async fn start_session(
    pool: &PgPool,
    class_id: Uuid,
    teacher_id: Uuid,
    topic: Option<&str>,
    ai_enabled: bool,
) -> Result<AttendanceSession> {
    let row = sqlx::query_as::<_, AttendanceSession>(&format!(
        "INSERT INTO attendance_sessions (class_id, teacher_id, topic, ai_enabled) \
         VALUES ($1, $2, $3, $4) RETURNING {SESSION_COLUMNS}"
    ))
    .bind(class_id)
    .bind(teacher_id)
    .bind(topic)
    .bind(ai_enabled)
    .fetch_one(pool)
    .await
    .context("failed to start attendance session")?;
    Ok(row)
}

/// Close a session. Returns `None` when no such session exists; ending an
/// already closed session keeps its original end time.
pub async fn end_session(pool: &PgPool, session_id: Uuid) -> Result<Option<AttendanceSession>> {
    let row = sqlx::query_as::<_, AttendanceSession>(&format!(
        "UPDATE attendance_sessions \
         SET end_time = COALESCE(end_time, now()), is_active = false, updated_at = now() \
         WHERE id = $1 RETURNING {SESSION_COLUMNS}"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await
    .context("failed to end attendance session")?;
    Ok(row)
}

pub async fn get_session(pool: &PgPool, session_id: Uuid) -> Result<Option<AttendanceSession>> {
    let row = sqlx::query_as::<_, AttendanceSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM attendance_sessions WHERE id = $1"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch attendance session")?;
    Ok(row)
}

/// Sessions for a class, newest first.
pub async fn list_sessions(pool: &PgPool, class_id: Uuid) -> Result<Vec<AttendanceSession>> {
    let rows = sqlx::query_as::<_, AttendanceSession>(&format!(
        "SELECT {SESSION_COLUMNS} FROM attendance_sessions WHERE class_id = $1 \
         ORDER BY start_time DESC"
    ))
    .bind(class_id)
    .fetch_all(pool)
    .await
    .context("failed to list attendance sessions")?;
    Ok(rows)
}

pub async fn list_records(pool: &PgPool, session_id: Uuid) -> Result<Vec<AttendanceRecord>> {
    let rows = sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {RECORD_COLUMNS} FROM attendance_records WHERE session_id = $1 ORDER BY marked_at"
    ))
    .bind(session_id)
    .fetch_all(pool)
    .await
    .context("failed to list attendance records")?;
    Ok(rows)
}

/// One roster entry resolved to an enrolled student.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMark {
    pub student_id: Uuid,
    pub status: AttendanceStatus,
    /// 0.0..=1.0
    pub confidence: Option<f32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RecordOutcome {
    pub recorded: usize,
    /// Roster names that match no enrolled student.
    pub unmatched: Vec<String>,
}

/// Ordering used when several roster entries resolve to one student.
fn mark_strength(mark: &RecordMark) -> (bool, f32) {
    (
        mark.status != AttendanceStatus::Absent,
        mark.confidence.unwrap_or(0.0),
    )
}

/// Resolve live-roster names to enrolled students by case-insensitive full name.
///
/// Each student gets at most one mark. When a name appears more than once,
/// a present entry beats an absent one, then the higher confidence wins.
pub fn match_roster(
    students: &[RosterStudent],
    roster: &[RosterEntry],
) -> (Vec<RecordMark>, Vec<String>) {
    let by_name: HashMap<String, Uuid> = students
        .iter()
        .map(|s| (s.full_name.trim().to_lowercase(), s.student_id))
        .collect();

    let mut marks: Vec<RecordMark> = Vec::with_capacity(roster.len());
    let mut slot: HashMap<Uuid, usize> = HashMap::new();
    let mut unmatched = Vec::new();
    for entry in roster {
        let Some(&student_id) = by_name.get(&entry.name.trim().to_lowercase()) else {
            unmatched.push(entry.name.clone());
            continue;
        };
        let mark = RecordMark {
            student_id,
            status: entry.status,
            confidence: Some(f32::from(entry.confidence) / 100.0),
            notes: None,
        };
        match slot.get(&student_id) {
            Some(&i) => {
                if mark_strength(&mark) > mark_strength(&marks[i]) {
                    marks[i] = mark;
                }
            }
            None => {
                slot.insert(student_id, marks.len());
                marks.push(mark);
            }
        }
    }
    (marks, unmatched)
}

/// Build a full manual sheet: every enrolled student is present unless a
/// mark says otherwise. Marks for students not on the roster are dropped.
pub fn manual_sheet(students: &[RosterStudent], marks: &[ManualMark]) -> Vec<RecordMark> {
    let overrides: HashMap<Uuid, &ManualMark> = marks.iter().map(|m| (m.student_id, m)).collect();
    students
        .iter()
        .map(|s| match overrides.get(&s.student_id) {
            Some(mark) => RecordMark {
                student_id: s.student_id,
                status: mark.status,
                confidence: None,
                notes: mark.notes.clone(),
            },
            None => RecordMark {
                student_id: s.student_id,
                status: AttendanceStatus::Present,
                confidence: None,
                notes: None,
            },
        })
        .collect()
}

async fn upsert_records(
    pool: &PgPool,
    session_id: Uuid,
    marks: &[RecordMark],
    manual_override: bool,
    marked_by: Option<Uuid>,
) -> Result<usize> {
    if marks.is_empty() {
        return Ok(0);
    }

    let student_ids: Vec<Uuid> = marks.iter().map(|m| m.student_id).collect();
    let statuses: Vec<&str> = marks.iter().map(|m| m.status.as_str()).collect();
    let confidences: Vec<Option<f32>> = marks.iter().map(|m| m.confidence).collect();
    let notes: Vec<Option<String>> = marks.iter().map(|m| m.notes.clone()).collect();

    let result = sqlx::query(
        r#"
        INSERT INTO attendance_records
            (session_id, student_id, status, confidence_score, notes, manual_override, marked_by)
        SELECT $1, t.student_id, t.status, t.confidence, t.notes, $6, $7
        FROM UNNEST($2::uuid[], $3::text[], $4::real[], $5::text[])
            AS t(student_id, status, confidence, notes)
        ON CONFLICT (session_id, student_id)
        DO UPDATE SET status = EXCLUDED.status,
                      confidence_score = EXCLUDED.confidence_score,
                      notes = EXCLUDED.notes,
                      manual_override = EXCLUDED.manual_override,
                      marked_by = EXCLUDED.marked_by,
                      marked_at = now()
        "#,
    )
    .bind(session_id)
    .bind(&student_ids)
    .bind(&statuses)
    .bind(&confidences)
    .bind(&notes)
    .bind(manual_override)
    .bind(marked_by)
    .execute(pool)
    .await
    .context("failed to upsert attendance records")?;

    Ok(result.rows_affected() as usize)
}

/// Store a live-classroom roster against a session.
pub async fn record_reconciliation(
    pool: &PgPool,
    session_id: Uuid,
    students: &[RosterStudent],
    roster: &[RosterEntry],
) -> Result<RecordOutcome> {
    let (marks, unmatched) = match_roster(students, roster);
    let recorded = upsert_records(pool, session_id, &marks, false, None).await?;
    Ok(RecordOutcome {
        recorded,
        unmatched,
    })
}

/// Store a teacher's manual sheet for a session.
pub async fn submit_manual(
    pool: &PgPool,
    session_id: Uuid,
    marked_by: Uuid,
    students: &[RosterStudent],
    marks: &[ManualMark],
) -> Result<RecordOutcome> {
    let sheet = manual_sheet(students, marks);
    let recorded = upsert_records(pool, session_id, &sheet, true, Some(marked_by)).await?;
    let unmatched = marks
        .iter()
        .filter(|m| !students.iter().any(|s| s.student_id == m.student_id))
        .map(|m| m.student_id.to_string())
        .collect();
    Ok(RecordOutcome {
        recorded,
        unmatched,
    })
}
