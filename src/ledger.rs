//! Scan ledger: turns a stream of tag scans into start/end pairs.
//!
//! The first scan of a tag (or any scan after its latest record was closed)
//! opens a new record. The next scan closes that record and stores the elapsed
//! time in whole seconds. Storage backends call [`next_transition`] while they
//! hold whatever per-tag lock they use, so the decision always sees the
//! latest committed record.

use chrono::{DateTime, Utc};

use crate::err::Error;
use crate::gateway::{Gateway, StoreError};
use crate::models::ScanRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Insert a new open record starting now.
    Start,
    /// Close record `id` with the given duration.
    End { id: i32, duration_seconds: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Started { id: i32 },
    Ended { id: i32, duration_seconds: i32 },
}

impl ScanOutcome {
    pub fn confirmation(&self) -> &'static str {
        match self {
            ScanOutcome::Started { .. } => "Start time saved",
            ScanOutcome::Ended { .. } => "End time updated",
        }
    }
}

/// Decides what a scan at `now` does, given the tag's most recent record.
pub fn next_transition(latest: Option<&ScanRecord>, now: DateTime<Utc>) -> Transition {
    match latest {
        Some(record) if record.is_open() => Transition::End {
            id: record.id,
            duration_seconds: elapsed_seconds(record.start_time, now),
        },
        _ => Transition::Start,
    }
}

/// Whole seconds between `start` and `end`, rounded to nearest.
///
/// A clock that went backwards yields 0 rather than a negative duration.
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i32 {
    let millis = (end - start).num_milliseconds();
    if millis < 0 {
        log::warn!(
            "Scan end {} precedes start {}, clamping duration to 0",
            end,
            start
        );
        return 0;
    }
    let seconds = (millis as f64 / 1000.0).round();
    if seconds > i32::MAX as f64 {
        i32::MAX
    } else {
        seconds as i32
    }
}

/// Records one scan of `tag_id` at `now`.
///
/// A conflicting concurrent open is retried once; a second conflict is
/// reported as a storage failure.
pub async fn record_scan(
    store: &dyn Gateway,
    tag_id: &str,
    now: DateTime<Utc>,
) -> Result<ScanOutcome, Error> {
    let tag_id = tag_id.trim();
    if tag_id.is_empty() {
        return Err(Error::invalid("tag_id is required in request body."));
    }

    let outcome = match store.record_scan(tag_id, now).await {
        Err(StoreError::OpenScanConflict { .. }) => {
            log::warn!("Concurrent scan of tag `{}`, retrying once", tag_id);
            store.record_scan(tag_id, now).await
        }
        other => other,
    }
    .map_err(|err| Error::storage("DB error during RFID handling", err))?;

    match outcome {
        ScanOutcome::Started { id } => log::info!("Tag `{}` started race log {}", tag_id, id),
        ScanOutcome::Ended {
            id,
            duration_seconds,
        } => log::info!(
            "Tag `{}` ended race log {} after {}s",
            tag_id,
            id,
            duration_seconds
        ),
    }
    Ok(outcome)
}
