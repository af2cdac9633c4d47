//! Persistence gateway: every query the service issues goes through
//! [`Gateway`]. The production implementation is [`PgGateway`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::ledger::{self, ScanOutcome, Transition};
use crate::models::{NewStudent, ScanRecord, Student};

/// Shared handle injected into the router.
pub type Store = Arc<dyn Gateway>;

#[derive(Debug)]
pub enum StoreError {
    /// Another open record already exists for this tag.
    OpenScanConflict { tag_id: String },
    Database(sqlx::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::OpenScanConflict { tag_id } => {
                write!(f, "tag `{}` already has an open race log", tag_id)
            }
            StoreError::Database(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Inserts a student and returns the generated id.
    async fn insert_student(&self, student: &NewStudent) -> Result<i32, StoreError>;

    /// All students, newest first.
    async fn list_students(&self) -> Result<Vec<Student>, StoreError>;

    /// Applies one scan of `tag_id` atomically with respect to that tag.
    async fn record_scan(
        &self,
        tag_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, StoreError>;

    /// All race logs, newest first.
    async fn list_scans(&self) -> Result<Vec<ScanRecord>, StoreError>;

    async fn get_scan(&self, id: i32) -> Result<Option<ScanRecord>, StoreError>;
}

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn insert_student(&self, student: &NewStudent) -> Result<i32, StoreError> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO students (name, weight, contact, gender, race, academy, studentRole) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&student.name)
        .bind(&student.weight)
        .bind(&student.contact)
        .bind(&student.gender)
        .bind(&student.race)
        .bind(&student.academy)
        .bind(&student.student_role)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        let students = sqlx::query_as::<_, Student>("SELECT * FROM students ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(students)
    }

    async fn record_scan(
        &self,
        tag_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // held until commit or rollback
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(tag_id)
            .execute(&mut tx)
            .await?;

        let latest = sqlx::query_as::<_, ScanRecord>(
            "SELECT * FROM race_logs WHERE tag_id = $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(tag_id)
        .fetch_optional(&mut tx)
        .await?;

        let outcome = match ledger::next_transition(latest.as_ref(), now) {
            Transition::Start => {
                let id = sqlx::query_scalar::<_, i32>(
                    "INSERT INTO race_logs (tag_id, start_time) VALUES ($1, $2) RETURNING id",
                )
                .bind(tag_id)
                .bind(now)
                .fetch_one(&mut tx)
                .await
                .map_err(|err| conflict_or(err, tag_id))?;
                ScanOutcome::Started { id }
            }
            Transition::End {
                id,
                duration_seconds,
            } => {
                sqlx::query(
                    "UPDATE race_logs SET end_time = $1, duration_seconds = $2 WHERE id = $3",
                )
                .bind(now)
                .bind(duration_seconds)
                .bind(id)
                .execute(&mut tx)
                .await?;
                ScanOutcome::Ended {
                    id,
                    duration_seconds,
                }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_scans(&self) -> Result<Vec<ScanRecord>, StoreError> {
        let scans = sqlx::query_as::<_, ScanRecord>("SELECT * FROM race_logs ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(scans)
    }

    async fn get_scan(&self, id: i32) -> Result<Option<ScanRecord>, StoreError> {
        let scan = sqlx::query_as::<_, ScanRecord>("SELECT * FROM race_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(scan)
    }
}

/// Maps a violation of the one-open-log-per-tag index to a conflict.
fn conflict_or(err: sqlx::Error, tag_id: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::OpenScanConflict {
                tag_id: tag_id.to_string(),
            };
        }
    }
    StoreError::Database(err)
}
