//! In-memory [`Gateway`] used by the unit and router tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::gateway::{Gateway, StoreError};
use crate::ledger::{self, ScanOutcome, Transition};
use crate::models::{NewStudent, ScanRecord, Student};

#[derive(Default)]
struct Tables {
    students: Vec<Student>,
    scans: Vec<ScanRecord>,
}

#[derive(Default)]
pub struct MemoryGateway {
    tables: Mutex<Tables>,
    failing: AtomicBool,
    conflicts: AtomicUsize,
}

impl MemoryGateway {
    /// Makes every subsequent call fail as if the pool were closed.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The next `count` scans report an open-record conflict.
    pub fn inject_conflicts(&self, count: usize) {
        self.conflicts.store(count, Ordering::SeqCst);
    }

    pub async fn students(&self) -> Vec<Student> {
        self.tables.lock().await.students.clone()
    }

    pub async fn scans(&self) -> Vec<ScanRecord> {
        self.tables.lock().await.scans.clone()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn insert_student(&self, student: &NewStudent) -> Result<i32, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().await;
        let id = tables.students.len() as i32 + 1;
        tables.students.push(Student {
            id,
            name: student.name.clone(),
            weight: student.weight.clone(),
            contact: student.contact.clone(),
            gender: student.gender.clone(),
            race: student.race.clone(),
            academy: student.academy.clone(),
            student_role: student.student_role.clone(),
        });
        Ok(id)
    }

    async fn list_students(&self) -> Result<Vec<Student>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.students.iter().rev().cloned().collect())
    }

    async fn record_scan(
        &self,
        tag_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, StoreError> {
        self.check()?;
        let pending = self.conflicts.load(Ordering::SeqCst);
        if pending > 0 {
            self.conflicts.store(pending - 1, Ordering::SeqCst);
            return Err(StoreError::OpenScanConflict {
                tag_id: tag_id.to_string(),
            });
        }

        let mut tables = self.tables.lock().await;
        let latest = tables.scans.iter().rev().find(|scan| scan.tag_id == tag_id);
        match ledger::next_transition(latest, now) {
            Transition::Start => {
                let id = tables.scans.len() as i32 + 1;
                tables.scans.push(ScanRecord {
                    id,
                    tag_id: tag_id.to_string(),
                    start_time: now,
                    end_time: None,
                    duration_seconds: None,
                });
                Ok(ScanOutcome::Started { id })
            }
            Transition::End {
                id,
                duration_seconds,
            } => {
                let scan = tables
                    .scans
                    .iter_mut()
                    .find(|scan| scan.id == id)
                    .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
                scan.end_time = Some(now);
                scan.duration_seconds = Some(duration_seconds);
                Ok(ScanOutcome::Ended {
                    id,
                    duration_seconds,
                })
            }
        }
    }

    async fn list_scans(&self) -> Result<Vec<ScanRecord>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.scans.iter().rev().cloned().collect())
    }

    async fn get_scan(&self, id: i32) -> Result<Option<ScanRecord>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().await;
        Ok(tables.scans.iter().find(|scan| scan.id == id).cloned())
    }
}
