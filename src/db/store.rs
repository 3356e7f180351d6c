//! Persistence collaborator handed to the pipeline.
//!
//! Wraps a shared SQLite connection so the queue worker thread and the
//! submission side operate on the same database. Every method takes the
//! lock for a single repository call; the lock is never held across an
//! oracle round-trip.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use uuid::Uuid;

use super::repository;
use super::DatabaseError;
use crate::models::{
    Classification, Document, DocumentStatus, Question, QueueEntry, RigorLevel, VocabularySet,
};

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-call;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Documents ───────────────────────────────────────────────────

    pub fn insert_document(&self, doc: &Document) -> Result<(), DatabaseError> {
        repository::insert_document(&self.conn(), doc)
    }

    pub fn get_document(&self, id: &Uuid) -> Result<Option<Document>, DatabaseError> {
        repository::get_document(&self.conn(), id)
    }

    pub fn update_document_status(
        &self,
        id: &Uuid,
        status: DocumentStatus,
        error_message: Option<&str>,
    ) -> Result<(), DatabaseError> {
        repository::update_document_status(&self.conn(), id, status, error_message)
    }

    pub fn claim_pending(&self, id: &Uuid) -> Result<bool, DatabaseError> {
        repository::claim_pending(&self.conn(), id)
    }

    pub fn delete_document(&self, id: &Uuid) -> Result<(), DatabaseError> {
        repository::delete_document(&self.conn(), id)
    }

    // ── Questions & classifications ─────────────────────────────────

    pub fn create_question(
        &self,
        document_id: &Uuid,
        ordinal: i64,
        instruction_text: &str,
    ) -> Result<Question, DatabaseError> {
        let question = repository::new_question(document_id, ordinal, instruction_text);
        repository::insert_question(&self.conn(), &question)?;
        Ok(question)
    }

    pub fn create_classification(
        &self,
        question_id: &Uuid,
        standard_codes: Vec<String>,
        rigor: RigorLevel,
        justification: Option<String>,
        confidence: Option<f64>,
        engine: &str,
    ) -> Result<Classification, DatabaseError> {
        let classification = repository::new_classification(
            question_id,
            standard_codes,
            rigor,
            justification,
            confidence,
            engine,
        );
        repository::insert_classification(&self.conn(), &classification)?;
        Ok(classification)
    }

    pub fn questions_for_document(
        &self,
        document_id: &Uuid,
    ) -> Result<Vec<Question>, DatabaseError> {
        repository::questions_for_document(&self.conn(), document_id)
    }

    pub fn classifications_for_question(
        &self,
        question_id: &Uuid,
    ) -> Result<Vec<Classification>, DatabaseError> {
        repository::classifications_for_question(&self.conn(), question_id)
    }

    // ── Vocabulary ──────────────────────────────────────────────────

    pub fn resolve_vocabulary(
        &self,
        course: Option<&str>,
        jurisdictions: &[String],
    ) -> Result<Option<VocabularySet>, DatabaseError> {
        repository::resolve_vocabulary(&self.conn(), course, jurisdictions)
    }

    pub fn upsert_classroom_setting(
        &self,
        course: &str,
        jurisdiction: &str,
        standard_codes: &[String],
    ) -> Result<(), DatabaseError> {
        repository::upsert_classroom_setting(&self.conn(), course, jurisdiction, standard_codes)
    }

    // ── Queue ───────────────────────────────────────────────────────

    pub fn enqueue(&self, document_id: &Uuid, priority: i64) -> Result<bool, DatabaseError> {
        repository::enqueue(&self.conn(), document_id, priority)
    }

    pub fn next_entry(&self) -> Result<Option<QueueEntry>, DatabaseError> {
        repository::next_entry(&self.conn())
    }

    pub fn remove_entry(&self, id: i64) -> Result<(), DatabaseError> {
        repository::remove_entry(&self.conn(), id)
    }

    pub fn pending_count(&self) -> Result<i64, DatabaseError> {
        repository::pending_count(&self.conn())
    }

    // ── Debug checkpoints ───────────────────────────────────────────

    pub fn record_checkpoint(
        &self,
        document_id: &Uuid,
        stage: &str,
        payload: &str,
        checksum: &str,
    ) -> Result<(), DatabaseError> {
        repository::record_checkpoint(&self.conn(), document_id, stage, payload, checksum)
    }

    pub fn get_checkpoint(
        &self,
        document_id: &Uuid,
        stage: &str,
    ) -> Result<Option<repository::CheckpointRow>, DatabaseError> {
        repository::get_checkpoint(&self.conn(), document_id, stage)
    }
}
