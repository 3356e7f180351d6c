//! Standalign: assessment document classification.
//!
//! Teacher-uploaded assessment documents (PDF, Word, plain text) are
//! queued, their questions extracted, and each question classified
//! against curriculum standards and a three-level rigor scale by an LLM
//! oracle. Results are persisted in SQLite alongside per-stage debug
//! checkpoints.

pub mod config;
pub mod db;
pub mod models;
pub mod oracle;
pub mod pipeline;
