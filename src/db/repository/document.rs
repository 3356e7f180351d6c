use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{now_string, parse_string_list, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Document, DocumentStatus, MediaType};

pub fn insert_document(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    let jurisdictions = serde_json::to_string(&doc.jurisdictions).map_err(|e| {
        DatabaseError::InvalidColumn {
            field: "jurisdictions".into(),
            reason: e.to_string(),
        }
    })?;

    conn.execute(
        "INSERT INTO documents (id, title, storage_path, media_type, jurisdictions,
         course, tenant_id, status, error_message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            doc.id.to_string(),
            doc.title,
            doc.storage_path,
            doc.media_type.as_str(),
            jurisdictions,
            doc.course,
            doc.tenant_id.map(|id| id.to_string()),
            doc.status.as_str(),
            doc.error_message,
            doc.created_at.format(super::TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<Document>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, storage_path, media_type, jurisdictions,
         course, tenant_id, status, error_message, created_at
         FROM documents WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok(DocumentRow {
            id: row.get(0)?,
            title: row.get(1)?,
            storage_path: row.get(2)?,
            media_type: row.get(3)?,
            jurisdictions: row.get(4)?,
            course: row.get(5)?,
            tenant_id: row.get(6)?,
            status: row.get(7)?,
            error_message: row.get(8)?,
            created_at: row.get(9)?,
        })
    });

    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Set the document status (and optional error message, cleared on success).
pub fn update_document_status(
    conn: &Connection,
    id: &Uuid,
    status: DocumentStatus,
    error_message: Option<&str>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE documents SET status = ?2, error_message = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), error_message],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "document".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Atomically claim a pending document for processing.
///
/// Returns false when the document is missing or no longer `pending`, which
/// is how a stale or duplicate queue entry is detected without racing a
/// concurrent enqueue of the same document.
pub fn claim_pending(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE documents SET status = 'processing', error_message = NULL
         WHERE id = ?1 AND status = 'pending'",
        params![id.to_string()],
    )?;
    Ok(changed == 1)
}

/// Delete a document row. Deletion before dequeue is the only cancellation
/// path the pipeline recognizes.
pub fn delete_document(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM documents WHERE id = ?1", params![id.to_string()])?;
    Ok(())
}

struct DocumentRow {
    id: String,
    title: Option<String>,
    storage_path: String,
    media_type: String,
    jurisdictions: String,
    course: Option<String>,
    tenant_id: Option<String>,
    status: String,
    error_message: Option<String>,
    created_at: String,
}

fn document_from_row(row: DocumentRow) -> Result<Document, DatabaseError> {
    Ok(Document {
        id: parse_uuid("documents.id", &row.id)?,
        title: row.title,
        storage_path: row.storage_path,
        media_type: MediaType::from_mime(&row.media_type),
        jurisdictions: parse_string_list("documents.jurisdictions", &row.jurisdictions)?,
        course: row.course,
        tenant_id: row
            .tenant_id
            .as_deref()
            .map(|id| parse_uuid("documents.tenant_id", id))
            .transpose()?,
        status: DocumentStatus::from_str(&row.status)?,
        error_message: row.error_message,
        created_at: parse_timestamp("documents.created_at", &row.created_at)?,
    })
}

/// Build a new pending document for insertion.
pub fn new_document(
    storage_path: &str,
    media_type: MediaType,
    jurisdictions: Vec<String>,
    course: Option<String>,
) -> Document {
    Document {
        id: Uuid::new_v4(),
        title: None,
        storage_path: storage_path.to_string(),
        media_type,
        jurisdictions,
        course,
        tenant_id: None,
        status: DocumentStatus::Pending,
        error_message: None,
        created_at: chrono::NaiveDateTime::parse_from_str(
            &now_string(),
            super::TIMESTAMP_FORMAT,
        )
        .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn sample_document() -> Document {
        let mut doc = new_document(
            "/uploads/quiz.pdf",
            MediaType::Pdf,
            vec!["common-core".into()],
            Some("Math 6".into()),
        );
        doc.title = Some("Unit 3 Quiz".into());
        doc
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let doc = sample_document();
        insert_document(&conn, &doc).unwrap();

        let loaded = get_document(&conn, &doc.id).unwrap().unwrap();
        assert_eq!(loaded.id, doc.id);
        assert_eq!(loaded.title.as_deref(), Some("Unit 3 Quiz"));
        assert_eq!(loaded.media_type, MediaType::Pdf);
        assert_eq!(loaded.jurisdictions, vec!["common-core".to_string()]);
        assert_eq!(loaded.status, DocumentStatus::Pending);
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_document(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn claim_pending_transitions_once() {
        let conn = open_memory_database().unwrap();
        let doc = sample_document();
        insert_document(&conn, &doc).unwrap();

        assert!(claim_pending(&conn, &doc.id).unwrap());
        assert!(!claim_pending(&conn, &doc.id).unwrap(), "second claim must fail");

        let loaded = get_document(&conn, &doc.id).unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Processing);
    }

    #[test]
    fn claim_missing_document_returns_false() {
        let conn = open_memory_database().unwrap();
        assert!(!claim_pending(&conn, &Uuid::new_v4()).unwrap());
    }

    #[test]
    fn update_status_records_error_message() {
        let conn = open_memory_database().unwrap();
        let doc = sample_document();
        insert_document(&conn, &doc).unwrap();

        update_document_status(&conn, &doc.id, DocumentStatus::Failed, Some("no text extracted"))
            .unwrap();

        let loaded = get_document(&conn, &doc.id).unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("no text extracted"));
    }

    #[test]
    fn update_status_missing_document_errors() {
        let conn = open_memory_database().unwrap();
        let err = update_document_status(&conn, &Uuid::new_v4(), DocumentStatus::Completed, None);
        assert!(matches!(err, Err(DatabaseError::NotFound { .. })));
    }
}
