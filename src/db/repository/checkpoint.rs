use rusqlite::{params, Connection};
use uuid::Uuid;

use super::now_string;
use crate::db::DatabaseError;

/// One recorded pipeline stage for a document, checksummed so repeated runs
/// of the same document can be diffed stage by stage.
#[derive(Debug, Clone)]
pub struct CheckpointRow {
    pub document_id: Uuid,
    pub stage: String,
    pub payload: String,
    pub checksum: String,
    pub recorded_at: String,
}

pub fn record_checkpoint(
    conn: &Connection,
    document_id: &Uuid,
    stage: &str,
    payload: &str,
    checksum: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR REPLACE INTO debug_checkpoints
         (document_id, stage, payload, checksum, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![document_id.to_string(), stage, payload, checksum, now_string()],
    )?;
    Ok(())
}

pub fn get_checkpoint(
    conn: &Connection,
    document_id: &Uuid,
    stage: &str,
) -> Result<Option<CheckpointRow>, DatabaseError> {
    let result = conn.query_row(
        "SELECT payload, checksum, recorded_at FROM debug_checkpoints
         WHERE document_id = ?1 AND stage = ?2",
        params![document_id.to_string(), stage],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    );

    match result {
        Ok((payload, checksum, recorded_at)) => Ok(Some(CheckpointRow {
            document_id: *document_id,
            stage: stage.to_string(),
            payload,
            checksum,
            recorded_at,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn checkpoint_overwrites_per_stage() {
        let conn = open_memory_database().unwrap();
        let doc = Uuid::new_v4();

        record_checkpoint(&conn, &doc, "pass1_raw", "first run", "aaa").unwrap();
        record_checkpoint(&conn, &doc, "pass1_raw", "second run", "bbb").unwrap();
        record_checkpoint(&conn, &doc, "pass2_raw", "other stage", "ccc").unwrap();

        let cp = get_checkpoint(&conn, &doc, "pass1_raw").unwrap().unwrap();
        assert_eq!(cp.payload, "second run");
        assert_eq!(cp.checksum, "bbb");

        let other = get_checkpoint(&conn, &doc, "pass2_raw").unwrap().unwrap();
        assert_eq!(other.payload, "other stage");
    }

    #[test]
    fn missing_checkpoint_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_checkpoint(&conn, &Uuid::new_v4(), "pass1_raw")
            .unwrap()
            .is_none());
    }
}
