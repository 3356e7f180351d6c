use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{now_string, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::QueueEntry;

/// Append a durable queue entry. Returns false when the document already
/// has an entry waiting (UNIQUE on document_id), making enqueue idempotent.
pub fn enqueue(conn: &Connection, document_id: &Uuid, priority: i64) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT INTO queue_entries (document_id, priority, enqueued_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (document_id) DO NOTHING",
        params![document_id.to_string(), priority, now_string()],
    )?;
    Ok(inserted == 1)
}

/// The highest-priority, oldest entry, or None when the queue is empty.
/// Rowid breaks ties for entries enqueued within the same second.
pub fn next_entry(conn: &Connection) -> Result<Option<QueueEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, document_id, priority, enqueued_at
         FROM queue_entries
         ORDER BY priority DESC, enqueued_at ASC, id ASC
         LIMIT 1",
    )?;

    let result = stmt.query_row([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
        ))
    });

    match result {
        Ok((id, document_id, priority, enqueued_at)) => Ok(Some(QueueEntry {
            id,
            document_id: parse_uuid("queue_entries.document_id", &document_id)?,
            priority,
            enqueued_at: parse_timestamp("queue_entries.enqueued_at", &enqueued_at)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn remove_entry(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM queue_entries WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn pending_count(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM queue_entries", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn entries_come_back_priority_then_fifo() {
        let conn = open_memory_database().unwrap();
        let low_a = Uuid::new_v4();
        let low_b = Uuid::new_v4();
        let high = Uuid::new_v4();

        assert!(enqueue(&conn, &low_a, 0).unwrap());
        assert!(enqueue(&conn, &low_b, 0).unwrap());
        assert!(enqueue(&conn, &high, 5).unwrap());

        let first = next_entry(&conn).unwrap().unwrap();
        assert_eq!(first.document_id, high);
        remove_entry(&conn, first.id).unwrap();

        let second = next_entry(&conn).unwrap().unwrap();
        assert_eq!(second.document_id, low_a, "FIFO within same priority");
        remove_entry(&conn, second.id).unwrap();

        let third = next_entry(&conn).unwrap().unwrap();
        assert_eq!(third.document_id, low_b);
        remove_entry(&conn, third.id).unwrap();

        assert!(next_entry(&conn).unwrap().is_none());
    }

    #[test]
    fn enqueue_is_idempotent_per_document() {
        let conn = open_memory_database().unwrap();
        let doc = Uuid::new_v4();

        assert!(enqueue(&conn, &doc, 0).unwrap());
        assert!(!enqueue(&conn, &doc, 3).unwrap(), "duplicate entry rejected");
        assert_eq!(pending_count(&conn).unwrap(), 1);
    }

    #[test]
    fn empty_queue_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(next_entry(&conn).unwrap().is_none());
        assert_eq!(pending_count(&conn).unwrap(), 0);
    }
}
