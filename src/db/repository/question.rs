use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{now_string, parse_string_list, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::{Classification, Question, RigorLevel};

pub fn insert_question(conn: &Connection, question: &Question) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO questions (id, document_id, ordinal, instruction_text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            question.id.to_string(),
            question.document_id.to_string(),
            question.ordinal,
            question.instruction_text,
            question.created_at.format(super::TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn insert_classification(
    conn: &Connection,
    classification: &Classification,
) -> Result<(), DatabaseError> {
    let standards = serde_json::to_string(&classification.standard_codes).map_err(|e| {
        DatabaseError::InvalidColumn {
            field: "standard_codes".into(),
            reason: e.to_string(),
        }
    })?;

    conn.execute(
        "INSERT INTO classifications (id, question_id, standard_codes, rigor_level,
         justification, confidence, engine, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            classification.id.to_string(),
            classification.question_id.to_string(),
            standards,
            classification.rigor.level(),
            classification.justification,
            classification.confidence,
            classification.engine,
            classification
                .created_at
                .format(super::TIMESTAMP_FORMAT)
                .to_string(),
        ],
    )?;
    Ok(())
}

pub fn questions_for_document(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Vec<Question>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, document_id, ordinal, instruction_text, created_at
         FROM questions WHERE document_id = ?1 ORDER BY ordinal ASC",
    )?;

    let rows = stmt.query_map(params![document_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut questions = Vec::new();
    for row in rows {
        let (id, doc_id, ordinal, text, created_at) = row?;
        questions.push(Question {
            id: parse_uuid("questions.id", &id)?,
            document_id: parse_uuid("questions.document_id", &doc_id)?,
            ordinal,
            instruction_text: text,
            created_at: parse_timestamp("questions.created_at", &created_at)?,
        });
    }
    Ok(questions)
}

pub fn classifications_for_question(
    conn: &Connection,
    question_id: &Uuid,
) -> Result<Vec<Classification>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, question_id, standard_codes, rigor_level, justification,
         confidence, engine, created_at
         FROM classifications WHERE question_id = ?1 ORDER BY created_at ASC",
    )?;

    let rows = stmt.query_map(params![question_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, Option<f64>>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, String>(7)?,
        ))
    })?;

    let mut classifications = Vec::new();
    for row in rows {
        let (id, qid, standards, rigor, justification, confidence, engine, created_at) = row?;
        classifications.push(Classification {
            id: parse_uuid("classifications.id", &id)?,
            question_id: parse_uuid("classifications.question_id", &qid)?,
            standard_codes: parse_string_list("classifications.standard_codes", &standards)?,
            rigor: RigorLevel::from_level(rigor).ok_or_else(|| DatabaseError::InvalidEnum {
                field: "classifications.rigor_level".into(),
                value: rigor.to_string(),
            })?,
            justification,
            confidence,
            engine,
            created_at: parse_timestamp("classifications.created_at", &created_at)?,
        });
    }
    Ok(classifications)
}

/// Build a question row for insertion.
pub fn new_question(document_id: &Uuid, ordinal: i64, instruction_text: &str) -> Question {
    Question {
        id: Uuid::new_v4(),
        document_id: *document_id,
        ordinal,
        instruction_text: instruction_text.to_string(),
        created_at: chrono::NaiveDateTime::parse_from_str(&now_string(), super::TIMESTAMP_FORMAT)
            .unwrap_or_default(),
    }
}

/// Build a classification row for insertion.
#[allow(clippy::too_many_arguments)]
pub fn new_classification(
    question_id: &Uuid,
    standard_codes: Vec<String>,
    rigor: RigorLevel,
    justification: Option<String>,
    confidence: Option<f64>,
    engine: &str,
) -> Classification {
    Classification {
        id: Uuid::new_v4(),
        question_id: *question_id,
        standard_codes,
        rigor,
        justification,
        confidence,
        engine: engine.to_string(),
        created_at: chrono::NaiveDateTime::parse_from_str(&now_string(), super::TIMESTAMP_FORMAT)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::document::{insert_document, new_document};
    use crate::db::sqlite::open_memory_database;
    use crate::models::MediaType;

    fn setup_document(conn: &Connection) -> Uuid {
        let doc = new_document("/uploads/test.pdf", MediaType::Pdf, vec![], None);
        insert_document(conn, &doc).unwrap();
        doc.id
    }

    #[test]
    fn question_and_classification_round_trip() {
        let conn = open_memory_database().unwrap();
        let doc_id = setup_document(&conn);

        let question = new_question(&doc_id, 1, "Solve for x: 2x = 6");
        insert_question(&conn, &question).unwrap();

        let classification = new_classification(
            &question.id,
            vec!["A-REI.B.3".into()],
            RigorLevel::Recall,
            Some("Single-step linear equation".into()),
            Some(0.91),
            "gemini-2.0-flash",
        );
        insert_classification(&conn, &classification).unwrap();

        let questions = questions_for_document(&conn, &doc_id).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].instruction_text, "Solve for x: 2x = 6");

        let stored = classifications_for_question(&conn, &question.id).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].standard_codes, vec!["A-REI.B.3".to_string()]);
        assert_eq!(stored[0].rigor, RigorLevel::Recall);
        assert_eq!(stored[0].engine, "gemini-2.0-flash");
    }

    #[test]
    fn questions_ordered_by_ordinal() {
        let conn = open_memory_database().unwrap();
        let doc_id = setup_document(&conn);

        for ordinal in [3, 1, 2] {
            insert_question(&conn, &new_question(&doc_id, ordinal, &format!("Q{ordinal}")))
                .unwrap();
        }

        let questions = questions_for_document(&conn, &doc_id).unwrap();
        let ordinals: Vec<i64> = questions.iter().map(|q| q.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_ordinal_rejected_by_schema() {
        let conn = open_memory_database().unwrap();
        let doc_id = setup_document(&conn);

        insert_question(&conn, &new_question(&doc_id, 1, "first")).unwrap();
        let dup = insert_question(&conn, &new_question(&doc_id, 1, "second"));
        assert!(dup.is_err());
    }
}
