use rusqlite::{params, Connection};
use uuid::Uuid;

use super::parse_string_list;
use crate::db::DatabaseError;
use crate::models::VocabularySet;

/// Store (or replace) the permitted standard codes for a course+jurisdiction.
/// Classroom settings are written by the roster surface; the pipeline only
/// reads them.
pub fn upsert_classroom_setting(
    conn: &Connection,
    course: &str,
    jurisdiction: &str,
    standard_codes: &[String],
) -> Result<(), DatabaseError> {
    let codes = serde_json::to_string(standard_codes).map_err(|e| {
        DatabaseError::InvalidColumn {
            field: "standard_codes".into(),
            reason: e.to_string(),
        }
    })?;

    conn.execute(
        "INSERT INTO classroom_settings (id, course, jurisdiction, standard_codes)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (course, jurisdiction) DO UPDATE SET standard_codes = excluded.standard_codes",
        params![Uuid::new_v4().to_string(), course, jurisdiction, codes],
    )?;
    Ok(())
}

/// Resolve the permitted vocabulary for a document's course, trying its
/// jurisdictions in order. None means classification runs unconstrained.
pub fn resolve_vocabulary(
    conn: &Connection,
    course: Option<&str>,
    jurisdictions: &[String],
) -> Result<Option<VocabularySet>, DatabaseError> {
    let Some(course) = course else {
        return Ok(None);
    };

    for jurisdiction in jurisdictions {
        let result = conn.query_row(
            "SELECT standard_codes FROM classroom_settings
             WHERE course = ?1 AND jurisdiction = ?2",
            params![course, jurisdiction],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(codes) => {
                let codes = parse_string_list("classroom_settings.standard_codes", &codes)?;
                return Ok(Some(VocabularySet::new(
                    jurisdiction.clone(),
                    course.to_string(),
                    codes,
                )));
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(None)
}
