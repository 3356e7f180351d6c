//! Prompt construction for the two analysis passes. The system prompts pin
//! the output contract; the user content carries the per-document payload.

use crate::models::{VocabularySet, OUT_OF_SCOPE};

use super::types::ExtractedItem;

pub const EXTRACTION_SYSTEM_PROMPT: &str = "\
You are an assessment digitization assistant. You will receive an assessment \
document (a quiz, test, worksheet, or exam). Identify every distinct question \
or student task in the document.

Rules:
- Extract the full instruction text of each question verbatim, including any \
answer choices that are part of the question.
- Number questions with an `ordinal` starting at 1, in document order. If the \
document numbers its questions, preserve that numbering.
- Do NOT classify, grade, answer, or comment on any question.
- Do NOT include headers, instructions to the whole class, point values, or \
answer keys as questions.

Respond with ONLY a JSON object of this exact shape, with no markdown fences \
and no prose before or after it:
{\"items\": [{\"ordinal\": 1, \"instructionText\": \"...\"}]}";

pub const CLASSIFICATION_SYSTEM_PROMPT: &str = "\
You are a curriculum alignment specialist. You will receive a JSON list of \
assessment questions. For each question, determine the single curriculum \
standard it most directly assesses and the cognitive rigor it demands.

Rigor levels:
- 1 (mild): recall of a fact, definition, or rote procedure.
- 2 (medium): application of a learned concept or skill to a problem.
- 3 (spicy): multi-step reasoning, analysis, synthesis, or justification.

Rules:
- Return exactly one record per input ordinal, echoing the ordinal unchanged.
- When a permitted standards list is provided, choose only from that list.
- If no listed standard fits a question, use the code \"OUT_OF_SCOPE\".
- Identical questions must receive identical classifications.

Respond with ONLY a JSON object of this exact shape, with no markdown fences \
and no prose before or after it:
{\"items\": [{\"ordinal\": 1, \"standardCode\": \"...\", \"rigor\": 1, \
\"justification\": \"...\", \"confidence\": 0.0}]}";

/// User content for pass 1. With the file-attachment strategy the document
/// rides alongside as an attachment part and `text` is None.
pub fn extraction_user_content(text: Option<&str>) -> String {
    match text {
        Some(text) => format!(
            "Extract every question from the following assessment document \
             text.\n\n---\n{text}\n---"
        ),
        None => "Extract every question from the attached assessment document.".to_string(),
    }
}

/// User content for pass 2: the pass-1 items as JSON plus the classification
/// context (course, jurisdictions, permitted vocabulary when known).
pub fn classification_user_content(
    items: &[ExtractedItem],
    course: Option<&str>,
    jurisdictions: &[String],
    vocabulary: Option<&VocabularySet>,
) -> String {
    let mut content = String::new();

    if let Some(course) = course {
        content.push_str(&format!("Course: {course}\n"));
    }
    if !jurisdictions.is_empty() {
        content.push_str(&format!(
            "Standards jurisdictions: {}\n",
            jurisdictions.join(", ")
        ));
    }
    match vocabulary {
        Some(vocabulary) => {
            content.push_str(&format!(
                "Permitted standard codes for {} ({}). Use ONLY these codes, or \
                 {OUT_OF_SCOPE} when none fits:\n",
                vocabulary.course, vocabulary.jurisdiction
            ));
            for code in &vocabulary.codes {
                content.push_str(&format!("- {code}\n"));
            }
        }
        None => {
            content.push_str(
                "No permitted standards list is configured; use the official \
                 published standards of the jurisdictions above.\n",
            );
        }
    }

    content.push_str("\nQuestions to classify:\n");
    // Serialization of plain structs with string/integer fields cannot fail.
    content.push_str(&serde_json::to_string_pretty(items).unwrap_or_default());
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn items() -> Vec<ExtractedItem> {
        vec![ExtractedItem {
            ordinal: 1,
            instruction_text: "What is 7 x 8?".into(),
        }]
    }

    #[test]
    fn classification_content_lists_vocabulary_codes() {
        let vocabulary = VocabularySet {
            jurisdiction: "CCSS".into(),
            course: "Grade 3 Math".into(),
            codes: BTreeSet::from(["3.OA.C.7".to_string(), "3.NBT.A.2".to_string()]),
        };

        let content = classification_user_content(
            &items(),
            Some("Grade 3 Math"),
            &["CCSS".to_string()],
            Some(&vocabulary),
        );

        assert!(content.contains("Course: Grade 3 Math"));
        assert!(content.contains("- 3.OA.C.7"));
        assert!(content.contains("- 3.NBT.A.2"));
        assert!(content.contains("OUT_OF_SCOPE"));
        assert!(content.contains("\"instructionText\": \"What is 7 x 8?\""));
    }

    #[test]
    fn classification_content_without_vocabulary_defers_to_jurisdictions() {
        let content = classification_user_content(&items(), None, &["CCSS".to_string()], None);
        assert!(!content.contains("Permitted standard codes"));
        assert!(content.contains("No permitted standards list"));
        assert!(content.contains("Questions to classify:"));
    }

    #[test]
    fn extraction_content_embeds_text_when_present() {
        assert!(extraction_user_content(Some("Q1. Define osmosis.")).contains("Define osmosis"));
        assert!(extraction_user_content(None).contains("attached"));
    }
}
