//! Vocabulary enforcement: when the classroom has a permitted standards
//! list, any code the oracle invented outside it is rewritten to the
//! OUT_OF_SCOPE sentinel rather than surfaced to the teacher.

use tracing::warn;

use crate::models::{VocabularySet, OUT_OF_SCOPE};

use super::types::ClassifiedItem;

/// Rewrite out-of-vocabulary codes in place, returning the rewrite count.
pub fn enforce_vocabulary(items: &mut [ClassifiedItem], vocabulary: &VocabularySet) -> usize {
    let mut rewrites = 0;
    for item in items.iter_mut() {
        if !vocabulary.permits(&item.standard_code) {
            warn!(
                ordinal = item.ordinal,
                standard_code = %item.standard_code,
                jurisdiction = %vocabulary.jurisdiction,
                "Standard code outside permitted vocabulary, rewriting to {OUT_OF_SCOPE}"
            );
            item.standard_code = OUT_OF_SCOPE.to_string();
            rewrites += 1;
        }
    }
    rewrites
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RigorLevel;
    use std::collections::BTreeSet;

    fn vocabulary() -> VocabularySet {
        VocabularySet {
            jurisdiction: "CCSS".into(),
            course: "Grade 3 Math".into(),
            codes: BTreeSet::from(["3.OA.C.7".to_string()]),
        }
    }

    fn item(code: &str) -> ClassifiedItem {
        ClassifiedItem {
            ordinal: 1,
            instruction_text: "Q".into(),
            standard_code: code.into(),
            rigor: RigorLevel::Recall,
            justification: None,
            confidence: None,
        }
    }

    #[test]
    fn rewrites_codes_outside_the_vocabulary() {
        let mut items = vec![item("3.OA.C.7"), item("9.XX.Y.1")];
        let rewrites = enforce_vocabulary(&mut items, &vocabulary());

        assert_eq!(rewrites, 1);
        assert_eq!(items[0].standard_code, "3.OA.C.7");
        assert_eq!(items[1].standard_code, OUT_OF_SCOPE);
    }

    #[test]
    fn sentinel_itself_is_always_permitted() {
        let mut items = vec![item(OUT_OF_SCOPE)];
        assert_eq!(enforce_vocabulary(&mut items, &vocabulary()), 0);
    }
}
