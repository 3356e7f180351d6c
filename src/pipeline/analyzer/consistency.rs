//! Consistency enforcement: identical instruction text must carry an
//! identical classification. The first classification seen for a given
//! normalized text wins and overwrites later divergent ones.

use std::collections::HashMap;

use tracing::debug;

use crate::models::RigorLevel;

use super::types::ClassifiedItem;

/// Lowercase and collapse runs of whitespace so trivial formatting
/// differences do not defeat duplicate detection.
pub fn normalize_instruction(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Default)]
pub struct ConsistencyMap {
    first_seen: HashMap<String, (String, RigorLevel)>,
}

impl ConsistencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unify classifications across duplicate questions, returning how
    /// many items were overwritten.
    pub fn enforce(&mut self, items: &mut [ClassifiedItem]) -> usize {
        let mut overwritten = 0;
        for item in items.iter_mut() {
            let key = normalize_instruction(&item.instruction_text);
            match self.first_seen.get(&key) {
                Some((standard_code, rigor)) => {
                    if item.standard_code != *standard_code || item.rigor != *rigor {
                        debug!(
                            ordinal = item.ordinal,
                            from_code = %item.standard_code,
                            to_code = %standard_code,
                            "Unifying divergent classification of duplicate question"
                        );
                        item.standard_code = standard_code.clone();
                        item.rigor = *rigor;
                        overwritten += 1;
                    }
                }
                None => {
                    self.first_seen
                        .insert(key, (item.standard_code.clone(), item.rigor));
                }
            }
        }
        overwritten
    }
}
