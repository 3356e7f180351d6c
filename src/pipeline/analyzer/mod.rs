pub mod consistency;
pub mod prompt;
pub mod two_pass;
pub mod types;
pub mod validator;
pub mod vocabulary;

pub use consistency::*;
pub use two_pass::*;
pub use types::*;
pub use validator::*;
pub use vocabulary::*;

use thiserror::Error;

use crate::oracle::OracleError;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Oracle call failed: {0}")]
    Oracle(#[from] OracleError),

    /// Pass-1 output failed schema validation. Fatal to the whole analysis
    /// call: extraction errors corrupt everything downstream, so there is
    /// no repair at this stage.
    #[error("Extraction output rejected: {0}")]
    ExtractionSchema(String),

    /// Pass-2 output failed schema validation or left a pass-1 item
    /// without a classification.
    #[error("Classification output rejected: {0}")]
    ClassificationSchema(String),
}
