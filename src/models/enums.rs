use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(DocumentStatus {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

/// Media type of an uploaded document. Stored as the raw MIME string;
/// anything outside the known set round-trips through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Pdf,
    Docx,
    PlainText,
    Other(String),
}

impl MediaType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::PlainText => "text/plain",
            Self::Other(mime) => mime,
        }
    }

    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "application/pdf" => Self::Pdf,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            | "application/msword" => Self::Docx,
            "text/plain" => Self::PlainText,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Three-level cognitive-complexity scale assigned to each question.
///
/// Wire formats accepted from the oracle: numeric `1|2|3` or the labels
/// `mild|medium|spicy`. Anything else is a validation failure, never a
/// silent coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RigorLevel {
    Recall,
    Application,
    Reasoning,
}

impl RigorLevel {
    pub fn level(self) -> i64 {
        match self {
            Self::Recall => 1,
            Self::Application => 2,
            Self::Reasoning => 3,
        }
    }

    pub fn from_level(level: i64) -> Option<Self> {
        match level {
            1 => Some(Self::Recall),
            2 => Some(Self::Application),
            3 => Some(Self::Reasoning),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Recall => "recall",
            Self::Application => "application",
            Self::Reasoning => "reasoning",
        }
    }

    /// Spelled-out scale some prompt generations use instead of digits.
    pub fn from_wire_label(label: &str) -> Option<Self> {
        match label {
            "mild" => Some(Self::Recall),
            "medium" => Some(Self::Application),
            "spicy" => Some(Self::Reasoning),
            _ => None,
        }
    }
}
