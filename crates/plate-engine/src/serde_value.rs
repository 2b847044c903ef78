use serde::{Deserialize, Serialize};

use crate::core::Document;

pub const PLATE_SCHEMA: &str = "plate-engine";
pub const PLATE_VERSION: u32 = 1;

fn default_schema() -> String {
    PLATE_SCHEMA.to_string()
}

fn default_version() -> u32 {
    PLATE_VERSION
}

#[derive(Debug, thiserror::Error)]
pub enum PlateValueError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported schema {0:?}")]
    UnsupportedSchema(String),
    #[error("unsupported version {found}")]
    UnsupportedVersion { found: u32 },
}

/// Persisted form of a document: the tree plus a schema id and version so a
/// host can tell whether it can read what it stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateValue {
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_version")]
    pub version: u32,
    pub document: Document,
}

impl PlateValue {
    pub fn from_document(document: Document) -> Self {
        Self {
            schema: default_schema(),
            version: default_version(),
            document,
        }
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn to_json_pretty(&self) -> Result<String, PlateValueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and checks the envelope. Missing schema/version fields take
    /// the current defaults.
    pub fn from_json_str(s: &str) -> Result<Self, PlateValueError> {
        let value: Self = serde_json::from_str(s)?;
        if value.schema != PLATE_SCHEMA {
            return Err(PlateValueError::UnsupportedSchema(value.schema));
        }
        if value.version > PLATE_VERSION {
            return Err(PlateValueError::UnsupportedVersion {
                found: value.version,
            });
        }
        Ok(value)
    }
}
