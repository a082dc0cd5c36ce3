use serde::{Deserialize, Serialize};

use crate::core::Document;

const DEFAULT_SCHEMA: &str = "plate";
const DEFAULT_VERSION: u32 = 1;

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

fn default_version() -> u32 {
    DEFAULT_VERSION
}

#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    #[error("malformed document json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported schema `{found}` (expected `plate`)")]
    Schema { found: String },
    #[error("unsupported version {found} (newest known is 1)")]
    Version { found: u32 },
}

/// Versioned on-disk wrapper around a [`Document`].
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

    pub fn to_json_pretty(&self) -> Result<String, ValueError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ValueError> {
        let value: Self = serde_json::from_str(s)?;
        if value.schema != DEFAULT_SCHEMA {
            return Err(ValueError::Schema {
                found: value.schema,
            });
        }
        if value.version > DEFAULT_VERSION {
            return Err(ValueError::Version {
                found: value.version,
            });
        }
        Ok(value)
    }
}
