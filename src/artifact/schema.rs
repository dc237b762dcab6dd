//! Feature schema: the ordered exogenous columns the model was trained on.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// On-disk schema layout. Older exports wrote a bare array; newer ones
/// wrap it in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaFile {
    Bare(Vec<String>),
    Wrapped { columns: Vec<String> },
}

/// Ordered, duplicate-free list of feature column names.
///
/// Every matrix handed to the model must carry exactly these columns,
/// in this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

/// Why a schema document was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("schema is not valid JSON: {0}")]
    Json(String),
    #[error("schema lists no columns")]
    Empty,
    #[error("schema contains an empty column name at position {0}")]
    BlankColumn(usize),
    #[error("schema lists column '{0}' more than once")]
    Duplicate(String),
}

impl FeatureSchema {
    /// Build a schema from column names, rejecting blanks and duplicates.
    pub fn new<I, S>(columns: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SchemaError::BlankColumn(idx));
            }
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::Duplicate(name.clone()));
            }
        }

        Ok(Self { columns })
    }

    /// Parse the JSON schema manifest.
    pub fn from_json(raw: &str) -> Result<Self, SchemaError> {
        let parsed: SchemaFile =
            serde_json::from_str(raw).map_err(|e| SchemaError::Json(e.to_string()))?;
        match parsed {
            SchemaFile::Bare(columns) | SchemaFile::Wrapped { columns } => Self::new(columns),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}
