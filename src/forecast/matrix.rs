//! Forecast request builder: snapshot + schema + horizon → exogenous matrix.
//!
//! Reindexing is lossy. Snapshot keys unknown to the
//! schema are dropped, schema columns missing from the snapshot are filled
//! with zero. The model only ever sees what it was trained on.
//!
//! Every row is a copy of the same snapshot: this is a static-feature
//! forecast, not a feature trajectory.

use serde::Serialize;

use super::request::{FeatureSnapshot, ValidationError};
use crate::artifact::FeatureSchema;

/// Dense row-major matrix with named columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Assemble a matrix from explicit rows. Returns `None` when a row's
    /// width disagrees with the column count.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Option<Self> {
        if rows.iter().any(|r| r.len() != columns.len()) {
            return None;
        }
        Some(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Value at (`row`, `column` name), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[idx])
    }
}

/// Materialize `horizon` identical rows aligned to `schema`.
///
/// Categorical snapshot fields only reach the matrix through one-hot schema
/// columns named `<field>_<value>`.
pub fn build_matrix(
    snapshot: &FeatureSnapshot,
    schema: &FeatureSchema,
    horizon: usize,
) -> Result<FeatureMatrix, ValidationError> {
    if horizon == 0 {
        return Err(ValidationError::OutOfRange {
            field: "steps",
            reason: "forecast horizon must be at least 1 day".into(),
        });
    }

    let mut zero_filled = Vec::new();

    let row: Vec<f64> = schema
        .columns()
        .iter()
        .map(|column| {
            if let Some(value) = snapshot.numeric(column) {
                return value;
            }
            match snapshot.one_hot(column) {
                Some(true) => 1.0,
                Some(false) => 0.0,
                None => {
                    zero_filled.push(column.as_str());
                    0.0
                }
            }
        })
        .collect();

    let dropped: Vec<&str> = snapshot
        .numeric_names()
        .filter(|name| !schema.contains(name))
        .collect();

    if !snapshot_intersects(snapshot, schema) {
        tracing::warn!(
            schema_columns = schema.len(),
            snapshot_fields = snapshot.len(),
            "no snapshot feature matches the model schema; forecasting on an all-zero input"
        );
    }
    if !dropped.is_empty() {
        tracing::debug!(?dropped, "snapshot features not in schema were dropped");
    }
    if !zero_filled.is_empty() {
        tracing::debug!(?zero_filled, "schema columns absent from snapshot were zero-filled");
    }

    Ok(FeatureMatrix {
        columns: schema.columns().to_vec(),
        rows: vec![row; horizon],
    })
}

/// Whether any snapshot field has a counterpart in `schema`: a numeric
/// column of the same name, or a categorical field that is itself a column
/// or prefixes one-hot columns `<field>_*`.
pub(crate) fn snapshot_intersects(snapshot: &FeatureSnapshot, schema: &FeatureSchema) -> bool {
    if snapshot.numeric_names().any(|name| schema.contains(name)) {
        return true;
    }
    snapshot.categorical_names().any(|field| {
        schema.columns().iter().any(|column| {
            column == field
                || column
                    .strip_prefix(field)
                    .is_some_and(|rest| rest.starts_with('_'))
        })
    })
}
