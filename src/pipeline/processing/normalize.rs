use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::table::{unique_column_names, Table};

/// Cleans column names and text cells of a freshly read table.
///
/// Column names lose surrounding whitespace; when an artifact substring is
/// configured (e.g. a doubled delimiter `;;`) it is removed from names and from
/// every text cell. Other characters and non-text columns are untouched.
#[derive(Debug, Clone, Default)]
pub struct ColumnNormalizer {
    artifact: Option<String>,
}

impl ColumnNormalizer {
    /// Name trimming only
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact(artifact: impl Into<String>) -> Self {
        let artifact = artifact.into();
        Self {
            artifact: (!artifact.is_empty()).then_some(artifact),
        }
    }

    pub fn normalize(&self, table: Table) -> Result<Table> {
        let (name, mut frame) = table.into_parts();

        let cleaned = unique_column_names(
            frame
                .get_column_names()
                .iter()
                .map(|c| self.clean_name(c))
                .collect(),
        );
        frame.set_column_names(cleaned)?;

        let Some(artifact) = &self.artifact else {
            return Ok(Table::new(name, frame));
        };

        let text_columns: Vec<Expr> = frame
            .get_columns()
            .iter()
            .filter(|c| c.dtype() == &DataType::String)
            .map(|c| {
                col(c.name().clone())
                    .str()
                    .replace_all(lit(artifact.as_str()), lit(""), true)
            })
            .collect();
        if text_columns.is_empty() {
            return Ok(Table::new(name, frame));
        }

        debug!(table = %name, columns = text_columns.len(), "removing artifact from text columns");
        let frame = frame.lazy().with_columns(text_columns).collect()?;
        Ok(Table::new(name, frame))
    }

    fn clean_name(&self, name: &str) -> String {
        let trimmed = name.trim();
        match &self.artifact {
            Some(artifact) => trimmed.replace(artifact.as_str(), "").trim().to_string(),
            None => trimmed.to_string(),
        }
    }
}
