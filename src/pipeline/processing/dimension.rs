use polars::prelude::*;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::table::Table;

/// A dimension derived from one categorical column.
///
/// Rows are `(attribute, surrogate key)`; keys run 1..=N in the order the
/// values first appear in the source. Null counts as a value of its own.
#[derive(Debug, Clone)]
pub struct Dimension {
    pub attribute: String,
    pub key: String,
    pub table: Table,
}

/// Builds the dimension `name` from the distinct values of `column`.
///
/// `attribute` names the copied natural value and `key` the surrogate key.
/// An absent source column yields an empty dimension, so joins against it
/// match nothing.
#[instrument(skip(source), fields(source = source.name()))]
pub fn build_dimension(
    source: &Table,
    column: &str,
    name: &str,
    attribute: &str,
    key: &str,
) -> Result<Dimension> {
    let frame = if source.has_column(column) {
        source
            .frame()
            .clone()
            .lazy()
            .select([col(column).alias(attribute)])
            .unique_stable(None, UniqueKeepStrategy::First)
            .with_row_index(key, Some(1))
            .select([col(attribute), col(key).cast(DataType::Int64)])
            .collect()?
    } else {
        warn!("Column '{}' absent from {}, {} is empty", column, source.name(), name);
        DataFrame::new(vec![
            Series::new_empty(attribute.into(), &DataType::String).into_column(),
            Series::new_empty(key.into(), &DataType::Int64).into_column(),
        ])?
    };

    info!("Built {} with {} entries", name, frame.height());
    Ok(Dimension {
        attribute: attribute.to_string(),
        key: key.to_string(),
        table: Table::new(name, frame),
    })
}
