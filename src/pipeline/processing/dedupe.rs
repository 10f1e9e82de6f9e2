use polars::prelude::*;
use tracing::{info, instrument};

use crate::error::Result;
use crate::table::Table;

/// Keeps one row per identity value: the one with the highest ordering value.
///
/// Rows are stable-sorted by `order_by` descending (nulls and non-numeric
/// values last), then the first row per `identity` wins. Ties therefore go to
/// the row that came first in the input. The output stays in sorted order.
#[instrument(skip(table), fields(table = table.name()))]
pub fn keep_highest(table: Table, order_by: &str, identity: &str) -> Result<Table> {
    table.require_column(order_by)?;
    table.require_column(identity)?;

    let before = table.row_count();
    let (name, frame) = table.into_parts();

    let sort = SortMultipleOptions::default()
        .with_order_descending(true)
        .with_nulls_last(true)
        .with_maintain_order(true);
    let frame = frame
        .lazy()
        .sort_by_exprs([col(order_by).cast(DataType::Float64)], sort)
        .unique_stable(Some(vec![identity.into()]), UniqueKeepStrategy::First)
        .collect()?;

    info!("Deduplicated {} on {}: {} -> {} rows", name, identity, before, frame.height());
    Ok(Table::new(name, frame))
}
