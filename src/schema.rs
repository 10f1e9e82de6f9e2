//! Per-dataset column declarations.
//!
//! Each source table lists the columns later stages rely on and what happens
//! when one is absent: `Required` aborts the run, `JoinKey` lets the
//! dimension come out empty and the join match nothing, `Optional` drops the
//! dependent output column.

use tracing::{debug, warn};

use crate::constants::columns;
use crate::error::{EtlError, Result};
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    JoinKey,
    Optional,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub presence: Presence,
}

const fn required(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        presence: Presence::Required,
    }
}

const fn join_key(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        presence: Presence::JoinKey,
    }
}

const fn optional(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        presence: Presence::Optional,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub dataset: &'static str,
    pub columns: &'static [ColumnSpec],
}

impl TableSchema {
    /// Fails on the first missing required column; optional gaps are only logged
    pub fn check(&self, table: &Table) -> Result<()> {
        for spec in self.columns {
            if table.has_column(spec.name) {
                continue;
            }
            match spec.presence {
                Presence::Required => {
                    return Err(EtlError::MissingColumn {
                        table: table.name().to_string(),
                        column: spec.name.to_string(),
                    })
                }
                Presence::JoinKey => {
                    warn!(
                        dataset = self.dataset,
                        column = spec.name,
                        "join key absent, dependent fact rows will not match"
                    );
                }
                Presence::Optional => {
                    debug!(dataset = self.dataset, column = spec.name, "optional column absent");
                }
            }
        }
        Ok(())
    }
}

pub const STORES: TableSchema = TableSchema {
    dataset: "stores",
    columns: &[],
};

pub const CONSULTANTS: TableSchema = TableSchema {
    dataset: "consultants",
    columns: &[required(columns::SELLER_ID), required(columns::WAGE)],
};

pub const TARGETS: TableSchema = TableSchema {
    dataset: "targets",
    columns: &[],
};

pub const SALES: TableSchema = TableSchema {
    dataset: "sales",
    columns: &[optional(columns::SALE_DATE)],
};

pub const TRACKS: TableSchema = TableSchema {
    dataset: "tracks",
    columns: &[
        join_key(columns::ARTIST),
        join_key(columns::TOP_GENRE),
        optional("Index"),
        optional("Title"),
        optional("Year"),
        optional("Streams (Thousand)"),
        optional("Energy"),
        optional("Danceability"),
        optional("Loudness (dB)"),
        optional("Liveness"),
        optional("Valence"),
        optional("Length (Duration)"),
        optional("Acousticness"),
        optional("Speechiness"),
        optional("Popularity"),
    ],
};
