use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{EtlError, Result};
use crate::pipeline::processing::dimension::Dimension;
use crate::table::Table;

const SAMPLE_LIMIT: usize = 5;

// Scratch columns, removed before a joined frame leaves this module
const ROW_INDEX: &str = "__etl_row";
const NATURAL_KEY: &str = "__etl_natural_key";

/// What to do with source rows whose natural key has no dimension entry
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum JoinPolicy {
    /// Drop them quietly
    #[default]
    Drop,
    /// Drop them and log a warning with sample values
    Report,
    /// Abort the run
    Fail,
}

/// One join step: source column `source_column` against the dimension's attribute
#[derive(Debug, Clone, Copy)]
pub struct DimensionJoin<'a> {
    pub dimension: &'a Dimension,
    pub source_column: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRows {
    pub fact: String,
    pub dimension: String,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct FactOutput {
    pub table: Table,
    /// Filled under `JoinPolicy::Report`
    pub dropped: Vec<DroppedRows>,
}

struct Unmatched {
    count: usize,
    samples: Vec<String>,
}

/// Replaces natural keys with surrogate keys and projects to the fact schema
#[derive(Debug, Clone, Copy, Default)]
pub struct FactBuilder {
    policy: JoinPolicy,
}

impl FactBuilder {
    pub fn new(policy: JoinPolicy) -> Self {
        Self { policy }
    }

    /// Inner-joins `source` with each dimension in turn, then keeps the
    /// `mapping` columns (source name → output name) in mapping order.
    /// Mapped columns missing from the joined table are left out.
    #[instrument(skip_all, fields(fact = name, rows = source.row_count()))]
    pub fn build(
        &self,
        name: &str,
        source: Table,
        joins: &[DimensionJoin<'_>],
        mapping: &[(&str, &str)],
    ) -> Result<FactOutput> {
        let mut joined = source;
        let mut dropped = Vec::new();

        for join in joins {
            let (next, unmatched) = inner_join(joined, join)?;
            joined = next;
            if unmatched.count == 0 {
                continue;
            }
            let dimension = join.dimension.table.name().to_string();
            match self.policy {
                JoinPolicy::Drop => {
                    debug!("Dropped {} row(s) unmatched in {}", unmatched.count, dimension);
                }
                JoinPolicy::Report => {
                    warn!(
                        "Dropped {} row(s) from {} with no match in {}; e.g. {}",
                        unmatched.count,
                        name,
                        dimension,
                        unmatched.samples.join(", ")
                    );
                    dropped.push(DroppedRows {
                        fact: name.to_string(),
                        dimension,
                        count: unmatched.count,
                    });
                }
                JoinPolicy::Fail => {
                    return Err(EtlError::UnmatchedKeys {
                        dimension,
                        count: unmatched.count,
                    });
                }
            }
        }

        let table = project(name, joined.into_frame(), mapping)?;
        info!("Built {} ({} rows, {} columns)", name, table.row_count(), table.column_count());
        Ok(FactOutput { table, dropped })
    }
}

/// Joins on `source_column = attribute`, null matching null, keeping source
/// row order. Source columns named like the dimension's key or attribute are
/// replaced by the dimension's.
fn inner_join(left: Table, join: &DimensionJoin<'_>) -> Result<(Table, Unmatched)> {
    let dim = join.dimension;
    let (name, mut frame) = left.into_parts();

    for shadowed in [dim.key.as_str(), dim.attribute.as_str()] {
        if shadowed != join.source_column && frame.get_column_index(shadowed).is_some() {
            debug!("Column '{}' in {} replaced by {}", shadowed, name, dim.table.name());
            frame = frame.drop(shadowed)?;
        }
    }

    let Some(source_dtype) = frame
        .column(join.source_column)
        .ok()
        .map(|c| c.dtype().clone())
    else {
        warn!(
            "Join column '{}' absent, no rows match {}",
            join.source_column,
            dim.table.name()
        );
        let unmatched = Unmatched {
            count: frame.height(),
            samples: Vec::new(),
        };
        let mut empty = frame.clear();
        empty.with_column(Series::new_empty(dim.key.as_str().into(), &DataType::Int64))?;
        return Ok((Table::new(name, empty), unmatched));
    };

    let mut right_columns = vec![
        col(dim.attribute.as_str()).cast(source_dtype).alias(NATURAL_KEY),
        col(dim.key.as_str()),
    ];
    if dim.attribute != join.source_column {
        right_columns.push(col(dim.attribute.as_str()));
    }
    let right = dim.table.frame().clone().lazy().select(right_columns);
    let left = frame.with_row_index(ROW_INDEX.into(), None)?.lazy();

    let args = |how: JoinType| JoinArgs {
        join_nulls: true,
        ..JoinArgs::new(how)
    };

    let missing = left
        .clone()
        .join(
            right.clone(),
            [col(join.source_column)],
            [col(NATURAL_KEY)],
            args(JoinType::Anti),
        )
        .select([col(join.source_column)])
        .collect()?;
    let unmatched = Unmatched {
        count: missing.height(),
        samples: (0..missing.height().min(SAMPLE_LIMIT))
            .filter_map(|i| missing.get_columns()[0].get(i).ok().map(|v| v.to_string()))
            .collect(),
    };

    let mut joined = left
        .join(
            right,
            [col(join.source_column)],
            [col(NATURAL_KEY)],
            args(JoinType::Inner),
        )
        .sort_by_exprs([col(ROW_INDEX)], SortMultipleOptions::default())
        .collect()?;
    for scratch in [ROW_INDEX, NATURAL_KEY] {
        if joined.get_column_index(scratch).is_some() {
            joined = joined.drop(scratch)?;
        }
    }

    Ok((Table::new(name, joined), unmatched))
}

fn project(name: &str, joined: DataFrame, mapping: &[(&str, &str)]) -> Result<Table> {
    let (sources, targets): (Vec<&str>, Vec<&str>) = mapping
        .iter()
        .filter(|(src, _)| {
            let present = joined.get_column_index(src).is_some();
            if !present {
                debug!("Column '{}' not available, omitted from {}", src, name);
            }
            present
        })
        .copied()
        .unzip();

    let mut out = joined.select(sources)?;
    out.set_column_names(targets)?;
    Ok(Table::new(name, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::dimension::build_dimension;

    const MAPPING: &[(&str, &str)] = &[
        ("IdArtist", "IdArtist"),
        ("IdGenre", "IdGenre"),
        ("Streams", "Streams_Thousands"),
        ("Missing", "NeverThere"),
    ];

    fn raw(rows: &[(&str, &str, i64)]) -> Table {
        let artists: Vec<&str> = rows.iter().map(|r| r.0).collect();
        let genres: Vec<&str> = rows.iter().map(|r| r.1).collect();
        let streams: Vec<i64> = rows.iter().map(|r| r.2).collect();
        Table::new(
            "Music Test",
            df!("Artist" => artists, "Top Genre" => genres, "Streams" => streams).unwrap(),
        )
    }

    fn dims(source: &Table) -> (Dimension, Dimension) {
        (
            build_dimension(source, "Artist", "dim_artistas", "ArtistName", "IdArtist").unwrap(),
            build_dimension(source, "Top Genre", "dim_generos", "GenreName", "IdGenre").unwrap(),
        )
    }

    #[test]
    fn test_two_artists_two_genres() {
        let source = raw(&[("A", "Pop", 100), ("B", "Rock", 200)]);
        let (artists, genres) = dims(&source);
        let joins = [
            DimensionJoin { dimension: &artists, source_column: "Artist" },
            DimensionJoin { dimension: &genres, source_column: "Top Genre" },
        ];

        let out = FactBuilder::default()
            .build("fato_musica", source, &joins, MAPPING)
            .unwrap();

        assert_eq!(out.table.name(), "fato_musica");
        assert_eq!(out.table.columns(), vec!["IdArtist", "IdGenre", "Streams_Thousands"]);
        assert_eq!(out.table.ints("IdArtist"), vec![Some(1), Some(2)]);
        assert_eq!(out.table.ints("IdGenre"), vec![Some(1), Some(2)]);
        assert_eq!(out.table.ints("Streams_Thousands"), vec![Some(100), Some(200)]);
    }

    #[test]
    fn test_unmatched_row_is_dropped_silently() {
        let known = raw(&[("A", "Pop", 100)]);
        let (artists, genres) = dims(&known);
        let source = raw(&[("A", "Pop", 100), ("Ghost", "Pop", 5)]);
        let joins = [
            DimensionJoin { dimension: &artists, source_column: "Artist" },
            DimensionJoin { dimension: &genres, source_column: "Top Genre" },
        ];

        let out = FactBuilder::new(JoinPolicy::Drop)
            .build("fato_musica", source, &joins, MAPPING)
            .unwrap();

        assert_eq!(out.table.row_count(), 1);
        assert!(out.dropped.is_empty());
        // every foreign key resolves to a dimension row
        let known_keys = artists.table.ints("IdArtist");
        for key in out.table.ints("IdArtist") {
            assert!(known_keys.contains(&key));
        }
    }

    #[test]
    fn test_report_policy_counts_dropped_rows() {
        let known = raw(&[("A", "Pop", 100)]);
        let (artists, _) = dims(&known);
        let source = raw(&[("X", "Pop", 1), ("A", "Pop", 2), ("Y", "Pop", 3)]);
        let joins = [DimensionJoin { dimension: &artists, source_column: "Artist" }];

        let out = FactBuilder::new(JoinPolicy::Report)
            .build("fato_musica", source, &joins, MAPPING)
            .unwrap();

        assert_eq!(out.table.row_count(), 1);
        assert_eq!(
            out.dropped,
            vec![DroppedRows {
                fact: "fato_musica".to_string(),
                dimension: "dim_artistas".to_string(),
                count: 2,
            }]
        );
    }

    #[test]
    fn test_fail_policy_aborts() {
        let known = raw(&[("A", "Pop", 100)]);
        let (artists, _) = dims(&known);
        let source = raw(&[("Z", "Pop", 1)]);
        let joins = [DimensionJoin { dimension: &artists, source_column: "Artist" }];

        let err = FactBuilder::new(JoinPolicy::Fail)
            .build("fato_musica", source, &joins, MAPPING)
            .unwrap_err();
        assert!(matches!(err, EtlError::UnmatchedKeys { count: 1, .. }));
    }

    #[test]
    fn test_null_natural_key_matches_null_entry() {
        let source = Table::new(
            "Music Test",
            df!("Artist" => [Some("A"), None], "Streams" => [1i64, 2]).unwrap(),
        );
        let artists = build_dimension(&source, "Artist", "dim_artistas", "ArtistName", "IdArtist").unwrap();
        let joins = [DimensionJoin { dimension: &artists, source_column: "Artist" }];

        let out = FactBuilder::new(JoinPolicy::Fail)
            .build("fato_musica", source, &joins, MAPPING)
            .unwrap();
        assert_eq!(out.table.ints("IdArtist"), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_dimension_key_replaces_same_named_source_column() {
        let source = Table::new(
            "Music Test",
            df!("Artist" => ["A"], "IdArtist" => [99i64]).unwrap(),
        );
        let artists = build_dimension(&source, "Artist", "dim_artistas", "ArtistName", "IdArtist").unwrap();
        let joins = [DimensionJoin { dimension: &artists, source_column: "Artist" }];

        let out = FactBuilder::default()
            .build("fato_musica", source, &joins, &[("IdArtist", "IdArtist")])
            .unwrap();

        assert_eq!(out.table.columns(), vec!["IdArtist"]);
        assert_eq!(out.table.ints("IdArtist"), vec![Some(1)]);
    }

    #[test]
    fn test_attribute_named_like_the_source_column() {
        let source = raw(&[("A", "Pop", 1), ("B", "Pop", 2)]);
        let artists = build_dimension(&source, "Artist", "dim_artistas", "Artist", "IdArtist").unwrap();
        let joins = [DimensionJoin { dimension: &artists, source_column: "Artist" }];

        let out = FactBuilder::default()
            .build("fato_musica", source, &joins, &[("Artist", "Artist"), ("IdArtist", "IdArtist")])
            .unwrap();

        assert_eq!(out.table.texts("Artist"), vec![Some("A".to_string()), Some("B".to_string())]);
        assert_eq!(out.table.ints("IdArtist"), vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_absent_join_column_yields_no_rows() {
        let known = raw(&[("A", "Pop", 100)]);
        let (artists, _) = dims(&known);
        let source = Table::new("Music Test", df!("Title" => ["Song"]).unwrap());
        let joins = [DimensionJoin { dimension: &artists, source_column: "Artist" }];

        let out = FactBuilder::default()
            .build("fato_musica", source, &joins, &[("Title", "Title"), ("IdArtist", "IdArtist")])
            .unwrap();

        assert!(out.table.is_empty());
        assert_eq!(out.table.columns(), vec!["Title", "IdArtist"]);
    }

    #[test]
    fn test_join_preserves_source_order() {
        let source = raw(&[("B", "Rock", 1), ("A", "Pop", 2), ("B", "Pop", 3)]);
        let (artists, genres) = dims(&source);
        let joins = [
            DimensionJoin { dimension: &artists, source_column: "Artist" },
            DimensionJoin { dimension: &genres, source_column: "Top Genre" },
        ];

        let out = FactBuilder::default()
            .build("fato_musica", source, &joins, MAPPING)
            .unwrap();

        assert_eq!(out.table.ints("Streams_Thousands"), vec![Some(1), Some(2), Some(3)]);
        assert_eq!(out.table.ints("IdArtist"), vec![Some(1), Some(2), Some(1)]);
        assert_eq!(out.table.ints("IdGenre"), vec![Some(1), Some(2), Some(2)]);
    }
}
