//! Fixed analytical queries against the produced schema.
//!
//! Each query runs independently: a failing query (missing table, missing
//! column) is reported as that query's outcome and the next one still runs.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{EtlError, Result};
use crate::pipeline::storage::SqliteStore;

#[derive(Debug, Clone, Copy)]
pub struct VerificationQuery {
    pub title: &'static str,
    pub sql: &'static str,
}

pub const QUERIES: &[VerificationQuery] = &[
    VerificationQuery {
        title: "Total streams per genre",
        sql: "SELECT dg.GenreName AS Genre, SUM(fm.Streams_Thousands) AS Total_Streams \
              FROM fato_musica fm \
              JOIN dim_generos dg ON fm.IdGenre = dg.IdGenre \
              GROUP BY dg.GenreName \
              ORDER BY Total_Streams DESC \
              LIMIT 10",
    },
    VerificationQuery {
        title: "Average streams per genre",
        sql: "SELECT dg.GenreName AS Genre, ROUND(AVG(fm.Streams_Thousands), 2) AS Avg_Streams \
              FROM fato_musica fm \
              JOIN dim_generos dg ON fm.IdGenre = dg.IdGenre \
              GROUP BY dg.GenreName \
              ORDER BY Avg_Streams DESC \
              LIMIT 10",
    },
    VerificationQuery {
        title: "Total streams per artist and year (top 5)",
        sql: "SELECT da.ArtistName AS Artist, fm.ReleaseYear AS Year, SUM(fm.Streams_Thousands) AS Total_Streams \
              FROM fato_musica fm \
              JOIN dim_artistas da ON fm.IdArtist = da.IdArtist \
              GROUP BY da.ArtistName, fm.ReleaseYear \
              ORDER BY Total_Streams DESC \
              LIMIT 5",
    },
    VerificationQuery {
        title: "Anonymized listing (ids only)",
        sql: "SELECT IdTrack, Title, IdArtist, IdGenre, ReleaseYear, Streams_Thousands \
              FROM fato_musica \
              LIMIT 10",
    },
];

/// Rows of one query, already rendered to text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }
        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:>w$}", c, w = *w))
                .collect::<Vec<_>>()
                .join(" ")
        };
        writeln!(f, "{}", line(&self.columns))?;
        for row in &self.rows {
            writeln!(f, "{}", line(row))?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct QueryReport {
    pub title: &'static str,
    pub outcome: std::result::Result<ResultSet, String>,
}

/// Read-only runner for the fixed query set
pub struct Verifier {
    store: SqliteStore,
}

impl Verifier {
    /// Opens `path` read-only; a missing file is reported instead of creating an empty database
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(EtlError::DatabaseMissing(path.to_path_buf()));
        }
        info!("Reading database at {}", path.display());
        Ok(Self {
            store: SqliteStore::open_read_only(path)?,
        })
    }

    pub fn from_store(store: SqliteStore) -> Self {
        Self { store }
    }

    pub fn run_all(&self) -> Vec<QueryReport> {
        QUERIES.iter().map(|q| self.run(q)).collect()
    }

    pub fn run(&self, query: &VerificationQuery) -> QueryReport {
        let outcome = run_query(self.store.connection(), query.sql).map_err(|e| {
            warn!("Query '{}' failed: {}", query.title, e);
            e.to_string()
        });
        QueryReport {
            title: query.title,
            outcome,
        }
    }
}

fn run_query(conn: &Connection, sql: &str) -> rusqlite::Result<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(render(row.get_ref(i)?));
        }
        rows.push(cells);
    }
    Ok(ResultSet { columns, rows })
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "None".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
