// Persistence: relational store plus flat curated exports

pub mod curated;
pub mod sqlite;

pub use curated::export_csv;
pub use sqlite::SqliteStore;
