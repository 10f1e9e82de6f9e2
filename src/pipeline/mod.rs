// Data processing pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod processing;
pub mod runner;
pub mod storage;

pub use runner::{run_with_config, Pipeline, RunSummary};
