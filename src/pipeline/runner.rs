use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, info_span, instrument};
use uuid::Uuid;

use crate::app::ports::{SinkReceipt, TableSink, TabularSource};
use crate::app::{CommercialUseCase, FamilyReport, MusicalUseCase};
use crate::config::Config;
use crate::error::Result;
use crate::infra::{FileSource, WarehouseSink};
use crate::pipeline::processing::DroppedRows;

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub elapsed_secs: f64,
    pub database_path: PathBuf,
    pub curated_dir: PathBuf,
    pub tables: Vec<SinkReceipt>,
    pub dropped_rows: Vec<DroppedRows>,
}

/// Runs every dataset family in order against one source and one sink.
/// The first error stops the run; tables already written stay written.
pub struct Pipeline<'a> {
    config: &'a Config,
    source: &'a dyn TabularSource,
    sink: &'a dyn TableSink,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, source: &'a dyn TabularSource, sink: &'a dyn TableSink) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    pub fn run(&self) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("etl_run", run_id = %run_id);
        let _enter = span.enter();

        info!("🚀 Starting ETL run");
        let started = Instant::now();

        let families = [
            CommercialUseCase::new(self.config, self.source, self.sink).run()?,
            MusicalUseCase::new(self.config, self.source, self.sink).run()?,
        ];

        let mut tables = Vec::new();
        let mut dropped_rows = Vec::new();
        for FamilyReport {
            family,
            receipts,
            dropped,
        } in families
        {
            info!("{} family wrote {} table(s)", family, receipts.len());
            tables.extend(receipts);
            dropped_rows.extend(dropped);
        }

        let elapsed_secs = started.elapsed().as_secs_f64();
        info!("ETL run finished in {:.2}s", elapsed_secs);

        Ok(RunSummary {
            run_id,
            elapsed_secs,
            database_path: self.config.paths.database.clone(),
            curated_dir: self.config.paths.curated_dir.clone(),
            tables,
            dropped_rows,
        })
    }
}

/// Wires the file source and the SQLite/CSV sink from `config` and runs the pipeline
#[instrument(skip_all, fields(database = %config.paths.database.display()))]
pub fn run_with_config(config: &Config) -> Result<RunSummary> {
    let source = FileSource::from_config(&config.etl)?;
    let sink = WarehouseSink::open(&config.paths.database, &config.paths.curated_dir)?;
    Pipeline::new(config, &source, &sink).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{MemorySource, RecordingSink};
    use crate::pipeline::processing::JoinPolicy;
    use crate::table::Table;
    use polars::prelude::*;

    fn seeded(config: &Config) -> MemorySource {
        let mut source = MemorySource::default();
        for file in ["Lojas.xlsx", "Consultores.xlsx", "Metas.xlsx", "Vendas.xlsx", "Vendas_2T.xlsx"] {
            source.insert(
                config.commercial_path(file),
                Table::new(file, df!("IdSeller" => [1i64], "Wage" => [10i64]).unwrap()),
            );
        }
        source.insert(
            config.musical_path("Music Test.csv"),
            Table::new("Music Test", df!("Artist" => ["A"], "Top Genre" => ["Pop"]).unwrap()),
        );
        source
    }

    #[test]
    fn test_families_run_in_order() {
        let config = Config::default();
        let source = seeded(&config);
        let sink = RecordingSink::default();

        let summary = Pipeline::new(&config, &source, &sink).run().unwrap();

        let names: Vec<_> = summary.tables.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "dim_lojas",
                "dim_consultores",
                "fatos_metas",
                "fatos_vendas",
                "dim_artistas",
                "dim_generos",
                "fato_musica",
            ]
        );
        assert_eq!(summary.tables[3].rows, 2);
        assert!(summary.dropped_rows.is_empty());
    }

    #[test]
    fn test_commercial_failure_skips_musical() {
        let config = Config::default();
        let mut source = MemorySource::default();
        source.insert(
            config.musical_path("Music Test.csv"),
            Table::new("Music Test", df!("Artist" => ["A"]).unwrap()),
        );
        let sink = RecordingSink::default();

        assert!(Pipeline::new(&config, &source, &sink).run().is_err());
        assert!(sink.written().is_empty());
    }

    #[test]
    fn test_summary_serializes_for_json_output() {
        let mut config = Config::default();
        config.etl.join_policy = JoinPolicy::Report;
        let mut source = seeded(&config);
        source.insert(
            config.musical_path("Music Test.csv"),
            Table::new("Music Test", df!("Artist" => ["A", "B"]).unwrap()),
        );
        let sink = RecordingSink::default();

        let summary = Pipeline::new(&config, &source, &sink).run().unwrap();
        let json = serde_json::to_value(&summary).unwrap();

        let object = json.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["curated_dir", "database_path", "dropped_rows", "elapsed_secs", "run_id", "tables"]
        );
        assert_eq!(json["run_id"], summary.run_id.to_string());
        assert!(json["elapsed_secs"].is_f64());
        assert_eq!(json["database_path"], "analytics.db");

        let first = &json["tables"][0];
        assert_eq!(first["table"], "dim_lojas");
        assert_eq!(first["rows"], 1);
        assert!(first["curated_path"].is_null());
        assert_eq!(json["tables"].as_array().unwrap().len(), 7);

        assert_eq!(
            json["dropped_rows"],
            serde_json::json!([{ "fact": "fato_musica", "dimension": "dim_generos", "count": 2 }])
        );
    }
}
