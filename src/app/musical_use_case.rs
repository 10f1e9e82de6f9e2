use tracing::{info, instrument};

use crate::app::ports::{TableSink, TabularSource};
use crate::app::FamilyReport;
use crate::config::Config;
use crate::constants::{columns, tables, MUSIC_FACT_COLUMNS};
use crate::error::Result;
use crate::pipeline::processing::{build_dimension, ColumnNormalizer, DimensionJoin, FactBuilder};
use crate::schema;

/// Track listing split into artist and genre dimensions plus a track fact table
pub struct MusicalUseCase<'a> {
    config: &'a Config,
    source: &'a dyn TabularSource,
    sink: &'a dyn TableSink,
}

impl<'a> MusicalUseCase<'a> {
    pub fn new(config: &'a Config, source: &'a dyn TabularSource, sink: &'a dyn TableSink) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    #[instrument(skip(self))]
    pub fn run(&self) -> Result<FamilyReport> {
        println!("\n--- Processing musical data ---");
        let musical = &self.config.musical;
        let mut report = FamilyReport::new("musical");

        let path = self.config.musical_path(&musical.tracks);
        info!("Reading {}", path.display());
        println!("Reading file: {}...", musical.tracks);
        let tracks = ColumnNormalizer::with_artifact(musical.artifact.as_str())
            .normalize(self.source.read(&path)?)?;
        schema::TRACKS.check(&tracks)?;

        let artists = build_dimension(
            &tracks,
            columns::ARTIST,
            tables::DIM_ARTISTS,
            columns::ARTIST_NAME,
            columns::ARTIST_ID,
        )?;
        report.receipts.push(self.sink.write(&artists.table)?);

        let genres = build_dimension(
            &tracks,
            columns::TOP_GENRE,
            tables::DIM_GENRES,
            columns::GENRE_NAME,
            columns::GENRE_ID,
        )?;
        report.receipts.push(self.sink.write(&genres.table)?);

        let joins = [
            DimensionJoin {
                dimension: &artists,
                source_column: columns::ARTIST,
            },
            DimensionJoin {
                dimension: &genres,
                source_column: columns::TOP_GENRE,
            },
        ];
        let fact = FactBuilder::new(self.config.etl.join_policy).build(
            tables::FACT_MUSIC,
            tracks,
            &joins,
            MUSIC_FACT_COLUMNS,
        )?;
        report.receipts.push(self.sink.write(&fact.table)?);
        report.dropped = fact.dropped;

        Ok(report)
    }
}
