use tracing::{info, instrument};

use crate::app::ports::{TableSink, TabularSource};
use crate::app::FamilyReport;
use crate::config::Config;
use crate::constants::{columns, tables};
use crate::error::Result;
use crate::pipeline::processing::{concat, keep_highest, parse_date_column, ColumnNormalizer};
use crate::schema::{self, TableSchema};
use crate::table::Table;

/// Stores, consultants, sales targets and sales
pub struct CommercialUseCase<'a> {
    config: &'a Config,
    source: &'a dyn TabularSource,
    sink: &'a dyn TableSink,
    normalizer: ColumnNormalizer,
}

impl<'a> CommercialUseCase<'a> {
    pub fn new(config: &'a Config, source: &'a dyn TabularSource, sink: &'a dyn TableSink) -> Self {
        Self {
            config,
            source,
            sink,
            normalizer: ColumnNormalizer::new(),
        }
    }

    #[instrument(skip(self))]
    pub fn run(&self) -> Result<FamilyReport> {
        println!("\n--- Processing commercial data ---");
        let files = &self.config.commercial;
        let mut report = FamilyReport::new("commercial");

        let stores = self.load(&files.stores, &schema::STORES)?;
        report.receipts.push(self.sink.write(&stores.with_name(tables::DIM_STORES))?);

        // Sellers listed under several roles keep the best-paid one
        let consultants = self.load(&files.consultants, &schema::CONSULTANTS)?;
        let consultants = keep_highest(consultants, columns::WAGE, columns::SELLER_ID)?
            .with_name(tables::DIM_CONSULTANTS);
        report.receipts.push(self.sink.write(&consultants)?);

        let targets = self.load(&files.targets, &schema::TARGETS)?;
        report.receipts.push(self.sink.write(&targets.with_name(tables::FACT_TARGETS))?);

        let parts = files
            .sales
            .iter()
            .map(|file| self.load(file, &schema::SALES))
            .collect::<Result<Vec<_>>>()?;
        let mut sales = concat(tables::FACT_SALES, parts)?;
        parse_date_column(&mut sales, columns::SALE_DATE)?;
        report.receipts.push(self.sink.write(&sales)?);

        Ok(report)
    }

    fn load(&self, file: &str, schema: &TableSchema) -> Result<Table> {
        let path = self.config.commercial_path(file);
        info!("Reading {}", path.display());
        println!("Reading file: {}...", file);
        let table = self.normalizer.normalize(self.source.read(&path)?)?;
        schema.check(&table)?;
        Ok(table)
    }
}
