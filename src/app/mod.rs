pub mod commercial_use_case;
pub mod musical_use_case;
pub mod ports;

#[cfg(test)]
pub(crate) mod testing;

pub use commercial_use_case::CommercialUseCase;
pub use musical_use_case::MusicalUseCase;

use crate::app::ports::SinkReceipt;
use crate::pipeline::processing::DroppedRows;

/// Outcome of one dataset family
#[derive(Debug, Clone, Default)]
pub struct FamilyReport {
    pub family: &'static str,
    pub receipts: Vec<SinkReceipt>,
    pub dropped: Vec<DroppedRows>,
}

impl FamilyReport {
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }
}
