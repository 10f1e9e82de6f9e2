// Pipeline processing: cleaning, deduplication, concatenation and the dimensional model

pub mod concat;
pub mod dedupe;
pub mod dimension;
pub mod fact;
pub mod normalize;

pub use concat::{concat, parse_date_column};
pub use dedupe::keep_highest;
pub use dimension::{build_dimension, Dimension};
pub use fact::{DimensionJoin, DroppedRows, FactBuilder, FactOutput, JoinPolicy};
pub use normalize::ColumnNormalizer;
