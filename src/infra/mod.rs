pub mod file_source;
pub mod warehouse_sink;

pub use file_source::FileSource;
pub use warehouse_sink::WarehouseSink;
