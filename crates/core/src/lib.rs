//! Core types, bucket math, and batch validation for the rollup engine.

pub mod batch;
pub mod error;
pub mod limits;
pub mod resolution;
pub mod types;

pub use batch::{read_batch, AssetGroup, ColumnarBatch, ValidReading, ValidatedBatch};
pub use error::{Error, Result, RowViolation};
pub use resolution::Resolution;
pub use types::{AggregatePoint, AssetId, DirtyRange, RawReading, TimeRange};
