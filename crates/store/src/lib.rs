//! Storage engine for the rollup engine.
//!
//! Owns the three stateful pieces behind one atomic-commit seam:
//! - raw readings, unique per (asset_id, timestamp), last-write-wins
//! - aggregate points per (asset_id, resolution, bucket_start)
//! - the dirty-range queue with overlap merging and exclusive claims
//!
//! `MemoryStore` is the in-process implementation; the `Store` trait is the
//! seam tests and future backends plug into.

pub mod memory;
pub mod ranges;
pub mod store;

pub use memory::MemoryStore;
pub use store::{BatchCommit, CommitOutcome, DirtyClaim, NewReading, Store};
