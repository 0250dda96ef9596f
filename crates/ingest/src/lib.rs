//! Request-path services: the ingestion coordinator and the query service.

pub mod coordinator;
pub mod query;

pub use coordinator::{CoordinatorConfig, IngestOutcome, IngestionCoordinator};
pub use query::{QueryPoint, QueryService};
