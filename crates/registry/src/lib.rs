//! Asset registry client.
//!
//! The registry is an external collaborator: it owns asset metadata, the
//! engine only asks "does asset X exist" before accepting readings.

pub mod client;

pub use client::{AssetRegistry, HttpAssetRegistry, StaticRegistry};
