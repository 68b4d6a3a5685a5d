//! Concurrent tile layer registry.
//!
//! This crate keeps the authoritative mapping from layer name to live layer
//! for a tile server:
//! - [`LayerRegistry`]: lock-free lookups over an atomically published snapshot,
//!   full rebuilds from [`LayerSource`]s, and add/remove/update edits
//! - [`LayerSnapshot`]: immutable name to layer view handed to readers
//! - [`TileLayer`] / [`LayerSource`]: capabilities supplied by the embedding server
//! - [`ReloadReport`]: warnings collected while rebuilding
//! - [`RegistryConfig`]: edit ordering policy and reload behavior

pub mod config;
pub mod error;
pub mod layer;
mod rebuild;
pub mod registry;
pub mod report;
pub mod snapshot;

pub use config::{EditPolicy, RegistryConfig};
pub use error::{ConfigError, MergeError, RegistryError, SourceError};
pub use layer::{LayerLock, LayerLockGuard, LayerSource, StaticSource, TileLayer};
pub use registry::{AddOutcome, LayerRegistry};
pub use report::{LoadWarning, ReloadReport};
pub use snapshot::LayerSnapshot;
