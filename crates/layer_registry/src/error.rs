//! Error types for registry lookups, sources, merges, and configuration.

use std::path::PathBuf;

/// Errors surfaced to callers of the registry's lookup and edit operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
	/// No layer is registered under the requested name.
	#[error("unknown layer '{name}'; check the logs, it may not have loaded properly")]
	NotFound { name: String },
}

impl RegistryError {
	pub(crate) fn not_found(name: &str) -> Self {
		Self::NotFound { name: name.to_string() }
	}

	/// Returns true for [`RegistryError::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}

/// Failure reported by a [`LayerSource`](crate::LayerSource) while identifying
/// itself or producing layers.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
	/// The backing store or service could not be reached.
	#[error("source unavailable: {0}")]
	Unavailable(String),
	/// Reading the backing store failed.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
	/// The backing store produced definitions that could not be used.
	#[error("invalid layer definitions: {0}")]
	Invalid(String),
}

/// Failure to merge two definitions that share a layer name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
	/// The definitions describe layers that cannot be combined.
	#[error("cannot merge layer '{layer}': {reason}")]
	Incompatible { layer: String, reason: String },
	/// The existing layer refused the merge.
	#[error("merge rejected: {0}")]
	Rejected(String),
}

/// Errors loading a [`RegistryConfig`](crate::RegistryConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// The config file could not be read.
	#[error("failed to read {}: {source}", path.display())]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	/// The config file is not valid TOML or has unknown keys.
	#[error("config parse error: {0}")]
	Parse(#[from] toml::de::Error),
}
