//! Rebuild diagnostics.

use std::time::Duration;

use crate::error::{MergeError, SourceError};

/// Non-fatal problem encountered while rebuilding the layer set.
///
/// None of these abort a rebuild; they degrade one source or one layer name.
#[derive(Debug, thiserror::Error)]
pub enum LoadWarning {
	/// The source could not name itself; none of its layers were loaded.
	#[error("configuration source #{position} could not be identified: {error}")]
	SourceIdentifier { position: usize, error: SourceError },
	/// The source failed to produce layers; none of its layers were loaded.
	#[error("failed to add layers from {source_id}: {error}")]
	SourceLoad { source_id: String, error: SourceError },
	/// The source loaded successfully but defined no layers.
	#[error("configuration {source_id} contained no layers")]
	EmptySource { source_id: String },
	/// A second definition of `layer` could not be merged; the first one was kept.
	#[error("layer '{layer}' from {source_id} was discarded: {error}")]
	Merge { source_id: String, layer: String, error: MergeError },
}

impl LoadWarning {
	/// Identifier of the source this warning concerns, if it could be identified.
	pub fn source_id(&self) -> Option<&str> {
		match self {
			Self::SourceIdentifier { .. } => None,
			Self::SourceLoad { source_id, .. } | Self::EmptySource { source_id } | Self::Merge { source_id, .. } => Some(source_id),
		}
	}

	/// Layer name this warning concerns, for merge failures.
	pub fn layer(&self) -> Option<&str> {
		match self {
			Self::Merge { layer, .. } => Some(layer),
			_ => None,
		}
	}
}

/// Outcome of one rebuild.
#[derive(Debug, Default)]
pub struct ReloadReport {
	/// Generation of the snapshot this rebuild published.
	pub generation: u64,
	/// Distinct layer names in the published snapshot.
	pub layers: usize,
	/// Sources that were identified and produced a layer list.
	pub sources_loaded: usize,
	/// Warnings in the order they were encountered.
	pub warnings: Vec<LoadWarning>,
	/// Wall time spent loading and initializing, excluding publication.
	pub elapsed: Duration,
}

impl ReloadReport {
	/// True when the rebuild produced no warnings.
	pub fn is_clean(&self) -> bool {
		self.warnings.is_empty()
	}

	pub fn warnings_for<'a>(&'a self, source_id: &'a str) -> impl Iterator<Item = &'a LoadWarning> + 'a {
		self.warnings.iter().filter(move |w| w.source_id() == Some(source_id))
	}
}
