//! Candidate snapshot construction.
//!
//! # Role
//!
//! Loads every configured source into a private candidate mapping. Nothing
//! here touches the published snapshot; the registry publishes the result.
//!
//! # Invariants
//!
//! - A source failure skips that source only.
//! - On a name collision the first definition stays registered and the later
//!   one is merged into it. A failed merge discards the later definition.

use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::layer::{LayerSource, TileLayer};
use crate::report::{LoadWarning, ReloadReport};

/// Layers collected from sources, keyed by name, plus diagnostics.
pub(crate) struct Candidate<L> {
	pub layers: FxHashMap<String, Arc<L>>,
	pub report: ReloadReport,
}

pub(crate) struct CandidateBuilder<'a, L: TileLayer> {
	grid_sets: &'a L::GridSets,
	refresh: bool,
	layers: FxHashMap<String, Arc<L>>,
	warnings: Vec<LoadWarning>,
	sources_loaded: usize,
}

impl<'a, L: TileLayer> CandidateBuilder<'a, L> {
	pub fn new(grid_sets: &'a L::GridSets, refresh: bool) -> Self {
		Self {
			grid_sets,
			refresh,
			layers: FxHashMap::default(),
			warnings: Vec::new(),
			sources_loaded: 0,
		}
	}

	/// Loads one source into the candidate.
	pub fn load_source(&mut self, position: usize, source: &dyn LayerSource<L>) {
		let source_id = match source.identifier() {
			Ok(id) => id,
			Err(error) => {
				self.record(LoadWarning::SourceIdentifier { position, error });
				return;
			}
		};

		let layers = match source.layers(self.refresh) {
			Ok(layers) => layers,
			Err(error) => {
				self.record(LoadWarning::SourceLoad { source_id, error });
				return;
			}
		};

		self.sources_loaded += 1;
		info!(source = %source_id, count = layers.len(), "Adding layers from source");
		if layers.is_empty() {
			self.record(LoadWarning::EmptySource { source_id });
			return;
		}

		for layer in layers {
			debug!(source = %source_id, layer = layer.name(), "Adding layer");
			layer.initialize(self.grid_sets);
			self.merge_insert(&source_id, layer);
		}
	}

	fn merge_insert(&mut self, source_id: &str, layer: Arc<L>) {
		let Some(existing) = self.layers.get(layer.name()) else {
			self.layers.insert(layer.name().to_string(), layer);
			return;
		};
		if Arc::ptr_eq(existing, &layer) {
			return;
		}
		if let Err(error) = existing.merge_with(&layer) {
			self.record(LoadWarning::Merge {
				source_id: source_id.to_string(),
				layer: layer.name().to_string(),
				error,
			});
		}
	}

	fn record(&mut self, warning: LoadWarning) {
		warn!(%warning, "layer load problem");
		self.warnings.push(warning);
	}

	pub fn finish(self, started: Instant) -> Candidate<L> {
		let report = ReloadReport {
			generation: 0,
			layers: self.layers.len(),
			sources_loaded: self.sources_loaded,
			warnings: self.warnings,
			elapsed: started.elapsed(),
		};
		Candidate { layers: self.layers, report }
	}
}

/// Loads all `sources` in order into a fresh candidate.
pub(crate) fn build_candidate<L: TileLayer>(grid_sets: &L::GridSets, sources: &[Arc<dyn LayerSource<L>>], refresh: bool) -> Candidate<L> {
	let started = Instant::now();
	let mut builder = CandidateBuilder::new(grid_sets, refresh);
	for (position, source) in sources.iter().enumerate() {
		builder.load_source(position, source.as_ref());
	}
	builder.finish(started)
}
