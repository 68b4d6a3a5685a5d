//! Layer registry with atomic snapshot publication.
//!
//! # Role
//!
//! [`LayerRegistry`] owns the current [`LayerSnapshot`] and is the only place
//! that publishes a new one. Serving threads read through [`LayerRegistry::lookup`]
//! and [`LayerRegistry::snapshot`]; admin paths call [`LayerRegistry::reinit`]
//! and the structural edits.
//!
//! # Concurrency
//!
//! - `current`: `ArcSwap`; readers do a single atomic load and never lock.
//! - `edit_lock`: serializes the load-modify-store of edits and the publish
//!   step of a rebuild, so neither overwrites the other's snapshot unseen.
//! - `rebuild_lock`: one rebuild at a time. Source I/O runs under it, never
//!   under `edit_lock` unless [`EditPolicy::Serialized`] is configured.
//! - Remove and update also hold the affected layer's [`LayerLock`](crate::LayerLock)
//!   while detaching it.
//!
//! # Invariants
//!
//! - Readers observe either the complete old or the complete new snapshot.
//! - Under [`EditPolicy::Concurrent`] an edit made while a rebuild is loading
//!   sources is lost when the rebuild publishes. Rebuilds start from the
//!   sources, not from the current snapshot.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::{EditPolicy, RegistryConfig};
use crate::error::{MergeError, RegistryError};
use crate::layer::{LayerSource, TileLayer};
use crate::rebuild::build_candidate;
use crate::report::ReloadReport;
use crate::snapshot::LayerSnapshot;

/// Result of [`LayerRegistry::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
	/// The name was free; the layer is now registered.
	Inserted,
	/// The name was taken; the layer was merged into the registered one.
	Merged,
	/// This exact layer object was already registered.
	Unchanged,
	/// The name was taken and the registered layer refused the merge.
	Rejected(MergeError),
}

/// Authoritative mapping from layer name to live layer.
pub struct LayerRegistry<L: TileLayer> {
	grid_sets: Arc<L::GridSets>,
	sources: Vec<Arc<dyn LayerSource<L>>>,
	config: RegistryConfig,
	current: ArcSwap<LayerSnapshot<L>>,
	last_report: ArcSwap<ReloadReport>,
	edit_lock: Mutex<()>,
	rebuild_lock: Mutex<()>,
}

impl<L: TileLayer> LayerRegistry<L> {
	/// Creates a registry and loads all sources before returning.
	///
	/// Construction cannot fail; problems are in [`LayerRegistry::last_report`].
	pub fn new(grid_sets: Arc<L::GridSets>, sources: Vec<Arc<dyn LayerSource<L>>>) -> Self {
		Self::with_config(grid_sets, sources, RegistryConfig::default())
	}

	pub fn with_config(grid_sets: Arc<L::GridSets>, sources: Vec<Arc<dyn LayerSource<L>>>, config: RegistryConfig) -> Self {
		let registry = Self {
			grid_sets,
			sources,
			config,
			current: ArcSwap::from_pointee(LayerSnapshot::empty()),
			last_report: ArcSwap::from_pointee(ReloadReport::default()),
			edit_lock: Mutex::new(()),
			rebuild_lock: Mutex::new(()),
		};
		registry.reinit();
		registry
	}

	/// Returns the layer registered under `name`.
	#[inline]
	pub fn lookup(&self, name: &str) -> Result<Arc<L>, RegistryError> {
		self.current.load().get(name).cloned().ok_or_else(|| RegistryError::not_found(name))
	}

	/// Returns the current snapshot. It does not track later changes.
	pub fn snapshot(&self) -> Arc<LayerSnapshot<L>> {
		self.current.load_full()
	}

	pub fn contains(&self, name: &str) -> bool {
		self.current.load().contains(name)
	}

	pub fn len(&self) -> usize {
		self.current.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Sorted names in the current snapshot.
	pub fn names(&self) -> Vec<String> {
		self.current.load().names().into_iter().map(str::to_string).collect()
	}

	pub fn generation(&self) -> u64 {
		self.current.load().generation()
	}

	pub fn config(&self) -> &RegistryConfig {
		&self.config
	}

	/// Report from the most recent rebuild, including the one run at construction.
	pub fn last_report(&self) -> Arc<ReloadReport> {
		self.last_report.load_full()
	}

	/// Rebuilds the layer set from all sources and publishes it.
	///
	/// Readers keep seeing the previous snapshot until the swap. Source and
	/// merge failures are returned as warnings.
	pub fn reinit(&self) -> Arc<ReloadReport> {
		let _rebuild = self.rebuild_lock.lock();
		let held = match self.config.edit_policy {
			EditPolicy::Serialized => Some(self.edit_lock.lock()),
			EditPolicy::Concurrent => None,
		};

		info!(sources = self.sources.len(), "Rebuilding layer registry");
		let candidate = build_candidate(&*self.grid_sets, &self.sources, self.config.refresh_on_reload);

		let _edit = held.unwrap_or_else(|| self.edit_lock.lock());
		let generation = self.current.load().generation() + 1;
		self.current.store(Arc::new(LayerSnapshot::from_layers(candidate.layers, generation)));

		let report = Arc::new(ReloadReport { generation, ..candidate.report });
		self.last_report.store(Arc::clone(&report));
		info!(
			generation,
			layers = report.layers,
			sources = report.sources_loaded,
			warnings = report.warnings.len(),
			elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
			"Layer registry published"
		);
		report
	}

	/// Registers `layer`, merging it into an existing layer of the same name.
	pub fn add(&self, layer: Arc<L>) -> AddOutcome {
		let _edit = self.edit_lock.lock();
		let current = self.current.load_full();

		let Some(existing) = current.get(layer.name()) else {
			let next = current.with_layer(Arc::clone(&layer));
			debug!(layer = layer.name(), generation = next.generation(), "Layer added");
			self.current.store(Arc::new(next));
			return AddOutcome::Inserted;
		};
		if Arc::ptr_eq(existing, &layer) {
			return AddOutcome::Unchanged;
		}
		match existing.merge_with(&layer) {
			Ok(()) => {
				debug!(layer = layer.name(), "Layer merged into existing definition");
				AddOutcome::Merged
			}
			Err(error) => {
				warn!(layer = layer.name(), %error, "Layer merge rejected");
				AddOutcome::Rejected(error)
			}
		}
	}

	/// Unregisters `name` and returns the layer that was registered under it.
	pub fn remove(&self, name: &str) -> Result<Arc<L>, RegistryError> {
		let (_edit, current, previous) = self.locked_entry(name)?;
		let next = current.without(name);
		{
			let _layer = previous.layer_lock().acquire();
			debug!(layer = name, generation = next.generation(), "Layer removed");
			self.current.store(Arc::new(next));
		}
		Ok(previous)
	}

	/// Replaces the layer registered under `layer`'s name and returns the old one.
	pub fn update(&self, layer: Arc<L>) -> Result<Arc<L>, RegistryError> {
		let (_edit, current, previous) = self.locked_entry(layer.name())?;
		let next = current.with_layer(Arc::clone(&layer));
		{
			let _layer = previous.layer_lock().acquire();
			debug!(layer = layer.name(), generation = next.generation(), "Layer updated");
			self.current.store(Arc::new(next));
		}
		Ok(previous)
	}

	/// Takes the edit lock and resolves `name` in the snapshot it protects.
	fn locked_entry(&self, name: &str) -> Result<(MutexGuard<'_, ()>, Arc<LayerSnapshot<L>>, Arc<L>), RegistryError> {
		let edit = self.edit_lock.lock();
		let current = self.current.load_full();
		let previous = current.get(name).cloned().ok_or_else(|| RegistryError::not_found(name))?;
		Ok((edit, current, previous))
	}
}
