//! Immutable name to layer mapping.
//!
//! # Role
//!
//! A [`LayerSnapshot`] is what the registry publishes and what readers hold.
//! It contains no mutation logic visible outside the crate; edits produce a
//! new snapshot with a higher generation.
//!
//! # Invariants
//!
//! - A name maps to at most one layer.
//! - A published snapshot is never modified; holders keep a stable view for as
//!   long as they keep the [`Arc`].

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::layer::TileLayer;

/// Point-in-time view of the registered layers.
pub struct LayerSnapshot<L> {
	layers: FxHashMap<String, Arc<L>>,
	generation: u64,
}

impl<L> std::fmt::Debug for LayerSnapshot<L> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LayerSnapshot")
			.field("generation", &self.generation)
			.field("layers", &self.layers.len())
			.finish()
	}
}

impl<L: TileLayer> LayerSnapshot<L> {
	pub(crate) fn empty() -> Self {
		Self {
			layers: FxHashMap::default(),
			generation: 0,
		}
	}

	pub(crate) fn from_layers(layers: FxHashMap<String, Arc<L>>, generation: u64) -> Self {
		Self { layers, generation }
	}

	/// Returns the layer registered under `name`.
	#[inline]
	pub fn get(&self, name: &str) -> Option<&Arc<L>> {
		self.layers.get(name)
	}

	#[inline]
	pub fn contains(&self, name: &str) -> bool {
		self.layers.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	/// Publication counter. Every rebuild or edit publishes a higher value.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Layer names in sorted order.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.layers.keys().map(String::as_str).collect();
		names.sort_unstable();
		names
	}

	/// Iterates over `(name, layer)` pairs in arbitrary order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<L>)> {
		self.layers.iter().map(|(name, layer)| (name.as_str(), layer))
	}

	/// Copy of this snapshot with `layer` inserted under its own name.
	pub(crate) fn with_layer(&self, layer: Arc<L>) -> Self {
		let mut layers = self.layers.clone();
		layers.insert(layer.name().to_string(), layer);
		Self::from_layers(layers, self.generation + 1)
	}

	/// Copy of this snapshot without `name`.
	pub(crate) fn without(&self, name: &str) -> Self {
		let mut layers = self.layers.clone();
		layers.remove(name);
		Self::from_layers(layers, self.generation + 1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::MergeError;
	use crate::layer::LayerLock;

	struct Named(&'static str, LayerLock);

	impl TileLayer for Named {
		type GridSets = ();

		fn name(&self) -> &str {
			self.0
		}

		fn initialize(&self, _grid_sets: &()) {}

		fn merge_with(&self, _other: &Self) -> Result<(), MergeError> {
			Ok(())
		}

		fn layer_lock(&self) -> &LayerLock {
			&self.1
		}
	}

	fn named(name: &'static str) -> Arc<Named> {
		Arc::new(Named(name, LayerLock::new()))
	}

	#[test]
	fn edits_copy_and_leave_original_untouched() {
		let base = LayerSnapshot::empty().with_layer(named("roads")).with_layer(named("water"));
		assert_eq!(base.generation(), 2);

		let trimmed = base.without("roads");
		assert_eq!(trimmed.generation(), 3);
		assert_eq!(trimmed.names(), vec!["water"]);
		assert_eq!(base.names(), vec!["roads", "water"]);
	}

	#[test]
	fn inserting_existing_name_replaces_entry() {
		let first = named("roads");
		let second = named("roads");
		let snap = LayerSnapshot::empty().with_layer(first.clone()).with_layer(second.clone());

		assert_eq!(snap.len(), 1);
		assert!(Arc::ptr_eq(snap.get("roads").unwrap(), &second));
	}
}
