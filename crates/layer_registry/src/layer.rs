//! Layer and source capabilities consumed by the registry.
//!
//! # Role
//!
//! The registry never looks inside a layer. It needs a name to key on, a hook
//! to initialize the layer against shared grid-set context, a way to fold a
//! second definition of the same name into an existing layer, and a lock it
//! can hold while detaching the layer from the published mapping.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{MergeError, SourceError};

/// A named tile layer managed by a [`LayerRegistry`](crate::LayerRegistry).
///
/// Layers are shared between snapshots and serving threads through [`Arc`], so
/// initialization and merging take `&self` and rely on the layer's own
/// interior mutability.
pub trait TileLayer: Send + Sync + 'static {
	/// Shared grid-set context handed to [`TileLayer::initialize`]. Opaque to the registry.
	type GridSets: Send + Sync + 'static;

	/// Unique identifier the layer is registered under.
	fn name(&self) -> &str;

	/// Prepares the layer for serving. Called once per rebuild that loads it.
	fn initialize(&self, grid_sets: &Self::GridSets);

	/// Folds `other`, a second definition with the same name, into `self`.
	fn merge_with(&self, other: &Self) -> Result<(), MergeError>;

	/// Lock serializing structural changes against in-flight use of this layer.
	fn layer_lock(&self) -> &LayerLock;
}

/// A provider of layer definitions, such as a config file or a remote catalog.
pub trait LayerSource<L: TileLayer>: Send + Sync {
	/// Label used in logs and warnings.
	fn identifier(&self) -> Result<String, SourceError>;

	/// Produces the source's layers in definition order.
	///
	/// Every call must return newly constructed layer objects. Layers handed
	/// out by an earlier call may be live in the published snapshot, and a
	/// rebuild initializes and merges whatever it receives before publishing.
	///
	/// `refresh` asks the source to re-read its backing store instead of
	/// reusing previously parsed definitions.
	fn layers(&self, refresh: bool) -> Result<Vec<Arc<L>>, SourceError>;
}

type BuildLayers<L> = dyn Fn() -> Vec<Arc<L>> + Send + Sync;

/// In-memory [`LayerSource`] that builds its layers from a closure on every load.
pub struct StaticSource<L> {
	id: String,
	build: Box<BuildLayers<L>>,
}

impl<L: TileLayer> StaticSource<L> {
	/// Creates a source that calls `build` for a fresh set of layers on each load.
	pub fn new<F>(id: impl Into<String>, build: F) -> Self
	where
		F: Fn() -> Vec<Arc<L>> + Send + Sync + 'static,
	{
		Self {
			id: id.into(),
			build: Box::new(build),
		}
	}
}

impl<L: TileLayer> LayerSource<L> for StaticSource<L> {
	fn identifier(&self) -> Result<String, SourceError> {
		Ok(self.id.clone())
	}

	fn layers(&self, _refresh: bool) -> Result<Vec<Arc<L>>, SourceError> {
		Ok((self.build)())
	}
}

/// Per-layer structural lock.
///
/// Renderers and cache writers hold it while using a layer; the registry
/// holds it while removing or replacing that layer.
#[derive(Debug, Default)]
pub struct LayerLock(Mutex<()>);

/// Scoped guard returned by [`LayerLock::acquire`]. Released on drop.
#[must_use = "the layer lock is released as soon as the guard is dropped"]
pub struct LayerLockGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

impl LayerLock {
	pub fn new() -> Self {
		Self::default()
	}

	/// Blocks until the lock is held.
	pub fn acquire(&self) -> LayerLockGuard<'_> {
		LayerLockGuard(self.0.lock())
	}

	pub fn try_acquire(&self) -> Option<LayerLockGuard<'_>> {
		self.0.try_lock().map(LayerLockGuard)
	}

	pub fn is_locked(&self) -> bool {
		self.0.is_locked()
	}
}
