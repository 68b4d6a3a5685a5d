#![allow(unused_crate_dependencies)]
//! Readers and editors racing a rebuild.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use gridwell_layer_registry::{AddOutcome, EditPolicy, LayerLock, LayerRegistry, LayerSource, MergeError, RegistryConfig, SourceError, TileLayer};

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

struct GridSets;

#[derive(Debug)]
struct EpochLayer {
	name: String,
	epoch: u64,
	initialized: AtomicBool,
	lock: LayerLock,
}

impl EpochLayer {
	fn new(name: String, epoch: u64) -> Arc<Self> {
		Arc::new(Self {
			name,
			epoch,
			initialized: AtomicBool::new(false),
			lock: LayerLock::new(),
		})
	}
}

impl TileLayer for EpochLayer {
	type GridSets = GridSets;

	fn name(&self) -> &str {
		&self.name
	}

	fn initialize(&self, _grid_sets: &GridSets) {
		self.initialized.store(true, Ordering::SeqCst);
	}

	fn merge_with(&self, _other: &Self) -> Result<(), MergeError> {
		Ok(())
	}

	fn layer_lock(&self) -> &LayerLock {
		&self.lock
	}
}

const PER_SOURCE: usize = 20;

/// Yields `PER_SOURCE` layers stamped with the shared epoch. The leading
/// source advances the epoch, so every rebuild stamps a new value.
struct EpochSource {
	prefix: &'static str,
	leading: bool,
	epoch: Arc<AtomicU64>,
}

impl LayerSource<EpochLayer> for EpochSource {
	fn identifier(&self) -> Result<String, SourceError> {
		Ok(self.prefix.to_string())
	}

	fn layers(&self, _refresh: bool) -> Result<Vec<Arc<EpochLayer>>, SourceError> {
		let epoch = if self.leading { self.epoch.fetch_add(1, Ordering::SeqCst) + 1 } else { self.epoch.load(Ordering::SeqCst) };
		thread::yield_now();
		Ok((0..PER_SOURCE).map(|i| EpochLayer::new(format!("{}-{i}", self.prefix), epoch)).collect())
	}
}

/// Source that, once armed, blocks inside `layers` until released.
struct GateSource {
	armed: AtomicBool,
	entered: Mutex<Sender<()>>,
	release: Mutex<Receiver<()>>,
}

struct Gate {
	source: Arc<GateSource>,
	entered: Receiver<()>,
	release: Sender<()>,
}

impl Gate {
	fn new() -> Self {
		let (entered_tx, entered_rx) = mpsc::channel();
		let (release_tx, release_rx) = mpsc::channel();
		Self {
			source: Arc::new(GateSource {
				armed: AtomicBool::new(false),
				entered: Mutex::new(entered_tx),
				release: Mutex::new(release_rx),
			}),
			entered: entered_rx,
			release: release_tx,
		}
	}

	fn arm(&self) {
		self.source.armed.store(true, Ordering::SeqCst);
	}

	fn wait_entered(&self) {
		self.entered.recv_timeout(Duration::from_secs(5)).expect("rebuild should reach the gated source");
	}

	fn open(&self) {
		self.release.send(()).expect("gated source should be waiting");
	}
}

impl LayerSource<EpochLayer> for GateSource {
	fn identifier(&self) -> Result<String, SourceError> {
		Ok("gate".to_string())
	}

	fn layers(&self, _refresh: bool) -> Result<Vec<Arc<EpochLayer>>, SourceError> {
		if self.armed.load(Ordering::SeqCst) {
			let _ = self.entered.lock().unwrap().send(());
			let _ = self.release.lock().unwrap().recv();
		}
		Ok(vec![EpochLayer::new("base".to_string(), 0)])
	}
}

fn gated_registry(gate: &Gate, edit_policy: EditPolicy) -> Arc<LayerRegistry<EpochLayer>> {
	init_tracing();
	let config = RegistryConfig {
		edit_policy,
		..RegistryConfig::default()
	};
	let source: Arc<dyn LayerSource<EpochLayer>> = gate.source.clone();
	Arc::new(LayerRegistry::with_config(Arc::new(GridSets), vec![source], config))
}

#[test]
fn readers_never_observe_a_mixed_snapshot() {
	init_tracing();
	let epoch = Arc::new(AtomicU64::new(0));
	let sources: Vec<Arc<dyn LayerSource<EpochLayer>>> = vec![
		Arc::new(EpochSource {
			prefix: "north",
			leading: true,
			epoch: Arc::clone(&epoch),
		}),
		Arc::new(EpochSource {
			prefix: "south",
			leading: false,
			epoch: Arc::clone(&epoch),
		}),
	];
	let registry = Arc::new(LayerRegistry::new(Arc::new(GridSets), sources));
	let done = Arc::new(AtomicBool::new(false));

	let readers: Vec<_> = (0..4)
		.map(|_| {
			let registry = Arc::clone(&registry);
			let done = Arc::clone(&done);
			thread::spawn(move || {
				let mut observed = 0usize;
				while !done.load(Ordering::SeqCst) {
					let snap = registry.snapshot();
					assert_eq!(snap.len(), 2 * PER_SOURCE);
					let epochs: Vec<u64> = snap.iter().map(|(_, layer)| layer.epoch).collect();
					assert!(epochs.windows(2).all(|w| w[0] == w[1]), "mixed epochs in one snapshot: {epochs:?}");
					assert!(snap.iter().all(|(_, layer)| layer.initialized.load(Ordering::SeqCst)));
					observed += 1;
				}
				observed
			})
		})
		.collect();

	for _ in 0..50 {
		let report = registry.reinit();
		assert!(report.is_clean());
	}
	done.store(true, Ordering::SeqCst);

	for reader in readers {
		assert!(reader.join().unwrap() > 0);
	}
	assert_eq!(registry.lookup("south-0").unwrap().epoch, 51);
}

#[test]
fn lookups_complete_while_rebuild_is_blocked() {
	let gate = Gate::new();
	let registry = gated_registry(&gate, EditPolicy::Concurrent);
	let generation = registry.generation();

	gate.arm();
	let rebuilder = {
		let registry = Arc::clone(&registry);
		thread::spawn(move || registry.reinit())
	};
	gate.wait_entered();

	let started = Instant::now();
	let readers: Vec<_> = (0..8)
		.map(|_| {
			let registry = Arc::clone(&registry);
			thread::spawn(move || {
				for _ in 0..10_000 {
					assert!(registry.lookup("base").is_ok());
					assert!(registry.lookup("missing").unwrap_err().is_not_found());
				}
				registry.generation()
			})
		})
		.collect();
	for reader in readers {
		assert_eq!(reader.join().unwrap(), generation);
	}

	assert!(!rebuilder.is_finished(), "readers finished only because the rebuild did");
	assert!(started.elapsed() < Duration::from_secs(5));

	gate.open();
	let report = rebuilder.join().unwrap();
	assert_eq!(report.generation, generation + 1);
	assert_eq!(registry.generation(), generation + 1);
}

#[test]
fn concurrent_policy_lets_rebuild_supersede_edits() {
	let gate = Gate::new();
	let registry = gated_registry(&gate, EditPolicy::Concurrent);

	gate.arm();
	let rebuilder = {
		let registry = Arc::clone(&registry);
		thread::spawn(move || registry.reinit())
	};
	gate.wait_entered();

	assert_eq!(registry.add(EpochLayer::new("scratch".to_string(), 0)), AddOutcome::Inserted);
	assert!(registry.lookup("scratch").is_ok());

	gate.open();
	rebuilder.join().unwrap();
	assert!(registry.lookup("scratch").unwrap_err().is_not_found());
	assert!(registry.lookup("base").is_ok());
}

#[test]
fn serialized_policy_applies_edits_after_rebuild() {
	let gate = Gate::new();
	let registry = gated_registry(&gate, EditPolicy::Serialized);

	gate.arm();
	let rebuilder = {
		let registry = Arc::clone(&registry);
		thread::spawn(move || registry.reinit())
	};
	gate.wait_entered();

	let adder = {
		let registry = Arc::clone(&registry);
		thread::spawn(move || registry.add(EpochLayer::new("scratch".to_string(), 0)))
	};
	thread::sleep(Duration::from_millis(50));
	assert!(!adder.is_finished());
	assert!(registry.lookup("base").is_ok());

	gate.open();
	let report = rebuilder.join().unwrap();
	assert_eq!(adder.join().unwrap(), AddOutcome::Inserted);
	assert!(registry.lookup("scratch").is_ok());
	assert_eq!(registry.generation(), report.generation + 1);
}
