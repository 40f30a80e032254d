//! Test helper modules for integration tests

#![allow(dead_code)]

pub mod memory_backend;
pub mod metadata;
pub mod observers;

pub use memory_backend::*;
pub use metadata::*;
pub use observers::*;

use std::sync::Arc;

use gw_core::{
	filestore::StorageFactory,
	migration::{ListenerHub, LocationPluginRegistry, Mover},
};

/// Everything a migration test needs, with every collaborator recording.
pub struct Harness {
	pub metadata: Arc<InMemoryMetadataStore>,
	pub listeners: Arc<ListenerHub>,
	pub plugins: Arc<LocationPluginRegistry>,
	pub cache: Arc<RecordingCache>,
	pub syncer: Arc<CountingSyncer>,
	pub mover: Mover,
}

impl Harness {
	pub fn new(storage: Arc<dyn StorageFactory>) -> Self {
		Self::with_syncer(storage, CountingSyncer::real())
	}

	pub fn with_syncer(storage: Arc<dyn StorageFactory>, syncer: CountingSyncer) -> Self {
		let metadata = Arc::new(InMemoryMetadataStore::new());
		let listeners = Arc::new(ListenerHub::new());
		let plugins = Arc::new(LocationPluginRegistry::new());
		let cache = Arc::new(RecordingCache::default());
		let syncer = Arc::new(syncer);

		let mover = Mover::new(
			storage,
			Arc::clone(&listeners),
			Arc::clone(&plugins),
			Arc::clone(&metadata) as Arc<dyn gw_core::migration::MetadataStore>,
			Arc::clone(&cache) as Arc<dyn gw_core::migration::CacheInvalidator>,
			Arc::clone(&syncer) as Arc<dyn gw_core::migration::DirectorySyncer>,
		);

		Self {
			metadata,
			listeners,
			plugins,
			cache,
			syncer,
			mover,
		}
	}
}
