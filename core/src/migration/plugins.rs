//! File-location plugin SPI (consumed).
//!
//! Each application domain (mail, documents, ...) knows how its records
//! reference stored identifiers. The engine never interprets what an
//! identifier means; it only takes the union of what the plugins report and
//! hands the rename map back to all of them.

use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::filestore::{ContextId, FileId, StorageError, UserId};

use super::metadata::MetadataTransaction;

#[async_trait]
pub trait FileLocationPlugin: Send + Sync {
	fn name(&self) -> &str;

	/// All stored identifiers this domain references for `(user, context)`.
	async fn enumerate(
		&self,
		user_id: UserId,
		context_id: ContextId,
		txn: &dyn MetadataTransaction,
	) -> Result<HashSet<FileId>, StorageError>;

	/// Rewrites this domain's references according to the rename map.
	/// Returns the number of references rewritten.
	async fn rewrite(
		&self,
		rename_map: &HashMap<FileId, FileId>,
		context_id: ContextId,
		txn: &dyn MetadataTransaction,
	) -> Result<u64, StorageError>;
}

#[derive(Default)]
pub struct LocationPluginRegistry {
	plugins: RwLock<Vec<Arc<dyn FileLocationPlugin>>>,
}

impl LocationPluginRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, plugin: Arc<dyn FileLocationPlugin>) {
		self.plugins.write().push(plugin);
	}

	fn snapshot(&self) -> Vec<Arc<dyn FileLocationPlugin>> {
		self.plugins.read().clone()
	}

	/// Union of all plugins' file sets for `(user, context)`, inside one
	/// caller-supplied transaction scope.
	pub async fn discover(
		&self,
		user_id: UserId,
		context_id: ContextId,
		txn: &dyn MetadataTransaction,
	) -> Result<Vec<FileId>, StorageError> {
		let mut union = HashSet::new();

		for plugin in self.snapshot() {
			let found = plugin.enumerate(user_id, context_id, txn).await?;
			trace!(plugin = plugin.name(), files = found.len(), "enumerated");
			union.extend(found);
		}

		// Deterministic order keeps copy loops and their logs reproducible.
		let mut files: Vec<_> = union.into_iter().collect();
		files.sort_unstable();

		debug!(%user_id, %context_id, files = files.len(), "indirect discovery complete");
		Ok(files)
	}

	/// Propagates the rename map to every plugin, inside one caller-supplied
	/// transaction scope.
	pub async fn propagate(
		&self,
		rename_map: &HashMap<FileId, FileId>,
		context_id: ContextId,
		txn: &dyn MetadataTransaction,
	) -> Result<(), StorageError> {
		for plugin in self.snapshot() {
			let rewritten = plugin.rewrite(rename_map, context_id, txn).await?;
			trace!(plugin = plugin.name(), rewritten, "rename map propagated");
		}
		Ok(())
	}
}
