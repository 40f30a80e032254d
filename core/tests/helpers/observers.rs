//! Recording/scripting doubles for the engine's SPIs.

use std::{
	collections::{HashMap, HashSet},
	path::{Path, PathBuf},
	sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;

use gw_core::{
	filestore::{ContextId, FileId, FilestoreId, StorageError, StorageHandle, UserId},
	migration::{
		CacheInvalidator, DirectorySyncer, FileLocationPlugin, HookError, MetadataTransaction,
		MigrationError, MoveListener, Rsync, Veto,
	},
};

/// Listener that records every notification and optionally vetoes all
/// before-hooks.
#[derive(Default)]
pub struct RecordingListener {
	pub events: Mutex<Vec<String>>,
	pub veto_reason: Option<String>,
}

impl RecordingListener {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn vetoing(reason: &str) -> Self {
		Self {
			events: Mutex::new(Vec::new()),
			veto_reason: Some(reason.to_owned()),
		}
	}

	pub fn events(&self) -> Vec<String> {
		self.events.lock().clone()
	}

	fn before(&self, event: &str) -> Result<(), Veto> {
		self.events.lock().push(format!("before_{event}"));
		match &self.veto_reason {
			Some(reason) => Err(Veto::new(reason.clone())),
			None => Ok(()),
		}
	}

	fn after(&self, event: &str) -> Result<(), HookError> {
		self.events.lock().push(format!("after_{event}"));
		Ok(())
	}
}

#[async_trait]
impl MoveListener for RecordingListener {
	fn name(&self) -> &str {
		"recording"
	}

	async fn before_context_relocation(
		&self,
		_context_id: ContextId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		self.before("context_relocation")
	}

	async fn after_context_relocation(
		&self,
		_context_id: ContextId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		self.after("context_relocation")
	}

	async fn before_user_relocation(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		self.before("user_relocation")
	}

	async fn after_user_relocation(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		self.after("user_relocation")
	}

	async fn before_context_to_user(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		self.before("context_to_user")
	}

	async fn after_context_to_user(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		self.after("context_to_user")
	}

	async fn before_user_to_context(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		self.before("user_to_context")
	}

	async fn after_user_to_context(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		self.after("user_to_context")
	}

	async fn before_user_to_master(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_master_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		self.before("user_to_master")
	}

	async fn after_user_to_master(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_master_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		self.after("user_to_master")
	}

	async fn before_master_to_user(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_master_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		self.before("master_to_user")
	}

	async fn after_master_to_user(
		&self,
		_context_id: ContextId,
		_user_id: UserId,
		_master_id: UserId,
		_source: &dyn StorageHandle,
		_destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		self.after("master_to_user")
	}
}

/// Plugin whose referenced file set is scripted by the test; `rewrite`
/// applies the rename map to that set, or fails when told to.
pub struct StaticLocationPlugin {
	name: String,
	refs: Mutex<HashSet<FileId>>,
	fail_rewrite: AtomicBool,
	rewrites: AtomicUsize,
}

impl StaticLocationPlugin {
	pub fn new(name: &str, refs: impl IntoIterator<Item = FileId>) -> Self {
		Self {
			name: name.to_owned(),
			refs: Mutex::new(refs.into_iter().collect()),
			fail_rewrite: AtomicBool::new(false),
			rewrites: AtomicUsize::new(0),
		}
	}

	pub fn fail_next_rewrite(&self) {
		self.fail_rewrite.store(true, Ordering::SeqCst);
	}

	pub fn refs(&self) -> HashSet<FileId> {
		self.refs.lock().clone()
	}

	pub fn rewrite_calls(&self) -> usize {
		self.rewrites.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl FileLocationPlugin for StaticLocationPlugin {
	fn name(&self) -> &str {
		&self.name
	}

	async fn enumerate(
		&self,
		_user_id: UserId,
		_context_id: ContextId,
		_txn: &dyn MetadataTransaction,
	) -> Result<HashSet<FileId>, StorageError> {
		Ok(self.refs())
	}

	async fn rewrite(
		&self,
		rename_map: &HashMap<FileId, FileId>,
		_context_id: ContextId,
		_txn: &dyn MetadataTransaction,
	) -> Result<u64, StorageError> {
		self.rewrites.fetch_add(1, Ordering::SeqCst);
		if self.fail_rewrite.swap(false, Ordering::SeqCst) {
			return Err(StorageError::Persistence(
				"scripted rewrite failure".to_owned(),
			));
		}

		let mut refs = self.refs.lock();
		let mut rewritten = 0;
		*refs = refs
			.drain()
			.map(|id| match rename_map.get(&id) {
				Some(new_id) => {
					rewritten += 1;
					new_id.clone()
				}
				None => id,
			})
			.collect();
		Ok(rewritten)
	}
}

/// Cache invalidator that records what was invalidated.
#[derive(Default)]
pub struct RecordingCache {
	pub filestores: Mutex<Vec<FilestoreId>>,
	pub contexts: Mutex<Vec<ContextId>>,
	pub users: Mutex<Vec<(ContextId, UserId)>>,
}

#[async_trait]
impl CacheInvalidator for RecordingCache {
	async fn invalidate_filestore(&self, id: FilestoreId) -> Result<(), HookError> {
		self.filestores.lock().push(id);
		Ok(())
	}

	async fn invalidate_context(&self, id: ContextId) -> Result<(), HookError> {
		self.contexts.lock().push(id);
		Ok(())
	}

	async fn invalidate_user(
		&self,
		context_id: ContextId,
		id: UserId,
	) -> Result<(), HookError> {
		self.users.lock().push((context_id, id));
		Ok(())
	}
}

/// Wraps the real rsync syncer (or a scripted failure) and counts
/// invocations, so tests can assert "invoked once" and "no reverse sync".
pub struct CountingSyncer {
	calls: Mutex<Vec<(PathBuf, PathBuf)>>,
	fail_with_status: Option<i32>,
}

impl CountingSyncer {
	pub fn real() -> Self {
		Self {
			calls: Mutex::new(Vec::new()),
			fail_with_status: None,
		}
	}

	pub fn failing(status: i32) -> Self {
		Self {
			calls: Mutex::new(Vec::new()),
			fail_with_status: Some(status),
		}
	}

	pub fn call_count(&self) -> usize {
		self.calls.lock().len()
	}

	pub fn calls(&self) -> Vec<(PathBuf, PathBuf)> {
		self.calls.lock().clone()
	}
}

#[async_trait]
impl DirectorySyncer for CountingSyncer {
	fn name(&self) -> &str {
		"counting-rsync"
	}

	async fn sync(&self, from: &Path, to: &Path) -> Result<(), MigrationError> {
		self.calls.lock().push((from.to_owned(), to.to_owned()));

		if let Some(status) = self.fail_with_status {
			return Err(MigrationError::ExternalTool {
				tool: "counting-rsync".to_owned(),
				status,
			});
		}

		Rsync.sync(from, to).await
	}
}

/// Collects `FileId`s into a set, for readable assertions.
pub fn id_set(ids: impl IntoIterator<Item = FileId>) -> HashSet<FileId> {
	ids.into_iter().collect()
}
