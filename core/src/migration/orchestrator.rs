//! The move orchestrator: one shared protocol, two finalization flavors.
//!
//! A single blocking unit of work, meant to run on a background worker. The
//! protocol is: resolve handles, before-hooks, discover, copy, then either
//! finalize-before-switch (same-owner relocation) or switch-then-finalize
//! (ownership transfer), after-hooks and cache invalidation, and finally the
//! post-process queue. There is no distributed transaction across the
//! storage backends and the metadata store; every step before the metadata
//! switch is compensated through the captured [`Reverter`], every step after
//! it is log-and-leave.

use std::{collections::HashMap, sync::Arc};

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::filestore::{
	FileIOError, FileId, QuotaAwareHandle, StorageError, StorageFactory, StorageHandle,
};

use super::{
	cache::CacheInvalidator,
	copy::{CopyEngine, CopyOutcome, Operation},
	error::MigrationError,
	kind::{Discovery, Flavor, MoveKind},
	listener::ListenerHub,
	metadata::MetadataStore,
	plugins::LocationPluginRegistry,
	post_process::{PostProcessQueue, PostProcessTask},
	revert::Reverter,
	sync_tool::DirectorySyncer,
};

/// The migration engine, with every collaborator injected at construction.
#[derive(Clone)]
pub struct Mover {
	storage: Arc<dyn StorageFactory>,
	listeners: Arc<ListenerHub>,
	plugins: Arc<LocationPluginRegistry>,
	metadata: Arc<dyn MetadataStore>,
	cache: Arc<dyn CacheInvalidator>,
	syncer: Arc<dyn DirectorySyncer>,
}

impl Mover {
	pub fn new(
		storage: Arc<dyn StorageFactory>,
		listeners: Arc<ListenerHub>,
		plugins: Arc<LocationPluginRegistry>,
		metadata: Arc<dyn MetadataStore>,
		cache: Arc<dyn CacheInvalidator>,
		syncer: Arc<dyn DirectorySyncer>,
	) -> Self {
		Self {
			storage,
			listeners,
			plugins,
			metadata,
			cache,
			syncer,
		}
	}

	/// Prepares one migration. The caller may enqueue post-process tasks on
	/// the returned operation before invoking it.
	pub fn operation(&self, kind: MoveKind) -> MoveOperation {
		MoveOperation {
			mover: self.clone(),
			kind,
			post_process: Arc::new(PostProcessQueue::new()),
			cancel: CancellationToken::new(),
		}
	}
}

/// One prepared migration: a kind, its post-process queue, and a
/// cancellation token. Invoked at most once.
pub struct MoveOperation {
	mover: Mover,
	kind: MoveKind,
	post_process: Arc<PostProcessQueue>,
	cancel: CancellationToken,
}

impl MoveOperation {
	pub fn kind(&self) -> &MoveKind {
		&self.kind
	}

	/// Enqueues a follow-up task; runs only if the whole operation succeeds.
	pub fn enqueue_post_process(&self, task: PostProcessTask) {
		self.post_process.enqueue(task);
	}

	/// Shareable queue handle for producers on other threads.
	pub fn post_process_queue(&self) -> Arc<PostProcessQueue> {
		Arc::clone(&self.post_process)
	}

	/// Token for cooperative cancellation of the object-level copy loop.
	/// The directory-level fast path only observes cancellation at
	/// process-exit granularity.
	pub fn cancellation_token(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Runs the migration to completion, blocking the current task from
	/// seconds to hours. Every failure is logged with full context before
	/// being returned.
	#[instrument(
		name = "filestore_move",
		skip(self),
		fields(
			kind = %self.kind,
			context = %self.kind.context_id(),
			from = %self.kind.from().id,
			to = %self.kind.to().id,
		)
	)]
	pub async fn run(self) -> Result<(), MigrationError> {
		let result = self.execute().await;
		if let Err(e) = &result {
			error!(error = %e, "filestore migration failed");
		}
		result
	}

	async fn execute(&self) -> Result<(), MigrationError> {
		let Mover {
			storage,
			listeners,
			metadata,
			..
		} = &self.mover;
		let kind = &self.kind;

		// 1. resolve both storage handles; failure here means nothing has
		// been touched yet
		let source = storage.open(kind.from(), kind.source_scope()).await?;
		let destination = storage.open(kind.to(), kind.dest_scope()).await?;

		let (source, destination) = if kind.quota_aware() {
			(
				Arc::new(QuotaAwareHandle::new(source, Arc::clone(metadata)))
					as Arc<dyn StorageHandle>,
				Arc::new(QuotaAwareHandle::new(destination, Arc::clone(metadata)))
					as Arc<dyn StorageHandle>,
			)
		} else {
			(source, destination)
		};

		// 2. before-hooks; a veto aborts with no side effects performed
		listeners
			.notify_before(kind, &*source, &*destination)
			.await?;

		// 3. discovery + copy
		let (mut outcome, files) = self.copy_phase(&source, &destination).await?;

		// 4.-8. flavor-specific finalization ordering
		match kind.flavor() {
			Flavor::SameOwnerRelocation => {
				self.finalize_before_switch(&source, &mut outcome, &files)
					.await?;

				if let Err(e) = kind.switch_metadata(&**metadata).await {
					match outcome.take_reverter() {
						// The destination holds a full directory copy; syncing
						// it back restores the source, which the unchanged
						// pointer still references.
						Some(reverter @ Reverter::Directory { .. }) => {
							error!(
								error = %e,
								"metadata switch failed, restoring source directory"
							);
							reverter.revert_or_log().await;
						}
						// Source objects are already deleted; reverting would
						// remove the only remaining replica.
						_ => {
							error!(
								error = %e,
								"metadata switch failed after source cleanup, \
								 manual remediation required"
							);
						}
					}
					return Err(e.into());
				}

				listeners.notify_after(kind, &*source, &*destination).await;
				self.invalidate_caches().await;
			}
			Flavor::OwnershipTransfer => {
				// switch first: quota accounting and listeners must already
				// see the destination keyed by the new owner
				if let Err(e) = kind.switch_metadata(&**metadata).await {
					if let Some(reverter) = outcome.take_reverter() {
						reverter.revert_or_log().await;
					}
					return Err(e.into());
				}

				listeners.notify_after(kind, &*source, &*destination).await;
				self.invalidate_caches().await;

				self.finalize_after_switch(&source, &mut outcome, &files)
					.await?;
			}
		}

		info!(
			operation = ?outcome.operation,
			files = outcome.rename_map.len(),
			total_bytes = outcome.total_bytes,
			"filestore migration complete"
		);

		// post-process tasks, only after overall success
		self.post_process.drain().await
	}

	/// Discovers the file set and transfers it, via the directory-level fast
	/// path when eligible, via the sequential object loop otherwise.
	/// Copy failures are compensated here and surface with the engine's
	/// partial reverter already consumed.
	async fn copy_phase(
		&self,
		source: &Arc<dyn StorageHandle>,
		destination: &Arc<dyn StorageHandle>,
	) -> Result<(CopyOutcome, Vec<FileId>), MigrationError> {
		let kind = &self.kind;

		if kind.fast_path_eligible() {
			if let (Some(source_dir), Some(dest_dir)) =
				(source.local_root(), destination.local_root())
			{
				// Scope directories are created lazily on first save; a
				// subject that never wrote a file has nothing on disk to
				// hand to the sync tool, and its empty listing falls through
				// to the no-op classification below.
				let source_dir_exists = fs::try_exists(&source_dir)
					.await
					.map_err(|e| StorageError::from(FileIOError::from((&source_dir, e))))?;
				if source_dir_exists {
					let files = source.list_files().await?;
					let mut total_bytes = 0;
					for id in &files {
						total_bytes += source.file_size(id).await?;
					}

					// a non-zero exit has migrated nothing, so there is
					// nothing to revert and the error propagates as-is
					self.mover.syncer.sync(&source_dir, &dest_dir).await?;

					let outcome = CopyOutcome {
						operation: Operation::Copied,
						rename_map: HashMap::new(),
						total_bytes,
						reverter: Some(Reverter::Directory {
							syncer: Arc::clone(&self.mover.syncer),
							source_dir,
							dest_dir,
						}),
					};
					return Ok((outcome, files));
				}
			}
		}

		let files = match kind.discovery() {
			Discovery::DirectListing => source.list_files().await?,
			Discovery::PluginUnion => {
				let user_id = kind
					.user_id()
					.expect("plugin discovery is only used by per-user kinds");
				let txn = self.mover.metadata.begin(kind.context_id()).await?;
				match self
					.mover
					.plugins
					.discover(user_id, kind.context_id(), &*txn)
					.await
				{
					Ok(files) => {
						txn.commit().await?;
						files
					}
					Err(e) => {
						rollback_or_log(txn.rollback().await);
						return Err(e.into());
					}
				}
			}
		};

		if files.is_empty() {
			// NOOP: only ledger bookkeeping remains. For ownership
			// transfers the delta to move between owner keys is whatever
			// the ledger currently records for the source owner.
			let total_bytes = match kind.flavor() {
				Flavor::OwnershipTransfer => {
					self.mover.metadata.usage(kind.source_scope()).await?
				}
				Flavor::SameOwnerRelocation => 0,
			};
			return Ok((CopyOutcome::noop(total_bytes), files));
		}

		let engine = CopyEngine::new(
			Arc::clone(source),
			Arc::clone(destination),
			self.cancel.clone(),
		);
		match engine.copy_all(&files).await {
			Ok(outcome) => Ok((outcome, files)),
			Err(failure) => {
				if let Some(reverter) = failure.reverter {
					reverter.revert_or_log().await;
				}
				Err(failure.error)
			}
		}
	}

	/// Flavor A steps 2-3: propagate the rename map, delete the source
	/// files, drop the now-empty source directory. Any failure reverts the
	/// copy and aborts before the metadata switch is ever attempted.
	async fn finalize_before_switch(
		&self,
		source: &Arc<dyn StorageHandle>,
		outcome: &mut CopyOutcome,
		files: &[FileId],
	) -> Result<(), MigrationError> {
		let result = self.propagate_and_delete_source(source, outcome, files).await;

		if let Err(e) = result {
			if let Some(reverter) = outcome.take_reverter() {
				reverter.revert_or_log().await;
			}
			return Err(e);
		}
		Ok(())
	}

	/// Flavor B step 4, deferred finalization. The metadata switch is
	/// already committed and is deliberately not rolled back on failure
	/// here: the copied bytes are reverted, the pointer stays on the
	/// destination. Known, documented risk of the ownership-transfer
	/// protocol.
	async fn finalize_after_switch(
		&self,
		source: &Arc<dyn StorageHandle>,
		outcome: &mut CopyOutcome,
		files: &[FileId],
	) -> Result<(), MigrationError> {
		match outcome.operation {
			Operation::Copied => {
				if let Err(e) = self.propagate_rename_map(outcome).await {
					if let Some(reverter) = outcome.take_reverter() {
						reverter.revert_or_log().await;
					}
					error!(
						error = %e,
						"deferred finalization failed after metadata switch; \
						 destination bytes reverted, entity pointer left on \
						 destination, manual remediation required"
					);
					return Err(e);
				}

				if let Err(e) = self.delete_source_files(source, files).await {
					// references already point at the destination; deleting
					// the source is the only thing left outstanding
					error!(
						error = %e,
						"source cleanup failed after propagation, \
						 manual remediation required"
					);
					return Err(e);
				}
				Ok(())
			}
			Operation::Noop => {
				let delta = outcome.total_bytes as i64;
				let moved = async {
					self.mover
						.metadata
						.adjust_usage(self.kind.source_scope(), -delta)
						.await?;
					self.mover
						.metadata
						.adjust_usage(self.kind.dest_scope(), delta)
						.await
				}
				.await;

				moved.map_err(|e| {
					error!(
						error = %e,
						"usage ledger transfer failed after metadata switch, \
						 manual remediation required"
					);
					MigrationError::Storage(e)
				})
			}
		}
	}

	/// Shared by both flavors: rename-map propagation followed by source
	/// deletion (per-object, then the scope directory where one exists).
	async fn propagate_and_delete_source(
		&self,
		source: &Arc<dyn StorageHandle>,
		outcome: &CopyOutcome,
		files: &[FileId],
	) -> Result<(), MigrationError> {
		if outcome.operation == Operation::Noop {
			return Ok(());
		}

		self.propagate_rename_map(outcome).await?;
		self.delete_source_files(source, files).await
	}

	/// Propagates old-to-new identifiers to every file-location plugin
	/// inside one transaction scope keyed by the context.
	async fn propagate_rename_map(&self, outcome: &CopyOutcome) -> Result<(), MigrationError> {
		if outcome.rename_map.is_empty() {
			return Ok(());
		}

		let context_id = self.kind.context_id();
		let txn = self.mover.metadata.begin(context_id).await?;

		match self
			.mover
			.plugins
			.propagate(&outcome.rename_map, context_id, &*txn)
			.await
		{
			Ok(()) => txn.commit().await.map_err(Into::into),
			Err(e) => {
				rollback_or_log(txn.rollback().await);
				Err(e.into())
			}
		}
	}

	async fn delete_source_files(
		&self,
		source: &Arc<dyn StorageHandle>,
		files: &[FileId],
	) -> Result<(), MigrationError> {
		source.delete_files(files).await?;
		if source.local_root().is_some() {
			source.delete_scope_dir().await?;
		}
		Ok(())
	}

	/// Best-effort: failures are logged and never change the outcome.
	async fn invalidate_caches(&self) {
		let kind = &self.kind;
		let cache = &self.mover.cache;

		let mut results = vec![
			cache.invalidate_filestore(kind.from().id).await,
			cache.invalidate_filestore(kind.to().id).await,
			cache.invalidate_context(kind.context_id()).await,
		];
		if let Some(user_id) = kind.user_id() {
			results.push(cache.invalidate_user(kind.context_id(), user_id).await);
		}
		if let Some(master_id) = kind.master_id() {
			results.push(cache.invalidate_user(kind.context_id(), master_id).await);
		}

		for e in results.into_iter().filter_map(Result::err) {
			warn!(error = %e, "cache invalidation failed, continuing");
		}
	}
}

fn rollback_or_log(result: Result<(), StorageError>) {
	if let Err(e) = result {
		warn!(error = %e, "transaction rollback failed");
	}
}
