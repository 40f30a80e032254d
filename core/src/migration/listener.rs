//! Before/after notification hooks for the six migration kinds.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

use crate::filestore::{ContextId, StorageHandle, UserId};

use super::{
	error::{HookError, MigrationError, Veto},
	kind::MoveKind,
};

/// SPI over the twelve notification points, one before/after pair per
/// migration kind.
///
/// Before-hooks receive the freshly opened storage handles and may veto the
/// whole operation; at that point no side effect has been performed yet.
/// After-hooks receive the handles that were actually used and cannot veto;
/// whatever they raise is logged and dropped.
///
/// Every method defaults to doing nothing, so listeners implement only the
/// kinds they care about.
#[allow(unused_variables)]
#[async_trait]
pub trait MoveListener: Send + Sync {
	/// Stable name, used in veto errors and log lines.
	fn name(&self) -> &str;

	async fn before_context_relocation(
		&self,
		context_id: ContextId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		Ok(())
	}

	async fn after_context_relocation(
		&self,
		context_id: ContextId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		Ok(())
	}

	async fn before_user_relocation(
		&self,
		context_id: ContextId,
		user_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		Ok(())
	}

	async fn after_user_relocation(
		&self,
		context_id: ContextId,
		user_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		Ok(())
	}

	async fn before_context_to_user(
		&self,
		context_id: ContextId,
		user_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		Ok(())
	}

	async fn after_context_to_user(
		&self,
		context_id: ContextId,
		user_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		Ok(())
	}

	async fn before_user_to_context(
		&self,
		context_id: ContextId,
		user_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		Ok(())
	}

	async fn after_user_to_context(
		&self,
		context_id: ContextId,
		user_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		Ok(())
	}

	async fn before_user_to_master(
		&self,
		context_id: ContextId,
		user_id: UserId,
		master_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		Ok(())
	}

	async fn after_user_to_master(
		&self,
		context_id: ContextId,
		user_id: UserId,
		master_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		Ok(())
	}

	async fn before_master_to_user(
		&self,
		context_id: ContextId,
		user_id: UserId,
		master_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), Veto> {
		Ok(())
	}

	async fn after_master_to_user(
		&self,
		context_id: ContextId,
		user_id: UserId,
		master_id: UserId,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), HookError> {
		Ok(())
	}
}

/// Registry plus dispatch of before/after notifications.
#[derive(Default)]
pub struct ListenerHub {
	listeners: RwLock<Vec<Arc<dyn MoveListener>>>,
}

impl ListenerHub {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&self, listener: Arc<dyn MoveListener>) {
		self.listeners.write().push(listener);
	}

	fn snapshot(&self) -> Vec<Arc<dyn MoveListener>> {
		self.listeners.read().clone()
	}

	/// Runs the matching before-hook on every listener. The first veto wins
	/// and aborts the operation.
	pub async fn notify_before(
		&self,
		kind: &MoveKind,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) -> Result<(), MigrationError> {
		let context_id = kind.context_id();

		for listener in self.snapshot() {
			let result = match *kind {
				MoveKind::ContextRelocation { .. } => {
					listener
						.before_context_relocation(context_id, source, destination)
						.await
				}
				MoveKind::UserRelocation { user_id, .. } => {
					listener
						.before_user_relocation(context_id, user_id, source, destination)
						.await
				}
				MoveKind::ContextToUser { user_id, .. } => {
					listener
						.before_context_to_user(context_id, user_id, source, destination)
						.await
				}
				MoveKind::UserToContext { user_id, .. } => {
					listener
						.before_user_to_context(context_id, user_id, source, destination)
						.await
				}
				MoveKind::UserToMaster {
					user_id, master_id, ..
				} => {
					listener
						.before_user_to_master(context_id, user_id, master_id, source, destination)
						.await
				}
				MoveKind::MasterToUser {
					user_id, master_id, ..
				} => {
					listener
						.before_master_to_user(context_id, user_id, master_id, source, destination)
						.await
				}
			};

			if let Err(veto) = result {
				return Err(MigrationError::Veto {
					listener: listener.name().to_owned(),
					reason: veto.reason,
				});
			}
		}

		Ok(())
	}

	/// Runs the matching after-hook on every listener. Failures are
	/// observational only.
	pub async fn notify_after(
		&self,
		kind: &MoveKind,
		source: &dyn StorageHandle,
		destination: &dyn StorageHandle,
	) {
		let context_id = kind.context_id();

		for listener in self.snapshot() {
			let result = match *kind {
				MoveKind::ContextRelocation { .. } => {
					listener
						.after_context_relocation(context_id, source, destination)
						.await
				}
				MoveKind::UserRelocation { user_id, .. } => {
					listener
						.after_user_relocation(context_id, user_id, source, destination)
						.await
				}
				MoveKind::ContextToUser { user_id, .. } => {
					listener
						.after_context_to_user(context_id, user_id, source, destination)
						.await
				}
				MoveKind::UserToContext { user_id, .. } => {
					listener
						.after_user_to_context(context_id, user_id, source, destination)
						.await
				}
				MoveKind::UserToMaster {
					user_id, master_id, ..
				} => {
					listener
						.after_user_to_master(context_id, user_id, master_id, source, destination)
						.await
				}
				MoveKind::MasterToUser {
					user_id, master_id, ..
				} => {
					listener
						.after_master_to_user(context_id, user_id, master_id, source, destination)
						.await
				}
			};

			if let Err(e) = result {
				warn!(
					listener = listener.name(),
					kind = %kind,
					error = %e,
					"after-hook failed, continuing"
				);
			}
		}
	}
}
