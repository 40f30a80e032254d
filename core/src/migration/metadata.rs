//! Consumed persistence SPI.
//!
//! The engine does not own the entity schema or the usage ledger; it mutates
//! them through this trait. Implementations back onto whatever the platform
//! persists entities in. Each transaction scope is opened per propagation
//! pass, keyed by context id, and must be released on every exit path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::filestore::{ContextId, FilestoreId, StorageError, StorageScope, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
	pub id: ContextId,
	pub filestore_id: FilestoreId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
	pub id: UserId,
	pub context_id: ContextId,
	/// `None` means the user stores its files in the context-shared store.
	pub filestore_id: Option<FilestoreId>,
	/// `Some(master)` when this user shares the master user's store.
	pub filestore_owner: Option<UserId>,
	pub filestore_name: Option<String>,
	pub max_quota: Option<u64>,
}

/// The full set of user filestore fields, written wholesale by a metadata
/// switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilestoreSwitch {
	pub filestore_id: Option<FilestoreId>,
	pub filestore_owner: Option<UserId>,
	pub filestore_name: Option<String>,
	pub max_quota: Option<u64>,
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
	async fn context(&self, id: ContextId) -> Result<ContextRecord, StorageError>;

	async fn user(&self, context_id: ContextId, id: UserId) -> Result<UserRecord, StorageError>;

	async fn set_context_filestore(
		&self,
		context_id: ContextId,
		filestore_id: FilestoreId,
	) -> Result<(), StorageError>;

	async fn set_user_filestore(
		&self,
		context_id: ContextId,
		user_id: UserId,
		switch: UserFilestoreSwitch,
	) -> Result<(), StorageError>;

	/// Current usage ledger entry in bytes for an owner key; absent entries
	/// read as zero.
	async fn usage(&self, key: StorageScope) -> Result<u64, StorageError>;

	/// Applies a signed delta to an owner key's ledger entry, saturating at
	/// zero.
	async fn adjust_usage(&self, key: StorageScope, delta: i64) -> Result<(), StorageError>;

	/// Records `(context, user) -> filestore` in the ownership-mapping table
	/// for individually-owned stores.
	async fn add_filestore_owner(
		&self,
		context_id: ContextId,
		user_id: UserId,
		filestore_id: FilestoreId,
	) -> Result<(), StorageError>;

	async fn remove_filestore_owner(
		&self,
		context_id: ContextId,
		user_id: UserId,
	) -> Result<(), StorageError>;

	async fn begin(
		&self,
		context_id: ContextId,
	) -> Result<Box<dyn MetadataTransaction>, StorageError>;
}

/// One storage-transaction scope, keyed by context id.
#[async_trait]
pub trait MetadataTransaction: Send + Sync {
	fn context_id(&self) -> ContextId;

	async fn commit(self: Box<Self>) -> Result<(), StorageError>;

	async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
