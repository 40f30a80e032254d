//! In-memory stand-in for the platform's metadata persistence.

use std::{
	collections::HashMap,
	sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use parking_lot::Mutex;

use gw_core::{
	filestore::{ContextId, FilestoreId, StorageError, StorageScope, UserId},
	migration::{
		ContextRecord, MetadataStore, MetadataTransaction, UserFilestoreSwitch, UserRecord,
	},
};

#[derive(Default)]
struct State {
	contexts: HashMap<ContextId, ContextRecord>,
	users: HashMap<(ContextId, UserId), UserRecord>,
	usage: HashMap<StorageScope, u64>,
	owners: HashMap<(ContextId, UserId), FilestoreId>,
}

#[derive(Default)]
pub struct InMemoryMetadataStore {
	state: Mutex<State>,
	fail_switch: AtomicBool,
}

impl InMemoryMetadataStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes the next filestore-pointer write fail, once.
	pub fn fail_next_switch(&self) {
		self.fail_switch.store(true, Ordering::SeqCst);
	}

	pub fn insert_context(&self, id: ContextId, filestore_id: FilestoreId) {
		self.state
			.lock()
			.contexts
			.insert(id, ContextRecord { id, filestore_id });
	}

	pub fn insert_user(&self, record: UserRecord) {
		self.state
			.lock()
			.users
			.insert((record.context_id, record.id), record);
	}

	pub fn seed_usage(&self, key: StorageScope, bytes: u64) {
		self.state.lock().usage.insert(key, bytes);
	}

	pub fn usage_of(&self, key: StorageScope) -> u64 {
		self.state.lock().usage.get(&key).copied().unwrap_or(0)
	}

	pub fn context_of(&self, id: ContextId) -> ContextRecord {
		self.state.lock().contexts[&id].clone()
	}

	pub fn user_of(&self, context_id: ContextId, id: UserId) -> UserRecord {
		self.state.lock().users[&(context_id, id)].clone()
	}

	pub fn owner_mapping(&self, context_id: ContextId, id: UserId) -> Option<FilestoreId> {
		self.state.lock().owners.get(&(context_id, id)).copied()
	}
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
	async fn context(&self, id: ContextId) -> Result<ContextRecord, StorageError> {
		self.state
			.lock()
			.contexts
			.get(&id)
			.cloned()
			.ok_or_else(|| StorageError::Persistence(format!("no such context: {id}")))
	}

	async fn user(&self, context_id: ContextId, id: UserId) -> Result<UserRecord, StorageError> {
		self.state
			.lock()
			.users
			.get(&(context_id, id))
			.cloned()
			.ok_or_else(|| StorageError::Persistence(format!("no such user: {context_id}/{id}")))
	}

	async fn set_context_filestore(
		&self,
		context_id: ContextId,
		filestore_id: FilestoreId,
	) -> Result<(), StorageError> {
		if self.fail_switch.swap(false, Ordering::SeqCst) {
			return Err(StorageError::Persistence(
				"scripted switch failure".to_owned(),
			));
		}
		let mut state = self.state.lock();
		let record = state
			.contexts
			.get_mut(&context_id)
			.ok_or_else(|| StorageError::Persistence(format!("no such context: {context_id}")))?;
		record.filestore_id = filestore_id;
		Ok(())
	}

	async fn set_user_filestore(
		&self,
		context_id: ContextId,
		user_id: UserId,
		switch: UserFilestoreSwitch,
	) -> Result<(), StorageError> {
		if self.fail_switch.swap(false, Ordering::SeqCst) {
			return Err(StorageError::Persistence(
				"scripted switch failure".to_owned(),
			));
		}
		let mut state = self.state.lock();
		let record = state.users.get_mut(&(context_id, user_id)).ok_or_else(|| {
			StorageError::Persistence(format!("no such user: {context_id}/{user_id}"))
		})?;
		record.filestore_id = switch.filestore_id;
		record.filestore_owner = switch.filestore_owner;
		record.filestore_name = switch.filestore_name;
		record.max_quota = switch.max_quota;
		Ok(())
	}

	async fn usage(&self, key: StorageScope) -> Result<u64, StorageError> {
		Ok(self.usage_of(key))
	}

	async fn adjust_usage(&self, key: StorageScope, delta: i64) -> Result<(), StorageError> {
		let mut state = self.state.lock();
		let entry = state.usage.entry(key).or_insert(0);
		*entry = entry.saturating_add_signed(delta);
		Ok(())
	}

	async fn add_filestore_owner(
		&self,
		context_id: ContextId,
		user_id: UserId,
		filestore_id: FilestoreId,
	) -> Result<(), StorageError> {
		self.state
			.lock()
			.owners
			.insert((context_id, user_id), filestore_id);
		Ok(())
	}

	async fn remove_filestore_owner(
		&self,
		context_id: ContextId,
		user_id: UserId,
	) -> Result<(), StorageError> {
		self.state.lock().owners.remove(&(context_id, user_id));
		Ok(())
	}

	async fn begin(
		&self,
		context_id: ContextId,
	) -> Result<Box<dyn MetadataTransaction>, StorageError> {
		Ok(Box::new(InMemoryTransaction { context_id }))
	}
}

pub struct InMemoryTransaction {
	context_id: ContextId,
}

#[async_trait]
impl MetadataTransaction for InMemoryTransaction {
	fn context_id(&self) -> ContextId {
		self.context_id
	}

	async fn commit(self: Box<Self>) -> Result<(), StorageError> {
		Ok(())
	}

	async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
		Ok(())
	}
}
