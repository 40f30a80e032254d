//! In-memory storage backend (`mem://` URIs), for exercising the non-
//! filesystem-backed paths without an object store around.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use uuid::Uuid;

use gw_core::{
	filestore::{FileId, Filestore, StorageError, StorageFactory, StorageHandle, StorageScope},
};

type Objects = HashMap<FileId, Bytes>;
type Stores = HashMap<(String, StorageScope), Objects>;

#[derive(Default)]
pub struct MemFactory {
	stores: Arc<Mutex<Stores>>,
}

impl MemFactory {
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl StorageFactory for MemFactory {
	async fn open(
		&self,
		filestore: &Filestore,
		scope: StorageScope,
	) -> Result<Arc<dyn StorageHandle>, StorageError> {
		if filestore.scheme() != "mem" {
			return Err(StorageError::UnsupportedScheme(
				filestore.scheme().to_owned(),
			));
		}

		Ok(Arc::new(MemHandle {
			stores: Arc::clone(&self.stores),
			key: (filestore.uri.clone(), scope),
			filestore: filestore.clone(),
			scope,
		}))
	}
}

pub struct MemHandle {
	stores: Arc<Mutex<Stores>>,
	key: (String, StorageScope),
	filestore: Filestore,
	scope: StorageScope,
}

#[async_trait]
impl StorageHandle for MemHandle {
	fn filestore(&self) -> &Filestore {
		&self.filestore
	}

	fn scope(&self) -> StorageScope {
		self.scope
	}

	async fn list_files(&self) -> Result<Vec<FileId>, StorageError> {
		let stores = self.stores.lock();
		let mut files: Vec<_> = stores
			.get(&self.key)
			.map(|objects| objects.keys().cloned().collect())
			.unwrap_or_default();
		files.sort_unstable();
		Ok(files)
	}

	async fn get_file(&self, id: &FileId) -> Result<Bytes, StorageError> {
		self.stores
			.lock()
			.get(&self.key)
			.and_then(|objects| objects.get(id).cloned())
			.ok_or_else(|| StorageError::FileNotFound(id.clone()))
	}

	async fn file_size(&self, id: &FileId) -> Result<u64, StorageError> {
		Ok(self.get_file(id).await?.len() as u64)
	}

	async fn save_new_file(&self, contents: Bytes) -> Result<FileId, StorageError> {
		let id = FileId(Uuid::new_v4().simple().to_string());
		self.stores
			.lock()
			.entry(self.key.clone())
			.or_default()
			.insert(id.clone(), contents);
		Ok(id)
	}

	async fn delete_files(&self, ids: &[FileId]) -> Result<(), StorageError> {
		let mut stores = self.stores.lock();
		if let Some(objects) = stores.get_mut(&self.key) {
			for id in ids {
				objects.remove(id);
			}
		}
		Ok(())
	}
}
