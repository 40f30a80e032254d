use crate::migration::metadata::MetadataStore;

use std::{fmt, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;

use super::{error::StorageError, FileId, Filestore, StorageScope};

/// A capability scoped to one owner inside one storage backend.
///
/// Handles are the only way the migration engine touches bytes. A handle is
/// opened for a `(Filestore, StorageScope)` pair and stays valid for the
/// lifetime of one operation; backends assign their own identifiers on save,
/// which is why migrations must track an old-to-new rename map.
#[async_trait]
pub trait StorageHandle: Send + Sync {
	fn filestore(&self) -> &Filestore;

	fn scope(&self) -> StorageScope;

	/// The scope directory on disk, for filesystem-backed stores only.
	///
	/// `Some` is what qualifies a source/destination pair for the
	/// directory-level fast path.
	fn local_root(&self) -> Option<PathBuf> {
		None
	}

	/// Complete list of objects reachable in this scope.
	async fn list_files(&self) -> Result<Vec<FileId>, StorageError>;

	async fn get_file(&self, id: &FileId) -> Result<Bytes, StorageError>;

	async fn file_size(&self, id: &FileId) -> Result<u64, StorageError>;

	/// Stores `contents` as a new object and returns the identifier the
	/// backend picked for it.
	async fn save_new_file(&self, contents: Bytes) -> Result<FileId, StorageError>;

	async fn delete_files(&self, ids: &[FileId]) -> Result<(), StorageError>;

	/// Removes the (expected-empty) scope directory itself. No-op for
	/// backends without a directory notion.
	async fn delete_scope_dir(&self) -> Result<(), StorageError> {
		Ok(())
	}
}

impl fmt::Debug for dyn StorageHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StorageHandle")
			.field("filestore", &self.filestore().id)
			.field("scope", &self.scope())
			.finish()
	}
}

/// Resolves `(Filestore, StorageScope)` pairs into live handles.
///
/// Resolution failure (unknown scheme, malformed URI, unreachable backend)
/// must surface here, before any byte of any file is touched.
#[async_trait]
pub trait StorageFactory: Send + Sync {
	async fn open(
		&self,
		filestore: &Filestore,
		scope: StorageScope,
	) -> Result<Arc<dyn StorageHandle>, StorageError>;
}

/// Decorator that mirrors every save/delete into the usage ledger for the
/// handle's owner key.
///
/// This is quota *bookkeeping* only; nothing here ever rejects a write for
/// being over quota.
pub struct QuotaAwareHandle {
	inner: Arc<dyn StorageHandle>,
	ledger: Arc<dyn MetadataStore>,
	key: StorageScope,
}

impl QuotaAwareHandle {
	pub fn new(inner: Arc<dyn StorageHandle>, ledger: Arc<dyn MetadataStore>) -> Self {
		let key = inner.scope();
		Self { inner, ledger, key }
	}
}

#[async_trait]
impl StorageHandle for QuotaAwareHandle {
	fn filestore(&self) -> &Filestore {
		self.inner.filestore()
	}

	fn scope(&self) -> StorageScope {
		self.inner.scope()
	}

	fn local_root(&self) -> Option<PathBuf> {
		self.inner.local_root()
	}

	async fn list_files(&self) -> Result<Vec<FileId>, StorageError> {
		self.inner.list_files().await
	}

	async fn get_file(&self, id: &FileId) -> Result<Bytes, StorageError> {
		self.inner.get_file(id).await
	}

	async fn file_size(&self, id: &FileId) -> Result<u64, StorageError> {
		self.inner.file_size(id).await
	}

	async fn save_new_file(&self, contents: Bytes) -> Result<FileId, StorageError> {
		let len = contents.len() as i64;
		let id = self.inner.save_new_file(contents).await?;
		self.ledger.adjust_usage(self.key, len).await?;
		Ok(id)
	}

	async fn delete_files(&self, ids: &[FileId]) -> Result<(), StorageError> {
		let mut reclaimed = 0i64;
		for id in ids {
			reclaimed += self.inner.file_size(id).await? as i64;
		}
		self.inner.delete_files(ids).await?;
		self.ledger.adjust_usage(self.key, -reclaimed).await?;
		Ok(())
	}

	async fn delete_scope_dir(&self) -> Result<(), StorageError> {
		self.inner.delete_scope_dir().await
	}
}
