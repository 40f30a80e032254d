//! Plain-filesystem storage backend.
//!
//! Objects live under `<base>/<scope>/<shard>/<uuid>` where `<scope>` is
//! `ctx_<id>` or `ctx_<id>_user_<owner>` and `<shard>` is the first two hex
//! chars of the identifier, to keep directories from growing unbounded.

use std::{
	io::ErrorKind,
	path::{Path, PathBuf},
	sync::Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use uuid::Uuid;

use super::{
	error::{FileIOError, StorageError},
	FileId, Filestore, StorageFactory, StorageHandle, StorageScope,
};

const FILE_SCHEME_PREFIX: &str = "file://";

pub struct LocalFilestoreFactory;

#[async_trait]
impl StorageFactory for LocalFilestoreFactory {
	async fn open(
		&self,
		filestore: &Filestore,
		scope: StorageScope,
	) -> Result<Arc<dyn StorageHandle>, StorageError> {
		let Some(base) = filestore.uri.strip_prefix(FILE_SCHEME_PREFIX) else {
			return Err(StorageError::UnsupportedScheme(
				filestore.scheme().to_owned(),
			));
		};
		if base.is_empty() {
			return Err(StorageError::BadUri {
				uri: filestore.uri.clone(),
				reason: "empty base path".to_owned(),
			});
		}

		let base = PathBuf::from(base);
		// The base directory is the backend itself; its absence means the
		// backend is unreachable, which has to fail resolution up front.
		match fs::metadata(&base).await {
			Ok(meta) if meta.is_dir() => {}
			Ok(_) => {
				return Err(StorageError::BadUri {
					uri: filestore.uri.clone(),
					reason: "base path is not a directory".to_owned(),
				})
			}
			Err(e) => return Err(FileIOError::from((&base, e)).into()),
		}

		Ok(Arc::new(LocalStorageHandle {
			filestore: filestore.clone(),
			scope,
			root: base.join(scope.to_string()),
		}))
	}
}

pub struct LocalStorageHandle {
	filestore: Filestore,
	scope: StorageScope,
	root: PathBuf,
}

impl LocalStorageHandle {
	fn path_of(&self, id: &FileId) -> PathBuf {
		self.root.join(&id.0)
	}

	async fn collect_files(
		root: &Path,
		dir: PathBuf,
		out: &mut Vec<FileId>,
	) -> Result<(), StorageError> {
		// Depth is bounded by the shard layout, so plain recursion via an
		// explicit stack is enough here.
		let mut pending = vec![dir];

		while let Some(dir) = pending.pop() {
			let mut read_dir = match fs::read_dir(&dir).await {
				Ok(read_dir) => read_dir,
				Err(e) if e.kind() == ErrorKind::NotFound => continue,
				Err(e) => return Err(FileIOError::from((&dir, e)).into()),
			};

			while let Some(entry) = read_dir
				.next_entry()
				.await
				.map_err(|e| FileIOError::from((&dir, e)))?
			{
				let path = entry.path();
				let meta = fs::metadata(&path)
					.await
					.map_err(|e| FileIOError::from((&path, e)))?;

				if meta.is_dir() {
					pending.push(path);
				} else {
					let relative = path
						.strip_prefix(root)
						.expect("entry read below root must be below root")
						.to_string_lossy()
						.into_owned();
					out.push(FileId(relative));
				}
			}
		}

		Ok(())
	}
}

#[async_trait]
impl StorageHandle for LocalStorageHandle {
	fn filestore(&self) -> &Filestore {
		&self.filestore
	}

	fn scope(&self) -> StorageScope {
		self.scope
	}

	fn local_root(&self) -> Option<PathBuf> {
		Some(self.root.clone())
	}

	async fn list_files(&self) -> Result<Vec<FileId>, StorageError> {
		let mut files = Vec::new();
		Self::collect_files(&self.root, self.root.clone(), &mut files).await?;
		files.sort_unstable();
		Ok(files)
	}

	async fn get_file(&self, id: &FileId) -> Result<Bytes, StorageError> {
		let path = self.path_of(id);
		match fs::read(&path).await {
			Ok(contents) => Ok(contents.into()),
			Err(e) if e.kind() == ErrorKind::NotFound => {
				Err(StorageError::FileNotFound(id.clone()))
			}
			Err(e) => Err(FileIOError::from((&path, e)).into()),
		}
	}

	async fn file_size(&self, id: &FileId) -> Result<u64, StorageError> {
		let path = self.path_of(id);
		match fs::metadata(&path).await {
			Ok(meta) => Ok(meta.len()),
			Err(e) if e.kind() == ErrorKind::NotFound => {
				Err(StorageError::FileNotFound(id.clone()))
			}
			Err(e) => Err(FileIOError::from((&path, e)).into()),
		}
	}

	async fn save_new_file(&self, contents: Bytes) -> Result<FileId, StorageError> {
		let name = Uuid::new_v4().simple().to_string();
		let id = FileId(format!("{}/{name}", &name[..2]));
		let path = self.path_of(&id);

		let parent = path
			.parent()
			.expect("sharded object path always has a parent");
		fs::create_dir_all(parent)
			.await
			.map_err(|e| FileIOError::from((parent, e)))?;

		fs::write(&path, &contents)
			.await
			.map_err(|e| FileIOError::from((&path, e)))?;

		Ok(id)
	}

	async fn delete_files(&self, ids: &[FileId]) -> Result<(), StorageError> {
		for id in ids {
			let path = self.path_of(id);
			match fs::remove_file(&path).await {
				Ok(()) => {}
				// Deleting an already-gone object is not an error; reverts
				// may race with partially applied deletions.
				Err(e) if e.kind() == ErrorKind::NotFound => {}
				Err(e) => return Err(FileIOError::from((&path, e)).into()),
			}
		}
		Ok(())
	}

	async fn delete_scope_dir(&self) -> Result<(), StorageError> {
		match fs::remove_dir_all(&self.root).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
			Err(e) => Err(FileIOError::from((&self.root, e)).into()),
		}
	}
}
