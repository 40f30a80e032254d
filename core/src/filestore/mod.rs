//! Filestore identities and the storage handle abstraction.
//!
//! A [`Filestore`] names a storage backend by URI; a [`StorageHandle`] is a
//! capability scoped to one owner inside one backend. Everything above this
//! module talks to storage exclusively through the traits in [`handle`], so
//! backends stay pluggable.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod error;
pub mod handle;
pub mod local;

pub use error::{FileIOError, StorageError};
pub use handle::{QuotaAwareHandle, StorageFactory, StorageHandle};
pub use local::{LocalFilestoreFactory, LocalStorageHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilestoreId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u32);

/// Opaque identifier of a stored object, assigned by the backend on save.
///
/// Backends are free to assign whatever shape of identifier they like; the
/// migration engine never interprets it beyond equality and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub String);

impl fmt::Display for FilestoreId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl fmt::Display for ContextId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl fmt::Display for UserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl fmt::Display for FileId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<&str> for FileId {
	fn from(s: &str) -> Self {
		Self(s.to_owned())
	}
}

/// An identified storage backend: a numeric id plus a base URI such as
/// `file:///srv/fs3` or `s3://bucket`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filestore {
	pub id: FilestoreId,
	pub uri: String,
}

impl Filestore {
	pub fn new(id: FilestoreId, uri: impl Into<String>) -> Self {
		Self {
			id,
			uri: uri.into(),
		}
	}

	pub fn scheme(&self) -> &str {
		self.uri.split("://").next().unwrap_or_default()
	}

	/// Whether this backend is plain-filesystem backed, which is what makes
	/// the directory-level fast path possible.
	pub fn is_file_backed(&self) -> bool {
		self.scheme() == "file"
	}
}

impl fmt::Display for Filestore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "filestore {} ({})", self.id, self.uri)
	}
}

/// Scope of a storage handle: a whole context, or one owner inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageScope {
	pub context_id: ContextId,
	pub owner: Option<UserId>,
}

impl StorageScope {
	pub fn context(context_id: ContextId) -> Self {
		Self {
			context_id,
			owner: None,
		}
	}

	pub fn user(context_id: ContextId, owner: UserId) -> Self {
		Self {
			context_id,
			owner: Some(owner),
		}
	}
}

impl fmt::Display for StorageScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.owner {
			Some(owner) => write!(f, "ctx_{}_user_{owner}", self.context_id),
			None => write!(f, "ctx_{}", self.context_id),
		}
	}
}
