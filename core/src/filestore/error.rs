use std::{fmt::Display, path::Path};

use thiserror::Error;

use super::FileId;

/// File I/O error that includes the path that caused the error
#[derive(Error, Debug)]
pub struct FileIOError {
	pub path: Box<Path>,
	#[source]
	pub source: std::io::Error,
}

impl Display for FileIOError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"file I/O error: {}; path: '{}'",
			self.source,
			self.path.display()
		)
	}
}

impl<P: AsRef<Path>> From<(P, std::io::Error)> for FileIOError {
	fn from((path, source): (P, std::io::Error)) -> Self {
		Self {
			path: path.as_ref().into(),
			source,
		}
	}
}

/// Error type for storage handle resolution and access
#[derive(Error, Debug)]
pub enum StorageError {
	#[error("malformed filestore URI: '{uri}' ({reason})")]
	BadUri { uri: String, reason: String },
	#[error("no backend registered for filestore URI scheme: '{0}'")]
	UnsupportedScheme(String),
	#[error("file not found in filestore: <id='{0}'>")]
	FileNotFound(FileId),
	#[error(transparent)]
	Io(#[from] FileIOError),
	#[error("metadata persistence failure: {0}")]
	Persistence(String),
}
