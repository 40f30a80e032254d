use thiserror::Error;

use crate::filestore::{FileId, FileIOError, StorageError};

/// Error type for filestore migrations.
///
/// Everything is fatal; what differs is the compensation policy. Failures
/// raised before the metadata switch abort cleanly through the reverter;
/// failures raised after it are logged with an operator-facing remediation
/// signal and never retried automatically.
#[derive(Error, Debug)]
pub enum MigrationError {
	#[error("storage failure: {0}")]
	Storage(#[from] StorageError),
	#[error("byte transfer failed for file <id='{file}'>: {source}")]
	Transfer {
		file: FileId,
		#[source]
		source: FileIOError,
	},
	#[error("migration cancelled")]
	Cancelled,
	#[error("external sync tool '{tool}' exited with status {status}")]
	ExternalTool { tool: String, status: i32 },
	#[error("operation vetoed by listener '{listener}': {reason}")]
	Veto { listener: String, reason: String },
	#[error("post-process task #{index} failed: {source}")]
	PostProcess {
		index: usize,
		#[source]
		source: HookError,
	},
}

/// Failure of an observational hook (after-listener, cache invalidation,
/// post-process task).
#[derive(Error, Debug)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
	pub fn new(msg: impl Into<String>) -> Self {
		Self(msg.into())
	}
}

/// A before-hook's refusal. Aborts the operation before any mutation.
#[derive(Error, Debug)]
#[error("{reason}")]
pub struct Veto {
	pub reason: String,
}

impl Veto {
	pub fn new(reason: impl Into<String>) -> Self {
		Self {
			reason: reason.into(),
		}
	}
}
