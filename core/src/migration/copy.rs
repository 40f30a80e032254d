//! Object-level copy engine (the slow path).
//!
//! Strictly sequential by design: one file in flight bounds backend
//! connection pressure and keeps the rename map and byte counter trivial to
//! reason about under failure.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::filestore::{FileId, StorageError, StorageHandle};

use super::{error::MigrationError, revert::Reverter};

/// How a copy phase classified itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
	/// Bytes were physically transferred.
	Copied,
	/// The source file set was empty; only ledger bookkeeping remains.
	Noop,
}

/// Result of a completed copy phase, threaded explicitly into finalization.
pub struct CopyOutcome {
	pub operation: Operation,
	pub rename_map: HashMap<FileId, FileId>,
	pub total_bytes: u64,
	pub reverter: Option<Reverter>,
}

impl CopyOutcome {
	pub fn noop(total_bytes: u64) -> Self {
		Self {
			operation: Operation::Noop,
			rename_map: HashMap::new(),
			total_bytes,
			reverter: None,
		}
	}

	/// Takes the reverter out, leaving the outcome otherwise intact.
	pub fn take_reverter(&mut self) -> Option<Reverter> {
		self.reverter.take()
	}
}

/// A copy-phase failure, paired with whatever compensation is already owed
/// for objects written before the failure. The orchestrator owns running it.
pub struct CopyPhaseError {
	pub error: MigrationError,
	pub reverter: Option<Reverter>,
}

impl CopyPhaseError {
	fn new(error: MigrationError, reverter: Option<Reverter>) -> Self {
		Self { error, reverter }
	}
}

pub struct CopyEngine {
	source: Arc<dyn StorageHandle>,
	destination: Arc<dyn StorageHandle>,
	cancel: CancellationToken,
}

impl CopyEngine {
	pub fn new(
		source: Arc<dyn StorageHandle>,
		destination: Arc<dyn StorageHandle>,
		cancel: CancellationToken,
	) -> Self {
		Self {
			source,
			destination,
			cancel,
		}
	}

	/// Copies `files` one by one from source to destination, recording the
	/// identifier each object was reassigned at the destination.
	pub async fn copy_all(&self, files: &[FileId]) -> Result<CopyOutcome, CopyPhaseError> {
		if files.is_empty() {
			return Ok(CopyOutcome::noop(0));
		}

		let mut rename_map = HashMap::with_capacity(files.len());
		let mut created = Vec::with_capacity(files.len());
		let mut total_bytes = 0u64;

		for old_id in files {
			if self.cancel.is_cancelled() {
				return Err(CopyPhaseError::new(
					MigrationError::Cancelled,
					self.reverter_for(created),
				));
			}

			let contents = match self.source.get_file(old_id).await {
				Ok(contents) => contents,
				Err(e) => {
					return Err(CopyPhaseError::new(
						transfer_error(old_id, e),
						self.reverter_for(created),
					))
				}
			};
			let len = contents.len() as u64;

			let new_id = match self.destination.save_new_file(contents).await {
				Ok(new_id) => new_id,
				Err(e) => {
					return Err(CopyPhaseError::new(
						transfer_error(old_id, e),
						self.reverter_for(created),
					))
				}
			};

			trace!(%old_id, %new_id, len, "copied object");
			created.push(new_id.clone());
			rename_map.insert(old_id.clone(), new_id);
			total_bytes += len;
		}

		debug!(
			files = rename_map.len(),
			total_bytes,
			source = %self.source.filestore(),
			destination = %self.destination.filestore(),
			"copy phase complete"
		);

		let reverter = self.reverter_for(created);
		Ok(CopyOutcome {
			operation: Operation::Copied,
			rename_map,
			total_bytes,
			reverter,
		})
	}

	fn reverter_for(&self, created: Vec<FileId>) -> Option<Reverter> {
		(!created.is_empty()).then(|| Reverter::Objects {
			destination: Arc::clone(&self.destination),
			created,
		})
	}
}

/// Byte I/O during the copy loop is a transfer failure; anything else the
/// backend reports stays a storage failure.
fn transfer_error(file: &FileId, e: StorageError) -> MigrationError {
	match e {
		StorageError::Io(source) => MigrationError::Transfer {
			file: file.clone(),
			source,
		},
		other => MigrationError::Storage(other),
	}
}
