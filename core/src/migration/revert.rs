//! Compensating actions captured at copy time.

use std::{path::PathBuf, sync::Arc};

use tokio::fs;
use tracing::{info, warn};

use crate::filestore::{FileIOError, FileId, StorageHandle};

use super::{error::MigrationError, sync_tool::DirectorySyncer};

/// Undoes a completed (or partially completed) copy phase.
///
/// Consumed by value: a reverter runs at most once. Absent entirely when
/// nothing was copied.
pub enum Reverter {
	/// Deletes the individual objects the copy phase wrote at the
	/// destination.
	Objects {
		destination: Arc<dyn StorageHandle>,
		created: Vec<FileId>,
	},
	/// Re-runs the directory sync tool in the opposite direction, then
	/// deletes the now-redundant destination copy.
	Directory {
		syncer: Arc<dyn DirectorySyncer>,
		source_dir: PathBuf,
		dest_dir: PathBuf,
	},
}

impl Reverter {
	pub async fn revert(self) -> Result<(), MigrationError> {
		match self {
			Self::Objects {
				destination,
				created,
			} => {
				info!(
					count = created.len(),
					filestore = %destination.filestore(),
					"reverting copied objects"
				);
				destination.delete_files(&created).await?;
				Ok(())
			}
			Self::Directory {
				syncer,
				source_dir,
				dest_dir,
			} => {
				info!(
					source = %source_dir.display(),
					dest = %dest_dir.display(),
					"reverting directory-level copy"
				);
				syncer.sync(&dest_dir, &source_dir).await?;
				fs::remove_dir_all(&dest_dir)
					.await
					.map_err(|e| MigrationError::Storage(
						FileIOError::from((&dest_dir, e)).into(),
					))?;
				Ok(())
			}
		}
	}

	/// Runs the revert and downgrades its own failure to a warning; used
	/// where the original error must win.
	pub async fn revert_or_log(self) {
		if let Err(e) = self.revert().await {
			warn!(error = %e, "revert of copy phase failed, manual remediation required");
		}
	}
}
