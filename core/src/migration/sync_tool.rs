//! Directory-level fast path: hand the whole scope directory to an external
//! synchronization tool instead of looping over objects.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::filestore::FileIOError;

use super::error::MigrationError;

/// External directory synchronization capability.
///
/// Implementations block on a child process. Cancellation is only possible
/// at process-exit granularity: interrupting the waiting task does not kill
/// the tool. Known limitation of this design.
#[async_trait]
pub trait DirectorySyncer: Send + Sync {
	fn name(&self) -> &str;

	/// Replicates the contents of `from` into `to`, creating `to` as needed.
	async fn sync(&self, from: &Path, to: &Path) -> Result<(), MigrationError>;
}

/// `rsync -a` based syncer, the default for filesystem-backed stores.
pub struct Rsync;

pub const RSYNC_BIN: &str = "rsync";

#[async_trait]
impl DirectorySyncer for Rsync {
	fn name(&self) -> &str {
		RSYNC_BIN
	}

	async fn sync(&self, from: &Path, to: &Path) -> Result<(), MigrationError> {
		debug!(from = %from.display(), to = %to.display(), "invoking rsync");

		// Trailing slash on the source makes rsync copy the directory's
		// contents rather than the directory itself.
		let mut source = from.as_os_str().to_owned();
		source.push("/");

		let output = Command::new(RSYNC_BIN)
			.arg("-a")
			.arg(source)
			.arg(to)
			.output()
			.await
			.map_err(|e| MigrationError::Storage(FileIOError::from((from, e)).into()))?;

		if output.status.success() {
			return Ok(());
		}

		let status = output.status.code().unwrap_or(-1);
		error!(
			status,
			stderr = %String::from_utf8_lossy(&output.stderr),
			"rsync failed"
		);

		Err(MigrationError::ExternalTool {
			tool: RSYNC_BIN.to_owned(),
			status,
		})
	}
}
