//! Caller-supplied follow-up work, run only after full success.

use std::collections::VecDeque;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::debug;

use super::error::{HookError, MigrationError};

pub type PostProcessTask = BoxFuture<'static, Result<(), HookError>>;

/// Multi-producer, single-consumer FIFO of one-shot tasks.
///
/// Any thread may enqueue before the operation is invoked; only the
/// orchestrator drains, after the whole protocol has succeeded. Each task
/// runs exactly once; the first failure is fatal for the overall operation
/// and stops the drain.
#[derive(Default)]
pub struct PostProcessQueue {
	tasks: Mutex<VecDeque<PostProcessTask>>,
}

impl PostProcessQueue {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn enqueue(&self, task: PostProcessTask) {
		self.tasks.lock().push_back(task);
	}

	pub fn len(&self) -> usize {
		self.tasks.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.tasks.lock().is_empty()
	}

	pub(super) async fn drain(&self) -> Result<(), MigrationError> {
		let mut index = 0;

		// Tasks enqueued by a task while draining would run too; the
		// contract only promises FIFO for tasks enqueued before invocation.
		loop {
			let Some(task) = self.tasks.lock().pop_front() else {
				break;
			};

			task.await
				.map_err(|source| MigrationError::PostProcess { index, source })?;
			index += 1;
		}

		if index > 0 {
			debug!(count = index, "post-process tasks completed");
		}

		Ok(())
	}
}
