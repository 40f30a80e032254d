//! Cache invalidation SPI (consumed, best-effort).

use async_trait::async_trait;

use crate::filestore::{ContextId, FilestoreId, UserId};

use super::error::HookError;

/// Invalidates the platform's caches after a completed migration. Failures
/// are logged by the orchestrator and never affect the outcome.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
	async fn invalidate_filestore(&self, id: FilestoreId) -> Result<(), HookError>;

	async fn invalidate_context(&self, id: ContextId) -> Result<(), HookError>;

	async fn invalidate_user(&self, context_id: ContextId, id: UserId) -> Result<(), HookError>;
}

/// For deployments without a cache tier.
pub struct NoopCacheInvalidator;

#[async_trait]
impl CacheInvalidator for NoopCacheInvalidator {
	async fn invalidate_filestore(&self, _id: FilestoreId) -> Result<(), HookError> {
		Ok(())
	}

	async fn invalidate_context(&self, _id: ContextId) -> Result<(), HookError> {
		Ok(())
	}

	async fn invalidate_user(
		&self,
		_context_id: ContextId,
		_id: UserId,
	) -> Result<(), HookError> {
		Ok(())
	}
}
