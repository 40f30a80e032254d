//! Binary-object migration engine.
//!
//! Physically relocates every file owned by a context or a user between
//! storage backends while the rest of the platform keeps resolving those
//! files, under a best-effort consistency model with explicit compensating
//! actions instead of a distributed transaction.

pub mod cache;
pub mod copy;
pub mod error;
pub mod kind;
pub mod listener;
pub mod metadata;
pub mod orchestrator;
pub mod plugins;
pub mod post_process;
pub mod revert;
pub mod sync_tool;

pub use cache::{CacheInvalidator, NoopCacheInvalidator};
pub use copy::{CopyEngine, CopyOutcome, Operation};
pub use error::{HookError, MigrationError, Veto};
pub use kind::{Discovery, Flavor, MoveKind};
pub use listener::{ListenerHub, MoveListener};
pub use metadata::{
	ContextRecord, MetadataStore, MetadataTransaction, UserFilestoreSwitch, UserRecord,
};
pub use orchestrator::{MoveOperation, Mover};
pub use plugins::{FileLocationPlugin, LocationPluginRegistry};
pub use post_process::{PostProcessQueue, PostProcessTask};
pub use revert::Reverter;
pub use sync_tool::{DirectorySyncer, Rsync};
