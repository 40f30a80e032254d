//! Groupware core: tenant filestore management and the binary-object
//! migration engine.
//!
//! The entry point is [`migration::Mover`]: construct it with the platform's
//! storage factory, listener hub, location plugins, metadata store, cache
//! invalidator and sync tool, then prepare and run one
//! [`migration::MoveOperation`] per migration.

pub mod filestore;
pub mod migration;

pub use filestore::{
	ContextId, FileId, Filestore, FilestoreId, StorageError, StorageFactory, StorageHandle,
	StorageScope, UserId,
};
pub use migration::{MigrationError, MoveKind, MoveOperation, Mover};
