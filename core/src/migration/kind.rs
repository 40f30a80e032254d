//! The six migration kinds.
//!
//! One tagged enum instead of an orchestrator subclass per kind: each
//! variant answers which storage scopes to open, how the file set is
//! discovered, which finalization flavor applies, and what its metadata
//! switch writes.

use serde::{Deserialize, Serialize};

use crate::filestore::{ContextId, Filestore, StorageError, StorageScope, UserId};

use super::metadata::{MetadataStore, UserFilestoreSwitch};

#[derive(Debug, Clone, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MoveKind {
	/// Relocate a whole context-shared store to another backend.
	ContextRelocation {
		context_id: ContextId,
		from: Filestore,
		to: Filestore,
	},
	/// Relocate a user's individually-owned store to another backend.
	UserRelocation {
		context_id: ContextId,
		user_id: UserId,
		from: Filestore,
		to: Filestore,
	},
	/// Give a user its own store, pulling its files out of the
	/// context-shared one.
	ContextToUser {
		context_id: ContextId,
		user_id: UserId,
		from: Filestore,
		to: Filestore,
		filestore_name: String,
		max_quota: Option<u64>,
	},
	/// Dissolve a user's own store back into the context-shared one.
	UserToContext {
		context_id: ContextId,
		user_id: UserId,
		from: Filestore,
		to: Filestore,
	},
	/// Fold a user's own store into its master user's store.
	UserToMaster {
		context_id: ContextId,
		user_id: UserId,
		master_id: UserId,
		from: Filestore,
		to: Filestore,
	},
	/// Carve a user's files out of its master user's store into an own one.
	MasterToUser {
		context_id: ContextId,
		user_id: UserId,
		master_id: UserId,
		from: Filestore,
		to: Filestore,
		filestore_name: String,
		max_quota: Option<u64>,
	},
}

/// Finalization ordering: two deliberately distinct protocols, never
/// unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
	/// Finalize in-line, before the metadata switch.
	SameOwnerRelocation,
	/// Switch metadata first, finalize deferred.
	OwnershipTransfer,
}

/// How the file set to migrate is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
	/// Ask the source handle for its complete listing.
	DirectListing,
	/// Union over the file-location plugins for (user, context).
	PluginUnion,
}

impl MoveKind {
	pub fn context_id(&self) -> ContextId {
		match *self {
			Self::ContextRelocation { context_id, .. }
			| Self::UserRelocation { context_id, .. }
			| Self::ContextToUser { context_id, .. }
			| Self::UserToContext { context_id, .. }
			| Self::UserToMaster { context_id, .. }
			| Self::MasterToUser { context_id, .. } => context_id,
		}
	}

	/// The user whose files are the subject, when there is one.
	pub fn user_id(&self) -> Option<UserId> {
		match *self {
			Self::ContextRelocation { .. } => None,
			Self::UserRelocation { user_id, .. }
			| Self::ContextToUser { user_id, .. }
			| Self::UserToContext { user_id, .. }
			| Self::UserToMaster { user_id, .. }
			| Self::MasterToUser { user_id, .. } => Some(user_id),
		}
	}

	pub fn master_id(&self) -> Option<UserId> {
		match *self {
			Self::UserToMaster { master_id, .. } | Self::MasterToUser { master_id, .. } => {
				Some(master_id)
			}
			_ => None,
		}
	}

	pub fn from(&self) -> &Filestore {
		match self {
			Self::ContextRelocation { from, .. }
			| Self::UserRelocation { from, .. }
			| Self::ContextToUser { from, .. }
			| Self::UserToContext { from, .. }
			| Self::UserToMaster { from, .. }
			| Self::MasterToUser { from, .. } => from,
		}
	}

	pub fn to(&self) -> &Filestore {
		match self {
			Self::ContextRelocation { to, .. }
			| Self::UserRelocation { to, .. }
			| Self::ContextToUser { to, .. }
			| Self::UserToContext { to, .. }
			| Self::UserToMaster { to, .. }
			| Self::MasterToUser { to, .. } => to,
		}
	}

	pub fn flavor(&self) -> Flavor {
		match self {
			Self::ContextRelocation { .. } | Self::UserRelocation { .. } => {
				Flavor::SameOwnerRelocation
			}
			_ => Flavor::OwnershipTransfer,
		}
	}

	pub fn discovery(&self) -> Discovery {
		match self {
			// A user's files inside a store shared with others can only be
			// found through the domain plugins.
			Self::ContextToUser { .. } | Self::MasterToUser { .. } => Discovery::PluginUnion,
			_ => Discovery::DirectListing,
		}
	}

	pub fn source_scope(&self) -> StorageScope {
		match *self {
			Self::ContextRelocation { context_id, .. }
			| Self::ContextToUser { context_id, .. } => StorageScope::context(context_id),
			Self::UserRelocation {
				context_id,
				user_id,
				..
			}
			| Self::UserToContext {
				context_id,
				user_id,
				..
			}
			| Self::UserToMaster {
				context_id,
				user_id,
				..
			} => StorageScope::user(context_id, user_id),
			Self::MasterToUser {
				context_id,
				master_id,
				..
			} => StorageScope::user(context_id, master_id),
		}
	}

	pub fn dest_scope(&self) -> StorageScope {
		match *self {
			Self::ContextRelocation { context_id, .. }
			| Self::UserToContext { context_id, .. } => StorageScope::context(context_id),
			Self::UserRelocation {
				context_id,
				user_id,
				..
			}
			| Self::ContextToUser {
				context_id,
				user_id,
				..
			}
			| Self::MasterToUser {
				context_id,
				user_id,
				..
			} => StorageScope::user(context_id, user_id),
			Self::UserToMaster {
				context_id,
				master_id,
				..
			} => StorageScope::user(context_id, master_id),
		}
	}

	/// Ownership transfers mirror every save/delete into the usage ledger;
	/// same-owner relocations leave the ledger alone (the owner key does not
	/// change, only the backend does).
	pub fn quota_aware(&self) -> bool {
		self.flavor() == Flavor::OwnershipTransfer
	}

	/// Only same-owner relocations may take the directory-level fast path;
	/// ownership transfers always need the object loop (different scope
	/// directory, per-object ledger mirroring).
	pub fn fast_path_eligible(&self) -> bool {
		self.flavor() == Flavor::SameOwnerRelocation
			&& self.from().is_file_backed()
			&& self.to().is_file_backed()
	}

	/// Writes the entity metadata for this kind: the Filestore pointer and,
	/// for ownership transfers, owner, display name, quota ceiling, and the
	/// ownership-mapping table.
	pub(super) async fn switch_metadata(
		&self,
		store: &dyn MetadataStore,
	) -> Result<(), StorageError> {
		match self {
			Self::ContextRelocation { context_id, to, .. } => {
				store.set_context_filestore(*context_id, to.id).await
			}
			Self::UserRelocation {
				context_id,
				user_id,
				to,
				..
			} => {
				// Only the pointer moves; owner, name and quota survive.
				let current = store.user(*context_id, *user_id).await?;
				store
					.set_user_filestore(
						*context_id,
						*user_id,
						UserFilestoreSwitch {
							filestore_id: Some(to.id),
							filestore_owner: current.filestore_owner,
							filestore_name: current.filestore_name,
							max_quota: current.max_quota,
						},
					)
					.await
			}
			Self::ContextToUser {
				context_id,
				user_id,
				to,
				filestore_name,
				max_quota,
				..
			} => {
				store
					.set_user_filestore(
						*context_id,
						*user_id,
						UserFilestoreSwitch {
							filestore_id: Some(to.id),
							filestore_owner: None,
							filestore_name: Some(filestore_name.clone()),
							max_quota: *max_quota,
						},
					)
					.await?;
				store
					.add_filestore_owner(*context_id, *user_id, to.id)
					.await
			}
			Self::UserToContext {
				context_id,
				user_id,
				..
			} => {
				store
					.set_user_filestore(
						*context_id,
						*user_id,
						UserFilestoreSwitch {
							filestore_id: None,
							filestore_owner: None,
							filestore_name: None,
							max_quota: None,
						},
					)
					.await?;
				store.remove_filestore_owner(*context_id, *user_id).await
			}
			Self::UserToMaster {
				context_id,
				user_id,
				master_id,
				to,
				..
			} => {
				store
					.set_user_filestore(
						*context_id,
						*user_id,
						UserFilestoreSwitch {
							filestore_id: Some(to.id),
							filestore_owner: Some(*master_id),
							filestore_name: None,
							max_quota: None,
						},
					)
					.await?;
				store.remove_filestore_owner(*context_id, *user_id).await
			}
			Self::MasterToUser {
				context_id,
				user_id,
				to,
				filestore_name,
				max_quota,
				..
			} => {
				store
					.set_user_filestore(
						*context_id,
						*user_id,
						UserFilestoreSwitch {
							filestore_id: Some(to.id),
							filestore_owner: None,
							filestore_name: Some(filestore_name.clone()),
							max_quota: *max_quota,
						},
					)
					.await?;
				store
					.add_filestore_owner(*context_id, *user_id, to.id)
					.await
			}
		}
	}
}
