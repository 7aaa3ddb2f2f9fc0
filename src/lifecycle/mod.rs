//! Backup/restore lifecycle contract.
//!
//! Backups and restores are long-running operations exposed through a
//! poll-based API: every mutating call returns an entity in an in-progress
//! state right away, and callers poll by id until it reaches a terminal
//! state. The transition rules live in [`state`]; every implementation of
//! [`BackupLifecycle`] must route mutations through [`Backup::transition`]
//! and [`Restore::transition`].

mod memory;
mod model;
mod state;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryLifecycle;
pub use model::{
    Backup, BackupRequest, Restore, RestoreRequest, ServiceDefinitionRequest, ServiceUsage,
};
pub use state::{BackupStatus, RestoreStatus};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{operation} is not implemented")]
    NotImplemented { operation: &'static str },

    #[error("backup '{backup_id}' not found")]
    BackupNotFound { backup_id: String },

    #[error("restore '{restore_id}' not found")]
    RestoreNotFound { restore_id: String },

    #[error("'{id}' cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    #[error("backup '{backup_id}' has restore '{restore_id}' in progress")]
    ActiveRestores {
        backup_id: String,
        restore_id: String,
    },

    #[error("backup '{backup_id}': {reason}")]
    PreconditionFailed { backup_id: String, reason: String },
}

/// Operations on backups and restores of one broker.
///
/// Every entity is addressed through its owning instance; an id that exists
/// under another instance is reported as not found.
#[async_trait]
pub trait BackupLifecycle: Send + Sync + 'static {
    /// Starts a backup. Returns it in `create-in-progress`.
    async fn create_backup(
        &self,
        instance_id: &str,
        request: BackupRequest,
    ) -> Result<Backup, LifecycleError>;

    async fn list_backups(&self, instance_id: &str) -> Result<Vec<Backup>, LifecycleError>;

    async fn backup(&self, instance_id: &str, backup_id: &str) -> Result<Backup, LifecycleError>;

    /// Starts deletion. Returns a token to poll with (the backup id).
    async fn delete_backup(
        &self,
        instance_id: &str,
        backup_id: &str,
    ) -> Result<String, LifecycleError>;

    /// Starts a restore. Returns it in `in-progress`.
    async fn restore_backup(
        &self,
        instance_id: &str,
        backup_id: &str,
        request: RestoreRequest,
    ) -> Result<Restore, LifecycleError>;

    async fn restore_status(
        &self,
        instance_id: &str,
        backup_id: &str,
        restore_id: &str,
    ) -> Result<Restore, LifecycleError>;
}

/// Lifecycle binding for brokers without a backup executor.
///
/// Every operation fails with `NotImplemented`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedLifecycle;

#[async_trait]
impl BackupLifecycle for UnimplementedLifecycle {
    async fn create_backup(&self, _: &str, _: BackupRequest) -> Result<Backup, LifecycleError> {
        Err(LifecycleError::NotImplemented {
            operation: "create-backup",
        })
    }

    async fn list_backups(&self, _: &str) -> Result<Vec<Backup>, LifecycleError> {
        Err(LifecycleError::NotImplemented {
            operation: "list-backups",
        })
    }

    async fn backup(&self, _: &str, _: &str) -> Result<Backup, LifecycleError> {
        Err(LifecycleError::NotImplemented { operation: "backup" })
    }

    async fn delete_backup(&self, _: &str, _: &str) -> Result<String, LifecycleError> {
        Err(LifecycleError::NotImplemented {
            operation: "delete-backup",
        })
    }

    async fn restore_backup(
        &self,
        _: &str,
        _: &str,
        _: RestoreRequest,
    ) -> Result<Restore, LifecycleError> {
        Err(LifecycleError::NotImplemented {
            operation: "restore-backup",
        })
    }

    async fn restore_status(&self, _: &str, _: &str, _: &str) -> Result<Restore, LifecycleError> {
        Err(LifecycleError::NotImplemented {
            operation: "restore-status",
        })
    }
}
