//! In-memory lifecycle bookkeeping.
//!
//! Records backups and restores and enforces the lifecycle rules, but runs
//! nothing itself. An executor reports outcomes through the `complete_*`
//! methods; until then entities stay in their in-progress state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::model::{Backup, BackupRequest, Restore, RestoreRequest};
use super::state::{BackupStatus, RestoreStatus};
use super::{BackupLifecycle, LifecycleError};

#[derive(Clone, Default)]
pub struct InMemoryLifecycle {
    backups: Arc<RwLock<HashMap<String, Backup>>>,
}

impl InMemoryLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports the outcome of a backup's creation.
    pub fn complete_backup(
        &self,
        backup_id: &str,
        succeeded: bool,
    ) -> Result<Backup, LifecycleError> {
        let next = if succeeded {
            BackupStatus::CreateSucceeded
        } else {
            BackupStatus::CreateFailed
        };
        self.update(backup_id, |backup| backup.transition(next, Utc::now()))
    }

    /// Reports the outcome of a backup's deletion.
    pub fn complete_delete(
        &self,
        backup_id: &str,
        succeeded: bool,
    ) -> Result<Backup, LifecycleError> {
        let next = if succeeded {
            BackupStatus::DeleteSucceeded
        } else {
            BackupStatus::DeleteFailed
        };
        self.update(backup_id, |backup| backup.transition(next, Utc::now()))
    }

    /// Reports the outcome of a restore.
    pub fn complete_restore(
        &self,
        backup_id: &str,
        restore_id: &str,
        succeeded: bool,
    ) -> Result<Restore, LifecycleError> {
        let next = if succeeded {
            RestoreStatus::Succeeded
        } else {
            RestoreStatus::Failed
        };
        let backup = self.update(backup_id, |backup| {
            let now = Utc::now();
            backup
                .restore_mut(restore_id)
                .ok_or_else(|| LifecycleError::RestoreNotFound {
                    restore_id: restore_id.to_string(),
                })?
                .transition(next, now)?;
            backup.updated_at = now;
            Ok(())
        })?;
        backup
            .restore(restore_id)
            .cloned()
            .ok_or_else(|| LifecycleError::RestoreNotFound {
                restore_id: restore_id.to_string(),
            })
    }

    /// Applies `f` under the write lock and returns a snapshot of the result.
    fn update<F>(&self, backup_id: &str, f: F) -> Result<Backup, LifecycleError>
    where
        F: FnOnce(&mut Backup) -> Result<(), LifecycleError>,
    {
        let mut backups = self.backups.write();
        let backup = backups
            .get_mut(backup_id)
            .ok_or_else(|| LifecycleError::BackupNotFound {
                backup_id: backup_id.to_string(),
            })?;
        f(backup)?;
        Ok(backup.clone())
    }

    /// Like `update`, scoped to backups owned by `instance_id`.
    fn update_owned<F, T>(
        &self,
        instance_id: &str,
        backup_id: &str,
        f: F,
    ) -> Result<T, LifecycleError>
    where
        F: FnOnce(&mut Backup) -> Result<T, LifecycleError>,
    {
        let mut backups = self.backups.write();
        let backup = backups
            .get_mut(backup_id)
            .filter(|b| b.service_instance_id == instance_id)
            .ok_or_else(|| LifecycleError::BackupNotFound {
                backup_id: backup_id.to_string(),
            })?;
        f(backup)
    }
}

#[async_trait]
impl BackupLifecycle for InMemoryLifecycle {
    async fn create_backup(
        &self,
        instance_id: &str,
        request: BackupRequest,
    ) -> Result<Backup, LifecycleError> {
        let backup = Backup::begin(instance_id, Utc::now());
        tracing::info!(
            instance_id = %instance_id,
            backup_id = %backup.id,
            parameters = request.parameters.len(),
            "Backup requested"
        );
        self.backups.write().insert(backup.id.clone(), backup.clone());
        Ok(backup)
    }

    async fn list_backups(&self, instance_id: &str) -> Result<Vec<Backup>, LifecycleError> {
        let mut backups: Vec<Backup> = self
            .backups
            .read()
            .values()
            .filter(|b| b.service_instance_id == instance_id)
            .cloned()
            .collect();
        backups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(backups)
    }

    async fn backup(&self, instance_id: &str, backup_id: &str) -> Result<Backup, LifecycleError> {
        self.backups
            .read()
            .get(backup_id)
            .filter(|b| b.service_instance_id == instance_id)
            .cloned()
            .ok_or_else(|| LifecycleError::BackupNotFound {
                backup_id: backup_id.to_string(),
            })
    }

    async fn delete_backup(
        &self,
        instance_id: &str,
        backup_id: &str,
    ) -> Result<String, LifecycleError> {
        self.update_owned(instance_id, backup_id, |backup| {
            backup.begin_delete(Utc::now())?;
            Ok(backup.id.clone())
        })
    }

    async fn restore_backup(
        &self,
        instance_id: &str,
        backup_id: &str,
        request: RestoreRequest,
    ) -> Result<Restore, LifecycleError> {
        let restore = self.update_owned(instance_id, backup_id, |backup| {
            backup.begin_restore(Utc::now())
        })?;
        tracing::info!(
            instance_id = %instance_id,
            backup_id = %backup_id,
            restore_id = %restore.id,
            restore_target = request.target_instance_id.as_deref().unwrap_or(instance_id),
            "Restore requested"
        );
        Ok(restore)
    }

    async fn restore_status(
        &self,
        instance_id: &str,
        backup_id: &str,
        restore_id: &str,
    ) -> Result<Restore, LifecycleError> {
        let backup = self.backup(instance_id, backup_id).await?;
        backup
            .restore(restore_id)
            .cloned()
            .ok_or_else(|| LifecycleError::RestoreNotFound {
                restore_id: restore_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_poll() {
        let lifecycle = InMemoryLifecycle::new();
        let created = lifecycle
            .create_backup("r1", BackupRequest::default())
            .await
            .unwrap();
        assert_eq!(created.status, BackupStatus::CreateInProgress);

        let polled = lifecycle.backup("r1", &created.id).await.unwrap();
        assert_eq!(polled, created);

        lifecycle.complete_backup(&created.id, true).unwrap();
        let polled = lifecycle.backup("r1", &created.id).await.unwrap();
        assert_eq!(polled.status, BackupStatus::CreateSucceeded);
    }

    #[tokio::test]
    async fn test_backups_are_scoped_to_instance() {
        let lifecycle = InMemoryLifecycle::new();
        let created = lifecycle
            .create_backup("r1", BackupRequest::default())
            .await
            .unwrap();

        assert!(matches!(
            lifecycle.backup("r2", &created.id).await,
            Err(LifecycleError::BackupNotFound { .. })
        ));
        assert!(lifecycle.list_backups("r2").await.unwrap().is_empty());
        assert_eq!(lifecycle.list_backups("r1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_on_unfinished_backup_creates_nothing() {
        let lifecycle = InMemoryLifecycle::new();
        let created = lifecycle
            .create_backup("r1", BackupRequest::default())
            .await
            .unwrap();

        let err = lifecycle
            .restore_backup("r1", &created.id, RestoreRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PreconditionFailed { .. }));
        assert!(lifecycle
            .backup("r1", &created.id)
            .await
            .unwrap()
            .restores
            .is_empty());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_active_restore() {
        let lifecycle = InMemoryLifecycle::new();
        let created = lifecycle
            .create_backup("r1", BackupRequest::default())
            .await
            .unwrap();
        lifecycle.complete_backup(&created.id, true).unwrap();
        let restore = lifecycle
            .restore_backup("r1", &created.id, RestoreRequest::default())
            .await
            .unwrap();

        assert!(matches!(
            lifecycle.delete_backup("r1", &created.id).await,
            Err(LifecycleError::ActiveRestores { .. })
        ));
        assert_eq!(
            lifecycle.backup("r1", &created.id).await.unwrap().status,
            BackupStatus::CreateSucceeded
        );

        let done = lifecycle
            .complete_restore(&created.id, &restore.id, true)
            .unwrap();
        assert_eq!(done.status, RestoreStatus::Succeeded);

        let token = lifecycle.delete_backup("r1", &created.id).await.unwrap();
        assert_eq!(token, created.id);
        assert_eq!(
            lifecycle.backup("r1", &created.id).await.unwrap().status,
            BackupStatus::DeleteInProgress
        );

        lifecycle.complete_delete(&created.id, true).unwrap();
        assert_eq!(
            lifecycle.backup("r1", &created.id).await.unwrap().status,
            BackupStatus::DeleteSucceeded
        );
    }

    #[tokio::test]
    async fn test_completed_restore_is_final() {
        let lifecycle = InMemoryLifecycle::new();
        let created = lifecycle
            .create_backup("r1", BackupRequest::default())
            .await
            .unwrap();
        lifecycle.complete_backup(&created.id, true).unwrap();
        let restore = lifecycle
            .restore_backup("r1", &created.id, RestoreRequest::default())
            .await
            .unwrap();
        lifecycle
            .complete_restore(&created.id, &restore.id, false)
            .unwrap();

        assert!(matches!(
            lifecycle.complete_restore(&created.id, &restore.id, true),
            Err(LifecycleError::InvalidTransition { .. })
        ));
        let polled = lifecycle
            .restore_status("r1", &created.id, &restore.id)
            .await
            .unwrap();
        assert_eq!(polled.status, RestoreStatus::Failed);
    }
}
