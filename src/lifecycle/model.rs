use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{BackupStatus, RestoreStatus};
use super::LifecycleError;

/// A backup of one service instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub id: String,
    pub service_instance_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: BackupStatus,
    #[serde(default)]
    pub restores: Vec<Restore>,
}

/// A restore performed from a backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restore {
    pub id: String,
    pub backup_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: RestoreStatus,
}

/// Body of `POST .../backups`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupRequest {
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/// Body of `POST .../restores`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestoreRequest {
    /// Instance to restore into. Defaults to the backup's own instance.
    #[serde(default)]
    pub target_instance_id: Option<String>,
}

/// Body of `POST /admin/service-definition`. Opaque until implemented.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceDefinitionRequest(pub serde_json::Map<String, serde_json::Value>);

/// Usage record of an instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceUsage {
    #[serde(default)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

impl Backup {
    /// A new backup in `create-in-progress`. The id is usable right away.
    pub fn begin(service_instance_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            service_instance_id: service_instance_id.into(),
            created_at: now,
            updated_at: now,
            status: BackupStatus::CreateInProgress,
            restores: Vec::new(),
        }
    }

    /// Moves the backup to `next`. State is unchanged on error.
    pub fn transition(
        &mut self,
        next: BackupStatus,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                id: self.id.clone(),
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn active_restore(&self) -> Option<&Restore> {
        self.restores.iter().find(|r| !r.status.is_terminal())
    }

    /// Starts deletion.
    ///
    /// # Errors
    /// - `ActiveRestores` if a restore is still running.
    /// - `InvalidTransition` unless creation has finished.
    pub fn begin_delete(&mut self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if let Some(restore) = self.active_restore() {
            return Err(LifecycleError::ActiveRestores {
                backup_id: self.id.clone(),
                restore_id: restore.id.clone(),
            });
        }
        self.transition(BackupStatus::DeleteInProgress, now)
    }

    /// Starts a restore and records it on the backup.
    ///
    /// # Errors
    /// `PreconditionFailed` unless the backup is `create-succeeded` with no
    /// other restore running. No restore is recorded on error.
    pub fn begin_restore(&mut self, now: DateTime<Utc>) -> Result<Restore, LifecycleError> {
        if self.status != BackupStatus::CreateSucceeded {
            return Err(LifecycleError::PreconditionFailed {
                backup_id: self.id.clone(),
                reason: format!("backup is '{}', expected 'create-succeeded'", self.status),
            });
        }
        if let Some(active) = self.active_restore() {
            return Err(LifecycleError::PreconditionFailed {
                backup_id: self.id.clone(),
                reason: format!("restore '{}' is still in progress", active.id),
            });
        }

        let restore = Restore {
            id: Uuid::new_v4().to_string(),
            backup_id: self.id.clone(),
            created_at: now,
            updated_at: now,
            status: RestoreStatus::InProgress,
        };
        self.restores.push(restore.clone());
        self.updated_at = now;
        Ok(restore)
    }

    pub fn restore(&self, restore_id: &str) -> Option<&Restore> {
        self.restores.iter().find(|r| r.id == restore_id)
    }

    pub fn restore_mut(&mut self, restore_id: &str) -> Option<&mut Restore> {
        self.restores.iter_mut().find(|r| r.id == restore_id)
    }
}

impl Restore {
    /// Moves the restore to `next`. State is unchanged on error.
    pub fn transition(
        &mut self,
        next: RestoreStatus,
        now: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if !self.status.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                id: self.id.clone(),
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
