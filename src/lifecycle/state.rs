//! Backup and restore status machines.
//!
//! Every mutation of a backup or restore goes through
//! [`BackupStatus::can_transition_to`] / [`RestoreStatus::can_transition_to`].

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupStatus {
    CreateInProgress,
    CreateSucceeded,
    CreateFailed,
    DeleteInProgress,
    DeleteSucceeded,
    DeleteFailed,
}

impl BackupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupStatus::CreateInProgress => "create-in-progress",
            BackupStatus::CreateSucceeded => "create-succeeded",
            BackupStatus::CreateFailed => "create-failed",
            BackupStatus::DeleteInProgress => "delete-in-progress",
            BackupStatus::DeleteSucceeded => "delete-succeeded",
            BackupStatus::DeleteFailed => "delete-failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BackupStatus::DeleteSucceeded | BackupStatus::DeleteFailed
        )
    }

    /// Legal edges of the backup lifecycle.
    pub fn can_transition_to(self, next: BackupStatus) -> bool {
        use BackupStatus::*;
        matches!(
            (self, next),
            (CreateInProgress, CreateSucceeded)
                | (CreateInProgress, CreateFailed)
                | (CreateSucceeded, DeleteInProgress)
                | (CreateFailed, DeleteInProgress)
                | (DeleteInProgress, DeleteSucceeded)
                | (DeleteInProgress, DeleteFailed)
        )
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestoreStatus {
    InProgress,
    Succeeded,
    Failed,
}

impl RestoreStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RestoreStatus::InProgress => "in-progress",
            RestoreStatus::Succeeded => "succeeded",
            RestoreStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RestoreStatus::InProgress)
    }

    /// Terminal restores are final; a retry is a new restore.
    pub fn can_transition_to(self, next: RestoreStatus) -> bool {
        matches!(
            (self, next),
            (RestoreStatus::InProgress, RestoreStatus::Succeeded)
                | (RestoreStatus::InProgress, RestoreStatus::Failed)
        )
    }
}

impl fmt::Display for RestoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
