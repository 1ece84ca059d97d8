use dbu_client::ClientError;
use dbu_reconcile::{UpdateStep, ValidationError};
use thiserror::Error;

use crate::{Operation, RemoteCall};

/// Failure of a lifecycle operation.
///
/// Every variant names the operation and the user (`database_id`/`username`)
/// and keeps the underlying cause as its `source`.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{operation} database user {database_id}/{username}: invalid declaration: {source}")]
    Validation {
        operation: Operation,
        database_id: String,
        username: String,
        source: ValidationError,
    },

    #[error("{operation} database user {database_id}/{username}: user not found")]
    NotFound {
        operation: Operation,
        database_id: String,
        username: String,
    },

    #[error("{operation} database user {database_id}/{username}: {call} failed: {source}")]
    RemoteCallFailure {
        operation: Operation,
        call: RemoteCall,
        database_id: String,
        username: String,
        source: ClientError,
    },

    /// A later update call failed after earlier calls of the same update
    /// succeeded. Nothing is rolled back; `completed` were applied remotely.
    #[error(
        "update database user {database_id}/{username}: {failed} failed after {} succeeded, remote user partially updated: {source}",
        steps(.completed)
    )]
    PartialUpdateFailure {
        database_id: String,
        username: String,
        completed: Vec<UpdateStep>,
        failed: UpdateStep,
        source: ClientError,
    },

    /// Every update call succeeded but reading the user back failed.
    /// `completed` were applied remotely; the cached state is stale.
    #[error(
        "update database user {database_id}/{username}: {} applied but GetUser failed: {source}",
        steps(.completed)
    )]
    UpdateUnconfirmed {
        database_id: String,
        username: String,
        completed: Vec<UpdateStep>,
        source: ClientError,
    },

    /// The user was created remotely but a follow-up call failed. The user
    /// exists and must be reconciled, not created again.
    #[error(
        "create database user {database_id}/{username}: user created but {call} failed: {source}"
    )]
    CreateIncomplete {
        database_id: String,
        username: String,
        call: RemoteCall,
        source: ClientError,
    },
}

impl LifecycleError {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Validation { operation, .. }
            | Self::NotFound { operation, .. }
            | Self::RemoteCallFailure { operation, .. } => *operation,
            Self::PartialUpdateFailure { .. } | Self::UpdateUnconfirmed { .. } => {
                Operation::Update
            }
            Self::CreateIncomplete { .. } => Operation::Create,
        }
    }

    pub fn username(&self) -> &str {
        match self {
            Self::Validation { username, .. }
            | Self::NotFound { username, .. }
            | Self::RemoteCallFailure { username, .. }
            | Self::PartialUpdateFailure { username, .. }
            | Self::UpdateUnconfirmed { username, .. }
            | Self::CreateIncomplete { username, .. } => username,
        }
    }

    pub fn database_id(&self) -> &str {
        match self {
            Self::Validation { database_id, .. }
            | Self::NotFound { database_id, .. }
            | Self::RemoteCallFailure { database_id, .. }
            | Self::PartialUpdateFailure { database_id, .. }
            | Self::UpdateUnconfirmed { database_id, .. }
            | Self::CreateIncomplete { database_id, .. } => database_id,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the caller's cancellation or deadline stopped the operation.
    pub fn is_cancelled(&self) -> bool {
        self.client_error().is_some_and(ClientError::is_cancelled)
    }

    /// True when the remote user is known to exist despite the failure.
    pub fn entity_exists(&self) -> bool {
        match self {
            Self::PartialUpdateFailure { .. } | Self::CreateIncomplete { .. } => true,
            Self::UpdateUnconfirmed { source, .. } => !source.is_not_found(),
            Self::Validation { .. } | Self::NotFound { .. } | Self::RemoteCallFailure { .. } => {
                false
            }
        }
    }

    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::RemoteCallFailure { source, .. }
            | Self::PartialUpdateFailure { source, .. }
            | Self::UpdateUnconfirmed { source, .. }
            | Self::CreateIncomplete { source, .. } => Some(source),
            Self::Validation { .. } | Self::NotFound { .. } => None,
        }
    }
}

fn steps(steps: &[UpdateStep]) -> String {
    steps
        .iter()
        .map(UpdateStep::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_operation_user_and_cause() {
        let e = LifecycleError::RemoteCallFailure {
            operation: Operation::Read,
            call: RemoteCall::GetUser,
            database_id: "db1".to_string(),
            username: "alice".to_string(),
            source: ClientError::Transport("connection refused".to_string()),
        };
        assert_eq!(
            e.to_string(),
            "read database user db1/alice: GetUser failed: transport error: connection refused"
        );
    }

    #[test]
    fn partial_update_lists_completed_steps() {
        let e = LifecycleError::PartialUpdateFailure {
            database_id: "db1".to_string(),
            username: "alice".to_string(),
            completed: vec![UpdateStep::Password, UpdateStep::AccessControl],
            failed: UpdateStep::Permission,
            source: ClientError::Api {
                status: 500,
                message: "boom".to_string(),
            },
        };
        let s = e.to_string();
        assert!(s.contains("permission failed after password, access_control succeeded"));
        assert!(e.entity_exists());
        assert_eq!(e.operation(), Operation::Update);
    }

    #[test]
    fn failed_read_back_after_applied_steps_still_reports_existence() {
        let e = LifecycleError::UpdateUnconfirmed {
            database_id: "db1".to_string(),
            username: "alice".to_string(),
            completed: vec![UpdateStep::Permission],
            source: ClientError::Transport("reset".to_string()),
        };
        assert_eq!(
            e.to_string(),
            "update database user db1/alice: permission applied but GetUser failed: transport error: reset"
        );
        assert!(e.entity_exists());
        assert_eq!(e.operation(), Operation::Update);
        assert_eq!(e.username(), "alice");

        let gone = LifecycleError::UpdateUnconfirmed {
            database_id: "db1".to_string(),
            username: "alice".to_string(),
            completed: vec![UpdateStep::Permission],
            source: ClientError::NotFound,
        };
        assert!(!gone.entity_exists());
    }

    #[test]
    fn cancellation_is_detected_through_source() {
        let e = LifecycleError::RemoteCallFailure {
            operation: Operation::Update,
            call: RemoteCall::UpdateUser,
            database_id: "db1".to_string(),
            username: "alice".to_string(),
            source: ClientError::DeadlineExceeded,
        };
        assert!(e.is_cancelled());
        assert!(!e.is_not_found());
    }
}
