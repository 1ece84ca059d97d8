//! Observability seam for lifecycle operations.
//!
//! The reconciler never logs globally; it hands structured events to an
//! injected [`EventSink`]. [`TracingSink`] forwards them to `tracing`.

use dbu_reconcile::{UnreconciledChange, UpdateStep};
use tracing::{info, warn};
use uuid::Uuid;

/// Lifecycle operation a call or error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider call names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    CreateUser,
    GetUser,
    UpdateUser,
    UpdateUserAcl,
    DeleteUser,
}

impl RemoteCall {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteCall::CreateUser => "CreateUser",
            RemoteCall::GetUser => "GetUser",
            RemoteCall::UpdateUser => "UpdateUser",
            RemoteCall::UpdateUserAcl => "UpdateUserACL",
            RemoteCall::DeleteUser => "DeleteUser",
        }
    }
}

impl std::fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Started,
    CallIssued {
        call: RemoteCall,
        step: Option<UpdateStep>,
    },
    CallFailed {
        call: RemoteCall,
        error: String,
    },
    /// Delete found nothing to delete.
    AlreadyGone,
    /// A declared change with no provider call to carry it.
    Unreconciled(UnreconciledChange),
    Finished,
}

/// One structured event. Never carries credentials.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub op_id: Uuid,
    pub operation: Operation,
    pub database_id: String,
    pub username: String,
    pub kind: EventKind,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &LifecycleEvent);
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: &LifecycleEvent) {
        (**self).emit(event)
    }
}

/// Forwards events to the `tracing` subscriber installed by the binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, e: &LifecycleEvent) {
        let op_id = e.op_id.to_string();
        match &e.kind {
            EventKind::Started => info!(
                op_id = %op_id,
                operation = %e.operation,
                database_id = %e.database_id,
                username = %e.username,
                "database user operation started"
            ),
            EventKind::CallIssued { call, step } => info!(
                op_id = %op_id,
                operation = %e.operation,
                database_id = %e.database_id,
                username = %e.username,
                call = %call,
                step = step.map(|s| s.as_str()).unwrap_or("-"),
                "issuing provider call"
            ),
            EventKind::CallFailed { call, error } => warn!(
                op_id = %op_id,
                operation = %e.operation,
                database_id = %e.database_id,
                username = %e.username,
                call = %call,
                error = %error,
                "provider call failed"
            ),
            EventKind::AlreadyGone => info!(
                op_id = %op_id,
                database_id = %e.database_id,
                username = %e.username,
                "database user already absent; delete treated as success"
            ),
            EventKind::Unreconciled(change) => warn!(
                op_id = %op_id,
                database_id = %e.database_id,
                username = %e.username,
                change = ?change,
                "declared change has no provider call; left unreconciled"
            ),
            EventKind::Finished => info!(
                op_id = %op_id,
                operation = %e.operation,
                database_id = %e.database_id,
                username = %e.username,
                "database user operation finished"
            ),
        }
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &LifecycleEvent) {}
}
