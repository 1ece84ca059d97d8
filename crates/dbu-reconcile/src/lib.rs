//! dbu-reconcile
//!
//! Decides which provider calls converge a database user to its declaration,
//! and translates between the declared shape and the provider's wire shapes.
//!
//! - ACL blocks are always sent whole (full replace, never merge).
//! - Encryption labels collapse into two tokens (legacy vs. modern default).
//! - Updates are planned one call per changed concern.
//!
//! Deterministic, pure logic. No IO. No provider calls.

pub mod acl;
pub mod encryption;
mod plan;
mod spec;
mod types;

pub use plan::{
    check_immutable, plan, plan_update, Plan, UnreconciledChange, UpdatePlan, UpdateStep,
};
pub use spec::{UserDeclaration, ValidationError};
pub use types::*;
