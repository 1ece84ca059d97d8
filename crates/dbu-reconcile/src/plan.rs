//! Update planning: which remote calls converge a managed user to its
//! declaration.
//!
//! Pure and deterministic. Each changed concern becomes its own step and steps
//! are always emitted in the fixed order password, access control, permission.

use crate::spec::ValidationError;
use crate::{Encryption, UserSpec, UserState};

/// One remote call of an update, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateStep {
    /// `UpdateUser` with the new password alone.
    Password,
    /// Full-replace `UpdateUserACL`.
    AccessControl,
    /// `UpdateUserACL` carrying only the permission.
    Permission,
}

impl UpdateStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStep::Password => "password",
            UpdateStep::AccessControl => "access_control",
            UpdateStep::Permission => "permission",
        }
    }
}

impl std::fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared change that no provider call can apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnreconciledChange {
    /// The provider has no endpoint to change the hashing scheme of an
    /// existing user.
    Encryption {
        from: Option<Encryption>,
        to: Encryption,
    },
}

/// Result of diffing a managed user against its declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    pub steps: Vec<UpdateStep>,
    pub unreconciled: Vec<UnreconciledChange>,
}

impl UpdatePlan {
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, step: UpdateStep) -> bool {
        self.steps.contains(&step)
    }
}

/// What the orchestrator should do for one declared user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan {
    Create,
    Update(UpdatePlan),
    /// An immutable field changed: delete, then create.
    Replace { reason: ValidationError },
    NoChange,
}

/// Decide between create, update, replace and no-op.
pub fn plan(current: Option<&UserState>, desired: &UserSpec) -> Plan {
    let Some(current) = current else {
        return Plan::Create;
    };
    match plan_update(current, desired) {
        Err(reason) => Plan::Replace { reason },
        Ok(p) if p.is_noop() && p.unreconciled.is_empty() => Plan::NoChange,
        Ok(p) => Plan::Update(p),
    }
}

/// Diff `previous` against `desired` field by field.
///
/// A field counts as changed only when it is declared and differs from the
/// observed value; undeclared optional fields keep whatever the provider
/// assigned. Fails when an immutable field differs.
pub fn plan_update(previous: &UserState, desired: &UserSpec) -> Result<UpdatePlan, ValidationError> {
    check_immutable(previous, desired)?;

    let mut out = UpdatePlan::default();

    if let Some(pw) = &desired.password {
        if *pw != previous.password {
            out.steps.push(UpdateStep::Password);
        }
    }

    if let Some(acl) = &desired.access_control {
        let unchanged = previous
            .access_control
            .as_ref()
            .is_some_and(|prev| prev.effectively_equals(acl));
        if !unchanged {
            out.steps.push(UpdateStep::AccessControl);
        }
    }

    if let Some(perm) = &desired.permission {
        if *perm != previous.permission {
            out.steps.push(UpdateStep::Permission);
        }
    }

    if let Some(enc) = desired.encryption {
        if previous.encryption != Some(enc) {
            out.unreconciled.push(UnreconciledChange::Encryption {
                from: previous.encryption,
                to: enc,
            });
        }
    }

    Ok(out)
}

/// Reject in-place changes to `database_id` or `username`.
pub fn check_immutable(previous: &UserState, desired: &UserSpec) -> Result<(), ValidationError> {
    if previous.database_id != desired.database_id {
        return Err(ValidationError::ImmutableFieldChanged {
            field: "database_id",
            from: previous.database_id.clone(),
            to: desired.database_id.clone(),
        });
    }
    if previous.username != desired.username {
        return Err(ValidationError::ImmutableFieldChanged {
            field: "username",
            from: previous.username.clone(),
            to: desired.username.clone(),
        });
    }
    Ok(())
}
