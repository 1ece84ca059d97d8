use dbu_client::{CallContext, DatabaseApi};
use dbu_reconcile::{plan, Plan, UpdatePlan, UserDeclaration, UserSpec, UserState};

use crate::{EventSink, LifecycleError, Operation, Reconciler, ResourceState};

/// Outcome of [`LifecycleController::apply`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    Created,
    Updated(UpdatePlan),
    Replaced,
    Unchanged,
}

/// Binds a [`Reconciler`] to the state-store record of each user.
///
/// The record is changed only when the remote outcome is known: a new
/// observation after success, the identifier alone after a create whose
/// follow-up failed, and nothing after any other failure.
pub struct LifecycleController<A, S> {
    reconciler: Reconciler<A, S>,
}

impl<A: DatabaseApi, S: EventSink> LifecycleController<A, S> {
    pub fn new(api: A, sink: S) -> Self {
        Self {
            reconciler: Reconciler::new(api, sink),
        }
    }

    pub fn reconciler(&self) -> &Reconciler<A, S> {
        &self.reconciler
    }

    /// Validate a declaration once, resolving `password_env` through
    /// `lookup`.
    pub fn accept<F>(
        &self,
        operation: Operation,
        decl: &UserDeclaration,
        lookup: F,
    ) -> Result<UserSpec, LifecycleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        decl.validate_with_env(lookup)
            .map_err(|source| LifecycleError::Validation {
                operation,
                database_id: decl.database_id.trim().to_string(),
                username: decl.username.trim().to_string(),
                source,
            })
    }

    pub async fn create(
        &self,
        ctx: &CallContext,
        state: &mut ResourceState,
        spec: &UserSpec,
    ) -> Result<(), LifecycleError> {
        match self.reconciler.create(ctx, spec).await {
            Ok(user) => {
                state.record(user);
                Ok(())
            }
            Err(e @ LifecycleError::CreateIncomplete { .. }) => {
                state.id = Some(spec.username.clone());
                state.user = UserState {
                    database_id: spec.database_id.clone(),
                    username: spec.username.clone(),
                    ..UserState::default()
                };
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn read(
        &self,
        ctx: &CallContext,
        state: &mut ResourceState,
    ) -> Result<(), LifecycleError> {
        let previous = self.managed(Operation::Read, state)?;
        let user = self
            .reconciler
            .read(ctx, &previous.database_id, &previous.username, Some(previous))
            .await?;
        state.record(user);
        Ok(())
    }

    pub async fn update(
        &self,
        ctx: &CallContext,
        state: &mut ResourceState,
        spec: &UserSpec,
    ) -> Result<(), LifecycleError> {
        let previous = self.managed(Operation::Update, state)?;
        let user = self.reconciler.update(ctx, previous, spec).await?;
        state.record(user);
        Ok(())
    }

    /// Delete the managed user and clear the record. Deleting an unmanaged
    /// record is a no-op.
    pub async fn delete(
        &self,
        ctx: &CallContext,
        state: &mut ResourceState,
    ) -> Result<(), LifecycleError> {
        if let Some(user) = state.managed_user() {
            self.reconciler
                .delete(ctx, &user.database_id, &user.username)
                .await?;
        }
        state.forget();
        Ok(())
    }

    /// Adopt an existing remote user by `(database_id, username)`.
    pub async fn import(
        &self,
        ctx: &CallContext,
        database_id: &str,
        username: &str,
    ) -> Result<ResourceState, LifecycleError> {
        let mut state = ResourceState::adopted(database_id, username);
        let user = self.reconciler.import(ctx, database_id, username).await?;
        state.record(user);
        Ok(state)
    }

    /// What [`Self::apply`] would do, without remote calls.
    pub fn plan(&self, state: &ResourceState, spec: &UserSpec) -> Plan {
        plan(state.managed_user(), spec)
    }

    /// Converge one record to `spec`: create, update, or replace (delete then
    /// create) when an immutable field changed.
    pub async fn apply(
        &self,
        ctx: &CallContext,
        state: &mut ResourceState,
        spec: &UserSpec,
    ) -> Result<Applied, LifecycleError> {
        match self.plan(state, spec) {
            Plan::NoChange => Ok(Applied::Unchanged),
            Plan::Create => {
                self.create(ctx, state, spec).await?;
                Ok(Applied::Created)
            }
            Plan::Update(planned) => {
                self.update(ctx, state, spec).await?;
                Ok(Applied::Updated(planned))
            }
            Plan::Replace { .. } => {
                self.delete(ctx, state).await?;
                self.create(ctx, state, spec).await?;
                Ok(Applied::Replaced)
            }
        }
    }

    fn managed<'s>(
        &self,
        operation: Operation,
        state: &'s ResourceState,
    ) -> Result<&'s UserState, LifecycleError> {
        state.managed_user().ok_or_else(|| LifecycleError::NotFound {
            operation,
            database_id: state.user.database_id.clone(),
            username: state.user.username.clone(),
        })
    }
}
