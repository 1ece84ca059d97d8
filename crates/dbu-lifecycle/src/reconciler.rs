//! Provider-call sequencing for one database user.
//!
//! Each method is one lifecycle operation. Calls are awaited one at a time
//! under the caller's [`CallContext`]; the first failing call ends the
//! operation and nothing already applied is rolled back.

use dbu_client::{CallContext, ClientError, DatabaseApi};
use dbu_reconcile::{
    acl, encryption, plan_update, Encryption, UpdateStep, UserSpec, UserState,
};
use dbu_schemas::{DatabaseUser, UserAclRequest, UserCreateRequest, UserUpdateRequest};
use uuid::Uuid;

use crate::{EventKind, EventSink, LifecycleError, LifecycleEvent, Operation, RemoteCall};

pub struct Reconciler<A, S> {
    api: A,
    sink: S,
}

/// Identifiers shared by every event and error of one operation.
struct Scope<'a, S> {
    sink: &'a S,
    op_id: Uuid,
    operation: Operation,
    database_id: &'a str,
    username: &'a str,
}

impl<'a, S: EventSink> Scope<'a, S> {
    fn open(sink: &'a S, operation: Operation, database_id: &'a str, username: &'a str) -> Self {
        let scope = Self {
            sink,
            op_id: Uuid::new_v4(),
            operation,
            database_id,
            username,
        };
        scope.emit(EventKind::Started);
        scope
    }

    fn emit(&self, kind: EventKind) {
        self.sink.emit(&LifecycleEvent {
            op_id: self.op_id,
            operation: self.operation,
            database_id: self.database_id.to_string(),
            username: self.username.to_string(),
            kind,
        });
    }

    fn issued(&self, call: RemoteCall, step: Option<UpdateStep>) {
        self.emit(EventKind::CallIssued { call, step });
    }

    fn failed(&self, call: RemoteCall, err: &ClientError) {
        self.emit(EventKind::CallFailed {
            call,
            error: err.to_string(),
        });
    }

    fn remote_failure(&self, call: RemoteCall, source: ClientError) -> LifecycleError {
        if source.is_not_found() {
            return self.not_found();
        }
        LifecycleError::RemoteCallFailure {
            operation: self.operation,
            call,
            database_id: self.database_id.to_string(),
            username: self.username.to_string(),
            source,
        }
    }

    fn not_found(&self) -> LifecycleError {
        LifecycleError::NotFound {
            operation: self.operation,
            database_id: self.database_id.to_string(),
            username: self.username.to_string(),
        }
    }
}

impl<A: DatabaseApi, S: EventSink> Reconciler<A, S> {
    pub fn new(api: A, sink: S) -> Self {
        Self { api, sink }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Create the user, apply its declared ACL in one follow-up call, then
    /// read it back.
    ///
    /// Once `CreateUser` has succeeded every later failure is reported as
    /// [`LifecycleError::CreateIncomplete`]: the user exists remotely.
    pub async fn create(
        &self,
        ctx: &CallContext,
        spec: &UserSpec,
    ) -> Result<UserState, LifecycleError> {
        let scope = Scope::open(&self.sink, Operation::Create, &spec.database_id, &spec.username);

        let req = create_request(spec);
        scope.issued(RemoteCall::CreateUser, None);
        if let Err(e) = ctx
            .guard(self.api.create_user(&spec.database_id, &req))
            .await
        {
            scope.failed(RemoteCall::CreateUser, &e);
            return Err(scope.remote_failure(RemoteCall::CreateUser, e));
        }

        let incomplete = |call: RemoteCall, source: ClientError| {
            scope.failed(call, &source);
            LifecycleError::CreateIncomplete {
                database_id: spec.database_id.clone(),
                username: spec.username.clone(),
                call,
                source,
            }
        };

        if let Some(declared) = &spec.access_control {
            let req = acl::to_request(declared);
            scope.issued(RemoteCall::UpdateUserAcl, Some(UpdateStep::AccessControl));
            ctx.guard(
                self.api
                    .update_user_acl(&spec.database_id, &spec.username, &req),
            )
            .await
            .map_err(|e| incomplete(RemoteCall::UpdateUserAcl, e))?;
        }

        scope.issued(RemoteCall::GetUser, None);
        let observed = ctx
            .guard(self.api.get_user(&spec.database_id, &spec.username))
            .await
            .map_err(|e| incomplete(RemoteCall::GetUser, e))?;

        let state = observe(&spec.database_id, &spec.username, observed, spec.encryption);
        scope.emit(EventKind::Finished);
        Ok(state)
    }

    /// Fetch the user and rebuild its observed state.
    ///
    /// An empty encryption label keeps the value from `previous`.
    pub async fn read(
        &self,
        ctx: &CallContext,
        database_id: &str,
        username: &str,
        previous: Option<&UserState>,
    ) -> Result<UserState, LifecycleError> {
        let scope = Scope::open(&self.sink, Operation::Read, database_id, username);
        let state = self
            .fetch(ctx, &scope, previous.and_then(|p| p.encryption))
            .await?;
        scope.emit(EventKind::Finished);
        Ok(state)
    }

    /// Adopt an existing user by identifier.
    pub async fn import(
        &self,
        ctx: &CallContext,
        database_id: &str,
        username: &str,
    ) -> Result<UserState, LifecycleError> {
        let scope = Scope::open(&self.sink, Operation::Import, database_id, username);
        let state = self.fetch(ctx, &scope, None).await?;
        scope.emit(EventKind::Finished);
        Ok(state)
    }

    /// Issue one call per changed concern, in the fixed order password,
    /// access control, permission, then read the user back.
    ///
    /// A failed read-back after at least one applied call is
    /// [`LifecycleError::UpdateUnconfirmed`]; with nothing applied it is a
    /// plain read failure.
    pub async fn update(
        &self,
        ctx: &CallContext,
        previous: &UserState,
        desired: &UserSpec,
    ) -> Result<UserState, LifecycleError> {
        let scope = Scope::open(
            &self.sink,
            Operation::Update,
            &previous.database_id,
            &previous.username,
        );

        let plan = plan_update(previous, desired).map_err(|source| LifecycleError::Validation {
            operation: Operation::Update,
            database_id: previous.database_id.clone(),
            username: previous.username.clone(),
            source,
        })?;

        for change in &plan.unreconciled {
            scope.emit(EventKind::Unreconciled(change.clone()));
        }

        let mut completed: Vec<UpdateStep> = Vec::with_capacity(plan.steps.len());
        for step in plan.steps.iter().copied() {
            let (call, res) = self.run_step(ctx, &scope, step, desired).await;
            if let Err(source) = res {
                scope.failed(call, &source);
                if completed.is_empty() {
                    return Err(scope.remote_failure(call, source));
                }
                return Err(LifecycleError::PartialUpdateFailure {
                    database_id: previous.database_id.clone(),
                    username: previous.username.clone(),
                    completed,
                    failed: step,
                    source,
                });
            }
            completed.push(step);
        }

        let state = match self.fetch_observed(ctx, &scope, previous.encryption).await {
            Ok(state) => state,
            Err(source) if completed.is_empty() => {
                return Err(scope.remote_failure(RemoteCall::GetUser, source))
            }
            Err(source) => {
                return Err(LifecycleError::UpdateUnconfirmed {
                    database_id: previous.database_id.clone(),
                    username: previous.username.clone(),
                    completed,
                    source,
                })
            }
        };
        scope.emit(EventKind::Finished);
        Ok(state)
    }

    /// Delete the user. A user that is already gone counts as deleted.
    pub async fn delete(
        &self,
        ctx: &CallContext,
        database_id: &str,
        username: &str,
    ) -> Result<(), LifecycleError> {
        let scope = Scope::open(&self.sink, Operation::Delete, database_id, username);

        scope.issued(RemoteCall::DeleteUser, None);
        match ctx.guard(self.api.delete_user(database_id, username)).await {
            Ok(()) => {}
            Err(ClientError::NotFound) => scope.emit(EventKind::AlreadyGone),
            Err(e) => {
                scope.failed(RemoteCall::DeleteUser, &e);
                return Err(scope.remote_failure(RemoteCall::DeleteUser, e));
            }
        }

        scope.emit(EventKind::Finished);
        Ok(())
    }

    async fn run_step(
        &self,
        ctx: &CallContext,
        scope: &Scope<'_, S>,
        step: UpdateStep,
        desired: &UserSpec,
    ) -> (RemoteCall, Result<(), ClientError>) {
        let (db, user) = (scope.database_id, scope.username);
        let call = match step {
            UpdateStep::Password => RemoteCall::UpdateUser,
            UpdateStep::AccessControl | UpdateStep::Permission => RemoteCall::UpdateUserAcl,
        };
        scope.issued(call, Some(step));

        let res = match step {
            UpdateStep::Password => {
                let req = UserUpdateRequest {
                    password: desired.password.clone().unwrap_or_default(),
                };
                ctx.guard(self.api.update_user(db, user, &req)).await
            }
            UpdateStep::AccessControl => {
                let req = desired
                    .access_control
                    .as_ref()
                    .map(acl::to_request)
                    .unwrap_or_else(|| acl::to_request(&Default::default()));
                ctx.guard(self.api.update_user_acl(db, user, &req)).await
            }
            UpdateStep::Permission => {
                let req = UserAclRequest::permission_only(
                    desired.permission.clone().unwrap_or_default(),
                );
                ctx.guard(self.api.update_user_acl(db, user, &req)).await
            }
        };
        (call, res.map(|_| ()))
    }

    async fn fetch(
        &self,
        ctx: &CallContext,
        scope: &Scope<'_, S>,
        fallback: Option<Encryption>,
    ) -> Result<UserState, LifecycleError> {
        self.fetch_observed(ctx, scope, fallback)
            .await
            .map_err(|e| scope.remote_failure(RemoteCall::GetUser, e))
    }

    async fn fetch_observed(
        &self,
        ctx: &CallContext,
        scope: &Scope<'_, S>,
        fallback: Option<Encryption>,
    ) -> Result<UserState, ClientError> {
        scope.issued(RemoteCall::GetUser, None);
        match ctx
            .guard(self.api.get_user(scope.database_id, scope.username))
            .await
        {
            Ok(observed) => Ok(observe(scope.database_id, scope.username, observed, fallback)),
            Err(e) => {
                scope.failed(RemoteCall::GetUser, &e);
                Err(e)
            }
        }
    }
}

fn create_request(spec: &UserSpec) -> UserCreateRequest {
    UserCreateRequest {
        username: spec.username.clone(),
        password: spec.password.clone().unwrap_or_default(),
        encryption: spec
            .encryption
            .map(|e| e.as_token().to_string())
            .unwrap_or_default(),
        permission: spec.permission.clone().unwrap_or_default(),
    }
}

/// Overwrite every cached field from a provider response.
fn observe(
    database_id: &str,
    username: &str,
    user: DatabaseUser,
    fallback: Option<Encryption>,
) -> UserState {
    let username = if user.username.is_empty() {
        username.to_string()
    } else {
        user.username
    };
    UserState {
        database_id: database_id.to_string(),
        username,
        password: user.password,
        encryption: encryption::normalize_onto(&user.encryption, fallback),
        permission: user.permission,
        access_control: user.access_control.as_ref().map(acl::from_response),
        access_key: user.access_key,
        access_cert: user.access_cert,
    }
}
