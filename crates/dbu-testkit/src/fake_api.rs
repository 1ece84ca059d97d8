//! In-memory provider for scenario tests.
//!
//! Deterministic: generated passwords are numbered, no randomness, no network
//! I/O. Every call is recorded with its JSON request body before any failure
//! is injected, so tests can assert on exactly what was sent.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use dbu_client::{CancellationToken, ClientError, DatabaseApi};
use dbu_lifecycle::RemoteCall;
use dbu_schemas::{
    AccessControlList, DatabaseUser, UserAclRequest, UserCreateRequest, UserUpdateRequest,
};
use serde_json::Value;

pub const DEFAULT_LABEL: &str = "Default (MySQL 8+)";
pub const LEGACY_LABEL: &str = "Legacy (MySQL 5.x)";

/// One call as seen by the fake provider.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedCall {
    pub call: RemoteCall,
    pub database_id: String,
    pub username: String,
    /// Serialized request body; `Value::Null` for bodiless calls.
    pub body: Value,
}

/// Engine behavior of one fake database instance.
#[derive(Clone, Debug)]
pub struct FakeDatabase {
    /// Encryption labels are reported (MySQL-like engines only).
    pub labels_encryption: bool,
    /// Users carry an ACL object (Redis-like engines only).
    pub supports_acl: bool,
    /// Report the raw encryption token instead of its label.
    pub reports_tokens: bool,
    /// Access key and certificate issued to every created user.
    pub credentials: Option<(String, String)>,
    users: BTreeMap<String, DatabaseUser>,
}

impl FakeDatabase {
    pub fn mysql() -> Self {
        Self {
            labels_encryption: true,
            supports_acl: false,
            reports_tokens: false,
            credentials: None,
            users: BTreeMap::new(),
        }
    }

    pub fn redis() -> Self {
        Self {
            labels_encryption: false,
            supports_acl: true,
            reports_tokens: false,
            credentials: None,
            users: BTreeMap::new(),
        }
    }

    pub fn postgres() -> Self {
        Self {
            labels_encryption: false,
            supports_acl: false,
            reports_tokens: false,
            credentials: None,
            users: BTreeMap::new(),
        }
    }

    pub fn reporting_tokens(mut self) -> Self {
        self.reports_tokens = true;
        self
    }

    pub fn with_credentials(mut self, access_key: &str, access_cert: &str) -> Self {
        self.credentials = Some((access_key.to_string(), access_cert.to_string()));
        self
    }
}

#[derive(Default)]
struct Inner {
    databases: BTreeMap<String, FakeDatabase>,
    calls: Vec<RecordedCall>,
    fail_next: HashMap<RemoteCall, ClientError>,
    cancel_after: Option<(RemoteCall, CancellationToken)>,
    hang_on: Option<RemoteCall>,
    next_password: u64,
}

#[derive(Default)]
pub struct FakeDatabaseApi {
    inner: Mutex<Inner>,
}

impl FakeDatabaseApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(self, database_id: &str, db: FakeDatabase) -> Self {
        self.lock().databases.insert(database_id.to_string(), db);
        self
    }

    /// Seed a user directly, bypassing call recording.
    pub fn seed_user(&self, database_id: &str, user: DatabaseUser) {
        let mut inner = self.lock();
        if let Some(db) = inner.databases.get_mut(database_id) {
            db.users.insert(user.username.clone(), user);
        }
    }

    /// Remove a user behind the reconciler's back.
    pub fn drop_user(&self, database_id: &str, username: &str) {
        let mut inner = self.lock();
        if let Some(db) = inner.databases.get_mut(database_id) {
            db.users.remove(username);
        }
    }

    pub fn user(&self, database_id: &str, username: &str) -> Option<DatabaseUser> {
        self.lock()
            .databases
            .get(database_id)
            .and_then(|db| db.users.get(username).cloned())
    }

    /// The next call of kind `call` fails with `err` (after being recorded).
    pub fn fail_next(&self, call: RemoteCall, err: ClientError) {
        self.lock().fail_next.insert(call, err);
    }

    /// Cancel `token` right after the next successful call of kind `call`.
    pub fn cancel_after(&self, call: RemoteCall, token: CancellationToken) {
        self.lock().cancel_after = Some((call, token));
    }

    /// Calls of kind `call` never complete.
    pub fn hang_on(&self, call: RemoteCall) {
        self.lock().hang_on = Some(call);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn call_names(&self) -> Vec<RemoteCall> {
        self.lock().calls.iter().map(|c| c.call).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record the call and decide whether it proceeds.
    async fn enter(
        &self,
        call: RemoteCall,
        database_id: &str,
        username: &str,
        body: Value,
    ) -> Result<(), ClientError> {
        let hang = {
            let mut inner = self.lock();
            inner.calls.push(RecordedCall {
                call,
                database_id: database_id.to_string(),
                username: username.to_string(),
                body,
            });
            if let Some(err) = inner.fail_next.remove(&call) {
                return Err(err);
            }
            inner.hang_on == Some(call)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn leave(&self, call: RemoteCall) {
        let mut inner = self.lock();
        if inner.cancel_after.as_ref().is_some_and(|(c, _)| *c == call) {
            if let Some((_, token)) = inner.cancel_after.take() {
                token.cancel();
            }
        }
    }

    fn with_user<T>(
        &self,
        database_id: &str,
        username: &str,
        f: impl FnOnce(&FakeDatabase, &mut DatabaseUser) -> Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        let mut inner = self.lock();
        let db = inner
            .databases
            .get_mut(database_id)
            .ok_or(ClientError::NotFound)?;
        let mut user = db
            .users
            .get(username)
            .cloned()
            .ok_or(ClientError::NotFound)?;
        let out = f(db, &mut user)?;
        db.users.insert(username.to_string(), user);
        Ok(out)
    }
}

fn body<T: serde::Serialize>(req: &T) -> Value {
    serde_json::to_value(req).unwrap_or(Value::Null)
}

fn label_for(token: &str) -> &'static str {
    if token == "mysql_native_password" {
        LEGACY_LABEL
    } else {
        DEFAULT_LABEL
    }
}

fn default_acl() -> AccessControlList {
    AccessControlList {
        acl_categories: vec!["+@all".to_string()],
        acl_channels: vec!["*".to_string()],
        acl_commands: vec![],
        acl_keys: vec!["*".to_string()],
    }
}

#[async_trait]
impl DatabaseApi for FakeDatabaseApi {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn create_user(
        &self,
        database_id: &str,
        req: &UserCreateRequest,
    ) -> Result<DatabaseUser, ClientError> {
        self.enter(RemoteCall::CreateUser, database_id, &req.username, body(req))
            .await?;

        let user = {
            let mut inner = self.lock();
            inner.next_password += 1;
            let generated = format!("generated-{}", inner.next_password);
            let db = inner
                .databases
                .get_mut(database_id)
                .ok_or(ClientError::NotFound)?;
            if db.users.contains_key(&req.username) {
                return Err(ClientError::Api {
                    status: 409,
                    message: format!("user {} already exists", req.username),
                });
            }
            let user = DatabaseUser {
                username: req.username.clone(),
                password: if req.password.is_empty() {
                    generated
                } else {
                    req.password.clone()
                },
                encryption: match (db.labels_encryption, db.reports_tokens) {
                    (false, _) => String::new(),
                    (true, false) => label_for(&req.encryption).to_string(),
                    (true, true) if req.encryption.is_empty() => {
                        "caching_sha2_password".to_string()
                    }
                    (true, true) => req.encryption.clone(),
                },
                permission: req.permission.clone(),
                access_key: db
                    .credentials
                    .as_ref()
                    .map(|(k, _)| k.clone())
                    .unwrap_or_default(),
                access_cert: db
                    .credentials
                    .as_ref()
                    .map(|(_, c)| c.clone())
                    .unwrap_or_default(),
                access_control: db.supports_acl.then(default_acl),
            };
            db.users.insert(user.username.clone(), user.clone());
            user
        };

        self.leave(RemoteCall::CreateUser);
        Ok(user)
    }

    async fn get_user(
        &self,
        database_id: &str,
        username: &str,
    ) -> Result<DatabaseUser, ClientError> {
        self.enter(RemoteCall::GetUser, database_id, username, Value::Null)
            .await?;
        let user = self.with_user(database_id, username, |_, u| Ok(u.clone()))?;
        self.leave(RemoteCall::GetUser);
        Ok(user)
    }

    async fn update_user(
        &self,
        database_id: &str,
        username: &str,
        req: &UserUpdateRequest,
    ) -> Result<DatabaseUser, ClientError> {
        self.enter(RemoteCall::UpdateUser, database_id, username, body(req))
            .await?;
        let user = self.with_user(database_id, username, |_, u| {
            u.password = req.password.clone();
            Ok(u.clone())
        })?;
        self.leave(RemoteCall::UpdateUser);
        Ok(user)
    }

    async fn update_user_acl(
        &self,
        database_id: &str,
        username: &str,
        req: &UserAclRequest,
    ) -> Result<DatabaseUser, ClientError> {
        self.enter(RemoteCall::UpdateUserAcl, database_id, username, body(req))
            .await?;
        let user = self.with_user(database_id, username, |db, u| {
            if req.has_acl_lists() {
                if !db.supports_acl {
                    return Err(ClientError::Api {
                        status: 400,
                        message: "access control is not supported by this engine".to_string(),
                    });
                }
                let acl = u.access_control.get_or_insert_with(AccessControlList::default);
                if let Some(v) = &req.acl_categories {
                    acl.acl_categories = v.clone();
                }
                if let Some(v) = &req.acl_channels {
                    acl.acl_channels = v.clone();
                }
                if let Some(v) = &req.acl_commands {
                    acl.acl_commands = v.clone();
                }
                if let Some(v) = &req.acl_keys {
                    acl.acl_keys = v.clone();
                }
            }
            if let Some(p) = &req.permission {
                u.permission = p.clone();
            }
            Ok(u.clone())
        })?;
        self.leave(RemoteCall::UpdateUserAcl);
        Ok(user)
    }

    async fn delete_user(&self, database_id: &str, username: &str) -> Result<(), ClientError> {
        self.enter(RemoteCall::DeleteUser, database_id, username, Value::Null)
            .await?;
        {
            let mut inner = self.lock();
            let db = inner
                .databases
                .get_mut(database_id)
                .ok_or(ClientError::NotFound)?;
            db.users.remove(username).ok_or(ClientError::NotFound)?;
        }
        self.leave(RemoteCall::DeleteUser);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> FakeDatabaseApi {
        FakeDatabaseApi::new()
            .with_database("db1", FakeDatabase::mysql())
            .with_database("cache", FakeDatabase::redis())
    }

    fn create(name: &str) -> UserCreateRequest {
        UserCreateRequest {
            username: name.to_string(),
            ..UserCreateRequest::default()
        }
    }

    #[tokio::test]
    async fn create_generates_password_and_labels_encryption() {
        let api = api();
        let mut req = create("alice");
        req.encryption = "mysql_native_password".to_string();
        let user = api.create_user("db1", &req).await.unwrap();
        assert_eq!(user.password, "generated-1");
        assert_eq!(user.encryption, LEGACY_LABEL);
        assert!(user.access_control.is_none());
    }

    #[tokio::test]
    async fn issued_credentials_and_raw_tokens_are_returned() {
        let api = FakeDatabaseApi::new().with_database(
            "db1",
            FakeDatabase::mysql()
                .reporting_tokens()
                .with_credentials("k", "c"),
        );
        let user = api.create_user("db1", &create("alice")).await.unwrap();
        assert_eq!(user.encryption, "caching_sha2_password");
        assert_eq!(user.access_key, "k");
        assert_eq!(user.access_cert, "c");
        assert_eq!(
            api.calls()[0].body,
            serde_json::json!({ "username": "alice" })
        );
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let api = api();
        api.create_user("db1", &create("alice")).await.unwrap();
        let err = api.create_user("db1", &create("alice")).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn acl_lists_replace_only_when_sent() {
        let api = api();
        api.create_user("cache", &create("app")).await.unwrap();
        let req = UserAclRequest {
            acl_keys: Some(vec!["app:*".to_string()]),
            ..UserAclRequest::default()
        };
        let user = api.update_user_acl("cache", "app", &req).await.unwrap();
        let acl = user.access_control.unwrap();
        assert_eq!(acl.acl_keys, vec!["app:*".to_string()]);
        assert_eq!(acl.acl_categories, vec!["+@all".to_string()]);
    }

    #[tokio::test]
    async fn acl_on_engine_without_acl_is_rejected() {
        let api = api();
        api.create_user("db1", &create("alice")).await.unwrap();
        let req = UserAclRequest {
            acl_keys: Some(vec![]),
            ..UserAclRequest::default()
        };
        let err = api.update_user_acl("db1", "alice", &req).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn injected_failure_is_one_shot_and_recorded() {
        let api = api();
        api.fail_next(RemoteCall::GetUser, ClientError::Transport("x".to_string()));
        assert!(api.get_user("db1", "nobody").await.is_err());
        assert_eq!(
            api.get_user("db1", "nobody").await.unwrap_err(),
            ClientError::NotFound
        );
        assert_eq!(api.call_names(), vec![RemoteCall::GetUser, RemoteCall::GetUser]);
    }
}
