//! Provider boundary for database-user management.
//!
//! This module defines only the collaborator trait. Concrete transports live in
//! [`crate::http`] (and the in-memory provider in `dbu-testkit`).

use dbu_schemas::{DatabaseUser, UserAclRequest, UserCreateRequest, UserUpdateRequest};

use crate::ClientError;

/// Remote database-user API, scoped per database instance and username.
///
/// Object safe, so callers can hold a `Box<dyn DatabaseApi>`; `Send + Sync` so
/// it can cross task boundaries.
#[async_trait::async_trait]
pub trait DatabaseApi: Send + Sync {
    /// Human-readable name of the transport (e.g. `"http"`).
    fn name(&self) -> &'static str;

    async fn create_user(
        &self,
        database_id: &str,
        req: &UserCreateRequest,
    ) -> Result<DatabaseUser, ClientError>;

    /// Returns [`ClientError::NotFound`] when the user is absent.
    async fn get_user(&self, database_id: &str, username: &str)
        -> Result<DatabaseUser, ClientError>;

    async fn update_user(
        &self,
        database_id: &str,
        username: &str,
        req: &UserUpdateRequest,
    ) -> Result<DatabaseUser, ClientError>;

    async fn update_user_acl(
        &self,
        database_id: &str,
        username: &str,
        req: &UserAclRequest,
    ) -> Result<DatabaseUser, ClientError>;

    /// Returns [`ClientError::NotFound`] when the user is absent.
    async fn delete_user(&self, database_id: &str, username: &str) -> Result<(), ClientError>;
}

#[async_trait::async_trait]
impl<T: DatabaseApi + ?Sized> DatabaseApi for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn create_user(
        &self,
        database_id: &str,
        req: &UserCreateRequest,
    ) -> Result<DatabaseUser, ClientError> {
        (**self).create_user(database_id, req).await
    }

    async fn get_user(
        &self,
        database_id: &str,
        username: &str,
    ) -> Result<DatabaseUser, ClientError> {
        (**self).get_user(database_id, username).await
    }

    async fn update_user(
        &self,
        database_id: &str,
        username: &str,
        req: &UserUpdateRequest,
    ) -> Result<DatabaseUser, ClientError> {
        (**self).update_user(database_id, username, req).await
    }

    async fn update_user_acl(
        &self,
        database_id: &str,
        username: &str,
        req: &UserAclRequest,
    ) -> Result<DatabaseUser, ClientError> {
        (**self).update_user_acl(database_id, username, req).await
    }

    async fn delete_user(&self, database_id: &str, username: &str) -> Result<(), ClientError> {
        (**self).delete_user(database_id, username).await
    }
}
