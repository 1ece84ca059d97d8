//! dbu-schemas
//!
//! Wire shapes of the provider's database-user endpoints. Field names match the
//! provider's JSON exactly. No behavior lives here beyond serde attributes and
//! redacted `Debug` impls for credential-bearing structs.

use serde::{Deserialize, Serialize};

/// A database user as returned by every user endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DatabaseUser {
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Human-readable label, e.g. `"Default (MySQL 8+)"`. Empty for engines
    /// without selectable password hashing.
    #[serde(default)]
    pub encryption: String,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub access_cert: String,
    /// Present only for engines that support ACLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_control: Option<AccessControlList>,
}

impl std::fmt::Debug for DatabaseUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseUser")
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("encryption", &self.encryption)
            .field("permission", &self.permission)
            .field("access_key", &redacted(&self.access_key))
            .field("access_cert", &redacted(&self.access_cert))
            .field("access_control", &self.access_control)
            .finish()
    }
}

/// The provider's flat ACL object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccessControlList {
    #[serde(default)]
    pub acl_categories: Vec<String>,
    #[serde(default)]
    pub acl_channels: Vec<String>,
    #[serde(default)]
    pub acl_commands: Vec<String>,
    #[serde(default)]
    pub acl_keys: Vec<String>,
}

/// `{"user": {...}}` envelope used by create/get/update responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: DatabaseUser,
}

/// Body of `POST /databases/{id}/users`.
///
/// Carries no ACL fields: the provider rejects them at creation time for
/// key-value engines, so the type cannot express them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserCreateRequest {
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encryption: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub permission: String,
}

impl std::fmt::Debug for UserCreateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCreateRequest")
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("encryption", &self.encryption)
            .field("permission", &self.permission)
            .finish()
    }
}

/// Body of `PUT /databases/{id}/users/{username}`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserUpdateRequest {
    pub password: String,
}

impl std::fmt::Debug for UserUpdateRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserUpdateRequest")
            .field("password", &redacted(&self.password))
            .finish()
    }
}

/// Body of `PUT /databases/{id}/users/{username}/access-control`.
///
/// `None` fields are omitted from the JSON and left untouched by the provider.
/// `Some(vec![])` is serialized as `[]` and clears that list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserAclRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_channels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_commands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_keys: Option<Vec<String>>,
}

impl UserAclRequest {
    /// Request that only changes the permission level.
    pub fn permission_only(permission: impl Into<String>) -> Self {
        Self {
            permission: Some(permission.into()),
            ..Self::default()
        }
    }

    pub fn has_acl_lists(&self) -> bool {
        self.acl_categories.is_some()
            || self.acl_channels.is_some()
            || self.acl_commands.is_some()
            || self.acl_keys.is_some()
    }
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub status: Option<u16>,
}

fn redacted(s: &str) -> &'static str {
    if s.is_empty() {
        ""
    } else {
        "<REDACTED>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acl_request_keeps_explicit_empty_lists() {
        let req = UserAclRequest {
            acl_categories: Some(vec![]),
            acl_channels: Some(vec![]),
            acl_commands: Some(vec!["+get".to_string()]),
            acl_keys: Some(vec![]),
            ..UserAclRequest::default()
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["acl_categories"], serde_json::json!([]));
        assert_eq!(v["acl_keys"], serde_json::json!([]));
        assert_eq!(v["acl_commands"], serde_json::json!(["+get"]));
        assert!(v.get("permission").is_none());
    }

    #[test]
    fn permission_only_request_omits_acl_lists() {
        let req = UserAclRequest::permission_only("read");
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v, serde_json::json!({ "permission": "read" }));
        assert!(!req.has_acl_lists());
    }

    #[test]
    fn create_request_omits_unset_fields() {
        let req = UserCreateRequest {
            username: "alice".to_string(),
            permission: "read".to_string(),
            ..UserCreateRequest::default()
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "username": "alice", "permission": "read" })
        );
    }

    #[test]
    fn user_without_acl_decodes() {
        let raw = r#"{"user":{"username":"alice","password":"pw","encryption":"Default (MySQL 8+)"}}"#;
        let env: UserEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.user.username, "alice");
        assert!(env.user.permission.is_empty());
        assert!(env.user.access_control.is_none());
    }

    #[test]
    fn debug_redacts_credentials() {
        let user = DatabaseUser {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            ..DatabaseUser::default()
        };
        let s = format!("{user:?}");
        assert!(!s.contains("hunter2"));
        assert!(s.contains("<REDACTED>"));
    }
}
