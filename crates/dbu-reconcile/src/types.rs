use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Password hashing scheme tokens understood by the declared side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encryption {
    /// Modern default (`caching_sha2_password`).
    #[serde(rename = "caching_sha2_password")]
    CachingSha2Password,
    /// Legacy MySQL 5.x scheme (`mysql_native_password`).
    #[serde(rename = "mysql_native_password")]
    MysqlNativePassword,
}

impl Encryption {
    pub fn as_token(&self) -> &'static str {
        match self {
            Encryption::CachingSha2Password => "caching_sha2_password",
            Encryption::MysqlNativePassword => "mysql_native_password",
        }
    }

    /// Parse a machine token. Labels returned by the provider go through
    /// [`crate::encryption::normalize`] instead.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "caching_sha2_password" => Some(Encryption::CachingSha2Password),
            "mysql_native_password" => Some(Encryption::MysqlNativePassword),
            _ => None,
        }
    }
}

impl std::fmt::Display for Encryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Declared access-control block: four optional string sets.
///
/// `None` means "not declared", `Some(empty)` means "declared empty". Both are
/// sent to the provider as an explicit empty list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessControl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_categories: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_channels: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_commands: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_keys: Option<BTreeSet<String>>,
}

impl AccessControl {
    /// Compare with absent sets read as empty.
    pub fn effectively_equals(&self, other: &AccessControl) -> bool {
        effective(&self.acl_categories) == effective(&other.acl_categories)
            && effective(&self.acl_channels) == effective(&other.acl_channels)
            && effective(&self.acl_commands) == effective(&other.acl_commands)
            && effective(&self.acl_keys) == effective(&other.acl_keys)
    }
}

fn effective(set: &Option<BTreeSet<String>>) -> BTreeSet<&str> {
    set.iter().flatten().map(String::as_str).collect()
}

/// Validated desired state for one database user.
#[derive(Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub database_id: String,
    pub username: String,
    pub password: Option<String>,
    pub encryption: Option<Encryption>,
    pub permission: Option<String>,
    pub access_control: Option<AccessControl>,
}

impl UserSpec {
    pub fn new(database_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            database_id: database_id.into(),
            username: username.into(),
            password: None,
            encryption: None,
            permission: None,
            access_control: None,
        }
    }
}

impl std::fmt::Debug for UserSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSpec")
            .field("database_id", &self.database_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("encryption", &self.encryption)
            .field("permission", &self.permission)
            .field("access_control", &self.access_control)
            .finish()
    }
}

/// Last observed remote state of a user, as held by the state store.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
    pub database_id: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<Encryption>,
    #[serde(default)]
    pub permission: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_control: Option<AccessControl>,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub access_cert: String,
}

impl std::fmt::Debug for UserState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<REDACTED>" };
        f.debug_struct("UserState")
            .field("database_id", &self.database_id)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("encryption", &self.encryption)
            .field("permission", &self.permission)
            .field("access_control", &self.access_control)
            .field("access_key", &redact(&self.access_key))
            .field("access_cert", &redact(&self.access_cert))
            .finish()
    }
}
