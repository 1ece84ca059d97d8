//! Declared user documents and their one-time validation into [`UserSpec`].

use serde::{Deserialize, Serialize};

use crate::acl::first_block;
use crate::{AccessControl, Encryption, UserSpec};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything that can make a declaration unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was empty or missing.
    MissingField { field: &'static str },
    /// `encryption` is not one of the known tokens.
    UnknownEncryption { raw: String },
    /// Both `password` and `password_env` were declared.
    ConflictingPassword,
    /// `password_env` names a variable that is unset or empty.
    PasswordEnvUnset { var: String },
    /// An immutable field differs from the managed user.
    ImmutableFieldChanged {
        field: &'static str,
        from: String,
        to: String,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "required field `{field}` is empty"),
            Self::UnknownEncryption { raw } => write!(
                f,
                "unknown encryption '{raw}'; expected caching_sha2_password | mysql_native_password"
            ),
            Self::ConflictingPassword => {
                write!(f, "`password` and `password_env` are mutually exclusive")
            }
            Self::PasswordEnvUnset { var } => {
                write!(f, "password env var {var} is unset or empty")
            }
            Self::ImmutableFieldChanged { field, from, to } => write!(
                f,
                "`{field}` cannot change in place ('{from}' -> '{to}'); the user must be replaced"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Declaration
// ---------------------------------------------------------------------------

/// A user as written by the operator, before validation.
///
/// `access_control` is a list because the declarative front end emits nested
/// blocks as collections; at most one block is meaningful.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserDeclaration {
    #[serde(default)]
    pub database_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Name of an environment variable holding the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub access_control: Vec<AccessControl>,
}

impl std::fmt::Debug for UserDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDeclaration")
            .field("database_id", &self.database_id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("password_env", &self.password_env)
            .field("encryption", &self.encryption)
            .field("permission", &self.permission)
            .field("access_control", &self.access_control)
            .finish()
    }
}

impl UserDeclaration {
    /// Validate without access to the environment. A declared `password_env`
    /// fails as unset.
    pub fn validate(&self) -> Result<UserSpec, ValidationError> {
        self.validate_with_env(|_| None)
    }

    /// Validate, resolving `password_env` through `lookup`.
    pub fn validate_with_env<F>(&self, lookup: F) -> Result<UserSpec, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_id = required("database_id", &self.database_id)?;
        let username = required("username", &self.username)?;

        let password = match (non_empty(&self.password), non_empty(&self.password_env)) {
            (Some(_), Some(_)) => return Err(ValidationError::ConflictingPassword),
            (Some(p), None) => Some(p),
            (None, Some(var)) => match lookup(&var).filter(|v| !v.is_empty()) {
                Some(v) => Some(v),
                None => return Err(ValidationError::PasswordEnvUnset { var }),
            },
            (None, None) => None,
        };

        let encryption = match non_empty(&self.encryption) {
            Some(raw) => Some(
                Encryption::from_token(raw.trim())
                    .ok_or(ValidationError::UnknownEncryption { raw })?,
            ),
            None => None,
        };

        Ok(UserSpec {
            database_id,
            username,
            password,
            encryption,
            permission: non_empty(&self.permission),
            access_control: first_block(&self.access_control).cloned(),
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(v.to_string())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}
