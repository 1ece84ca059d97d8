//! Encryption label normalization.
//!
//! The provider reports a human-readable description of the password hashing
//! scheme. The declared side only knows two tokens, so the mapping is
//! deliberately two-bucket: the legacy label maps to the legacy token, any other
//! non-empty label maps to the modern default.

use crate::Encryption;

/// Label the provider uses for the MySQL 5.x native-password scheme.
pub const LEGACY_LABEL: &str = "Legacy (MySQL 5.x)";

/// Map a provider label to a declared token. Empty labels yield `None`.
pub fn normalize(label: &str) -> Option<Encryption> {
    match label {
        "" => None,
        LEGACY_LABEL => Some(Encryption::MysqlNativePassword),
        _ => Some(Encryption::CachingSha2Password),
    }
}

/// Normalize `label`, keeping `previous` when the label is empty.
pub fn normalize_onto(label: &str, previous: Option<Encryption>) -> Option<Encryption> {
    normalize(label).or(previous)
}
