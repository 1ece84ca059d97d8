//! Runtime secret resolution.
//!
//! Configuration stores environment variable NAMES only. The API key is
//! resolved once, here, and handed to the HTTP client; nothing else reads the
//! environment for it. Errors name the variable, never its value.

use anyhow::{bail, Result};
use serde_json::Value;

/// Variable consulted when `/provider/api_key_env` is absent.
pub const DEFAULT_API_KEY_ENV: &str = "VULTR_API_KEY";

/// Secrets for one run. **Values are redacted in `Debug` output.**
#[derive(Clone)]
pub struct ResolvedSecrets {
    /// Name of the variable the key was read from.
    pub api_key_env: String,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("api_key_env", &self.api_key_env)
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

impl ResolvedSecrets {
    /// The API key, or an error naming the variable that should hold it.
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(k) => Ok(k),
            None => bail!(
                "SECRETS_MISSING: required env var '{}' (provider api key) is not set or empty",
                self.api_key_env
            ),
        }
    }
}

/// Resolve the provider API key through `lookup`. When `required` is set, a
/// missing key is an error; offline commands pass `false`.
pub fn resolve_secrets<F>(config_json: &Value, required: bool, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key_env = config_json
        .pointer("/provider/api_key_env")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_API_KEY_ENV)
        .to_string();

    let api_key = lookup(&api_key_env).filter(|v| !v.trim().is_empty());
    let secrets = ResolvedSecrets {
        api_key_env,
        api_key,
    };
    if required {
        secrets.require_api_key()?;
    }
    Ok(secrets)
}

/// Process-environment lookup; blank values count as unset.
pub fn env_lookup(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}
