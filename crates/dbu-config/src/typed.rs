use std::collections::BTreeMap;

use anyhow::{Context, Result};
use dbu_reconcile::{UserDeclaration, UserSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Overrides the public API endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Per-request timeout of the HTTP client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// Typed view of the merged configuration.
///
/// `users` is keyed by a local resource name, which is also the key of the
/// state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbuConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub users: BTreeMap<String, UserDeclaration>,
}

impl DbuConfig {
    /// Unknown keys are left to the unused-key report; only `users` entries
    /// reject unknown fields.
    pub fn from_json(config_json: &Value) -> Result<Self> {
        serde_json::from_value(config_json.clone()).context("invalid dbu config")
    }

    /// Validate every declaration, resolving `password_env` through `lookup`.
    pub fn resolve_users<F>(&self, lookup: F) -> Result<BTreeMap<String, UserSpec>>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.users
            .iter()
            .map(|(name, decl)| {
                let spec = decl
                    .validate_with_env(&lookup)
                    .with_context(|| format!("user '{name}'"))?;
                Ok::<_, anyhow::Error>((name.clone(), spec))
            })
            .collect()
    }
}
