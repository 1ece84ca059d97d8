use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use dbu_lifecycle::ResourceState;
use serde::{Deserialize, Serialize};

/// On-disk state: one record per configured user name.
///
/// Holds provider-generated passwords in clear text; protect it like a
/// credential file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateFile {
    /// Hash of the config the state was last written under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    #[serde(default)]
    pub users: BTreeMap<String, ResourceState>,
}

impl StateFile {
    /// A missing file is an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read state file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse state file: {}", path.display()))
    }

    /// Written to a sibling temp file, then renamed into place.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string_pretty(self).context("serialize state")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).with_context(|| format!("write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("replace state file: {}", path.display()))?;
        Ok(())
    }

    /// Names with a managed user, in order.
    pub fn managed_names(&self) -> Vec<String> {
        self.users
            .iter()
            .filter(|(_, s)| s.is_managed())
            .map(|(n, _)| n.clone())
            .collect()
    }
}
