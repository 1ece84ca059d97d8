//! Command handlers for the `dbu` binary.
//!
//! Shared plumbing (config loading, state file, controller, call contexts)
//! lives here; the lifecycle commands live in [`lifecycle`].

mod lifecycle;
mod state_file;

pub use lifecycle::{apply, destroy, import, plan, refresh};
pub use state_file::StateFile;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dbu_client::http::DEFAULT_BASE_URL;
use dbu_client::{CallContext, CancellationToken, HttpDatabaseApi};
use dbu_config::{
    env_lookup, report_unused_keys, resolve_secrets, DbuConfig, LoadedConfig, UnusedKeyPolicy,
};
use dbu_lifecycle::{LifecycleController, TracingSink};
use dbu_reconcile::UserSpec;

pub type Controller = LifecycleController<HttpDatabaseApi, TracingSink>;

/// Everything one command invocation works on.
pub struct Session {
    pub loaded: LoadedConfig,
    pub config: DbuConfig,
    pub users: BTreeMap<String, UserSpec>,
    pub state_path: PathBuf,
    pub state: StateFile,
    cancel: CancellationToken,
}

impl Session {
    pub fn load(config_paths: &[String], state_path: &str, strict: bool) -> Result<Self> {
        if config_paths.is_empty() {
            bail!("at least one --config path is required");
        }
        let loaded = dbu_config::load_layered_yaml(config_paths)?;

        let policy = if strict {
            UnusedKeyPolicy::Fail
        } else {
            UnusedKeyPolicy::Warn
        };
        let report = report_unused_keys(&loaded.config_json, policy)?;
        if !report.is_clean() {
            eprintln!(
                "WARN: CONFIG_UNUSED_KEYS unused_leaf_keys={}",
                report.unused_leaf_pointers.len()
            );
            for p in report.unused_leaf_pointers.iter().take(50) {
                eprintln!("  unused={}", p);
            }
        }

        let config = loaded.typed()?;
        let users = config.resolve_users(env_lookup)?;

        let state_path = PathBuf::from(state_path);
        let state = StateFile::load(&state_path)?;

        Ok(Self {
            loaded,
            config,
            users,
            state_path,
            state,
            cancel: CancellationToken::new(),
        })
    }

    /// Build the HTTP-backed controller and start cancelling on Ctrl-C.
    pub fn controller(&self) -> Result<Controller> {
        let secrets = resolve_secrets(&self.loaded.config_json, true, env_lookup)?;
        let api_key = secrets.require_api_key()?.to_string();
        let base_url = self
            .config
            .provider
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let api = match self.config.provider.request_timeout_secs {
            Some(secs) => {
                HttpDatabaseApi::with_request_timeout(api_key, base_url, Duration::from_secs(secs))
                    .context("build http client")?
            }
            None => HttpDatabaseApi::new_with_base_url(api_key, base_url),
        };

        let token = self.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; cancelling in-flight operation");
                token.cancel();
            }
        });

        Ok(LifecycleController::new(api, TracingSink))
    }

    /// A fresh context for one user's operation.
    pub fn call_context(&self, timeout: Option<Duration>) -> CallContext {
        let ctx = CallContext::with_token(self.cancel.clone());
        match timeout {
            Some(t) => ctx.with_timeout(t),
            None => ctx,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn save_state(&mut self) -> Result<()> {
        self.state.config_hash = Some(self.loaded.config_hash.clone());
        self.state.save(&self.state_path)
    }
}
