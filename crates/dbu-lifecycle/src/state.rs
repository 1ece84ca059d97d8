use chrono::{DateTime, Utc};
use dbu_reconcile::UserState;
use serde::{Deserialize, Serialize};

/// State-store record for one managed user.
///
/// `id` is the username, set only once the provider has confirmed the user
/// exists (a successful create call, or an import).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub user: UserState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl ResourceState {
    /// Record for a user adopted by identifier only; a read fills the rest.
    pub fn adopted(database_id: impl Into<String>, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id: Some(username.clone()),
            user: UserState {
                database_id: database_id.into(),
                username,
                ..UserState::default()
            },
            refreshed_at: None,
        }
    }

    pub fn is_managed(&self) -> bool {
        self.id.is_some()
    }

    /// The observed user, when this record manages one.
    pub fn managed_user(&self) -> Option<&UserState> {
        self.id.as_ref().map(|_| &self.user)
    }

    pub(crate) fn record(&mut self, user: UserState) {
        self.id = Some(user.username.clone());
        self.user = user;
        self.refreshed_at = Some(Utc::now());
    }

    pub(crate) fn forget(&mut self) {
        *self = Self::default();
    }
}
