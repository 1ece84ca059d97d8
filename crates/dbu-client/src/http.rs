//! REST transport for the provider's database-user endpoints.
//!
//! The API key is resolved by the caller and passed in; it is never logged.

use std::time::Duration;

use dbu_schemas::{
    ApiErrorBody, DatabaseUser, UserAclRequest, UserCreateRequest, UserEnvelope, UserUpdateRequest,
};
use reqwest::{RequestBuilder, StatusCode, Url};
use tracing::debug;

use crate::{ClientError, DatabaseApi};

pub const DEFAULT_BASE_URL: &str = "https://api.vultr.com/v2";

/// HTTP-backed [`DatabaseApi`].
#[derive(Clone)]
pub struct HttpDatabaseApi {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for HttpDatabaseApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDatabaseApi")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpDatabaseApi {
    pub fn new(api_key: String) -> Self {
        Self::new_with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn new_with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Build with a per-request transport timeout.
    pub fn with_request_timeout(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            api_key,
            http,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/databases/{database_id}/users[/{username}[/{suffix}]]`, with each
    /// segment percent-encoded.
    fn users_url(
        &self,
        database_id: &str,
        username: Option<&str>,
        suffix: Option<&str>,
    ) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Transport(format!("invalid base url: {e}")))?;
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| ClientError::Transport("base url cannot be a base".to_string()))?;
            segs.pop_if_empty().extend(["databases", database_id, "users"]);
            if let Some(u) = username {
                segs.push(u);
            }
            if let Some(s) = suffix {
                segs.push(s);
            }
        }
        Ok(url)
    }

    fn authorized(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.bearer_auth(&self.api_key)
    }

    async fn send_user(&self, rb: RequestBuilder) -> Result<DatabaseUser, ClientError> {
        let resp = self.authorized(rb).send().await.map_err(transport)?;
        let resp = check_status(resp).await?;
        let body: UserEnvelope = resp
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("user response json decode failed: {e}")))?;
        Ok(body.user)
    }
}

#[async_trait::async_trait]
impl DatabaseApi for HttpDatabaseApi {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn create_user(
        &self,
        database_id: &str,
        req: &UserCreateRequest,
    ) -> Result<DatabaseUser, ClientError> {
        let url = self.users_url(database_id, None, None)?;
        debug!(%url, "POST create user");
        self.send_user(self.http.post(url).json(req)).await
    }

    async fn get_user(
        &self,
        database_id: &str,
        username: &str,
    ) -> Result<DatabaseUser, ClientError> {
        let url = self.users_url(database_id, Some(username), None)?;
        debug!(%url, "GET user");
        self.send_user(self.http.get(url)).await
    }

    async fn update_user(
        &self,
        database_id: &str,
        username: &str,
        req: &UserUpdateRequest,
    ) -> Result<DatabaseUser, ClientError> {
        let url = self.users_url(database_id, Some(username), None)?;
        debug!(%url, "PUT user");
        self.send_user(self.http.put(url).json(req)).await
    }

    async fn update_user_acl(
        &self,
        database_id: &str,
        username: &str,
        req: &UserAclRequest,
    ) -> Result<DatabaseUser, ClientError> {
        let url = self.users_url(database_id, Some(username), Some("access-control"))?;
        debug!(%url, "PUT user access control");
        self.send_user(self.http.put(url).json(req)).await
    }

    async fn delete_user(&self, database_id: &str, username: &str) -> Result<(), ClientError> {
        let url = self.users_url(database_id, Some(username), None)?;
        debug!(%url, "DELETE user");
        let resp = self
            .authorized(self.http.delete(url))
            .send()
            .await
            .map_err(transport)?;
        check_status(resp).await?;
        Ok(())
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

/// Map 404 to `NotFound` and any other non-2xx to `Api`, using the
/// provider's `error` field when the body carries one.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound);
    }

    let raw = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorBody>(&raw) {
        Ok(body) if !body.error.is_empty() => body.error,
        _ if raw.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown")
            .to_string(),
        _ => raw.trim().to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_url_appends_segments() {
        let api = HttpDatabaseApi::new_with_base_url("k".into(), "https://x.test/v2/".into());
        let url = api.users_url("db1", Some("alice"), Some("access-control")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://x.test/v2/databases/db1/users/alice/access-control"
        );
    }

    #[test]
    fn users_url_encodes_usernames() {
        let api = HttpDatabaseApi::new_with_base_url("k".into(), "https://x.test/v2".into());
        let url = api.users_url("db1", Some("a/b c"), None).unwrap();
        assert_eq!(url.as_str(), "https://x.test/v2/databases/db1/users/a%2Fb%20c");
    }

    #[test]
    fn debug_hides_api_key() {
        let api = HttpDatabaseApi::new("super-secret".into());
        assert!(!format!("{api:?}").contains("super-secret"));
    }
}
