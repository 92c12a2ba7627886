use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ClientError, Result};
use crate::types::Session;

/// HTTP client for the backend API.
///
/// Cheap to clone; all clones share the cookie store and bearer slot.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    pub(crate) predict_timeout: Duration,
    bearer: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    pub fn new(base_url: &str, request_timeout_secs: u64, predict_timeout_secs: u64) -> Result<Self> {
        let base_url = Url::parse(base_url)?;

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            predict_timeout: Duration::from_secs(predict_timeout_secs),
            bearer: Arc::new(RwLock::new(None)),
        })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        Self::new(&api.base_url, api.request_timeout_secs, api.predict_timeout_secs)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Store or clear the bearer credential attached to subsequent requests.
    pub fn set_bearer(&self, token: Option<String>) {
        *self.bearer.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, self.endpoint(path));
        let bearer = self.bearer.read().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Pull the backend's `message` field out of an error body, falling back
    /// to the given default.
    pub(crate) async fn error_message(response: reqwest::Response, fallback: &str) -> String {
        match response.json::<Value>().await {
            Ok(body) => body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(fallback)
                .to_string(),
            Err(_) => fallback.to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Auth endpoints
    // ------------------------------------------------------------------

    /// POST /api/auth/login
    ///
    /// Non-OK responses become `Authentication` with the server's message.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .request(Method::POST, "api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let message = Self::error_message(response, "Login failed").await;
            return Err(ClientError::Authentication(message));
        }

        let body: Value = response.json().await?;
        let session = Session::from_payload(&body)
            .ok_or_else(|| ClientError::malformed("login response missing email or role"))?;

        self.set_bearer(session.token.clone());
        Ok(session)
    }

    /// GET /api/auth/me
    ///
    /// Returns `Ok(None)` for any non-OK status and for well-formed-but-
    /// incomplete payloads; the caller treats both as logged out. A 401
    /// carrying `accountDeleted: true` is the one 401 that is not silent.
    pub async fn me(&self) -> Result<Option<Session>> {
        let response = self.request(Method::GET, "api/auth/me").send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            if body.get("accountDeleted").and_then(Value::as_bool) == Some(true) {
                return Err(ClientError::AccountDeleted);
            }
            return Ok(None);
        }

        if !response.status().is_success() {
            return Ok(None);
        }

        let body: Value = response.json().await?;
        match Session::from_payload(&body) {
            Some(session) => Ok(Some(session)),
            None => {
                tracing::debug!("discarding malformed session payload: {}", body);
                Ok(None)
            }
        }
    }

    /// POST /api/auth/logout
    ///
    /// Any response from the server counts as done; only transport failures
    /// surface, and the session layer swallows even those.
    pub async fn logout(&self) -> Result<()> {
        self.request(Method::POST, "api/auth/logout").send().await?;
        self.set_bearer(None);
        Ok(())
    }
}
