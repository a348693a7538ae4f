use std::sync::Arc;

use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::navigator::{Navigator, NoopNavigator};
use crate::refresh::{self, RefreshGate, RefreshPlan, RefreshState};
use crate::request::{ApiRequest, Attempt, authorize};
use crate::session::SessionStore;
use crate::storage::Storage;
use crate::types::{AccessToken, RefreshResponse, RefreshToken, Session};

const REFRESH_PATH: &str = "/auth/token/refresh/";

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a RefreshToken,
}

/// Authenticated client for the fitness backend.
///
/// Every request carries the stored access token. A 401 triggers one token
/// refresh (shared by all requests that fail at the same time) and one replay
/// of the original request. If the refresh fails, the session is cleared and
/// the [`Navigator`] is sent to the login path.
///
/// Cloning is cheap; clones share the session, HTTP pool and refresh gate.
pub struct ApiClient<S> {
    config: Arc<ClientConfig>,
    http: reqwest::Client,
    session: Arc<SessionStore<S>>,
    navigator: Arc<dyn Navigator>,
    refresh: Arc<RefreshGate>,
}

// Manual Clone: avoid derive adding an `S: Clone` bound.
impl<S> Clone for ApiClient<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            http: self.http.clone(),
            session: self.session.clone(),
            navigator: self.navigator.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

impl<S: Storage> ApiClient<S> {
    /// Create a client over `storage`, which holds the persisted session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built from `config`.
    pub fn new(config: ClientConfig, storage: S) -> Result<Self, Error> {
        let http = config.build_http_client()?;
        Ok(Self {
            config: Arc::new(config),
            http,
            session: Arc::new(SessionStore::new(storage)),
            navigator: Arc::new(NoopNavigator),
            refresh: Arc::new(RefreshGate::new()),
        })
    }

    /// Install the navigator used to force the login view after a failed refresh.
    #[must_use]
    pub fn with_navigator(mut self, navigator: impl Navigator) -> Self {
        self.navigator = Arc::new(navigator);
        self
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore<S> {
        &self.session
    }

    #[must_use]
    pub fn refresh_state(&self) -> RefreshState {
        self.refresh.state()
    }

    /// Watch refresh state transitions.
    #[must_use]
    pub fn subscribe_refresh_state(&self) -> watch::Receiver<RefreshState> {
        self.refresh.subscribe()
    }

    /// Send an authenticated request and return the successful response.
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] if no response was received
    /// - [`Error::RefreshFailed`] if the token had expired and could not be renewed
    /// - [`Error::Unauthorized`] if the request was still rejected after a refresh
    /// - [`Error::Api`] for other 4xx responses, with the server's body
    /// - [`Error::Server`] for 5xx responses
    pub async fn execute(&self, request: &ApiRequest) -> Result<Response, Error> {
        let mut token = self.session.access_token().await?;
        let mut attempt = Attempt::First;

        loop {
            let response = self.dispatch(request, token.as_ref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return ensure_success(response).await;
            }

            let Some(next) = attempt.after_unauthorized() else {
                tracing::debug!(path = request.path(), "Still unauthorized after token refresh");
                return Err(Error::Unauthorized);
            };
            attempt = next;
            token = Some(self.renew_access_token(token.as_ref()).await?);
        }
    }

    /// Send an authenticated request and decode its JSON body.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute); decoding failures surface as [`Error::Http`].
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, Error> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(Into::into)
    }

    /// Send an authenticated request whose response body is irrelevant.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn send_empty(&self, request: &ApiRequest) -> Result<(), Error> {
        self.execute(request).await.map(drop)
    }

    /// Send a request without credentials and without 401 handling.
    pub(crate) async fn send_unauthenticated(&self, request: &ApiRequest) -> Result<Response, Error> {
        self.dispatch(request, None).await
    }

    /// Store `session` (or clear it when `None`) and forget any refresh failure.
    ///
    /// Runs under the refresh gate, so a refresh already in flight finishes
    /// against the old session and cannot overwrite or expire this one.
    pub(crate) async fn replace_session(&self, session: Option<&Session>) -> Result<(), Error> {
        let mut last_failure = self.refresh.acquire().await;
        let written = match session {
            Some(session) => self.session.save(session).await,
            None => self.session.clear().await,
        };
        *last_failure = None;
        self.refresh.transition(RefreshState::Normal);
        written
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<Response, Error> {
        let url = self.config.endpoint(request.path())?;
        let mut headers = request.headers().clone();
        authorize(&mut headers, token);

        let mut builder = self
            .http
            .request(request.method().clone(), url)
            .headers(headers);
        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Obtain a usable access token after `sent_with` was rejected.
    async fn renew_access_token(&self, sent_with: Option<&AccessToken>) -> Result<AccessToken, Error> {
        let mut last_failure = self.refresh.acquire().await;
        let stored = self.session.access_token().await?;

        match refresh::plan(sent_with, stored, self.refresh.state(), last_failure.as_deref()) {
            RefreshPlan::Reuse(token) => {
                tracing::debug!("Access token already renewed by a concurrent request");
                return Ok(token);
            }
            RefreshPlan::Fail(reason) => return Err(Error::RefreshFailed(reason)),
            RefreshPlan::Refresh => {}
        }

        self.refresh.transition(RefreshState::Refreshing);
        tracing::debug!("Refreshing access token");

        let refreshed = match self.request_refresh().await {
            Ok(refreshed) => refreshed,
            Err(reason) => {
                tracing::error!(reason = %reason, "Token refresh failed; clearing session");
                self.expire_session().await;
                *last_failure = Some(reason.clone());
                self.refresh.transition(RefreshState::Failed);
                return Err(Error::RefreshFailed(reason));
            }
        };

        if let Err(e) = self
            .session
            .save_refreshed(&refreshed.access, refreshed.refresh.as_ref())
            .await
        {
            self.refresh.transition(RefreshState::Normal);
            return Err(e);
        }

        *last_failure = None;
        self.refresh.transition(RefreshState::Normal);
        tracing::info!(rotated = refreshed.refresh.is_some(), "Access token refreshed");
        Ok(refreshed.access)
    }

    /// Call the refresh endpoint, bypassing the bearer header.
    async fn request_refresh(&self) -> Result<RefreshResponse, String> {
        let refresh = self
            .session
            .refresh_token()
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "no refresh token stored".to_string())?;
        let url = self.config.endpoint(REFRESH_PATH).map_err(|e| e.to_string())?;

        let response = self
            .http
            .post(url)
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("refresh endpoint returned {status}"));
        }
        response
            .json::<RefreshResponse>()
            .await
            .map_err(|e| format!("invalid refresh response: {e}"))
    }

    /// Drop the local session and send the user to the login view.
    async fn expire_session(&self) {
        if let Err(e) = self.session.clear().await {
            tracing::error!(error = %e, "Failed to clear session after refresh failure");
        }
        self.navigator.navigate(&self.config.login_path);
    }
}

/// Checks a non-401 response; returns it on success or the matching error.
async fn ensure_success(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.is_server_error() {
        tracing::warn!(status = %status, url = %response.url(), "Server error");
        return Err(Error::Server { status });
    }
    if !status.is_client_error() {
        tracing::warn!(status = %status, url = %response.url(), "Unexpected response status");
        return Err(Error::UnexpectedStatus { status });
    }

    let text = response.text().await?;
    let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));
    Err(Error::Api { status, body })
}

#[cfg(test)]
mod tests {
    use axum::http;

    use super::*;

    fn response(status: u16, body: &'static str) -> Response {
        http::Response::builder()
            .status(status)
            .body(body)
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn success_passes_through() {
        let ok = ensure_success(response(200, "{}")).await.unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn client_error_keeps_body() {
        let err = ensure_success(response(400, r#"{"steps":["required"]}"#))
            .await
            .unwrap_err();
        match err {
            Error::Api { status, body } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, serde_json::json!({"steps": ["required"]}));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn plain_text_client_error_is_kept_as_string() {
        let err = ensure_success(response(404, "Not Found")).await.unwrap_err();
        assert!(
            matches!(&err, Error::Api { body, .. } if body == "Not Found"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn server_error_drops_body() {
        let err = ensure_success(response(503, "<html>down</html>")).await.unwrap_err();
        assert!(matches!(err, Error::Server { status } if status.as_u16() == 503));
    }

    #[tokio::test]
    async fn redirect_is_not_an_api_error() {
        let err = ensure_success(response(304, "")).await.unwrap_err();
        assert!(
            matches!(err, Error::UnexpectedStatus { status } if status == StatusCode::NOT_MODIFIED),
            "got {err:?}"
        );
    }
}
