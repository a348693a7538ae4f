use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::client::ApiClient;
use crate::error::Error;
use crate::request::ApiRequest;
use crate::storage::Storage;
use crate::types::{Credentials, LoginResponse, RefreshToken, Session, UserProfile};

const LOGIN_PATH: &str = "/auth/login/";
const LOGOUT_PATH: &str = "/auth/logout/";
const PROFILE_PATH: &str = "/auth/profile/";

/// Shown when the server gives no usable reason for a failed login.
pub const GENERIC_LOGIN_ERROR: &str = "Login failed. Please try again.";

#[derive(Serialize)]
struct LogoutRequest<'a> {
    refresh_token: &'a RefreshToken,
}

/// Login, logout and profile operations.
pub struct Auth<'a, S> {
    client: &'a ApiClient<S>,
}

impl<S: Storage> ApiClient<S> {
    #[must_use]
    pub fn auth(&self) -> Auth<'_, S> {
        Auth { client: self }
    }
}

impl<S: Storage> Auth<'_, S> {
    /// Exchange credentials for a session.
    ///
    /// The call is unauthenticated and never triggers a token refresh. When the
    /// payload carries tokens they are stored together with the user profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Login`] with the server's message (or
    /// [`GENERIC_LOGIN_ERROR`]) if the login is rejected or the server is
    /// unreachable, or [`Error::Storage`] if the session cannot be saved.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, Error> {
        let request = ApiRequest::post(LOGIN_PATH).with_json(credentials)?;

        let response = match self.client.send_unauthenticated(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Login request failed");
                return Err(Error::Login(GENERIC_LOGIN_ERROR.into()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body: JsonValue = response.json().await.unwrap_or(JsonValue::Null);
            tracing::warn!(status = %status, "Login rejected");
            return Err(Error::Login(
                login_error_message(&body).unwrap_or_else(|| GENERIC_LOGIN_ERROR.into()),
            ));
        }

        let payload: LoginResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Unreadable login response");
            Error::Login(GENERIC_LOGIN_ERROR.into())
        })?;

        if let Some(tokens) = &payload.tokens {
            let session = Session {
                access_token: tokens.access.clone(),
                refresh_token: tokens.refresh.clone(),
                user: payload.user.clone(),
            };
            self.client.replace_session(Some(&session)).await?;
            tracing::info!(user_id = ?payload.user.id, "Login successful");
        } else {
            tracing::warn!("Login response carried no tokens; session not stored");
        }

        Ok(payload)
    }

    /// End the session.
    ///
    /// Server-side invalidation of the refresh token is best effort: its
    /// failure is logged, never returned. The local session is always cleared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] only if the local session cannot be cleared.
    pub async fn logout(&self) -> Result<(), Error> {
        match self.client.session().refresh_token().await {
            Ok(Some(refresh_token)) => {
                if let Err(e) = self.invalidate_refresh_token(&refresh_token).await {
                    tracing::warn!(error = %e, "Server-side logout failed; clearing local session anyway");
                }
            }
            Ok(None) => tracing::debug!("No refresh token stored; skipping server-side logout"),
            Err(e) => tracing::warn!(error = %e, "Could not read refresh token during logout"),
        }

        self.client.replace_session(None).await?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Fetch the current user's profile from the server.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn profile(&self) -> Result<UserProfile, Error> {
        self.client.send_json(&ApiRequest::get(PROFILE_PATH)).await
    }

    /// Profile snapshot cached at login.
    pub async fn current_user(&self) -> Result<Option<UserProfile>, Error> {
        self.client.session().user().await
    }

    /// `true` iff an access token is stored.
    pub async fn is_authenticated(&self) -> Result<bool, Error> {
        self.client.session().is_authenticated().await
    }

    async fn invalidate_refresh_token(&self, refresh_token: &RefreshToken) -> Result<(), Error> {
        let request = ApiRequest::post(LOGOUT_PATH).with_json(&LogoutRequest { refresh_token })?;
        self.client.send_empty(&request).await
    }
}

/// Pull a human-readable reason out of a login error body.
fn login_error_message(body: &JsonValue) -> Option<String> {
    ["error", "detail"]
        .iter()
        .find_map(|key| body.get(key).and_then(JsonValue::as_str))
        .or_else(|| {
            body.get("non_field_errors")
                .and_then(|v| v.get(0))
                .and_then(JsonValue::as_str)
        })
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_field_wins() {
        let body = json!({"error": "Invalid credentials", "detail": "ignored"});
        assert_eq!(login_error_message(&body).as_deref(), Some("Invalid credentials"));
    }

    #[test]
    fn detail_and_non_field_errors() {
        assert_eq!(
            login_error_message(&json!({"detail": "Account disabled"})).as_deref(),
            Some("Account disabled")
        );
        assert_eq!(
            login_error_message(&json!({"non_field_errors": ["Unable to log in."]})).as_deref(),
            Some("Unable to log in.")
        );
    }

    #[test]
    fn unusable_body_has_no_message() {
        assert_eq!(login_error_message(&JsonValue::Null), None);
        assert_eq!(login_error_message(&json!({"email": ["This field is required."]})), None);
        assert_eq!(login_error_message(&json!({"error": 42})), None);
    }
}
