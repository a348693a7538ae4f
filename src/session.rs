use crate::error::Error;
use crate::storage::Storage;
use crate::types::{AccessToken, RefreshToken, Session, UserProfile};

const ACCESS_TOKEN_KEY: &str = "accessToken";
const REFRESH_TOKEN_KEY: &str = "refreshToken";
const USER_KEY: &str = "user";
const SESSION_KEYS: &[&str] = &[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Typed view of the session over a [`Storage`] backend.
///
/// The only component allowed to read or write the persisted credentials.
#[derive(Debug)]
pub struct SessionStore<S> {
    storage: S,
}

impl<S: Storage> SessionStore<S> {
    #[must_use]
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Borrow the backing storage.
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persist all three session fields in one backend call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the profile cannot be encoded, or
    /// [`Error::Storage`] if the backend fails.
    pub async fn save(&self, session: &Session) -> Result<(), Error> {
        let user = serde_json::to_string(&session.user)?;
        self.storage
            .set_all(vec![
                (ACCESS_TOKEN_KEY, session.access_token.as_str().to_owned()),
                (REFRESH_TOKEN_KEY, session.refresh_token.as_str().to_owned()),
                (USER_KEY, user),
            ])
            .await
            .map_err(Error::storage)
    }

    /// Replace the access token (and a rotated refresh token) after a refresh.
    pub(crate) async fn save_refreshed(
        &self,
        access: &AccessToken,
        refresh: Option<&RefreshToken>,
    ) -> Result<(), Error> {
        let mut entries = vec![(ACCESS_TOKEN_KEY, access.as_str().to_owned())];
        if let Some(refresh) = refresh {
            entries.push((REFRESH_TOKEN_KEY, refresh.as_str().to_owned()));
        }
        self.storage.set_all(entries).await.map_err(Error::storage)
    }

    /// Last stored access token. Empty values count as absent.
    pub async fn access_token(&self) -> Result<Option<AccessToken>, Error> {
        Ok(self.non_empty(ACCESS_TOKEN_KEY).await?.map(AccessToken::from))
    }

    pub async fn refresh_token(&self) -> Result<Option<RefreshToken>, Error> {
        Ok(self.non_empty(REFRESH_TOKEN_KEY).await?.map(RefreshToken::from))
    }

    /// Cached profile snapshot. A snapshot that no longer decodes is treated as absent.
    pub async fn user(&self) -> Result<Option<UserProfile>, Error> {
        let Some(raw) = self.non_empty(USER_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cached user profile");
                Ok(None)
            }
        }
    }

    /// Remove the access token, refresh token and cached user.
    pub async fn clear(&self) -> Result<(), Error> {
        self.storage
            .remove_all(SESSION_KEYS)
            .await
            .map_err(Error::storage)
    }

    /// `true` iff an access token is stored. Expiry is only discovered through a 401.
    pub async fn is_authenticated(&self) -> Result<bool, Error> {
        Ok(self.access_token().await?.is_some())
    }

    async fn non_empty(&self, key: &str) -> Result<Option<String>, Error> {
        let value = self.storage.get(key).await.map_err(Error::storage)?;
        Ok(value.filter(|v| !v.is_empty()))
    }
}
