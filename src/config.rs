use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Fitness API client configuration.
///
/// The base URL is a constructor parameter; everything else has a default.
///
/// ```rust,ignore
/// use fitness_client::ClientConfig;
///
/// let config = ClientConfig::new("https://api.example.com/api".parse()?)
///     .with_login_path("/signin");
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) login_path: String,
    pub(crate) user_agent: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a configuration for the backend rooted at `base_url`.
    ///
    /// A path prefix on the base URL (`https://host/api`) is kept; endpoint
    /// paths are appended to it.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            login_path: "/login".into(),
            user_agent: None,
            timeout: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Required env vars
    /// - `FITNESS_API_BASE_URL`: backend base URL
    ///
    /// # Optional env vars
    /// - `FITNESS_LOGIN_PATH`: where to send the user when the session is lost
    /// - `FITNESS_HTTP_TIMEOUT_SECS`: per-request timeout in seconds
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or a value does not parse.
    pub fn from_env() -> Result<Self, Error> {
        let base_url: Url = std::env::var("FITNESS_API_BASE_URL")
            .map_err(|_| Error::Config("FITNESS_API_BASE_URL is required".into()))?
            .parse()
            .map_err(|e| Error::Config(format!("FITNESS_API_BASE_URL: {e}")))?;

        let mut config = Self::new(base_url);

        if let Ok(path) = std::env::var("FITNESS_LOGIN_PATH") {
            config = config.with_login_path(path);
        }
        if let Ok(secs) = std::env::var("FITNESS_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("FITNESS_HTTP_TIMEOUT_SECS: {e}")))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Override the login entry point used after an unrecoverable refresh failure.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Resolve an API path (`/auth/login/`) against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
            .parse()
            .map_err(|e| Error::Config(format!("invalid endpoint {path}: {e}")))
    }

    pub(crate) fn build_http_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(Into::into)
    }
}
