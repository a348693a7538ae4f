use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::error::Error;
use crate::types::AccessToken;

/// Immutable description of one API call.
///
/// The client may send the same descriptor twice (original + replay after a
/// token refresh), so nothing about a send is recorded on it.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    headers: HeaderMap,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append a query parameter only when `value` is present.
    #[must_use]
    pub fn with_optional_query(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.with_query(key, value),
            None => self,
        }
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `body` does not serialize.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    #[must_use]
    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Whether a request has already been replayed after a token refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
    First,
    Retried,
}

impl Attempt {
    /// The attempt to make after a 401, or `None` if the request already had its retry.
    pub(crate) fn after_unauthorized(self) -> Option<Self> {
        match self {
            Self::First => Some(Self::Retried),
            Self::Retried => None,
        }
    }
}

/// Add `Authorization: Bearer <token>` when a non-empty token is available.
pub(crate) fn authorize(headers: &mut HeaderMap, token: Option<&AccessToken>) {
    let Some(token) = token.filter(|t| !t.as_str().is_empty()) else {
        return;
    };
    match HeaderValue::from_str(&format!("Bearer {}", token.as_str())) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(_) => tracing::warn!("Access token contains invalid header characters; sending unauthenticated"),
    }
}
