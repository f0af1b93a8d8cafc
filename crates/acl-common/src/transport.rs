//! Transport contract: one HTTP request, resolved by status code.

use async_trait::async_trait;
use std::fmt;

use crate::error::HttpError;

/// HTTP methods used against the RESTCONF API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a rule list.
    Get,
    /// Create or replace a rule.
    Put,
    /// Create a rule, failing if it exists.
    Post,
    /// Remove a rule.
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    /// Returns true for methods that modify the remote store.
    pub fn is_write(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body (may be empty).
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for statuses in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Keeps a 2xx response, turns anything else into an [`HttpError`].
    pub fn into_result(self, status_text: &str) -> Result<RawResponse, HttpError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(HttpError::from_response(self.status, status_text, &self.body))
        }
    }
}

/// Issues single HTTP requests.
///
/// Implementations perform exactly one round trip per call: no retries,
/// no timeout, no request pipelining.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response if its status is 2xx.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
    ) -> Result<RawResponse, HttpError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
    ) -> Result<RawResponse, HttpError> {
        (**self).send(method, url, body).await
    }
}
