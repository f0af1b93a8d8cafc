//! reqwest-backed [`Transport`] for the RESTCONF API.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tnsr_acl_common::paths::{YANG_DATA_JSON, YANG_DATA_JSON_ACCEPT};
use tnsr_acl_common::{HttpError, Method, RawResponse, Transport};
use tracing::debug;

use crate::config::RestconfConfig;
use crate::error::{AclMgrError, Result};

/// HTTP transport issuing one request per call.
///
/// The client is built without a request timeout and without any retry
/// middleware; a request either completes, fails, or hangs with the
/// underlying connection.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport from the RESTCONF section of the configuration.
    pub fn from_config(config: &RestconfConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| AclMgrError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Put => reqwest::Method::PUT,
        Method::Post => reqwest::Method::POST,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
    ) -> std::result::Result<RawResponse, HttpError> {
        debug!(%method, url, "Sending RESTCONF request");

        let mut request = self
            .client
            .request(to_reqwest(method), url)
            .header(CONTENT_TYPE, YANG_DATA_JSON)
            .header(ACCEPT, YANG_DATA_JSON_ACCEPT);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HttpError::network(e.to_string()))?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let text = response
            .text()
            .await
            .map_err(|e| HttpError::network(e.to_string()))?;

        debug!(%method, url, status = status.as_u16(), "RESTCONF response");
        RawResponse::new(status.as_u16(), text).into_result(&status_text)
    }
}
