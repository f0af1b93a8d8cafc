//! Fake RESTCONF server
//!
//! Exposes a [`SimulatedRestconf`] over real HTTP on a loopback port so the
//! reqwest transport can be tested end to end.

use axum::extract::State;
use axum::http::{header, HeaderMap, Method as HttpMethod, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tnsr_acl_common::paths::YANG_DATA_JSON_ACCEPT;
use tnsr_acl_common::{AclPaths, AclResult, Method, DEFAULT_API_PATH};
use tokio::task::JoinHandle;
use tracing::info;

use crate::simulator::{restconf_error, SimulatedRestconf};

/// A running fake server. Stops when dropped.
pub struct FakeRestconfServer {
    addr: SocketAddr,
    simulator: Arc<SimulatedRestconf>,
    task: JoinHandle<()>,
}

impl FakeRestconfServer {
    /// Binds an ephemeral loopback port and starts serving `simulator`.
    pub async fn start(simulator: Arc<SimulatedRestconf>) -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;

        let app = Router::new()
            .fallback(restconf_handler)
            .with_state(Arc::clone(&simulator));

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        info!(%addr, "Fake RESTCONF server listening");

        Ok(Self {
            addr,
            simulator,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL of the RESTCONF API, e.g. `http://127.0.0.1:41234/restconf`.
    pub fn base_url(&self) -> String {
        format!("http://{}{}", self.addr, DEFAULT_API_PATH)
    }

    /// URL builder pointing at this server.
    pub fn paths(&self) -> AclResult<AclPaths> {
        AclPaths::new(&self.base_url(), self.simulator.paths().module())
    }

    pub fn simulator(&self) -> &Arc<SimulatedRestconf> {
        &self.simulator
    }
}

impl Drop for FakeRestconfServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn restconf_handler(
    State(simulator): State<Arc<SimulatedRestconf>>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let method = match method {
        HttpMethod::GET => Method::Get,
        HttpMethod::PUT => Method::Put,
        HttpMethod::POST => Method::Post,
        HttpMethod::DELETE => Method::Delete,
        _ => {
            let reply = restconf_error(405, "operation-not-supported", "method not allowed");
            return (StatusCode::METHOD_NOT_ALLOWED, reply.body).into_response();
        }
    };

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    let body = (!body.is_empty()).then_some(body.as_str());

    let reply = simulator.handle(method, uri.path(), body, content_type);
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if reply.body.is_empty() {
        status.into_response()
    } else {
        (
            status,
            [(header::CONTENT_TYPE, YANG_DATA_JSON_ACCEPT)],
            reply.body,
        )
            .into_response()
    }
}
