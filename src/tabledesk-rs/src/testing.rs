//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tabledesk_core::{ClientConfig, HttpRequest};

use crate::client::Client;
use crate::transport::{HttpResponse, Transport, TransportError};

/// Replays scripted responses in order and records every request.
/// An exhausted script behaves like a refused connection.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Result<HttpResponse, TransportError>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub(crate) fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("connection refused".to_string())))
    }
}

pub(crate) fn client(transport: ScriptedTransport) -> Client {
    client_with(transport, ClientConfig::new("15331", "s3cr3t"))
}

pub(crate) fn client_with(transport: ScriptedTransport, config: ClientConfig) -> Client {
    Client::with_transport(
        config.with_base_url("https://api.test/secure/api/v2"),
        Arc::new(transport),
    )
    .unwrap()
}

/// `count` numbered records starting at `first`
pub(crate) fn rows(first: usize, count: usize) -> serde_json::Value {
    serde_json::Value::Array(
        (first..first + count)
            .map(|n| serde_json::json!({"@row.id": n, "Name": format!("row {}", n)}))
            .collect(),
    )
}
