use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tabledesk_core::request::{self, HttpRequest, Operation, Target};
use tabledesk_core::{
    classify, map_write_results, parse_retry_after, ApiError, ClientConfig, ErrorContext,
    QueryIntent, RawWriteEntry, Record, ResponseBody, SnapshotStore, UsageError, WriteResult,
    MAX_PAGE_SIZE,
};
use tracing::{debug, warn};

use crate::fallback::{with_fallback_if, Fallback};
use crate::select::SelectQuery;
use crate::transport::{ReqwestTransport, Transport};
use crate::write::WriteQuery;
use crate::{Error, Result};

/// TableDesk REST API Client
///
/// Cheap to clone; clones share configuration and transport.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    snapshots: Option<SnapshotStore>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .field("app_id", &self.config.app_id)
            .field("auth_mode", &self.config.auth_mode)
            .field("snapshots", &self.snapshots)
            .finish()
    }
}

impl Client {
    /// Create a client backed by reqwest
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(Duration::from_secs(config.timeout_secs))
            .map_err(|e| UsageError::InvalidConfig(e.to_string()))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client from `TABLEDESK_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over a caller-supplied transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let snapshots = config
            .cache
            .enabled
            .then(|| SnapshotStore::new(&config.cache.dir));
        Ok(Self {
            config: Arc::new(config),
            transport,
            snapshots,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Snapshot store, when the cache is enabled
    pub fn snapshots(&self) -> Option<&SnapshotStore> {
        self.snapshots.as_ref()
    }

    pub fn table(&self, name: impl Into<String>) -> Table {
        Table {
            client: self.clone(),
            name: name.into(),
        }
    }

    pub fn view(&self, table: impl Into<String>, view: impl Into<String>) -> View {
        View {
            client: self.clone(),
            target: Target::view(table, view),
        }
    }

    /// Raw schema description of the whole application
    pub async fn describe(&self) -> Result<serde_json::Value> {
        let request = self.assemble(&Target::Application, Operation::Describe, &[], None)?;
        Ok(self.fetch(request).await?)
    }

    /// Run `operation`, persisting its result and falling back to the last
    /// snapshot under `key` when it fails with an [`ApiError`].
    ///
    /// Without a configured cache the operation simply runs.
    pub async fn cached<T, F, Fut>(&self, key: &str, operation: F) -> Result<Fallback<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match &self.snapshots {
            Some(store) => {
                with_fallback_if(store, key, |err: &Error| err.as_api().is_some(), operation)
                    .await
            }
            None => operation().await.map(Fallback::live),
        }
    }

    pub(crate) fn assemble(
        &self,
        target: &Target,
        operation: Operation,
        params: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> std::result::Result<HttpRequest, UsageError> {
        request::assemble(&self.config, target, operation, params, body)
    }

    /// Send one request and decode a successful JSON body
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<T, ApiError> {
        let url = request.redacted_url.clone();
        debug!(method = request.method.as_str(), url = %url, "Sending request");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "Transport failure");
                return Err(ApiError::transport(e.to_string(), url));
            }
        };

        if !response.is_success() {
            let retry_after = response.retry_after.as_deref().and_then(parse_retry_after);
            let err = classify(
                response.status,
                &ResponseBody::parse(&response.body),
                &url,
                retry_after,
            );
            debug!(status = response.status, kind = err.kind(), url = %url, "Request failed");
            return Err(err);
        }

        serde_json::from_slice(&response.body).map_err(|e| ApiError::Generic {
            context: ErrorContext {
                message: format!("Invalid response body: {}", e),
                status: Some(response.status),
                url,
            },
            field_errors: Vec::new(),
        })
    }

    /// One select round trip for `intent`
    pub(crate) async fn select<T: DeserializeOwned>(
        &self,
        target: &Target,
        intent: &QueryIntent,
    ) -> Result<Vec<T>> {
        let request = self.assemble(target, Operation::Select, &intent.to_params(), None)?;
        Ok(self.fetch(request).await?)
    }

    /// One write round trip, mapped 1:1 onto the submitted records
    pub(crate) async fn write(
        &self,
        target: &Target,
        operation: Operation,
        params: &[(&str, String)],
        records: Option<Vec<serde_json::Value>>,
        submitted: usize,
    ) -> Result<Vec<WriteResult>> {
        let request = self.assemble(
            target,
            operation,
            params,
            records.map(serde_json::Value::Array),
        )?;
        let url = request.redacted_url.clone();
        let entries: Vec<RawWriteEntry> = self.fetch(request).await?;
        Ok(map_write_results(operation, submitted, entries, &url)?)
    }
}

fn check_batch(count: usize) -> std::result::Result<(), UsageError> {
    if count > MAX_PAGE_SIZE as usize {
        return Err(UsageError::TooManyRecords {
            count,
            max: MAX_PAGE_SIZE,
        });
    }
    Ok(())
}

fn id_params(ids: &[i64]) -> Vec<(&'static str, String)> {
    ids.iter().map(|id| ("id", id.to_string())).collect()
}

/// Handle on one table
#[derive(Debug, Clone)]
pub struct Table {
    client: Client,
    name: String,
}

impl Table {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> Target {
        Target::table(self.name.clone())
    }

    pub fn select(&self) -> SelectQuery {
        SelectQuery::new(self.client.clone(), self.target())
    }

    pub fn view(&self, name: impl Into<String>) -> View {
        View {
            client: self.client.clone(),
            target: Target::view(self.name.clone(), name),
        }
    }

    /// Fetch records by id
    pub async fn retrieve(&self, ids: &[i64]) -> Result<Vec<Record>> {
        self.retrieve_as(ids).await
    }

    pub async fn retrieve_as<T: DeserializeOwned>(&self, ids: &[i64]) -> Result<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        check_batch(ids.len())?;
        let request = self
            .client
            .assemble(&self.target(), Operation::Retrieve, &id_params(ids), None)?;
        Ok(self.client.fetch(request).await?)
    }

    pub fn create<R: Serialize>(&self, records: &[R]) -> Result<WriteQuery> {
        WriteQuery::new(self.client.clone(), self.target(), Operation::Create, records)
    }

    pub fn update<R: Serialize>(&self, records: &[R]) -> Result<WriteQuery> {
        WriteQuery::new(self.client.clone(), self.target(), Operation::Update, records)
    }

    pub fn upsert<R: Serialize>(&self, records: &[R]) -> Result<WriteQuery> {
        WriteQuery::new(self.client.clone(), self.target(), Operation::Upsert, records)
    }

    /// Delete records by id; one result per id, in order
    pub async fn delete(&self, ids: &[i64]) -> Result<Vec<WriteResult>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        check_batch(ids.len())?;
        self.client
            .write(
                &self.target(),
                Operation::Delete,
                &id_params(ids),
                None,
                ids.len(),
            )
            .await
    }

    /// Raw schema description of this table
    pub async fn describe(&self) -> Result<serde_json::Value> {
        let request = self
            .client
            .assemble(&self.target(), Operation::Describe, &[], None)?;
        Ok(self.client.fetch(request).await?)
    }
}

/// Handle on a server-defined view of a table
#[derive(Debug, Clone)]
pub struct View {
    client: Client,
    target: Target,
}

impl View {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn select(&self) -> SelectQuery {
        SelectQuery::new(self.client.clone(), self.target.clone())
    }
}

pub(crate) fn batch_values<R: Serialize>(
    records: &[R],
) -> std::result::Result<Vec<serde_json::Value>, UsageError> {
    check_batch(records.len())?;
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::to_value(record).map_err(|e| UsageError::InvalidRecord {
                index,
                message: e.to_string(),
            })
        })
        .collect()
}
