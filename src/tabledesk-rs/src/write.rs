use serde::Serialize;
use tabledesk_core::request::{Operation, Target};
use tabledesk_core::WriteResult;

use crate::client::{batch_values, Client};
use crate::Result;

/// Create, update or upsert of up to 500 records in one request
#[derive(Debug, Clone)]
pub struct WriteQuery {
    client: Client,
    target: Target,
    operation: Operation,
    records: Vec<serde_json::Value>,
    workflow: bool,
    match_column: Option<String>,
}

impl WriteQuery {
    pub(crate) fn new<R: Serialize>(
        client: Client,
        target: Target,
        operation: Operation,
        records: &[R],
    ) -> Result<Self> {
        Ok(Self {
            client,
            target,
            operation,
            records: batch_values(records)?,
            workflow: true,
            match_column: None,
        })
    }

    /// Whether server-side workflow rules run for these records (default on)
    pub fn with_workflow(mut self, workflow: bool) -> Self {
        self.workflow = workflow;
        self
    }

    /// Column used to match existing rows. Only sent for upserts.
    pub fn with_match(mut self, column: impl Into<String>) -> Self {
        self.match_column = Some(column.into());
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("workflow", if self.workflow { "1" } else { "0" }.to_string())];
        if self.operation == Operation::Upsert {
            if let Some(column) = &self.match_column {
                params.push(("match", column.clone()));
            }
        }
        params
    }

    /// Send the batch. Results match the submitted records 1:1, in order.
    pub async fn execute(&self) -> Result<Vec<WriteResult>> {
        if self.records.is_empty() {
            return Ok(Vec::new());
        }
        self.client
            .write(
                &self.target,
                self.operation,
                &self.params(),
                Some(self.records.clone()),
                self.records.len(),
            )
            .await
    }
}
