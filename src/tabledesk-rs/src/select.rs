use std::marker::PhantomData;

use futures::Stream;
use serde::de::DeserializeOwned;
use tabledesk_core::request::{HttpRequest, Operation, Target};
use tabledesk_core::{QueryIntent, Record, SortDirection, UsageError};

use crate::client::Client;
use crate::paginate;
use crate::Result;

/// Chainable select against a table or view.
///
/// The builder only accumulates intent; `execute` and `pages` borrow it and
/// never change it, so one query can be run any number of times.
pub struct SelectQuery<T = Record> {
    client: Client,
    target: Target,
    intent: QueryIntent,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for SelectQuery<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            target: self.target.clone(),
            intent: self.intent.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for SelectQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectQuery")
            .field("target", &self.target)
            .field("intent", &self.intent)
            .finish()
    }
}

impl SelectQuery {
    pub(crate) fn new(client: Client, target: Target) -> Self {
        Self {
            client,
            target,
            intent: QueryIntent::new(),
            _record: PhantomData,
        }
    }
}

impl<T> SelectQuery<T> {
    fn map_intent(self, f: impl FnOnce(QueryIntent) -> QueryIntent) -> Self {
        Self {
            intent: f(self.intent),
            ..self
        }
    }

    /// Decode rows into `U` instead of [`Record`]
    pub fn typed<U>(self) -> SelectQuery<U> {
        SelectQuery {
            client: self.client,
            target: self.target,
            intent: self.intent,
            _record: PhantomData,
        }
    }

    pub fn with_columns<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map_intent(|intent| intent.with_columns(columns))
    }

    pub fn with_filter(self, filter: impl Into<String>) -> Self {
        self.map_intent(|intent| intent.with_filter(filter))
    }

    pub fn with_sort(self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.map_intent(|intent| intent.with_sort(column, direction))
    }

    /// Page size for `execute`, `1..=500`. Ignored by `pages`/`select_all`,
    /// which always request full pages.
    pub fn with_limit(self, top: i64) -> std::result::Result<Self, UsageError> {
        let intent = self.intent.clone().with_limit(top)?;
        Ok(Self { intent, ..self })
    }

    pub fn with_skip(self, skip: i64) -> std::result::Result<Self, UsageError> {
        let intent = self.intent.clone().with_skip(skip)?;
        Ok(Self { intent, ..self })
    }

    pub fn intent(&self) -> &QueryIntent {
        &self.intent
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Materialize the request `execute` would send, without sending it
    pub fn request(&self) -> std::result::Result<HttpRequest, UsageError> {
        self.client
            .assemble(&self.target, Operation::Select, &self.intent.to_params(), None)
    }
}

impl<T: DeserializeOwned> SelectQuery<T> {
    /// Run the query: exactly one round trip
    pub async fn execute(&self) -> Result<Vec<T>> {
        self.client.select(&self.target, &self.intent).await
    }
}

impl<T> SelectQuery<T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Lazily page through every matching record, 500 at a time.
    ///
    /// Each call starts a fresh cursor at the query's skip.
    pub fn pages(&self) -> impl Stream<Item = Result<Vec<T>>> + Send + 'static {
        paginate::pages(self.client.clone(), self.target.clone(), self.intent.clone())
    }

    /// Collect every page into one list
    pub async fn select_all(&self) -> Result<Vec<T>> {
        paginate::collect(self.pages()).await
    }
}
