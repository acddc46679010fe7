//! Cache fallback.
//!
//! Wraps any fallible async fetch: a success is persisted as the latest
//! snapshot for its key; a failure is answered from that snapshot when one
//! exists, and re-raised unchanged when it does not.
//!
//! Two callers writing the same key race; the last rename wins.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tabledesk_core::SnapshotStore;
use tracing::{info, warn};

/// Result of a fallback-wrapped fetch
#[derive(Debug, Clone, PartialEq)]
pub struct Fallback<T> {
    pub data: T,
    pub from_cache: bool,
    /// Age of the snapshot served, when `from_cache` is set
    pub cache_age: Option<Duration>,
}

impl<T> Fallback<T> {
    pub fn live(data: T) -> Self {
        Self {
            data,
            from_cache: false,
            cache_age: None,
        }
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

/// Run `operation` with snapshot fallback under `key`
pub async fn with_fallback<T, E, F, Fut>(
    store: &SnapshotStore,
    key: &str,
    operation: F,
) -> Result<Fallback<T>, E>
where
    T: Serialize + DeserializeOwned,
    E: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_fallback_if(store, key, |_: &E| true, operation).await
}

/// Like [`with_fallback`], but only errors accepted by `recoverable` are
/// answered from the snapshot; the rest propagate as-is.
pub async fn with_fallback_if<T, E, F, Fut, P>(
    store: &SnapshotStore,
    key: &str,
    recoverable: P,
    operation: F,
) -> Result<Fallback<T>, E>
where
    T: Serialize + DeserializeOwned,
    E: Display,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnOnce(&E) -> bool,
{
    match operation().await {
        Ok(data) => {
            if let Err(e) = store.save(key, &data).await {
                warn!(key, error = %e, "Failed to persist snapshot, returning live data");
            }
            Ok(Fallback::live(data))
        }
        Err(err) if !recoverable(&err) => Err(err),
        Err(err) => match store.load_with_info::<T>(key).await {
            Some((data, snapshot)) => {
                info!(
                    key,
                    error = %err,
                    age_minutes = snapshot.age_minutes(),
                    "Live fetch failed, serving cached snapshot"
                );
                Ok(Fallback {
                    data,
                    from_cache: true,
                    cache_age: Some(snapshot.age),
                })
            }
            None => Err(err),
        },
    }
}
