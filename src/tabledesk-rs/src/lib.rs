//! TableDesk Client Library
//!
//! Fluent, chainable access to a TableDesk application over its REST API.
//!
//! ```rust,no_run
//! use tabledesk_rs::{Client, ClientConfig, SortDirection};
//!
//! # async fn run() -> tabledesk_rs::Result<()> {
//! let client = Client::new(ClientConfig::new("15331", "api-token"))?;
//!
//! let newest = client
//!     .table("Contacts")
//!     .select()
//!     .with_columns(["Name", "Email"])
//!     .with_filter("[Status] = \"Active\"")
//!     .with_sort("Created", SortDirection::Desc)
//!     .with_limit(10)?
//!     .execute()
//!     .await?;
//!
//! let everyone = client.table("Contacts").select().select_all().await?;
//! # let _ = (newest, everyone);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod fallback;
mod paginate;
mod select;
#[cfg(test)]
mod testing;
pub mod transport;
mod write;

pub use client::{Client, Table, View};
pub use fallback::{with_fallback, Fallback};
pub use select::SelectQuery;
pub use transport::{HttpResponse, ReqwestTransport, Transport, TransportError};
pub use write::WriteQuery;

pub use tabledesk_core::{
    ApiError, AuthMode, CacheConfig, ClientConfig, ErrorContext, FieldError, Record, SnapshotInfo,
    SnapshotStore, SortDirection, UsageError, WriteAction, WriteResult, MAX_PAGE_SIZE,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Local precondition violated; nothing was sent
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Remote or transport failure
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            Self::Usage(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.as_api().is_some_and(ApiError::is_retryable)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
