//! TableDesk Core Library
//!
//! I/O-free building blocks for the TableDesk REST client:
//! - Client configuration
//! - Record and write-result models
//! - Query intent and request assembly
//! - Typed error taxonomy and the HTTP error classifier
//! - Write response mapping
//! - Disk snapshot store used by the cache fallback

pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod request;
pub mod snapshot;
pub mod write;

// Re-export commonly used types
pub use classify::{classify, parse_retry_after, ResponseBody};
pub use config::{AuthMode, CacheConfig, ClientConfig};
pub use error::{ApiError, ErrorContext, UsageError};
pub use models::*;
pub use query::{QueryIntent, Sort, SortDirection, MAX_PAGE_SIZE};
pub use request::{HttpRequest, Method, Operation, Target};
pub use snapshot::{SnapshotError, SnapshotInfo, SnapshotStore};
pub use write::map_write_results;
