//! Unisearch Core - Headless cross-platform file search.
//!
//! One query shape and one result shape over three native facilities:
//! Spotlight (`mdfind`) on macOS, `plocate`/`locate` on Linux and the
//! Everything SDK on Windows. Queries pass a security gate before any
//! backend runs, and results pass a bounded sensitive-path filter before
//! they are returned. It can be used programmatically without any HTTP/RPC
//! layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use unisearch_core::{CancellationToken, SearchRequest, SearchService};
//!
//! fn main() -> unisearch_core::Result<()> {
//!     let service = SearchService::new()?;
//!
//!     let request = SearchRequest::new("quarterly report", 25);
//!     let results = service.search(&request, &CancellationToken::new())?;
//!     println!("Found {} files", results.len());
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cancel;
pub mod config;
pub mod error;
pub mod platform;
pub mod query;
pub mod result;
pub mod security;

mod service;

// Re-export commonly used types
pub use backend::{Backend, SearchBackend, SupportedFlags};
pub use cancel::{CancellationToken, CancelledError, SearchContext};
pub use config::{SearchConfig, SensitivePatterns};
pub use error::{ErrorKind, RejectedQuery, Result, SearchError};
pub use query::{MatchOptions, SearchQuery, SearchRequest};
pub use result::{format_results, SearchResult};
pub use security::{SecurityGate, SensitiveResultFilter};
pub use service::{SearchService, SearchServiceBuilder, ServiceOptions};
