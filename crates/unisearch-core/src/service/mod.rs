//! The search pipeline.
//!
//! [`SearchService`] owns the shared pattern set, the security gate, the
//! selected backend and the result filter, and runs every request through
//! them in that order.

mod builder;

pub use builder::SearchServiceBuilder;

use crate::backend::{SearchBackend, SupportedFlags};
use crate::cancel::{CancellationToken, SearchContext};
use crate::config::{SearchConfig, SensitivePatterns};
use crate::error::{Result, SearchError};
use crate::query::{SearchQuery, SearchRequest};
use crate::result::{self, SearchResult};
use crate::security::{SecurityGate, SensitiveResultFilter};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Tunables for a [`SearchService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Budget for a single backend invocation.
    pub timeout: Duration,
    /// Sensitive results redacted per request before redaction stops.
    pub max_filtered: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            timeout: SearchConfig::BACKEND_TIMEOUT,
            max_filtered: SearchConfig::DEFAULT_MAX_FILTERED,
        }
    }
}

/// Unified file search over the platform's native facility.
///
/// The backend is chosen once, when the service is built. On a platform with
/// no backend the service still builds and every search fails with
/// [`SearchError::UnsupportedPlatform`].
///
/// # Example
///
/// ```rust,ignore
/// use unisearch_core::{CancellationToken, SearchRequest, SearchService};
///
/// let service = SearchService::builder().max_filtered(5).build()?;
/// let results = service.search(&SearchRequest::new("*.pdf", 20), &CancellationToken::new())?;
/// for result in &results {
///     println!("{}", result.path);
/// }
/// ```
pub struct SearchService {
    platform: String,
    backend: Option<Box<dyn SearchBackend>>,
    patterns: Arc<SensitivePatterns>,
    gate: SecurityGate,
    filter: SensitiveResultFilter,
    options: ServiceOptions,
}

impl SearchService {
    /// Create a builder for SearchService.
    pub fn builder() -> SearchServiceBuilder {
        SearchServiceBuilder::new()
    }

    /// Service for the running OS with default patterns and options.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Service over an explicit backend, bypassing platform detection.
    pub fn with_backend(backend: Box<dyn SearchBackend>) -> Self {
        Self::assemble(
            crate::platform::current_platform().to_string(),
            Some(backend),
            Arc::new(SensitivePatterns::default()),
            ServiceOptions::default(),
        )
    }

    pub(crate) fn assemble(
        platform: String,
        backend: Option<Box<dyn SearchBackend>>,
        patterns: Arc<SensitivePatterns>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            platform,
            backend,
            gate: SecurityGate::new(Arc::clone(&patterns)),
            filter: SensitiveResultFilter::new(Arc::clone(&patterns))
                .with_max_filtered(options.max_filtered),
            patterns,
            options,
        }
    }

    /// Platform name the service was built for.
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Name of the selected backend, if any.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }

    /// Options the selected backend honors.
    pub fn supported_flags(&self) -> Option<SupportedFlags> {
        self.backend.as_ref().map(|b| b.supported_flags())
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn patterns(&self) -> &Arc<SensitivePatterns> {
        &self.patterns
    }

    fn backend(&self) -> Result<&dyn SearchBackend> {
        self.backend
            .as_deref()
            .ok_or_else(|| SearchError::UnsupportedPlatform {
                platform: self.platform.clone(),
            })
    }

    /// Run a request through gate, backend, normalizer and filter.
    pub fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        self.gate.validate(&request.query).map_err(|rejected| {
            debug!("Rejected query: {}", rejected.reason());
            SearchError::from(rejected)
        })?;

        let query = SearchQuery::new(&request.query, request.max_results, request.options)?;
        let backend = self.backend()?;
        cancel.check()?;

        let started = Instant::now();
        let ctx = SearchContext::new(self.options.timeout, cancel.clone());
        let mut paths = backend.search(&query, &ctx)?;
        paths.truncate(query.max_results());

        let results: Vec<SearchResult> = paths.iter().map(|p| result::normalize(p)).collect();
        let found = results.len();
        let results = self.filter.filter(results);

        debug!(
            "{} returned {} paths, {} after redaction, in {:?}",
            backend.name(),
            found,
            results.len(),
            started.elapsed()
        );
        Ok(results)
    }

    /// Run a tool call and render the outcome as response text.
    ///
    /// Failures of any kind, including malformed arguments, become a single
    /// `Search failed: <message>` text.
    pub fn search_text(&self, arguments: &Value, cancel: &CancellationToken) -> String {
        let outcome = SearchRequest::from_arguments(arguments)
            .and_then(|request| self.search(&request, cancel));

        match outcome {
            Ok(results) => result::format_results(&results),
            Err(e) => {
                match e.kind() {
                    crate::error::ErrorKind::Validation => debug!("Search refused: {}", e),
                    _ => warn!("Search failed: {}", e),
                }
                format!("Search failed: {}", e)
            }
        }
    }
}
