//! Builder for configuring SearchService initialization.

use super::{SearchService, ServiceOptions};
use crate::backend::{Backend, SearchBackend};
use crate::config::SensitivePatterns;
use crate::error::{Result, SearchError};
use crate::platform;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Builder for configuring SearchService initialization.
///
/// # Example
///
/// ```rust,ignore
/// use unisearch_core::SearchService;
///
/// let service = SearchService::builder()
///     .sensitive_config("/etc/unisearch/patterns.json")
///     .timeout(std::time::Duration::from_secs(10))
///     .build()?;
/// ```
pub struct SearchServiceBuilder {
    platform: Option<String>,
    backend: Option<Box<dyn SearchBackend>>,
    patterns: Option<SensitivePatterns>,
    patterns_file: Option<PathBuf>,
    options: ServiceOptions,
}

impl SearchServiceBuilder {
    pub fn new() -> Self {
        Self {
            platform: None,
            backend: None,
            patterns: None,
            patterns_file: None,
            options: ServiceOptions::default(),
        }
    }

    /// Select the backend for this platform name instead of the running OS.
    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Use this backend instead of detecting one.
    pub fn backend(mut self, backend: Box<dyn SearchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use an in-memory pattern set.
    ///
    /// Takes precedence over [`sensitive_config`](Self::sensitive_config).
    pub fn patterns(mut self, patterns: SensitivePatterns) -> Self {
        self.patterns = Some(patterns);
        self
    }

    /// Load the pattern set from a JSON file at build time.
    pub fn sensitive_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.patterns_file = Some(path.into());
        self
    }

    /// Budget for a single backend invocation.
    ///
    /// Default: 30 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Sensitive results redacted per request before redaction stops.
    ///
    /// Default: 10
    pub fn max_filtered(mut self, max_filtered: usize) -> Self {
        self.options.max_filtered = max_filtered;
        self
    }

    /// Build the SearchService instance.
    pub fn build(self) -> Result<SearchService> {
        if self.options.timeout.is_zero() {
            return Err(SearchError::Config {
                message: "timeout must be greater than zero".to_string(),
            });
        }

        let patterns = match (self.patterns, self.patterns_file) {
            (Some(patterns), _) => patterns,
            (None, Some(path)) => {
                info!("Loading sensitive patterns from {}", path.display());
                SensitivePatterns::from_file(&path)?
            }
            (None, None) => SensitivePatterns::default(),
        };

        let platform = self
            .platform
            .unwrap_or_else(|| platform::current_platform().to_string());

        let backend = match self.backend {
            Some(backend) => Some(backend),
            None => match Backend::for_platform(&platform) {
                Ok(backend) => Some(Box::new(backend) as Box<dyn SearchBackend>),
                Err(e) => {
                    warn!("{}; searches will fail", e);
                    None
                }
            },
        };

        Ok(SearchService::assemble(
            platform,
            backend,
            Arc::new(patterns),
            self.options,
        ))
    }
}

impl Default for SearchServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
