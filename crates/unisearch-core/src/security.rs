//! Query gate and result redaction.
//!
//! Both halves read the same [`SensitivePatterns`] through a shared `Arc`;
//! neither can modify it.

use crate::config::{SearchConfig, SensitivePatterns};
use crate::error::RejectedQuery;
use crate::result::SearchResult;
use std::sync::Arc;
use tracing::debug;

/// Validates raw query text before any backend or filesystem access.
#[derive(Debug, Clone)]
pub struct SecurityGate {
    patterns: Arc<SensitivePatterns>,
}

impl SecurityGate {
    pub fn new(patterns: Arc<SensitivePatterns>) -> Self {
        Self { patterns }
    }

    /// Check a raw query.
    ///
    /// Rejects, in order: empty after trimming, any double quote, any
    /// configured keyword as a case-insensitive substring.
    pub fn validate(&self, term: &str) -> Result<(), RejectedQuery> {
        let term = term.trim();
        if term.is_empty() {
            return Err(RejectedQuery::Empty);
        }
        // Quoting syntax differs between mdfind, locate and Everything.
        if term.contains('"') {
            return Err(RejectedQuery::Quoted);
        }
        if self.patterns.contains_keyword(term) {
            return Err(RejectedQuery::RestrictedKeyword);
        }
        Ok(())
    }
}

/// Removes sensitive results, up to a fixed number per request.
///
/// Once `max_filtered` sensitive results have been dropped, further sensitive
/// results are passed through unchanged.
#[derive(Debug, Clone)]
pub struct SensitiveResultFilter {
    patterns: Arc<SensitivePatterns>,
    max_filtered: usize,
}

impl SensitiveResultFilter {
    pub fn new(patterns: Arc<SensitivePatterns>) -> Self {
        Self {
            patterns,
            max_filtered: SearchConfig::DEFAULT_MAX_FILTERED,
        }
    }

    /// Override the redaction limit.
    pub fn with_max_filtered(mut self, max_filtered: usize) -> Self {
        self.max_filtered = max_filtered;
        self
    }

    pub fn max_filtered(&self) -> usize {
        self.max_filtered
    }

    /// Apply bounded redaction, preserving order.
    pub fn filter(&self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        let mut kept = Vec::with_capacity(results.len());
        let mut filtered_count = 0usize;

        for result in results {
            if self.patterns.is_sensitive_path(&result.path) {
                filtered_count += 1;
                if filtered_count <= self.max_filtered {
                    debug!("Redacted sensitive result #{}", filtered_count);
                    continue;
                }
            }
            kept.push(result);
        }

        if filtered_count > self.max_filtered {
            debug!(
                "Redaction limit {} reached, {} sensitive results passed through",
                self.max_filtered,
                filtered_count - self.max_filtered
            );
        }

        kept
    }
}
