//! Query model and request parsing.
//!
//! A [`SearchRequest`] is the wire shape received from the host (`base` plus
//! optional `windows_params`). Once the security gate has admitted its term it
//! becomes an immutable [`SearchQuery`] that backends consume.

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Matching flags and sort order.
///
/// Only the Everything engine honors the full set; other backends translate
/// the subset they support and ignore the rest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub match_case: bool,
    pub match_path: bool,
    pub match_regex: bool,
    pub match_whole_word: bool,
    /// Engine-defined sort code; validated by the backend that uses it.
    pub sort_by: Option<u32>,
}

/// Validated, immutable search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    term: String,
    max_results: usize,
    options: MatchOptions,
}

impl SearchQuery {
    /// Create a query, trimming the term and checking the result cap.
    pub fn new(term: &str, max_results: usize, options: MatchOptions) -> Result<Self> {
        let term = term.trim();
        if term.is_empty() {
            return Err(SearchError::invalid_params("query must not be empty"));
        }
        if !(SearchConfig::MIN_MAX_RESULTS..=SearchConfig::MAX_MAX_RESULTS).contains(&max_results)
        {
            return Err(SearchError::invalid_params(format!(
                "max_results must be between {} and {}, got {}",
                SearchConfig::MIN_MAX_RESULTS,
                SearchConfig::MAX_MAX_RESULTS,
                max_results
            )));
        }
        Ok(Self {
            term: term.to_string(),
            max_results,
            options,
        })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn match_path(&self) -> bool {
        self.options.match_path
    }

    pub fn match_case(&self) -> bool {
        self.options.match_case
    }

    pub fn match_whole_word(&self) -> bool {
        self.options.match_whole_word
    }

    pub fn match_regex(&self) -> bool {
        self.options.match_regex
    }

    pub fn sort_by(&self) -> Option<u32> {
        self.options.sort_by
    }
}

#[derive(Debug, Deserialize)]
struct BaseParams {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: i64,
}

fn default_max_results() -> i64 {
    SearchConfig::DEFAULT_MAX_RESULTS as i64
}

/// A search request as received from the transport, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Raw, untrimmed query text.
    pub query: String,
    pub max_results: usize,
    pub options: MatchOptions,
}

impl SearchRequest {
    /// Build a request with default options.
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
            options: MatchOptions::default(),
        }
    }

    /// Attach matching options.
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Parse tool-call arguments.
    ///
    /// `base` must be an object with `query` and an optional `max_results`.
    /// `windows_params` may be an object or a JSON-encoded string; absent or
    /// null means all flags off.
    pub fn from_arguments(arguments: &Value) -> Result<Self> {
        let base = arguments
            .get("base")
            .ok_or_else(|| SearchError::invalid_params("Missing required parameter: base"))?;
        if !base.is_object() {
            return Err(SearchError::invalid_params(
                "'base' parameter must be a dictionary",
            ));
        }
        let base: BaseParams = serde_json::from_value(base.clone())?;

        if base.max_results < SearchConfig::MIN_MAX_RESULTS as i64
            || base.max_results > SearchConfig::MAX_MAX_RESULTS as i64
        {
            return Err(SearchError::invalid_params(format!(
                "max_results must be between {} and {}, got {}",
                SearchConfig::MIN_MAX_RESULTS,
                SearchConfig::MAX_MAX_RESULTS,
                base.max_results
            )));
        }

        let options = match arguments.get("windows_params") {
            None | Some(Value::Null) => MatchOptions::default(),
            Some(Value::String(encoded)) => serde_json::from_str(encoded).map_err(|_| {
                SearchError::invalid_params("Invalid JSON in 'windows_params'")
            })?,
            Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())?,
            Some(_) => {
                return Err(SearchError::invalid_params(
                    "'windows_params' must be a string or dictionary",
                ))
            }
        };

        Ok(Self {
            query: base.query,
            max_results: base.max_results as usize,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_trims_term() {
        let query = SearchQuery::new("  report.pdf \n", 10, MatchOptions::default()).unwrap();
        assert_eq!(query.term(), "report.pdf");
        assert_eq!(query.max_results(), 10);
    }

    #[test]
    fn test_query_rejects_out_of_range_cap() {
        assert!(SearchQuery::new("a", 0, MatchOptions::default()).is_err());
        assert!(SearchQuery::new("a", 1001, MatchOptions::default()).is_err());
        assert!(SearchQuery::new("a", 1000, MatchOptions::default()).is_ok());
    }

    #[test]
    fn test_arguments_defaults() {
        let request = SearchRequest::from_arguments(&json!({"base": {"query": "notes"}})).unwrap();
        assert_eq!(request.query, "notes");
        assert_eq!(request.max_results, 100);
        assert_eq!(request.options, MatchOptions::default());
    }

    #[test]
    fn test_arguments_inline_windows_params() {
        let request = SearchRequest::from_arguments(&json!({
            "base": {"query": "*.rs", "max_results": 5},
            "windows_params": {"match_case": true, "match_regex": true, "sort_by": 6}
        }))
        .unwrap();
        assert_eq!(request.max_results, 5);
        assert!(request.options.match_case);
        assert!(request.options.match_regex);
        assert!(!request.options.match_path);
        assert_eq!(request.options.sort_by, Some(6));
    }

    #[test]
    fn test_arguments_string_windows_params() {
        let request = SearchRequest::from_arguments(&json!({
            "base": {"query": "x"},
            "windows_params": "{\"match_path\": true}"
        }))
        .unwrap();
        assert!(request.options.match_path);
        assert_eq!(request.options.sort_by, None);
    }

    #[test]
    fn test_arguments_bad_windows_params() {
        let err = SearchRequest::from_arguments(&json!({
            "base": {"query": "x"},
            "windows_params": "{not json"
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid parameters: Invalid JSON in 'windows_params'"
        );

        let err = SearchRequest::from_arguments(&json!({
            "base": {"query": "x"},
            "windows_params": 7
        }))
        .unwrap_err();
        assert!(err.to_string().contains("must be a string or dictionary"));
    }

    #[test]
    fn test_arguments_base_shape() {
        assert!(SearchRequest::from_arguments(&json!({})).is_err());
        assert!(SearchRequest::from_arguments(&json!({"base": "x"})).is_err());
        assert!(SearchRequest::from_arguments(&json!({"base": {"max_results": 3}})).is_err());
        assert!(
            SearchRequest::from_arguments(&json!({"base": {"query": "a", "max_results": 0}}))
                .is_err()
        );
        assert!(
            SearchRequest::from_arguments(&json!({"base": {"query": "a", "max_results": 5000}}))
                .is_err()
        );
    }
}
