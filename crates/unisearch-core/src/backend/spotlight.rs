//! macOS Spotlight backend (`mdfind`).
//!
//! `mdfind` has no switches for case, whole-word or regex matching, so those
//! options are ignored. Without `match_path` the search is scoped to file
//! names with `-name`.

use super::{log_ignored_flags, SearchBackend, SupportedFlags};
use crate::cancel::SearchContext;
use crate::error::{Result, SearchError};
use crate::platform::{CommandRunner, SystemRunner};
use crate::query::SearchQuery;
use std::sync::Arc;

const MDFIND: &str = "mdfind";

pub struct SpotlightSearch {
    runner: Arc<dyn CommandRunner>,
}

impl SpotlightSearch {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn build_args(query: &SearchQuery) -> Vec<String> {
        if query.match_path() {
            vec![query.term().to_string()]
        } else {
            vec!["-name".to_string(), query.term().to_string()]
        }
    }
}

impl Default for SpotlightSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchBackend for SpotlightSearch {
    fn name(&self) -> &'static str {
        MDFIND
    }

    fn supported_flags(&self) -> SupportedFlags {
        SupportedFlags {
            match_path: true,
            ..Default::default()
        }
    }

    fn search(&self, query: &SearchQuery, ctx: &SearchContext) -> Result<Vec<String>> {
        log_ignored_flags(self, query);

        let output = self
            .runner
            .run(MDFIND, &Self::build_args(query), ctx)
            .map_err(|e| {
                if e.is_not_found() {
                    SearchError::BackendUnavailable {
                        backend: MDFIND,
                        remediation: "mdfind was not found. Spotlight search requires macOS with \
                                      Spotlight indexing enabled."
                            .to_string(),
                    }
                } else {
                    e
                }
            })?;

        if !output.success {
            return Err(SearchError::execution(MDFIND, output.stderr.trim()));
        }

        Ok(output.lines(query.max_results()))
    }
}
