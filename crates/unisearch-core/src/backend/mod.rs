//! Search backends and the platform dispatcher.
//!
//! Each supported OS maps to exactly one adapter:
//!
//! | Platform | Adapter | Native facility |
//! |----------|---------|-----------------|
//! | macOS    | [`SpotlightSearch`]  | `mdfind` |
//! | Linux    | [`LocateSearch`]     | `plocate`, falling back to `locate` |
//! | Windows  | [`EverythingSearch`] | Everything SDK library |
//!
//! The mapping is evaluated once, when [`Backend::detect`] runs at startup.
//! Everything downstream talks to the [`SearchBackend`] trait.

mod everything;
mod locate;
mod spotlight;

pub use everything::{normalize_engine_term, EverythingSearch, EverythingSort};
pub use locate::{LocateSearch, LocateTool};
pub use spotlight::SpotlightSearch;

use crate::cancel::SearchContext;
use crate::error::{Result, SearchError};
use crate::platform;
use crate::query::SearchQuery;
use serde::Serialize;
use tracing::{debug, info};

/// Which query options a backend translates natively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SupportedFlags {
    pub match_path: bool,
    pub match_case: bool,
    pub match_whole_word: bool,
    pub match_regex: bool,
    pub sort_by: bool,
}

impl SupportedFlags {
    /// Names of options set on `query` that this backend will ignore.
    pub fn ignored(&self, query: &SearchQuery) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if query.match_path() && !self.match_path {
            ignored.push("match_path");
        }
        if query.match_case() && !self.match_case {
            ignored.push("match_case");
        }
        if query.match_whole_word() && !self.match_whole_word {
            ignored.push("match_whole_word");
        }
        if query.match_regex() && !self.match_regex {
            ignored.push("match_regex");
        }
        if query.sort_by().is_some() && !self.sort_by {
            ignored.push("sort_by");
        }
        ignored
    }
}

/// A native file-search facility.
pub trait SearchBackend: Send + Sync {
    /// Short name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Options this backend honors.
    fn supported_flags(&self) -> SupportedFlags;

    /// Run the query and return at most `query.max_results()` raw paths.
    fn search(&self, query: &SearchQuery, ctx: &SearchContext) -> Result<Vec<String>>;
}

/// The closed set of backends.
pub enum Backend {
    Spotlight(SpotlightSearch),
    Locate(LocateSearch),
    Everything(EverythingSearch),
}

impl Backend {
    /// Select the backend for the running OS.
    pub fn detect() -> Result<Self> {
        Self::for_platform(platform::current_platform())
    }

    /// Select the backend for a platform name as reported by
    /// [`platform::current_platform`].
    pub fn for_platform(platform: &str) -> Result<Self> {
        let backend = match platform {
            "macos" => Backend::Spotlight(SpotlightSearch::new()),
            "linux" => Backend::Locate(LocateSearch::new()),
            "windows" => Backend::Everything(EverythingSearch::new()),
            other => {
                return Err(SearchError::UnsupportedPlatform {
                    platform: other.to_string(),
                })
            }
        };
        info!("Selected {} search backend for {}", backend.name(), platform);
        Ok(backend)
    }

    fn inner(&self) -> &dyn SearchBackend {
        match self {
            Backend::Spotlight(b) => b,
            Backend::Locate(b) => b,
            Backend::Everything(b) => b,
        }
    }
}

impl SearchBackend for Backend {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn supported_flags(&self) -> SupportedFlags {
        self.inner().supported_flags()
    }

    fn search(&self, query: &SearchQuery, ctx: &SearchContext) -> Result<Vec<String>> {
        self.inner().search(query, ctx)
    }
}

/// Log options the backend is about to ignore.
pub(crate) fn log_ignored_flags(backend: &dyn SearchBackend, query: &SearchQuery) {
    let ignored = backend.supported_flags().ignored(query);
    if !ignored.is_empty() {
        debug!("{} ignores requested options: {:?}", backend.name(), ignored);
    }
}
