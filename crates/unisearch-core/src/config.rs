//! Centralized configuration for Unisearch.
//!
//! Constants for request bounds, backend timeouts and the native engine, plus
//! the sensitive-pattern set shared by the security gate and the result filter.

use crate::error::{Result, SearchError};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Request-level configuration.
pub struct SearchConfig;

impl SearchConfig {
    pub const DEFAULT_MAX_RESULTS: usize = 100;
    pub const MIN_MAX_RESULTS: usize = 1;
    pub const MAX_MAX_RESULTS: usize = 1000;
    /// Sensitive results redacted per request before redaction gives up.
    pub const DEFAULT_MAX_FILTERED: usize = 10;
    pub const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Configuration for subprocess-backed adapters.
pub struct ProcessConfig;

impl ProcessConfig {
    pub const POLL_INTERVAL: Duration = Duration::from_millis(20);
}

/// Configuration for the locate adapter.
pub struct LocateConfig;

impl LocateConfig {
    pub const INSTALL_HINT: &'static str = concat!(
        "Ubuntu/Debian: sudo apt-get install plocate\n",
        "              or\n",
        "              sudo apt-get install mlocate\n",
        "Fedora: sudo dnf install mlocate",
    );
    pub const UPDATEDB_HINT: &'static str = concat!(
        "After installation, the database will be updated automatically, or run:\n",
        "For plocate: sudo updatedb\n",
        "For mlocate: sudo /etc/cron.daily/mlocate",
    );
}

/// Configuration for the Everything SDK engine.
pub struct EngineConfig;

impl EngineConfig {
    /// Environment variable overriding the engine library location.
    pub const LIBRARY_PATH_ENV: &'static str = "EVERYTHING_SDK_PATH";
    pub const SDK_DIR_NAME: &'static str = "Everything-SDK";
    #[cfg(target_pointer_width = "64")]
    pub const LIBRARY_FILE_NAME: &'static str = "Everything64.dll";
    #[cfg(not(target_pointer_width = "64"))]
    pub const LIBRARY_FILE_NAME: &'static str = "Everything32.dll";
    /// Wide-char buffer length for full result paths (long path limit).
    pub const PATH_BUFFER_LEN: usize = 32_768;
    pub const DEFAULT_SORT: u32 = 1;
}

const DEFAULT_KEYWORDS: &[&str] = &[
    "password",
    "passwd",
    "pwd",
    "secret",
    "key",
    "token",
    "credential",
    "private",
    "confidential",
    "sensitive",
    "security",
    "auth",
    "login",
];

const DEFAULT_PATH_PATTERNS: &[&str] = &[
    r".*[/\\]system32[/\\].*",
    r".*[/\\]windows[/\\]system.*",
    r".*[/\\]program files[/\\].*",
    r".*[/\\]programdata[/\\].*",
    r".*[/\\]users[/\\][^/\\]+[/\\]appdata[/\\].*",
    r".*[/\\]\.ssh[/\\].*",
    r".*[/\\]\.gnupg[/\\].*",
    r".*[/\\]keychain[/\\].*",
    r".*[/\\]etc[/\\]shadow.*",
    r".*[/\\]etc[/\\]passwd.*",
    r".*[/\\]var[/\\]log[/\\].*",
    r".*[/\\]registry[/\\].*",
    r".*[/\\]sam$",
    r".*[/\\]security$",
    r".*[/\\]software$",
    r".*[/\\]system$",
];

/// On-disk shape of a sensitive-pattern file.
#[derive(Debug, Deserialize)]
struct SensitivePatternsFile {
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    paths: Vec<String>,
}

/// Keywords and path patterns that mark a query or a result as sensitive.
///
/// Built once at startup and shared read-only; there is no way to mutate it
/// after construction.
#[derive(Debug, Clone)]
pub struct SensitivePatterns {
    keywords: Vec<String>,
    paths: Vec<Regex>,
}

impl SensitivePatterns {
    /// Build from keyword and regex lists.
    ///
    /// Keywords are lower-cased. Each path pattern is anchored at the start of
    /// the (lower-cased) path it is tested against.
    pub fn new<K, P>(keywords: K, paths: P) -> Result<Self>
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let paths = paths
            .into_iter()
            .map(|p| {
                let pattern = p.as_ref();
                Regex::new(&format!("^(?:{})", pattern)).map_err(|e| SearchError::Config {
                    message: format!("Invalid sensitive path pattern {:?}: {}", pattern, e),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { keywords, paths })
    }

    /// Load a pattern set from a JSON file with `keywords` and `paths` arrays.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SearchError::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        Self::from_json(&content)
    }

    /// Parse a pattern set from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        let file: SensitivePatternsFile =
            serde_json::from_str(content).map_err(|e| SearchError::Config {
                message: format!("Invalid sensitive pattern file: {}", e),
            })?;
        Self::new(file.keywords, file.paths)
    }

    /// Configured keywords, lower-cased.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True if the lower-cased text contains any keyword.
    pub fn contains_keyword(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// True if the path contains a keyword or matches a path pattern.
    pub fn is_sensitive_path(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        if self.keywords.iter().any(|k| lower.contains(k.as_str())) {
            return true;
        }
        self.paths.iter().any(|re| re.is_match(&lower))
    }
}

impl Default for SensitivePatterns {
    fn default() -> Self {
        // The built-in patterns are literals known to compile.
        let paths = DEFAULT_PATH_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(&format!("^(?:{})", p)).ok())
            .collect();
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            paths,
        }
    }
}
