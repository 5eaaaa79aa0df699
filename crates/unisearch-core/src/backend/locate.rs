//! Linux backend over the `locate` family.
//!
//! `plocate` is preferred when installed, with mlocate's `locate` as the
//! fallback. Tool availability is probed on every search so that installing
//! either package takes effect without a restart.

use super::{log_ignored_flags, SearchBackend, SupportedFlags};
use crate::cancel::SearchContext;
use crate::config::LocateConfig;
use crate::error::{Result, SearchError};
use crate::platform::{CommandRunner, ProcessOutput, SystemRunner};
use crate::query::SearchQuery;
use std::sync::Arc;
use tracing::debug;

/// Installed locate implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateTool {
    Plocate,
    Mlocate,
}

impl LocateTool {
    /// Executable name on PATH.
    pub fn program(&self) -> &'static str {
        match self {
            LocateTool::Plocate => "plocate",
            LocateTool::Mlocate => "locate",
        }
    }

    /// Package name used in diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            LocateTool::Plocate => "plocate",
            LocateTool::Mlocate => "mlocate",
        }
    }

    fn regex_flag(&self) -> &'static str {
        match self {
            LocateTool::Plocate => "-r",
            LocateTool::Mlocate => "--regex",
        }
    }
}

pub struct LocateSearch {
    runner: Arc<dyn CommandRunner>,
}

impl LocateSearch {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemRunner))
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Find the installed tool, preferring plocate.
    pub fn detect_tool(&self) -> Result<LocateTool> {
        for tool in [LocateTool::Plocate, LocateTool::Mlocate] {
            if self.runner.command_exists(tool.program()) {
                return Ok(tool);
            }
        }
        Err(SearchError::BackendUnavailable {
            backend: "locate",
            remediation: format!(
                "Neither 'locate' nor 'plocate' is installed. Please install one:\n{}\n\n{}",
                LocateConfig::INSTALL_HINT,
                LocateConfig::UPDATEDB_HINT
            ),
        })
    }

    /// Arguments for `tool`: case-insensitive unless `match_case`, regex
    /// mode on `match_regex`, then the term after an option terminator.
    pub fn build_args(tool: LocateTool, query: &SearchQuery) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if !query.match_case() {
            args.push("-i".to_string());
        }
        if query.match_regex() {
            args.push(tool.regex_flag().to_string());
        }
        args.push("--".to_string());
        args.push(query.term().to_string());
        args
    }

    fn interpret(tool: LocateTool, output: ProcessOutput, limit: usize) -> Result<Vec<String>> {
        if output.success {
            return Ok(output.lines(limit));
        }

        let stderr = output.stderr.trim();
        let lowered = stderr.to_lowercase();
        if lowered.contains("no such file or directory") || lowered.contains("database") {
            return Err(SearchError::IndexNotReady {
                tool: tool.label().to_string(),
            });
        }

        // locate exits 1 with empty stderr when nothing matched.
        if stderr.is_empty() && output.code == Some(1) {
            return Ok(Vec::new());
        }

        Err(SearchError::execution(tool.program(), stderr))
    }
}

impl Default for LocateSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchBackend for LocateSearch {
    fn name(&self) -> &'static str {
        "locate"
    }

    fn supported_flags(&self) -> SupportedFlags {
        SupportedFlags {
            match_case: true,
            match_regex: true,
            ..Default::default()
        }
    }

    fn search(&self, query: &SearchQuery, ctx: &SearchContext) -> Result<Vec<String>> {
        let tool = self.detect_tool()?;
        debug!("Using {} for locate search", tool.label());
        log_ignored_flags(self, query);

        let args = Self::build_args(tool, query);
        let output = self.runner.run(tool.program(), &args, ctx).map_err(|e| {
            if e.is_not_found() {
                SearchError::BackendUnavailable {
                    backend: "locate",
                    remediation: format!(
                        "The {} command disappeared. Please reinstall:\n{}",
                        tool.program(),
                        LocateConfig::INSTALL_HINT
                    ),
                }
            } else {
                e
            }
        })?;

        Self::interpret(tool, output, query.max_results())
    }
}
