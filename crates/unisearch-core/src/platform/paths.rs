//! Platform-specific path utilities.
//!
//! PATH lookups for command-line search tools and the default location of the
//! Everything SDK library.

use crate::config::EngineConfig;
use std::path::PathBuf;

/// Check if a command exists in the system PATH.
///
/// # Platform Behavior
/// - **Linux/macOS**: Uses `which` command
/// - **Windows**: Uses `where` command
pub fn command_exists(cmd: &str) -> bool {
    #[cfg(unix)]
    {
        std::process::Command::new("which")
            .arg(cmd)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[cfg(windows)]
    {
        std::process::Command::new("where")
            .arg(cmd)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = cmd;
        false
    }
}

/// Default places to look for the Everything SDK library, in order.
///
/// Relative to the running executable's directory:
/// `Everything-SDK/dll/<lib>`, then `<lib>` beside the executable.
pub fn bundled_library_candidates() -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));

    match exe_dir {
        Some(dir) => vec![
            dir.join(EngineConfig::SDK_DIR_NAME)
                .join("dll")
                .join(EngineConfig::LIBRARY_FILE_NAME),
            dir.join(EngineConfig::LIBRARY_FILE_NAME),
        ],
        None => vec![PathBuf::from(EngineConfig::LIBRARY_FILE_NAME)],
    }
}

/// Resolve the Everything SDK library path.
///
/// `EVERYTHING_SDK_PATH` wins when set and non-empty. Otherwise the first
/// existing bundled candidate is used, falling back to the bare file name so
/// the system loader search order applies.
pub fn engine_library_path() -> PathBuf {
    if let Some(path) = std::env::var_os(EngineConfig::LIBRARY_PATH_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    bundled_library_candidates()
        .into_iter()
        .find(|p| p.exists())
        .unwrap_or_else(|| PathBuf::from(EngineConfig::LIBRARY_FILE_NAME))
}
