//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live here rather than in the
//! backends.
//!
//! # Architecture
//!
//! - `paths` - PATH lookups and the native engine library location
//! - `process` - Running search tools as child processes with a deadline
//!
//! # Supported Platforms
//!
//! - **macOS**: Spotlight (`mdfind`)
//! - **Linux**: `plocate` / `locate`
//! - **Windows**: Everything SDK

pub mod paths;
pub mod process;

pub use paths::{command_exists, engine_library_path};
pub use process::{CommandRunner, ProcessOutput, SystemRunner};

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "windows")]
    {
        "windows"
    }
    #[cfg(target_os = "macos")]
    {
        "macos"
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        std::env::consts::OS
    }
}
