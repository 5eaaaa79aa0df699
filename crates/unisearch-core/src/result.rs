//! Canonical search results and their text rendering.
//!
//! Backends only produce path strings. [`normalize`] turns each one into a
//! [`SearchResult`], reading filesystem metadata when it can and falling back
//! to a path-only result when it cannot.

use chrono::{DateTime, Local, Timelike};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::time::SystemTime;
use tracing::debug;

/// Platform-independent search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub path: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Local>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accessed: Option<DateTime<Local>>,
    /// Backend-specific attribute flags. Not populated by any current backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<String>,
}

impl SearchResult {
    /// Minimal result carrying only what the path string itself gives.
    pub fn from_path(path: &str) -> Self {
        let filename = last_segment(path).to_string();
        let extension = extension_of(&filename);
        Self {
            path: path.to_string(),
            filename,
            extension,
            size: None,
            created: None,
            modified: None,
            accessed: None,
            attributes: None,
        }
    }
}

/// Build a result for a raw backend path. Never fails.
///
/// A failed metadata lookup degrades to [`SearchResult::from_path`]; each
/// timestamp the platform cannot report is left empty on its own.
pub fn normalize(path: &str) -> SearchResult {
    let mut result = SearchResult::from_path(path);

    match fs::metadata(path) {
        Ok(meta) => {
            result.size = Some(meta.len());
            result.created = created_time(&meta).map(to_local);
            result.modified = meta.modified().ok().map(to_local);
            result.accessed = meta.accessed().ok().map(to_local);
        }
        Err(e) => {
            debug!("Metadata unavailable for {}: {}", path, e);
        }
    }

    result
}

/// Birth time where the filesystem records one. On unix the inode change
/// time stands in when it does not.
fn created_time(meta: &fs::Metadata) -> Option<SystemTime> {
    if let Ok(created) = meta.created() {
        return Some(created);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        use std::time::{Duration, UNIX_EPOCH};

        let secs = u64::try_from(meta.ctime()).ok()?;
        let nanos = u32::try_from(meta.ctime_nsec()).unwrap_or(0);
        Some(UNIX_EPOCH + Duration::new(secs, nanos))
    }

    #[cfg(not(unix))]
    {
        None
    }
}

fn to_local(time: SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}

/// Last path segment, accepting both `/` and `\` and ignoring trailing
/// separators.
pub fn last_segment(path: &str) -> &str {
    let trimmed = path.trim_end_matches(['/', '\\']);
    match trimmed.rfind(['/', '\\']) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Lower-cased suffix after the last `.`; none for dotfiles and bare names.
fn extension_of(filename: &str) -> Option<String> {
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => {
            Some(filename[idx + 1..].to_lowercase())
        }
        _ => None,
    }
}

/// `1234567` -> `1,234,567`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_timestamp(ts: Option<&DateTime<Local>>) -> String {
    match ts {
        Some(ts) if ts.nanosecond() / 1_000 == 0 => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        None => "N/A".to_string(),
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Path: {}", self.path)?;
        match &self.extension {
            Some(ext) => writeln!(f, "Filename: {} ({})", self.filename, ext)?,
            None => writeln!(f, "Filename: {}", self.filename)?,
        }
        match self.size {
            Some(size) => writeln!(f, "Size: {} bytes", group_thousands(size))?,
            None => writeln!(f, "Size: N/A")?,
        }
        writeln!(f, "Created: {}", format_timestamp(self.created.as_ref()))?;
        writeln!(f, "Modified: {}", format_timestamp(self.modified.as_ref()))?;
        writeln!(f, "Accessed: {}", format_timestamp(self.accessed.as_ref()))
    }
}

/// Render results as text blocks separated by blank lines.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("/home/user/notes.txt"), "notes.txt");
        assert_eq!(last_segment("C:\\Users\\user\\Report.PDF"), "Report.PDF");
        assert_eq!(last_segment("/var/tmp/dir/"), "dir");
        assert_eq!(last_segment("plain"), "plain");
        assert_eq!(last_segment("mixed/dir\\file.rs"), "file.rs");
    }

    #[test]
    fn test_extension_rules() {
        assert_eq!(extension_of("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(extension_of("Makefile"), None);
        assert_eq!(extension_of("trailing."), None);
    }

    #[test]
    fn test_normalize_existing_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("data.CSV");
        std::fs::write(&file, vec![b'x'; 1234]).unwrap();

        let result = normalize(file.to_str().unwrap());
        assert_eq!(result.filename, "data.CSV");
        assert_eq!(result.extension.as_deref(), Some("csv"));
        assert_eq!(result.size, Some(1234));
        #[cfg(unix)]
        assert!(result.created.is_some());
        assert!(result.modified.is_some());
        assert!(result.accessed.is_some());
        assert!(result.attributes.is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_created_falls_back_without_birth_time() {
        // procfs reports no birth time.
        let result = normalize("/proc/self/status");
        assert!(result.size.is_some());
        assert!(result.created.is_some());
        assert!(result.modified.is_some());
    }

    #[test]
    fn test_normalize_missing_file_degrades() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone").join("vanished.log");
        let path = missing.to_str().unwrap();

        let result = normalize(path);
        assert_eq!(result.path, path);
        assert_eq!(result.filename, "vanished.log");
        assert_eq!(result.extension.as_deref(), Some("log"));
        assert_eq!(result.size, None);
        assert_eq!(result.created, None);
        assert_eq!(result.modified, None);
        assert_eq!(result.accessed, None);
    }

    #[test]
    fn test_normalize_malformed_path() {
        let result = normalize("D:\\nowhere\\x\0y.txt");
        assert_eq!(result.filename, "x\0y.txt");
        assert!(result.size.is_none());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_display_full_result() {
        let ts = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let result = SearchResult {
            path: "/srv/data/report.pdf".into(),
            filename: "report.pdf".into(),
            extension: Some("pdf".into()),
            size: Some(20480),
            created: Some(ts),
            modified: Some(ts),
            accessed: None,
            attributes: None,
        };

        assert_eq!(
            result.to_string(),
            "Path: /srv/data/report.pdf\n\
             Filename: report.pdf (pdf)\n\
             Size: 20,480 bytes\n\
             Created: 2024-03-05 14:07:09\n\
             Modified: 2024-03-05 14:07:09\n\
             Accessed: N/A\n"
        );
    }

    #[test]
    fn test_display_degraded_result() {
        let text = SearchResult::from_path("/x/README").to_string();
        assert_eq!(
            text,
            "Path: /x/README\nFilename: README\nSize: N/A\nCreated: N/A\nModified: N/A\nAccessed: N/A\n"
        );
    }

    #[test]
    fn test_format_results_separates_blocks() {
        let text = format_results(&[SearchResult::from_path("/a"), SearchResult::from_path("/b")]);
        assert!(text.contains("Accessed: N/A\n\nPath: /b\n"));
        assert_eq!(format_results(&[]), "");
    }
}
