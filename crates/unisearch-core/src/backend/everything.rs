//! Windows backend over the Everything SDK.
//!
//! The SDK is a dynamic library talking IPC to a running Everything client.
//! It keeps its query state in process-wide globals, so queries are
//! serialized behind [`QUERY_LOCK`]. Each query runs on a helper thread; the
//! calling thread waits with the request deadline and abandons the helper if
//! the deadline passes, since an in-flight SDK call cannot be interrupted.
//! An abandoned helper that is still queued on the lock sees the cancelled
//! token and exits without querying.

#![allow(unsafe_code)]

use super::{SearchBackend, SupportedFlags};
use crate::cancel::SearchContext;
use crate::config::{EngineConfig, ProcessConfig};
use crate::error::{Result, SearchError};
use crate::platform;
use crate::query::SearchQuery;
use libloading::Library;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, info, warn};

const BACKEND: &str = "everything";

/// Serializes access to the SDK's global query state.
static QUERY_LOCK: Mutex<()> = Mutex::new(());

/// Result sort orders understood by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u32)]
pub enum EverythingSort {
    #[default]
    NameAscending = 1,
    NameDescending = 2,
    PathAscending = 3,
    PathDescending = 4,
    SizeAscending = 5,
    SizeDescending = 6,
    ExtensionAscending = 7,
    ExtensionDescending = 8,
    DateCreatedAscending = 11,
    DateCreatedDescending = 12,
    DateModifiedAscending = 13,
    DateModifiedDescending = 14,
}

impl EverythingSort {
    pub const ALL: [EverythingSort; 12] = [
        EverythingSort::NameAscending,
        EverythingSort::NameDescending,
        EverythingSort::PathAscending,
        EverythingSort::PathDescending,
        EverythingSort::SizeAscending,
        EverythingSort::SizeDescending,
        EverythingSort::ExtensionAscending,
        EverythingSort::ExtensionDescending,
        EverythingSort::DateCreatedAscending,
        EverythingSort::DateCreatedDescending,
        EverythingSort::DateModifiedAscending,
        EverythingSort::DateModifiedDescending,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn description(self) -> &'static str {
        match self {
            EverythingSort::NameAscending => "Sort by filename (A to Z)",
            EverythingSort::NameDescending => "Sort by filename (Z to A)",
            EverythingSort::PathAscending => "Sort by path (A to Z)",
            EverythingSort::PathDescending => "Sort by path (Z to A)",
            EverythingSort::SizeAscending => "Sort by size (smallest first)",
            EverythingSort::SizeDescending => "Sort by size (largest first)",
            EverythingSort::ExtensionAscending => "Sort by extension (A to Z)",
            EverythingSort::ExtensionDescending => "Sort by extension (Z to A)",
            EverythingSort::DateCreatedAscending => "Sort by creation date (oldest first)",
            EverythingSort::DateCreatedDescending => "Sort by creation date (newest first)",
            EverythingSort::DateModifiedAscending => "Sort by modification date (oldest first)",
            EverythingSort::DateModifiedDescending => "Sort by modification date (newest first)",
        }
    }
}

/// Canonicalize a term for the engine: collapse doubled backslashes, then
/// turn forward slashes into backslashes.
pub fn normalize_engine_term(term: &str) -> String {
    term.replace("\\\\", "\\").replace('/', "\\")
}

fn describe_sdk_error(code: u32) -> String {
    match code {
        0 => "no error reported".to_string(),
        1 => "out of memory".to_string(),
        2 => "Everything search client is not running".to_string(),
        3 => "unable to register window class".to_string(),
        4 => "unable to create listening window".to_string(),
        5 => "unable to create listening thread".to_string(),
        6 => "invalid result index".to_string(),
        7 => "invalid call".to_string(),
        other => format!("unknown SDK error code {}", other),
    }
}

type SetStringFn = unsafe extern "system" fn(*const u16);
type SetBoolFn = unsafe extern "system" fn(i32);
type SetDwordFn = unsafe extern "system" fn(u32);
type QueryFn = unsafe extern "system" fn(i32) -> i32;
type GetDwordFn = unsafe extern "system" fn() -> u32;
type GetPathFn = unsafe extern "system" fn(u32, *mut u16, u32) -> u32;

/// Resolved SDK entry points. The library handle is held for as long as any
/// of the pointers may be called.
struct EngineApi {
    set_search: SetStringFn,
    set_match_path: SetBoolFn,
    set_match_case: SetBoolFn,
    set_match_whole_word: SetBoolFn,
    set_regex: SetBoolFn,
    set_max: SetDwordFn,
    set_sort: SetDwordFn,
    query: QueryFn,
    get_num_results: GetDwordFn,
    get_full_path: GetPathFn,
    get_last_error: GetDwordFn,
    _library: Library,
}

/// Native parameters for one query.
struct EngineQuery {
    term: Vec<u16>,
    match_path: bool,
    match_case: bool,
    match_whole_word: bool,
    match_regex: bool,
    max: u32,
    sort: EverythingSort,
}

impl EngineApi {
    fn load(path: &Path) -> std::result::Result<Self, libloading::Error> {
        // SAFETY: loading runs the library's initializers. The path names the
        // Everything SDK, whose DllMain performs no unsound work.
        let library = unsafe { Library::new(path)? };

        // SAFETY: each symbol is resolved with the signature documented by
        // the Everything SDK header. The copied function pointers stay valid
        // because `library` is stored alongside them.
        let api = unsafe {
            let set_search = *library.get::<SetStringFn>(b"Everything_SetSearchW\0")?;
            let set_match_path = *library.get::<SetBoolFn>(b"Everything_SetMatchPath\0")?;
            let set_match_case = *library.get::<SetBoolFn>(b"Everything_SetMatchCase\0")?;
            let set_match_whole_word =
                *library.get::<SetBoolFn>(b"Everything_SetMatchWholeWord\0")?;
            let set_regex = *library.get::<SetBoolFn>(b"Everything_SetRegex\0")?;
            let set_max = *library.get::<SetDwordFn>(b"Everything_SetMax\0")?;
            let set_sort = *library.get::<SetDwordFn>(b"Everything_SetSort\0")?;
            let query = *library.get::<QueryFn>(b"Everything_QueryW\0")?;
            let get_num_results = *library.get::<GetDwordFn>(b"Everything_GetNumResults\0")?;
            let get_full_path =
                *library.get::<GetPathFn>(b"Everything_GetResultFullPathNameW\0")?;
            let get_last_error = *library.get::<GetDwordFn>(b"Everything_GetLastError\0")?;
            Self {
                set_search,
                set_match_path,
                set_match_case,
                set_match_whole_word,
                set_regex,
                set_max,
                set_sort,
                query,
                get_num_results,
                get_full_path,
                get_last_error,
                _library: library,
            }
        };
        Ok(api)
    }

    /// Run one blocking query. Callers must hold [`QUERY_LOCK`].
    fn run(&self, q: &EngineQuery) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        let mut buf = vec![0u16; EngineConfig::PATH_BUFFER_LEN];

        // SAFETY: `q.term` is NUL-terminated UTF-16 and outlives the call;
        // the SDK copies it. `buf` is writable for `buf.len()` u16s, which is
        // the capacity passed to GetResultFullPathNameW. The global state the
        // setters touch is guarded by QUERY_LOCK, held by our caller.
        unsafe {
            (self.set_search)(q.term.as_ptr());
            (self.set_match_path)(q.match_path as i32);
            (self.set_match_case)(q.match_case as i32);
            (self.set_match_whole_word)(q.match_whole_word as i32);
            (self.set_regex)(q.match_regex as i32);
            (self.set_max)(q.max);
            (self.set_sort)(q.sort.code());

            if (self.query)(1) == 0 {
                let code = (self.get_last_error)();
                return Err(SearchError::execution(
                    "Everything",
                    format!("query failed ({})", describe_sdk_error(code)),
                ));
            }

            let count = (self.get_num_results)().min(q.max);
            for index in 0..count {
                let len = (self.get_full_path)(index, buf.as_mut_ptr(), buf.len() as u32);
                if len == 0 {
                    continue;
                }
                let len = (len as usize).min(buf.len());
                paths.push(String::from_utf16_lossy(&buf[..len]));
            }
        }

        Ok(paths)
    }
}

pub struct EverythingSearch {
    library_path: PathBuf,
    api: Mutex<Option<Arc<EngineApi>>>,
}

impl EverythingSearch {
    /// Adapter using the library resolved by
    /// [`platform::engine_library_path`].
    pub fn new() -> Self {
        Self::with_library_path(platform::engine_library_path())
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: path.into(),
            api: Mutex::new(None),
        }
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    /// Load the SDK on first use. Failures are not cached, so a library
    /// installed later is picked up by the next search.
    fn api(&self) -> Result<Arc<EngineApi>> {
        let mut slot = self.api.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(api) = slot.as_ref() {
            return Ok(Arc::clone(api));
        }

        let api = EngineApi::load(&self.library_path).map_err(|e| {
            warn!(
                "Failed to load Everything SDK from {}: {}",
                self.library_path.display(),
                e
            );
            SearchError::BackendUnavailable {
                backend: BACKEND,
                remediation: format!(
                    "Failed to load Everything SDK from {}: {}. Install Everything \
                     (https://www.voidtools.com), make sure it is running, and set {} to \
                     the path of {}.",
                    self.library_path.display(),
                    e,
                    EngineConfig::LIBRARY_PATH_ENV,
                    EngineConfig::LIBRARY_FILE_NAME
                ),
            }
        })?;

        info!("Loaded Everything SDK from {}", self.library_path.display());
        let api = Arc::new(api);
        *slot = Some(Arc::clone(&api));
        Ok(api)
    }
}

impl Default for EverythingSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchBackend for EverythingSearch {
    fn name(&self) -> &'static str {
        BACKEND
    }

    fn supported_flags(&self) -> SupportedFlags {
        SupportedFlags {
            match_path: true,
            match_case: true,
            match_whole_word: true,
            match_regex: true,
            sort_by: true,
        }
    }

    fn search(&self, query: &SearchQuery, ctx: &SearchContext) -> Result<Vec<String>> {
        let sort = match query.sort_by() {
            None => EverythingSort::default(),
            Some(code) => EverythingSort::from_code(code).ok_or_else(|| {
                SearchError::invalid_params(format!("Unsupported sort_by value: {}", code))
            })?,
        };

        let term = normalize_engine_term(query.term());
        debug!("Everything query {:?} sorted by {:?}", term, sort);

        let native = EngineQuery {
            term: term.encode_utf16().chain(std::iter::once(0)).collect(),
            match_path: query.match_path(),
            match_case: query.match_case(),
            match_whole_word: query.match_whole_word(),
            match_regex: query.match_regex(),
            max: query.max_results() as u32,
            sort,
        };

        let api = self.api()?;
        let rx = spawn_query(ctx, move || api.run(&native))?;
        wait_for_query(&rx, ctx)
    }
}

/// Run `job` on a helper thread once it holds [`QUERY_LOCK`]. The job is
/// skipped if the context's token was cancelled while the helper waited.
fn spawn_query<F>(ctx: &SearchContext, job: F) -> Result<Receiver<Result<Vec<String>>>>
where
    F: FnOnce() -> Result<Vec<String>> + Send + 'static,
{
    let token = ctx.token().clone();
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("everything-query".to_string())
        .spawn(move || {
            let _guard = QUERY_LOCK.lock().unwrap_or_else(|p| p.into_inner());
            if token.is_cancelled() {
                debug!("Skipping abandoned Everything query");
                return;
            }
            let _ = tx.send(job());
        })?;
    Ok(rx)
}

/// Wait for a helper thread's reply within the context's budget. On timeout
/// the context's token is cancelled so a still-queued helper never runs.
fn wait_for_query(rx: &Receiver<Result<Vec<String>>>, ctx: &SearchContext) -> Result<Vec<String>> {
    loop {
        if ctx.token().is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        if ctx.is_expired() {
            warn!("Everything query exceeded {:?}, abandoning it", ctx.timeout());
            ctx.token().cancel();
            return Err(SearchError::Timeout {
                tool: "Everything".to_string(),
                after: ctx.timeout(),
            });
        }

        match rx.recv_timeout(ProcessConfig::POLL_INTERVAL.min(ctx.remaining())) {
            Ok(result) => return result,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(SearchError::execution(
                    "Everything",
                    "query thread exited without a result",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::query::MatchOptions;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    fn ctx(timeout: Duration) -> SearchContext {
        SearchContext::new(timeout, CancellationToken::new())
    }

    #[test]
    fn test_normalize_engine_term() {
        assert_eq!(normalize_engine_term("C:/Users/me"), "C:\\Users\\me");
        assert_eq!(normalize_engine_term("C:\\\\Users\\\\me"), "C:\\Users\\me");
        assert_eq!(normalize_engine_term("*.py"), "*.py");
    }

    #[test]
    fn test_sort_codes() {
        assert_eq!(EverythingSort::from_code(1), Some(EverythingSort::NameAscending));
        assert_eq!(
            EverythingSort::from_code(14),
            Some(EverythingSort::DateModifiedDescending)
        );
        assert_eq!(EverythingSort::from_code(9), None);
        assert_eq!(EverythingSort::from_code(10), None);
        assert_eq!(EverythingSort::from_code(0), None);
        assert_eq!(EverythingSort::default().code(), EngineConfig::DEFAULT_SORT);
        for sort in EverythingSort::ALL {
            assert_eq!(EverythingSort::from_code(sort.code()), Some(sort));
        }
    }

    #[test]
    fn test_bad_sort_rejected_before_loading() {
        let backend = EverythingSearch::with_library_path("/nonexistent/Everything64.dll");
        let options = MatchOptions {
            sort_by: Some(9),
            ..Default::default()
        };
        let query = SearchQuery::new("x", 10, options).unwrap();

        let err = backend.search(&query, &ctx(Duration::from_secs(5))).unwrap_err();
        assert!(matches!(err, SearchError::InvalidParams { .. }));
    }

    #[test]
    fn test_missing_library_is_unavailable() {
        let backend = EverythingSearch::with_library_path("/nonexistent/Everything64.dll");
        let query = SearchQuery::new("x", 10, MatchOptions::default()).unwrap();

        let err = backend.search(&query, &ctx(Duration::from_secs(5))).unwrap_err();
        assert!(matches!(err, SearchError::BackendUnavailable { backend: "everything", .. }));
        assert!(err.to_string().contains("EVERYTHING_SDK_PATH"));
    }

    #[test]
    fn test_wait_returns_reply() {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            let _ = tx.send(Ok(vec!["C:\\a.txt".to_string()]));
        });
        let paths = wait_for_query(&rx, &ctx(Duration::from_secs(5))).unwrap();
        assert_eq!(paths, vec!["C:\\a.txt"]);
    }

    #[test]
    fn test_wait_abandons_slow_query() {
        let (tx, rx) = mpsc::channel::<Result<Vec<String>>>();
        let holder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(500));
            drop(tx);
        });

        let started = Instant::now();
        let err = wait_for_query(&rx, &ctx(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, SearchError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_millis(450));
        holder.join().unwrap();
    }

    #[test]
    fn test_queued_query_skipped_after_timeout() {
        let held = QUERY_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let ran = Arc::new(AtomicBool::new(false));
        let ctx = ctx(Duration::from_millis(100));

        let flag = Arc::clone(&ran);
        let rx = spawn_query(&ctx, move || {
            flag.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        })
        .unwrap();

        let err = wait_for_query(&rx, &ctx).unwrap_err();
        assert!(matches!(err, SearchError::Timeout { .. }));
        assert!(ctx.token().is_cancelled());

        drop(held);
        // The helper drops its sender without replying once it gets the lock.
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_err());
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_queued_query_runs_when_lock_frees() {
        let ctx = ctx(Duration::from_secs(5));
        let rx = {
            let _held = QUERY_LOCK.lock().unwrap_or_else(|p| p.into_inner());
            spawn_query(&ctx, || Ok(vec!["C:\\b.txt".to_string()])).unwrap()
        };
        assert_eq!(wait_for_query(&rx, &ctx).unwrap(), vec!["C:\\b.txt"]);
    }

    #[test]
    fn test_wait_observes_cancel() {
        let (_tx, rx) = mpsc::channel::<Result<Vec<String>>>();
        let token = CancellationToken::new();
        token.cancel();
        let err = wait_for_query(&rx, &SearchContext::new(Duration::from_secs(5), token))
            .unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
    }

    #[test]
    fn test_sdk_error_descriptions() {
        assert!(describe_sdk_error(2).contains("not running"));
        assert!(describe_sdk_error(42).contains("42"));
    }
}
