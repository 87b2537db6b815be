//! Best-effort syntax tokens per line, refined off the render thread
//!
//! The actual colorer is a [`Highlighter`] supplied by the host. [`TokenCache::tokens_for`]
//! never blocks: it answers from the cache or with plain text and queues the line for a
//! background worker. Every completed refinement bumps a shared version counter, so a renderer
//! can cheaply notice that better tokens may exist by comparing versions between frames.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Presentation-agnostic token style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub struct TokenStyle {
    pub fg: Option<Rgb>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub text: String,
    pub style: TokenStyle,
}

impl Token {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: TokenStyle::default(),
        }
    }
}

/// External syntax colorer
pub trait Highlighter: Send + Sync {
    /// Color one line. `None` when the language is unknown or the colorer is unavailable.
    fn highlight_line(&self, content: &str, language: &str) -> Option<Vec<Token>>;
}

/// Cache key language for a file path: the lowercased extension, or the file name
pub fn language_for_path(path: &str) -> String {
    let path = Path::new(path);
    path.extension()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

type Entries = FxHashMap<String, FxHashMap<String, Arc<[Token]>>>;

#[derive(Default)]
struct Shared {
    /// language → content → tokens
    entries: RwLock<Entries>,
    pending: Mutex<FxHashSet<(String, String)>>,
    version: AtomicU64,
    /// Set on drop; the worker abandons queued requests
    shutdown: AtomicBool,
}

impl Shared {
    fn lookup(&self, content: &str, language: &str) -> Option<Arc<[Token]>> {
        self.entries
            .read()
            .get(language)
            .and_then(|by_content| by_content.get(content))
            .cloned()
    }

    fn store(&self, content: String, language: String, tokens: Arc<[Token]>) {
        self.entries
            .write()
            .entry(language)
            .or_default()
            .insert(content, tokens);
    }
}

/// Process-lifetime token cache keyed by `(content, language)`
pub struct TokenCache {
    shared: Arc<Shared>,
    requests: Option<Sender<(String, String)>>,
    worker: Option<JoinHandle<()>>,
}

impl TokenCache {
    /// Cache backed by `highlighter`, refined on a background thread
    pub fn new(highlighter: Arc<dyn Highlighter>) -> Self {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = unbounded();
        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("rowdiff-tokens".to_string())
            .spawn(move || refine_loop(highlighter, rx, worker_shared));

        match worker {
            Ok(handle) => Self {
                shared,
                requests: Some(tx),
                worker: Some(handle),
            },
            Err(err) => {
                tracing::warn!(%err, "could not start token worker, using plain text");
                Self::plain()
            }
        }
    }

    /// Cache that never refines; every line is plain text
    pub fn plain() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            requests: None,
            worker: None,
        }
    }

    /// Tokens for a line, immediately
    ///
    /// Returns the cached tokens if any, otherwise plain text while a refinement is scheduled.
    pub fn tokens_for(&self, content: &str, language: &str) -> Arc<[Token]> {
        if let Some(tokens) = self.shared.lookup(content, language) {
            return tokens;
        }

        if let Some(tx) = &self.requests {
            let key = (content.to_string(), language.to_string());
            let newly_pending = self.shared.pending.lock().insert(key.clone());
            if newly_pending {
                // The worker may have finished this key between the lookup and the insert
                if let Some(tokens) = self.shared.lookup(content, language) {
                    self.shared.pending.lock().remove(&key);
                    return tokens;
                }
                tracing::trace!(language, len = content.len(), "scheduling token refinement");
                if tx.send(key.clone()).is_err() {
                    self.shared.pending.lock().remove(&key);
                }
            }
        }

        Arc::from(vec![Token::plain(content)])
    }

    /// Monotonic counter bumped after each completed refinement
    pub fn version(&self) -> u64 {
        self.shared.version.load(Ordering::Acquire)
    }

    /// Number of refinements still queued or running
    pub fn pending(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Number of cached lines
    pub fn len(&self) -> usize {
        self.shared.entries.read().values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until nothing is pending or `timeout` elapses; true if idle
    ///
    /// For one-shot hosts and tests. Interactive renderers compare [`TokenCache::version`]
    /// between frames instead.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.pending() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Drop for TokenCache {
    fn drop(&mut self) {
        // At most the in-flight line finishes; the rest of the queue is dropped
        self.shared.shutdown.store(true, Ordering::Release);
        self.requests.take();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn refine_loop(
    highlighter: Arc<dyn Highlighter>,
    rx: Receiver<(String, String)>,
    shared: Arc<Shared>,
) {
    for (content, language) in rx {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        let result = catch_unwind(AssertUnwindSafe(|| {
            highlighter.highlight_line(&content, &language)
        }));

        // Refined tokens must reproduce the line, otherwise fall back to plain text
        let refined = match result {
            Ok(Some(tokens)) if joined(&tokens) == content => Some(tokens),
            Ok(_) => None,
            Err(_) => {
                tracing::warn!(language, "highlighter panicked, using plain text");
                None
            }
        };

        let bumped = refined.is_some();
        let tokens: Arc<[Token]> = match refined {
            Some(tokens) => Arc::from(tokens),
            None => Arc::from(vec![Token::plain(content.as_str())]),
        };
        let key = (content, language);
        shared.store(key.0.clone(), key.1.clone(), tokens);
        if bumped {
            shared.version.fetch_add(1, Ordering::AcqRel);
        }
        shared.pending.lock().remove(&key);
    }
    tracing::debug!("token worker stopped");
}

fn joined(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}
