//! Up-to-date tracking: remembers files already verified clean and lint-free.
//!
//! `FileIndex` persists one entry per rule and file (length and modification
//! time) together with the fingerprint of the formatter configuration that
//! verified it. Loading an index whose fingerprint differs drops every entry,
//! so changing a policy re-checks the whole tree.
//!
//! A file is only proven clean for the rule that checked it, so checks go
//! through `FileIndex::scope`. Two rules matching one file never share an entry.
//!
//! The stamp recorded for a file is the one observed when it was found stale,
//! i.e. before its content was read. An edit racing the check leaves a stale
//! entry that the next run re-checks.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::UNIX_EPOCH;

/// Cache consulted before a file is checked.
///
/// Implementations must accept concurrent calls for distinct paths.
pub trait UpToDateChecker: Sync {
    fn is_up_to_date(&self, path: &Path) -> bool;
    fn set_up_to_date(&self, path: &Path) -> io::Result<()>;
}

/// Checker used when up-to-date tracking is disabled.
pub struct NoopChecker;

impl UpToDateChecker for NoopChecker {
    fn is_up_to_date(&self, _path: &Path) -> bool {
        false
    }

    fn set_up_to_date(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Stamp {
    len: u64,
    mtime_ns: u128,
}

impl Stamp {
    fn of(path: &Path) -> io::Result<Stamp> {
        let meta = fs::metadata(path)?;
        let mtime_ns = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        Ok(Stamp {
            len: meta.len(),
            mtime_ns,
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    fingerprint: String,
    #[serde(default)]
    rules: BTreeMap<String, BTreeMap<String, Stamp>>,
}

type Entries = BTreeMap<String, BTreeMap<String, Stamp>>;

/// File-backed index of verified files, keyed by rule and by path relative
/// to `root`.
pub struct FileIndex {
    root: PathBuf,
    location: PathBuf,
    fingerprint: String,
    entries: RwLock<Entries>,
    observed: Mutex<HashMap<(String, String), Stamp>>,
    modified: AtomicBool,
}

impl FileIndex {
    /// Open the index at `location`, discarding it when its fingerprint
    /// does not match or it cannot be parsed.
    pub fn open(root: &Path, location: &Path, fingerprint: &str) -> FileIndex {
        let mut entries = BTreeMap::new();
        let mut modified = false;
        match fs::read_to_string(location) {
            Ok(s) => match serde_json::from_str::<IndexFile>(&s) {
                Ok(ix) if ix.fingerprint == fingerprint => entries = ix.rules,
                Ok(_) => {
                    tracing::info!(
                        index = %location.display(),
                        "formatter configuration changed; discarding up-to-date index"
                    );
                    modified = true;
                }
                Err(e) => {
                    tracing::warn!(
                        index = %location.display(),
                        error = %e,
                        "up-to-date index is corrupted; starting over"
                    );
                    modified = true;
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(index = %location.display(), error = %e, "cannot read up-to-date index");
            }
        }
        FileIndex {
            root: root.to_path_buf(),
            location: location.to_path_buf(),
            fingerprint: fingerprint.to_string(),
            entries: RwLock::new(entries),
            observed: Mutex::new(HashMap::new()),
            modified: AtomicBool::new(modified),
        }
    }

    /// The checker for one rule's entries.
    pub fn scope(&self, rule: &str) -> IndexScope<'_> {
        IndexScope {
            index: self,
            rule: rule.to_string(),
        }
    }

    /// Entries across all rules.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .map(|e| e.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the index back if anything changed since it was opened.
    pub fn save(&self) -> io::Result<()> {
        if !self.modified.load(Ordering::Acquire) {
            return Ok(());
        }
        let rules = self
            .entries
            .read()
            .map_err(|_| io::Error::other("up-to-date index lock poisoned"))?
            .clone();
        let body = serde_json::to_string_pretty(&IndexFile {
            fingerprint: self.fingerprint.clone(),
            rules,
        })
        .map_err(io::Error::other)?;
        if let Some(parent) = self.location.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.location.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.location)?;
        self.modified.store(false, Ordering::Release);
        tracing::debug!(index = %self.location.display(), "saved up-to-date index");
        Ok(())
    }

    fn key(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// One rule's view of a `FileIndex`.
pub struct IndexScope<'a> {
    index: &'a FileIndex,
    rule: String,
}

impl UpToDateChecker for IndexScope<'_> {
    fn is_up_to_date(&self, path: &Path) -> bool {
        let Ok(now) = Stamp::of(path) else {
            return false;
        };
        let key = self.index.key(path);
        let stored = match self.index.entries.read() {
            Ok(entries) => entries
                .get(&self.rule)
                .and_then(|files| files.get(&key))
                .copied(),
            Err(_) => None,
        };
        if stored == Some(now) {
            return true;
        }
        if let Ok(mut observed) = self.index.observed.lock() {
            observed.insert((self.rule.clone(), key), now);
        }
        false
    }

    fn set_up_to_date(&self, path: &Path) -> io::Result<()> {
        let key = self.index.key(path);
        let seen = self
            .index
            .observed
            .lock()
            .map_err(|_| io::Error::other("up-to-date index lock poisoned"))?
            .remove(&(self.rule.clone(), key.clone()));
        let stamp = match seen {
            Some(stamp) => stamp,
            None => Stamp::of(path)?,
        };
        let mut entries = self
            .index
            .entries
            .write()
            .map_err(|_| io::Error::other("up-to-date index lock poisoned"))?;
        let files = entries.entry(self.rule.clone()).or_default();
        if files.insert(key, stamp) != Some(stamp) {
            self.index.modified.store(true, Ordering::Release);
        }
        Ok(())
    }
}
