use crate::utils::clock::{Clock, SystemClock};
use crate::utils::logger::debug_with_context;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use thiserror::Error;

/// TTL that never expires.
pub const INFINITE: i64 = -1;

pub const CACHE_DIR_ENV: &str = "POSH_LINE_CACHE_DIR";
pub const SESSION_ENV: &str = "POSH_SESSION_ID";

const DEVICE_FILE: &str = "device.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(#[from] io::Error),
    #[error("cache file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Tied to one terminal session.
    Session,
    /// Shared by every session on the machine.
    Device,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn new(value: String, ttl_minutes: i64, now: DateTime<Utc>) -> Self {
        let expires_at = (ttl_minutes >= 0).then(|| now + Duration::minutes(ttl_minutes));
        Self { value, expires_at }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(at) if at <= now)
    }
}

/// Read-only view used by the template `cache` function.
pub trait CacheRead {
    fn read(&self, key: &str) -> Option<String>;
}

/// Persistent key/value store backed by one JSON file per scope.
///
/// Reads come from the snapshot loaded at open time (plus this process's own
/// writes). Writes take an advisory lock on a sibling `.lock` file, merge
/// into the latest on-disk state and replace the file atomically, so
/// concurrent shells never observe a truncated store.
pub struct Store {
    scope: Scope,
    path: Option<PathBuf>,
    entries: DashMap<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl Store {
    pub fn open(scope: Scope, path: impl Into<PathBuf>) -> Self {
        Self::with_clock(scope, path, Arc::new(SystemClock))
    }

    pub fn with_clock(scope: Scope, path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let mut entries = DashMap::new();

        let available = match path.parent() {
            Some(parent) => fs::create_dir_all(parent).map_err(CacheError::from),
            None => Ok(()),
        };

        let path = match available {
            Ok(()) => {
                match read_entries(&path) {
                    Ok(loaded) => entries.extend(loaded),
                    Err(e) => debug_with_context("cache", &format!("Ignoring {}: {}", path.display(), e)),
                }
                Some(path)
            }
            Err(e) => {
                debug_with_context("cache", &format!("Cache at {} unavailable: {}", path.display(), e));
                None
            }
        };

        Self {
            scope,
            path,
            entries,
            clock,
        }
    }

    /// A store with no backing medium: every read misses, every write is dropped.
    pub fn unavailable(scope: Scope) -> Self {
        Self {
            scope,
            path: None,
            entries: DashMap::new(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.is_expired(self.clock.now()) {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Best-effort write; failures are logged and otherwise ignored.
    pub fn set(&self, key: &str, value: &str, ttl_minutes: i64) {
        if let Err(e) = self.try_set(key, value, ttl_minutes) {
            debug_with_context("cache", &format!("Dropping write of {}: {}", key, e));
        }
    }

    pub fn try_set(&self, key: &str, value: &str, ttl_minutes: i64) -> Result<(), CacheError> {
        let entry = CacheEntry::new(value.to_string(), ttl_minutes, self.clock.now());
        self.update(|entries| {
            entries.insert(key.to_string(), entry.clone());
        })?;
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        let removed = self.update(|entries| {
            entries.remove(key);
        });
        match removed {
            Ok(_) => {
                self.entries.remove(key);
            }
            Err(e) => debug_with_context("cache", &format!("Dropping removal of {}: {}", key, e)),
        }
    }

    /// Drop expired entries from disk. Returns how many were removed.
    pub fn clear_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let mut removed = 0;
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            removed = before - entries.len();
        })?;
        self.entries.retain(|_, entry| !entry.is_expired(now));
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-modify-write of the on-disk map under the cross-process lock.
    fn update<F>(&self, apply: F) -> Result<(), CacheError>
    where
        F: FnOnce(&mut HashMap<String, CacheEntry>),
    {
        let path = self.path.as_deref().ok_or_else(|| {
            CacheError::Unavailable(io::Error::new(io::ErrorKind::NotFound, "no cache location"))
        })?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path(path))?;
        FileExt::lock_exclusive(&lock)?;

        let mut entries = match read_entries(path) {
            Ok(entries) => entries,
            Err(CacheError::Corrupt(e)) => {
                debug_with_context("cache", &format!("Rewriting corrupt {}: {}", path.display(), e));
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        apply(&mut entries);
        write_entries(path, &entries)
        // `lock` is released when dropped.
    }
}

impl CacheRead for Store {
    fn read(&self, key: &str) -> Option<String> {
        self.get(key)
    }
}

/// The two stores every invocation works with.
pub struct Caches {
    pub session: Store,
    pub device: Store,
}

impl Caches {
    pub fn open_default() -> Self {
        match cache_dir() {
            Some(dir) => Self::open_in(&dir, &session_id()),
            None => Self::unavailable(),
        }
    }

    pub fn open_in(dir: &Path, session_id: &str) -> Self {
        Self::with_clock(dir, session_id, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: &Path, session_id: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            session: Store::with_clock(Scope::Session, dir.join(session_file(session_id)), clock.clone()),
            device: Store::with_clock(Scope::Device, dir.join(DEVICE_FILE), clock),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            session: Store::unavailable(Scope::Session),
            device: Store::unavailable(Scope::Device),
        }
    }

    pub fn store(&self, scope: Scope) -> &Store {
        match scope {
            Scope::Session => &self.session,
            Scope::Device => &self.device,
        }
    }
}

impl CacheRead for Caches {
    fn read(&self, key: &str) -> Option<String> {
        self.session.get(key).or_else(|| self.device.get(key))
    }
}

pub fn cache_dir() -> Option<PathBuf> {
    env::var_os(CACHE_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|dir| dir.join("posh-line")))
}

/// Identity of the current terminal session.
pub fn session_id() -> String {
    if let Ok(id) = env::var(SESSION_ENV) {
        if !id.is_empty() {
            return id;
        }
    }

    #[cfg(unix)]
    {
        std::os::unix::process::parent_id().to_string()
    }
    #[cfg(not(unix))]
    {
        "default".to_string()
    }
}

fn session_file(session_id: &str) -> String {
    let safe: String = session_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("session-{}.json", safe)
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn read_entries(path: &Path) -> Result<HashMap<String, CacheEntry>, CacheError> {
    match fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => Ok(HashMap::new()),
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e.into()),
    }
}

fn write_entries(path: &Path, entries: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, entries)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| CacheError::Unavailable(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_path_is_sibling() {
        let path = Path::new("/tmp/posh/device.json");
        assert_eq!(lock_path(path), PathBuf::from("/tmp/posh/device.json.lock"));
    }

    #[test]
    fn test_session_file_sanitizes_identity() {
        assert_eq!(session_file("abc-123"), "session-abc-123.json");
        assert_eq!(session_file("../evil"), "session-___evil.json");
    }

    #[test]
    fn test_negative_ttl_never_expires() {
        let now = Utc::now();
        let entry = CacheEntry::new("v".into(), INFINITE, now);
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired(now + Duration::days(365)));
    }
}
