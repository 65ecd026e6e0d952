// # File State Store
//
// File-based implementation of StateStore.
//
// ## Purpose
//
// Keeps the last-known address of every tracked hostname across runs. Each run
// of the binary is a separate process, so nothing is cached in memory: every
// call goes back to disk.
//
// ## Crash Safety
//
// - Atomic writes: every save writes a uniquely named temp file next to the
//   snapshot, fsyncs it, then renames it over the snapshot. Concurrent runs
//   never share a temp file, so a reader sees one complete snapshot or the
//   other (the last rename wins)
// - Corruption detection: snapshot validated on every load
// - Quarantine: a corrupt snapshot is copied to `<file>.corrupt-<timestamp>`
//   before the first save replaces it. An existing quarantine copy is never
//   overwritten, and if no copy can be made the corrupt snapshot stays
//
// ## File Format
//
// ```json
// {
//     "a.example.com": "203.0.113.9",
//     "b.example.com": "2001:db8::1"
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::error::{StateReadError, StateWriteError};
use crate::traits::state_store::{HostMap, StateStore};

/// Indentation of the pretty-printed snapshot
const SNAPSHOT_INDENT: &[u8] = b"    ";

/// Suffix of in-flight snapshot files
const TEMP_SUFFIX: &str = ".tmp";

/// Quarantine names tried per save before giving up
const QUARANTINE_ATTEMPTS: u32 = 16;

/// File-based state store
///
/// # Example
///
/// ```rust,no_run
/// use ddns_ufw_core::state::FileStateStore;
/// use ddns_ufw_core::traits::{HostMap, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/ddns-ufw/ips.json").await?;
///
///     let mut updates = HostMap::new();
///     updates.insert("my.ddns.com".to_string(), "203.0.113.9".to_string());
///     store.merge_and_save(&updates).await?;
///
///     let snapshot = store.load().await?;
///     assert_eq!(snapshot.get("my.ddns.com").map(String::as_str), Some("203.0.113.9"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a file state store
    ///
    /// Creates missing parent directories. The snapshot itself is not touched
    /// until the first save.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|source| Error::StateDirectory {
                        path: parent.to_path_buf(),
                        source,
                    })?;
            }
        }

        Ok(Self { path })
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the raw snapshot, `None` if it does not exist
    async fn read_raw(path: &Path) -> Result<Option<String>, StateReadError> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("State file does not exist: {}", path.display());
                Ok(None)
            }
            Err(source) => Err(StateReadError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn parse(path: &Path, content: &str) -> Result<HostMap, StateReadError> {
        serde_json::from_str(content).map_err(|source| StateReadError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    fn encode(snapshot: &HostMap) -> Result<Vec<u8>, StateWriteError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(SNAPSHOT_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        snapshot.serialize(&mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Write the snapshot atomically (unique temp file, fsync, rename)
    async fn write_snapshot(&self, snapshot: &HostMap) -> Result<(), StateWriteError> {
        let bytes = Self::encode(snapshot)?;
        let dir = Self::parent_dir(&self.path).to_path_buf();
        let target = self.path.clone();

        tokio::task::spawn_blocking(move || Self::persist(&dir, &target, &bytes))
            .await
            .map_err(|e| StateWriteError::Io {
                path: self.path.clone(),
                source: std::io::Error::other(e),
            })??;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    /// Blocking half of [`Self::write_snapshot`]
    ///
    /// The temp file is created in `dir` with a random name and is removed
    /// when dropped, so a failed write leaves nothing behind.
    fn persist(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), StateWriteError> {
        let io_err = |source: std::io::Error| StateWriteError::Io {
            path: target.to_path_buf(),
            source,
        };

        let mut temp = tempfile::Builder::new()
            .prefix(&Self::temp_prefix(target))
            .suffix(TEMP_SUFFIX)
            .tempfile_in(dir)
            .map_err(io_err)?;

        temp.write_all(bytes).map_err(io_err)?;
        temp.flush().map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(target).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    /// Keep a copy of an unreadable snapshot before it gets replaced
    ///
    /// Never overwrites an earlier copy; returns the path written.
    async fn quarantine(
        path: &Path,
        content: &str,
        now: DateTime<Utc>,
    ) -> std::io::Result<PathBuf> {
        for attempt in 0..QUARANTINE_ATTEMPTS {
            let target = Self::quarantine_path(path, now, attempt);
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };

            let written = match file.write_all(content.as_bytes()).await {
                Ok(()) => file.sync_all().await,
                Err(e) => Err(e),
            };

            if let Err(e) = written {
                drop(file);
                let _ = fs::remove_file(&target).await;
                return Err(e);
            }
            return Ok(target);
        }

        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("{} quarantine names already taken", QUARANTINE_ATTEMPTS),
        ))
    }

    fn parent_dir(path: &Path) -> &Path {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// `<file>.` so temp files sort next to the snapshot
    fn temp_prefix(path: &Path) -> OsString {
        let mut prefix = Self::file_name(path);
        prefix.push(".");
        prefix
    }

    fn quarantine_path(path: &Path, now: DateTime<Utc>, attempt: u32) -> PathBuf {
        let mut name = Self::file_name(path);
        name.push(format!(".corrupt-{}", now.format("%Y%m%dT%H%M%SZ")));
        if attempt > 0 {
            name.push(format!("-{}", attempt));
        }
        path.with_file_name(name)
    }

    fn file_name(path: &Path) -> OsString {
        path.file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default()
    }

    async fn merge_and_save_at(
        &self,
        updates: &HostMap,
        now: DateTime<Utc>,
    ) -> Result<(), StateWriteError> {
        let mut snapshot = match Self::read_raw(&self.path)
            .await
            .map_err(StateWriteError::Reload)?
        {
            Some(content) => match Self::parse(&self.path, &content) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!("{}. Rebuilding state from this run only.", e);
                    let copy = Self::quarantine(&self.path, &content, now)
                        .await
                        .map_err(|source| StateWriteError::Quarantine {
                            path: self.path.clone(),
                            source,
                        })?;
                    tracing::warn!(
                        "Corrupt state file {} preserved as {}",
                        self.path.display(),
                        copy.display()
                    );
                    HostMap::new()
                }
            },
            None => HostMap::new(),
        };

        for (hostname, address) in updates {
            snapshot.insert(hostname.clone(), address.clone());
        }

        self.write_snapshot(&snapshot).await
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<HostMap, StateReadError> {
        match Self::read_raw(&self.path).await? {
            Some(content) => {
                let snapshot = Self::parse(&self.path, &content)?;
                tracing::debug!("Loaded state from file: {} records", snapshot.len());
                Ok(snapshot)
            }
            None => Ok(HostMap::new()),
        }
    }

    async fn merge_and_save(&self, updates: &HostMap) -> Result<(), StateWriteError> {
        self.merge_and_save_at(updates, Utc::now()).await
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}
