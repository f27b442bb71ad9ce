// Directory-keyed archive of save-file copies.
//
// Layout: `<root>/<key>/<file name of the live save>`. Keys are either save
// names or one of the reserved slot tags. Names starting with '.' are kept
// for staging artifacts and never handed out as keys.
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, IoContext, Result};

const STAGING_PREFIX: &str = ".staging-";
const TRASH_PREFIX: &str = ".trash-";
const PARTIAL_SUFFIX: &str = ".partial";
const INCOMING_SUFFIX: &str = ".incoming";

/// Reserved, non-catalogued backup slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Temporary,
    UserBackup,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Temporary, Slot::UserBackup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Temporary => "temporary",
            Slot::UserBackup => "userbackup",
        }
    }

    pub fn from_tag(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.as_str() == s)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Device names Windows resolves regardless of directory or extension.
const RESERVED_NAMES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Reject keys that would not map to exactly one directory directly under the archive root.
/// Windows naming rules apply on every platform.
pub fn validate_key(key: &str) -> Result<()> {
    let stem = key.split('.').next().unwrap_or(key).trim_end();
    let reason = if key.is_empty() {
        Some("name is empty")
    } else if key == "." || key == ".." {
        Some("name is a relative path component")
    } else if key.starts_with('.') {
        Some("name must not start with '.'")
    } else if key.ends_with('.') {
        Some("name must not end with '.'")
    } else if key.contains(['/', '\\', ':', '<', '>', '"', '|', '?', '*']) {
        Some("name must not contain any of / \\ : < > \" | ? *")
    } else if key.chars().any(char::is_control) {
        Some("name must not contain control characters")
    } else if key.trim() != key {
        Some("name must not start or end with whitespace")
    } else if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        Some("name is a reserved device name")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(Error::InvalidName { name: key.to_string(), reason }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: String,
    pub path: PathBuf,
    pub len: u64,
}

/// A copy of the live file written into a staging directory, not yet visible under its key.
#[derive(Debug)]
#[must_use = "a staged backup must be committed or discarded"]
pub struct Staged {
    key: String,
    dir: PathBuf,
}

impl Staged {
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Create the archive root if needed and clear staging leftovers of interrupted runs.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).at(&root)?;
        let store = Self { root };
        store.sweep()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_dir(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// `<root>/<key>/<file name of live>`
    pub fn entry_path(&self, key: &str, live: &Path) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.key_dir(key).join(file_name(live)?))
    }

    pub fn contains(&self, key: &str) -> bool {
        validate_key(key).is_ok() && self.key_dir(key).is_dir()
    }

    pub fn put(&self, live: &Path, key: &str) -> Result<PathBuf> {
        let dest = self.entry_path(key, live)?;
        ensure_source(live)?;
        let dir = self.key_dir(key);
        fs::create_dir_all(&dir).at(&dir)?;
        copy_replace(live, &dest)?;
        debug!("stored {} under '{}'", live.display(), key);
        Ok(dest)
    }

    pub fn get(&self, key: &str, live: &Path) -> Result<()> {
        let src = self.entry_path(key, live)?;
        if !src.is_file() {
            return Err(Error::EmptySlot { key: key.to_string(), path: src });
        }
        if let Some(parent) = live.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).at(parent)?;
        }
        copy_replace(&src, live)?;
        info!("restored '{}' over {}", key, live.display());
        Ok(())
    }

    /// Copy the live file into a fresh staging directory for `key`.
    pub fn stage(&self, live: &Path, key: &str) -> Result<Staged> {
        let name = file_name(live)?.to_owned();
        validate_key(key)?;
        ensure_source(live)?;
        let dir = self.root.join(format!("{STAGING_PREFIX}{key}"));
        if dir.exists() {
            fs::remove_dir_all(&dir).at(&dir)?;
        }
        fs::create_dir_all(&dir).at(&dir)?;
        let staged = Staged { key: key.to_string(), dir };
        let dest = staged.dir.join(name);
        if let Err(e) = fs::copy(live, &dest).at(live) {
            self.discard(staged)?;
            return Err(e);
        }
        debug!("staged {} as '{}'", live.display(), key);
        Ok(staged)
    }

    /// Move a staged copy into place, replacing any existing directory for its key.
    /// Returns whether an existing entry was replaced.
    pub fn commit(&self, staged: Staged) -> Result<bool> {
        let dest = self.key_dir(&staged.key);
        let trash = self.root.join(format!("{TRASH_PREFIX}{}", staged.key));
        let replaced = dest.exists();
        if replaced {
            if trash.exists() {
                fs::remove_dir_all(&trash).at(&trash)?;
            }
            fs::rename(&dest, &trash).at(&dest)?;
        }
        if let Err(e) = fs::rename(&staged.dir, &dest).at(&dest) {
            if replaced && let Err(back) = fs::rename(&trash, &dest) {
                warn!("could not put back {}: {}", dest.display(), back);
            }
            return Err(e);
        }
        if replaced && let Err(e) = fs::remove_dir_all(&trash) {
            warn!("left {} behind: {}", trash.display(), e);
        }
        info!(
            "{} '{}'",
            if replaced { "replaced" } else { "created" },
            staged.key
        );
        Ok(replaced)
    }

    pub fn discard(&self, staged: Staged) -> Result<()> {
        if staged.dir.exists() {
            fs::remove_dir_all(&staged.dir).at(&staged.dir)?;
        }
        Ok(())
    }

    /// Exchange the live file with the copy stored under `key`.
    pub fn swap(&self, key: &str, live: &Path) -> Result<()> {
        let stored = self.entry_path(key, live)?;
        ensure_source(live)?;
        if !stored.is_file() {
            return Err(Error::EmptySlot { key: key.to_string(), path: stored });
        }
        let incoming = with_suffix(&stored, INCOMING_SUFFIX);
        fs::copy(live, &incoming).at(live)?;
        if let Err(e) = copy_replace(&stored, live) {
            let _ = fs::remove_file(&incoming);
            return Err(e);
        }
        fs::rename(&incoming, &stored).at(&stored)?;
        info!("swapped {} with '{}'", live.display(), key);
        Ok(())
    }

    /// Delete the directory for `key`. Returns false if there was nothing to delete.
    pub fn remove(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        let dir = self.key_dir(key);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).at(&dir)?;
        info!("removed '{}'", key);
        Ok(true)
    }

    /// Every stored file, ordered by key.
    pub fn entries(&self) -> Result<Vec<StoredEntry>> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| Error::Io {
                path: e.path().unwrap_or(&self.root).to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(key) = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|s| s.to_str())
            else {
                continue;
            };
            let file = entry.file_name().to_string_lossy();
            if key.starts_with('.')
                || file.ends_with(PARTIAL_SUFFIX)
                || file.ends_with(INCOMING_SUFFIX)
            {
                continue;
            }
            let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
            out.push(StoredEntry { key: key.to_string(), path: path.to_path_buf(), len });
        }
        Ok(out)
    }

    fn sweep(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root).at(&self.root)?.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(STAGING_PREFIX) || name.starts_with(TRASH_PREFIX) {
                let p = entry.path();
                warn!("removing leftover {}", p.display());
                if p.is_dir() {
                    fs::remove_dir_all(&p).at(&p)?;
                } else {
                    fs::remove_file(&p).at(&p)?;
                }
            }
        }
        Ok(())
    }
}

fn file_name(live: &Path) -> Result<&OsStr> {
    live.file_name().ok_or_else(|| Error::MissingSource(live.to_path_buf()))
}

fn ensure_source(live: &Path) -> Result<()> {
    if live.is_file() {
        Ok(())
    } else {
        Err(Error::MissingSource(live.to_path_buf()))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

// Copy next to `dest` first, then rename over it.
fn copy_replace(src: &Path, dest: &Path) -> Result<()> {
    let partial = with_suffix(dest, PARTIAL_SUFFIX);
    if let Err(e) = fs::copy(src, &partial).at(src) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    fs::rename(&partial, dest).at(dest)
}
