//! Persisted list of named saves.
//!
//! The catalog file is JSON Lines: a header line naming the format and its
//! version, then one self-contained `Save` record per line. A record line that
//! fails to parse (bad JSON or not UTF-8) is skipped on load and written back
//! byte for byte on the next persist. Only the header has to be readable.
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, IoContext, Result};
use crate::prompt::{Prompter, confirm};
use crate::store::{BackupStore, Slot, validate_key};

pub const FORMAT_TAG: &str = "ersm-catalog";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    format: String,
    version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Save {
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Save {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), created_at: Utc::now() }
    }
}

impl fmt::Display for Save {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Overwritten,
    /// The name was taken and the user declined to overwrite it. Nothing changed.
    Declined,
}

/// A save name must be a valid store key and must not shadow a reserved slot.
pub fn validate_save_name(name: &str) -> Result<()> {
    validate_key(name)?;
    if Slot::from_tag(name).is_some() {
        return Err(Error::InvalidName {
            name: name.to_string(),
            reason: "name is reserved for a backup slot",
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
    saves: Vec<Save>,
    rejected: Vec<Vec<u8>>,
}

impl Catalog {
    /// Load the catalog at `path`. A missing or empty file is an empty catalog.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut catalog = Self { path, saves: Vec::new(), rejected: Vec::new() };
        let data = match fs::read(&catalog.path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no catalog at {}, starting empty", catalog.path.display());
                return Ok(catalog);
            }
            Err(source) => return Err(Error::Io { path: catalog.path.clone(), source }),
        };
        let mut lines = data
            .split(|&b| b == b'\n')
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim_ascii()))
            .filter(|(_, l)| !l.is_empty());
        let Some((header_line, header)) = lines.next() else {
            return Ok(catalog);
        };
        let header = std::str::from_utf8(header).map_err(|e| Error::Catalog {
            line: header_line,
            message: format!("missing or unreadable header: {e}"),
        })?;
        let header: Header = serde_json::from_str(header).map_err(|e| Error::Catalog {
            line: header_line,
            message: format!("missing or unreadable header: {e}"),
        })?;
        if header.format != FORMAT_TAG {
            return Err(Error::Catalog {
                line: header_line,
                message: format!("not a save catalog (format '{}')", header.format),
            });
        }
        if header.version != FORMAT_VERSION {
            return Err(Error::Catalog {
                line: header_line,
                message: format!("unsupported catalog version {}", header.version),
            });
        }
        for (n, line) in lines {
            match serde_json::from_slice::<Save>(line) {
                // The first record for a name wins; later copies are dropped on the next persist.
                Ok(save) if catalog.get(&save.name).is_some() => {
                    warn!("catalog line {n}: duplicate save '{}', dropping", save.name);
                }
                Ok(save) => catalog.saves.push(save),
                Err(e) => {
                    warn!("catalog line {n}: {e}, ignoring");
                    catalog.rejected.push(line.to_vec());
                }
            }
        }
        debug!("loaded {} saves from {}", catalog.saves.len(), catalog.path.display());
        Ok(catalog)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saves in insertion order.
    pub fn list(&self) -> &[Save] {
        &self.saves
    }

    pub fn get(&self, name: &str) -> Option<&Save> {
        self.saves.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.saves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saves.is_empty()
    }

    /// Record lines that could not be read, kept byte for byte.
    pub fn rejected_lines(&self) -> &[Vec<u8>] {
        &self.rejected
    }

    /// Rewrite the whole catalog file, replacing it atomically.
    pub fn persist(&self) -> Result<()> {
        let header = Header { format: FORMAT_TAG.to_string(), version: FORMAT_VERSION };
        let mut out = serde_json::to_vec(&header)?;
        out.push(b'\n');
        for save in &self.saves {
            serde_json::to_writer(&mut out, save)?;
            out.push(b'\n');
        }
        for line in &self.rejected {
            out.extend_from_slice(line);
            out.push(b'\n');
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).at(parent)?;
        }
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, out).at(&tmp)?;
        fs::rename(&tmp, &self.path).at(&self.path)?;
        debug!("wrote {} saves to {}", self.saves.len(), self.path.display());
        Ok(())
    }

    /// Copy the live file into the store as `name` and record it.
    ///
    /// An existing save of the same name is only replaced after `prompter`
    /// confirms. The copy is staged and committed before the catalog is touched,
    /// so a failed copy leaves neither an empty directory nor a dangling record.
    /// Overwriting replaces the existing record in place.
    pub fn create_save(
        &mut self,
        store: &BackupStore,
        name: &str,
        description: &str,
        live: &Path,
        prompter: &mut dyn Prompter,
    ) -> Result<CreateOutcome> {
        validate_save_name(name)?;
        if store.contains(name) || self.get(name).is_some() {
            let question = format!("A save named '{name}' already exists. Overwrite it?");
            let overwrite = confirm(prompter, &question).map_err(Error::Prompt)?;
            if !overwrite {
                info!("kept existing save '{name}'");
                return Ok(CreateOutcome::Declined);
            }
        }

        let staged = store.stage(live, name)?;
        let replaced_dir = store.commit(staged)?;

        let save = Save::new(name, description);
        let outcome = match self.saves.iter_mut().find(|s| s.name == name) {
            Some(existing) => {
                *existing = save;
                CreateOutcome::Overwritten
            }
            None => {
                self.saves.push(save);
                if replaced_dir {
                    CreateOutcome::Overwritten
                } else {
                    CreateOutcome::Created
                }
            }
        };
        self.persist()?;
        info!("saved '{name}'");
        Ok(outcome)
    }

    /// Restore a catalogued save over the live file.
    pub fn restore_save(&self, store: &BackupStore, name: &str, live: &Path) -> Result<()> {
        if self.get(name).is_none() {
            return Err(Error::UnknownSave(name.to_string()));
        }
        store.get(name, live)
    }

    /// Drop a save from the catalog and delete its stored copy.
    pub fn remove_save(&mut self, store: &BackupStore, name: &str) -> Result<Save> {
        let idx = self
            .saves
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::UnknownSave(name.to_string()))?;
        if !store.remove(name)? {
            warn!("save '{name}' had no stored copy");
        }
        let save = self.saves.remove(idx);
        self.persist()?;
        Ok(save)
    }
}
