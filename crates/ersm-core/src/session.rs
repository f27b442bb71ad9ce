use std::path::{Path, PathBuf};

use log::info;

use crate::catalog::{Catalog, CreateOutcome, Save};
use crate::config::Config;
use crate::error::Result;
use crate::prompt::Prompter;
use crate::store::{BackupStore, Slot};

/// One program run against a live save file.
#[derive(Debug)]
pub struct Session {
    store: BackupStore,
    catalog: Catalog,
    live: PathBuf,
}

impl Session {
    /// Open the store, load the catalog and take the temporary backup of the live file.
    pub fn start(config: &Config, live: impl Into<PathBuf>) -> Result<Self> {
        let session = Self::start_without_backup(config, live)?;
        session.auto_backup()?;
        Ok(session)
    }

    /// Like [`Session::start`] but leaves the temporary slot as it is.
    pub fn start_without_backup(config: &Config, live: impl Into<PathBuf>) -> Result<Self> {
        let catalog = Catalog::load(&config.catalog_path)?;
        Self::with_catalog(config, catalog, live)
    }

    /// Open the store around an already loaded catalog. Takes no backup.
    pub fn with_catalog(
        config: &Config,
        catalog: Catalog,
        live: impl Into<PathBuf>,
    ) -> Result<Self> {
        let store = BackupStore::open(&config.archive_root)?;
        Ok(Self { store, catalog, live: live.into() })
    }

    pub fn store(&self) -> &BackupStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn live(&self) -> &Path {
        &self.live
    }

    pub fn auto_backup(&self) -> Result<()> {
        self.backup(Slot::Temporary)
    }

    pub fn backup(&self, slot: Slot) -> Result<()> {
        let dest = self.store.put(&self.live, slot.as_str())?;
        info!("backed up to {} slot ({})", slot, dest.display());
        Ok(())
    }

    /// Overwrite the live file with the copy in `slot`.
    pub fn restore_backup(&self, slot: Slot) -> Result<()> {
        self.store.get(slot.as_str(), &self.live)
    }

    /// Exchange the live file with the temporary slot, so running it twice is a no-op.
    pub fn undo_with_temporary(&self) -> Result<()> {
        self.store.swap(Slot::Temporary.as_str(), &self.live)
    }

    pub fn restore_save(&self, name: &str) -> Result<()> {
        self.catalog.restore_save(&self.store, name, &self.live)
    }

    pub fn create_save(
        &mut self,
        name: &str,
        description: &str,
        prompter: &mut dyn Prompter,
    ) -> Result<CreateOutcome> {
        self.catalog.create_save(&self.store, name, description, &self.live, prompter)
    }

    pub fn remove_save(&mut self, name: &str) -> Result<Save> {
        self.catalog.remove_save(&self.store, name)
    }
}
