//! ersm-core: save-file backups for Elden Ring
//!
//! - `store`: directory archive holding one copy per save name or reserved slot
//! - `catalog`: the persisted list of named saves (JSON Lines)
//! - `locate`: finding the live save file
//! - `session`: the per-run sequence (load, temporary backup, then one action)
//!
pub mod catalog;
pub mod config;
pub mod error;
pub mod locate;
pub mod prompt;
pub mod session;
pub mod store;

pub use catalog::{Catalog, CreateOutcome, Save, validate_save_name};
pub use config::Config;
pub use error::{Error, Result};
pub use prompt::{AssumeYes, ConsolePrompter, Prompter, ScriptedPrompter, confirm};
pub use session::Session;
pub use store::{BackupStore, Slot, StoredEntry};
