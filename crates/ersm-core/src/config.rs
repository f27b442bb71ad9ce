use std::path::{Path, PathBuf};

pub const ARCHIVE_DIR: &str = "saves";
pub const CATALOG_FILE: &str = "savedata";
pub const PATH_OVERRIDE_FILE: &str = "game_savepath.txt";

/// Where the archive, the catalog and the save-path override live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub archive_root: PathBuf,
    pub catalog_path: PathBuf,
    pub path_override_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive_root: PathBuf::from(ARCHIVE_DIR),
            catalog_path: PathBuf::from(CATALOG_FILE),
            path_override_file: PathBuf::from(PATH_OVERRIDE_FILE),
        }
    }
}

impl Config {
    pub fn in_dir(base: &Path) -> Self {
        Self {
            archive_root: base.join(ARCHIVE_DIR),
            catalog_path: base.join(CATALOG_FILE),
            path_override_file: base.join(PATH_OVERRIDE_FILE),
        }
    }
}
