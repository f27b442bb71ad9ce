// Finding the live save file.
//
// Order: explicit override file when asked for, the game's default directory,
// a previously remembered path, then the user. A path the user types in is
// remembered in the same override file so the question is not asked again.
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, IoContext, Result};
use crate::prompt::Prompter;

pub const SAVE_FILE_NAME: &str = "ER0000.sl2";
const GAME_DIR: &str = "EldenRing";
const SEARCH_DEPTH: usize = 3;

/// `%APPDATA%\EldenRing` of the current user.
pub fn default_save_dir() -> PathBuf {
    let user = std::env::var("USERNAME").or_else(|_| std::env::var("USER")).ok();
    default_save_dir_from(std::env::var_os("APPDATA"), user.as_deref())
}

pub fn default_save_dir_from(appdata: Option<OsString>, user: Option<&str>) -> PathBuf {
    match appdata {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir).join(GAME_DIR),
        _ => PathBuf::from(format!(
            "C:/Users/{}/AppData/Roaming/{GAME_DIR}",
            user.unwrap_or_default()
        )),
    }
}

/// First save file below `dir` (the game nests it under a per-account folder).
pub fn find_save_file(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .max_depth(SEARCH_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .find(|e| e.file_type().is_file() && e.file_name() == SAVE_FILE_NAME)
        .map(|e| e.into_path())
}

/// Accept either the save file itself or a directory containing it.
pub fn resolve(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else if path.is_dir() {
        find_save_file(path).ok_or_else(|| Error::NoSaveFile(path.to_path_buf()))
    } else {
        Err(Error::MissingSource(path.to_path_buf()))
    }
}

pub fn read_override(file: &Path) -> Result<Option<PathBuf>> {
    match fs::read_to_string(file) {
        Ok(s) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| PathBuf::from(s)))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Io { path: file.to_path_buf(), source }),
    }
}

pub fn write_override(file: &Path, path: &Path) -> Result<()> {
    fs::write(file, path.to_string_lossy().as_bytes()).at(file)
}

/// Locate the live save file.
///
/// With `custom_location` only the override file is consulted. Otherwise the
/// default directory is searched first, then the remembered path, and finally
/// the user is asked until a usable path is given or they quit with `q`.
pub fn locate(
    config: &Config,
    custom_location: bool,
    default_dir: &Path,
    prompter: &mut dyn Prompter,
) -> Result<PathBuf> {
    if custom_location {
        let path = read_override(&config.path_override_file)?
            .ok_or_else(|| Error::MissingSource(config.path_override_file.clone()))?;
        return resolve(&path);
    }

    debug!("checking default save location {}", default_dir.display());
    if let Some(found) = find_save_file(default_dir) {
        info!("save location found: {}", found.display());
        return Ok(found);
    }
    if let Some(remembered) = read_override(&config.path_override_file)? {
        match resolve(&remembered) {
            Ok(found) => return Ok(found),
            Err(e) => warn!("remembered save location is unusable: {e}"),
        }
    }

    loop {
        let answer = prompter
            .ask(
                "Could not find the savegame folder at the default location, \
                 please enter the full path of your savegame folder (q to quit): ",
            )
            .map_err(Error::Prompt)?;
        if answer.is_empty() || answer.starts_with('q') {
            return Err(Error::Aborted);
        }
        match resolve(Path::new(&answer)) {
            Ok(found) => {
                write_override(&config.path_override_file, Path::new(&answer))?;
                info!("remembering save location {answer}");
                return Ok(found);
            }
            Err(e) => warn!("{e}"),
        }
    }
}
