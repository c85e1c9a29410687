//! The persisted drive table.
//!
//! The document lives in `config.json` under the user's local app data
//! directory:
//!
//! ```json
//! {
//!   "drives": {
//!     "X:": { "letter": "X", "mountPoint": "me@host!22", "label": "host" }
//!   },
//!   "selected": "X:"
//! }
//! ```
//!
//! Keys this crate does not know about are kept and written back as they were.

use crate::drive::{Drive, DriveLetter, MountPoint};
use crate::error::{GoldDriveError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const SETTINGS_DIR: &str = "golddrive";
pub const SETTINGS_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    drives: BTreeMap<String, Drive>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.drives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drives.is_empty()
    }

    /// Configured drives ordered by letter.
    pub fn drives(&self) -> impl Iterator<Item = &Drive> {
        self.drives.values()
    }

    pub fn drive(&self, letter: DriveLetter) -> Option<&Drive> {
        self.drives.get(&letter.name())
    }

    pub fn drive_mut(&mut self, letter: DriveLetter) -> Option<&mut Drive> {
        self.drives.get_mut(&letter.name())
    }

    /// Insert or replace the entry for the drive's letter.
    pub fn add_drive(&mut self, drive: Drive) {
        self.drives.insert(drive.name(), drive);
    }

    /// Later drives win over earlier ones with the same letter.
    pub fn add_drives(&mut self, drives: impl IntoIterator<Item = Drive>) {
        for drive in drives {
            self.add_drive(drive);
        }
    }

    pub fn remove_drive(&mut self, letter: DriveLetter) -> Option<Drive> {
        let removed = self.drives.remove(&letter.name());
        if removed.is_some() && self.selected.as_deref() == Some(letter.name().as_str()) {
            self.selected = None;
        }
        removed
    }

    pub fn selected_letter(&self) -> Option<DriveLetter> {
        self.selected.as_deref().and_then(|s| s.parse().ok())
    }

    /// Unknown top-level keys carried through load and save.
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for (key, drive) in &self.drives {
            if *key != drive.name() {
                return Err(format!("entry '{}' holds drive {}", key, drive.name()));
            }
            MountPoint::parse(&drive.mount_point).map_err(|e| format!("entry '{}': {}", key, e))?;
        }
        if let Some(selected) = &self.selected {
            selected
                .parse::<DriveLetter>()
                .map_err(|_| format!("selected drive '{}' is not a drive letter", selected))?;
        }
        Ok(())
    }
}

/// Owns the settings file. Loads and saves never interleave.
pub struct SettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `<local app data>/golddrive/config.json`
    pub fn default_location() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|dir| dir.join(SETTINGS_DIR).join(SETTINGS_FILE))
            .ok_or_else(|| GoldDriveError::Configuration("No local app data directory".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document; a missing file is an empty table.
    pub fn load(&self) -> Result<Settings> {
        let _lock = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let read_error = |reason: String| GoldDriveError::StorageRead {
            path: self.path.clone(),
            reason,
        };

        // Only a missing file reads as an empty table.
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no settings at {}, starting empty", self.path.display());
                return Ok(Settings::new());
            }
            Err(e) => return Err(read_error(e.to_string())),
        };
        let settings: Settings = serde_json::from_str(&content).map_err(|e| read_error(e.to_string()))?;
        settings.validate().map_err(read_error)?;

        tracing::debug!("loaded {} drive(s) from {}", settings.len(), self.path.display());
        Ok(settings)
    }

    /// Write to a temp file next to the target, then swap it in.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let _lock = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let write_error = |reason: String| GoldDriveError::StorageWrite {
            path: self.path.clone(),
            reason,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| write_error(e.to_string()))?;

        let content = serde_json::to_string_pretty(settings).map_err(|e| write_error(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| write_error(e.to_string()))?;
        tmp.write_all(content.as_bytes()).map_err(|e| write_error(e.to_string()))?;
        tmp.flush().map_err(|e| write_error(e.to_string()))?;
        tmp.as_file().sync_all().map_err(|e| write_error(e.to_string()))?;
        tmp.persist(&self.path).map_err(|e| write_error(e.error.to_string()))?;

        tracing::debug!("saved {} drive(s) to {}", settings.len(), self.path.display());
        Ok(())
    }
}
