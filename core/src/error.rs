use crate::drive::{DriveLetter, DriveStatus};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GoldDriveError {
    #[error("Failed to read settings {}: {reason}", path.display())]
    StorageRead { path: PathBuf, reason: String },

    #[error("Failed to write settings {}: {reason}", path.display())]
    StorageWrite { path: PathBuf, reason: String },

    #[error("Mount of {mount_point} on {letter} failed: {cause}")]
    MountFailure {
        letter: DriveLetter,
        mount_point: String,
        cause: String,
    },

    #[error("Unmount of {mount_point} from {letter} failed (drive is {status}): {cause}")]
    UnmountFailure {
        letter: DriveLetter,
        mount_point: String,
        status: DriveStatus,
        cause: String,
    },

    #[error("Unable to read drive table: {0}")]
    ProbeFailed(String),

    #[error("Invalid drive letter: {0}")]
    InvalidLetter(String),

    #[error("Invalid mount point: {0}")]
    InvalidMountPoint(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Platform not supported: {0}")]
    PlatformNotSupported(String),

    #[error("External command failed: {0}")]
    External(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl GoldDriveError {
    /// Status the drive was left in, when the failure reports one.
    pub fn status(&self) -> Option<DriveStatus> {
        match self {
            GoldDriveError::UnmountFailure { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GoldDriveError>;
