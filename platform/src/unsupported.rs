//! Stand-ins for platforms without drive letters. Every call fails, so a
//! probe can never report a letter as free here.

use golddrive_core::{DriveLetter, DriveTable, GoldDriveError, LetterBinding, MountPoint, MountTransport, ShellLabels};

fn unsupported(what: &str) -> GoldDriveError {
    GoldDriveError::PlatformNotSupported(format!("{} requires Windows drive letters", what))
}

pub struct UnsupportedDriveTable;

#[async_trait::async_trait]
impl DriveTable for UnsupportedDriveTable {
    async fn bindings(&self) -> Result<Vec<LetterBinding>, GoldDriveError> {
        log::warn!("drive table queried on an unsupported platform");
        Err(unsupported("Reading the drive table"))
    }
}

pub struct UnsupportedTransport;

#[async_trait::async_trait]
impl MountTransport for UnsupportedTransport {
    async fn bind(&self, _letter: DriveLetter, _mount_point: &MountPoint) -> Result<(), GoldDriveError> {
        Err(unsupported("Mounting"))
    }

    async fn unbind(&self, _letter: DriveLetter) -> Result<(), GoldDriveError> {
        Err(unsupported("Unmounting"))
    }
}

pub struct UnsupportedLabels;

#[async_trait::async_trait]
impl ShellLabels for UnsupportedLabels {
    async fn get_label(&self, _letter: DriveLetter) -> Result<Option<String>, GoldDriveError> {
        Err(unsupported("Reading drive labels"))
    }

    async fn set_label(
        &self,
        _letter: DriveLetter,
        _mount_point: &MountPoint,
        _label: &str,
    ) -> Result<(), GoldDriveError> {
        Err(unsupported("Setting drive labels"))
    }
}
