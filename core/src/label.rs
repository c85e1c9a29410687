use crate::drive::{Drive, DriveStatus};
use crate::error::{GoldDriveError, Result};
use crate::probe::DriveStatusProbe;
use crate::table::ShellLabels;
use std::sync::Arc;

pub const MAX_LABEL_LEN: usize = 32;

/// Explorer-visible labels of connected drives.
///
/// Only the shell is touched; persisting a new label is up to the caller.
pub struct DriveLabelAdapter {
    probe: DriveStatusProbe,
    shell: Arc<dyn ShellLabels>,
}

impl DriveLabelAdapter {
    pub fn new(probe: DriveStatusProbe, shell: Arc<dyn ShellLabels>) -> Self {
        Self { probe, shell }
    }

    /// Current label, `None` unless the drive is connected.
    pub async fn get_label(&self, drive: &Drive) -> Result<Option<String>> {
        if self.probe.status(drive).await? != DriveStatus::Connected {
            return Ok(None);
        }
        self.shell.get_label(drive.letter()).await
    }

    /// Set the label of a connected drive. Any other status is returned
    /// untouched and nothing changes.
    pub async fn set_label(&self, drive: &mut Drive, label: &str) -> Result<DriveStatus> {
        let label = validate_label(label)?;

        let status = self.probe.status(drive).await?;
        drive.status = status;
        if status != DriveStatus::Connected {
            return Ok(status);
        }

        let mount_point = drive.endpoint()?.ok_or_else(|| {
            GoldDriveError::InvalidMountPoint(format!("{} has no mount point", drive.name()))
        })?;
        self.shell.set_label(drive.letter(), &mount_point, label).await?;

        tracing::info!("label of {} set to '{}'", drive.name(), label);
        drive.label = label.to_string();
        Ok(status)
    }
}

fn validate_label(label: &str) -> Result<&str> {
    let label = label.trim();
    if label.is_empty() {
        return Err(GoldDriveError::InvalidInput("Label cannot be empty".to_string()));
    }
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(GoldDriveError::InvalidInput(format!(
            "Label too long (max {} characters)",
            MAX_LABEL_LEN
        )));
    }
    if label.contains(&['\\', '\0', '\n', '\r'][..]) {
        return Err(GoldDriveError::InvalidInput("Label contains invalid characters".to_string()));
    }
    Ok(label)
}
