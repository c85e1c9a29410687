//! Drive status classification.

use crate::drive::{Drive, DriveStatus};
use crate::error::{GoldDriveError, Result};
use crate::policy::LetterPolicy;
use crate::table::{DriveTable, LetterBinding};
use std::sync::Arc;

/// Classify `drive` against one snapshot of the OS table.
///
/// First match wins: NOT_SUPPORTED, IN_USE, MOUNTPOINT_IN_USE, CONNECTED,
/// DISCONNECTED. A reserved letter is NOT_SUPPORTED before its mount point
/// is even looked at.
pub fn classify(drive: &Drive, bindings: &[LetterBinding], policy: &LetterPolicy) -> Result<DriveStatus> {
    let letter = drive.letter();
    if policy.is_reserved(letter) {
        return Ok(DriveStatus::NotSupported);
    }

    let endpoint = drive.endpoint()?;
    let own = bindings.iter().find(|b| b.letter == letter);

    if let Some(binding) = own {
        let ours = match (binding.managed_mount(), &endpoint) {
            (Some(bound), Some(wanted)) => bound.same_endpoint(wanted),
            _ => false,
        };
        if !ours {
            return Ok(DriveStatus::InUse);
        }
    }

    if let Some(wanted) = &endpoint {
        let claimed_elsewhere = bindings
            .iter()
            .filter(|b| b.letter != letter)
            .filter_map(LetterBinding::managed_mount)
            .any(|bound| bound.same_endpoint(wanted));
        if claimed_elsewhere {
            return Ok(DriveStatus::MountpointInUse);
        }
    }

    if own.is_some() {
        Ok(DriveStatus::Connected)
    } else {
        Ok(DriveStatus::Disconnected)
    }
}

/// Reads the live drive table and classifies drives against it.
///
/// Nothing is cached: every call reads the table again.
#[derive(Clone)]
pub struct DriveStatusProbe {
    table: Arc<dyn DriveTable>,
    policy: LetterPolicy,
}

impl DriveStatusProbe {
    pub fn new(table: Arc<dyn DriveTable>, policy: LetterPolicy) -> Self {
        Self { table, policy }
    }

    pub fn policy(&self) -> &LetterPolicy {
        &self.policy
    }

    pub async fn snapshot(&self) -> Result<Vec<LetterBinding>> {
        self.table.bindings().await.map_err(|e| match e {
            GoldDriveError::ProbeFailed(_) => e,
            other => GoldDriveError::ProbeFailed(other.to_string()),
        })
    }

    pub async fn status(&self, drive: &Drive) -> Result<DriveStatus> {
        let bindings = self.snapshot().await?;
        let status = classify(drive, &bindings, &self.policy)?;
        tracing::debug!("probe {} ({}) -> {}", drive.name(), drive.mount_point, status);
        Ok(status)
    }

    /// Copy of `drive` stamped with its current status.
    pub async fn probe(&self, drive: &Drive) -> Result<Drive> {
        let bindings = self.snapshot().await?;
        let mut probed = drive.clone();
        probed.status = classify(drive, &bindings, &self.policy)?;
        probed.is_managed = drive.is_managed
            || bindings
                .iter()
                .any(|b| b.letter == drive.letter() && b.managed_mount().is_some());
        Ok(probed)
    }

    /// Every mountable letter, classified against a single snapshot.
    pub async fn sweep(&self) -> Result<Vec<Drive>> {
        let bindings = self.snapshot().await?;
        let mut drives = Vec::new();

        for letter in self.policy.mountable() {
            let managed = bindings
                .iter()
                .find(|b| b.letter == letter)
                .and_then(LetterBinding::managed_mount);

            let mut drive = match managed {
                Some(mount_point) => Drive::new(letter, mount_point.to_string()),
                None => Drive::letter_only(letter),
            };
            drive.status = classify(&drive, &bindings, &self.policy)?;
            drives.push(drive);
        }

        Ok(drives)
    }
}
