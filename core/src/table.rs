//! Boundaries to the outside world.
//!
//! The core never touches drive letters directly. It reads the OS table through
//! [`DriveTable`], binds and unbinds through [`MountTransport`] and talks to the
//! shell through [`ShellLabels`]. Platform crates and tests provide the
//! implementations.

use crate::drive::{DriveLetter, MountPoint};
use crate::error::GoldDriveError;
use serde::{Deserialize, Serialize};

/// What an assigned letter currently points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingKind {
    /// Physical or virtual volume.
    Volume,
    /// Local path substitution (`subst`).
    Substitution { target: String },
    /// Network connection, with its remote name.
    Network { remote: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterBinding {
    pub letter: DriveLetter,
    pub kind: BindingKind,
}

impl LetterBinding {
    pub fn new(letter: DriveLetter, kind: BindingKind) -> Self {
        Self { letter, kind }
    }

    /// Mount point of a managed mount, `None` for anything else.
    pub fn managed_mount(&self) -> Option<MountPoint> {
        match &self.kind {
            BindingKind::Network { remote } => MountPoint::from_network_path(remote),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
pub trait DriveTable: Send + Sync {
    /// Snapshot of every assigned letter.
    async fn bindings(&self) -> Result<Vec<LetterBinding>, GoldDriveError>;
}

#[async_trait::async_trait]
pub trait MountTransport: Send + Sync {
    async fn bind(&self, letter: DriveLetter, mount_point: &MountPoint) -> Result<(), GoldDriveError>;
    async fn unbind(&self, letter: DriveLetter) -> Result<(), GoldDriveError>;
}

#[async_trait::async_trait]
pub trait ShellLabels: Send + Sync {
    async fn get_label(&self, letter: DriveLetter) -> Result<Option<String>, GoldDriveError>;
    async fn set_label(
        &self,
        letter: DriveLetter,
        mount_point: &MountPoint,
        label: &str,
    ) -> Result<(), GoldDriveError>;
}
