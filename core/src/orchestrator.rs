//! Connect and unmount transitions.
//!
//! Each transition holds the letter's lock for its whole read-then-act cycle:
//! probe, transport call, re-probe. Refusals are not errors; the caller gets
//! the observed status back and the drive is stamped with it.

use crate::drive::{Drive, DriveLetter, DriveStatus, MountPoint};
use crate::error::{GoldDriveError, Result};
use crate::probe::DriveStatusProbe;
use crate::table::MountTransport;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(30);

/// One async lock per drive letter, created on first use.
#[derive(Default)]
pub struct LetterLocks {
    locks: Mutex<HashMap<DriveLetter, Arc<AsyncMutex<()>>>>,
}

impl LetterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, letter: DriveLetter) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(letter).or_default().clone()
        };
        lock.lock_owned().await
    }
}

enum TransportCall {
    Bind(MountPoint),
    Unbind,
}

pub struct MountOrchestrator {
    probe: DriveStatusProbe,
    transport: Arc<dyn MountTransport>,
    locks: LetterLocks,
    timeout: Duration,
}

impl MountOrchestrator {
    pub fn new(probe: DriveStatusProbe, transport: Arc<dyn MountTransport>) -> Self {
        Self {
            probe,
            transport,
            locks: LetterLocks::new(),
            timeout: DEFAULT_TRANSPORT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn probe(&self) -> &DriveStatusProbe {
        &self.probe
    }

    /// Probe `drive` and stamp the result onto it.
    pub async fn check_status(&self, drive: &mut Drive) -> Result<DriveStatus> {
        let probed = self.probe.probe(drive).await?;
        drive.status = probed.status;
        drive.is_managed = probed.is_managed;
        Ok(drive.status)
    }

    pub async fn connect(&self, drive: &mut Drive) -> Result<DriveStatus> {
        let letter = drive.letter();
        let guard = self.locks.acquire(letter).await;

        let status = self.probe.status(drive).await?;
        drive.status = status;
        if status != DriveStatus::Disconnected {
            tracing::info!("not mounting {}: drive is {}", drive.name(), status);
            return Ok(status);
        }

        let mount_point = drive.endpoint()?.ok_or_else(|| {
            GoldDriveError::InvalidMountPoint(format!("{} has no mount point", drive.name()))
        })?;

        tracing::info!("mounting {} on {}", mount_point, drive.name());
        let (outcome, guard) = self
            .run_transport(TransportCall::Bind(mount_point.clone()), letter, guard)
            .await;

        let after = self.probe.status(drive).await?;
        drive.status = after;

        let cause = match outcome {
            Ok(()) if after == DriveStatus::Connected => {
                tracing::info!("mounted {} on {}", mount_point, drive.name());
                return Ok(after);
            }
            Ok(()) => format!("transport reported success but drive is {}", after),
            Err(cause) => {
                // A failed bind that still left our mount behind is undone here.
                // After a timeout the background task owns the letter and does it.
                if guard.is_some() && after == DriveStatus::Connected {
                    tracing::warn!("rolling back partial mount on {}", drive.name());
                    if let Err(e) = self.transport.unbind(letter).await {
                        tracing::warn!("rollback of {} failed: {}", drive.name(), e);
                    }
                    drive.status = self.probe.status(drive).await?;
                }
                cause
            }
        };

        drop(guard);
        Err(GoldDriveError::MountFailure {
            letter,
            mount_point: drive.mount_point.clone(),
            cause,
        })
    }

    /// Unmounting anything that is not CONNECTED is a no-op reporting the
    /// current status.
    pub async fn unmount(&self, drive: &mut Drive) -> Result<DriveStatus> {
        let letter = drive.letter();
        let guard = self.locks.acquire(letter).await;

        let status = self.probe.status(drive).await?;
        drive.status = status;
        if status != DriveStatus::Connected {
            tracing::debug!("nothing to unmount on {}: drive is {}", drive.name(), status);
            return Ok(status);
        }

        tracing::info!("unmounting {}", drive.name());
        let (outcome, guard) = self.run_transport(TransportCall::Unbind, letter, guard).await;

        let after = self.probe.status(drive).await?;
        drive.status = after;
        drop(guard);

        let cause = match outcome {
            Ok(()) if after == DriveStatus::Disconnected => {
                tracing::info!("unmounted {}", drive.name());
                return Ok(after);
            }
            Ok(()) => format!("transport reported success but drive is {}", after),
            Err(cause) => cause,
        };

        Err(GoldDriveError::UnmountFailure {
            letter,
            mount_point: drive.mount_point.clone(),
            status: after,
            cause,
        })
    }

    /// Mountable letters that are DISCONNECTED right now.
    pub async fn free_drives(&self) -> Result<Vec<Drive>> {
        let drives = self.probe.sweep().await?;
        Ok(drives.into_iter().filter(|d| d.status.is_available()).collect())
    }

    /// Mountable letters in any other state.
    pub async fn used_drives(&self) -> Result<Vec<Drive>> {
        let drives = self.probe.sweep().await?;
        Ok(drives.into_iter().filter(|d| !d.status.is_available()).collect())
    }

    /// Run one transport call under the timeout.
    ///
    /// Returns the guard when the call finished in time. On timeout the guard
    /// moves to a task that waits for the call to end, so the letter stays
    /// locked until then; a bind that lands late is unbound again.
    async fn run_transport(
        &self,
        call: TransportCall,
        letter: DriveLetter,
        guard: OwnedMutexGuard<()>,
    ) -> (std::result::Result<(), String>, Option<OwnedMutexGuard<()>>) {
        let is_bind = matches!(call, TransportCall::Bind(_));
        let transport = self.transport.clone();
        let mut task = tokio::spawn(async move {
            match call {
                TransportCall::Bind(mount_point) => transport.bind(letter, &mount_point).await,
                TransportCall::Unbind => transport.unbind(letter).await,
            }
        });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(Ok(result)) => (result.map_err(|e| e.to_string()), Some(guard)),
            Ok(Err(join_error)) => (Err(format!("transport task failed: {}", join_error)), Some(guard)),
            Err(_) => {
                tracing::warn!("transport call on {} exceeded {:?}", letter, self.timeout);
                let transport = self.transport.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    if let Ok(Ok(())) = task.await {
                        if is_bind {
                            tracing::warn!("late mount on {} completed, unbinding", letter);
                            if let Err(e) = transport.unbind(letter).await {
                                tracing::warn!("unbinding late mount on {} failed: {}", letter, e);
                            }
                        }
                    }
                });
                (Err(format!("timed out after {:?}", self.timeout)), None)
            }
        }
    }
}
