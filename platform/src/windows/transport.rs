use super::run_hidden;
use golddrive_core::{DriveLetter, GoldDriveError, MountPoint, MountTransport};

/// Mounts through the golddrive network provider with `net use`.
pub struct NetUseTransport;

impl NetUseTransport {
    async fn net_use(args: Vec<String>) -> Result<(), GoldDriveError> {
        let output = tokio::task::spawn_blocking(move || run_hidden("net", &args))
            .await
            .map_err(|e| GoldDriveError::External(format!("net use task failed: {}", e)))??;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = if stderr.trim().is_empty() { stdout } else { stderr };
            Err(GoldDriveError::External(format!(
                "net use exited with {}: {}",
                output.status,
                message.trim()
            )))
        }
    }
}

#[async_trait::async_trait]
impl MountTransport for NetUseTransport {
    async fn bind(&self, letter: DriveLetter, mount_point: &MountPoint) -> Result<(), GoldDriveError> {
        let remote = mount_point.network_path();
        log::info!("net use {} {}", letter, remote);
        Self::net_use(vec![
            "use".to_string(),
            letter.name(),
            remote,
            "/persistent:no".to_string(),
        ])
        .await
    }

    async fn unbind(&self, letter: DriveLetter) -> Result<(), GoldDriveError> {
        log::info!("net use {} /delete", letter);
        Self::net_use(vec![
            "use".to_string(),
            letter.name(),
            "/delete".to_string(),
            "/y".to_string(),
        ])
        .await
    }
}
