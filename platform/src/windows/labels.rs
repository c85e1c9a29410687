use super::drive_table::remote_name;
use super::run_hidden;
use golddrive_core::{DriveLetter, GoldDriveError, MountPoint, ShellLabels};

const MOUNT_POINTS_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\MountPoints2";
const LABEL_VALUE: &str = "_LabelFromReg";

fn label_key(registry_key: &str) -> String {
    format!(r"{}\{}", MOUNT_POINTS_KEY, registry_key)
}

/// Value of `_LabelFromReg` in `reg query` output.
fn parse_label(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let line = line.trim();
        let rest = line.strip_prefix(LABEL_VALUE)?.trim_start();
        let value = rest.strip_prefix("REG_SZ")?;
        Some(value.trim().to_string())
    })
}

/// Explorer labels of network drives, kept under `MountPoints2` in the registry.
pub struct RegistryLabels;

#[async_trait::async_trait]
impl ShellLabels for RegistryLabels {
    async fn get_label(&self, letter: DriveLetter) -> Result<Option<String>, GoldDriveError> {
        let Some(remote) = remote_name(letter) else {
            return Ok(None);
        };
        let key = label_key(&remote.replace('\\', "#"));

        let output = tokio::task::spawn_blocking(move || {
            run_hidden("reg", &["query".to_string(), key, "/v".to_string(), LABEL_VALUE.to_string()])
        })
        .await
        .map_err(|e| GoldDriveError::External(format!("reg query task failed: {}", e)))??;

        if !output.status.success() {
            return Ok(None);
        }
        Ok(parse_label(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn set_label(
        &self,
        letter: DriveLetter,
        mount_point: &MountPoint,
        label: &str,
    ) -> Result<(), GoldDriveError> {
        let key = label_key(&mount_point.registry_key());
        log::info!("setting label of {} to '{}'", letter, label);

        let args = vec![
            "add".to_string(),
            key,
            "/v".to_string(),
            LABEL_VALUE.to_string(),
            "/t".to_string(),
            "REG_SZ".to_string(),
            "/d".to_string(),
            label.to_string(),
            "/f".to_string(),
        ];
        let output = tokio::task::spawn_blocking(move || run_hidden("reg", &args))
            .await
            .map_err(|e| GoldDriveError::External(format!("reg add task failed: {}", e)))??;

        if output.status.success() {
            Ok(())
        } else {
            Err(GoldDriveError::External(format!(
                "reg add exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}
