use golddrive_core::{BindingKind, DriveLetter, DriveTable, GoldDriveError, LetterBinding};
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use windows::core::{PCWSTR, PWSTR};
use windows::Win32::Foundation::NO_ERROR;
use windows::Win32::NetworkManagement::WNet::WNetGetConnectionW;
use windows::Win32::Storage::FileSystem::{GetLogicalDrives, QueryDosDeviceW};

/// Substituted drives resolve to `\??\<path>` in the DOS device namespace.
const SUBST_PREFIX: &str = r"\??\";

fn wide(s: &str) -> Vec<u16> {
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}

fn from_wide(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

/// Remote name of a network connection on `letter`, if there is one.
pub(crate) fn remote_name(letter: DriveLetter) -> Option<String> {
    let local = wide(&letter.name());
    let mut buf = vec![0u16; 1024];
    let mut len = buf.len() as u32;

    let rc = unsafe { WNetGetConnectionW(PCWSTR::from_raw(local.as_ptr()), PWSTR::from_raw(buf.as_mut_ptr()), &mut len) };
    if rc == NO_ERROR {
        Some(from_wide(&buf))
    } else {
        None
    }
}

fn dos_device(letter: DriveLetter) -> Option<String> {
    let device = wide(&letter.name());
    let mut buf = vec![0u16; 1024];

    let written = unsafe { QueryDosDeviceW(PCWSTR::from_raw(device.as_ptr()), Some(buf.as_mut_slice())) };
    if written == 0 {
        None
    } else {
        Some(from_wide(&buf))
    }
}

/// Live view of assigned drive letters.
pub struct WindowsDriveTable;

impl WindowsDriveTable {
    fn classify(letter: DriveLetter) -> BindingKind {
        if let Some(remote) = remote_name(letter) {
            return BindingKind::Network { remote };
        }
        match dos_device(letter) {
            Some(target) if target.starts_with(SUBST_PREFIX) => BindingKind::Substitution {
                target: target[SUBST_PREFIX.len()..].to_string(),
            },
            _ => BindingKind::Volume,
        }
    }
}

#[async_trait::async_trait]
impl DriveTable for WindowsDriveTable {
    async fn bindings(&self) -> Result<Vec<LetterBinding>, GoldDriveError> {
        let mask = unsafe { GetLogicalDrives() };
        if mask == 0 {
            return Err(GoldDriveError::ProbeFailed(format!(
                "GetLogicalDrives failed: {}",
                std::io::Error::last_os_error()
            )));
        }

        let bindings: Vec<LetterBinding> = DriveLetter::all()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, letter)| LetterBinding::new(letter, Self::classify(letter)))
            .collect();

        log::debug!("drive table: {} letter(s) assigned", bindings.len());
        Ok(bindings)
    }
}
