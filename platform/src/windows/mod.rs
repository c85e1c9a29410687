pub mod drive_table;
pub mod labels;
pub mod transport;

pub use drive_table::WindowsDriveTable;
pub use labels::RegistryLabels;
pub use transport::NetUseTransport;

use golddrive_core::GoldDriveError;
use std::os::windows::process::CommandExt;
use std::process::{Command, Output};

const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Run a console tool without flashing a window.
pub(crate) fn run_hidden(program: &str, args: &[String]) -> Result<Output, GoldDriveError> {
    Command::new(program)
        .args(args)
        .creation_flags(CREATE_NO_WINDOW)
        .output()
        .map_err(|e| GoldDriveError::External(format!("Failed to run {}: {}", program, e)))
}
