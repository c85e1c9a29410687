pub mod config;
pub mod drive;
pub mod error;
pub mod label;
pub mod orchestrator;
pub mod policy;
pub mod probe;
pub mod settings;
pub mod table;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::GoldDriveConfig;
pub use drive::{Drive, DriveLetter, DriveStatus, MountPoint};
pub use error::GoldDriveError;
pub use label::DriveLabelAdapter;
pub use orchestrator::{LetterLocks, MountOrchestrator};
pub use policy::LetterPolicy;
pub use probe::{classify, DriveStatusProbe};
pub use settings::{Settings, SettingsStore};
pub use table::{BindingKind, DriveTable, LetterBinding, MountTransport, ShellLabels};
