#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod unsupported;

#[cfg(target_os = "windows")]
pub use self::windows::{
    NetUseTransport as PlatformTransport, RegistryLabels as PlatformLabels,
    WindowsDriveTable as PlatformDriveTable,
};

#[cfg(not(target_os = "windows"))]
pub use self::unsupported::{
    UnsupportedDriveTable as PlatformDriveTable, UnsupportedLabels as PlatformLabels,
    UnsupportedTransport as PlatformTransport,
};
