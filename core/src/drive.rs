//! Drive records and the values they are built from.

use crate::error::{GoldDriveError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix every network path created by this tool starts with.
pub const NETWORK_PREFIX: &str = r"\\golddrive\";

pub const DEFAULT_PORT: u16 = 22;

/// Environment variables naming the current user, in lookup order.
const USER_VARS: [&str; 2] = ["USERNAME", "USER"];

/// A validated, uppercase Windows drive letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DriveLetter(char);

impl DriveLetter {
    pub fn new(c: char) -> Result<Self> {
        if c.is_ascii_alphabetic() {
            Ok(Self(c.to_ascii_uppercase()))
        } else {
            Err(GoldDriveError::InvalidLetter(c.to_string()))
        }
    }

    pub fn as_char(self) -> char {
        self.0
    }

    /// Settings key and display form, e.g. `X:`.
    pub fn name(self) -> String {
        format!("{}:", self.0)
    }

    pub fn root(self) -> PathBuf {
        PathBuf::from(format!("{}:\\", self.0))
    }

    /// Every letter from A to Z.
    pub fn all() -> impl Iterator<Item = DriveLetter> {
        ('A'..='Z').map(DriveLetter)
    }
}

impl FromStr for DriveLetter {
    type Err = GoldDriveError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s
            .trim()
            .trim_end_matches(|c: char| c == '\\' || c == '/');
        let trimmed = trimmed.strip_suffix(':').unwrap_or(trimmed);

        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => DriveLetter::new(c).map_err(|_| GoldDriveError::InvalidLetter(s.to_string())),
            _ => Err(GoldDriveError::InvalidLetter(s.to_string())),
        }
    }
}

impl TryFrom<String> for DriveLetter {
    type Error = GoldDriveError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DriveLetter> for String {
    fn from(letter: DriveLetter) -> Self {
        letter.0.to_string()
    }
}

impl fmt::Display for DriveLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.0)
    }
}

/// Where a letter stands right now. Always derived from a probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriveStatus {
    /// Letter is free and the mount point is not claimed elsewhere.
    #[default]
    Disconnected,
    /// Letter is bound to this mount point by a managed mount.
    Connected,
    /// Letter is bound by something this tool did not create for this mount point.
    InUse,
    /// Letter is reserved and can never be mounted.
    NotSupported,
    /// Mount point is already mounted under another letter.
    MountpointInUse,
}

impl DriveStatus {
    pub fn is_available(self) -> bool {
        self == DriveStatus::Disconnected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DriveStatus::Disconnected => "DISCONNECTED",
            DriveStatus::Connected => "CONNECTED",
            DriveStatus::InUse => "IN_USE",
            DriveStatus::NotSupported => "NOT_SUPPORTED",
            DriveStatus::MountpointInUse => "MOUNTPOINT_IN_USE",
        }
    }
}

impl fmt::Display for DriveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed form of `[user@]host[!port|:port][/path]`.
///
/// A missing user is filled in with the current one, so `host` and
/// `<me>@host` name the same endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl MountPoint {
    pub fn parse(raw: &str) -> Result<Self> {
        Self::parse_with(raw, |key| std::env::var(key).ok())
    }

    /// Like [`MountPoint::parse`], with the environment read through `lookup`.
    pub fn parse_with(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let invalid = |why: &str| GoldDriveError::InvalidMountPoint(format!("'{}': {}", raw, why));

        if raw.is_empty() {
            return Err(invalid("empty"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }

        let (user, rest) = match raw.split_once('@') {
            Some((user, _)) if user.is_empty() => return Err(invalid("empty user")),
            Some((user, rest)) => (user.to_string(), rest),
            None => {
                let user = current_user(&lookup).ok_or_else(|| invalid("no user given and current user unknown"))?;
                (user, raw)
            }
        };

        let (host_port, path) = match rest.find(|c: char| c == '/' || c == '\\') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };

        let (host, port) = match host_port.split_once(|c: char| c == '!' || c == ':') {
            Some((host, port)) => {
                let port: u16 = port.parse().map_err(|_| invalid("bad port"))?;
                if port == 0 {
                    return Err(invalid("bad port"));
                }
                (host, port)
            }
            None => (host_port, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        let path = path
            .split(|c: char| c == '/' || c == '\\')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\\");

        Ok(Self {
            user,
            host: host.to_string(),
            port,
            path,
        })
    }

    /// Recover the mount point behind a managed network path, if it is one.
    pub fn from_network_path(remote: &str) -> Option<Self> {
        let head = remote.get(..NETWORK_PREFIX.len())?;
        if !head.eq_ignore_ascii_case(NETWORK_PREFIX) {
            return None;
        }
        Self::parse(&remote[NETWORK_PREFIX.len()..]).ok()
    }

    /// `\\golddrive\user@host!port\path`
    pub fn network_path(&self) -> String {
        let mut out = String::from(NETWORK_PREFIX);
        out.push_str(&self.user);
        out.push('@');
        out.push_str(&self.host);
        out.push('!');
        out.push_str(&self.port.to_string());
        if !self.path.is_empty() {
            out.push('\\');
            out.push_str(&self.path);
        }
        out
    }

    /// Explorer keys mounted shares by their network path with `\` as `#`.
    pub fn registry_key(&self) -> String {
        self.network_path().replace('\\', "#")
    }

    pub fn same_endpoint(&self, other: &MountPoint) -> bool {
        self.network_path().eq_ignore_ascii_case(&other.network_path())
    }
}

impl FromStr for MountPoint {
    type Err = GoldDriveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MountPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}!{}", self.user, self.host, self.port)?;
        if !self.path.is_empty() {
            write!(f, "\\{}", self.path)?;
        }
        Ok(())
    }
}

/// `USERNAME`, then `USER`, then the name of the home directory.
fn current_user(lookup: &impl Fn(&str) -> Option<String>) -> Option<String> {
    USER_VARS
        .iter()
        .filter_map(|key| lookup(*key))
        .map(|user| user.trim().to_string())
        .find(|user| !user.is_empty())
        .or_else(|| {
            dirs::home_dir()
                .and_then(|home| home.file_name().map(|name| name.to_string_lossy().into_owned()))
                .filter(|user| !user.is_empty())
        })
}

fn default_managed() -> bool {
    true
}

/// One drive-letter to mount-point binding and its last probed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    letter: DriveLetter,
    pub mount_point: String,
    #[serde(default)]
    pub label: String,
    #[serde(skip, default = "default_managed")]
    pub is_managed: bool,
    #[serde(skip)]
    pub status: DriveStatus,
}

impl Drive {
    pub fn new(letter: DriveLetter, mount_point: impl Into<String>) -> Self {
        let mount_point = mount_point.into();
        let label = MountPoint::parse(&mount_point)
            .map(|mp| mp.host)
            .unwrap_or_else(|_| mount_point.clone());

        Self {
            letter,
            mount_point,
            label,
            is_managed: true,
            status: DriveStatus::Disconnected,
        }
    }

    /// A drive with no target, used when only the letter matters.
    pub fn letter_only(letter: DriveLetter) -> Self {
        Self {
            letter,
            mount_point: String::new(),
            label: String::new(),
            is_managed: false,
            status: DriveStatus::Disconnected,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn letter(&self) -> DriveLetter {
        self.letter
    }

    pub fn name(&self) -> String {
        self.letter.name()
    }

    pub fn root(&self) -> PathBuf {
        self.letter.root()
    }

    /// Parsed mount point; `None` when the drive has no target.
    pub fn endpoint(&self) -> Result<Option<MountPoint>> {
        if self.mount_point.is_empty() {
            return Ok(None);
        }
        MountPoint::parse(&self.mount_point).map(Some)
    }
}
