/// Test doubles for the OS drive table, the mount transport and the shell.
/// Nothing here touches real drive letters.
use crate::drive::{DriveLetter, MountPoint};
use crate::error::GoldDriveError;
use crate::table::{BindingKind, DriveTable, LetterBinding, MountTransport, ShellLabels};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct TableState {
    bindings: BTreeMap<DriveLetter, BindingKind>,
    failing: bool,
    reads: usize,
}

/// In-memory drive table. Clones share the same state.
#[derive(Clone, Default)]
pub struct MockDriveTable {
    state: Arc<Mutex<TableState>>,
}

impl MockDriveTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with a system volume on C:.
    pub fn with_system_volume() -> Self {
        let table = Self::new();
        table.add_volume(letter('C'));
        table
    }

    pub fn add_volume(&self, letter: DriveLetter) {
        self.set(letter, BindingKind::Volume);
    }

    /// Same as `subst W: <target>`.
    pub fn substitute(&self, letter: DriveLetter, target: impl Into<String>) {
        self.set(letter, BindingKind::Substitution { target: target.into() });
    }

    pub fn connect_network(&self, letter: DriveLetter, remote: impl Into<String>) {
        self.set(letter, BindingKind::Network { remote: remote.into() });
    }

    pub fn remove(&self, letter: DriveLetter) -> Option<BindingKind> {
        self.state.lock().unwrap().bindings.remove(&letter)
    }

    pub fn binding(&self, letter: DriveLetter) -> Option<BindingKind> {
        self.state.lock().unwrap().bindings.get(&letter).cloned()
    }

    /// Make every read fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    fn set(&self, letter: DriveLetter, kind: BindingKind) {
        self.state.lock().unwrap().bindings.insert(letter, kind);
    }
}

#[async_trait::async_trait]
impl DriveTable for MockDriveTable {
    async fn bindings(&self) -> Result<Vec<LetterBinding>, GoldDriveError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if state.failing {
            return Err(GoldDriveError::ProbeFailed("mock drive table unavailable".to_string()));
        }
        Ok(state
            .bindings
            .iter()
            .map(|(letter, kind)| LetterBinding::new(*letter, kind.clone()))
            .collect())
    }
}

/// How the next transport calls misbehave.
#[derive(Debug, Clone, Default)]
pub struct TransportBehaviour {
    pub fail_bind: bool,
    /// Bind reports failure but leaves the mount in place.
    pub fail_bind_after_mounting: bool,
    pub fail_unbind: bool,
    pub delay: Option<Duration>,
}

/// Mount transport that writes managed network bindings into a [`MockDriveTable`].
///
/// Endpoints can be backed by local directories so tests can do file I/O
/// through a "mounted" drive.
#[derive(Clone)]
pub struct MockTransport {
    table: MockDriveTable,
    behaviour: Arc<Mutex<TransportBehaviour>>,
    calls: Arc<Mutex<Vec<String>>>,
    backing: Arc<Mutex<HashMap<String, PathBuf>>>,
}

impl MockTransport {
    pub fn new(table: MockDriveTable) -> Self {
        Self {
            table,
            behaviour: Arc::new(Mutex::new(TransportBehaviour::default())),
            calls: Arc::new(Mutex::new(Vec::new())),
            backing: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn set_behaviour(&self, behaviour: TransportBehaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Serve `mount_point` from `dir`.
    pub fn back_with(&self, mount_point: &MountPoint, dir: &Path) {
        self.backing
            .lock()
            .unwrap()
            .insert(mount_point.network_path().to_lowercase(), dir.to_path_buf());
    }

    /// Local directory behind whatever is mounted on `letter`.
    pub fn mounted_root(&self, letter: DriveLetter) -> Option<PathBuf> {
        match self.table.binding(letter)? {
            BindingKind::Network { remote } => self.backing.lock().unwrap().get(&remote.to_lowercase()).cloned(),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl MountTransport for MockTransport {
    async fn bind(&self, letter: DriveLetter, mount_point: &MountPoint) -> Result<(), GoldDriveError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("bind {} {}", letter, mount_point.network_path()));

        let behaviour = self.behaviour.lock().unwrap().clone();
        if let Some(delay) = behaviour.delay {
            tokio::time::sleep(delay).await;
        }

        if behaviour.fail_bind {
            return Err(GoldDriveError::External("mock bind failure".to_string()));
        }
        if self.table.binding(letter).is_some() {
            return Err(GoldDriveError::External(format!("{} is already assigned", letter)));
        }

        self.table.connect_network(letter, mount_point.network_path());
        if behaviour.fail_bind_after_mounting {
            return Err(GoldDriveError::External("mock bind failure after mounting".to_string()));
        }
        Ok(())
    }

    async fn unbind(&self, letter: DriveLetter) -> Result<(), GoldDriveError> {
        self.calls.lock().unwrap().push(format!("unbind {}", letter));

        let behaviour = self.behaviour.lock().unwrap().clone();
        if let Some(delay) = behaviour.delay {
            tokio::time::sleep(delay).await;
        }
        if behaviour.fail_unbind {
            return Err(GoldDriveError::External("mock unbind failure".to_string()));
        }

        match self.table.binding(letter) {
            Some(BindingKind::Network { .. }) => {
                self.table.remove(letter);
                Ok(())
            }
            _ => Err(GoldDriveError::External(format!("{} is not a network drive", letter))),
        }
    }
}

/// Explorer labels kept in memory.
#[derive(Clone, Default)]
pub struct MockShellLabels {
    labels: Arc<Mutex<HashMap<DriveLetter, String>>>,
    writes: Arc<Mutex<usize>>,
}

impl MockShellLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl ShellLabels for MockShellLabels {
    async fn get_label(&self, letter: DriveLetter) -> Result<Option<String>, GoldDriveError> {
        Ok(self.labels.lock().unwrap().get(&letter).cloned())
    }

    async fn set_label(
        &self,
        letter: DriveLetter,
        _mount_point: &MountPoint,
        label: &str,
    ) -> Result<(), GoldDriveError> {
        *self.writes.lock().unwrap() += 1;
        self.labels.lock().unwrap().insert(letter, label.to_string());
        Ok(())
    }
}

/// Shorthand for tests: panics on anything that is not a letter.
pub fn letter(c: char) -> DriveLetter {
    DriveLetter::new(c).unwrap()
}
