/// Mount manager behaviour against an in-memory drive table.
/// Mirrors what the live Windows suite checks, without touching real letters.
use golddrive_core::test_utils::{letter, MockDriveTable, MockShellLabels, MockTransport, TransportBehaviour};
use golddrive_core::{
    Drive, DriveLabelAdapter, DriveStatus, DriveStatusProbe, GoldDriveError, LetterPolicy, MountOrchestrator,
    MountPoint, Settings, SettingsStore,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const HOST: &str = "tester@sshserver!22";

struct Harness {
    table: MockDriveTable,
    transport: MockTransport,
    labels: MockShellLabels,
    orchestrator: MountOrchestrator,
    adapter: DriveLabelAdapter,
}

fn harness_with_timeout(timeout: Duration) -> Harness {
    let table = MockDriveTable::with_system_volume();
    let transport = MockTransport::new(table.clone());
    let labels = MockShellLabels::new();
    let probe = DriveStatusProbe::new(
        Arc::new(table.clone()),
        LetterPolicy::new([letter('A'), letter('B'), letter('C')]),
    );
    let orchestrator = MountOrchestrator::new(probe.clone(), Arc::new(transport.clone())).with_timeout(timeout);
    let adapter = DriveLabelAdapter::new(probe, Arc::new(labels.clone()));

    Harness {
        table,
        transport,
        labels,
        orchestrator,
        adapter,
    }
}

fn harness() -> Harness {
    harness_with_timeout(Duration::from_secs(5))
}

fn golddrive() -> Drive {
    Drive::new(letter('X'), HOST).with_label("Golddrive")
}

fn sha256_file(path: &Path) -> String {
    hex::encode(Sha256::digest(fs::read(path).unwrap()))
}

#[tokio::test]
async fn test_unmount_when_disconnected_is_a_no_op() {
    let h = harness();
    let mut drive = golddrive();

    assert_eq!(h.orchestrator.unmount(&mut drive).await.unwrap(), DriveStatus::Disconnected);
    assert_eq!(h.orchestrator.unmount(&mut drive).await.unwrap(), DriveStatus::Disconnected);
    assert_eq!(drive.status, DriveStatus::Disconnected);
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_mount_unmount_round_trip() {
    let h = harness();
    let mut drive = golddrive();

    assert_eq!(h.orchestrator.connect(&mut drive).await.unwrap(), DriveStatus::Connected);
    assert_eq!(drive.status, DriveStatus::Connected);
    assert_eq!(h.orchestrator.probe().status(&drive).await.unwrap(), DriveStatus::Connected);

    assert_eq!(h.orchestrator.unmount(&mut drive).await.unwrap(), DriveStatus::Disconnected);
    assert_eq!(drive.status, DriveStatus::Disconnected);
    assert!(h.table.binding(letter('X')).is_none());
    assert_eq!(
        h.transport.calls(),
        vec![r"bind X: \\golddrive\tester@sshserver!22".to_string(), "unbind X:".to_string()]
    );
}

#[tokio::test]
async fn test_connect_on_connected_drive_reports_connected() {
    let h = harness();
    let mut drive = golddrive();
    h.orchestrator.connect(&mut drive).await.unwrap();

    let mut again = golddrive();
    assert_eq!(h.orchestrator.connect(&mut again).await.unwrap(), DriveStatus::Connected);
    assert_eq!(h.transport.call_count(), 1);
}

#[tokio::test]
async fn test_free_and_used_drives_follow_the_mount() {
    let h = harness();
    let mut drive = golddrive();
    h.orchestrator.connect(&mut drive).await.unwrap();

    let free = h.orchestrator.free_drives().await.unwrap();
    let used = h.orchestrator.used_drives().await.unwrap();
    assert!(free.iter().all(|d| d.name() != "X:"));
    let x = used.iter().find(|d| d.name() == "X:").expect("X: should be used");
    assert_eq!(x.status, DriveStatus::Connected);
    assert!(x.is_managed);

    h.orchestrator.unmount(&mut drive).await.unwrap();

    let free = h.orchestrator.free_drives().await.unwrap();
    let used = h.orchestrator.used_drives().await.unwrap();
    assert!(free.iter().any(|d| d.name() == "X:"));
    assert!(used.iter().all(|d| d.name() != "X:"));
}

#[tokio::test]
async fn test_sweep_skips_reserved_letters_and_reports_foreign_ones() {
    let h = harness();
    h.table.substitute(letter('W'), r"C:\Users\tester\AppData\Local\golddrive");

    let free = h.orchestrator.free_drives().await.unwrap();
    let used = h.orchestrator.used_drives().await.unwrap();
    for reserved in ["A:", "B:", "C:"] {
        assert!(free.iter().chain(used.iter()).all(|d| d.name() != reserved));
    }
    let w = used.iter().find(|d| d.name() == "W:").unwrap();
    assert_eq!(w.status, DriveStatus::InUse);
    assert_eq!(free.len() + used.len(), 23);
}

#[tokio::test]
async fn test_check_drive_status() {
    let h = harness();
    h.table.substitute(letter('W'), r"C:\Users\tester\AppData\Local\golddrive");

    let c = Drive::new(letter('C'), "sshserver");
    let w = Drive::new(letter('W'), "sshserver");
    let probe = h.orchestrator.probe();
    assert_eq!(probe.status(&c).await.unwrap(), DriveStatus::NotSupported);
    assert_eq!(probe.status(&w).await.unwrap(), DriveStatus::InUse);

    let mut drive = golddrive();
    assert_eq!(probe.status(&drive).await.unwrap(), DriveStatus::Disconnected);
    h.orchestrator.connect(&mut drive).await.unwrap();
    assert_eq!(probe.status(&drive).await.unwrap(), DriveStatus::Connected);

    let mut t = Drive::new(letter('T'), HOST);
    assert_eq!(probe.status(&t).await.unwrap(), DriveStatus::MountpointInUse);
    assert_eq!(h.orchestrator.connect(&mut t).await.unwrap(), DriveStatus::MountpointInUse);
    assert_eq!(t.status, DriveStatus::MountpointInUse);
    assert_eq!(h.transport.call_count(), 1);

    h.orchestrator.unmount(&mut drive).await.unwrap();
    assert_eq!(probe.status(&t).await.unwrap(), DriveStatus::Disconnected);
    h.table.remove(letter('W'));
    assert_eq!(probe.status(&w).await.unwrap(), DriveStatus::Disconnected);
}

#[tokio::test]
async fn test_host_without_user_is_the_same_endpoint_as_current_user() {
    let h = harness();
    let me = MountPoint::parse("sshserver").unwrap().user;

    let mut x = Drive::new(letter('X'), "sshserver");
    assert_eq!(h.orchestrator.connect(&mut x).await.unwrap(), DriveStatus::Connected);

    let mut t = Drive::new(letter('T'), format!("{}@sshserver", me));
    assert_eq!(h.orchestrator.connect(&mut t).await.unwrap(), DriveStatus::MountpointInUse);
    assert_eq!(h.transport.calls(), vec![format!(r"bind X: \\golddrive\{}@sshserver!22", me)]);
    assert!(h.table.binding(letter('T')).is_none());
}

#[tokio::test]
async fn test_reserved_letter_is_never_mounted() {
    let h = harness();
    h.table.remove(letter('C'));

    let mut c = Drive::new(letter('C'), HOST);
    assert_eq!(h.orchestrator.connect(&mut c).await.unwrap(), DriveStatus::NotSupported);
    assert_eq!(h.orchestrator.unmount(&mut c).await.unwrap(), DriveStatus::NotSupported);
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_substituted_letter_is_in_use_even_for_configured_host() {
    let h = harness();
    h.table.substitute(letter('X'), r"C:\temp");

    let mut drive = golddrive();
    assert_eq!(h.orchestrator.connect(&mut drive).await.unwrap(), DriveStatus::InUse);
    assert_eq!(h.orchestrator.unmount(&mut drive).await.unwrap(), DriveStatus::InUse);
    assert_eq!(h.transport.call_count(), 0);
    assert!(h.table.binding(letter('X')).is_some());
}

#[tokio::test]
async fn test_set_and_get_drive_label() {
    let h = harness();
    let mut drive = golddrive();
    let original = drive.label.clone();

    assert_eq!(h.adapter.get_label(&drive).await.unwrap(), None);
    assert_eq!(h.adapter.set_label(&mut drive, "NEWLABEL").await.unwrap(), DriveStatus::Disconnected);
    assert_eq!(drive.label, original);
    assert_eq!(h.labels.write_count(), 0);

    h.orchestrator.connect(&mut drive).await.unwrap();
    assert_eq!(h.adapter.set_label(&mut drive, "NEWLABEL").await.unwrap(), DriveStatus::Connected);
    assert_eq!(h.adapter.get_label(&drive).await.unwrap().as_deref(), Some("NEWLABEL"));
    assert_eq!(drive.label, "NEWLABEL");
    assert_eq!(h.orchestrator.probe().status(&drive).await.unwrap(), DriveStatus::Connected);

    h.orchestrator.unmount(&mut drive).await.unwrap();
    assert_eq!(h.adapter.get_label(&drive).await.unwrap(), None);
}

#[tokio::test]
async fn test_transport_failure_leaves_letter_free() {
    let h = harness();
    h.transport.set_behaviour(TransportBehaviour {
        fail_bind: true,
        ..Default::default()
    });

    let mut drive = golddrive();
    match h.orchestrator.connect(&mut drive).await {
        Err(GoldDriveError::MountFailure { letter: l, mount_point, cause }) => {
            assert_eq!(l, letter('X'));
            assert_eq!(mount_point, HOST);
            assert!(cause.contains("mock bind failure"));
        }
        other => panic!("expected MountFailure, got {:?}", other),
    }
    assert_eq!(drive.status, DriveStatus::Disconnected);
    assert!(h.table.binding(letter('X')).is_none());
}

#[tokio::test]
async fn test_partial_mount_is_rolled_back() {
    let h = harness();
    h.transport.set_behaviour(TransportBehaviour {
        fail_bind_after_mounting: true,
        ..Default::default()
    });

    let mut drive = golddrive();
    let err = h.orchestrator.connect(&mut drive).await.unwrap_err();
    assert!(matches!(err, GoldDriveError::MountFailure { .. }));
    assert!(h.table.binding(letter('X')).is_none());
    assert_eq!(drive.status, DriveStatus::Disconnected);
    assert_eq!(h.transport.calls().last().map(String::as_str), Some("unbind X:"));
}

#[tokio::test]
async fn test_unmount_failure_reports_drive_still_connected() {
    let h = harness();
    let mut drive = golddrive();
    h.orchestrator.connect(&mut drive).await.unwrap();

    h.transport.set_behaviour(TransportBehaviour {
        fail_unbind: true,
        ..Default::default()
    });
    let err = h.orchestrator.unmount(&mut drive).await.unwrap_err();
    assert!(matches!(
        err,
        GoldDriveError::UnmountFailure {
            status: DriveStatus::Connected,
            ..
        }
    ));
    assert_eq!(err.status(), Some(DriveStatus::Connected));
    assert_eq!(drive.status, DriveStatus::Connected);

    h.transport.set_behaviour(TransportBehaviour::default());
    assert_eq!(h.orchestrator.unmount(&mut drive).await.unwrap(), DriveStatus::Disconnected);
}

#[tokio::test]
async fn test_unreadable_drive_table_fails_the_operation() {
    let h = harness();
    h.table.set_failing(true);

    let mut drive = golddrive();
    assert!(matches!(
        h.orchestrator.connect(&mut drive).await,
        Err(GoldDriveError::ProbeFailed(_))
    ));
    assert!(matches!(
        h.orchestrator.free_drives().await,
        Err(GoldDriveError::ProbeFailed(_))
    ));
    assert_eq!(h.transport.call_count(), 0);
}

#[tokio::test]
async fn test_slow_bind_times_out_and_is_undone() {
    let h = harness_with_timeout(Duration::from_millis(50));
    h.transport.set_behaviour(TransportBehaviour {
        delay: Some(Duration::from_millis(200)),
        ..Default::default()
    });

    let mut drive = golddrive();
    let err = h.orchestrator.connect(&mut drive).await.unwrap_err();
    match &err {
        GoldDriveError::MountFailure { cause, .. } => assert!(cause.contains("timed out"), "cause: {}", cause),
        other => panic!("expected MountFailure, got {:?}", other),
    }
    h.transport.set_behaviour(TransportBehaviour::default());

    // Waits for the stray bind and its rollback before it can start.
    assert_eq!(h.orchestrator.connect(&mut drive).await.unwrap(), DriveStatus::Connected);
    let calls = h.transport.calls();
    assert_eq!(calls.len(), 3, "calls: {:?}", calls);
    assert!(calls[0].starts_with("bind X:"));
    assert_eq!(calls[1], "unbind X:");
    assert!(calls[2].starts_with("bind X:"));
}

#[tokio::test]
async fn test_same_letter_connects_are_serialized() {
    let h = harness();
    h.transport.set_behaviour(TransportBehaviour {
        delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });

    let mut first = golddrive();
    let mut second = golddrive();
    let (a, b) = tokio::join!(
        h.orchestrator.connect(&mut first),
        h.orchestrator.connect(&mut second)
    );
    assert_eq!(a.unwrap(), DriveStatus::Connected);
    assert_eq!(b.unwrap(), DriveStatus::Connected);
    assert_eq!(h.transport.call_count(), 1);
}

#[tokio::test]
async fn test_different_letters_mount_independently() {
    let h = harness();
    let mut x = golddrive();
    let mut y = Drive::new(letter('Y'), "tester@otherserver");

    let (a, b) = tokio::join!(h.orchestrator.connect(&mut x), h.orchestrator.connect(&mut y));
    assert_eq!(a.unwrap(), DriveStatus::Connected);
    assert_eq!(b.unwrap(), DriveStatus::Connected);

    let used = h.orchestrator.used_drives().await.unwrap();
    assert!(used.iter().any(|d| d.name() == "X:"));
    assert!(used.iter().any(|d| d.name() == "Y:"));
}

#[tokio::test]
async fn test_make_many_dirs_through_mount() {
    let h = harness();
    let remote = tempfile::tempdir().unwrap();
    h.transport.back_with(&MountPoint::parse(HOST).unwrap(), remote.path());

    let mut drive = golddrive();
    h.orchestrator.connect(&mut drive).await.unwrap();
    let root = h.transport.mounted_root(letter('X')).unwrap();

    for f in 1..=1000 {
        let path = root.join("tmp").join(format!("folder_{}", f));
        fs::create_dir_all(&path).unwrap();
        assert!(path.is_dir());
        if f % 100 == 0 {
            assert_eq!(h.orchestrator.check_status(&mut drive).await.unwrap(), DriveStatus::Connected);
        }
    }
    for f in 1..=1000 {
        let path = root.join("tmp").join(format!("folder_{}", f));
        fs::remove_dir(&path).unwrap();
        assert!(!path.exists());
        if f % 100 == 0 {
            assert_eq!(h.orchestrator.check_status(&mut drive).await.unwrap(), DriveStatus::Connected);
        }
    }

    h.orchestrator.unmount(&mut drive).await.unwrap();
    assert!(h.transport.mounted_root(letter('X')).is_none());
}

#[tokio::test]
async fn test_copied_file_keeps_its_hash() {
    let h = harness();
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    h.transport.back_with(&MountPoint::parse(HOST).unwrap(), remote.path());

    let mut drive = golddrive();
    h.orchestrator.connect(&mut drive).await.unwrap();
    let root = h.transport.mounted_root(letter('X')).unwrap();

    let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
    let data: Vec<u8> = (0..4 * 1024 * 1024)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect();

    let original = local.path().join("file_random.bin");
    fs::write(&original, &data).unwrap();
    let hash1 = sha256_file(&original);

    let on_drive = root.join("test").join("file_random.bin");
    fs::create_dir_all(on_drive.parent().unwrap()).unwrap();
    fs::copy(&original, &on_drive).unwrap();

    let copied_back = local.path().join("file_random_back.bin");
    fs::copy(&on_drive, &copied_back).unwrap();
    let hash2 = sha256_file(&copied_back);

    assert_eq!(hash1, hash2);
    assert_eq!(hash1, hex::encode(Sha256::digest(&data)));
    assert_eq!(h.orchestrator.check_status(&mut drive).await.unwrap(), DriveStatus::Connected);

    h.orchestrator.unmount(&mut drive).await.unwrap();
}

#[tokio::test]
async fn test_configured_drive_survives_restart_and_mounts() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let store = SettingsStore::new(dir.path().join("config.json"));

    let mut settings = store.load().unwrap();
    assert_eq!(settings.len(), 0);
    settings.add_drives(vec![golddrive()]);
    store.save(&settings).unwrap();

    let settings: Settings = store.load().unwrap();
    assert_eq!(settings.len(), 1);
    let mut drive = settings.drive(letter('X')).unwrap().clone();
    assert_eq!(drive.name(), golddrive().name());
    assert_eq!(drive.mount_point, HOST);

    assert_eq!(h.orchestrator.connect(&mut drive).await.unwrap(), DriveStatus::Connected);
    h.orchestrator.unmount(&mut drive).await.unwrap();
}
