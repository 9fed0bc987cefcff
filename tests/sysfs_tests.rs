#![cfg(all(unix, feature = "hardware-gpio"))]

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use pigpio_sysfs::{
    AppError, CommandError, Direction, GpioBackend, GpioManager, PinTable, SysfsBackend,
};
use tempfile::tempdir;

fn fake_exported_line(root: &Path, line: u32) {
    let dir = root.join(format!("gpio{line}"));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("direction"), "in\n").unwrap();
    fs::write(dir.join("value"), "0\n").unwrap();
}

#[actix_rt::test]
async fn helper_exit_status_decides_success() {
    assert!(SysfsBackend::new("true").export(4).await.is_ok());
    assert!(SysfsBackend::new("true").unexport(4).await.is_ok());

    match SysfsBackend::new("false").export(4).await {
        Err(CommandError::Exit { program, code, .. }) => {
            assert_eq!(program, "false");
            assert_eq!(code, Some(1));
        }
        other => panic!("expected exit failure, got {other:?}"),
    }
}

#[actix_rt::test]
async fn helper_stderr_is_captured() {
    // `sh export 4` fails trying to open a script named "export".
    let err = SysfsBackend::new("sh").export(4).await.unwrap_err();

    assert!(matches!(err, CommandError::Exit { .. }));
    assert!(err.stderr().contains("export"));
}

#[actix_rt::test]
async fn missing_helper_is_a_spawn_error() {
    let err = SysfsBackend::new("/nonexistent/gpio-admin")
        .unexport(4)
        .await
        .unwrap_err();

    match &err {
        CommandError::Spawn { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
        other => panic!("expected spawn failure, got {other:?}"),
    }
    assert_eq!(err.stderr(), "");
}

#[actix_rt::test]
async fn manager_drives_attribute_files() {
    let root = tempdir().unwrap();
    fake_exported_line(root.path(), 4);
    let gpio = GpioManager::new(
        Arc::new(PinTable::for_revision(None)),
        Arc::new(SysfsBackend::new("true")),
        root.path(),
    );

    gpio.open(7, None).await.unwrap();
    let direction = fs::read_to_string(root.path().join("gpio4/direction")).unwrap();
    assert_eq!(direction, "out");
    assert_eq!(gpio.get_direction(7).await.unwrap(), Direction::Out);

    gpio.write(7, true).await.unwrap();
    assert_eq!(fs::read_to_string(root.path().join("gpio4/value")).unwrap(), "1");
    assert_eq!(gpio.read(7).await.unwrap(), 1);

    fs::write(root.path().join("gpio4/value"), "0\n").unwrap();
    assert_eq!(gpio.read(7).await.unwrap(), 0);

    gpio.close(7).await.unwrap();
}

#[actix_rt::test]
async fn manager_reports_missing_attribute_files() {
    let root = tempdir().unwrap();
    let gpio = GpioManager::new(
        Arc::new(PinTable::for_revision(None)),
        Arc::new(SysfsBackend::new("true")),
        root.path(),
    );

    match gpio.open(7, Some("in")).await {
        Err(AppError::Io { path, source }) => {
            assert_eq!(path, root.path().join("gpio4").join("direction"));
            assert_eq!(source.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("expected io error, got {other:?}"),
    }
}

#[actix_rt::test]
async fn manager_wraps_helper_failures() {
    let root = tempdir().unwrap();
    let gpio = GpioManager::new(
        Arc::new(PinTable::for_revision(None)),
        Arc::new(SysfsBackend::new("false")),
        root.path(),
    );

    assert!(matches!(
        gpio.open(11, None).await,
        Err(AppError::Claim { pin: 11, .. })
    ));
    assert!(matches!(
        gpio.close(11).await,
        Err(AppError::Release { pin: 11, .. })
    ));
}
