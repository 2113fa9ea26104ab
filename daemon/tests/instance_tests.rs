use autocloser_daemon::error::InstanceError;
use autocloser_daemon::instance::InstanceLock;
use tempfile::TempDir;

#[test]
fn test_second_acquire_is_rejected() {
    let dir = TempDir::new().unwrap();
    let first = InstanceLock::acquire_in(dir.path(), "autocloser-test").unwrap();
    assert!(first.path().exists());

    let second = InstanceLock::acquire_in(dir.path(), "autocloser-test");
    assert!(matches!(second, Err(InstanceError::AlreadyHeld(name)) if name == "autocloser-test"));
}

#[test]
fn test_lock_released_on_drop() {
    let dir = TempDir::new().unwrap();
    let first = InstanceLock::acquire_in(dir.path(), "autocloser-test").unwrap();
    drop(first);
    assert!(InstanceLock::acquire_in(dir.path(), "autocloser-test").is_ok());
}

#[test]
fn test_distinct_names_do_not_conflict() {
    let dir = TempDir::new().unwrap();
    let _a = InstanceLock::acquire_in(dir.path(), "first").unwrap();
    assert!(InstanceLock::acquire_in(dir.path(), "second").is_ok());
}

#[test]
fn test_creates_missing_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("run").join("autocloser");
    let lock = InstanceLock::acquire_in(&nested, "autocloser-test").unwrap();
    assert!(lock.path().starts_with(&nested));
}
