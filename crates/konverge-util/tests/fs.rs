use konverge_util::fs::{ensure_dir, find_ancestor_with, write_atomic};
use tempfile::TempDir;

#[test]
fn test_find_ancestor_with_direct() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("Konverge.toml"), "").unwrap();
    let result = find_ancestor_with(tmp.path(), "Konverge.toml");
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_nested() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("Konverge.toml"), "").unwrap();
    let nested = tmp.path().join("app").join("src").join("main");
    std::fs::create_dir_all(&nested).unwrap();
    let result = find_ancestor_with(&nested, "Konverge.toml");
    assert_eq!(result, Some(tmp.path().to_path_buf()));
}

#[test]
fn test_find_ancestor_with_not_found() {
    let tmp = TempDir::new().unwrap();
    let result = find_ancestor_with(tmp.path(), "NonExistent.file");
    assert_eq!(result, None);
}

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    assert!(!deep.exists());
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_write_atomic_creates_parent_and_replaces() {
    let tmp = TempDir::new().unwrap();
    let target = tmp.path().join("out").join("Konverge.resolved.toml");
    write_atomic(&target, b"first").unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "first");
    write_atomic(&target, b"second").unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "second");
}
