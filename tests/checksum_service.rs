use std::error::Error;
use std::fs;
use std::path::PathBuf;

use dagrun::checksum::{ChecksumService, ChecksumStore};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn sha256_digest_matches_known_vector() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("input.txt");
    fs::write(&file, "hello world")?;

    let service = ChecksumService::new();
    let digest = service.hash(&file, "sha256")?;
    assert_eq!(
        digest,
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
    );
    Ok(())
}

#[test]
fn algorithms_produce_distinct_digests_for_the_same_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("input.txt");
    fs::write(&file, "same bytes")?;

    let service = ChecksumService::new();
    let blake3 = service.hash(&file, "blake3")?;
    let sha256 = service.hash(&file, "sha256")?;
    let sha512 = service.hash(&file, "sha512")?;

    assert_eq!(blake3.len(), 64);
    assert_eq!(sha256.len(), 64);
    assert_eq!(sha512.len(), 128);
    assert_ne!(blake3, sha256);
    Ok(())
}

#[test]
fn unknown_algorithm_is_rejected() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("input.txt");
    fs::write(&file, "irrelevant")?;

    let service = ChecksumService::new();
    let err = service.hash(&file, "md5").unwrap_err();
    assert!(err.to_string().contains("cannot hash with algorithm 'md5'"));
    Ok(())
}

#[test]
fn hashing_a_missing_file_fails() {
    let service = ChecksumService::new();
    let missing = PathBuf::from("/definitely/not/here.txt");
    assert!(service.hash(&missing, "blake3").is_err());
}

#[test]
fn digest_is_stable_until_content_changes() -> TestResult {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("input.txt");
    fs::write(&file, "version one")?;

    let service = ChecksumService::new();
    let first = service.hash(&file, "blake3")?;
    let repeat = service.hash(&file, "blake3")?;
    assert_eq!(first, repeat);

    // Different length guarantees the memo entry is invalidated even on
    // filesystems with coarse mtime resolution.
    fs::write(&file, "version two, longer")?;
    let changed = service.hash(&file, "blake3")?;
    assert_ne!(first, changed);
    Ok(())
}

#[test]
fn aggregate_ignores_path_order() -> TestResult {
    let dir = tempfile::tempdir()?;
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "alpha")?;
    fs::write(&b, "beta")?;

    let service = ChecksumService::new();
    let forward = service.aggregate(&[a.clone(), b.clone()], "blake3")?;
    let reversed = service.aggregate(&[b, a], "blake3")?;
    assert_eq!(forward, reversed);
    Ok(())
}

#[test]
fn aggregate_changes_when_any_input_changes() -> TestResult {
    let dir = tempfile::tempdir()?;
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "alpha")?;
    fs::write(&b, "beta")?;

    let service = ChecksumService::new();
    let before = service.aggregate(&[a.clone(), b.clone()], "sha256")?;

    fs::write(&b, "beta, edited now")?;
    let after = service.aggregate(&[a, b], "sha256")?;
    assert_ne!(before, after);
    Ok(())
}

#[test]
fn aggregate_with_a_missing_input_fails() -> TestResult {
    let dir = tempfile::tempdir()?;
    let a = dir.path().join("a.txt");
    fs::write(&a, "alpha")?;
    let missing = dir.path().join("gone.txt");

    let service = ChecksumService::new();
    assert!(service.aggregate(&[a, missing], "blake3").is_err());
    Ok(())
}

#[test]
fn store_round_trips_entries_across_reopens() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state").join("checksums");

    let store = ChecksumStore::open(&path)?;
    assert_eq!(store.get("build"), None);
    store.put("build", "abc123")?;
    store.put("test", "def456")?;
    assert_eq!(store.get("build").as_deref(), Some("abc123"));
    drop(store);

    let reopened = ChecksumStore::open(&path)?;
    assert_eq!(reopened.get("build").as_deref(), Some("abc123"));
    assert_eq!(reopened.get("test").as_deref(), Some("def456"));
    assert_eq!(reopened.get("deploy"), None);
    Ok(())
}

#[test]
fn store_put_overwrites_previous_digest() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("checksums");

    let store = ChecksumStore::open(&path)?;
    store.put("build", "old")?;
    store.put("build", "new")?;
    assert_eq!(store.get("build").as_deref(), Some("new"));

    let reopened = ChecksumStore::open(&path)?;
    assert_eq!(reopened.get("build").as_deref(), Some("new"));
    Ok(())
}
