use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use igpub::executor::Executor;
use igpub::run_log::RunLog;
use igpub::sync::{sync, SyncOutcome};

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn init_repo(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    git(dir, &["init"]);
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test User"]);
}

fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", message]);
}

fn test_executor(dir: &Path) -> Executor {
    Executor::new(RunLog::new(&dir.join("run.log")))
}

/// Relative path -> content for every file outside git metadata.
fn content_map(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, map: &mut BTreeMap<PathBuf, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.file_name().is_some_and(|n| n == ".git") {
                continue;
            }
            if path.is_dir() {
                walk(root, &path, map);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                map.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    let mut map = BTreeMap::new();
    walk(dir, dir, &mut map);
    map
}

#[test]
fn missing_path_is_cloned() {
    let dir = tempfile::tempdir().unwrap();
    let origin = dir.path().join("origin");
    init_repo(&origin);
    fs::write(origin.join("readme.md"), "hello").unwrap();
    commit_all(&origin, "initial");

    let exec = test_executor(dir.path());
    let local = dir.path().join("checkout");
    let outcome = sync(&exec, &origin.to_string_lossy(), &local, None, None).unwrap();

    assert!(matches!(outcome, SyncOutcome::Cloned));
    assert_eq!(fs::read_to_string(local.join("readme.md")).unwrap(), "hello");
}

#[test]
fn repeated_sync_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let origin = dir.path().join("origin");
    init_repo(&origin);
    fs::write(origin.join("a.txt"), "one").unwrap();
    fs::create_dir_all(origin.join("nested")).unwrap();
    fs::write(origin.join("nested/b.txt"), "two").unwrap();
    commit_all(&origin, "initial");

    let exec = test_executor(dir.path());
    let local = dir.path().join("checkout");
    let remote = origin.to_string_lossy().to_string();

    sync(&exec, &remote, &local, None, None).unwrap();
    let before = content_map(&local);

    let outcome = sync(&exec, &remote, &local, None, None).unwrap();
    assert!(matches!(outcome, SyncOutcome::Updated));
    assert_eq!(before, content_map(&local));
}

#[test]
fn local_modifications_are_reset_on_resync() {
    let dir = tempfile::tempdir().unwrap();
    let origin = dir.path().join("origin");
    init_repo(&origin);
    fs::write(origin.join("a.txt"), "pristine").unwrap();
    commit_all(&origin, "initial");

    let exec = test_executor(dir.path());
    let local = dir.path().join("checkout");
    let remote = origin.to_string_lossy().to_string();

    sync(&exec, &remote, &local, None, None).unwrap();
    fs::write(local.join("a.txt"), "scribbled over").unwrap();

    sync(&exec, &remote, &local, None, None).unwrap();
    assert_eq!(fs::read_to_string(local.join("a.txt")).unwrap(), "pristine");
}

#[test]
fn update_failure_keeps_stale_tree() {
    let dir = tempfile::tempdir().unwrap();
    let exec = test_executor(dir.path());

    // An existing directory that is not a repository: reset/pull both fail.
    let local = dir.path().join("checkout");
    fs::create_dir_all(&local).unwrap();
    fs::write(local.join("stale.txt"), "still here").unwrap();

    let outcome = sync(&exec, "https://example.invalid/repo", &local, None, None).unwrap();

    match outcome {
        SyncOutcome::StaleKept { warning } => {
            assert!(warning.contains("continuing with stale checkout"));
        }
        other => panic!("expected StaleKept, got {:?}", other),
    }
    assert_eq!(
        fs::read_to_string(local.join("stale.txt")).unwrap(),
        "still here"
    );
}

#[test]
fn clone_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let exec = test_executor(dir.path());
    let local = dir.path().join("checkout");

    let result = sync(
        &exec,
        &dir.path().join("no-such-origin").to_string_lossy(),
        &local,
        None,
        None,
    );
    assert!(result.is_err());
}

#[test]
fn sparse_sync_materializes_only_declared_paths() {
    let dir = tempfile::tempdir().unwrap();
    let origin = dir.path().join("origin");
    init_repo(&origin);
    for top in ["templates", "assets", "hiv", "measles"] {
        fs::create_dir_all(origin.join(top)).unwrap();
        fs::write(origin.join(top).join("file.txt"), top).unwrap();
    }
    commit_all(&origin, "initial");

    let exec = test_executor(dir.path());
    let local = dir.path().join("checkout");
    let sparse = vec!["templates".to_string(), "assets".to_string()];
    let outcome = sync(
        &exec,
        &origin.to_string_lossy(),
        &local,
        None,
        Some(&sparse),
    )
    .unwrap();
    assert!(matches!(outcome, SyncOutcome::Cloned));

    assert!(local.join("templates/file.txt").is_file());
    assert!(local.join("assets/file.txt").is_file());
    assert!(!local.join("hiv").exists());
    assert!(!local.join("measles").exists());

    // Top-level entries are exactly the declared paths plus git metadata.
    let mut entries: Vec<String> = fs::read_dir(&local)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name != ".git")
        .collect();
    entries.sort();
    assert_eq!(entries, vec!["assets".to_string(), "templates".to_string()]);
}

#[test]
fn branch_selection_clones_the_named_branch() {
    let dir = tempfile::tempdir().unwrap();
    let origin = dir.path().join("origin");
    init_repo(&origin);
    fs::write(origin.join("a.txt"), "main content").unwrap();
    commit_all(&origin, "initial");
    git(&origin, &["checkout", "-b", "release-candidate"]);
    fs::write(origin.join("a.txt"), "candidate content").unwrap();
    commit_all(&origin, "candidate");

    let exec = test_executor(dir.path());
    let local = dir.path().join("checkout");
    sync(
        &exec,
        &origin.to_string_lossy(),
        &local,
        Some("release-candidate"),
        None,
    )
    .unwrap();

    assert_eq!(
        fs::read_to_string(local.join("a.txt")).unwrap(),
        "candidate content"
    );
}
