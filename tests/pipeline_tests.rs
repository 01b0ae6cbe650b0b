//! End-to-end pipeline tests over real temporary directory trees.

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tempfile::TempDir;

use dupelink::duplicates::{DedupeConfig, Deduplicator, ScanSummary};

fn write_file(dir: &Path, name: &str, content: &[u8], mtime_sec: i64) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(&path).unwrap().write_all(content).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime_sec, 0)).unwrap();
    path
}

fn ino(path: &Path) -> u64 {
    fs::metadata(path).unwrap().ino()
}

fn run(dir: &TempDir, configure: impl FnOnce(DedupeConfig) -> DedupeConfig) -> ScanSummary {
    let config = configure(
        DedupeConfig::default()
            .with_dirs(vec![dir.path().to_path_buf()])
            .with_boring(true),
    );
    Deduplicator::new(config).run().unwrap()
}

fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn three_identical_files_collapse_onto_the_oldest() {
    let dir = TempDir::new().unwrap();
    let a = write_file(dir.path(), "a", b"hello", 100);
    let b = write_file(dir.path(), "b", b"hello", 200);
    let c = write_file(dir.path(), "c", b"hello", 150);
    let d = write_file(dir.path(), "d", b"world", 300);
    let keeper_ino = ino(&a);
    let unique_ino = ino(&d);

    let summary = run(&dir, |cfg| cfg);

    assert_eq!(summary.relinked_count, 2);
    assert_eq!(summary.relinked_size, 10);
    assert_eq!(summary.groups, 1);
    assert_eq!(ino(&a), keeper_ino);
    assert_eq!(ino(&b), keeper_ino);
    assert_eq!(ino(&c), keeper_ino);
    assert_eq!(ino(&d), unique_ino);
    assert_eq!(fs::read(&b).unwrap(), b"hello");
}

#[test]
fn empty_files_are_duplicates_of_each_other() {
    let dir = TempDir::new().unwrap();
    let e1 = write_file(dir.path(), "e1", b"", 100);
    let e2 = write_file(dir.path(), "e2", b"", 200);
    let e3 = write_file(dir.path(), "e3", b"", 300);

    let summary = run(&dir, |cfg| cfg);

    assert_eq!(summary.relinked_count, 2);
    assert_eq!(summary.relinked_size, 0);
    assert_eq!(ino(&e1), ino(&e2));
    assert_eq!(ino(&e1), ino(&e3));
}

#[test]
fn distinct_contents_mean_zero_relinks() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a", b"aaaa", 100);
    write_file(dir.path(), "b", b"bbbb", 200);
    write_file(dir.path(), "c", b"cc", 300);

    let summary = run(&dir, |cfg| cfg);

    assert_eq!(summary.relinked_count, 0);
    assert_eq!(summary.groups, 0);
}

#[test]
fn excluded_names_keep_their_inode() {
    let dir = TempDir::new().unwrap();
    let a = write_file(dir.path(), "a", b"hello", 100);
    let b = write_file(dir.path(), "b", b"hello", 200);
    let c = write_file(dir.path(), "c", b"hello", 150);
    let b_ino = ino(&b);

    let summary = run(&dir, |cfg| cfg.with_exclude(vec!["b".to_string()]));

    assert_eq!(summary.relinked_count, 1);
    assert_eq!(ino(&a), ino(&c));
    assert_eq!(ino(&b), b_ino);
    assert_ne!(ino(&b), ino(&a));
}

#[test]
fn dry_run_reports_but_mutates_nothing() {
    let dir = TempDir::new().unwrap();
    let a = write_file(dir.path(), "a", b"hello", 100);
    let b = write_file(dir.path(), "b", b"hello", 200);
    let inos_before = (ino(&a), ino(&b));
    let names_before = list_names(dir.path());

    let summary = run(&dir, |cfg| cfg.with_dry_run(true));

    // The group is detected; nothing on disk changes.
    assert_eq!(summary.groups, 1);
    assert_eq!(summary.relinked_count, 0);
    assert_eq!((ino(&a), ino(&b)), inos_before);
    assert_eq!(list_names(dir.path()), names_before);
}

#[test]
fn second_run_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a", b"hello", 100);
    write_file(dir.path(), "b", b"hello", 200);
    write_file(dir.path(), "sub/c", b"hello", 300);

    let first = run(&dir, |cfg| cfg);
    assert_eq!(first.relinked_count, 2);

    let second = run(&dir, |cfg| cfg);
    assert_eq!(second.relinked_count, 0);
    // All paths coalesced onto one inode, so the second walk sees one record.
    assert_eq!(second.groups, 0);
}

#[test]
fn path_set_is_preserved_across_a_run() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a", b"hello", 100);
    write_file(dir.path(), "b", b"hello", 200);
    write_file(dir.path(), "unique", b"something else", 300);
    let names_before = list_names(dir.path());

    run(&dir, |cfg| cfg);

    assert_eq!(list_names(dir.path()), names_before);
}

#[test]
fn unique_file_inode_never_changes() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a", b"hello", 100);
    write_file(dir.path(), "b", b"hello", 200);
    let unique = write_file(dir.path(), "unique", b"only one of me", 300);
    let unique_ino = ino(&unique);

    run(&dir, |cfg| cfg);

    assert_eq!(ino(&unique), unique_ino);
}

#[test]
fn preexisting_hard_links_join_their_group_once() {
    let dir = TempDir::new().unwrap();
    let a = write_file(dir.path(), "a", b"hello", 100);
    let alias = dir.path().join("alias");
    fs::hard_link(&a, &alias).unwrap();
    let b = write_file(dir.path(), "b", b"hello", 200);

    let summary = run(&dir, |cfg| cfg);

    // One duplicate inode (b) with one path: one relink, not two.
    assert_eq!(summary.relinked_count, 1);
    assert_eq!(ino(&a), ino(&b));
    assert_eq!(ino(&a), ino(&alias));
}

#[test]
fn duplicates_merge_across_multiple_roots() {
    let dir = TempDir::new().unwrap();
    let root1 = dir.path().join("r1");
    let root2 = dir.path().join("r2");
    fs::create_dir_all(&root1).unwrap();
    fs::create_dir_all(&root2).unwrap();
    let a = write_file(&root1, "a", b"shared", 100);
    let b = write_file(&root2, "b", b"shared", 200);

    let config = DedupeConfig::default()
        .with_dirs(vec![root1, root2])
        .with_boring(true);
    let summary = Deduplicator::new(config).run().unwrap();

    assert_eq!(summary.relinked_count, 1);
    assert_eq!(ino(&a), ino(&b));
}

#[test]
fn same_size_different_content_stays_apart() {
    let dir = TempDir::new().unwrap();
    let a = write_file(dir.path(), "a", b"aaaaa", 100);
    let b = write_file(dir.path(), "b", b"bbbbb", 200);

    let summary = run(&dir, |cfg| cfg);

    // Both were hashing candidates, neither grouped.
    assert_eq!(summary.candidates, 2);
    assert_eq!(summary.groups, 0);
    assert_ne!(ino(&a), ino(&b));
}

#[test]
fn xattr_cache_runs_match_uncached_runs() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a", b"hello", 100);
    write_file(dir.path(), "b", b"hello", 200);
    write_file(dir.path(), "c", b"other bytes!", 300);

    // First xattr run primes the cache (a no-op on filesystems without
    // user xattrs; the cache is advisory either way).
    let first = run(&dir, |cfg| cfg.with_use_xattrs(true));
    assert_eq!(first.relinked_count, 1);

    let second = run(&dir, |cfg| cfg.with_use_xattrs(true));
    assert_eq!(second.relinked_count, 0);
    assert_eq!(second.groups, 0);
}

#[test]
fn dry_run_with_xattrs_is_stable_across_runs() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a", b"hello", 100);
    write_file(dir.path(), "b", b"hello", 200);

    let first = run(&dir, |cfg| cfg.with_dry_run(true).with_use_xattrs(true));
    // The tree is unchanged, so the second run can serve every digest from
    // the cache where the filesystem supports user xattrs; the reported
    // grouping must be identical either way.
    let second = run(&dir, |cfg| cfg.with_dry_run(true).with_use_xattrs(true));

    assert_eq!(first.groups, 1);
    assert_eq!(first, second);
}

#[test]
fn no_temporaries_left_behind() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a", b"hello", 100);
    write_file(dir.path(), "b", b"hello", 200);
    write_file(dir.path(), "sub/c", b"hello", 300);

    run(&dir, |cfg| cfg);

    for entry in walk_all(dir.path()) {
        let name = entry.file_name().unwrap().to_string_lossy().into_owned();
        assert!(
            !name.starts_with(".tmp"),
            "stray temporary left behind: {}",
            entry.display()
        );
    }
}

fn walk_all(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        if entry.file_type().unwrap().is_dir() {
            out.extend(walk_all(&path));
        } else {
            out.push(path);
        }
    }
    out
}
