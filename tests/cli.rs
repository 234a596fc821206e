//! End-to-end exercise of the built `btree-index` binary: scenarios S1-S6.
//!
//! Unlike the library's `#[cfg(test)]` modules, these drive the actual
//! command surface via `std::process::Command`, the way a disk-format
//! tool's acceptance tests should: through the binary, not the library.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

//-------------------------------------------------------------------------

fn run(index_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_btree-index"))
        .arg(index_path)
        .args(args)
        .output()
        .expect("failed to spawn btree-index")
}

fn stdout(out: &Output) -> String {
    String::from_utf8(out.stdout.clone()).unwrap()
}

//-------------------------------------------------------------------------

#[test]
fn s1_create_produces_expected_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("idx");

    let out = run(&path, &["create"]);
    assert!(out.status.success());

    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 2048);
    assert_eq!(&bytes[0..8], b"4348PRJ3");

    // root_id (u64 BE) at offset 8, next_free_id (u64 BE) at offset 16.
    let root_id = u64::from_be_bytes(bytes[8..16].try_into().unwrap());
    let next_free_id = u64::from_be_bytes(bytes[16..24].try_into().unwrap());
    assert_eq!(root_id, 1);
    assert_eq!(next_free_id, 2);

    // Block 1 (bytes 512..1024) is an empty leaf: is_leaf, id=1, parent=0, k=0.
    let block1 = &bytes[512..1024];
    assert_eq!(block1[0], 1, "is_leaf flag");
    let id = u64::from_be_bytes(block1[1..9].try_into().unwrap());
    let parent = u64::from_be_bytes(block1[9..17].try_into().unwrap());
    let nr_keys = u32::from_be_bytes(block1[17..21].try_into().unwrap());
    assert_eq!(id, 1);
    assert_eq!(parent, 0);
    assert_eq!(nr_keys, 0);
}

#[test]
fn s2_ordered_print_after_inserts() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("idx");

    assert!(run(&path, &["create"]).status.success());
    assert!(run(&path, &["insert", "5", "50"]).status.success());
    assert!(run(&path, &["insert", "3", "30"]).status.success());
    assert!(run(&path, &["insert", "9", "90"]).status.success());

    let out = run(&path, &["print"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "3,30\n5,50\n9,90\n");
}

#[test]
fn s3_search_hit_and_miss() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("idx");

    assert!(run(&path, &["create"]).status.success());
    assert!(run(&path, &["insert", "5", "50"]).status.success());

    let hit = run(&path, &["search", "5"]);
    assert!(hit.status.success());
    assert_eq!(stdout(&hit), "5,50\n");

    let miss = run(&path, &["search", "7"]);
    assert!(!miss.status.success());
    assert_eq!(stdout(&miss), "Error: Key not found\n");
}

#[test]
fn s4_bulk_load_splits_root_at_twentieth_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("idx");
    let csv_path = dir.path().join("rows.csv");

    let rows: String = (1..=20u64).map(|k| format!("{k},{}\n", k * 10)).collect();
    fs::write(&csv_path, rows).unwrap();

    assert!(run(&path, &["create"]).status.success());
    assert!(run(&path, &["load", csv_path.to_str().unwrap()])
        .status
        .success());

    let out = run(&path, &["print"]);
    assert!(out.status.success());
    let expected: String = (1..=20u64).map(|k| format!("{k},{}\n", k * 10)).collect();
    assert_eq!(stdout(&out), expected);

    let bytes = fs::read(&path).unwrap();
    let root_id = u64::from_be_bytes(bytes[8..16].try_into().unwrap());
    assert_ne!(root_id, 1, "root should have been promoted by the split");

    let root_block_off = (root_id as usize) * 512;
    let root_block = &bytes[root_block_off..root_block_off + 512];
    let root_nr_keys = u32::from_be_bytes(root_block[17..21].try_into().unwrap());
    assert_eq!(root_nr_keys, 1);
    let root_key = u64::from_be_bytes(root_block[21..29].try_into().unwrap());
    assert_eq!(root_key, 10, "the 10th inserted key is the promoted median");
}

#[test]
fn s5_create_refuses_existing_path_without_modifying_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("idx");

    assert!(run(&path, &["create"]).status.success());
    let before = fs::read(&path).unwrap();

    let out = run(&path, &["create"]);
    assert!(!out.status.success());

    let after = fs::read(&path).unwrap();
    assert_eq!(before, after, "a failed create must not touch the existing file");
}

#[test]
fn s6_bad_magic_is_rejected_without_mutation() {
    let dir = TempDir::new().unwrap();
    let path: PathBuf = dir.path().join("idx");

    let mut bytes = vec![0u8; 2048];
    bytes[0..8].copy_from_slice(b"NOTAMAGC");
    fs::write(&path, &bytes).unwrap();

    let out = run(&path, &["search", "1"]);
    assert!(!out.status.success());

    let after = fs::read(&path).unwrap();
    assert_eq!(bytes, after, "a rejected open must not mutate the file");
}

//-------------------------------------------------------------------------
