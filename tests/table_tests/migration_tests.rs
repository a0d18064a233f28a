//! Tests for split/merge migration
//!
//! These tests verify:
//! - Planned file moves for growth and shrink, including power-of-two
//!   crossings
//! - Running a migration over real bucket files
//! - Table-level split and merge keep every record reachable

use std::collections::HashSet;

use lhkv::addressing::{BucketAddress, Schedule};
use lhkv::bucket::Bucket;
use lhkv::compress::CompressorId;
use lhkv::hash::HashKey;
use lhkv::migrate::{plan, MigrationKind, Migrator};
use lhkv::{Config, Table};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const CAP: u32 = 4;

fn schedule(count: u64) -> Schedule {
    Schedule::new(count, CAP)
}

fn addr(bits: u32, value: u64) -> BucketAddress {
    BucketAddress::new(bits, value)
}

fn setup_temp_table(capacity: u32) -> (TempDir, Table) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .bucket_capacity(capacity)
        .build();
    let table = Table::open(config).unwrap();
    (temp_dir, table)
}

/// Fill the buckets of `schedule` with `n` hashed keys, as a table would
fn populate(folder: &std::path::Path, schedule: Schedule, n: usize) -> Vec<HashKey> {
    let hashes: Vec<HashKey> = (0..n)
        .map(|i| HashKey::of(format!("doc-{}", i).as_bytes()))
        .collect();
    for hash in &hashes {
        let bucket = Bucket::locate(folder, schedule.address(hash), CompressorId::None);
        let blob = bucket.archive().encode(&hash.prefix()).unwrap();
        bucket.insert_blobs(&[(*hash, blob)]).unwrap();
    }
    hashes
}

/// Assert every hash sits, with its value, in its bucket under `schedule`
fn assert_placed(folder: &std::path::Path, schedule: Schedule, hashes: &[HashKey]) {
    let mut total = 0;
    for address in schedule.addresses() {
        let bucket = Bucket::locate(folder, address, CompressorId::None);
        let index = bucket.load_index().unwrap();
        assert!(index.is_strictly_sorted());
        for record in index.records() {
            assert_eq!(schedule.address(&record.hash), address);
            let value: u64 = bucket.archive().read(record.offset, record.length).unwrap();
            assert_eq!(value, record.hash.prefix());
        }
        total += index.len();
    }
    assert_eq!(total, hashes.len());
}

// =============================================================================
// Plan Tests
// =============================================================================

#[test]
fn test_no_plan_when_bucket_count_unchanged() {
    assert!(plan(schedule(1), schedule(2)).is_none());
    assert!(plan(schedule(6), schedule(5)).is_none());
}

#[test]
fn test_no_plan_for_non_adjacent_schedules() {
    assert!(plan(schedule(4), schedule(13)).is_none());
}

#[test]
fn test_first_split_fissions_root() {
    let migration = plan(schedule(4), schedule(5)).unwrap();

    assert_eq!(migration.kind, MigrationKind::Split);
    assert_eq!(migration.rehomed, vec![addr(0, 0)]);
    assert!(migration.renames.is_empty());
}

#[test]
fn test_split_below_power_of_two_keeps_names() {
    // 2 -> 3 buckets: "00" splits off "0"
    let migration = plan(schedule(8), schedule(9)).unwrap();

    assert_eq!(migration.rehomed, vec![addr(1, 0)]);
    assert!(migration.renames.is_empty());
}

#[test]
fn test_split_onto_power_of_two_widens_names() {
    // 7 -> 8 buckets: "11" fissions; "00", "01", "10" gain a bit
    let migration = plan(schedule(28), schedule(29)).unwrap();

    assert_eq!(migration.rehomed, vec![addr(2, 3)]);
    assert_eq!(
        migration.renames,
        vec![
            (addr(2, 0), addr(3, 4)),
            (addr(2, 1), addr(3, 5)),
            (addr(2, 2), addr(3, 6)),
        ]
    );
}

#[test]
fn test_merge_with_threshold_joins_siblings() {
    // 3 -> 2 buckets
    let migration = plan(schedule(9), schedule(8)).unwrap();

    assert_eq!(migration.kind, MigrationKind::Merge);
    assert_eq!(migration.rehomed, vec![addr(2, 0), addr(1, 0)]);
    assert!(migration.renames.is_empty());
}

#[test]
fn test_merge_off_power_of_two_narrows_names() {
    // 8 -> 7 buckets
    let migration = plan(schedule(29), schedule(28)).unwrap();

    assert_eq!(migration.rehomed, vec![addr(3, 3), addr(3, 7)]);
    assert_eq!(
        migration.renames,
        vec![
            (addr(3, 4), addr(2, 0)),
            (addr(3, 5), addr(2, 1)),
            (addr(3, 6), addr(2, 2)),
        ]
    );
}

#[test]
fn test_merge_back_to_root() {
    let migration = plan(schedule(5), schedule(4)).unwrap();

    assert_eq!(migration.rehomed, vec![addr(1, 0), addr(1, 1)]);
    assert!(migration.renames.is_empty());
}

#[test]
fn test_plans_cover_every_bucket_of_both_schedules() {
    for n in 1..300u64 {
        let from = Schedule::new(n * 2, 2);
        let to = Schedule::new(n * 2 + 1, 2);
        let migration = plan(from, to).unwrap();

        // Unaffected buckets must keep identical names in both schedules
        let old: HashSet<BucketAddress> = from.addresses().collect();
        let new: HashSet<BucketAddress> = to.addresses().collect();
        let moved: HashSet<BucketAddress> = migration
            .rehomed
            .iter()
            .copied()
            .chain(migration.renames.iter().map(|(old, _)| *old))
            .collect();
        let arrived: HashSet<BucketAddress> =
            migration.renames.iter().map(|(_, new)| *new).collect();

        for address in old.difference(&moved) {
            assert!(new.contains(address), "n={} lost {}", n, address);
        }
        for address in &arrived {
            assert!(new.contains(address), "n={} renamed to stray {}", n, address);
        }
    }
}

// =============================================================================
// Migrator Tests
// =============================================================================

#[test]
fn test_migrator_split_and_merge_over_files() {
    let temp = TempDir::new().unwrap();
    let migrator = Migrator::new(temp.path(), CompressorId::None);

    let hashes = populate(temp.path(), schedule(28), 60);
    assert_placed(temp.path(), schedule(28), &hashes);

    migrator.migrate(28, 29, CAP).unwrap().unwrap();
    assert_placed(temp.path(), schedule(29), &hashes);

    migrator.migrate(29, 28, CAP).unwrap().unwrap();
    assert_placed(temp.path(), schedule(28), &hashes);
}

#[test]
fn test_migrator_walks_many_schedules() {
    let temp = TempDir::new().unwrap();
    let migrator = Migrator::new(temp.path(), CompressorId::None);
    let hashes = populate(temp.path(), Schedule::new(1, 1), 200);

    for count in 1..70u64 {
        migrator.migrate(count, count + 1, 1).unwrap();
        assert_placed(temp.path(), Schedule::new(count + 1, 1), &hashes);
    }
    for count in (2..=70u64).rev() {
        migrator.migrate(count, count - 1, 1).unwrap();
        assert_placed(temp.path(), Schedule::new(count - 1, 1), &hashes);
    }
}

#[test]
fn test_migrate_without_bucket_change_is_noop() {
    let temp = TempDir::new().unwrap();
    let migrator = Migrator::new(temp.path(), CompressorId::None);

    assert!(migrator.migrate(5, 6, CAP).unwrap().is_none());
}

#[test]
fn test_rewrite_resets_tombstones() {
    let temp = TempDir::new().unwrap();
    let migrator = Migrator::new(temp.path(), CompressorId::None);
    let hashes = populate(temp.path(), Schedule::new(1, 100), 10);
    let bucket = Bucket::locate(temp.path(), addr(0, 0), CompressorId::None);
    bucket.tombstones().store(7).unwrap();

    assert_eq!(migrator.rewrite(addr(0, 0)).unwrap(), 10);

    assert_eq!(bucket.tombstones().load().unwrap(), 0);
    assert_placed(temp.path(), Schedule::new(1, 100), &hashes);
}

#[test]
fn test_rewrite_missing_bucket() {
    let temp = TempDir::new().unwrap();
    let migrator = Migrator::new(temp.path(), CompressorId::None);

    assert_eq!(migrator.rewrite(addr(3, 1)).unwrap(), 0);
}

// =============================================================================
// Table-Level Tests
// =============================================================================

#[test]
fn test_single_slot_buckets_split_on_every_insert() {
    let (_temp, mut table) = setup_temp_table(1);

    for i in 0..40u64 {
        table.put(format!("k{}", i), &i).unwrap();
        assert_eq!(table.schedule().num_buckets(), i + 1);
        table.verify().unwrap();
    }
    for i in 0..40u64 {
        let stored: u64 = table.get(format!("k{}", i)).unwrap();
        assert_eq!(stored, i);
    }
    for i in 0..40u64 {
        assert!(table.delete(format!("k{}", i)).unwrap());
        table.verify().unwrap();
    }
    assert!(table.is_empty());
}

#[test]
fn test_values_survive_power_of_two_crossings() {
    let (_temp, mut table) = setup_temp_table(2);

    for i in 0..100u32 {
        table.put(i.to_be_bytes(), &format!("v{}", i)).unwrap();
    }
    assert_eq!(table.schedule().num_buckets(), 50);

    for i in (0..100u32).rev().step_by(3) {
        table.delete(i.to_be_bytes()).unwrap();
    }
    table.verify().unwrap();

    for i in 0..100u32 {
        let expected = (99 - i) % 3 != 0;
        assert_eq!(table.exists(i.to_be_bytes()).unwrap(), expected, "key {}", i);
        if expected {
            let stored: String = table.get(i.to_be_bytes()).unwrap();
            assert_eq!(stored, format!("v{}", i));
        }
    }
}

#[test]
fn test_split_moves_archive_bytes_unchanged() {
    let temp_dir = TempDir::new().unwrap();
    let mut table = Table::open_path(temp_dir.path(), 2, CompressorId::Snappy).unwrap();

    for i in 0..32u32 {
        table.put(format!("term{}", i), &"z".repeat(i as usize * 10)).unwrap();
    }
    let before = table.stats().unwrap().archive_bytes;

    // One more insert crosses 16 -> 17 buckets
    table.put("term32", &"z".repeat(320)).unwrap();
    assert_eq!(table.schedule().num_buckets(), 17);
    let added = table.stats().unwrap().archive_bytes - before;

    let bucket = table.bucket_of("term32");
    let index = bucket.load_index().unwrap();
    let slot = index.search(&HashKey::of(b"term32")).unwrap();
    assert_eq!(added, index.get(slot).unwrap().length);
    table.verify().unwrap();
}
