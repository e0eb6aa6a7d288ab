//! Disk-backed lifecycle tests: round-trip fidelity, format rejection,
//! and graceful degradation of shared and finalized handles.

use seriesdb::{
    Store, StoreError, StoreRegistry, Value, HEADER_SIZE, NAME_SIZE, RECORD_SIZE, UNKNOWN,
};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::TempDir;

#[test]
fn test_append_three_then_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("t.sdb");

    {
        let mut store = Store::open(&path, "T").unwrap();
        store.append_at(1, 1.0).unwrap();
        store.append_at(2, 2.0).unwrap();
        store.append_at(3, 3.0).unwrap();

        assert_eq!(store.count(), 3);
        assert_eq!(store.sum(), 6.0);
        assert_eq!(store.average(), 2.0);
        assert_eq!(store.min(), 1.0);
        assert_eq!(store.max(), 3.0);
        assert_eq!(store.median(), 2.0);
        assert_eq!(store.moving_average(2, 2), 2.5);

        store.close().unwrap();
    }

    // A fresh open with the same name reproduces every field.
    let mut store = Store::open(&path, "T").unwrap();
    assert_eq!(store.count(), 3);
    assert_eq!(store.sum(), 6.0);
    assert_eq!(store.average(), 2.0);
    assert_eq!(store.min(), 1.0);
    assert_eq!(store.max(), 3.0);

    // The median cache survived the round trip.
    assert_eq!(store.median(), 2.0);

    // So did every record.
    let first = store.record(0).unwrap().unwrap();
    assert_eq!((first.timestamp, first.value, first.running_sum), (1, 1.0, 1.0));
    let last = store.record(2).unwrap().unwrap();
    assert_eq!((last.timestamp, last.value, last.running_sum), (3, 3.0, 6.0));
}

#[test]
fn test_variance_cache_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("var.sdb");

    let expected = {
        let mut store = Store::open(&path, "var").unwrap();
        for (i, v) in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].iter().enumerate() {
            store.append_at(i as u64, *v).unwrap();
        }
        let variance = store.variance();
        store.close().unwrap();
        variance
    };
    assert_eq!(expected, 4.0);

    let mut store = Store::open(&path, "var").unwrap();
    assert_eq!(store.variance(), expected);
    assert_eq!(store.stddev(), 2.0);
}

#[test]
fn test_rejects_wrong_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("named.sdb");

    Store::open(&path, "alpha").unwrap().close().unwrap();

    match Store::open(&path, "beta") {
        Err(StoreError::NameMismatch { expected, found }) => {
            assert_eq!(expected, "beta");
            assert_eq!(found, "alpha");
        }
        Err(other) => panic!("expected name mismatch, got {other}"),
        Ok(_) => panic!("expected name mismatch, got success"),
    }
}

#[test]
fn test_rejects_overlong_name() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("long.sdb");

    assert!(matches!(
        Store::open(&path, "far-too-long-a-name"),
        Err(StoreError::NameTooLong(_))
    ));
    assert!(!path.exists());
}

#[test]
fn test_rejects_bad_magic() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.sdb");

    std::fs::write(&path, vec![0xFFu8; HEADER_SIZE]).unwrap();

    assert!(matches!(
        Store::open(&path, "garbage"),
        Err(StoreError::InvalidMagic)
    ));
}

#[test]
fn test_rejects_foreign_precision() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("precision.sdb");

    Store::open(&path, "precision").unwrap().close().unwrap();

    // Toggle the USE_DOUBLE bit in the flags field on disk. Whichever
    // precision this build compiled in, the file now claims the other.
    let flags_offset = (4 + NAME_SIZE) as u64;
    let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
    let mut flags = [0u8; 1];
    file.seek(SeekFrom::Start(flags_offset)).unwrap();
    file.read_exact(&mut flags).unwrap();
    flags[0] ^= 0b0001;
    file.seek(SeekFrom::Start(flags_offset)).unwrap();
    file.write_all(&flags).unwrap();
    drop(file);

    assert!(matches!(
        Store::open(&path, "precision"),
        Err(StoreError::PrecisionMismatch(_))
    ));
}

#[test]
fn test_rejects_truncated_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("truncated.sdb");

    {
        let mut store = Store::open(&path, "truncated").unwrap();
        store.append_at(1, 1.0).unwrap();
        store.append_at(2, 2.0).unwrap();
        store.close().unwrap();
    }

    // Drop the last record; the header still claims two.
    let shorter = (HEADER_SIZE + RECORD_SIZE) as u64;
    let file = OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(shorter).unwrap();
    drop(file);

    assert!(matches!(
        Store::open(&path, "truncated"),
        Err(StoreError::Corrupted(_))
    ));
}

#[test]
fn test_finalized_handle_neutral_reads() {
    let dir = TempDir::new().unwrap();
    let mut store = Store::open(dir.path().join("fin.sdb"), "fin").unwrap();

    store.append_at(1, 9.0).unwrap();
    store.close().unwrap();

    assert_eq!(store.count(), 0);
    assert_eq!(store.sum(), 0.0);
    assert_eq!(store.average(), 0.0);
    assert_eq!(store.min(), Value::INFINITY);
    assert_eq!(store.max(), Value::NEG_INFINITY);
    assert_eq!(store.variance(), UNKNOWN);
    assert_eq!(store.median(), UNKNOWN);
    assert_eq!(store.record(0).unwrap(), None);
    assert_eq!(store.moving_average(0, 1), 0.0);
    assert!(matches!(
        store.append_at(2, 1.0),
        Err(StoreError::NotOpen)
    ));

    // And the data is still there after reopening.
    store.reopen().unwrap();
    assert_eq!(store.count(), 1);
    assert_eq!(store.sum(), 9.0);
}

#[test]
fn test_registry_single_handle_per_name() {
    let dir = TempDir::new().unwrap();
    let mut registry = StoreRegistry::new(dir.path());

    let writer = registry.open("metrics").unwrap();
    let reader = registry.open("metrics").unwrap();
    assert!(std::sync::Arc::ptr_eq(&writer, &reader));

    writer.lock().append_at(1, 5.0).unwrap();
    assert_eq!(reader.lock().count(), 1);
    assert_eq!(reader.lock().sum(), 5.0);

    registry.close("metrics").unwrap();
    assert!(!writer.lock().is_open());
    assert!(registry.is_empty());
}
