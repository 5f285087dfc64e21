//! Tests for the chain Reader
//!
//! These tests verify:
//! - Random access by id and by last position
//! - Backward iteration order and early stop
//! - Integrity failures on corrupted bytes
//! - Empty and truncated store handling
//! - Concurrent readers

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use hashchain::chain::{sha256_factory, PaddedStrCodec, RawCodec, Reader, Writer};
use hashchain::store::MemStore;
use hashchain::{ChainConfig, ChainError, Position};

// =============================================================================
// Helper Functions
// =============================================================================

const MESSAGE_SIZE: usize = 9;
const RECORD_SIZE: u64 = 8 + MESSAGE_SIZE as u64 + 32;

fn msg(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

/// Write `count` records ("message 0", "message 1", ...) with timestamps
/// 1000, 1001, ... and return the store and the returned hashes
fn store_with_records(count: usize) -> (MemStore, Vec<Bytes>) {
    let store = MemStore::new();
    let writer = Writer::new(
        store.clone(),
        sha256_factory(),
        RawCodec::new(MESSAGE_SIZE),
        &ChainConfig::with_message_size(MESSAGE_SIZE),
    )
    .unwrap();

    let hashes = (0..count)
        .map(|i| {
            writer
                .write(1000 + i as i64, &msg(&format!("message {}", i % 10)))
                .unwrap()
                .1
        })
        .collect();
    (store, hashes)
}

fn reader(store: &MemStore) -> Reader<MemStore, RawCodec> {
    Reader::new(store.clone(), sha256_factory(), RawCodec::new(MESSAGE_SIZE))
}

fn collect_ids(reader: &Reader<MemStore, RawCodec>, start: Position) -> hashchain::Result<Vec<u64>> {
    let mut ids = Vec::new();
    reader.iterate(start, |record| {
        ids.push(record.id);
        Ok::<_, ChainError>(true)
    })?;
    Ok(ids)
}

// =============================================================================
// Random Access Tests
// =============================================================================

#[test]
fn test_read_every_record() {
    let (store, hashes) = store_with_records(12);
    let reader = reader(&store);

    for (i, hash) in hashes.iter().enumerate() {
        let record = reader.read(i as u64).unwrap();
        assert_eq!(record.id, i as u64);
        assert_eq!(record.timestamp, 1000 + i as i64);
        assert_eq!(record.message, msg(&format!("message {}", i % 10)));
        assert_eq!(&record.hash, hash);
    }
}

#[test]
fn test_read_last_matches_last_id() {
    let (store, hashes) = store_with_records(4);
    let reader = reader(&store);

    let last = reader.read_last().unwrap();
    assert_eq!(last, reader.read(3).unwrap());
    assert_eq!(last.hash, hashes[3]);
    assert_eq!(reader.read_at(Position::Last).unwrap(), last);
    assert_eq!(reader.read_at(Position::Id(1)).unwrap().id, 1);
}

#[test]
fn test_read_past_end_is_not_found() {
    let (store, _) = store_with_records(3);
    let reader = reader(&store);

    assert!(matches!(reader.read(3), Err(ChainError::NotFound)));
    assert!(matches!(reader.read(100), Err(ChainError::NotFound)));
}

#[test]
fn test_read_unaddressable_ids_is_not_found() {
    let (store, _) = store_with_records(3);
    let reader = reader(&store);

    assert!(matches!(reader.read(u64::MAX), Err(ChainError::NotFound)));
    assert!(matches!(
        reader.read(u64::MAX / RECORD_SIZE),
        Err(ChainError::NotFound)
    ));
    assert!(matches!(
        reader.iterate(Position::Id(u64::MAX), |_| Ok::<_, ChainError>(true)),
        Err(ChainError::NotFound)
    ));
}

#[test]
fn test_wrapping_id_does_not_alias_a_record() {
    // Record size 48: (2^60 + 1) * 48 wraps to 48, the offset of record 1
    let store = MemStore::new();
    let writer = Writer::new(
        store.clone(),
        sha256_factory(),
        RawCodec::new(8),
        &ChainConfig::with_message_size(8),
    )
    .unwrap();
    writer.write(1, &msg("aaaaaaaa")).unwrap();
    writer.write(2, &msg("bbbbbbbb")).unwrap();

    let reader = Reader::new(store, sha256_factory(), RawCodec::new(8));
    assert_eq!(reader.layout().record_size(), 48);
    assert!(matches!(reader.read((1 << 60) + 1), Err(ChainError::NotFound)));
    assert!(matches!(
        reader.iterate(Position::Id((1 << 60) + 1), |_| Ok::<_, ChainError>(true)),
        Err(ChainError::NotFound)
    ));
    assert_eq!(reader.read(1).unwrap().message, msg("bbbbbbbb"));
}

#[test]
fn test_len_and_last_id() {
    let (store, _) = store_with_records(7);
    let reader = reader(&store);

    assert_eq!(reader.len().unwrap(), 7);
    assert!(!reader.is_empty().unwrap());
    assert_eq!(reader.last_id().unwrap(), Some(6));
}

#[test]
fn test_record_time() {
    let (store, _) = store_with_records(1);
    let record = reader(&store).read(0).unwrap();
    assert_eq!(
        record.time(),
        std::time::UNIX_EPOCH + std::time::Duration::from_nanos(1000)
    );
}

// =============================================================================
// Empty Store Tests
// =============================================================================

#[test]
fn test_empty_store() {
    let reader = Reader::new(Cursor::new(Vec::new()), sha256_factory(), RawCodec::new(10));

    for id in 0..3u64 {
        assert!(matches!(reader.read(id), Err(ChainError::NotFound)));

        let result = reader.iterate(Position::Id(id), |_| Ok::<_, ChainError>(true));
        assert!(matches!(result, Err(ChainError::NotFound)));
    }

    assert!(matches!(reader.read_last(), Err(ChainError::NotFound)));

    let mut calls = 0;
    reader
        .iterate(Position::Last, |_| {
            calls += 1;
            Ok::<_, ChainError>(true)
        })
        .unwrap();
    assert_eq!(calls, 0);

    assert_eq!(reader.len().unwrap(), 0);
    assert!(reader.is_empty().unwrap());
    assert_eq!(reader.verify().unwrap(), 0);
}

// =============================================================================
// Iteration Tests
// =============================================================================

#[test]
fn test_iterate_from_last() {
    let (store, _) = store_with_records(6);
    let reader = reader(&store);

    assert_eq!(collect_ids(&reader, Position::Last).unwrap(), vec![5, 4, 3, 2, 1, 0]);
}

#[test]
fn test_iterate_from_each_id() {
    let (store, _) = store_with_records(5);
    let reader = reader(&store);

    for start in 0..5u64 {
        let ids = collect_ids(&reader, Position::Id(start)).unwrap();
        let expected: Vec<u64> = (0..=start).rev().collect();
        assert_eq!(ids, expected);
    }
}

#[test]
fn test_iterate_from_missing_id() {
    let (store, _) = store_with_records(2);
    let reader = reader(&store);

    assert!(matches!(
        collect_ids(&reader, Position::Id(2)),
        Err(ChainError::NotFound)
    ));
}

#[test]
fn test_iterate_yields_same_records_as_read() {
    let (store, _) = store_with_records(8);
    let reader = reader(&store);

    let mut visited = Vec::new();
    reader
        .iterate(Position::Last, |view| {
            visited.push(view.into_record());
            Ok::<_, ChainError>(true)
        })
        .unwrap();

    assert_eq!(visited.len(), 8);
    for record in visited {
        assert_eq!(record, reader.read(record.id).unwrap());
    }
}

#[test]
fn test_iterate_view_exposes_raw_bytes() {
    let (store, hashes) = store_with_records(2);
    let reader = reader(&store);

    reader
        .iterate(Position::Id(1), |view| {
            assert_eq!(view.message_bytes, &msg(&format!("message {}", view.id))[..]);
            assert_eq!(view.hash, &hashes[view.id as usize][..]);
            Ok::<_, ChainError>(true)
        })
        .unwrap();
}

#[test]
fn test_iterate_stops_on_false() {
    let (store, _) = store_with_records(10);
    let reader = reader(&store);

    let mut ids = Vec::new();
    reader
        .iterate(Position::Last, |record| {
            ids.push(record.id);
            Ok::<_, ChainError>(ids.len() < 3)
        })
        .unwrap();

    assert_eq!(ids, vec![9, 8, 7]);
}

#[test]
fn test_iterate_propagates_visitor_error() {
    let (store, _) = store_with_records(5);
    let reader = reader(&store);

    let result = reader.iterate(Position::Last, |record| {
        if record.id == 2 {
            Err("stop here")
        } else {
            Ok(true)
        }
    });

    match result {
        Err(ChainError::Visit { id, source }) => {
            assert_eq!(id, 2);
            assert_eq!(source.to_string(), "stop here");
        }
        other => panic!("expected visit error, got {:?}", other),
    }
}

// =============================================================================
// Integrity Tests
// =============================================================================

#[test]
fn test_corrupt_message_byte_fails_read() {
    let (store, _) = store_with_records(4);
    let reader = reader(&store);

    // first message byte of record 2
    store.corrupt(2 * RECORD_SIZE + 8, 0x01);

    assert!(matches!(reader.read(2), Err(ChainError::Integrity { id: 2 })));
    assert!(reader.read(1).is_ok());
}

#[test]
fn test_corrupt_every_byte_is_detected() {
    let (store, _) = store_with_records(3);
    let reader = reader(&store);

    // every timestamp and message byte of record 1
    for offset in RECORD_SIZE..RECORD_SIZE + 8 + MESSAGE_SIZE as u64 {
        store.corrupt(offset, 0x80);
        let err = reader.read(1).unwrap_err();
        assert!(err.is_integrity(), "offset {}: {:?}", offset, err);
        store.corrupt(offset, 0x80);
        assert!(reader.read(1).is_ok());
    }
}

#[test]
fn test_corrupt_hash_breaks_next_record() {
    let (store, _) = store_with_records(3);
    let reader = reader(&store);

    // last byte of record 0's hash
    store.corrupt(RECORD_SIZE - 1, 0xff);

    assert!(matches!(reader.read(0), Err(ChainError::Integrity { id: 0 })));
    assert!(matches!(reader.read(1), Err(ChainError::Integrity { id: 1 })));
    assert!(reader.read(2).is_ok());
}

#[test]
fn test_iterate_stops_at_corruption() {
    let (store, _) = store_with_records(5);
    let reader = reader(&store);

    store.corrupt(RECORD_SIZE * 2 + 3, 0x10);

    let mut ids = Vec::new();
    let result = reader.iterate(Position::Last, |record| {
        ids.push(record.id);
        Ok::<_, ChainError>(true)
    });

    assert!(matches!(result, Err(ChainError::Integrity { id: 2 })));
    assert_eq!(ids, vec![4, 3]);
}

#[test]
fn test_verify_detects_corruption() {
    let (store, _) = store_with_records(5);
    let reader = reader(&store);

    assert_eq!(reader.verify().unwrap(), 5);

    store.corrupt(10, 0x01);
    assert!(matches!(reader.verify(), Err(ChainError::Integrity { id: 0 })));
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncated_tail() {
    let (store, _) = store_with_records(3);
    let reader = reader(&store);

    store.truncate(3 * RECORD_SIZE - 5);

    // complete records are still readable
    assert!(reader.read(1).is_ok());
    assert_eq!(reader.read_last().unwrap().id, 1);
    assert_eq!(collect_ids(&reader, Position::Last).unwrap(), vec![1, 0]);

    // the torn record is never returned
    assert!(matches!(
        reader.read(2),
        Err(ChainError::IncompleteRead { .. })
    ));
    assert!(matches!(reader.verify(), Err(ChainError::Truncated { .. })));
}

#[test]
fn test_truncated_inside_first_record() {
    let (store, _) = store_with_records(1);
    let reader = reader(&store);

    store.truncate(20);

    assert!(matches!(reader.read(0), Err(ChainError::IncompleteRead { .. })));
    assert!(matches!(reader.read_last(), Err(ChainError::NotFound)));
}

// =============================================================================
// Codec Tests
// =============================================================================

#[test]
fn test_padded_string_messages() {
    let store = MemStore::new();
    let config = ChainConfig::with_message_size(32);
    let writer = Writer::new(store.clone(), sha256_factory(), PaddedStrCodec::new(32), &config)
        .unwrap();

    writer.write(1, &"short".to_string()).unwrap();
    writer.write(2, &"a somewhat longer message".to_string()).unwrap();

    let reader = Reader::new(store, sha256_factory(), PaddedStrCodec::new(32));
    assert_eq!(reader.read(0).unwrap().message, "short");
    assert_eq!(reader.read_last().unwrap().message, "a somewhat longer message");
}

#[test]
fn test_undecodable_message_reports_record_id() {
    let store = MemStore::new();
    let writer = Writer::new(
        store.clone(),
        sha256_factory(),
        RawCodec::new(MESSAGE_SIZE),
        &ChainConfig::with_message_size(MESSAGE_SIZE),
    )
    .unwrap();
    writer.write(1, &msg("message 0")).unwrap();
    writer.write(2, &Bytes::from(vec![0xff; MESSAGE_SIZE])).unwrap();

    let reader = Reader::new(store, sha256_factory(), PaddedStrCodec::new(MESSAGE_SIZE));
    assert_eq!(reader.read(0).unwrap().message, "message 0");

    match reader.read(1) {
        Err(ChainError::Decode { id: 1, source }) => {
            assert!(matches!(*source, ChainError::Codec(_)));
        }
        other => panic!("expected decode error for record 1, got {:?}", other),
    }

    let mut visited = Vec::new();
    let result = reader.iterate(Position::Last, |view| {
        visited.push(view.id);
        Ok::<_, ChainError>(true)
    });
    assert!(matches!(result, Err(ChainError::Decode { id: 1, .. })));
    assert!(visited.is_empty());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_readers() {
    let (store, hashes) = store_with_records(20);
    let reader = Arc::new(reader(&store));
    let hashes = Arc::new(hashes);

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let reader = Arc::clone(&reader);
            let hashes = Arc::clone(&hashes);
            std::thread::spawn(move || {
                for round in 0..20u64 {
                    let id = (t * 7 + round) % 20;
                    let record = reader.read(id).unwrap();
                    assert_eq!(record.hash, hashes[id as usize]);
                }
                let mut count = 0;
                reader
                    .iterate(Position::Last, |_| {
                        count += 1;
                        Ok::<_, ChainError>(true)
                    })
                    .unwrap();
                assert_eq!(count, 20);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
