//! Spill segments through the spill manager, on both storage backends.

use std::sync::Arc;

use spillway_core::id::SpillId;
use spillway_core::prelude::{Tuple, Value};
use spillway_io::{FsStorage, MemoryStorage};
use spillway_mem::spill::{FRAME_HEADER_LEN, HEADER_LEN};
use spillway_mem::{Codec, Error, SegmentName, SpillManager};

fn sample_tuples() -> Vec<Tuple> {
    (0..7)
        .map(|i| {
            Tuple::new(vec![
                Value::Int(i),
                Value::Real(i as f64 / 2.0),
                if i % 3 == 0 { Value::Null } else { Value::from(format!("s{i}")) },
            ])
        })
        .collect()
}

fn write_sample(spill: &SpillManager, name: SegmentName) {
    let mut writer = spill.create_segment(name, 3).expect("create");
    for t in sample_tuples() {
        writer.push(t).expect("push");
    }
    let stats = writer.finish().expect("finish");
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.tuples, 7);
}

fn read_all(spill: &SpillManager, name: &SegmentName) -> Vec<Vec<Tuple>> {
    let mut reader = spill.open_segment(name).expect("open");
    let mut pages = Vec::new();
    while let Some(page) = reader.next_page().expect("page") {
        pages.push(page);
    }
    pages
}

fn temp_root(name: &str) -> String {
    let mut dir = std::env::temp_dir();
    dir.push(format!("spillway-segment-tests-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.to_string_lossy().to_string()
}

#[test]
fn test_segment_pages_on_memory_storage() {
    let spill = SpillManager::new(Arc::new(MemoryStorage::new()), Codec::None, "mem");
    let name = SegmentName::new(SpillId::new(4), 1, 2);
    write_sample(&spill, name);

    let pages = read_all(&spill, &name);
    assert_eq!(pages.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 1]);
    assert_eq!(pages.concat(), sample_tuples());
    assert_eq!(spill.path_of(&name).expect("path"), "mem/spill4_p1_r2.seg");
}

#[test]
fn test_segment_pages_on_filesystem() {
    let root = temp_root("fs");
    let spill = SpillManager::new(Arc::new(FsStorage::new()), Codec::None, root.clone());
    let name = SegmentName::new(SpillId::new(0), 0, 0);
    write_sample(&spill, name);

    let path = spill.path_of(&name).expect("path");
    assert!(std::path::Path::new(&path).exists());
    assert_eq!(read_all(&spill, &name).concat(), sample_tuples());

    spill.delete_segment(&name).expect("delete");
    assert!(!std::path::Path::new(&path).exists());
    assert!(spill.list_segments().is_empty());
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn test_reader_restarts_from_first_page() {
    let spill = SpillManager::new(Arc::new(MemoryStorage::new()), Codec::None, "mem");
    let name = SegmentName::new(SpillId::new(1), 0, 0);
    write_sample(&spill, name);
    assert_eq!(read_all(&spill, &name), read_all(&spill, &name));
}

#[test]
fn test_torn_frame_is_reported_as_truncated() {
    let storage = MemoryStorage::new();
    let spill = SpillManager::new(Arc::new(storage.clone()), Codec::None, "mem");
    let name = SegmentName::new(SpillId::new(2), 0, 0);
    write_sample(&spill, name);
    let path = spill.path_of(&name).expect("path");

    // Keep the header and half of the first frame header.
    storage.truncate(&path, HEADER_LEN + FRAME_HEADER_LEN / 2).expect("truncate");
    let mut reader = spill.open_segment(&name).expect("open");
    let err = reader.next_page().err().expect("should fail");
    assert!(matches!(err, Error::Truncated { .. }), "got {err}");
}

#[test]
fn test_header_only_segment_is_empty() {
    let storage = MemoryStorage::new();
    let spill = SpillManager::new(Arc::new(storage.clone()), Codec::None, "mem");
    let name = SegmentName::new(SpillId::new(3), 0, 0);
    write_sample(&spill, name);
    let path = spill.path_of(&name).expect("path");

    storage.truncate(&path, HEADER_LEN).expect("truncate");
    assert!(read_all(&spill, &name).is_empty());

    storage.truncate(&path, HEADER_LEN - 1).expect("truncate");
    let err = spill.open_segment(&name).err().expect("should fail");
    assert!(matches!(err, Error::Truncated { offset: 0, .. }), "got {err}");
}

#[test]
fn test_flipped_payload_byte_fails_checksum() {
    let storage = MemoryStorage::new();
    let spill = SpillManager::new(Arc::new(storage.clone()), Codec::None, "mem");
    let name = SegmentName::new(SpillId::new(5), 0, 0);
    write_sample(&spill, name);
    let path = spill.path_of(&name).expect("path");

    storage.corrupt(&path, HEADER_LEN + FRAME_HEADER_LEN + 1).expect("corrupt");
    let mut reader = spill.open_segment(&name).expect("open");
    let err = reader.next_page().err().expect("should fail");
    assert!(matches!(err, Error::ChecksumMismatch(_)), "got {err}");
}

#[test]
fn test_bad_magic_is_rejected() {
    let storage = MemoryStorage::new();
    let spill = SpillManager::new(Arc::new(storage.clone()), Codec::None, "mem");
    let name = SegmentName::new(SpillId::new(6), 0, 0);
    write_sample(&spill, name);
    let path = spill.path_of(&name).expect("path");

    storage.corrupt(&path, 0).expect("corrupt");
    assert!(spill.open_segment(&name).is_err());
}

#[test]
fn test_segments_are_listed_per_spill_id() {
    let storage = MemoryStorage::new();
    let spill = SpillManager::new(Arc::new(storage.clone()), Codec::None, "mem");
    let names = [
        SegmentName::new(SpillId::new(9), 0, 1),
        SegmentName::new(SpillId::new(8), 0, 0),
        SegmentName::new(SpillId::new(9), 0, 0),
    ];
    for name in names {
        write_sample(&spill, name);
    }
    assert_eq!(spill.list_segments().len(), 3);
    assert_eq!(
        spill.segments_for(SpillId::new(9)),
        vec![names[2], names[0]]
    );

    for name in spill.segments_for(SpillId::new(9)) {
        spill.delete_segment(&name).expect("delete");
    }
    assert_eq!(spill.list_segments(), vec![names[1]]);
    assert_eq!(storage.len(), 1);
    // Deleting twice is harmless.
    spill.delete_segment(&names[0]).expect("second delete");
}

#[cfg(feature = "zstd")]
#[test]
fn test_zstd_frames_roundtrip() {
    let spill = SpillManager::new(Arc::new(MemoryStorage::new()), Codec::Zstd, "mem");
    let name = SegmentName::new(SpillId::new(10), 0, 0);
    write_sample(&spill, name);
    assert_eq!(read_all(&spill, &name).concat(), sample_tuples());
}

#[cfg(feature = "lz4")]
#[test]
fn test_lz4_frames_roundtrip() {
    let spill = SpillManager::new(Arc::new(MemoryStorage::new()), Codec::Lz4, "mem");
    let name = SegmentName::new(SpillId::new(11), 0, 0);
    write_sample(&spill, name);
    assert_eq!(read_all(&spill, &name).concat(), sample_tuples());
}
