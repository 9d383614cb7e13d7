//! Integration tests for mergepart
//!
//! These tests drive the public API end to end: write a part, then read its
//! metadata files back and check them against the bytes on disk.

use arrow::array::{
    ArrayRef, AsArray, Float64Array, Int32Builder, ListBuilder, StringArray, StringBuilder,
    UInt64Array,
};
use arrow::datatypes::UInt64Type;
use arrow::record_batch::RecordBatch;
use mergepart::compression::CompressionMethod;
use mergepart::prelude::*;
use mergepart::schema::{CHECKSUMS_FILE, COLUMNS_FILE, MARK_SIZE_BYTES, PRIMARY_INDEX_FILE};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn events_columns() -> NamesAndTypesList {
    NamesAndTypesList::new()
        .with("ts", ScalarType::UInt64.into())
        .with("host", ScalarType::String.into())
        .with("cpu", ColumnType::nullable(ScalarType::Float64.into()).unwrap())
        .with("labels.name", ColumnType::array(ScalarType::String.into()))
        .with(
            "buckets",
            ColumnType::array(ColumnType::array(ScalarType::Int32.into())),
        )
}

fn events_batch(start: usize, end: usize) -> RecordBatch {
    let ts: ArrayRef = Arc::new(UInt64Array::from_iter_values(
        (start..end).map(|i| 1_700_000_000 + i as u64),
    ));
    let host: ArrayRef = Arc::new(StringArray::from_iter_values(
        (start..end).map(|i| format!("host-{:02}", i % 12)),
    ));
    let cpu: ArrayRef = Arc::new(Float64Array::from_iter((start..end).map(|i| {
        if i % 5 == 0 {
            None
        } else {
            Some((i % 100) as f64)
        }
    })));

    let mut names = ListBuilder::new(StringBuilder::new());
    let mut buckets = ListBuilder::new(ListBuilder::new(Int32Builder::new()));
    for i in start..end {
        for j in 0..(i % 3) {
            names.values().append_value(format!("label{}", j));
        }
        names.append(true);
        for j in 0..(i % 2 + 1) {
            let inner = buckets.values();
            for k in 0..(i + j) % 3 {
                inner.values().append_value((i * 7 + k) as i32);
            }
            inner.append(true);
        }
        buckets.append(true);
    }

    RecordBatch::try_from_iter(vec![
        ("ts", ts),
        ("host", host),
        ("cpu", cpu),
        ("labels.name", Arc::new(names.finish()) as ArrayRef),
        ("buckets", Arc::new(buckets.finish()) as ArrayRef),
    ])
    .unwrap()
}

fn events_storage(config: WriterConfig) -> Storage {
    Storage::new(events_columns(), SortDescription::by_names(["ts"])).with_config(config)
}

fn write_events(dir: &Path, storage: &Storage, rows: usize, batch: usize) -> FinishedPart {
    let mut writer = MergedPartWriter::new(storage, dir, storage.columns.clone()).unwrap();
    let mut start = 0;
    while start < rows {
        let end = (start + batch).min(rows);
        writer.write(&events_batch(start, end)).unwrap();
        start = end;
    }
    writer.finish().unwrap()
}

/// Test the complete write-verify cycle
#[test]
fn test_write_verify_cycle() {
    let dir = tempdir().unwrap();
    let storage = events_storage(WriterConfig::default().with_index_granularity(100));
    let part = write_events(dir.path(), &storage, 1_050, 256);

    assert_eq!(part.marks_count, 11);
    assert_eq!(part.stats.rows_written, 1_050);
    assert_eq!(part.stats.batches_written, 5);

    // Read back both text files
    let columns =
        NamesAndTypesList::read_text(&fs::read_to_string(dir.path().join(COLUMNS_FILE)).unwrap())
            .unwrap();
    assert_eq!(columns, events_columns());

    let checksums =
        Checksums::read_text(&fs::read_to_string(dir.path().join(CHECKSUMS_FILE)).unwrap())
            .unwrap();
    assert_eq!(checksums, part.checksums);
    checksums.verify_files(dir.path()).unwrap();
    checksums.check_sizes(dir.path()).unwrap();

    // Every listed file exists, every file except the two text files is listed
    for entry in fs::read_dir(dir.path()).unwrap() {
        let name = entry.unwrap().file_name().to_string_lossy().into_owned();
        if name != COLUMNS_FILE && name != CHECKSUMS_FILE {
            assert!(checksums.contains(&name), "{} not in manifest", name);
        }
    }

    // One mark per granule in every marks file
    for (name, checksum) in checksums.iter() {
        if name.ends_with(".mrk") || name.ends_with(".null_mrk") {
            assert_eq!(
                checksum.file_size,
                (11 * MARK_SIZE_BYTES) as u64,
                "{}",
                name
            );
        }
    }

    for name in [
        "ts.bin",
        "host.bin",
        "cpu.bin",
        "cpu.null.bin",
        "labels%2Ename.bin",
        "labels.size0.bin",
        "buckets.bin",
        "buckets.size0.bin",
        "buckets.size1.bin",
        PRIMARY_INDEX_FILE,
    ] {
        assert!(checksums.contains(name), "missing {}", name);
    }
}

/// Test the primary index holds the key of every granule's first row
#[test]
fn test_primary_index_values() {
    let dir = tempdir().unwrap();
    let storage = events_storage(WriterConfig::default().with_index_granularity(64));
    let part = write_events(dir.path(), &storage, 200, 70);

    assert_eq!(part.index.len(), 1);
    let index = part.index[0].as_primitive::<UInt64Type>();
    let expected: Vec<u64> = (0..200)
        .step_by(64)
        .map(|i| 1_700_000_000 + i as u64)
        .collect();
    assert_eq!(index.values().to_vec(), expected);

    let on_disk = fs::read(dir.path().join(PRIMARY_INDEX_FILE)).unwrap();
    assert_eq!(on_disk.len(), expected.len() * 8);
    assert_eq!(
        u64::from_le_bytes(on_disk[8..16].try_into().unwrap()),
        1_700_000_064
    );
}

/// Test every codec produces a part that passes verification
#[test]
fn test_all_codecs() {
    for compression in [
        CompressionMethod::None,
        CompressionMethod::Lz4,
        CompressionMethod::Zstd(3),
        CompressionMethod::Deflate(6),
    ] {
        let dir = tempdir().unwrap();
        let config = WriterConfig {
            compression,
            min_compress_block_size: 512,
            max_compress_block_size: 4096,
            ..WriterConfig::default().with_index_granularity(32)
        };
        let part = write_events(dir.path(), &events_storage(config), 500, 123);
        part.checksums.verify_files(dir.path()).unwrap();
        assert_eq!(part.marks_count, 16, "{}", compression);
    }
}

/// Test codecs change the files but not the uncompressed content
#[test]
fn test_uncompressed_checksums_independent_of_codec() {
    let lz4_dir = tempdir().unwrap();
    let zstd_dir = tempdir().unwrap();
    let config = |compression| WriterConfig {
        compression,
        ..WriterConfig::default().with_index_granularity(50)
    };

    let lz4 = write_events(
        lz4_dir.path(),
        &events_storage(config(CompressionMethod::Lz4)),
        300,
        300,
    );
    let zstd = write_events(
        zstd_dir.path(),
        &events_storage(config(CompressionMethod::Zstd(9))),
        300,
        300,
    );

    let mut compared = 0;
    for (name, checksum) in lz4.checksums.iter().filter(|(_, c)| c.is_compressed) {
        let other = zstd.checksums.get(name).unwrap();
        checksum.check_equal(other, true, name).unwrap();
        assert!(checksum.check_equal(other, false, name).is_err(), "{}", name);
        compared += 1;
    }
    assert_eq!(compared, 9);
}

/// Test an empty part leaves nothing behind
#[test]
fn test_empty_part_removed() {
    let dir = tempdir().unwrap();
    let part_dir = dir.path().join("all_1_1_0");
    let storage = events_storage(WriterConfig::default());

    let mut writer = MergedPartWriter::new(&storage, &part_dir, storage.columns.clone()).unwrap();
    writer.write(&events_batch(0, 0)).unwrap();
    let part = writer.finish().unwrap();

    assert!(part.is_empty());
    assert!(part.checksums.is_empty());
    assert!(!part_dir.exists());
}

/// Test the direct I/O threshold only changes buffering
#[test]
fn test_large_column_estimates() {
    let plain_dir = tempdir().unwrap();
    let aio_dir = tempdir().unwrap();
    let storage = events_storage(WriterConfig::default().with_index_granularity(40));

    let plain = write_events(plain_dir.path(), &storage, 400, 100);

    let sizes: HashMap<String, u64> = [("host".to_string(), 10_000_000), ("ts".to_string(), 10)]
        .into_iter()
        .collect();
    let mut writer = MergedPartWriter::with_column_sizes(
        &storage,
        aio_dir.path(),
        storage.columns.clone(),
        &sizes,
        1_000_000,
    )
    .unwrap();
    for start in (0..400).step_by(100) {
        writer.write(&events_batch(start, start + 100)).unwrap();
    }
    let aio = writer.finish().unwrap();

    assert_eq!(plain.checksums, aio.checksums);
}

/// Test appending columns to an existing part
#[test]
fn test_append_columns_to_part() {
    let dir = tempdir().unwrap();
    let storage = events_storage(WriterConfig::default().with_index_granularity(25));
    let part = write_events(dir.path(), &storage, 120, 60);

    let mut appender = ColumnOnlyWriter::new(&storage, dir.path(), false).unwrap();
    for start in [0, 60] {
        let rows = start..start + 60;
        let batch = RecordBatch::try_from_iter(vec![(
            "region",
            Arc::new(StringArray::from_iter_values(
                rows.map(|i| if i % 2 == 0 { "eu" } else { "us" }),
            )) as ArrayRef,
        )])
        .unwrap();
        appender.write(&batch).unwrap();
    }
    let added = appender.finish().unwrap();

    assert_eq!(added.len(), 2);
    let marks = added.get("region.mrk").unwrap();
    assert_eq!(marks.file_size, (part.marks_count * MARK_SIZE_BYTES) as u64);
    added.verify_files(dir.path()).unwrap();

    let mut combined = part.checksums.clone();
    combined.extend(added);
    combined.verify_files(dir.path()).unwrap();
}

/// Test the same rows give the same bytes however they are batched
#[test]
fn test_batching_does_not_change_bytes() {
    let config = WriterConfig {
        min_compress_block_size: 128,
        max_compress_block_size: 1024,
        ..WriterConfig::default().with_index_granularity(16)
    };
    let storage = events_storage(config);

    let reference_dir = tempdir().unwrap();
    let reference = write_events(reference_dir.path(), &storage, 333, 333);

    for batch in [1, 7, 16, 17, 100] {
        let dir = tempdir().unwrap();
        let part = write_events(dir.path(), &storage, 333, batch);
        assert_eq!(part.checksums, reference.checksums, "batch size {}", batch);
    }
}
