//! Property tests: the bytes of a part never depend on how rows are batched.

use arrow::array::{ArrayRef, Int64Array, ListBuilder, StringArray, UInt16Builder};
use arrow::record_batch::RecordBatch;
use mergepart::prelude::*;
use mergepart::writer::{next_index_offset, plan_granules};
use proptest::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn columns() -> NamesAndTypesList {
    NamesAndTypesList::new()
        .with("k", ScalarType::Int64.into())
        .with("s", ColumnType::nullable(ScalarType::String.into()).unwrap())
        .with("n.a", ColumnType::array(ScalarType::UInt16.into()))
        .with("n.b", ColumnType::array(ScalarType::UInt16.into()))
}

fn batch(start: usize, end: usize) -> RecordBatch {
    let k: ArrayRef = Arc::new(Int64Array::from_iter_values(
        (start..end).map(|i| i as i64 * 3 - 100),
    ));
    let s: ArrayRef = Arc::new(StringArray::from_iter((start..end).map(|i| {
        if i % 4 == 2 {
            None
        } else {
            Some("x".repeat(i % 9))
        }
    })));
    let mut a = ListBuilder::new(UInt16Builder::new());
    let mut b = ListBuilder::new(UInt16Builder::new());
    for i in start..end {
        for j in 0..(i % 5) {
            a.values().append_value((i + j) as u16);
            b.values().append_value((i * j) as u16);
        }
        a.append(true);
        b.append(true);
    }
    RecordBatch::try_from_iter(vec![
        ("k", k),
        ("s", s),
        ("n.a", Arc::new(a.finish()) as ArrayRef),
        ("n.b", Arc::new(b.finish()) as ArrayRef),
    ])
    .unwrap()
}

fn write(dir: &Path, storage: &Storage, splits: &[usize]) -> FinishedPart {
    let mut writer = MergedPartWriter::new(storage, dir, storage.columns.clone()).unwrap();
    let mut start = 0;
    for &rows in splits {
        writer.write(&batch(start, start + rows)).unwrap();
        start += rows;
    }
    writer.finish().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any split of the same rows yields byte-identical files
    #[test]
    fn test_split_invariance(
        granularity in 1usize..40,
        min_block in 0usize..200,
        splits in prop::collection::vec(0usize..60, 1..8),
    ) {
        let total: usize = splits.iter().sum();
        prop_assume!(total > 0);

        let config = WriterConfig {
            index_granularity: granularity,
            min_compress_block_size: min_block,
            max_compress_block_size: 256,
            ..WriterConfig::default()
        };
        let storage = Storage::new(columns(), SortDescription::by_names(["k"])).with_config(config);

        let whole_dir = tempdir().unwrap();
        let split_dir = tempdir().unwrap();
        let whole = write(whole_dir.path(), &storage, &[total]);
        let split = write(split_dir.path(), &storage, &splits);

        prop_assert_eq!(whole.marks_count, (total + granularity - 1) / granularity);
        prop_assert_eq!(split.marks_count, whole.marks_count);
        prop_assert_eq!(&split.checksums, &whole.checksums);
        prop_assert_eq!(&split.index, &whole.index);
    }

    /// Granule plans tile the rows and honor the carried-over offset
    #[test]
    fn test_granule_plan_tiles_rows(
        granularity in 1usize..50,
        calls in prop::collection::vec(0usize..120, 1..10),
    ) {
        let mut offset = 0;
        let mut marks = 0;
        let mut total = 0;
        for &rows in &calls {
            let granules = plan_granules(rows, offset, granularity);
            let mut next = 0;
            for granule in &granules {
                prop_assert_eq!(granule.start, next);
                prop_assert!(granule.len > 0 && granule.len <= granularity);
                next = granule.start + granule.len;
            }
            prop_assert_eq!(next, rows);
            marks += granules.iter().filter(|g| g.starts_mark).count();
            total += rows;
            offset = next_index_offset(offset, rows, granularity);
            prop_assert!(offset < granularity);
        }
        prop_assert_eq!(marks, (total + granularity - 1) / granularity);
    }
}
