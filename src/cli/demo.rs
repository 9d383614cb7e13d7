use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, Float64Array, Int32Builder, ListBuilder, StringArray, StringBuilder, UInt32Builder,
    UInt64Array,
};
use arrow::record_batch::RecordBatch;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use mergepart::schema::{ColumnType, NamesAndTypesList, ScalarType, SortDescription};
use mergepart::writer::{MergeMode, MergedPartWriter, Storage};

use super::config::Config;
use super::profile::Profile;

/// Options of the `demo` command
pub struct DemoOptions {
    pub output: PathBuf,
    pub rows: usize,
    pub profile: Profile,
    pub config_path: Option<PathBuf>,
    pub unsorted: bool,
    pub batch_size: Option<usize>,
    pub granularity: Option<usize>,
}

const TAG_KEYS: [&str; 5] = ["env", "region", "host", "service", "version"];

/// Write a deterministic demo part
pub fn run(options: DemoOptions) -> Result<()> {
    let file_config = match options.config_path {
        Some(ref path) => Some(Config::from_file(path)?),
        None => None,
    };

    let mut writer_config = options.profile.writer_config();
    if let Some(ref config) = file_config {
        writer_config = config.apply(writer_config)?;
    }
    if let Some(granularity) = options.granularity {
        writer_config.index_granularity = granularity;
    }

    let batch_size = options
        .batch_size
        .or(file_config.as_ref().and_then(|c| c.writer.batch_size))
        .unwrap_or_else(|| options.profile.batch_size())
        .max(1);

    let merge_mode = if options.unsorted {
        MergeMode::Unsorted
    } else {
        MergeMode::Ordinary
    };

    let storage = Storage::new(demo_columns()?, SortDescription::by_names(["id"]))
        .with_merge_mode(merge_mode)
        .with_config(writer_config);

    info!("mergepart demo");
    info!("==============");
    info!("Output: {}", options.output.display());
    info!("Profile: {}", options.profile);
    info!("Merge mode: {}", storage.merge_mode);
    info!("Compression: {}", storage.config.compression);
    info!("Index granularity: {}", storage.config.index_granularity);
    info!("Rows: {} in batches of {}", options.rows, batch_size);

    let mut writer = MergedPartWriter::new(&storage, &options.output, storage.columns.clone())
        .context("Failed to create part writer")?;

    let mut start = 0;
    let mut batch_idx = 0;
    while start < options.rows {
        let end = (start + batch_size).min(options.rows);
        let batch = demo_batch(start, end).context("Failed to build demo batch")?;
        writer
            .write(&batch)
            .with_context(|| format!("Failed to write rows {}..{}", start, end))?;
        start = end;
        batch_idx += 1;

        if batch_idx % 10 == 0 {
            info!("  Written {} rows...", start);
        }
    }

    let part = writer.finish().context("Failed to finalize part")?;

    if part.is_empty() {
        println!("No rows written, part directory removed");
        return Ok(());
    }

    println!("Part written: {}", options.output.display());
    println!("  {}", part.stats);
    println!("  Marks: {}", part.marks_count);
    println!(
        "  Size on disk: {} bytes ({:.2} MB)",
        part.stats.bytes_on_disk,
        part.stats.bytes_on_disk as f64 / 1024.0 / 1024.0
    );

    Ok(())
}

fn demo_columns() -> Result<NamesAndTypesList> {
    Ok(NamesAndTypesList::new()
        .with("id", ScalarType::UInt64.into())
        .with("event", ScalarType::String.into())
        .with(
            "latency",
            ColumnType::nullable(ScalarType::Float64.into())?,
        )
        .with("tags.key", ColumnType::array(ScalarType::String.into()))
        .with("tags.value", ColumnType::array(ScalarType::UInt32.into()))
        .with(
            "samples",
            ColumnType::array(ColumnType::array(ScalarType::Int32.into())),
        ))
}

/// Rows `start..end` of the demo table; the content of a row depends only on
/// its number
fn demo_batch(start: usize, end: usize) -> Result<RecordBatch> {
    let ids: ArrayRef = Arc::new(UInt64Array::from_iter_values(
        (start..end).map(|i| i as u64),
    ));
    let events: ArrayRef = Arc::new(StringArray::from_iter_values(
        (start..end).map(|i| format!("event-{}", i % 97)),
    ));
    let latencies: ArrayRef = Arc::new(Float64Array::from_iter((start..end).map(|i| {
        if i % 7 == 3 {
            None
        } else {
            Some(((i * 31) % 1000) as f64 / 10.0)
        }
    })));

    let mut keys = ListBuilder::new(StringBuilder::new());
    let mut values = ListBuilder::new(UInt32Builder::new());
    let mut samples = ListBuilder::new(ListBuilder::new(Int32Builder::new()));
    for i in start..end {
        for j in 0..(i % TAG_KEYS.len()) {
            keys.values().append_value(TAG_KEYS[j]);
            values.values().append_value((i * 13 + j) as u32);
        }
        keys.append(true);
        values.append(true);

        for j in 0..(i % 3) {
            let inner = samples.values();
            for k in 0..((i + j) % 4) {
                inner.values().append_value((i + j * 10 + k) as i32);
            }
            inner.append(true);
        }
        samples.append(true);
    }

    Ok(RecordBatch::try_from_iter(vec![
        ("id", ids),
        ("event", events),
        ("latency", latencies),
        ("tags.key", Arc::new(keys.finish()) as ArrayRef),
        ("tags.value", Arc::new(values.finish()) as ArrayRef),
        ("samples", Arc::new(samples.finish()) as ArrayRef),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mergepart::schema::{validate_schema, Checksums, CHECKSUMS_FILE};
    use tempfile::tempdir;

    #[test]
    fn test_demo_batch_matches_columns() {
        let batch = demo_batch(10, 60).unwrap();
        assert_eq!(batch.num_rows(), 50);
        validate_schema(batch.schema_ref(), &demo_columns().unwrap()).unwrap();
    }

    #[test]
    fn test_demo_writes_verifiable_part() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("part");
        run(DemoOptions {
            output: output.clone(),
            rows: 1_000,
            profile: Profile::Fast,
            config_path: None,
            unsorted: false,
            batch_size: Some(333),
            granularity: Some(64),
        })
        .unwrap();

        let text = std::fs::read_to_string(output.join(CHECKSUMS_FILE)).unwrap();
        let checksums = Checksums::read_text(&text).unwrap();
        assert!(checksums.contains("samples.size0.bin"));
        assert!(checksums.contains("samples.size1.bin"));
        assert!(checksums.contains("tags.size0.bin"));
        checksums.verify_files(&output).unwrap();
    }
}
