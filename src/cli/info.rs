use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use mergepart::schema::{
    escape_for_file_name, Checksums, NamesAndTypesList, CHECKSUMS_FILE, COLUMNS_FILE,
    MARKS_FILE_EXTENSION, MARK_SIZE_BYTES, PRIMARY_INDEX_FILE,
};

#[derive(Serialize)]
struct ColumnInfo {
    name: String,
    #[serde(rename = "type")]
    column_type: String,
}

#[derive(Serialize)]
struct PartInfo {
    part: String,
    columns: Vec<ColumnInfo>,
    has_primary_index: bool,
    marks: Option<u64>,
    total_size: u64,
    checksums: Checksums,
}

/// Display the columns and manifest of a part
pub fn run(part: PathBuf, json: bool) -> Result<()> {
    if !part.is_dir() {
        anyhow::bail!("Part directory does not exist: {}", part.display());
    }

    let info = load(&part)?;

    if json {
        let text = serde_json::to_string_pretty(&info).context("Failed to serialize part info")?;
        println!("{}", text);
        return Ok(());
    }

    println!("Part Information");
    println!("================");
    println!("Part: {}", info.part);
    println!();

    println!("Columns:");
    for (i, column) in info.columns.iter().enumerate() {
        println!("  {:3}. {} ({})", i + 1, column.name, column.column_type);
    }
    println!();

    println!("Part Statistics:");
    match info.marks {
        Some(marks) => println!("  Marks: {}", marks),
        None => println!("  Marks: unknown"),
    }
    println!(
        "  Primary index: {}",
        if info.has_primary_index { "yes" } else { "no" }
    );
    println!(
        "  Total size: {} bytes ({:.2} MB)",
        info.total_size,
        info.total_size as f64 / 1024.0 / 1024.0
    );
    println!();

    println!("Files ({}):", info.checksums.len());
    for (name, checksum) in info.checksums.iter() {
        if checksum.is_compressed {
            println!(
                "  {:<32} {:>12} bytes  {:032x}  (uncompressed {} bytes)",
                name, checksum.file_size, checksum.file_hash, checksum.uncompressed_size
            );
        } else {
            println!(
                "  {:<32} {:>12} bytes  {:032x}",
                name, checksum.file_size, checksum.file_hash
            );
        }
    }

    Ok(())
}

fn load(part: &Path) -> Result<PartInfo> {
    let columns_text = std::fs::read_to_string(part.join(COLUMNS_FILE))
        .with_context(|| format!("Failed to read {}", COLUMNS_FILE))?;
    let columns = NamesAndTypesList::read_text(&columns_text)
        .with_context(|| format!("Failed to parse {}", COLUMNS_FILE))?;

    let checksums_text = std::fs::read_to_string(part.join(CHECKSUMS_FILE))
        .with_context(|| format!("Failed to read {}", CHECKSUMS_FILE))?;
    let checksums = Checksums::read_text(&checksums_text)
        .with_context(|| format!("Failed to parse {}", CHECKSUMS_FILE))?;

    // Every data stream has one mark per granule; take the first column's.
    let marks = columns.iter().next().and_then(|column| {
        let name = format!("{}{}", escape_for_file_name(&column.name), MARKS_FILE_EXTENSION);
        checksums
            .get(&name)
            .map(|c| c.file_size / MARK_SIZE_BYTES as u64)
    });

    Ok(PartInfo {
        part: part.display().to_string(),
        columns: columns
            .iter()
            .map(|column| ColumnInfo {
                name: column.name.clone(),
                column_type: column.column_type.to_string(),
            })
            .collect(),
        has_primary_index: checksums.contains(PRIMARY_INDEX_FILE),
        marks,
        total_size: checksums.total_size(),
        checksums,
    })
}
