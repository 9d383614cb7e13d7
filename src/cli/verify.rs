use anyhow::Result;
use log::info;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(feature = "colorized_output")]
use console::style;

use mergepart::schema::{
    checksum_file, escape_for_file_name, Checksum, Checksums, NamesAndTypesList, CHECKSUMS_FILE,
    COLUMNS_FILE, DATA_FILE_EXTENSION, MARKS_FILE_EXTENSION, NULL_MARKS_FILE_EXTENSION,
};

/// Verification check result status
#[derive(Debug, Clone)]
enum CheckStatus {
    Ok,
    Warning(String),
    Failed(String),
}

#[derive(Debug, Clone)]
struct Check {
    name: String,
    status: CheckStatus,
}

impl Check {
    fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Ok,
        }
    }

    fn warning(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warning(message.into()),
        }
    }

    fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Failed(message.into()),
        }
    }
}

/// Result of verifying one part directory
#[derive(Debug)]
struct VerifyReport {
    part: String,
    checks: Vec<Check>,
}

impl VerifyReport {
    fn new(part: impl Into<String>) -> Self {
        Self {
            part: part.into(),
            checks: Vec::new(),
        }
    }

    fn add(&mut self, check: Check) {
        self.checks.push(check);
    }

    fn has_failures(&self) -> bool {
        self.checks
            .iter()
            .any(|c| matches!(c.status, CheckStatus::Failed(_)))
    }

    fn count(&self, pred: fn(&CheckStatus) -> bool) -> usize {
        self.checks.iter().filter(|c| pred(&c.status)).count()
    }

    fn passed(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Ok))
    }

    fn warnings(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Warning(_)))
    }

    fn failures(&self) -> usize {
        self.count(|s| matches!(s, CheckStatus::Failed(_)))
    }

    #[cfg(feature = "colorized_output")]
    fn format_colored(&self) -> String {
        use console::Emoji;

        static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
        static WARN: Emoji<'_, '_> = Emoji("⚠", "[WARN]");
        static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

        let mut output = String::new();
        output.push_str(&format!("{}\n", style("Part Verification Report").bold().cyan()));
        output.push_str(&format!("{}\n", style("========================").cyan()));
        output.push_str(&format!("{}: {}\n\n", style("Part").bold(), self.part));

        for check in &self.checks {
            match &check.status {
                CheckStatus::Ok => {
                    output.push_str(&format!("[{}] {}\n", OK, style(&check.name).green()))
                }
                CheckStatus::Warning(msg) => output.push_str(&format!(
                    "[{}] {} - {}: {}\n",
                    WARN,
                    style(&check.name).yellow(),
                    style("WARNING").yellow().bold(),
                    msg
                )),
                CheckStatus::Failed(msg) => output.push_str(&format!(
                    "[{}] {} - {}: {}\n",
                    FAIL,
                    style(&check.name).red(),
                    style("FAILED").red().bold(),
                    msg
                )),
            }
        }

        output.push('\n');
        output.push_str(&format!(
            "{}: {} passed, {} warnings, {} failed\n\n",
            style("Summary").bold(),
            style(self.passed()).green(),
            style(self.warnings()).yellow(),
            style(self.failures()).red()
        ));
        if self.has_failures() {
            output.push_str(&format!("{}\n", style("Verification FAILED").red().bold()));
        } else {
            output.push_str(&format!("{}\n", style("Verification PASSED").green().bold()));
        }
        output
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Part Verification Report")?;
        writeln!(f, "========================")?;
        writeln!(f, "Part: {}", self.part)?;
        writeln!(f)?;

        for check in &self.checks {
            match &check.status {
                CheckStatus::Ok => writeln!(f, "[✓] {}", check.name)?,
                CheckStatus::Warning(msg) => writeln!(f, "[⚠] {} - WARNING: {}", check.name, msg)?,
                CheckStatus::Failed(msg) => writeln!(f, "[✗] {} - FAILED: {}", check.name, msg)?,
            }
        }

        writeln!(f)?;
        writeln!(
            f,
            "Summary: {} passed, {} warnings, {} failed",
            self.passed(),
            self.warnings(),
            self.failures()
        )?;
        writeln!(f)?;
        if self.has_failures() {
            writeln!(f, "Verification FAILED")
        } else {
            writeln!(f, "Verification PASSED")
        }
    }
}

/// Recompute every checksum of a part and report mismatches
pub fn run(part: PathBuf) -> Result<()> {
    info!("Verifying part {}", part.display());

    if !part.is_dir() {
        anyhow::bail!("Part directory does not exist: {}", part.display());
    }

    let report = verify_part(&part);

    #[cfg(feature = "colorized_output")]
    {
        println!("{}", report.format_colored());
    }

    #[cfg(not(feature = "colorized_output"))]
    {
        println!("{}", report);
    }

    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn verify_part(part: &Path) -> VerifyReport {
    let mut report = VerifyReport::new(part.display().to_string());

    let columns = match std::fs::read_to_string(part.join(COLUMNS_FILE))
        .map_err(|e| e.to_string())
        .and_then(|text| NamesAndTypesList::read_text(&text).map_err(|e| e.to_string()))
    {
        Ok(columns) => {
            report.add(Check::ok(format!("{} ({} columns)", COLUMNS_FILE, columns.len())));
            Some(columns)
        }
        Err(e) => {
            report.add(Check::failed(COLUMNS_FILE, e));
            None
        }
    };

    let checksums = match std::fs::read_to_string(part.join(CHECKSUMS_FILE))
        .map_err(|e| e.to_string())
        .and_then(|text| Checksums::read_text(&text).map_err(|e| e.to_string()))
    {
        Ok(checksums) => {
            report.add(Check::ok(format!("{} ({} files)", CHECKSUMS_FILE, checksums.len())));
            checksums
        }
        Err(e) => {
            report.add(Check::failed(CHECKSUMS_FILE, e));
            return report;
        }
    };

    for (name, expected) in checksums.iter() {
        report.add(check_file(part, name, expected));
    }

    if let Some(columns) = columns {
        for column in &columns {
            let data_file = format!("{}{}", escape_for_file_name(&column.name), DATA_FILE_EXTENSION);
            if !checksums.contains(&data_file) {
                report.add(Check::failed(
                    format!("column {}", column.name),
                    format!("{} is not listed in {}", data_file, CHECKSUMS_FILE),
                ));
            }
        }
    }

    report.add(check_marks_agree(&checksums));

    match unlisted_files(part, &checksums) {
        Ok(extra) if extra.is_empty() => {}
        Ok(extra) => report.add(Check::warning(
            "unlisted files",
            format!("not in {}: {}", CHECKSUMS_FILE, extra.join(", ")),
        )),
        Err(e) => report.add(Check::failed("part directory", e.to_string())),
    }

    report
}

fn check_file(part: &Path, name: &str, expected: &Checksum) -> Check {
    let actual = match checksum_file(&part.join(name)) {
        Ok(actual) => actual,
        Err(e) => return Check::failed(name, e.to_string()),
    };
    match Checksum::plain(expected.file_size, expected.file_hash).check_equal(&actual, false, name)
    {
        Ok(()) => Check::ok(format!("{} ({} bytes)", name, actual.file_size)),
        Err(e) => Check::failed(name, e.to_string()),
    }
}

/// Every marks file holds one 16-byte mark per granule, so all sizes agree
fn check_marks_agree(checksums: &Checksums) -> Check {
    let mut by_size: BTreeMap<u64, Vec<&str>> = BTreeMap::new();
    for (name, checksum) in checksums.iter() {
        if name.ends_with(MARKS_FILE_EXTENSION) || name.ends_with(NULL_MARKS_FILE_EXTENSION) {
            by_size.entry(checksum.file_size).or_default().push(name);
        }
    }

    match by_size.len() {
        0 => Check::warning("marks", "no marks files listed"),
        1 => Check::ok("marks files agree on granule count"),
        _ => Check::failed(
            "marks",
            by_size
                .iter()
                .map(|(size, names)| format!("{} bytes: {}", size, names.join(", ")))
                .collect::<Vec<_>>()
                .join("; "),
        ),
    }
}

fn unlisted_files(part: &Path, checksums: &Checksums) -> std::io::Result<Vec<String>> {
    let mut extra = Vec::new();
    for entry in std::fs::read_dir(part)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name != COLUMNS_FILE && name != CHECKSUMS_FILE && !checksums.contains(&name) {
            extra.push(name);
        }
    }
    extra.sort();
    Ok(extra)
}
