//! Column list of a part and its `columns.txt` text form.
//!
//! ```text
//! columns format version: 1
//! 3 columns:
//! `id` UInt64
//! `n.a` Array(String)
//! `score` Nullable(Float64)
//! ```

use std::fmt::Write as _;
use std::io::Write;

use super::column_type::ColumnType;
use super::constants::COLUMNS_FORMAT_VERSION;
use super::error::SchemaError;

/// A column name with its declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAndType {
    /// Column name, possibly `nested.member`
    pub name: String,
    /// Declared type
    pub column_type: ColumnType,
}

impl NameAndType {
    /// Create a new name/type pair
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered list of the columns stored in a part
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamesAndTypesList {
    columns: Vec<NameAndType>,
}

impl NamesAndTypesList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn push(&mut self, name: impl Into<String>, column_type: ColumnType) {
        self.columns.push(NameAndType::new(name, column_type));
    }

    /// Builder-style [`push`](Self::push)
    pub fn with(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.push(name, column_type);
        self
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the list has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, NameAndType> {
        self.columns.iter()
    }

    /// Look up a column by name
    pub fn get(&self, name: &str) -> Option<&NameAndType> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in declaration order
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Serialize in the `columns.txt` format
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "columns format version: {}", COLUMNS_FORMAT_VERSION);
        let _ = writeln!(out, "{} columns:", self.columns.len());
        for column in &self.columns {
            let _ = writeln!(out, "{} {}", back_quote(&column.name), column.column_type);
        }
        out
    }

    /// Write the `columns.txt` form to `out`
    pub fn write_text<W: Write>(&self, mut out: W) -> Result<(), SchemaError> {
        out.write_all(self.to_text().as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Parse the `columns.txt` form
    pub fn read_text(text: &str) -> Result<Self, SchemaError> {
        let mut lines = text.lines();

        let version_line = lines
            .next()
            .ok_or_else(|| SchemaError::ColumnsFormat("empty input".to_string()))?;
        let version = version_line
            .strip_prefix("columns format version: ")
            .ok_or_else(|| SchemaError::ColumnsFormat(format!("bad header '{}'", version_line)))?;
        if version.trim() != COLUMNS_FORMAT_VERSION.to_string() {
            return Err(SchemaError::ColumnsFormat(format!(
                "unsupported version '{}'",
                version
            )));
        }

        let count_line = lines
            .next()
            .ok_or_else(|| SchemaError::ColumnsFormat("missing column count".to_string()))?;
        let count: usize = count_line
            .strip_suffix(" columns:")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| SchemaError::ColumnsFormat(format!("bad count line '{}'", count_line)))?;

        let mut list = NamesAndTypesList::new();
        for _ in 0..count {
            let line = lines
                .next()
                .ok_or_else(|| SchemaError::ColumnsFormat("fewer columns than declared".to_string()))?;
            let (name, rest) = parse_back_quoted(line)?;
            let type_text = rest.strip_prefix(' ').ok_or_else(|| {
                SchemaError::ColumnsFormat(format!("missing type for column '{}'", name))
            })?;
            list.push(name, type_text.parse()?);
        }

        if lines.any(|line| !line.trim().is_empty()) {
            return Err(SchemaError::ColumnsFormat(
                "more columns than declared".to_string(),
            ));
        }

        Ok(list)
    }
}

impl<'a> IntoIterator for &'a NamesAndTypesList {
    type Item = &'a NameAndType;
    type IntoIter = std::slice::Iter<'a, NameAndType>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl FromIterator<NameAndType> for NamesAndTypesList {
    fn from_iter<I: IntoIterator<Item = NameAndType>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Quote a name with backticks, escaping backticks, backslashes and control characters.
fn back_quote(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('`');
    for ch in name.chars() {
        match ch {
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('`');
    out
}

/// Parse a back-quoted name at the start of `line`, returning it and the remainder.
fn parse_back_quoted(line: &str) -> Result<(String, &str), SchemaError> {
    let body = line
        .strip_prefix('`')
        .ok_or_else(|| SchemaError::ColumnsFormat(format!("expected '`' in '{}'", line)))?;

    let mut name = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '`' => return Ok((name, &body[idx + 1..])),
            '\\' => {
                let (_, escaped) = chars.next().ok_or_else(|| {
                    SchemaError::ColumnsFormat(format!("dangling escape in '{}'", line))
                })?;
                name.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
            }
            other => name.push(other),
        }
    }

    Err(SchemaError::ColumnsFormat(format!(
        "unterminated name in '{}'",
        line
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarType;

    fn sample() -> NamesAndTypesList {
        NamesAndTypesList::new()
            .with("id", ScalarType::UInt64.into())
            .with("n.a", "Array(String)".parse().unwrap())
            .with("odd `name`\\", "Nullable(Float64)".parse().unwrap())
    }

    #[test]
    fn test_to_text_layout() {
        let text = sample().to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "columns format version: 1");
        assert_eq!(lines[1], "3 columns:");
        assert_eq!(lines[2], "`id` UInt64");
        assert_eq!(lines[3], "`n.a` Array(String)");
        assert_eq!(lines[4], "`odd \\`name\\`\\\\` Nullable(Float64)");
    }

    #[test]
    fn test_read_text_inverts_to_text() {
        let list = sample();
        assert_eq!(NamesAndTypesList::read_text(&list.to_text()).unwrap(), list);
    }

    #[test]
    fn test_read_text_rejects_count_mismatch() {
        let text = "columns format version: 1\n2 columns:\n`a` UInt8\n";
        assert!(NamesAndTypesList::read_text(text).is_err());

        let text = "columns format version: 1\n0 columns:\n`a` UInt8\n";
        assert!(NamesAndTypesList::read_text(text).is_err());
    }

    #[test]
    fn test_read_text_rejects_bad_header() {
        assert!(NamesAndTypesList::read_text("").is_err());
        assert!(NamesAndTypesList::read_text("columns format version: 9\n0 columns:\n").is_err());
    }
}
