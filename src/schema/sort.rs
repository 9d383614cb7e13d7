use std::fmt;

/// One column of a sort key, referenced by name or by position in the batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortColumn {
    /// Column looked up by name
    Name(String),
    /// Column at a fixed position in the batch schema
    Position(usize),
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortColumn::Name(name) => f.write_str(name),
            SortColumn::Position(pos) => write!(f, "#{}", pos),
        }
    }
}

impl From<&str> for SortColumn {
    fn from(name: &str) -> Self {
        SortColumn::Name(name.to_string())
    }
}

impl From<usize> for SortColumn {
    fn from(position: usize) -> Self {
        SortColumn::Position(position)
    }
}

/// Ordered list of the columns that make up the primary key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortDescription {
    columns: Vec<SortColumn>,
}

impl SortDescription {
    /// Create an empty sort description
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort by the named columns, in order
    pub fn by_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names.into_iter().map(|n| SortColumn::Name(n.into())).collect(),
        }
    }

    /// Append a key column
    pub fn push(&mut self, column: impl Into<SortColumn>) {
        self.columns.push(column.into());
    }

    /// Key columns in order
    pub fn columns(&self) -> &[SortColumn] {
        &self.columns
    }

    /// Number of key columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the key is empty
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<SortColumn> for SortDescription {
    fn from_iter<I: IntoIterator<Item = SortColumn>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_sort_description() {
        let mut sort = SortDescription::by_names(["id"]);
        sort.push(2usize);
        assert_eq!(sort.len(), 2);
        assert_eq!(sort.columns()[0], SortColumn::Name("id".to_string()));
        assert_eq!(sort.columns()[1].to_string(), "#2");
    }
}
