use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field};

use super::error::SchemaError;

/// Leaf value types that serialize without side streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Unsigned 8-bit integer
    UInt8,
    /// Unsigned 16-bit integer
    UInt16,
    /// Unsigned 32-bit integer
    UInt32,
    /// Unsigned 64-bit integer
    UInt64,
    /// Signed 8-bit integer
    Int8,
    /// Signed 16-bit integer
    Int16,
    /// Signed 32-bit integer
    Int32,
    /// Signed 64-bit integer
    Int64,
    /// 32-bit IEEE float
    Float32,
    /// 64-bit IEEE float
    Float64,
    /// Variable-length UTF-8 string
    String,
}

impl ScalarType {
    const ALL: [ScalarType; 11] = [
        ScalarType::UInt8,
        ScalarType::UInt16,
        ScalarType::UInt32,
        ScalarType::UInt64,
        ScalarType::Int8,
        ScalarType::Int16,
        ScalarType::Int32,
        ScalarType::Int64,
        ScalarType::Float32,
        ScalarType::Float64,
        ScalarType::String,
    ];

    /// Type name as written in `columns.txt`
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::UInt8 => "UInt8",
            ScalarType::UInt16 => "UInt16",
            ScalarType::UInt32 => "UInt32",
            ScalarType::UInt64 => "UInt64",
            ScalarType::Int8 => "Int8",
            ScalarType::Int16 => "Int16",
            ScalarType::Int32 => "Int32",
            ScalarType::Int64 => "Int64",
            ScalarType::Float32 => "Float32",
            ScalarType::Float64 => "Float64",
            ScalarType::String => "String",
        }
    }

    /// Arrow type holding values of this type in memory
    pub fn arrow_type(&self) -> DataType {
        match self {
            ScalarType::UInt8 => DataType::UInt8,
            ScalarType::UInt16 => DataType::UInt16,
            ScalarType::UInt32 => DataType::UInt32,
            ScalarType::UInt64 => DataType::UInt64,
            ScalarType::Int8 => DataType::Int8,
            ScalarType::Int16 => DataType::Int16,
            ScalarType::Int32 => DataType::Int32,
            ScalarType::Int64 => DataType::Int64,
            ScalarType::Float32 => DataType::Float32,
            ScalarType::Float64 => DataType::Float64,
            ScalarType::String => DataType::Utf8,
        }
    }

    /// Inverse of [`ScalarType::arrow_type`]
    pub fn from_arrow(data_type: &DataType) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|scalar| &scalar.arrow_type() == data_type)
    }

    /// Serialized width in bytes, `None` for variable-length types
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ScalarType::UInt8 | ScalarType::Int8 => Some(1),
            ScalarType::UInt16 | ScalarType::Int16 => Some(2),
            ScalarType::UInt32 | ScalarType::Int32 | ScalarType::Float32 => Some(4),
            ScalarType::UInt64 | ScalarType::Int64 | ScalarType::Float64 => Some(8),
            ScalarType::String => None,
        }
    }
}

/// Declared type of a column.
///
/// Each variant maps to a fixed set of on-disk streams: a scalar to one data
/// stream, an array to a sizes stream plus the streams of its element type, a
/// nullable to a null-map stream plus the streams of its inner type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Plain values
    Scalar(ScalarType),
    /// Variable-length array of the element type
    Array(Box<ColumnType>),
    /// Scalar with a per-row null flag
    Nullable(Box<ColumnType>),
}

impl ColumnType {
    /// `Array(element)`
    pub fn array(element: ColumnType) -> Self {
        ColumnType::Array(Box::new(element))
    }

    /// `Nullable(inner)`, rejected unless `inner` is a scalar
    pub fn nullable(inner: ColumnType) -> Result<Self, SchemaError> {
        match inner {
            ColumnType::Scalar(_) => Ok(ColumnType::Nullable(Box::new(inner))),
            other => Err(SchemaError::InvalidType(format!(
                "Nullable({}) is not allowed: only scalar types can be nullable",
                other
            ))),
        }
    }

    /// Whether this type carries a null map at the top level
    pub fn is_nullable(&self) -> bool {
        matches!(self, ColumnType::Nullable(_))
    }

    /// Innermost scalar type
    pub fn leaf(&self) -> ScalarType {
        match self {
            ColumnType::Scalar(scalar) => *scalar,
            ColumnType::Array(inner) | ColumnType::Nullable(inner) => inner.leaf(),
        }
    }

    /// Number of array levels
    pub fn array_depth(&self) -> usize {
        match self {
            ColumnType::Scalar(_) => 0,
            ColumnType::Array(inner) => 1 + inner.array_depth(),
            ColumnType::Nullable(inner) => inner.array_depth(),
        }
    }

    /// Arrow type used for in-memory columns of this type
    pub fn arrow_type(&self) -> DataType {
        match self {
            ColumnType::Scalar(scalar) => scalar.arrow_type(),
            ColumnType::Nullable(inner) => inner.arrow_type(),
            ColumnType::Array(element) => DataType::List(Arc::new(Field::new(
                "item",
                element.arrow_type(),
                element.is_nullable(),
            ))),
        }
    }

    /// Whether an Arrow column of `data_type` can be written as this type.
    ///
    /// Field names and nullability flags of nested Arrow fields are ignored;
    /// only the physical layout has to match.
    pub fn accepts(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (ColumnType::Nullable(inner), _) => inner.accepts(data_type),
            (ColumnType::Array(element), DataType::List(field)) => {
                element.accepts(field.data_type())
            }
            (ColumnType::Scalar(scalar), _) => &scalar.arrow_type() == data_type,
            _ => false,
        }
    }

    /// Derive a column type from an Arrow field.
    ///
    /// A nullable field maps to `Nullable(..)` only when its type is scalar;
    /// list nullability is ignored because arrays cannot be nullable.
    pub fn from_arrow_field(field: &Field) -> Result<Self, SchemaError> {
        let base = match field.data_type() {
            DataType::List(element) => ColumnType::array(Self::from_arrow_field(element)?),
            other => ColumnType::Scalar(ScalarType::from_arrow(other).ok_or_else(|| {
                SchemaError::UnsupportedArrowType(format!("{}: {:?}", field.name(), other))
            })?),
        };

        if field.is_nullable() && matches!(base, ColumnType::Scalar(_)) {
            ColumnType::nullable(base)
        } else {
            Ok(base)
        }
    }
}

impl From<ScalarType> for ColumnType {
    fn from(scalar: ScalarType) -> Self {
        ColumnType::Scalar(scalar)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Scalar(scalar) => write!(f, "{}", scalar),
            ColumnType::Array(element) => write!(f, "Array({})", element),
            ColumnType::Nullable(inner) => write!(f, "Nullable({})", inner),
        }
    }
}

impl FromStr for ScalarType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scalar| scalar.name() == s)
            .ok_or_else(|| SchemaError::UnknownType(s.to_string()))
    }
}

impl FromStr for ColumnType {
    type Err = SchemaError;

    /// Parses `UInt64`, `Array(String)`, `Array(Nullable(Int32))` and so on.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(inner) = strip_wrapper(s, "Array")? {
            return Ok(ColumnType::array(inner.parse()?));
        }
        if let Some(inner) = strip_wrapper(s, "Nullable")? {
            return ColumnType::nullable(inner.parse()?);
        }
        if s.contains(|c| c == '(' || c == ')') {
            return Err(SchemaError::UnknownType(s.to_string()));
        }

        Ok(ColumnType::Scalar(s.parse()?))
    }
}

/// Returns the argument of `Wrapper(arg)`, or `None` if `s` is not that wrapper.
fn strip_wrapper<'a>(s: &'a str, wrapper: &str) -> Result<Option<&'a str>, SchemaError> {
    let Some(rest) = s.strip_prefix(wrapper) else {
        return Ok(None);
    };
    let rest = rest.trim_start();
    let Some(rest) = rest.strip_prefix('(') else {
        return Ok(None);
    };
    let inner = rest.strip_suffix(')').ok_or_else(|| {
        SchemaError::InvalidType(format!("Unbalanced parentheses in '{}'", s))
    })?;
    if inner.trim().is_empty() {
        return Err(SchemaError::InvalidType(format!("Missing type argument in '{}'", s)));
    }
    Ok(Some(inner))
}
