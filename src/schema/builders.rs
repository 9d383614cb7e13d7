use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{Field, Schema, SchemaBuilder};

use super::column_type::ColumnType;
use super::columns::{NameAndType, NamesAndTypesList};
use super::error::SchemaError;

/// Field metadata key holding the declared column type
pub const COLUMN_TYPE_METADATA_KEY: &str = "column_type";

/// Creates a Field annotated with its declared column type
fn field_with_type(name: &str, column_type: &ColumnType) -> Field {
    let mut metadata = HashMap::new();
    metadata.insert(
        COLUMN_TYPE_METADATA_KEY.to_string(),
        column_type.to_string(),
    );
    Field::new(name, column_type.arrow_type(), column_type.is_nullable()).with_metadata(metadata)
}

/// Creates the Arrow schema of batches holding `columns`.
///
/// # Example
///
/// ```
/// use mergepart::schema::{create_arrow_schema, NamesAndTypesList, ScalarType};
///
/// let columns = NamesAndTypesList::new().with("id", ScalarType::UInt64.into());
/// let schema = create_arrow_schema(&columns);
/// assert_eq!(schema.fields().len(), 1);
/// ```
pub fn create_arrow_schema(columns: &NamesAndTypesList) -> Schema {
    let mut builder = SchemaBuilder::new();
    for column in columns {
        builder.push(field_with_type(&column.name, &column.column_type));
    }
    builder.finish()
}

/// Creates the Arrow schema of batches holding `columns`, wrapped in an Arc.
pub fn create_arrow_schema_arc(columns: &NamesAndTypesList) -> Arc<Schema> {
    Arc::new(create_arrow_schema(columns))
}

/// Derive the column list of an Arrow schema.
///
/// A `column_type` metadata annotation wins over the Arrow type, so schemas
/// built by [`create_arrow_schema`] round-trip exactly.
pub fn names_and_types_from_schema(schema: &Schema) -> Result<NamesAndTypesList, SchemaError> {
    schema
        .fields()
        .iter()
        .map(|field| -> Result<NameAndType, SchemaError> {
            let column_type = match field.metadata().get(COLUMN_TYPE_METADATA_KEY) {
                Some(text) => text.parse()?,
                None => ColumnType::from_arrow_field(field)?,
            };
            Ok(NameAndType::new(field.name().clone(), column_type))
        })
        .collect()
}
