use arrow::datatypes::Schema;

use super::columns::NamesAndTypesList;

/// Validates that a batch schema can be written with the declared column list.
///
/// Every declared column must be present, and its Arrow type must have the
/// physical layout of the declared type. Extra batch columns are allowed.
pub fn validate_schema(
    schema: &Schema,
    columns: &NamesAndTypesList,
) -> Result<(), SchemaValidationError> {
    for column in columns {
        match schema.field_with_name(&column.name) {
            Ok(field) => {
                if !column.column_type.accepts(field.data_type()) {
                    return Err(SchemaValidationError::TypeMismatch {
                        column: column.name.clone(),
                        expected: column.column_type.to_string(),
                        found: format!("{:?}", field.data_type()),
                    });
                }
            }
            Err(_) => {
                return Err(SchemaValidationError::MissingColumn(column.name.clone()));
            }
        }
    }

    Ok(())
}

/// Errors that can occur during schema validation
#[derive(Debug, thiserror::Error)]
pub enum SchemaValidationError {
    /// A declared column is missing from the batch
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// A column has an incompatible data type
    #[error("Type mismatch for column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Name of the column with the type mismatch
        column: String,
        /// Declared column type
        expected: String,
        /// Arrow data type found
        found: String,
    },
}
