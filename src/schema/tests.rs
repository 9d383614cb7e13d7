use super::*;
use arrow::datatypes::{DataType, Field, Schema};
use std::sync::Arc;

fn nested_columns() -> NamesAndTypesList {
    NamesAndTypesList::new()
        .with("id", ScalarType::UInt64.into())
        .with("score", "Nullable(Float64)".parse().unwrap())
        .with("tags.key", "Array(String)".parse().unwrap())
        .with("matrix", "Array(Array(Int32))".parse().unwrap())
}

#[test]
fn test_schema_creation() {
    let schema = create_arrow_schema(&nested_columns());
    assert_eq!(schema.fields().len(), 4);

    let score = schema.field_with_name("score").unwrap();
    assert!(score.is_nullable());
    assert_eq!(score.data_type(), &DataType::Float64);

    let matrix = schema.field_with_name("matrix").unwrap();
    assert!(matches!(matrix.data_type(), DataType::List(_)));
}

#[test]
fn test_schema_validation() {
    let columns = nested_columns();
    let schema = create_arrow_schema(&columns);
    assert!(validate_schema(&schema, &columns).is_ok());

    let wrong = Schema::new(vec![Field::new("id", DataType::Int64, false)]);
    assert!(matches!(
        validate_schema(&wrong, &columns),
        Err(SchemaValidationError::TypeMismatch { .. })
    ));

    let missing = Schema::new(vec![Field::new("id", DataType::UInt64, false)]);
    assert!(matches!(
        validate_schema(&missing, &columns),
        Err(SchemaValidationError::MissingColumn(name)) if name == "score"
    ));
}

#[test]
fn test_column_type_metadata() {
    let columns = nested_columns();
    let schema = create_arrow_schema(&columns);
    let field = schema.field_with_name("tags.key").unwrap();
    assert_eq!(
        field.metadata().get(COLUMN_TYPE_METADATA_KEY).unwrap(),
        "Array(String)"
    );
    assert_eq!(names_and_types_from_schema(&schema).unwrap(), columns);
}

#[test]
fn test_names_from_plain_arrow_schema() {
    let schema = Schema::new(vec![
        Field::new("a", DataType::Int16, true),
        Field::new(
            "b",
            DataType::List(Arc::new(Field::new("item", DataType::Utf8, false))),
            false,
        ),
    ]);
    let columns = names_and_types_from_schema(&schema).unwrap();
    assert_eq!(columns.get("a").unwrap().column_type.to_string(), "Nullable(Int16)");
    assert_eq!(columns.get("b").unwrap().column_type.to_string(), "Array(String)");
}

#[test]
fn test_stream_file_names() {
    assert_eq!(array_sizes_file_name("tags.key", 0), "tags.size0");
    assert_eq!(
        format!("{}{}", escape_for_file_name("tags.key"), DATA_FILE_EXTENSION),
        "tags%2Ekey.bin"
    );
    assert_eq!(
        format!("{}{}", escape_for_file_name("score"), NULL_MAP_EXTENSION),
        "score.null.bin"
    );
}
