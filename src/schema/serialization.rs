//! Binary serialization of column values.
//!
//! All fixed-width values are little-endian. Strings are a LEB128 length
//! followed by the UTF-8 bytes. Null rows serialize whatever the value buffer
//! holds at that slot, so the value stream of a nullable column always has
//! one entry per row.

use std::io::Write;
use std::ops::Range;

use arrow::array::{Array, AsArray, ListArray};
use arrow::datatypes::{
    ArrowPrimitiveType, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use byteorder::{LittleEndian, WriteBytesExt};

use super::column_type::ScalarType;
use super::error::SchemaError;

/// Write `value` as an unsigned LEB128 varint
pub fn write_var_uint<W: Write>(mut value: u64, out: &mut W) -> std::io::Result<()> {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            return out.write_u8(byte);
        }
        out.write_u8(byte | 0x80)?;
    }
}

fn mismatch(expected: impl ToString, array: &dyn Array) -> SchemaError {
    SchemaError::ArrayTypeMismatch {
        expected: expected.to_string(),
        actual: format!("{:?}", array.data_type()),
    }
}

fn write_primitive<T, W, F>(
    array: &dyn Array,
    scalar: ScalarType,
    range: Range<usize>,
    out: &mut W,
    mut put: F,
) -> Result<(), SchemaError>
where
    T: ArrowPrimitiveType,
    W: Write,
    F: FnMut(&mut W, T::Native) -> std::io::Result<()>,
{
    let values = array
        .as_primitive_opt::<T>()
        .ok_or_else(|| mismatch(scalar, array))?
        .values();
    for &value in &values[range] {
        put(out, value)?;
    }
    Ok(())
}

/// Serialize rows `range` of a scalar `array` of type `scalar`
pub fn serialize_range<W: Write>(
    array: &dyn Array,
    scalar: ScalarType,
    range: Range<usize>,
    out: &mut W,
) -> Result<(), SchemaError> {
    if range.end > array.len() {
        return Err(SchemaError::InvalidType(format!(
            "row range {:?} out of bounds for array of length {}",
            range,
            array.len()
        )));
    }

    match scalar {
        ScalarType::UInt8 => write_primitive::<UInt8Type, _, _>(array, scalar, range, out, |w, v| {
            w.write_u8(v)
        }),
        ScalarType::UInt16 => {
            write_primitive::<UInt16Type, _, _>(array, scalar, range, out, |w, v| {
                w.write_u16::<LittleEndian>(v)
            })
        }
        ScalarType::UInt32 => {
            write_primitive::<UInt32Type, _, _>(array, scalar, range, out, |w, v| {
                w.write_u32::<LittleEndian>(v)
            })
        }
        ScalarType::UInt64 => {
            write_primitive::<UInt64Type, _, _>(array, scalar, range, out, |w, v| {
                w.write_u64::<LittleEndian>(v)
            })
        }
        ScalarType::Int8 => write_primitive::<Int8Type, _, _>(array, scalar, range, out, |w, v| {
            w.write_i8(v)
        }),
        ScalarType::Int16 => write_primitive::<Int16Type, _, _>(array, scalar, range, out, |w, v| {
            w.write_i16::<LittleEndian>(v)
        }),
        ScalarType::Int32 => write_primitive::<Int32Type, _, _>(array, scalar, range, out, |w, v| {
            w.write_i32::<LittleEndian>(v)
        }),
        ScalarType::Int64 => write_primitive::<Int64Type, _, _>(array, scalar, range, out, |w, v| {
            w.write_i64::<LittleEndian>(v)
        }),
        ScalarType::Float32 => {
            write_primitive::<Float32Type, _, _>(array, scalar, range, out, |w, v| {
                w.write_f32::<LittleEndian>(v)
            })
        }
        ScalarType::Float64 => {
            write_primitive::<Float64Type, _, _>(array, scalar, range, out, |w, v| {
                w.write_f64::<LittleEndian>(v)
            })
        }
        ScalarType::String => {
            let strings = array
                .as_string_opt::<i32>()
                .ok_or_else(|| mismatch(scalar, array))?;
            let offsets = strings.value_offsets();
            let data = strings.value_data();
            for row in range {
                let start = offsets[row] as usize;
                let end = offsets[row + 1] as usize;
                write_var_uint((end - start) as u64, out)?;
                out.write_all(&data[start..end])?;
            }
            Ok(())
        }
    }
}

/// Serialize the null map of rows `range`: one byte per row, `1` for null
pub fn serialize_null_map<W: Write>(
    array: &dyn Array,
    range: Range<usize>,
    out: &mut W,
) -> Result<(), SchemaError> {
    let flags: Vec<u8> = range.map(|row| u8::from(array.is_null(row))).collect();
    out.write_all(&flags)?;
    Ok(())
}

/// Serialize the element count of every row in `range` as a u64
pub fn serialize_array_sizes<W: Write>(
    list: &ListArray,
    range: Range<usize>,
    out: &mut W,
) -> Result<(), SchemaError> {
    let offsets = list.value_offsets();
    for row in range {
        let size = (offsets[row + 1] - offsets[row]) as u64;
        out.write_u64::<LittleEndian>(size)?;
    }
    Ok(())
}

/// Element range covered by rows `range` of a list array
pub fn element_range(list: &ListArray, range: Range<usize>) -> Range<usize> {
    let offsets = list.value_offsets();
    offsets[range.start] as usize..offsets[range.end] as usize
}

/// Downcast to the list layout used for `Array(..)` columns
pub fn as_list(array: &dyn Array) -> Result<&ListArray, SchemaError> {
    array
        .as_list_opt::<i32>()
        .ok_or_else(|| mismatch("Array", array))
}

/// Serialize a single value, as written to the primary index
pub fn serialize_value<W: Write>(
    array: &dyn Array,
    scalar: ScalarType,
    row: usize,
    out: &mut W,
) -> Result<(), SchemaError> {
    serialize_range(array, scalar, row..row + 1, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        Float64Array, Int32Array, Int32Builder, ListBuilder, StringArray, UInt64Array,
    };

    #[test]
    fn test_var_uint() {
        let mut out = Vec::new();
        write_var_uint(0, &mut out).unwrap();
        write_var_uint(127, &mut out).unwrap();
        write_var_uint(300, &mut out).unwrap();
        assert_eq!(out, vec![0x00, 0x7f, 0xac, 0x02]);
    }

    #[test]
    fn test_fixed_width_little_endian() {
        let array = UInt64Array::from(vec![1u64, 2, 0x0102030405060708]);
        let mut out = Vec::new();
        serialize_range(&array, ScalarType::UInt64, 1..3, &mut out).unwrap();
        assert_eq!(out.len(), 16);
        assert_eq!(&out[..8], &2u64.to_le_bytes());
        assert_eq!(&out[8..], &0x0102030405060708u64.to_le_bytes());
    }

    #[test]
    fn test_strings_are_length_prefixed() {
        let array = StringArray::from(vec!["a", "", "xyz"]);
        let mut out = Vec::new();
        serialize_range(&array, ScalarType::String, 0..3, &mut out).unwrap();
        assert_eq!(out, vec![1, b'a', 0, 3, b'x', b'y', b'z']);
    }

    #[test]
    fn test_nulls_still_serialize_values() {
        let array = Float64Array::from(vec![Some(1.5), None, Some(2.0)]);
        let mut values = Vec::new();
        serialize_range(&array, ScalarType::Float64, 0..3, &mut values).unwrap();
        assert_eq!(values.len(), 24);

        let mut nulls = Vec::new();
        serialize_null_map(&array, 0..3, &mut nulls).unwrap();
        assert_eq!(nulls, vec![0, 1, 0]);
    }

    #[test]
    fn test_array_sizes_and_element_range() {
        let mut builder = ListBuilder::new(Int32Builder::new());
        builder.append_value([Some(1), Some(2)]);
        builder.append(true);
        builder.append_value([Some(3), Some(4), Some(5)]);
        let list = builder.finish();

        let mut out = Vec::new();
        serialize_array_sizes(&list, 0..3, &mut out).unwrap();
        let sizes: Vec<u64> = out
            .chunks(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(sizes, vec![2, 0, 3]);
        assert_eq!(element_range(&list, 1..3), 2..5);
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let array = Int32Array::from(vec![1, 2]);
        let mut out = Vec::new();
        let err = serialize_range(&array, ScalarType::UInt64, 0..2, &mut out).unwrap_err();
        assert!(matches!(err, SchemaError::ArrayTypeMismatch { .. }));
        assert!(as_list(&array).is_err());
        assert!(serialize_range(&array, ScalarType::Int32, 0..3, &mut out).is_err());
    }
}
