use super::constants::ARRAY_SIZES_COLUMN_NAME_SUFFIX;

/// Escape a column name for use as a file name.
///
/// ASCII letters, digits and `_` are kept; every other byte becomes `%XX`.
pub fn escape_for_file_name(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' {
            escaped.push(byte as char);
        } else {
            escaped.push('%');
            escaped.push_str(&format!("{:02X}", byte));
        }
    }
    escaped
}

/// Inverse of [`escape_for_file_name`]. Malformed escapes are kept verbatim.
pub fn unescape_for_file_name(escaped: &str) -> String {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = [bytes[i + 1], bytes[i + 2]];
            if let Some(value) = std::str::from_utf8(&hex)
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok())
            {
                out.push(value);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Name of the nested structure a column belongs to.
///
/// `n.a` belongs to `n`; names without a dot, or with an empty part on either
/// side of the first dot, are their own root.
pub fn extract_nested_table_name(name: &str) -> &str {
    match name.find('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => &name[..idx],
        _ => name,
    }
}

/// Logical name of the sizes stream for `column` at array nesting `level`
pub fn array_sizes_stream_name(column: &str, level: usize) -> String {
    format!(
        "{}{}{}",
        extract_nested_table_name(column),
        ARRAY_SIZES_COLUMN_NAME_SUFFIX,
        level
    )
}

/// File base name of the sizes stream for `column` at array nesting `level`
pub fn array_sizes_file_name(column: &str, level: usize) -> String {
    format!(
        "{}{}{}",
        escape_for_file_name(extract_nested_table_name(column)),
        ARRAY_SIZES_COLUMN_NAME_SUFFIX,
        level
    )
}
