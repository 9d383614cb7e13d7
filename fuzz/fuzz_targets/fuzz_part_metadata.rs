#![no_main]

use libfuzzer_sys::fuzz_target;
use mergepart::schema::{unescape_for_file_name, Checksums, ColumnType, NamesAndTypesList};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Type names print in canonical form, so parsing the printed form must
    // give the same type back
    if let Ok(column_type) = text.parse::<ColumnType>() {
        let printed = column_type.to_string();
        assert_eq!(printed.parse::<ColumnType>().ok(), Some(column_type));
    }

    // The metadata parsers must reject bad input with an error, never panic
    let _ = NamesAndTypesList::read_text(text);
    let _ = Checksums::read_text(text);
    let _ = unescape_for_file_name(text);
});
