//! Pairtree mapping from identifiers to sharded relative paths.

use std::path::PathBuf;

const SEGMENT_WIDTH: usize = 2;

/// Character-clean an identifier per the pairtree conventions.
pub fn clean(id: &str) -> String {
    let mut escaped = String::with_capacity(id.len());
    for byte in id.bytes() {
        let needs_hex = !(0x21..=0x7e).contains(&byte)
            || matches!(
                byte,
                b'"' | b'*' | b'+' | b',' | b'<' | b'=' | b'>' | b'?' | b'\\' | b'^' | b'|'
            );
        if needs_hex {
            escaped.push_str(&format!("^{byte:02x}"));
        } else {
            escaped.push(byte as char);
        }
    }
    escaped
        .chars()
        .map(|c| match c {
            '/' => '=',
            ':' => '+',
            '.' => ',',
            other => other,
        })
        .collect()
}

/// Split the cleaned identifier into fixed-width directory segments.
pub fn identifier_to_path(id: &str) -> PathBuf {
    let cleaned = clean(id);
    let chars: Vec<char> = cleaned.chars().collect();
    chars
        .chunks(SEGMENT_WIDTH)
        .map(|segment| segment.iter().collect::<String>())
        .collect()
}
