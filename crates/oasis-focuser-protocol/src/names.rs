//! Fixed-width, NUL-padded name fields.

#![deny(static_mut_refs)]

use crate::codes::NAME_LEN;

/// Trim surrounding whitespace and newlines, then cut to at most `NAME_LEN` bytes.
///
/// Truncation works on bytes: a multi-byte UTF-8 character straddling the
/// limit is cut, as the device stores raw bytes.
pub fn name_field(name: &str) -> [u8; NAME_LEN] {
    let trimmed = name.trim().as_bytes();
    let len = trimmed.len().min(NAME_LEN);
    let mut out = [0u8; NAME_LEN];
    if let (Some(dst), Some(src)) = (out.get_mut(..len), trimmed.get(..len)) {
        dst.copy_from_slice(src);
    }
    out
}

/// Decode a NUL-padded field as a C string, never reading past its width.
pub fn decode_c_string(field: &[u8]) -> String {
    let end = field.iter().position(|b| *b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(field.get(..end).unwrap_or_default()).into_owned()
}

/// The string a device will hold after `name_field`, for callers that want to
/// show the effective value.
pub fn effective_name(name: &str) -> String {
    decode_c_string(&name_field(name))
}
