//! Helpers for captured process output.

/// Bytes of captured output kept in error details.
pub const TAIL_LIMIT: usize = 2048;

/// Returns at most `limit` bytes from the end of `text`, cut on a char
/// boundary and prefixed with `...` when truncated.
pub fn tail(text: &str, limit: usize) -> String {
    let text = text.trim_end();
    if text.len() <= limit {
        return text.to_string();
    }
    let mut start = text.len() - limit;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

/// Lossy UTF-8 decoding of a captured pipe.
pub fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
