/// Decode bytes as UTF-8, replacing invalid sequences with U+FFFD.
///
/// Never fails: a stray Latin-1 byte in a log should not cost the whole file.
/// A leading byte-order mark is dropped.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
