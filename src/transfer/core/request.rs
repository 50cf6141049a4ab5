//! Filename request shared by both transports
//!
//! The request is the bare filename text: no length prefix, no terminator.

/// Encode a filename request
pub fn encode_request(filename: &str) -> Vec<u8> {
    filename.as_bytes().to_vec()
}

/// Decode a filename request, trimming surrounding whitespace
///
/// Nothing is validated. An empty or odd name passes through and fails the
/// later existence check.
pub fn decode_request(data: &[u8]) -> String {
    String::from_utf8_lossy(data).trim().to_string()
}
