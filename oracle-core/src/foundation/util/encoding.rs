use crate::foundation::{OracleError, HASH_SIZE};

pub fn decode_hex(s: &str) -> Result<Vec<u8>, OracleError> {
    hex::decode(s).map_err(|e| e.into())
}

/// Parses a 32-byte hex value, with or without a `0x` prefix.
pub fn parse_hex_32bytes(s: &str) -> Result<[u8; HASH_SIZE], OracleError> {
    let trimmed = s.trim();
    let stripped = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    let bytes = decode_hex(stripped)?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| OracleError::EncodingError(format!("expected {} bytes, got {}", HASH_SIZE, bytes.len())))
}

/// Lowercase hex check used for password hashes (sha256, 64 chars).
pub fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}
