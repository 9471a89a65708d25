//! Hex string literals for text that cannot be bound as a parameter
//!
//! Some driver and engine pairings mangle multi-byte text parameters. For
//! those columns the pattern is encoded into the column's storage encoding
//! and embedded as `X'...'`. The literal body is produced by hex-encoding
//! bytes, so nothing but `[0-9A-F]` from the caller's value reaches the
//! statement text.

use encoding_rs::Encoding;

use crate::error::{FbscopeError, Result};

/// Encode `text` as a Firebird hex string literal in `encoding`.
///
/// Fails with an invalid-request error when a character has no
/// representation in `encoding`; no substitute bytes are ever embedded.
pub fn encode_hex_literal(text: &str, encoding: &'static Encoding) -> Result<String> {
    let (bytes, _, unmappable) = encoding.encode(text);
    if unmappable {
        return Err(FbscopeError::invalid_request(format!(
            "search value cannot be represented in {}",
            encoding.name()
        )));
    }
    Ok(format!("X'{}'", hex::encode_upper(&*bytes)))
}

/// Whether `text` needs more than ASCII to be represented.
pub fn needs_literal(text: &str) -> bool {
    !text.is_ascii()
}
