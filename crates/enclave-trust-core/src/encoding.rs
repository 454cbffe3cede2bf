//! Codec utilities: hex, base64, base64url, base58 and base58check.
//!
//! Every decoder maps failures to [`CryptoError::Encoding`] naming the
//! dialect, so callers can tell a bad hex field from a bad bundle string.

use crate::error::CryptoError;
use data_encoding::{BASE64, BASE64URL_NOPAD, HEXLOWER, HEXLOWER_PERMISSIVE};

/// Lowercase hex encoding.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    HEXLOWER.encode(bytes)
}

/// Hex decoding, case-insensitive. An optional `0x` prefix is accepted.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` on odd length or non-hex characters.
pub fn hex_decode(input: &str) -> Result<Vec<u8>, CryptoError> {
    let trimmed = input.strip_prefix("0x").unwrap_or(input);
    HEXLOWER_PERMISSIVE
        .decode(trimmed.as_bytes())
        .map_err(|e| CryptoError::Encoding(format!("invalid hex: {e}")))
}

/// Hex decoding into a fixed-size array.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` if the input is not hex or does not
/// decode to exactly `N` bytes.
pub fn hex_decode_array<const N: usize>(input: &str) -> Result<[u8; N], CryptoError> {
    let bytes = hex_decode(input)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        CryptoError::Encoding(format!("expected {N} bytes of hex, got {}", bytes.len()))
    })
}

/// Standard (padded) base64 decoding, as used by attestation documents and
/// manifests.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` if the input is not valid base64.
pub fn base64_decode(input: &str) -> Result<Vec<u8>, CryptoError> {
    BASE64
        .decode(input.trim().as_bytes())
        .map_err(|e| CryptoError::Encoding(format!("invalid base64: {e}")))
}

/// Standard (padded) base64 encoding.
#[must_use]
pub fn base64_encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Base64url encoding without padding.
#[must_use]
pub fn base64url_encode(bytes: &[u8]) -> String {
    BASE64URL_NOPAD.encode(bytes)
}

/// Base64url decoding. Trailing `=` padding is tolerated.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` if the input is not valid base64url.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>, CryptoError> {
    let unpadded = input.trim_end_matches('=');
    BASE64URL_NOPAD
        .decode(unpadded.as_bytes())
        .map_err(|e| CryptoError::Encoding(format!("invalid base64url: {e}")))
}

/// Plain base58 (Bitcoin alphabet) encoding.
#[must_use]
pub fn base58_encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Plain base58 decoding.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` if the input contains characters outside
/// the Bitcoin alphabet.
pub fn base58_decode(input: &str) -> Result<Vec<u8>, CryptoError> {
    bs58::decode(input)
        .into_vec()
        .map_err(|e| CryptoError::Encoding(format!("invalid base58: {e}")))
}

/// Base58Check encoding: payload followed by the first four bytes of
/// `sha256(sha256(payload))`.
#[must_use]
pub fn base58check_encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).with_check().into_string()
}

/// Base58Check decoding. The returned payload excludes the checksum.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` on bad characters, short input or a
/// checksum mismatch.
pub fn base58check_decode(input: &str) -> Result<Vec<u8>, CryptoError> {
    bs58::decode(input)
        .with_check(None)
        .into_vec()
        .map_err(|e| CryptoError::Encoding(format!("invalid base58check: {e}")))
}
