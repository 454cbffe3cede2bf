//! P-256 point codec and key management.
//!
//! This module provides:
//! - SEC1 compression and decompression (`0x02`/`0x03` ⇄ `0x04`)
//! - Public key parsing from either form with on-curve validation
//! - Key pair generation and public key derivation from a private scalar
//!
//! Decompression solves `y² = x³ − 3x + b (mod p)`. Because
//! `p ≡ 3 (mod 4)` the root is `rhs^((p+1)/4)`; the curve arithmetic in
//! `p256` performs that exponentiation, checks `y² == rhs`, rejects
//! `x ≥ p` and selects the root whose parity matches the prefix.

use crate::encoding::hex_encode;
use crate::error::CryptoError;
use crate::memory::SecretBuffer;
use p256::elliptic_curve::point::DecompressPoint;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::elliptic_curve::subtle::Choice;
use p256::{AffinePoint, FieldBytes, PublicKey, SecretKey};
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of a P-256 private scalar.
pub const PRIVATE_KEY_LEN: usize = 32;

/// Length of a SEC1 compressed point.
pub const COMPRESSED_POINT_LEN: usize = 33;

/// Length of a SEC1 uncompressed point.
pub const UNCOMPRESSED_POINT_LEN: usize = 65;

const TAG_UNCOMPRESSED: u8 = 0x04;
const TAG_EVEN: u8 = 0x02;
const TAG_ODD: u8 = 0x03;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A freshly generated P-256 key pair.
///
/// The private scalar lives in a [`SecretBuffer`]; `Debug` never prints it.
pub struct P256KeyPair {
    /// 32-byte private scalar.
    pub private_key: SecretBuffer,
    /// SEC1 compressed public key.
    pub public_key: [u8; COMPRESSED_POINT_LEN],
    /// SEC1 uncompressed public key.
    pub public_key_uncompressed: [u8; UNCOMPRESSED_POINT_LEN],
}

impl P256KeyPair {
    /// Compressed public key as lowercase hex.
    #[must_use]
    pub fn public_key_hex(&self) -> String {
        hex_encode(&self.public_key)
    }

    /// Uncompressed public key as lowercase hex.
    #[must_use]
    pub fn public_key_uncompressed_hex(&self) -> String {
        hex_encode(&self.public_key_uncompressed)
    }

    /// Private scalar as lowercase hex. The returned string is not zeroized;
    /// only call this when the key must be handed to an operator.
    #[must_use]
    pub fn expose_private_key_hex(&self) -> String {
        hex_encode(self.private_key.expose())
    }
}

impl fmt::Debug for P256KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("P256KeyPair")
            .field("private_key", &self.private_key)
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Point codec
// ---------------------------------------------------------------------------

/// Decompress a 33-byte SEC1 point into its 65-byte `0x04 ‖ x ‖ y` form.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPublicKey` if the input is not 33 bytes,
/// the prefix is not `0x02`/`0x03`, `x ≥ p`, or `x³ − 3x + b` has no square
/// root modulo `p`.
pub fn uncompress_public_key(
    compressed: &[u8],
) -> Result<[u8; UNCOMPRESSED_POINT_LEN], CryptoError> {
    if compressed.len() != COMPRESSED_POINT_LEN {
        return Err(CryptoError::InvalidPublicKey(format!(
            "compressed point must be {COMPRESSED_POINT_LEN} bytes, got {}",
            compressed.len()
        )));
    }
    let prefix = compressed[0];
    if prefix != TAG_EVEN && prefix != TAG_ODD {
        return Err(CryptoError::InvalidPublicKey(format!(
            "invalid compressed point prefix 0x{prefix:02x}"
        )));
    }

    let mut x = FieldBytes::default();
    x.copy_from_slice(&compressed[1..]);
    let y_is_odd = Choice::from(prefix & 1);
    let point: Option<AffinePoint> = AffinePoint::decompress(&x, y_is_odd).into();
    let point = point.ok_or_else(|| {
        CryptoError::InvalidPublicKey("x-coordinate is not on the P-256 curve".into())
    })?;

    let encoded = point.to_encoded_point(false);
    <[u8; UNCOMPRESSED_POINT_LEN]>::try_from(encoded.as_bytes())
        .map_err(|_| CryptoError::InvalidPublicKey("point at infinity".into()))
}

/// Compress a 65-byte `0x04 ‖ x ‖ y` point to `prefix ‖ x`, taking the
/// prefix from the parity of `y`.
///
/// This is a pure byte transform; on-curve validation is left to the
/// consumer of the point.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPublicKey` if the input is not 65 bytes
/// starting with `0x04`.
pub fn compress_public_key(
    uncompressed: &[u8],
) -> Result<[u8; COMPRESSED_POINT_LEN], CryptoError> {
    if uncompressed.len() != UNCOMPRESSED_POINT_LEN || uncompressed[0] != TAG_UNCOMPRESSED {
        return Err(CryptoError::InvalidPublicKey(format!(
            "uncompressed point must be {UNCOMPRESSED_POINT_LEN} bytes starting with 0x04, got {} bytes",
            uncompressed.len()
        )));
    }
    let mut out = [0u8; COMPRESSED_POINT_LEN];
    out[0] = match uncompressed.last() {
        Some(y_low) if y_low & 1 == 1 => TAG_ODD,
        _ => TAG_EVEN,
    };
    out[1..].copy_from_slice(&uncompressed[1..COMPRESSED_POINT_LEN]);
    Ok(out)
}

/// Parse a SEC1 public key (33 or 65 bytes) and check it lies on P-256.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPublicKey` for any other length or an
/// off-curve point.
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    match bytes.len() {
        COMPRESSED_POINT_LEN | UNCOMPRESSED_POINT_LEN => PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| CryptoError::InvalidPublicKey("point is not on the P-256 curve".into())),
        other => Err(CryptoError::InvalidPublicKey(format!(
            "public key must be {COMPRESSED_POINT_LEN} or {UNCOMPRESSED_POINT_LEN} bytes, got {other}"
        ))),
    }
}

/// Normalize a 33- or 65-byte public key to its validated uncompressed form.
///
/// # Errors
///
/// Same as [`parse_public_key`].
pub fn to_uncompressed(bytes: &[u8]) -> Result<[u8; UNCOMPRESSED_POINT_LEN], CryptoError> {
    if bytes.len() == COMPRESSED_POINT_LEN {
        return uncompress_public_key(bytes);
    }
    let key = parse_public_key(bytes)?;
    encode_point(&key, false).and_then(|v| {
        <[u8; UNCOMPRESSED_POINT_LEN]>::try_from(v.as_slice())
            .map_err(|_| CryptoError::InvalidPublicKey("unexpected encoded length".into()))
    })
}

// ---------------------------------------------------------------------------
// Key management
// ---------------------------------------------------------------------------

/// Parse a 32-byte private scalar.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPrivateKey` if the input is not 32 bytes or
/// the scalar is zero or not below the group order.
pub fn secret_key_from_bytes(private_key: &[u8]) -> Result<SecretKey, CryptoError> {
    if private_key.len() != PRIVATE_KEY_LEN {
        return Err(CryptoError::InvalidPrivateKey);
    }
    SecretKey::from_slice(private_key).map_err(|_| CryptoError::InvalidPrivateKey)
}

/// Generate a P-256 key pair from the OS CSPRNG.
///
/// # Errors
///
/// Returns `CryptoError::KeyFormat` if the generated key cannot be encoded
/// (never expected in practice).
pub fn generate_p256_key_pair() -> Result<P256KeyPair, CryptoError> {
    let secret = SecretKey::random(&mut OsRng);
    let mut scalar = secret.to_bytes();
    let private_key = SecretBuffer::new(&scalar);
    scalar[..].zeroize();

    let public = secret.public_key();
    let compressed = encode_point(&public, true)?;
    let uncompressed = encode_point(&public, false)?;

    Ok(P256KeyPair {
        private_key,
        public_key: <[u8; COMPRESSED_POINT_LEN]>::try_from(compressed.as_slice())
            .map_err(|_| CryptoError::KeyFormat("compressed point length".into()))?,
        public_key_uncompressed: <[u8; UNCOMPRESSED_POINT_LEN]>::try_from(uncompressed.as_slice())
            .map_err(|_| CryptoError::KeyFormat("uncompressed point length".into()))?,
    })
}

/// Derive the public key for a 32-byte private scalar.
///
/// # Errors
///
/// Returns `CryptoError::InvalidPrivateKey` if the scalar is invalid.
pub fn public_key_from_private(private_key: &[u8], compressed: bool) -> Result<Vec<u8>, CryptoError> {
    let secret = secret_key_from_bytes(private_key)?;
    encode_point(&secret.public_key(), compressed)
}

fn encode_point(key: &PublicKey, compressed: bool) -> Result<Vec<u8>, CryptoError> {
    let encoded = key.to_encoded_point(compressed);
    if encoded.is_identity() {
        return Err(CryptoError::InvalidPublicKey("point at infinity".into()));
    }
    Ok(encoded.as_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
