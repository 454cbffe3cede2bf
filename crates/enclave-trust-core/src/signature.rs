//! ECDSA-P256-SHA256 verification of enclave-signed artifacts.
//!
//! This module provides:
//! - [`verify_enclave_signature`]: pinned-signer check, then signature check
//! - [`verify_stamp_signature`]: the same primitive for request stamps, no pinning
//! - [`der_to_raw_signature`] / [`raw_to_der_signature`]: ASN.1 DER ⇄ `r ‖ s`
//!
//! # Signer pinning
//!
//! Enclave envelopes name their signer in `enclaveQuorumPublic`. That key must
//! equal [`PRODUCTION_SIGNER_PUBLIC_KEY`] unless the caller passes an explicit
//! override, and the comparison happens before any signature math. A valid
//! signature from an unpinned key is still a failure.

use crate::ec;
use crate::encoding::hex_decode;
use crate::error::CryptoError;
use p256::ecdsa::Signature;
use ring::signature::{UnparsedPublicKey, ECDSA_P256_SHA256_FIXED};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Uncompressed P-256 key of the production enclave quorum that signs
/// export and import envelopes.
pub const PRODUCTION_SIGNER_PUBLIC_KEY: &str = "04cf288fe433cc4e1aa0ce1632feac4ea26bf2f5a09dcfe5a42c398e06898710330f0572882f4dbdf0f5304b8fc8703acd69adca9a4bbf7f5d00d20a5e364b2569";

/// Raw `r ‖ s` signature length for P-256.
pub const RAW_SIGNATURE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Signature format conversion
// ---------------------------------------------------------------------------

/// Convert an ASN.1 DER ECDSA signature to raw `r ‖ s` (IEEE P1363).
///
/// # Errors
///
/// Returns `CryptoError::MalformedSignature` if the input is not a DER
/// `SEQUENCE { r INTEGER, s INTEGER }` with scalars in range.
pub fn der_to_raw_signature(der: &[u8]) -> Result<[u8; RAW_SIGNATURE_LEN], CryptoError> {
    let sig = Signature::from_der(der)
        .map_err(|e| CryptoError::MalformedSignature(format!("invalid DER signature: {e}")))?;
    let mut out = [0u8; RAW_SIGNATURE_LEN];
    out.copy_from_slice(&sig.to_bytes());
    Ok(out)
}

/// Convert a raw `r ‖ s` signature to ASN.1 DER.
///
/// # Errors
///
/// Returns `CryptoError::MalformedSignature` if the input is not 64 bytes
/// or either scalar is zero or out of range.
pub fn raw_to_der_signature(raw: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if raw.len() != RAW_SIGNATURE_LEN {
        return Err(CryptoError::MalformedSignature(format!(
            "raw signature must be {RAW_SIGNATURE_LEN} bytes, got {}",
            raw.len()
        )));
    }
    let sig = Signature::from_slice(raw)
        .map_err(|e| CryptoError::MalformedSignature(format!("invalid raw signature: {e}")))?;
    Ok(sig.to_der().as_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify a raw `r ‖ s` ECDSA-P256-SHA256 signature over `message`.
///
/// `public_key` may be compressed or uncompressed.
///
/// # Errors
///
/// - `CryptoError::InvalidPublicKey` if the key does not parse
/// - `CryptoError::SignatureInvalid` if verification fails
pub fn verify_p256_sha256(
    public_key: &[u8],
    raw_signature: &[u8; RAW_SIGNATURE_LEN],
    message: &[u8],
) -> Result<(), CryptoError> {
    let uncompressed = ec::to_uncompressed(public_key)?;
    UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, &uncompressed)
        .verify(message, raw_signature)
        .map_err(|_| CryptoError::SignatureInvalid)
}

/// Verify an enclave signature against the pinned signer.
///
/// `signer_override` replaces [`PRODUCTION_SIGNER_PUBLIC_KEY`] for this call
/// only. It exists for staging and test enclaves; every use is logged.
///
/// # Errors
///
/// - `CryptoError::SignerPinningFailed` if `enclave_quorum_public_hex` is not
///   the expected signer (checked first)
/// - `CryptoError::Encoding` / `InvalidPublicKey` / `MalformedSignature` for
///   undecodable inputs
/// - `CryptoError::SignatureInvalid` if the signature does not verify
pub fn verify_enclave_signature(
    enclave_quorum_public_hex: &str,
    der_signature_hex: &str,
    signed_data: &[u8],
    signer_override: Option<&str>,
) -> Result<(), CryptoError> {
    let expected = match signer_override {
        Some(key) => {
            warn!(signer = key, "using caller-supplied enclave signer instead of production key");
            key
        }
        None => PRODUCTION_SIGNER_PUBLIC_KEY,
    };
    if !enclave_quorum_public_hex.eq_ignore_ascii_case(expected) {
        return Err(CryptoError::SignerPinningFailed {
            expected: expected.to_owned(),
            actual: enclave_quorum_public_hex.to_owned(),
        });
    }

    let public_key = hex_decode(enclave_quorum_public_hex)?;
    let raw = der_to_raw_signature(&hex_decode(der_signature_hex)?)?;
    verify_p256_sha256(&public_key, &raw, signed_data)?;
    debug!("enclave signature verified");
    Ok(())
}

/// Verify a request stamp: DER-hex ECDSA-P256-SHA256 signature over
/// `signed_data` under `public_key_hex` (compressed or uncompressed).
///
/// No pinning is applied.
///
/// # Errors
///
/// Same decoding errors as [`verify_enclave_signature`], and
/// `CryptoError::SignatureInvalid` on a bad signature.
pub fn verify_stamp_signature(
    public_key_hex: &str,
    der_signature_hex: &str,
    signed_data: &[u8],
) -> Result<(), CryptoError> {
    let public_key = hex_decode(public_key_hex)?;
    let raw = der_to_raw_signature(&hex_decode(der_signature_hex)?)?;
    verify_p256_sha256(&public_key, &raw, signed_data)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
