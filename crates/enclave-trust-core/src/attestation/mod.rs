//! Enclave proof verification.
//!
//! A proof pair is accepted only if, in this order:
//! 1. the app proof is signed by the signing half of its own key
//!    ([`verify_app_proof`])
//! 2. the boot proof's attestation document carries a valid COSE_Sign1
//!    signature ([`verify_cose_sign1`]), chains to the pinned root
//!    ([`verify_certificate_chain`]) and commits to the supplied manifest
//!    ([`verify_manifest_digest`])
//! 3. the same ephemeral key appears in the app proof, the boot proof and
//!    the attestation document ([`verify_ephemeral_key_consistency`])
//!
//! The first failing check aborts with a [`VerificationError`] naming it.

pub mod app_proof;
pub mod chain;
pub mod document;

pub use app_proof::{verify_app_proof, AppProof, APP_PROOF_SCHEME};
pub use chain::{verify_certificate_chain, TrustRoot, AWS_ROOT_CERT_PEM, AWS_ROOT_CERT_SHA256};
pub use document::{
    decode_attestation_document, parse_cose_sign1, verify_cose_sign1, AttestationDocument,
    CoseSign1,
};

use crate::encoding::{base64_decode, hex_encode};
use crate::error::VerificationError;
use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Nitro boot proof as returned alongside an app proof.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BootProof {
    /// Base64 COSE_Sign1 attestation document.
    pub aws_attestation_doc_b64: String,
    /// Base64 boot manifest whose SHA-256 is the document's `user_data`.
    pub qos_manifest_b64: String,
    /// Hex ephemeral key the enclave booted with.
    pub ephemeral_public_key_hex: String,
}

/// Verify a proof pair against the production AWS Nitro root.
///
/// # Errors
///
/// See [`verify_with_trust_root`].
pub fn verify(app_proof: &AppProof, boot_proof: &BootProof) -> Result<(), VerificationError> {
    verify_with_trust_root(app_proof, boot_proof, &TrustRoot::aws_nitro())
}

/// Verify a proof pair against `root`.
///
/// The root's validity window is checked at the app proof's `timestampMs`.
///
/// # Errors
///
/// The error of the first failing phase.
pub fn verify_with_trust_root(
    app_proof: &AppProof,
    boot_proof: &BootProof,
    root: &TrustRoot,
) -> Result<(), VerificationError> {
    verify_app_proof(app_proof)?;
    let timestamp_ms = app_proof.timestamp_ms()?;
    let document = verify_boot_proof(boot_proof, timestamp_ms, root)?;
    verify_ephemeral_key_consistency(app_proof, boot_proof, &document)?;
    debug!("proof pair verified");
    Ok(())
}

/// Phases B.1 to B.4 on their own, for callers holding only a boot proof.
/// Returns the decoded attestation document.
///
/// # Errors
///
/// The error of the first failing check.
pub fn verify_boot_proof(
    boot_proof: &BootProof,
    timestamp_ms: u64,
    root: &TrustRoot,
) -> Result<AttestationDocument, VerificationError> {
    let (cose, document) = decode_attestation_document(&boot_proof.aws_attestation_doc_b64)?;
    verify_cose_sign1(&cose, &document.certificate)?;
    verify_certificate_chain(&document.certificate, &document.cabundle, root, timestamp_ms)?;
    verify_manifest_digest(&boot_proof.qos_manifest_b64, &document.user_data)?;
    debug!("boot proof verified");
    Ok(document)
}

/// Check `sha256(base64decode(manifest_b64)) == user_data`.
///
/// # Errors
///
/// `Crypto(Encoding)` for bad base64, `ManifestDigestMismatch` otherwise.
pub fn verify_manifest_digest(manifest_b64: &str, user_data: &[u8]) -> Result<(), VerificationError> {
    let manifest = base64_decode(manifest_b64)?;
    let actual = digest(&SHA256, &manifest);
    if actual.as_ref() != user_data {
        return Err(VerificationError::ManifestDigestMismatch {
            expected: hex_encode(user_data),
            actual: hex_encode(actual.as_ref()),
        });
    }
    debug!("manifest digest matches user_data");
    Ok(())
}

/// Check that one ephemeral key appears in all three places.
///
/// Hex is compared case-insensitively; every other difference, down to a
/// single character, is a mismatch.
///
/// # Errors
///
/// `EphemeralKeyMismatch` carrying all three values.
pub fn verify_ephemeral_key_consistency(
    app_proof: &AppProof,
    boot_proof: &BootProof,
    document: &AttestationDocument,
) -> Result<(), VerificationError> {
    let from_app = app_proof.public_key.to_ascii_lowercase();
    let from_boot = boot_proof.ephemeral_public_key_hex.to_ascii_lowercase();
    let from_doc = hex_encode(&document.public_key);
    if from_app != from_boot || from_boot != from_doc {
        return Err(VerificationError::EphemeralKeyMismatch {
            app_proof: from_app,
            boot_proof: from_boot,
            attestation_doc: from_doc,
        });
    }
    debug!("ephemeral key consistent across proofs");
    Ok(())
}
