//! Phase A: the enclave application's own proof over its ephemeral key.

use crate::ec::{self, UNCOMPRESSED_POINT_LEN};
use crate::encoding::hex_decode;
use crate::error::VerificationError;
use crate::signature::{verify_p256_sha256, RAW_SIGNATURE_LEN};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The only app proof scheme this crate verifies.
pub const APP_PROOF_SCHEME: &str = "SIGNATURE_SCHEME_EPHEMERAL_KEY_P256";

/// Encryption key (65) ‖ signing key (65).
pub const APP_PROOF_PUBLIC_KEY_LEN: usize = 130;

/// Proof an enclave application produced over its ephemeral key pair.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppProof {
    /// Signature scheme, must be [`APP_PROOF_SCHEME`].
    pub scheme: String,
    /// Hex of the 130-byte `encryption_key ‖ signing_key`.
    pub public_key: String,
    /// Hex of the 64-byte raw `r ‖ s` signature.
    pub signature: String,
    /// Signed UTF-8 JSON; carries at least `timestampMs`.
    pub proof_payload: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofPayload {
    timestamp_ms: Timestamp,
}

/// `timestampMs` arrives as a decimal string from the enclave, but a bare
/// number is accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Text(String),
    Number(u64),
}

impl AppProof {
    /// The `timestampMs` carried in the signed payload.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::MalformedProof` if the payload is not JSON
    /// or lacks a numeric `timestampMs`.
    pub fn timestamp_ms(&self) -> Result<u64, VerificationError> {
        let payload: ProofPayload = serde_json::from_str(&self.proof_payload)
            .map_err(|e| VerificationError::MalformedProof(format!("proof payload: {e}")))?;
        match payload.timestamp_ms {
            Timestamp::Number(ms) => Ok(ms),
            Timestamp::Text(text) => text.parse().map_err(|_| {
                VerificationError::MalformedProof(format!("timestampMs `{text}` is not a number"))
            }),
        }
    }
}

/// Verify the app proof signature with the signing half of its key.
///
/// # Errors
///
/// - `UnsupportedScheme` for any scheme but [`APP_PROOF_SCHEME`]
/// - `MalformedProof` for a key that is not 130 bytes, a signing half that
///   is not an uncompressed P-256 point, or a signature that is not 64 bytes
/// - `AppProofSignatureInvalid` if the signature does not verify
pub fn verify_app_proof(proof: &AppProof) -> Result<(), VerificationError> {
    if proof.scheme != APP_PROOF_SCHEME {
        return Err(VerificationError::UnsupportedScheme(proof.scheme.clone()));
    }

    let public_key = hex_decode(&proof.public_key)
        .map_err(|e| VerificationError::MalformedProof(format!("publicKey: {e}")))?;
    if public_key.len() != APP_PROOF_PUBLIC_KEY_LEN {
        return Err(VerificationError::MalformedProof(format!(
            "publicKey must be {APP_PROOF_PUBLIC_KEY_LEN} bytes, got {}",
            public_key.len()
        )));
    }
    let signing_key = &public_key[UNCOMPRESSED_POINT_LEN..];
    if signing_key[0] != 0x04 {
        return Err(VerificationError::MalformedProof(
            "signing key must be an uncompressed point".into(),
        ));
    }
    ec::parse_public_key(signing_key)
        .map_err(|e| VerificationError::MalformedProof(format!("signing key: {e}")))?;

    let signature = hex_decode(&proof.signature)
        .map_err(|e| VerificationError::MalformedProof(format!("signature: {e}")))?;
    let signature = <[u8; RAW_SIGNATURE_LEN]>::try_from(signature.as_slice()).map_err(|_| {
        VerificationError::MalformedProof(format!(
            "signature must be {RAW_SIGNATURE_LEN} bytes, got {}",
            signature.len()
        ))
    })?;

    verify_p256_sha256(signing_key, &signature, proof.proof_payload.as_bytes())
        .map_err(|_| VerificationError::AppProofSignatureInvalid)?;
    debug!("app proof signature verified");
    Ok(())
}
