//! Phase B.1/B.2: COSE_Sign1 envelope and Nitro attestation document.
//!
//! This module provides:
//! - [`parse_cose_sign1`]: the signed envelope via `coset`, tagged or untagged
//! - [`AttestationDocument`]: the CBOR payload, validated at decode time
//! - [`verify_cose_sign1`]: ES384 over the `Sig_structure` with the leaf key
//!
//! Decoding goes through explicit structs: a field that is missing or has
//! the wrong CBOR type fails here instead of surfacing later.

use super::chain::parse_certificate;
use crate::encoding::base64_decode;
use crate::error::VerificationError;
use coset::{iana, Algorithm, CborSerializable, TaggedCborSerializable};
use ring::signature::{UnparsedPublicKey, ECDSA_P384_SHA384_FIXED};
use serde::Deserialize;
use serde_bytes::ByteBuf;
use tracing::debug;

pub use coset::CoseSign1;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Leading byte of a COSE_Sign1 carrying CBOR tag 18.
const COSE_SIGN1_TAG_BYTE: u8 = 0xd2;

/// Raw `r ‖ s` ES384 signature length.
const ES384_SIGNATURE_LEN: usize = 96;

// ---------------------------------------------------------------------------
// COSE_Sign1
// ---------------------------------------------------------------------------

/// Decode a COSE_Sign1 structure, with or without CBOR tag 18.
///
/// # Errors
///
/// Returns `MalformedAttestationDocument` if the bytes are not a
/// well-formed COSE_Sign1.
pub fn parse_cose_sign1(bytes: &[u8]) -> Result<CoseSign1, VerificationError> {
    let parsed = if bytes.first() == Some(&COSE_SIGN1_TAG_BYTE) {
        CoseSign1::from_tagged_slice(bytes)
    } else {
        CoseSign1::from_slice(bytes)
    };
    parsed.map_err(|e| malformed(format!("COSE_Sign1: {e:?}")))
}

fn is_es384(cose: &CoseSign1) -> bool {
    cose.protected.header.alg == Some(Algorithm::Assigned(iana::Algorithm::ES384))
}

fn malformed(reason: String) -> VerificationError {
    VerificationError::MalformedAttestationDocument(reason)
}

// ---------------------------------------------------------------------------
// Attestation document
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RawDocument {
    module_id: Option<String>,
    digest: Option<String>,
    timestamp: Option<u64>,
    certificate: Option<ByteBuf>,
    cabundle: Option<Vec<ByteBuf>>,
    public_key: Option<ByteBuf>,
    user_data: Option<ByteBuf>,
}

/// Fields of a Nitro attestation document that verification relies on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestationDocument {
    /// Enclave instance identifier.
    pub module_id: Option<String>,
    /// PCR digest algorithm, `SHA384` on Nitro.
    pub digest: Option<String>,
    /// Issuance time, Unix milliseconds.
    pub timestamp: Option<u64>,
    /// DER leaf certificate.
    pub certificate: Vec<u8>,
    /// DER issuing chain, root first.
    pub cabundle: Vec<Vec<u8>>,
    /// Ephemeral public key bound into the document.
    pub public_key: Vec<u8>,
    /// SHA-256 of the boot manifest.
    pub user_data: Vec<u8>,
}

impl AttestationDocument {
    /// Decode the CBOR payload of a COSE_Sign1 envelope.
    ///
    /// # Errors
    ///
    /// - `MalformedAttestationDocument` if the payload is not a CBOR map of
    ///   the expected field types
    /// - `MissingField` if `certificate`, `cabundle`, `public_key` or
    ///   `user_data` is absent or null
    pub fn from_cbor(payload: &[u8]) -> Result<Self, VerificationError> {
        let raw: RawDocument = ciborium::de::from_reader(payload)
            .map_err(|e| malformed(format!("attestation document: {e}")))?;
        Ok(Self {
            module_id: raw.module_id,
            digest: raw.digest,
            timestamp: raw.timestamp,
            certificate: raw
                .certificate
                .ok_or(VerificationError::MissingField("certificate"))?
                .into_vec(),
            cabundle: raw
                .cabundle
                .ok_or(VerificationError::MissingField("cabundle"))?
                .into_iter()
                .map(ByteBuf::into_vec)
                .collect(),
            public_key: raw
                .public_key
                .ok_or(VerificationError::MissingField("public_key"))?
                .into_vec(),
            user_data: raw
                .user_data
                .ok_or(VerificationError::MissingField("user_data"))?
                .into_vec(),
        })
    }
}

/// Base64-decode a boot proof's attestation document and split it into the
/// COSE envelope and the decoded payload.
///
/// # Errors
///
/// `Crypto(Encoding)` for bad base64, otherwise the errors of
/// [`parse_cose_sign1`] and [`AttestationDocument::from_cbor`]. A detached
/// payload is `MissingField("payload")`.
pub fn decode_attestation_document(
    document_b64: &str,
) -> Result<(CoseSign1, AttestationDocument), VerificationError> {
    let bytes = base64_decode(document_b64)?;
    let cose = parse_cose_sign1(&bytes)?;
    let payload = cose
        .payload
        .as_deref()
        .ok_or(VerificationError::MissingField("payload"))?;
    let document = AttestationDocument::from_cbor(payload)?;
    debug!(
        module_id = document.module_id.as_deref().unwrap_or_default(),
        cabundle_len = document.cabundle.len(),
        "attestation document decoded"
    );
    Ok((cose, document))
}

/// Verify the COSE_Sign1 signature with the leaf certificate's P-384 key.
///
/// # Errors
///
/// - `MalformedAttestationDocument` if `alg` is not ES384, the signature is
///   not 96 bytes, or the leaf certificate does not parse
/// - `CoseSignatureInvalid` if the signature does not verify
pub fn verify_cose_sign1(cose: &CoseSign1, leaf_der: &[u8]) -> Result<(), VerificationError> {
    if !is_es384(cose) {
        return Err(malformed(format!(
            "unsupported COSE algorithm {:?}",
            cose.protected.header.alg
        )));
    }
    if cose.signature.len() != ES384_SIGNATURE_LEN {
        return Err(malformed(format!(
            "ES384 signature must be {ES384_SIGNATURE_LEN} bytes, got {}",
            cose.signature.len()
        )));
    }

    let leaf = parse_certificate(leaf_der, "leaf")?;
    let leaf_key = leaf
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .raw_bytes();
    UnparsedPublicKey::new(&ECDSA_P384_SHA384_FIXED, leaf_key)
        .verify(&cose.tbs_data(b""), &cose.signature)
        .map_err(|_| VerificationError::CoseSignatureInvalid)?;
    debug!("COSE_Sign1 signature verified");
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
