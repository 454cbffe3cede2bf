//! Error types for `enclave-trust-core`.
//!
//! [`CryptoError`] covers the primitive layer (codecs, EC points, HPKE,
//! bundles, signatures). [`VerificationError`] covers the attestation
//! pipeline and wraps [`CryptoError`] for failures that bubble up from it.
//!
//! Messages carry public values only (keys, IDs, digests). Plaintext and
//! private scalars never appear in an error.

use thiserror::Error;

/// Errors produced by decoding, key handling, HPKE and signature operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A hex, base64, base64url, base58 or base58check string did not decode.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Public key bytes are the wrong length, carry a bad SEC1 prefix, or do
    /// not describe a point on P-256.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Private scalar is not 32 bytes or is outside `[1, n)`.
    #[error("invalid private key")]
    InvalidPrivateKey,

    /// Bundle bytes or JSON do not have the expected shape.
    #[error("malformed bundle: {0}")]
    MalformedBundle(String),

    /// Envelope `version` is present but not one we understand.
    #[error("unsupported bundle version: {0}")]
    UnsupportedVersion(String),

    /// AEAD authentication failed: wrong key, wrong AAD or tampered bytes.
    #[error("decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// Encryption could not be performed (key schedule or AEAD seal).
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Envelope was issued for a different organization.
    #[error("organization mismatch: expected {expected}, got {actual}")]
    OrganizationMismatch {
        /// Organization the caller expected.
        expected: String,
        /// Organization found in the signed envelope.
        actual: String,
    },

    /// Envelope was issued for a different user.
    #[error("user mismatch: expected {expected}, got {actual}")]
    UserMismatch {
        /// User the caller expected.
        expected: String,
        /// User found in the signed envelope (empty when absent).
        actual: String,
    },

    /// The envelope names a signer other than the pinned one.
    #[error("signer pinning failed: expected {expected}, got {actual}")]
    SignerPinningFailed {
        /// Pinned (or explicitly overridden) signer public key, hex.
        expected: String,
        /// Signer public key claimed by the envelope, hex.
        actual: String,
    },

    /// Signature bytes are not valid DER or raw `r || s`.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// ECDSA verification returned false.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// Key material could not be converted to or from the requested format.
    #[error("key format error: {0}")]
    KeyFormat(String),
}

/// Errors produced by the attestation / proof verification pipeline.
///
/// Every variant identifies the check that failed; the pipeline stops at the
/// first one.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Primitive failure bubbled up from the crypto layer.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// App proof uses a scheme other than `SIGNATURE_SCHEME_EPHEMERAL_KEY_P256`.
    #[error("unsupported app proof scheme: {0}")]
    UnsupportedScheme(String),

    /// A proof field has the wrong length or encoding.
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    /// App proof signature does not verify under its signing key.
    #[error("app proof signature verification failed")]
    AppProofSignatureInvalid,

    /// The COSE_Sign1 envelope or its payload could not be decoded.
    #[error("malformed attestation document: {0}")]
    MalformedAttestationDocument(String),

    /// A field required for verification is absent from the attestation document.
    #[error("attestation document is missing field `{0}`")]
    MissingField(&'static str),

    /// COSE_Sign1 signature does not verify under the leaf certificate key.
    #[error("COSE_Sign1 signature verification failed")]
    CoseSignatureInvalid,

    /// Pinned root certificate no longer hashes to its pinned fingerprint.
    #[error("pinned root certificate fingerprint mismatch: expected {expected}, got {actual}")]
    RootFingerprintTampered {
        /// Pinned fingerprint, hex.
        expected: String,
        /// Fingerprint recomputed from the pinned PEM, hex (empty if the PEM
        /// no longer parses).
        actual: String,
    },

    /// Pinned root is not self-signed or was not valid at the proof timestamp.
    #[error("root certificate invalid: {0}")]
    RootCertificateInvalid(String),

    /// No issuer could be found for a certificate in the chain.
    #[error("certificate chain incomplete: no issuer found for {subject}")]
    ChainIncomplete {
        /// Subject whose issuer is missing.
        subject: String,
    },

    /// The built path does not use every certificate the bundle supplied.
    #[error("certificate chain length mismatch: expected {expected}, got {actual}")]
    ChainLengthMismatch {
        /// `len(cabundle) - 1 + 2`.
        expected: usize,
        /// Length of the path actually built.
        actual: usize,
    },

    /// A certificate signature does not verify under its issuer's key.
    #[error("certificate signature invalid: {subject} (issuer {issuer})")]
    ChainSignatureInvalid {
        /// Subject of the offending certificate.
        subject: String,
        /// Issuer it was checked against.
        issuer: String,
    },

    /// `sha256(manifest)` differs from the attestation document `user_data`.
    #[error("manifest digest mismatch: expected {expected}, got {actual}")]
    ManifestDigestMismatch {
        /// `user_data` from the attestation document, hex.
        expected: String,
        /// SHA-256 of the decoded manifest, hex.
        actual: String,
    },

    /// Ephemeral key differs between the three places it must agree.
    #[error(
        "ephemeral key mismatch: app proof {app_proof}, boot proof {boot_proof}, attestation document {attestation_doc}"
    )]
    EphemeralKeyMismatch {
        /// Hex public key from the app proof.
        app_proof: String,
        /// Hex public key from the boot proof.
        boot_proof: String,
        /// Hex public key from the attestation document.
        attestation_doc: String,
    },
}
