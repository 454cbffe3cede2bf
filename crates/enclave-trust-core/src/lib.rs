//! `enclave-trust-core`: the cryptographic trust layer of the key-custody SDK.
//!
//! Two jobs, both stateless:
//! - decrypt secrets a remote enclave encrypted to a caller-held P-256 key
//!   (HPKE bundles, signed export/import envelopes)
//! - verify that a remote enclave runs known code (app proof + Nitro boot
//!   proof + ephemeral key cross-check)
//!
//! Zero network, zero async, zero filesystem.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod encoding;

pub mod ec;
pub mod hpke;

pub mod signature;

pub mod bundle;

pub mod attestation;

pub use attestation::{
    verify, verify_boot_proof, verify_with_trust_root, AppProof, AttestationDocument, BootProof,
    TrustRoot, AWS_ROOT_CERT_PEM, AWS_ROOT_CERT_SHA256,
};
pub use bundle::{
    decode_credential_bundle, decrypt_credential_bundle, decrypt_export_bundle,
    encode_credential_bundle, encrypt_credential_bundle, encrypt_private_key_to_bundle,
    encrypt_wallet_to_bundle, BundleDialect, EncryptedBundle, ExportBundleRequest,
    ExportedSecret, ImportBundleRequest, KeyFormat, SignedEnvelope, VerifiedEnvelope,
};
pub use ec::{
    compress_public_key, generate_p256_key_pair, public_key_from_private, uncompress_public_key,
    P256KeyPair,
};
pub use error::{CryptoError, VerificationError};
pub use memory::SecretBuffer;
pub use signature::{
    der_to_raw_signature, raw_to_der_signature, verify_enclave_signature, verify_stamp_signature,
    PRODUCTION_SIGNER_PUBLIC_KEY,
};
