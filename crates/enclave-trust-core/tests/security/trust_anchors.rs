//! The pinned signer and the pinned root can only be replaced explicitly.

use enclave_trust_core::attestation::{TrustRoot, AWS_ROOT_CERT_PEM, AWS_ROOT_CERT_SHA256};
use enclave_trust_core::signature::{verify_enclave_signature, PRODUCTION_SIGNER_PUBLIC_KEY};
use enclave_trust_core::{CryptoError, VerificationError};

#[test]
fn production_signer_is_required_by_default() {
    let other = format!("04{}", "11".repeat(64));
    let result = verify_enclave_signature(&other, "3006020101020101", b"data", None);
    match result {
        Err(CryptoError::SignerPinningFailed { expected, actual }) => {
            assert_eq!(expected, PRODUCTION_SIGNER_PUBLIC_KEY);
            assert_eq!(actual, other);
        }
        other => panic!("expected SignerPinningFailed, got {other:?}"),
    }
}

#[test]
fn production_signer_with_bad_signature_still_fails() {
    let result = verify_enclave_signature(
        &PRODUCTION_SIGNER_PUBLIC_KEY.to_ascii_uppercase(),
        "3006020101020101",
        b"data",
        None,
    );
    assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
}

#[test]
fn default_trust_root_is_aws() {
    let root = TrustRoot::default();
    assert!(root.is_production());
    assert_eq!(root.pem(), AWS_ROOT_CERT_PEM);
    root.certificate().unwrap();
}

#[test]
fn edited_root_pem_is_detected() {
    // Same fingerprint, one base64 character of the body changed.
    let tampered = AWS_ROOT_CERT_PEM.replacen("MIIC", "MIID", 1);
    assert_ne!(tampered, AWS_ROOT_CERT_PEM);
    let root = TrustRoot::custom(tampered, AWS_ROOT_CERT_SHA256);
    assert!(!root.is_production());
    assert!(matches!(
        root.certificate(),
        Err(VerificationError::RootFingerprintTampered { .. })
    ));
}
