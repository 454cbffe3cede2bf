//! A complete proof pair chained to a test root.
//!
//! The document's `cabundle[0]` is a rogue certificate carrying the root's
//! subject under a different key, so a verifier that trusted the bundled
//! root instead of the pinned one would be caught here.

use super::field;
use enclave_trust_core::attestation::{
    decode_attestation_document, verify_boot_proof, verify_with_trust_root, AppProof, BootProof,
    TrustRoot,
};
use enclave_trust_core::encoding::{base64_decode, base64_encode, hex_encode};
use enclave_trust_core::VerificationError;
use ring::digest::{digest, SHA256};

struct Fixture {
    app: AppProof,
    boot: BootProof,
    root: TrustRoot,
    timestamp_ms: u64,
}

fn fixture() -> Fixture {
    let v: serde_json::Value =
        serde_json::from_str(include_str!("../fixtures/attestation_synthetic.json")).unwrap();
    Fixture {
        app: serde_json::from_value(v["appProof"].clone()).unwrap(),
        boot: serde_json::from_value(v["bootProof"].clone()).unwrap(),
        root: TrustRoot::custom(field(&v, "rootPem"), field(&v, "rootSha256")),
        timestamp_ms: v["timestampMs"].as_u64().unwrap(),
    }
}

/// Replace one hex digit with a different one.
fn change_one_hex_char(hex: &str, index: usize) -> String {
    let mut chars: Vec<char> = hex.chars().collect();
    chars[index] = if chars[index] == '0' { '1' } else { '0' };
    chars.into_iter().collect()
}

#[test]
fn proof_pair_verifies_against_test_root() {
    let f = fixture();
    assert!(!f.root.is_production());
    verify_with_trust_root(&f.app, &f.boot, &f.root).expect("proof pair should verify");
}

#[test]
fn app_proof_timestamp_is_read_from_payload() {
    let f = fixture();
    assert_eq!(f.app.timestamp_ms().unwrap(), f.timestamp_ms);
}

#[test]
fn boot_proof_alone_returns_document() {
    let f = fixture();
    let doc = verify_boot_proof(&f.boot, f.timestamp_ms, &f.root).unwrap();
    assert_eq!(hex_encode(&doc.public_key), f.boot.ephemeral_public_key_hex.to_ascii_lowercase());
    assert_eq!(doc.cabundle.len(), 3);
}

#[test]
fn production_root_does_not_anchor_test_chain() {
    let f = fixture();
    let result = enclave_trust_core::attestation::verify(&f.app, &f.boot);
    assert!(matches!(result, Err(VerificationError::ChainIncomplete { .. })));
}

#[test]
fn uppercase_ephemeral_key_is_accepted() {
    let mut f = fixture();
    f.boot.ephemeral_public_key_hex = f.boot.ephemeral_public_key_hex.to_ascii_uppercase();
    verify_with_trust_root(&f.app, &f.boot, &f.root).unwrap();
}

#[test]
fn one_changed_character_in_boot_key_is_a_mismatch() {
    let mut f = fixture();
    f.boot.ephemeral_public_key_hex = change_one_hex_char(&f.boot.ephemeral_public_key_hex, 200);
    match verify_with_trust_root(&f.app, &f.boot, &f.root) {
        Err(VerificationError::EphemeralKeyMismatch {
            app_proof,
            boot_proof,
            attestation_doc,
        }) => {
            assert_eq!(app_proof, attestation_doc);
            assert_ne!(boot_proof, attestation_doc);
        }
        other => panic!("expected EphemeralKeyMismatch, got {other:?}"),
    }
}

#[test]
fn edited_manifest_is_a_digest_mismatch() {
    let mut f = fixture();
    let mut manifest = base64_decode(&f.boot.qos_manifest_b64).unwrap();
    manifest[0] ^= 0x01;
    f.boot.qos_manifest_b64 = base64_encode(&manifest);
    assert!(matches!(
        verify_with_trust_root(&f.app, &f.boot, &f.root),
        Err(VerificationError::ManifestDigestMismatch { .. })
    ));
}

#[test]
fn edited_app_signature_is_rejected() {
    let mut f = fixture();
    f.app.signature = change_one_hex_char(&f.app.signature, 20);
    assert!(matches!(
        verify_with_trust_root(&f.app, &f.boot, &f.root),
        Err(VerificationError::AppProofSignatureInvalid)
    ));
}

#[test]
fn wrong_root_fingerprint_is_tampering() {
    let f = fixture();
    let root = TrustRoot::custom(f.root.pem(), "00".repeat(32));
    match verify_with_trust_root(&f.app, &f.boot, &root) {
        Err(VerificationError::RootFingerprintTampered { expected, actual }) => {
            assert_eq!(expected, "00".repeat(32));
            assert_eq!(actual.len(), 64);
        }
        other => panic!("expected RootFingerprintTampered, got {other:?}"),
    }
}

#[test]
fn bundled_rogue_root_fails_signature_check() {
    let f = fixture();
    let (_, doc) = decode_attestation_document(&f.boot.aws_attestation_doc_b64).unwrap();
    let rogue_der = doc.cabundle[0].clone();
    let rogue_pem = pem::encode(&pem::Pem::new("CERTIFICATE", rogue_der.clone()));
    let rogue_root = TrustRoot::custom(rogue_pem, hex_encode(digest(&SHA256, &rogue_der).as_ref()));

    assert!(matches!(
        verify_with_trust_root(&f.app, &f.boot, &rogue_root),
        Err(VerificationError::ChainSignatureInvalid { .. })
    ));
}

#[test]
fn duplicated_intermediate_is_a_length_mismatch() {
    let f = fixture();
    let (_, doc) = decode_attestation_document(&f.boot.aws_attestation_doc_b64).unwrap();
    let mut cabundle = doc.cabundle.clone();
    cabundle.push(doc.cabundle[1].clone());
    let result = enclave_trust_core::attestation::verify_certificate_chain(
        &doc.certificate,
        &cabundle,
        &f.root,
        f.timestamp_ms,
    );
    assert!(matches!(
        result,
        Err(VerificationError::ChainLengthMismatch {
            expected: 5,
            actual: 4
        })
    ));
}
