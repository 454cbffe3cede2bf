//! Proof pairs as they arrive on the wire: one JSON object holding
//! `appProof` and `bootProof`.

use enclave_trust_core::attestation::{verify_with_trust_root, AppProof, BootProof, TrustRoot};
use enclave_trust_core::VerificationError;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofPair {
    app_proof: AppProof,
    boot_proof: BootProof,
}

struct Vectors {
    wire: String,
    root: TrustRoot,
}

fn vectors() -> Vectors {
    let v: serde_json::Value =
        serde_json::from_str(include_str!("../fixtures/attestation_synthetic.json")).unwrap();
    let wire = serde_json::json!({
        "appProof": v["appProof"],
        "bootProof": v["bootProof"],
    })
    .to_string();
    let root = TrustRoot::custom(
        v["rootPem"].as_str().unwrap(),
        v["rootSha256"].as_str().unwrap(),
    );
    Vectors { wire, root }
}

#[test]
fn wire_proof_pair_verifies() {
    let vectors = vectors();
    let pair: ProofPair = serde_json::from_str(&vectors.wire).unwrap();
    verify_with_trust_root(&pair.app_proof, &pair.boot_proof, &vectors.root).unwrap();
}

#[test]
fn proof_pair_survives_reserialization() {
    let vectors = vectors();
    let pair: ProofPair = serde_json::from_str(&vectors.wire).unwrap();
    let app: AppProof =
        serde_json::from_str(&serde_json::to_string(&pair.app_proof).unwrap()).unwrap();
    let boot: BootProof =
        serde_json::from_str(&serde_json::to_string(&pair.boot_proof).unwrap()).unwrap();
    assert_eq!(app, pair.app_proof);
    verify_with_trust_root(&app, &boot, &vectors.root).unwrap();
}

#[test]
fn unknown_scheme_is_rejected_before_any_crypto() {
    let vectors = vectors();
    let mut pair: ProofPair = serde_json::from_str(&vectors.wire).unwrap();
    pair.app_proof.scheme = "SIGNATURE_SCHEME_EPHEMERAL_KEY_ED25519".into();
    let err = verify_with_trust_root(&pair.app_proof, &pair.boot_proof, &vectors.root).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"unsupported app proof scheme: SIGNATURE_SCHEME_EPHEMERAL_KEY_ED25519"
    );
}

#[test]
fn boot_proof_from_another_enclave_is_a_key_mismatch() {
    let vectors = vectors();
    let mut pair: ProofPair = serde_json::from_str(&vectors.wire).unwrap();
    pair.boot_proof.ephemeral_public_key_hex = "04".repeat(65);
    assert!(matches!(
        verify_with_trust_root(&pair.app_proof, &pair.boot_proof, &vectors.root),
        Err(VerificationError::EphemeralKeyMismatch { .. })
    ));
}

#[test]
fn garbage_attestation_document_is_malformed() {
    let vectors = vectors();
    let mut pair: ProofPair = serde_json::from_str(&vectors.wire).unwrap();
    pair.boot_proof.aws_attestation_doc_b64 = "AAAA".into();
    assert!(matches!(
        verify_with_trust_root(&pair.app_proof, &pair.boot_proof, &vectors.root),
        Err(VerificationError::MalformedAttestationDocument(_))
    ));
}
