//! Signed envelope vectors: an export of a raw Ed25519 seed, an export of a
//! wallet mnemonic, and an import envelope naming a target key. All three
//! are signed by a fixed test signer, so every call below passes that
//! signer as an explicit override.

use super::field;
use enclave_trust_core::bundle::{
    decrypt_export_bundle, encrypt_private_key_to_bundle, encrypt_wallet_to_bundle,
    ExportBundleRequest, ImportBundleRequest, KeyFormat, SignedEnvelope,
};
use enclave_trust_core::encoding::{hex_decode, hex_encode};
use enclave_trust_core::{hpke, CryptoError};

fn fixture() -> serde_json::Value {
    serde_json::from_str(include_str!("../fixtures/envelopes.json")).unwrap()
}

fn export(v: &serde_json::Value, bundle_key: &str, format: KeyFormat) -> Result<String, CryptoError> {
    let private = hex_decode(field(v, "receiverPrivate")).unwrap();
    decrypt_export_bundle(&ExportBundleRequest {
        bundle: field(v, bundle_key),
        receiver_private: &private,
        organization_id: field(v, "organizationId"),
        key_format: format,
        signer_override: Some(field(v, "signerPublic")),
    })
    .map(|secret| secret.expose().to_owned())
}

#[test]
fn export_bundle_decrypts_to_hex() {
    let v = fixture();
    let key = export(&v, "exportBundle", KeyFormat::Hexadecimal).expect("export should decrypt");
    assert_eq!(key, field(&v, "exportPlaintextHex"));
}

#[test]
fn export_bundle_decrypts_to_solana_keypair() {
    let v = fixture();
    let key = export(&v, "exportBundle", KeyFormat::Solana).expect("export should decrypt");
    assert_eq!(key, field(&v, "solanaExpected"));
}

#[test]
fn wallet_bundle_decrypts_to_mnemonic() {
    let v = fixture();
    let mnemonic = export(&v, "walletBundle", KeyFormat::Mnemonic).expect("wallet should decrypt");
    assert_eq!(mnemonic, field(&v, "walletMnemonic"));
}

#[test]
fn production_pin_rejects_test_signer() {
    let v = fixture();
    let private = hex_decode(field(&v, "receiverPrivate")).unwrap();
    let result = decrypt_export_bundle(&ExportBundleRequest {
        bundle: field(&v, "exportBundle"),
        receiver_private: &private,
        organization_id: field(&v, "organizationId"),
        key_format: KeyFormat::Hexadecimal,
        signer_override: None,
    });
    match result {
        Err(CryptoError::SignerPinningFailed { actual, .. }) => {
            assert_eq!(actual, field(&v, "signerPublic"));
        }
        other => panic!("expected SignerPinningFailed, got {other:?}"),
    }
}

#[test]
fn edited_payload_fails_signature() {
    let v = fixture();
    let mut envelope = SignedEnvelope::parse(field(&v, "exportBundle")).unwrap();
    let mut data = hex_decode(&envelope.data).unwrap();
    // "org-7f3a" → "org-7f3b"
    let position = data.windows(8).position(|w| w == b"org-7f3a").unwrap();
    data[position + 7] = b'b';
    envelope.data = hex_encode(&data);

    let result = envelope.verify(Some(field(&v, "signerPublic")));
    assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
}

#[test]
fn export_for_other_organization_is_rejected() {
    let v = fixture();
    let private = hex_decode(field(&v, "receiverPrivate")).unwrap();
    let result = decrypt_export_bundle(&ExportBundleRequest {
        bundle: field(&v, "exportBundle"),
        receiver_private: &private,
        organization_id: "org-0000",
        key_format: KeyFormat::Hexadecimal,
        signer_override: Some(field(&v, "signerPublic")),
    });
    assert!(matches!(result, Err(CryptoError::OrganizationMismatch { .. })));
}

#[test]
fn import_envelope_exposes_signed_fields() {
    let v = fixture();
    let envelope = SignedEnvelope::parse(field(&v, "importBundle"))
        .unwrap()
        .verify(Some(field(&v, "signerPublic")))
        .unwrap();
    assert_eq!(envelope.organization_id, field(&v, "organizationId"));
    assert_eq!(envelope.user_id.as_deref(), Some(field(&v, "userId")));
    assert_eq!(
        envelope.target_public().unwrap(),
        hex_decode(field(&v, "receiverPublic")).unwrap()
    );
    assert!(matches!(envelope.ciphertext(), Err(CryptoError::MalformedBundle(_))));
}

#[test]
fn import_seals_private_key_to_target() {
    let v = fixture();
    let request = ImportBundleRequest {
        bundle: field(&v, "importBundle"),
        organization_id: field(&v, "organizationId"),
        user_id: field(&v, "userId"),
        signer_override: Some(field(&v, "signerPublic")),
    };
    let out = encrypt_private_key_to_bundle(
        field(&v, "exportPlaintextHex"),
        KeyFormat::Hexadecimal,
        &request,
    )
    .expect("import should seal");

    let sealed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let opened = hpke::decrypt(
        &hex_decode(field(&sealed, "ciphertext")).unwrap(),
        &hex_decode(field(&sealed, "encappedPublic")).unwrap(),
        &hex_decode(field(&v, "receiverPrivate")).unwrap(),
    )
    .unwrap();
    assert_eq!(hex_encode(opened.expose()), field(&v, "exportPlaintextHex"));
}

#[test]
fn import_of_solana_key_seals_only_the_seed() {
    let v = fixture();
    let request = ImportBundleRequest {
        bundle: field(&v, "importBundle"),
        organization_id: field(&v, "organizationId"),
        user_id: field(&v, "userId"),
        signer_override: Some(field(&v, "signerPublic")),
    };
    let out =
        encrypt_private_key_to_bundle(field(&v, "solanaExpected"), KeyFormat::Solana, &request)
            .unwrap();
    let sealed: serde_json::Value = serde_json::from_str(&out).unwrap();
    let opened = hpke::decrypt(
        &hex_decode(field(&sealed, "ciphertext")).unwrap(),
        &hex_decode(field(&sealed, "encappedPublic")).unwrap(),
        &hex_decode(field(&v, "receiverPrivate")).unwrap(),
    )
    .unwrap();
    assert_eq!(hex_encode(opened.expose()), field(&v, "exportPlaintextHex"));
}

#[test]
fn wallet_import_for_other_user_is_rejected() {
    let v = fixture();
    let result = encrypt_wallet_to_bundle(
        field(&v, "walletMnemonic"),
        &ImportBundleRequest {
            bundle: field(&v, "importBundle"),
            organization_id: field(&v, "organizationId"),
            user_id: "user-0000",
            signer_override: Some(field(&v, "signerPublic")),
        },
    );
    let err = result.unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"user mismatch: expected user-0000, got user-19c2");
}
