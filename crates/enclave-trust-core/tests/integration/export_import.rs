//! Export and import envelopes signed by a throwaway quorum key.

use super::TestSigner;
use enclave_trust_core::bundle::{
    decrypt_export_bundle, encrypt_private_key_to_bundle, encrypt_wallet_to_bundle,
    ExportBundleRequest, ImportBundleRequest, KeyFormat,
};
use enclave_trust_core::encoding::{base58_encode, hex_decode, hex_encode};
use enclave_trust_core::{generate_p256_key_pair, hpke, CryptoError, P256KeyPair};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::json;

const ORG: &str = "org-integration";
const USER: &str = "user-integration";

/// An export envelope sealing `secret` to `receiver`.
fn export_envelope(signer: &TestSigner, receiver: &P256KeyPair, secret: &[u8]) -> String {
    let sealed = hpke::encrypt(secret, &receiver.public_key_uncompressed).unwrap();
    signer.envelope(&json!({
        "organizationId": ORG,
        "encappedPublic": hex_encode(&sealed.encapped_public),
        "ciphertext": hex_encode(&sealed.ciphertext),
    }))
}

fn import_envelope(signer: &TestSigner, target: &P256KeyPair) -> String {
    signer.envelope(&json!({
        "organizationId": ORG,
        "userId": USER,
        "targetPublic": target.public_key_uncompressed_hex(),
    }))
}

fn open_import(sealed_json: &str, target: &P256KeyPair) -> Vec<u8> {
    let sealed: serde_json::Value = serde_json::from_str(sealed_json).unwrap();
    hpke::decrypt(
        &hex_decode(sealed["ciphertext"].as_str().unwrap()).unwrap(),
        &hex_decode(sealed["encappedPublic"].as_str().unwrap()).unwrap(),
        target.private_key.expose(),
    )
    .unwrap()
    .expose()
    .to_vec()
}

#[test]
fn exported_key_comes_back_as_hex() {
    let signer = TestSigner::new();
    let receiver = generate_p256_key_pair().unwrap();
    let secret = [0x5au8; 32];
    let bundle = export_envelope(&signer, &receiver, &secret);
    let public = signer.public_hex();

    let exported = decrypt_export_bundle(&ExportBundleRequest {
        bundle: &bundle,
        receiver_private: receiver.private_key.expose(),
        organization_id: ORG,
        key_format: KeyFormat::Hexadecimal,
        signer_override: Some(&public),
    })
    .unwrap();
    assert_eq!(exported.format(), KeyFormat::Hexadecimal);
    assert_eq!(exported.expose(), hex_encode(&secret));
    assert!(!format!("{exported:?}").contains(&hex_encode(&secret)));
}

#[test]
fn exported_seed_comes_back_as_solana_keypair() {
    let signer = TestSigner::new();
    let receiver = generate_p256_key_pair().unwrap();
    let seed = [0x11u8; 32];
    let bundle = export_envelope(&signer, &receiver, &seed);
    let public = signer.public_hex();

    let exported = decrypt_export_bundle(&ExportBundleRequest {
        bundle: &bundle,
        receiver_private: receiver.private_key.expose(),
        organization_id: ORG,
        key_format: KeyFormat::Solana,
        signer_override: Some(&public),
    })
    .unwrap();

    let pair = Ed25519KeyPair::from_seed_unchecked(&seed).unwrap();
    let expected = base58_encode(&[&seed[..], pair.public_key().as_ref()].concat());
    assert_eq!(exported.expose(), expected);
}

#[test]
fn envelope_from_unpinned_signer_is_refused_without_override() {
    let signer = TestSigner::new();
    let receiver = generate_p256_key_pair().unwrap();
    let bundle = export_envelope(&signer, &receiver, &[1u8; 32]);

    let result = decrypt_export_bundle(&ExportBundleRequest {
        bundle: &bundle,
        receiver_private: receiver.private_key.expose(),
        organization_id: ORG,
        key_format: KeyFormat::Hexadecimal,
        signer_override: None,
    });
    assert!(matches!(result, Err(CryptoError::SignerPinningFailed { .. })));
}

#[test]
fn envelope_signed_by_another_key_fails_verification() {
    let signer = TestSigner::new();
    let impostor = TestSigner::new();
    let receiver = generate_p256_key_pair().unwrap();
    let bundle = export_envelope(&impostor, &receiver, &[1u8; 32]);

    // Claim the impostor's envelope came from `signer`.
    let mut envelope: serde_json::Value = serde_json::from_str(&bundle).unwrap();
    envelope["enclaveQuorumPublic"] = json!(signer.public_hex());
    let public = signer.public_hex();

    let result = decrypt_export_bundle(&ExportBundleRequest {
        bundle: &envelope.to_string(),
        receiver_private: receiver.private_key.expose(),
        organization_id: ORG,
        key_format: KeyFormat::Hexadecimal,
        signer_override: Some(&public),
    });
    assert!(matches!(result, Err(CryptoError::SignatureInvalid)));
}

#[test]
fn unknown_envelope_version_is_rejected() {
    let signer = TestSigner::new();
    let receiver = generate_p256_key_pair().unwrap();
    let bundle = export_envelope(&signer, &receiver, &[1u8; 32]);
    let mut envelope: serde_json::Value = serde_json::from_str(&bundle).unwrap();
    envelope["version"] = json!("v2.0.0");
    let public = signer.public_hex();

    let result = decrypt_export_bundle(&ExportBundleRequest {
        bundle: &envelope.to_string(),
        receiver_private: receiver.private_key.expose(),
        organization_id: ORG,
        key_format: KeyFormat::Hexadecimal,
        signer_override: Some(&public),
    });
    assert!(matches!(result, Err(CryptoError::UnsupportedVersion(v)) if v == "v2.0.0"));
}

#[test]
fn imported_key_opens_with_target_private_key() {
    let signer = TestSigner::new();
    let target = generate_p256_key_pair().unwrap();
    let bundle = import_envelope(&signer, &target);
    let public = signer.public_hex();
    let request = ImportBundleRequest {
        bundle: &bundle,
        organization_id: ORG,
        user_id: USER,
        signer_override: Some(&public),
    };

    let sealed = encrypt_private_key_to_bundle(&"ab".repeat(32), KeyFormat::Hexadecimal, &request)
        .unwrap();
    assert_eq!(open_import(&sealed, &target), vec![0xab; 32]);
}

#[test]
fn imported_wallet_opens_as_mnemonic_text() {
    let signer = TestSigner::new();
    let target = generate_p256_key_pair().unwrap();
    let bundle = import_envelope(&signer, &target);
    let public = signer.public_hex();
    let mnemonic = "legal winner thank year wave sausage worth useful legal winner thank yellow";

    let sealed = encrypt_wallet_to_bundle(
        &format!("  {mnemonic}\n"),
        &ImportBundleRequest {
            bundle: &bundle,
            organization_id: ORG,
            user_id: USER,
            signer_override: Some(&public),
        },
    )
    .unwrap();
    assert_eq!(open_import(&sealed, &target), mnemonic.as_bytes());
}

#[test]
fn mnemonic_format_is_not_a_private_key_format() {
    let signer = TestSigner::new();
    let target = generate_p256_key_pair().unwrap();
    let bundle = import_envelope(&signer, &target);
    let public = signer.public_hex();
    let result = encrypt_private_key_to_bundle(
        "abandon abandon",
        KeyFormat::Mnemonic,
        &ImportBundleRequest {
            bundle: &bundle,
            organization_id: ORG,
            user_id: USER,
            signer_override: Some(&public),
        },
    );
    assert!(matches!(result, Err(CryptoError::KeyFormat(_))));
}

#[test]
fn import_for_other_organization_is_rejected() {
    let signer = TestSigner::new();
    let target = generate_p256_key_pair().unwrap();
    let bundle = import_envelope(&signer, &target);
    let public = signer.public_hex();
    let result = encrypt_wallet_to_bundle(
        "words",
        &ImportBundleRequest {
            bundle: &bundle,
            organization_id: "org-other",
            user_id: USER,
            signer_override: Some(&public),
        },
    );
    assert!(matches!(result, Err(CryptoError::OrganizationMismatch { .. })));
}
