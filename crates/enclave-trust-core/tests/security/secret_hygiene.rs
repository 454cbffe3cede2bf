//! Secrets stay out of formatted output and are wiped when asked.

use enclave_trust_core::encoding::hex_encode;
use enclave_trust_core::memory::{SecretBuffer, SecretBytes};
use enclave_trust_core::{generate_p256_key_pair, hpke, CryptoError};
use zeroize::Zeroize;

const SENTINEL: [u8; 4] = [0xDE, 0xAD, 0xBE, 0xEF];

#[test]
fn secret_buffer_formatting_hides_contents() {
    let buf = SecretBuffer::new(&SENTINEL);
    let shown = format!("{buf:?} {buf}");
    assert!(!shown.contains("deadbeef"));
}

#[test]
fn key_pair_debug_shows_public_half_only() {
    let pair = generate_p256_key_pair().unwrap();
    let shown = format!("{pair:?}");
    assert!(!shown.contains(&pair.expose_private_key_hex()));
}

#[test]
fn secret_bytes_zeroize_clears_every_byte() {
    let mut bytes = SecretBytes::<32>::new([0xAA; 32]);
    bytes.zeroize();
    assert_eq!(bytes.expose(), &[0u8; 32]);
    assert_eq!(format!("{bytes:?}"), "SecretBytes<32>(***)");
}

#[test]
fn failed_decryption_reports_no_key_material() {
    let receiver = generate_p256_key_pair().unwrap();
    let other = generate_p256_key_pair().unwrap();
    let sealed = hpke::encrypt(&SENTINEL, &receiver.public_key).unwrap();

    let err = hpke::decrypt(
        &sealed.ciphertext,
        &sealed.encapped_public,
        other.private_key.expose(),
    )
    .unwrap_err();
    assert!(matches!(err, CryptoError::DecryptionFailed));
    let message = err.to_string();
    assert!(!message.contains(&other.expose_private_key_hex()));
    assert!(!message.contains(&hex_encode(&sealed.ciphertext)));
}

#[test]
fn invalid_private_key_error_does_not_echo_input() {
    let err = enclave_trust_core::ec::secret_key_from_bytes(&[0xff; 32]).unwrap_err();
    assert!(!err.to_string().contains("ffff"));
}
