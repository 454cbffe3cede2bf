//! HPKE base mode: DHKEM(P-256, HKDF-SHA256), HKDF-SHA256, AES-256-GCM.
//!
//! This module provides:
//! - [`decrypt`]: open a ciphertext sealed to a caller-held P-256 key
//! - [`encrypt`]: seal to a remote P-256 key with a fresh ephemeral sender
//! - [`format_hpke_buf`]: the `{"encappedPublic", "ciphertext"}` JSON form
//!   used by import bundles
//! - the RFC 9180 labeling helpers [`labeled_ikm`] and [`labeled_info`]
//!
//! # Key schedule
//!
//! ```text
//! dh            = x-coordinate of ECDH(sk, pk)                 (32 bytes)
//! kem_context   = enc_uncompressed ‖ receiver_uncompressed     (130 bytes)
//! shared_secret = Expand(Extract(∅, LabeledIkm("eae_prk", dh, KEM)),
//!                        LabeledInfo("shared_secret", kem_context, KEM, 32), 32)
//! secret_ikm    = LabeledIkm("secret", ∅, HPKE)
//! key           = Expand(Extract(shared_secret, secret_ikm), AES_KEY_INFO, 32)
//! base_nonce    = Expand(Extract(shared_secret, secret_ikm), IV_INFO, 12)
//! aad           = kem_context
//! ```
//!
//! Only single-shot base mode with empty `info` is supported, so the
//! sequence number is always zero and the nonce is the base nonce itself.

use crate::ec::{self, UNCOMPRESSED_POINT_LEN};
use crate::encoding::hex_encode;
use crate::error::CryptoError;
use crate::memory::{SecretBuffer, SecretBytes};
use p256::ecdh::diffie_hellman;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use ring::{aead, hkdf};
use serde::Serialize;
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// RFC 9180 version label.
pub const HPKE_VERSION: &[u8] = b"HPKE-v1";

/// `"KEM" ‖ I2OSP(kem_id = 0x0010, 2)`.
pub const KEM_SUITE_ID: &[u8] = b"KEM\x00\x10";

/// `"HPKE" ‖ kem_id 0x0010 ‖ kdf_id 0x0001 ‖ aead_id 0x0002`.
pub const HPKE_SUITE_ID: &[u8] = b"HPKE\x00\x10\x00\x01\x00\x02";

/// DHKEM `ExtractAndExpand` label for the extract step.
pub const LABEL_EAE_PRK: &[u8] = b"eae_prk";
/// DHKEM `ExtractAndExpand` label for the expand step.
pub const LABEL_SHARED_SECRET: &[u8] = b"shared_secret";
/// Key schedule label for extracting the HPKE secret.
pub const LABEL_SECRET: &[u8] = b"secret";

/// `LabeledInfo("key", key_schedule_context, HPKE_SUITE_ID, 32)` for base
/// mode with empty `info` and empty PSK, where
/// `key_schedule_context = 0x00 ‖ psk_id_hash ‖ info_hash`.
pub const AES_KEY_INFO: [u8; 87] = [
    0x00, 0x20, 0x48, 0x50, 0x4b, 0x45, 0x2d, 0x76, 0x31, 0x48, 0x50, 0x4b, 0x45, 0x00, 0x10,
    0x00, 0x01, 0x00, 0x02, 0x6b, 0x65, 0x79, 0x00, 0x8f, 0xc3, 0xae, 0xb8, 0x32, 0x49, 0x0a,
    0x4b, 0x5a, 0xb3, 0xe4, 0x20, 0x23, 0x28, 0x7d, 0xb2, 0x9a, 0x1f, 0x4b, 0xc7, 0xc2, 0x22,
    0xc0, 0xdf, 0x22, 0x87, 0x27, 0xb7, 0x0a, 0x40, 0x21, 0x12, 0x68, 0x03, 0x70, 0x4c, 0x9a,
    0xd6, 0x90, 0x2c, 0xc1, 0xee, 0x56, 0x89, 0x62, 0x53, 0x0f, 0x6d, 0x4b, 0xcf, 0xb7, 0x67,
    0xdf, 0x23, 0xcd, 0x0a, 0x89, 0xe7, 0x57, 0x83, 0x96, 0xb4, 0x65, 0x55,
];

/// `LabeledInfo("base_nonce", key_schedule_context, HPKE_SUITE_ID, 12)`.
pub const IV_INFO: [u8; 94] = [
    0x00, 0x0c, 0x48, 0x50, 0x4b, 0x45, 0x2d, 0x76, 0x31, 0x48, 0x50, 0x4b, 0x45, 0x00, 0x10,
    0x00, 0x01, 0x00, 0x02, 0x62, 0x61, 0x73, 0x65, 0x5f, 0x6e, 0x6f, 0x6e, 0x63, 0x65, 0x00,
    0x8f, 0xc3, 0xae, 0xb8, 0x32, 0x49, 0x0a, 0x4b, 0x5a, 0xb3, 0xe4, 0x20, 0x23, 0x28, 0x7d,
    0xb2, 0x9a, 0x1f, 0x4b, 0xc7, 0xc2, 0x22, 0xc0, 0xdf, 0x22, 0x87, 0x27, 0xb7, 0x0a, 0x40,
    0x21, 0x12, 0x68, 0x03, 0x70, 0x4c, 0x9a, 0xd6, 0x90, 0x2c, 0xc1, 0xee, 0x56, 0x89, 0x62,
    0x53, 0x0f, 0x6d, 0x4b, 0xcf, 0xb7, 0x67, 0xdf, 0x23, 0xcd, 0x0a, 0x89, 0xe7, 0x57, 0x83,
    0x96, 0xb4, 0x65, 0x55,
];

/// AES-256-GCM key length.
pub const KEY_LEN: usize = 32;

/// AES-256-GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM tag length.
pub const TAG_LEN: usize = 16;

/// DHKEM(P-256) shared secret length.
const SHARED_SECRET_LEN: usize = 32;
/// `Nsecret` as encoded in the shared-secret `LabeledInfo`.
const SHARED_SECRET_INFO_LEN: u16 = 32;

// ---------------------------------------------------------------------------
// HKDF output length marker
// ---------------------------------------------------------------------------

/// Marker type for `ring::hkdf::Prk::expand`, requesting `N` bytes of output.
struct HkdfLen<const N: usize>;

impl<const N: usize> hkdf::KeyType for HkdfLen<N> {
    fn len(&self) -> usize {
        N
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Output of [`encrypt`]: the encapsulated ephemeral key and the sealed data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HpkeCiphertext {
    /// Ephemeral sender public key, uncompressed.
    pub encapped_public: [u8; UNCOMPRESSED_POINT_LEN],
    /// AES-256-GCM ciphertext with the 16-byte tag appended.
    pub ciphertext: Vec<u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HpkeBuf {
    encapped_public: String,
    ciphertext: String,
}

// ---------------------------------------------------------------------------
// Labeling helpers
// ---------------------------------------------------------------------------

/// `"HPKE-v1" ‖ suite_id ‖ label ‖ ikm`.
#[must_use]
pub fn labeled_ikm(label: &[u8], ikm: &[u8], suite_id: &[u8]) -> Vec<u8> {
    [HPKE_VERSION, suite_id, label, ikm].concat()
}

/// `I2OSP(out_len, 2) ‖ "HPKE-v1" ‖ suite_id ‖ label ‖ info`.
#[must_use]
pub fn labeled_info(label: &[u8], info: &[u8], suite_id: &[u8], out_len: u16) -> Vec<u8> {
    [&out_len.to_be_bytes()[..], HPKE_VERSION, suite_id, label, info].concat()
}

/// `HKDF-Expand(HKDF-Extract(salt, ikm), info, N)`.
fn extract_and_expand<const N: usize>(
    salt: &[u8],
    ikm: &[u8],
    info: &[u8],
) -> Result<SecretBytes<N>, CryptoError> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(ikm);
    let info = [info];
    let okm = prk
        .expand(&info, HkdfLen::<N>)
        .map_err(|_| CryptoError::Encryption("HKDF expand failed".into()))?;
    let mut out = SecretBytes::<N>::zeroed();
    okm.fill(out.expose_mut())
        .map_err(|_| CryptoError::Encryption("HKDF fill failed".into()))?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Key schedule
// ---------------------------------------------------------------------------

struct KeySchedule {
    key: SecretBytes<KEY_LEN>,
    nonce: SecretBytes<NONCE_LEN>,
}

/// Derive the AEAD key and nonce from a raw ECDH x-coordinate.
fn key_schedule(dh: &[u8], kem_context: &[u8]) -> Result<KeySchedule, CryptoError> {
    let mut eae_ikm = labeled_ikm(LABEL_EAE_PRK, dh, KEM_SUITE_ID);
    let shared_info = labeled_info(
        LABEL_SHARED_SECRET,
        kem_context,
        KEM_SUITE_ID,
        SHARED_SECRET_INFO_LEN,
    );
    let shared_secret = extract_and_expand::<SHARED_SECRET_LEN>(&[], &eae_ikm, &shared_info);
    eae_ikm.zeroize();
    let shared_secret = shared_secret?;

    let secret_ikm = labeled_ikm(LABEL_SECRET, &[], HPKE_SUITE_ID);
    let key = extract_and_expand::<KEY_LEN>(shared_secret.expose(), &secret_ikm, &AES_KEY_INFO)?;
    let nonce =
        extract_and_expand::<NONCE_LEN>(shared_secret.expose(), &secret_ikm, &IV_INFO)?;
    Ok(KeySchedule { key, nonce })
}

/// ECDH x-coordinate, returned zeroize-on-drop.
fn dh_x(secret: &SecretKey, public: &PublicKey) -> SecretBytes<32> {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    let mut out = SecretBytes::<32>::zeroed();
    out.expose_mut().copy_from_slice(shared.raw_secret_bytes());
    out
}

fn uncompressed_bytes(key: &PublicKey) -> Result<[u8; UNCOMPRESSED_POINT_LEN], CryptoError> {
    <[u8; UNCOMPRESSED_POINT_LEN]>::try_from(key.to_encoded_point(false).as_bytes())
        .map_err(|_| CryptoError::InvalidPublicKey("point at infinity".into()))
}

fn aead_key(key: &SecretBytes<KEY_LEN>) -> Result<aead::LessSafeKey, CryptoError> {
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key.expose())
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

// ---------------------------------------------------------------------------
// Decrypt / encrypt
// ---------------------------------------------------------------------------

/// Open `ciphertext` (AES-GCM output with the tag appended) that was sealed
/// to the public key of `receiver_private`.
///
/// `encapped_public` may be compressed (33 bytes) or uncompressed (65 bytes);
/// the key schedule always binds its uncompressed form.
///
/// # Errors
///
/// - `CryptoError::InvalidPrivateKey` if `receiver_private` is not a valid scalar
/// - `CryptoError::InvalidPublicKey` if `encapped_public` is not a P-256 point
/// - `CryptoError::MalformedBundle` if `ciphertext` is shorter than the tag
/// - `CryptoError::DecryptionFailed` if authentication fails
pub fn decrypt(
    ciphertext: &[u8],
    encapped_public: &[u8],
    receiver_private: &[u8],
) -> Result<SecretBuffer, CryptoError> {
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::MalformedBundle(format!(
            "ciphertext must be at least {TAG_LEN} bytes, got {}",
            ciphertext.len()
        )));
    }

    let receiver = ec::secret_key_from_bytes(receiver_private)?;
    let receiver_pub = uncompressed_bytes(&receiver.public_key())?;
    let enc = ec::to_uncompressed(encapped_public)?;
    let enc_key = ec::parse_public_key(&enc)?;

    let dh = dh_x(&receiver, &enc_key);
    let kem_context = [&enc[..], &receiver_pub[..]].concat();
    let schedule = key_schedule(dh.expose(), &kem_context)?;

    let key = aead_key(&schedule.key)?;
    let nonce = aead::Nonce::assume_unique_for_key(*schedule.nonce.expose());

    let mut buf = ciphertext.to_vec();
    let result = key
        .open_in_place(nonce, aead::Aad::from(&kem_context), &mut buf)
        .map(|plaintext| SecretBuffer::new(plaintext))
        .map_err(|_| CryptoError::DecryptionFailed);
    buf.zeroize();
    result
}

/// Seal `plaintext` to `receiver_public` (33 or 65 bytes) with a fresh
/// ephemeral sender key.
///
/// # Errors
///
/// - `CryptoError::InvalidPublicKey` if `receiver_public` is not a P-256 point
/// - `CryptoError::Encryption` if the AEAD seal fails
pub fn encrypt(plaintext: &[u8], receiver_public: &[u8]) -> Result<HpkeCiphertext, CryptoError> {
    let sender = SecretKey::random(&mut OsRng);
    encrypt_with_sender(plaintext, receiver_public, &sender)
}

fn encrypt_with_sender(
    plaintext: &[u8],
    receiver_public: &[u8],
    sender: &SecretKey,
) -> Result<HpkeCiphertext, CryptoError> {
    let receiver_pub = ec::to_uncompressed(receiver_public)?;
    let receiver_key = ec::parse_public_key(&receiver_pub)?;
    let sender_pub = uncompressed_bytes(&sender.public_key())?;

    let dh = dh_x(sender, &receiver_key);
    let kem_context = [&sender_pub[..], &receiver_pub[..]].concat();
    let schedule = key_schedule(dh.expose(), &kem_context)?;

    let key = aead_key(&schedule.key)?;
    let nonce = aead::Nonce::assume_unique_for_key(*schedule.nonce.expose());

    let mut in_out = plaintext.to_vec();
    if key
        .seal_in_place_append_tag(nonce, aead::Aad::from(&kem_context), &mut in_out)
        .is_err()
    {
        in_out.zeroize();
        return Err(CryptoError::Encryption("AES-256-GCM encryption failed".into()));
    }

    Ok(HpkeCiphertext {
        encapped_public: sender_pub,
        ciphertext: in_out,
    })
}

/// Render an [`HpkeCiphertext`] as `{"encappedPublic": hex, "ciphertext": hex}`.
///
/// # Errors
///
/// Returns `CryptoError::Encoding` if JSON serialization fails.
pub fn format_hpke_buf(sealed: &HpkeCiphertext) -> Result<String, CryptoError> {
    serde_json::to_string(&HpkeBuf {
        encapped_public: hex_encode(&sealed.encapped_public),
        ciphertext: hex_encode(&sealed.ciphertext),
    })
    .map_err(|e| CryptoError::Encoding(format!("failed to serialize HPKE buffer: {e}")))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
