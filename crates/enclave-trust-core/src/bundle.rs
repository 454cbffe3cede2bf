//! Bundle codec: the wire formats enclaves use to hand encrypted material to
//! a client, and the import format a client uses to hand it back.
//!
//! This module provides:
//! - credential bundles: `compressed sender key (33) ‖ ciphertext ‖ tag` as a
//!   Base58Check or Base64URL string ([`decode_credential_bundle`],
//!   [`encode_credential_bundle`], [`decrypt_credential_bundle`],
//!   [`encrypt_credential_bundle`])
//! - signed envelopes: `{version?, data, dataSignature, enclaveQuorumPublic}`
//!   whose hex `data` carries the inner JSON ([`SignedEnvelope`],
//!   [`VerifiedEnvelope`])
//! - the export flow ([`decrypt_export_bundle`]) and the import flow
//!   ([`encrypt_private_key_to_bundle`], [`encrypt_wallet_to_bundle`])
//!
//! No inner envelope field is read before the envelope signature verifies.

use crate::ec::{self, COMPRESSED_POINT_LEN};
use crate::encoding::{
    base58_decode, base58_encode, base58check_decode, base58check_encode, base64url_decode,
    hex_decode, hex_encode,
};
use crate::error::CryptoError;
use crate::hpke;
use crate::memory::SecretBuffer;
use crate::signature::verify_enclave_signature;
use ring::signature::{Ed25519KeyPair, KeyPair};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use zeroize::Zeroize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// The only envelope version this crate understands.
pub const ENVELOPE_VERSION: &str = "v1.0.0";

/// Characters that never occur in Base58 but may occur in Base64URL.
const BASE64URL_MARKERS: &[char] = &['-', '_', 'O', 'I', 'l', '0'];

/// Ed25519 seed length (Solana private key without its public half).
const ED25519_SEED_LEN: usize = 32;

/// Solana `seed ‖ public` keypair length.
const SOLANA_KEYPAIR_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Credential bundles
// ---------------------------------------------------------------------------

/// String dialect of a credential bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleDialect {
    /// Bitcoin-alphabet Base58 with a 4-byte double-SHA-256 checksum.
    Base58Check,
    /// URL-safe Base64 without padding.
    Base64Url,
}

impl BundleDialect {
    /// Select the dialect: Base64URL if the string contains any of `-_OIl0`,
    /// Base58Check otherwise.
    #[must_use]
    pub fn detect(bundle: &str) -> Self {
        if bundle.contains(BASE64URL_MARKERS) {
            Self::Base64Url
        } else {
            Self::Base58Check
        }
    }
}

/// A decoded credential bundle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedBundle {
    /// Compressed ephemeral sender key.
    pub encapped_public: [u8; COMPRESSED_POINT_LEN],
    /// AES-256-GCM ciphertext with the tag appended.
    pub ciphertext: Vec<u8>,
}

impl EncryptedBundle {
    /// Parse `encapped_public ‖ ciphertext`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MalformedBundle` if `bytes` is 33 bytes or shorter.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() <= COMPRESSED_POINT_LEN {
            return Err(CryptoError::MalformedBundle(format!(
                "bundle must be longer than {COMPRESSED_POINT_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let (key, ciphertext) = bytes.split_at(COMPRESSED_POINT_LEN);
        let mut encapped_public = [0u8; COMPRESSED_POINT_LEN];
        encapped_public.copy_from_slice(key);
        Ok(Self {
            encapped_public,
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Serialize to `encapped_public ‖ ciphertext`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        [&self.encapped_public[..], self.ciphertext.as_slice()].concat()
    }
}

/// Decode a credential bundle string in either dialect.
///
/// # Errors
///
/// - `CryptoError::Encoding` if the string is not valid in the detected dialect
/// - `CryptoError::MalformedBundle` if the decoded bytes are too short
pub fn decode_credential_bundle(bundle: &str) -> Result<EncryptedBundle, CryptoError> {
    let dialect = BundleDialect::detect(bundle);
    debug!(?dialect, "decoding credential bundle");
    let bytes = match dialect {
        BundleDialect::Base58Check => base58check_decode(bundle)?,
        BundleDialect::Base64Url => base64url_decode(bundle)?,
    };
    EncryptedBundle::from_bytes(&bytes)
}

/// Encode a credential bundle. Output is always Base58Check.
#[must_use]
pub fn encode_credential_bundle(bundle: &EncryptedBundle) -> String {
    base58check_encode(&bundle.to_bytes())
}

/// Decode and open a credential bundle with the receiver's private scalar.
///
/// # Errors
///
/// Decoding errors from [`decode_credential_bundle`], `InvalidPublicKey` if
/// the sender key does not decompress, `DecryptionFailed` on a bad tag.
pub fn decrypt_credential_bundle(
    bundle: &str,
    receiver_private: &[u8],
) -> Result<SecretBuffer, CryptoError> {
    let decoded = decode_credential_bundle(bundle)?;
    let encapped = ec::uncompress_public_key(&decoded.encapped_public)?;
    hpke::decrypt(&decoded.ciphertext, &encapped, receiver_private)
}

/// Seal `plaintext` to `receiver_public` and encode it as a credential bundle.
///
/// # Errors
///
/// `InvalidPublicKey` or `Encryption` from [`hpke::encrypt`].
pub fn encrypt_credential_bundle(
    plaintext: &[u8],
    receiver_public: &[u8],
) -> Result<String, CryptoError> {
    let sealed = hpke::encrypt(plaintext, receiver_public)?;
    let encapped_public = ec::compress_public_key(&sealed.encapped_public)?;
    Ok(encode_credential_bundle(&EncryptedBundle {
        encapped_public,
        ciphertext: sealed.ciphertext,
    }))
}

// ---------------------------------------------------------------------------
// Signed envelopes
// ---------------------------------------------------------------------------

/// Outer signed envelope as delivered by the enclave.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedEnvelope {
    /// Envelope format version; must be `v1.0.0` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Hex-encoded UTF-8 JSON payload. The signature covers the decoded bytes.
    pub data: String,
    /// ASN.1 DER ECDSA signature, hex.
    pub data_signature: String,
    /// Signer public key, uncompressed hex.
    pub enclave_quorum_public: String,
}

/// Inner payload of a [`SignedEnvelope`], available only after verification.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedEnvelope {
    /// Organization the envelope was issued for.
    pub organization_id: String,
    /// User the envelope was issued for (import bundles).
    #[serde(default)]
    pub user_id: Option<String>,
    /// Ephemeral sender key, hex (export bundles).
    #[serde(default)]
    pub encapped_public: Option<String>,
    /// Ciphertext with tag, hex (export bundles).
    #[serde(default)]
    pub ciphertext: Option<String>,
    /// Key the client must encrypt to, hex (import bundles).
    #[serde(default)]
    pub target_public: Option<String>,
}

impl SignedEnvelope {
    /// Parse the outer envelope JSON.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::MalformedBundle` if the JSON does not have the
    /// envelope shape.
    pub fn parse(json: &str) -> Result<Self, CryptoError> {
        serde_json::from_str(json)
            .map_err(|e| CryptoError::MalformedBundle(format!("invalid envelope JSON: {e}")))
    }

    /// Check the signer and signature, then decode the inner payload.
    ///
    /// # Errors
    ///
    /// - `CryptoError::UnsupportedVersion` for a version other than `v1.0.0`
    /// - `CryptoError::SignerPinningFailed` / `SignatureInvalid` from
    ///   [`verify_enclave_signature`]
    /// - `CryptoError::MalformedBundle` if the signed payload is not the
    ///   expected JSON
    pub fn verify(&self, signer_override: Option<&str>) -> Result<VerifiedEnvelope, CryptoError> {
        if let Some(version) = &self.version {
            if version != ENVELOPE_VERSION {
                return Err(CryptoError::UnsupportedVersion(version.clone()));
            }
        }
        let signed = hex_decode(&self.data)?;
        verify_enclave_signature(
            &self.enclave_quorum_public,
            &self.data_signature,
            &signed,
            signer_override,
        )?;
        serde_json::from_slice(&signed)
            .map_err(|e| CryptoError::MalformedBundle(format!("invalid envelope payload: {e}")))
    }
}

impl VerifiedEnvelope {
    /// # Errors
    ///
    /// Returns `CryptoError::OrganizationMismatch` if the envelope was issued
    /// for another organization.
    pub fn check_organization(&self, expected: &str) -> Result<(), CryptoError> {
        if self.organization_id == expected {
            Ok(())
        } else {
            Err(CryptoError::OrganizationMismatch {
                expected: expected.to_owned(),
                actual: self.organization_id.clone(),
            })
        }
    }

    /// # Errors
    ///
    /// Returns `CryptoError::UserMismatch` if the envelope names another user
    /// or none at all.
    pub fn check_user(&self, expected: &str) -> Result<(), CryptoError> {
        match self.user_id.as_deref() {
            Some(actual) if actual == expected => Ok(()),
            other => Err(CryptoError::UserMismatch {
                expected: expected.to_owned(),
                actual: other.unwrap_or_default().to_owned(),
            }),
        }
    }

    /// Decoded `encappedPublic`.
    ///
    /// # Errors
    ///
    /// `MalformedBundle` if absent, `Encoding` if not hex.
    pub fn encapped_public(&self) -> Result<Vec<u8>, CryptoError> {
        required_hex(self.encapped_public.as_deref(), "encappedPublic")
    }

    /// Decoded `ciphertext`.
    ///
    /// # Errors
    ///
    /// `MalformedBundle` if absent, `Encoding` if not hex.
    pub fn ciphertext(&self) -> Result<Vec<u8>, CryptoError> {
        required_hex(self.ciphertext.as_deref(), "ciphertext")
    }

    /// Decoded `targetPublic`.
    ///
    /// # Errors
    ///
    /// `MalformedBundle` if absent, `Encoding` if not hex.
    pub fn target_public(&self) -> Result<Vec<u8>, CryptoError> {
        required_hex(self.target_public.as_deref(), "targetPublic")
    }
}

fn required_hex(value: Option<&str>, field: &str) -> Result<Vec<u8>, CryptoError> {
    let value = value.ok_or_else(|| {
        CryptoError::MalformedBundle(format!("envelope payload is missing `{field}`"))
    })?;
    hex_decode(value)
}

// ---------------------------------------------------------------------------
// Key formats
// ---------------------------------------------------------------------------

/// How exported key material is presented, and how imported key material
/// is supplied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyFormat {
    /// Raw key bytes as lowercase hex.
    #[default]
    Hexadecimal,
    /// Base58 of the 64-byte `seed ‖ ed25519_public` keypair.
    Solana,
    /// UTF-8 wallet mnemonic.
    Mnemonic,
}

impl FromStr for KeyFormat {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HEXADECIMAL" | "HEX" => Ok(Self::Hexadecimal),
            "SOLANA" => Ok(Self::Solana),
            "MNEMONIC" => Ok(Self::Mnemonic),
            _ => Err(CryptoError::KeyFormat(format!("unknown key format `{s}`"))),
        }
    }
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hexadecimal => "HEXADECIMAL",
            Self::Solana => "SOLANA",
            Self::Mnemonic => "MNEMONIC",
        })
    }
}

// ---------------------------------------------------------------------------
// Export flow
// ---------------------------------------------------------------------------

/// Inputs to [`decrypt_export_bundle`].
pub struct ExportBundleRequest<'a> {
    /// Signed envelope JSON.
    pub bundle: &'a str,
    /// Private scalar of the key the export was encrypted to.
    pub receiver_private: &'a [u8],
    /// Organization the caller expects the export to belong to.
    pub organization_id: &'a str,
    /// Presentation of the decrypted key.
    pub key_format: KeyFormat,
    /// Replacement for the production signer key (staging/tests only).
    pub signer_override: Option<&'a str>,
}

/// A decrypted, formatted export. Zeroized on drop, masked in `Debug`.
pub struct ExportedSecret {
    format: KeyFormat,
    value: SecretString,
}

impl ExportedSecret {
    /// Format the secret was rendered in.
    #[must_use]
    pub const fn format(&self) -> KeyFormat {
        self.format
    }

    /// The formatted secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }
}

impl fmt::Debug for ExportedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExportedSecret({}, ***)", self.format)
    }
}

/// Verify, decrypt and format an export bundle.
///
/// # Errors
///
/// Envelope errors from [`SignedEnvelope::verify`], `OrganizationMismatch`,
/// HPKE errors from [`hpke::decrypt`], and `KeyFormat` if the plaintext does
/// not fit the requested format.
pub fn decrypt_export_bundle(request: &ExportBundleRequest<'_>) -> Result<ExportedSecret, CryptoError> {
    let envelope = SignedEnvelope::parse(request.bundle)?.verify(request.signer_override)?;
    envelope.check_organization(request.organization_id)?;

    let plaintext = hpke::decrypt(
        &envelope.ciphertext()?,
        &envelope.encapped_public()?,
        request.receiver_private,
    )?;
    debug!(format = %request.key_format, "export bundle decrypted");

    let value = match request.key_format {
        KeyFormat::Hexadecimal => hex_encode(plaintext.expose()),
        KeyFormat::Solana => solana_keypair_string(plaintext.expose())?,
        KeyFormat::Mnemonic => String::from_utf8(plaintext.expose().to_vec())
            .map_err(|_| CryptoError::KeyFormat("mnemonic is not valid UTF-8".into()))?,
    };

    Ok(ExportedSecret {
        format: request.key_format,
        value: SecretString::from(value),
    })
}

/// Base58 of `seed ‖ ed25519_public(seed)`.
fn solana_keypair_string(seed: &[u8]) -> Result<String, CryptoError> {
    if seed.len() != ED25519_SEED_LEN {
        return Err(CryptoError::KeyFormat(format!(
            "Solana private key must be {ED25519_SEED_LEN} bytes, got {}",
            seed.len()
        )));
    }
    let pair = Ed25519KeyPair::from_seed_unchecked(seed)
        .map_err(|e| CryptoError::KeyFormat(format!("invalid Ed25519 seed: {e}")))?;
    let mut keypair = [seed, pair.public_key().as_ref()].concat();
    let encoded = base58_encode(&keypair);
    keypair.zeroize();
    Ok(encoded)
}

// ---------------------------------------------------------------------------
// Import flow
// ---------------------------------------------------------------------------

/// Inputs shared by [`encrypt_private_key_to_bundle`] and
/// [`encrypt_wallet_to_bundle`].
pub struct ImportBundleRequest<'a> {
    /// Signed import envelope JSON carrying `targetPublic`.
    pub bundle: &'a str,
    /// Organization the caller expects.
    pub organization_id: &'a str,
    /// User the caller expects.
    pub user_id: &'a str,
    /// Replacement for the production signer key (staging/tests only).
    pub signer_override: Option<&'a str>,
}

/// Encrypt a private key to the target named by a signed import envelope.
///
/// Hexadecimal keys are hex-decoded. Solana keys are Base58-decoded and
/// only the 32-byte seed is encrypted. Returns the
/// `{"encappedPublic", "ciphertext"}` JSON.
///
/// # Errors
///
/// Envelope errors, `OrganizationMismatch`, `UserMismatch`, `KeyFormat` if
/// the key does not decode in `key_format`, and HPKE errors.
pub fn encrypt_private_key_to_bundle(
    private_key: &str,
    key_format: KeyFormat,
    request: &ImportBundleRequest<'_>,
) -> Result<String, CryptoError> {
    let key = SecretBuffer::from_vec(match key_format {
        KeyFormat::Hexadecimal => hex_decode(private_key.trim())
            .map_err(|e| CryptoError::KeyFormat(format!("hexadecimal private key: {e}")))?,
        KeyFormat::Solana => solana_seed(private_key.trim())?,
        KeyFormat::Mnemonic => {
            return Err(CryptoError::KeyFormat(
                "mnemonics are imported as wallets, not private keys".into(),
            ))
        }
    });
    seal_to_import_target(key.expose(), request)
}

/// Encrypt a wallet mnemonic to the target named by a signed import envelope.
///
/// # Errors
///
/// Same as [`encrypt_private_key_to_bundle`], minus key decoding.
pub fn encrypt_wallet_to_bundle(
    mnemonic: &str,
    request: &ImportBundleRequest<'_>,
) -> Result<String, CryptoError> {
    seal_to_import_target(mnemonic.trim().as_bytes(), request)
}

fn seal_to_import_target(
    plaintext: &[u8],
    request: &ImportBundleRequest<'_>,
) -> Result<String, CryptoError> {
    let envelope = SignedEnvelope::parse(request.bundle)?.verify(request.signer_override)?;
    envelope.check_organization(request.organization_id)?;
    envelope.check_user(request.user_id)?;

    let sealed = hpke::encrypt(plaintext, &envelope.target_public()?)?;
    debug!("import bundle sealed");
    hpke::format_hpke_buf(&sealed)
}

fn solana_seed(encoded: &str) -> Result<Vec<u8>, CryptoError> {
    let mut decoded = base58_decode(encoded)
        .map_err(|e| CryptoError::KeyFormat(format!("Solana private key: {e}")))?;
    if decoded.len() != SOLANA_KEYPAIR_LEN && decoded.len() != ED25519_SEED_LEN {
        let len = decoded.len();
        decoded.zeroize();
        return Err(CryptoError::KeyFormat(format!(
            "Solana private key must be {ED25519_SEED_LEN} or {SOLANA_KEYPAIR_LEN} bytes, got {len}"
        )));
    }
    let seed = decoded[..ED25519_SEED_LEN].to_vec();
    decoded.zeroize();
    Ok(seed)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
