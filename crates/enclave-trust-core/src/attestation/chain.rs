//! Phase B.3: certificate chain from the attestation leaf to the pinned root.
//!
//! This module provides:
//! - [`TrustRoot`]: pinned root PEM plus its expected SHA-256 fingerprint
//! - [`verify_certificate_chain`]: self-check of the pin, path building,
//!   then a signature walk from leaf to root

use crate::encoding::hex_encode;
use crate::error::VerificationError;
use ring::digest::{digest, SHA256};
use ring::signature::{
    UnparsedPublicKey, VerificationAlgorithm, ECDSA_P256_SHA256_ASN1, ECDSA_P256_SHA384_ASN1,
    ECDSA_P384_SHA256_ASN1, ECDSA_P384_SHA384_ASN1,
};
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, warn};
use x509_cert::der::asn1::ObjectIdentifier;
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// AWS Nitro Enclaves root certificate (`aws.nitro-enclaves`, P-384, valid
/// 2019-10-28 to 2049-10-28).
pub const AWS_ROOT_CERT_PEM: &str = "-----BEGIN CERTIFICATE-----
MIICETCCAZagAwIBAgIRAPkxdWgbkK/hHUbMtOTn+FYwCgYIKoZIzj0EAwMwSTEL
MAkGA1UEBhMCVVMxDzANBgNVBAoMBkFtYXpvbjEMMAoGA1UECwwDQVdTMRswGQYD
VQQDDBJhd3Mubml0cm8tZW5jbGF2ZXMwHhcNMTkxMDI4MTMyODA1WhcNNDkxMDI4
MTQyODA1WjBJMQswCQYDVQQGEwJVUzEPMA0GA1UECgwGQW1hem9uMQwwCgYDVQQL
DANBV1MxGzAZBgNVBAMMEmF3cy5uaXRyby1lbmNsYXZlczB2MBAGByqGSM49AgEG
BSuBBAAiA2IABPwCVOumCMHzaHDimtqQvkY4MpJzbolL//Zy2YlES1BR5TSksfbb
48C8WBoyt7F2Bw7eEtaaP+ohG2bnUs990d0JX28TcPQXCEPZ3BABIeTPYwEoCWZE
h8l5YoQwTcU/9KNCMEAwDwYDVR0TAQH/BAUwAwEB/zAdBgNVHQ4EFgQUkCW1DdkF
R+eWw5b6cp3PmanfS5YwDgYDVR0PAQH/BAQDAgGGMAoGCCqGSM49BAMDA2kAMGYC
MQCjfy+Rocm9Xue4YnwWmNJVA44fA0P5W2OpYow9OYCVRaEevL8uO1XYru5xtMPW
rfMCMQCi85sWBbJwKKXdS6BptQFuZbT73o/gBh1qUxl/nNr12UO8Yfwr6wPLb+6N
IwLz3/Y=
-----END CERTIFICATE-----
";

/// SHA-256 of the DER certificate inside [`AWS_ROOT_CERT_PEM`], as published
/// by AWS.
pub const AWS_ROOT_CERT_SHA256: &str =
    "641a0321a3e244efe456463195d606317ed7cdcc3c1756e09893f3c68f79bb5b";

const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

// ---------------------------------------------------------------------------
// Trust root
// ---------------------------------------------------------------------------

/// A pinned root certificate and the fingerprint it must hash to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustRoot {
    pem: Cow<'static, str>,
    sha256_hex: Cow<'static, str>,
}

impl TrustRoot {
    /// The production AWS Nitro Enclaves root.
    #[must_use]
    pub const fn aws_nitro() -> Self {
        Self {
            pem: Cow::Borrowed(AWS_ROOT_CERT_PEM),
            sha256_hex: Cow::Borrowed(AWS_ROOT_CERT_SHA256),
        }
    }

    /// A caller-supplied root, for staging enclaves and tests.
    #[must_use]
    pub fn custom(pem: impl Into<String>, sha256_hex: impl Into<String>) -> Self {
        Self {
            pem: Cow::Owned(pem.into()),
            sha256_hex: Cow::Owned(sha256_hex.into()),
        }
    }

    /// `true` for [`TrustRoot::aws_nitro`].
    #[must_use]
    pub fn is_production(&self) -> bool {
        self.pem == AWS_ROOT_CERT_PEM && self.sha256_hex == AWS_ROOT_CERT_SHA256
    }

    /// The pinned PEM.
    #[must_use]
    pub fn pem(&self) -> &str {
        &self.pem
    }

    /// Re-hash the pinned PEM and parse it.
    ///
    /// # Errors
    ///
    /// - `RootFingerprintTampered` if the PEM does not decode or its DER does
    ///   not hash to the pinned fingerprint
    /// - `RootCertificateInvalid` if the DER is not an X.509 certificate
    pub fn certificate(&self) -> Result<(Certificate, Vec<u8>), VerificationError> {
        let tampered = |actual: String| VerificationError::RootFingerprintTampered {
            expected: self.sha256_hex.to_string(),
            actual,
        };
        let parsed = pem::parse(self.pem.as_bytes()).map_err(|_| tampered(String::new()))?;
        let der = parsed.contents().to_vec();
        let actual = hex_encode(digest(&SHA256, &der).as_ref());
        if !actual.eq_ignore_ascii_case(&self.sha256_hex) {
            return Err(tampered(actual));
        }
        let cert = Certificate::from_der(&der).map_err(|e| {
            VerificationError::RootCertificateInvalid(format!("pinned root does not parse: {e}"))
        })?;
        Ok((cert, der))
    }
}

impl Default for TrustRoot {
    fn default() -> Self {
        Self::aws_nitro()
    }
}

// ---------------------------------------------------------------------------
// Certificate helpers
// ---------------------------------------------------------------------------

/// Parse a DER certificate, naming `what` in the error.
///
/// # Errors
///
/// Returns `MalformedAttestationDocument` if the bytes are not a certificate.
pub fn parse_certificate(der: &[u8], what: &str) -> Result<Certificate, VerificationError> {
    Certificate::from_der(der).map_err(|e| {
        VerificationError::MalformedAttestationDocument(format!("{what} certificate: {e}"))
    })
}

fn subject_name(cert: &Certificate) -> String {
    cert.tbs_certificate.subject.to_string()
}

fn name_der(name: &x509_cert::name::Name) -> Vec<u8> {
    name.to_der().unwrap_or_default()
}

fn issued_by(cert: &Certificate, issuer: &Certificate) -> bool {
    let wanted = name_der(&cert.tbs_certificate.issuer);
    !wanted.is_empty() && wanted == name_der(&issuer.tbs_certificate.subject)
}

/// Pick the ring verifier for the signature algorithm of `cert` and the
/// curve of `issuer`'s key.
fn verification_algorithm(
    cert: &Certificate,
    issuer: &Certificate,
) -> Option<&'static dyn VerificationAlgorithm> {
    let curve = issuer
        .tbs_certificate
        .subject_public_key_info
        .algorithm
        .parameters
        .as_ref()
        .and_then(|params| params.decode_as::<ObjectIdentifier>().ok())?;
    let sig_alg = cert.signature_algorithm.oid;
    let sha384 = if sig_alg == ECDSA_WITH_SHA384 {
        true
    } else if sig_alg == ECDSA_WITH_SHA256 {
        false
    } else {
        return None;
    };
    if curve == SECP384R1 {
        Some(if sha384 { &ECDSA_P384_SHA384_ASN1 } else { &ECDSA_P384_SHA256_ASN1 })
    } else if curve == SECP256R1 {
        Some(if sha384 { &ECDSA_P256_SHA384_ASN1 } else { &ECDSA_P256_SHA256_ASN1 })
    } else {
        None
    }
}

/// Verify the signature on `cert` with `issuer`'s public key. Validity
/// dates are not consulted.
fn verify_signed_by(cert: &Certificate, issuer: &Certificate) -> Result<(), VerificationError> {
    let failure = || VerificationError::ChainSignatureInvalid {
        subject: subject_name(cert),
        issuer: subject_name(issuer),
    };
    let algorithm = verification_algorithm(cert, issuer).ok_or_else(failure)?;
    let tbs = cert.tbs_certificate.to_der().map_err(|_| failure())?;
    let signature = cert.signature.as_bytes().ok_or_else(failure)?;
    let key = issuer
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .raw_bytes();
    UnparsedPublicKey::new(algorithm, key)
        .verify(&tbs, signature)
        .map_err(|_| failure())
}

/// Index of the unused candidate that issued `cert`. Among candidates whose
/// subject matches the issuer name, one whose key verifies the signature
/// wins; otherwise the first name match is returned so the walk fails on
/// the signature check.
fn next_issuer(cert: &Certificate, candidates: &[Certificate], used: &[bool]) -> Option<usize> {
    let named: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(index, candidate)| !used[*index] && issued_by(cert, candidate))
        .map(|(index, _)| index)
        .collect();
    named
        .iter()
        .copied()
        .find(|&index| verify_signed_by(cert, &candidates[index]).is_ok())
        .or_else(|| named.first().copied())
}

fn check_validity_at(cert: &Certificate, timestamp_ms: u64) -> Result<(), VerificationError> {
    let at = Duration::from_millis(timestamp_ms);
    let validity = &cert.tbs_certificate.validity;
    let not_before = validity.not_before.to_unix_duration();
    let not_after = validity.not_after.to_unix_duration();
    if at < not_before || at > not_after {
        return Err(VerificationError::RootCertificateInvalid(format!(
            "not valid at {timestamp_ms} ms (valid {}..={} s)",
            not_before.as_secs(),
            not_after.as_secs()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Chain verification
// ---------------------------------------------------------------------------

/// Build and verify the path `leaf → cabundle[1..] → pinned root`.
///
/// `cabundle[0]` is the document's own copy of the root and is discarded in
/// favour of `root`. The path must use every remaining bundle entry, so its
/// length is `len(cabundle) - 1 + 2`. Returns the path, leaf first.
///
/// # Errors
///
/// - `RootFingerprintTampered` / `RootCertificateInvalid` from
///   [`TrustRoot::certificate`], before any path building
/// - `MalformedAttestationDocument` for an empty or unparsable bundle
/// - `ChainIncomplete` if some certificate has no issuer among the candidates
/// - `ChainLengthMismatch` if bundle entries were left unused
/// - `ChainSignatureInvalid` naming the first certificate whose signature fails
/// - `RootCertificateInvalid` if the root is not valid at `timestamp_ms`
pub fn verify_certificate_chain(
    leaf_der: &[u8],
    cabundle: &[Vec<u8>],
    root: &TrustRoot,
    timestamp_ms: u64,
) -> Result<Vec<Certificate>, VerificationError> {
    if !root.is_production() {
        warn!("verifying attestation chain against a caller-supplied trust root");
    }
    let (root_cert, _) = root.certificate()?;

    let Some((_, intermediates)) = cabundle.split_first() else {
        return Err(VerificationError::MalformedAttestationDocument(
            "cabundle is empty".into(),
        ));
    };
    let mut candidates = intermediates
        .iter()
        .map(|der| parse_certificate(der, "cabundle"))
        .collect::<Result<Vec<_>, _>>()?;
    candidates.push(root_cert);
    let root_index = candidates.len().saturating_sub(1);

    let leaf = parse_certificate(leaf_der, "leaf")?;
    let mut used = vec![false; candidates.len()];
    let mut path_indices: Vec<usize> = Vec::with_capacity(candidates.len());
    let mut reached_root = false;

    while !reached_root {
        let current = path_indices
            .last()
            .map_or(&leaf, |&index| &candidates[index]);
        let next = next_issuer(current, &candidates, &used).ok_or_else(|| {
            VerificationError::ChainIncomplete {
                subject: subject_name(current),
            }
        })?;
        used[next] = true;
        path_indices.push(next);
        reached_root = next == root_index;
    }

    let mut path = Vec::with_capacity(path_indices.len().saturating_add(1));
    path.push(leaf);
    let mut taken: Vec<Option<Certificate>> = candidates.into_iter().map(Some).collect();
    for index in path_indices {
        if let Some(cert) = taken.get_mut(index).and_then(Option::take) {
            path.push(cert);
        }
    }

    let expected = cabundle.len().saturating_add(1);
    if path.len() != expected {
        return Err(VerificationError::ChainLengthMismatch {
            expected,
            actual: path.len(),
        });
    }
    debug!(length = path.len(), "certificate path built");

    // Attestation certificates live for hours, while a boot proof can be
    // checked long after. Enclave code is immutable, so a correctly signed
    // but expired leaf or intermediate still attests to the same software.
    // Only signatures are checked below the root; do not add expiry checks.
    for pair in path.windows(2) {
        verify_signed_by(&pair[0], &pair[1])?;
    }

    if let Some(root_cert) = path.last() {
        verify_signed_by(root_cert, root_cert).map_err(|_| {
            VerificationError::RootCertificateInvalid("root is not self-signed".into())
        })?;
        check_validity_at(root_cert, timestamp_ms)?;
    }
    debug!("certificate chain verified");
    Ok(path)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
