//! Optional operator configuration.
//!
//! A JSON file, camelCase keys, every field optional:
//!
//! ```json
//! {
//!   "signerPublicKeyOverride": "04…",
//!   "trustRoot": { "pemPath": "staging-root.pem", "sha256": "…" }
//! }
//! ```
//!
//! No file means production defaults. Relative `pemPath` values resolve
//! against the config file's directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use enclave_trust_core::attestation::TrustRoot;
use serde::Deserialize;
use tracing::warn;

/// Replacement for the pinned Nitro root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TrustRootConfig {
    pub pem_path: Option<PathBuf>,
    pub sha256: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CliConfig {
    /// Accept envelopes from this signer instead of the production key.
    pub signer_public_key_override: Option<String>,
    pub trust_root: Option<TrustRootConfig>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Load `path`, or return defaults when no path was given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);

        if let Some(signer) = &config.signer_public_key_override {
            warn!(signer = %signer, "config overrides the production enclave signer");
        }
        if config.trust_root.is_some() {
            warn!("config overrides the AWS Nitro trust root");
        }
        Ok(config)
    }

    pub fn signer_override(&self) -> Option<&str> {
        self.signer_public_key_override.as_deref()
    }

    /// The root to verify attestation chains against.
    pub fn trust_root(&self) -> Result<TrustRoot> {
        let Some(root) = &self.trust_root else {
            return Ok(TrustRoot::aws_nitro());
        };
        let (Some(pem_path), Some(sha256)) = (&root.pem_path, &root.sha256) else {
            bail!("trustRoot needs both pemPath and sha256");
        };
        let pem_path = match &self.base_dir {
            Some(dir) if pem_path.is_relative() => dir.join(pem_path),
            _ => pem_path.clone(),
        };
        let pem = fs::read_to_string(&pem_path)
            .with_context(|| format!("failed to read trust root {}", pem_path.display()))?;
        Ok(TrustRoot::custom(pem, sha256.clone()))
    }
}
