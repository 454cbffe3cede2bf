//! Verify an enclave proof pair.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use enclave_trust_core::attestation::{verify_with_trust_root, AppProof, BootProof};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Context;

#[derive(Args)]
pub struct VerifyProofArgs {
    /// JSON file holding `{"appProof": …, "bootProof": …}`
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProofPair {
    app_proof: AppProof,
    boot_proof: BootProof,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyProofResponse {
    pub verified: bool,
    pub ephemeral_public_key: String,
    pub timestamp_ms: u64,
    pub production_root: bool,
}

pub fn run(args: VerifyProofArgs, ctx: &Context) -> Result<()> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read proof {}", args.file.display()))?;
    let pair: ProofPair = serde_json::from_str(&text).context("invalid proof JSON")?;
    let root = ctx.config.trust_root()?;

    verify_with_trust_root(&pair.app_proof, &pair.boot_proof, &root)
        .context("proof verification failed")?;
    let response = VerifyProofResponse {
        verified: true,
        ephemeral_public_key: pair.app_proof.public_key.to_ascii_lowercase(),
        timestamp_ms: pair.app_proof.timestamp_ms()?,
        production_root: root.is_production(),
    };
    info!(production_root = response.production_root, "proof pair verified");
    ctx.emit(&response, |r| {
        format!("verified: enclave key {} at {} ms", r.ephemeral_public_key, r.timestamp_ms)
    })
}
