//! Decrypt an export bundle.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use enclave_trust_core::bundle::{decrypt_export_bundle, ExportBundleRequest, KeyFormat};
use serde::Serialize;
use tracing::info;

use super::{private_key_arg, read_bundle_file, Context};

#[derive(Args)]
pub struct DecryptExportArgs {
    /// File holding the signed export envelope
    #[arg(long)]
    pub bundle_file: PathBuf,
    /// Receiver private key, hex
    #[arg(long, env = "ENCLAVE_TRUST_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
    #[arg(long)]
    pub organization_id: String,
    /// HEXADECIMAL, SOLANA or MNEMONIC
    #[arg(long, default_value_t = KeyFormat::Hexadecimal)]
    pub key_format: KeyFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptExportResponse {
    pub key_format: KeyFormat,
    pub value: String,
}

pub fn run(args: DecryptExportArgs, ctx: &Context) -> Result<()> {
    let bundle = read_bundle_file(&args.bundle_file)?;
    let private_key = private_key_arg(args.private_key)?;

    let exported = decrypt_export_bundle(&ExportBundleRequest {
        bundle: &bundle,
        receiver_private: private_key.expose(),
        organization_id: &args.organization_id,
        key_format: args.key_format,
        signer_override: ctx.config.signer_override(),
    })
    .context("failed to decrypt export bundle")?;
    info!(format = %exported.format(), "export bundle decrypted");

    let response = DecryptExportResponse {
        key_format: exported.format(),
        value: exported.expose().to_owned(),
    };
    ctx.emit(&response, |r| r.value.clone())
}
