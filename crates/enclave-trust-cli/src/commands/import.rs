//! Encrypt a private key or wallet mnemonic to an import bundle's target.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use enclave_trust_core::bundle::{
    encrypt_private_key_to_bundle, encrypt_wallet_to_bundle, ImportBundleRequest, KeyFormat,
};
use zeroize::Zeroize;

use super::{read_bundle_file, Context};

#[derive(Args)]
#[command(group(clap::ArgGroup::new("secret").required(true).args(["private_key", "mnemonic"])))]
pub struct EncryptImportArgs {
    /// File holding the signed import envelope
    #[arg(long)]
    pub bundle_file: PathBuf,
    #[arg(long)]
    pub organization_id: String,
    #[arg(long)]
    pub user_id: String,
    /// Private key to import, in `--key-format`
    #[arg(long, env = "ENCLAVE_TRUST_IMPORT_KEY", hide_env_values = true)]
    pub private_key: Option<String>,
    /// Wallet mnemonic to import
    #[arg(long, env = "ENCLAVE_TRUST_IMPORT_MNEMONIC", hide_env_values = true)]
    pub mnemonic: Option<String>,
    /// HEXADECIMAL or SOLANA
    #[arg(long, default_value_t = KeyFormat::Hexadecimal)]
    pub key_format: KeyFormat,
}

pub fn run(mut args: EncryptImportArgs, ctx: &Context) -> Result<()> {
    let bundle = read_bundle_file(&args.bundle_file)?;
    let request = ImportBundleRequest {
        bundle: &bundle,
        organization_id: &args.organization_id,
        user_id: &args.user_id,
        signer_override: ctx.config.signer_override(),
    };

    let sealed = match (&args.private_key, &args.mnemonic) {
        (Some(key), _) => encrypt_private_key_to_bundle(key, args.key_format, &request)
            .context("failed to encrypt private key"),
        (None, Some(mnemonic)) => {
            encrypt_wallet_to_bundle(mnemonic, &request).context("failed to encrypt wallet")
        }
        (None, None) => Err(anyhow::anyhow!("one of --private-key or --mnemonic is required")),
    };
    args.private_key.zeroize();
    args.mnemonic.zeroize();
    let sealed = sealed?;
    tracing::info!("import bundle encrypted");

    // The sealed bundle is already JSON in both output modes.
    let value: serde_json::Value = serde_json::from_str(&sealed)?;
    ctx.emit(&value, |_| sealed.clone())
}
