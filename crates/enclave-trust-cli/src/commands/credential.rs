//! Open a credential bundle.

use anyhow::{Context as _, Result};
use clap::Args;
use enclave_trust_core::bundle::{decrypt_credential_bundle, BundleDialect};
use enclave_trust_core::encoding::hex_encode;
use serde::Serialize;
use tracing::info;

use super::{private_key_arg, Context};

#[derive(Args)]
pub struct DecryptCredentialArgs {
    /// Credential bundle, Base58Check or Base64URL
    #[arg(long)]
    pub bundle: String,
    /// Receiver private key, hex
    #[arg(long, env = "ENCLAVE_TRUST_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptCredentialResponse {
    pub dialect: String,
    pub plaintext: String,
}

pub fn run(args: DecryptCredentialArgs, ctx: &Context) -> Result<()> {
    let bundle = args.bundle.trim();
    let dialect = BundleDialect::detect(bundle);
    let private_key = private_key_arg(args.private_key)?;
    let plaintext = decrypt_credential_bundle(bundle, private_key.expose())
        .context("failed to decrypt credential bundle")?;
    info!(?dialect, "credential bundle decrypted");

    let response = DecryptCredentialResponse {
        dialect: format!("{dialect:?}"),
        plaintext: hex_encode(plaintext.expose()),
    };
    ctx.emit(&response, |r| r.plaintext.clone())
}
