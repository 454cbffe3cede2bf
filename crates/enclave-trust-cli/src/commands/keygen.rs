//! Generate a P-256 key pair to receive bundles with.

use anyhow::Result;
use clap::Args;
use enclave_trust_core::generate_p256_key_pair;
use serde::Serialize;
use tracing::info;

use super::Context;

#[derive(Args)]
pub struct KeygenArgs {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeygenResponse {
    pub public_key: String,
    pub public_key_uncompressed: String,
    pub private_key: String,
}

pub fn run(_args: KeygenArgs, ctx: &Context) -> Result<()> {
    let pair = generate_p256_key_pair()?;
    let response = KeygenResponse {
        public_key: pair.public_key_hex(),
        public_key_uncompressed: pair.public_key_uncompressed_hex(),
        private_key: pair.expose_private_key_hex(),
    };
    info!(public_key = %response.public_key, "generated key pair");
    ctx.emit(&response, |r| {
        format!(
            "public key:  {}\nprivate key: {}",
            r.public_key, r.private_key
        )
    })
}
