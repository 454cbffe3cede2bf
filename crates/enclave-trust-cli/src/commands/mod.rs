//! Subcommand implementations. Each module exposes an `Args` struct and a
//! `run` function returning a serializable response.

pub mod credential;
pub mod export;
pub mod import;
pub mod keygen;
pub mod verify;

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use enclave_trust_core::encoding::hex_decode;
use enclave_trust_core::SecretBuffer;
use serde::Serialize;
use zeroize::Zeroize;

use crate::config::CliConfig;

/// State shared by every subcommand.
pub struct Context {
    pub json_output: bool,
    pub config: CliConfig,
}

impl Context {
    /// Print `response` as JSON, or as `human` text.
    pub fn emit<T: Serialize>(&self, response: &T, human: impl FnOnce(&T) -> String) -> Result<()> {
        if self.json_output {
            println!("{}", serde_json::to_string_pretty(response)?);
        } else {
            println!("{}", human(response));
        }
        Ok(())
    }
}

/// Hex-decode a private key argument and wipe the argument.
pub fn private_key_arg(mut hex: String) -> Result<SecretBuffer> {
    let decoded = hex_decode(hex.trim()).context("private key must be hex");
    hex.zeroize();
    Ok(SecretBuffer::from_vec(decoded?))
}

pub fn read_bundle_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read bundle {}", path.display()))
}
