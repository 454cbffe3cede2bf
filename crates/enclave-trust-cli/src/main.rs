//! `enclave-trust`: operator CLI over enclave-trust-core.
//!
//! Logs go to stderr (filter from `ENCLAVE_TRUST_LOG`); results go to
//! stdout, as JSON with `--json`.

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

const LOG_ENV: &str = "ENCLAVE_TRUST_LOG";
const DEFAULT_FILTER: &str = "enclave_trust_core=warn,enclave_trust_cli=info";
const VERBOSE_FILTER: &str = "enclave_trust_core=debug,enclave_trust_cli=debug";

#[derive(Parser)]
#[command(name = "enclave-trust")]
#[command(about = "Decrypt enclave bundles and verify enclave attestation proofs")]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging for every component
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON config with signer and trust root overrides
    #[arg(long, global = true, env = "ENCLAVE_TRUST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a P-256 receiver key pair
    Keygen(commands::keygen::KeygenArgs),
    /// Decrypt a credential bundle
    DecryptCredential(commands::credential::DecryptCredentialArgs),
    /// Verify and decrypt a signed export bundle
    DecryptExport(commands::export::DecryptExportArgs),
    /// Encrypt a key or mnemonic to a signed import bundle's target
    EncryptImport(commands::import::EncryptImportArgs),
    /// Verify an app proof and boot proof pair
    VerifyProof(commands::verify::VerifyProofArgs),
}

fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let ctx = commands::Context {
        json_output: cli.json,
        config: config::CliConfig::load(cli.config.as_deref())?,
    };

    match cli.command {
        Commands::Keygen(args) => commands::keygen::run(args, &ctx),
        Commands::DecryptCredential(args) => commands::credential::run(args, &ctx),
        Commands::DecryptExport(args) => commands::export::run(args, &ctx),
        Commands::EncryptImport(args) => commands::import::run(args, &ctx),
        Commands::VerifyProof(args) => commands::verify::run(args, &ctx),
    }
}
