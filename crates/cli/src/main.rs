//! # Pluto CLI
//!
//! Operator tooling for the Pluto services:
//! - generate bearer (`AUTH_SIGNING_KEY`) and detached (`MANIFEST_SIGNING_KEY`) keys
//! - verify a manifest read response offline against the published key

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use base64::Engine;
use clap::{Parser, Subcommand};
use pluto_core::{build_canonical_payload, PayloadInput};
use pluto_crypto::{
    b64, generate_bearer_pem, generate_detached_key, verify_detached, BearerAlgorithm,
    BearerKeyMaterial, DetachedSigner,
};
use pluto_types::ManifestView;

#[derive(Parser, Debug)]
#[command(name = "pluto-cli", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate signing key material
    Keygen {
        #[command(subcommand)]
        kind: KeyKind,
    },

    /// Check a manifest's detached signature without contacting the service
    Verify {
        /// JSON file holding a `GET /manifests/{id}` response
        #[arg(long)]
        manifest: PathBuf,

        /// Base64 Ed25519 public key from `GET /public-key`
        #[arg(long)]
        public_key: String,
    },
}

#[derive(Subcommand, Debug)]
enum KeyKind {
    /// Base64 PKCS#8 PEM key for bearer tokens
    Bearer {
        /// eddsa or es256
        #[arg(long, default_value = "eddsa")]
        algorithm: BearerAlgorithm,
    },

    /// Base64 Ed25519 seed for manifest signatures
    Detached,
}

struct GeneratedKey {
    private: String,
    public: String,
}

fn keygen_bearer(algorithm: BearerAlgorithm) -> anyhow::Result<GeneratedKey> {
    let pem = generate_bearer_pem(algorithm)?;
    let material = BearerKeyMaterial::from_pem(algorithm, pem.clone())?;
    Ok(GeneratedKey {
        private: b64().encode(pem.as_bytes()),
        public: material.public_pem().to_string(),
    })
}

fn keygen_detached() -> anyhow::Result<GeneratedKey> {
    let seed = generate_detached_key();
    let signer = DetachedSigner::from_base64(&seed)?;
    Ok(GeneratedKey {
        private: seed,
        public: signer.public_key(),
    })
}

/// Rebuild the canonical payload from `view` and check its signature.
fn verify_view(view: &ManifestView, public_key: &str) -> anyhow::Result<bool> {
    let payload = build_canonical_payload(&PayloadInput::from(view))
        .context("manifest cannot be canonicalized")?;
    Ok(verify_detached(public_key, &payload, &view.signature).is_ok())
}

fn load_view(path: &Path) -> anyhow::Result<ManifestView> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a manifest view", path.display()))
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Keygen { kind } => {
            let (env_var, key) = match kind {
                KeyKind::Bearer { algorithm } => ("AUTH_SIGNING_KEY", keygen_bearer(algorithm)?),
                KeyKind::Detached => ("MANIFEST_SIGNING_KEY", keygen_detached()?),
            };
            println!("{env_var}={}", key.private);
            println!();
            println!("Public key:");
            println!("{}", key.public.trim_end());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Verify {
            manifest,
            public_key,
        } => {
            let view = load_view(&manifest)?;
            if verify_view(&view, &public_key)? {
                println!("manifest {}: signature valid", view.meta.id);
                Ok(ExitCode::SUCCESS)
            } else {
                println!("manifest {}: signature INVALID", view.meta.id);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
