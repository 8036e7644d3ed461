#![deny(missing_docs)]

//! # cvault-cli: CLI for the Confidential Vault
//!
//! ## Subcommands
//!
//! - `cvault keygen`: authority sealing and signing keys.
//! - `cvault simulate`: run a YAML lifecycle scenario end to end.
//!
//! ```bash
//! cvault keygen --output ./authority --signers 3
//! cvault simulate crates/cvault-cli/scenarios/lifecycle.yaml --keys ./authority
//! cvault -vv --config vault.yaml simulate scenario.yaml
//! ```

pub mod keygen;
pub mod simulate;

use std::path::Path;

use anyhow::{Context, Result};

use cvault_state::VaultConfig;

/// Resolve the vault configuration: the YAML file when given, the
/// environment otherwise.
pub fn load_config(path: Option<&Path>) -> Result<VaultConfig> {
    match path {
        Some(path) => VaultConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config: {}", path.display())),
        None => VaultConfig::from_env().context("invalid vault configuration in environment"),
    }
}
