//! # Keygen Subcommand
//!
//! Generates the decryption authority's key material: one x25519 sealing
//! key and N Ed25519 signing keys. Each key is written as hex, secret and
//! public halves in separate files:
//!
//! ```text
//! sealing.key  sealing.pub
//! signer-001.key  signer-001.pub
//! ...
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use cvault_crypto::{Ed25519KeyPair, SealingSecretKey};

const SEALING_KEY_FILE: &str = "sealing.key";
const SEALING_PUB_FILE: &str = "sealing.pub";

/// Arguments for `cvault keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the key files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,

    /// Number of authority signing keys.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..))]
    pub signers: u8,
}

/// Key material held by the decryption authority.
pub struct AuthorityKeys {
    /// Opens sealed stake amounts.
    pub sealing: SealingSecretKey,
    /// Sign public decryption attestations.
    pub signers: Vec<Ed25519KeyPair>,
}

impl std::fmt::Debug for AuthorityKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityKeys")
            .field("sealing", &self.sealing.public_key())
            .field("signers", &self.signers.len())
            .finish()
    }
}

impl AuthorityKeys {
    /// Fresh random keys.
    pub fn generate(signers: u8) -> Self {
        Self {
            sealing: SealingSecretKey::generate(),
            signers: (0..signers).map(|_| Ed25519KeyPair::generate()).collect(),
        }
    }

    /// Write every key to `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory: {}", dir.display()))?;
        write_key(&dir.join(SEALING_KEY_FILE), &self.sealing.to_hex())?;
        write_key(&dir.join(SEALING_PUB_FILE), &self.sealing.public_key().to_hex())?;
        for (i, signer) in self.signers.iter().enumerate() {
            let stem = signer_stem(i);
            write_key(&dir.join(format!("{stem}.key")), &signer.seed_hex())?;
            write_key(&dir.join(format!("{stem}.pub")), &signer.public_key().to_hex())?;
        }
        Ok(())
    }

    /// Load keys previously written by [`write_to`](Self::write_to).
    pub fn load(dir: &Path) -> Result<Self> {
        let sealing_path = dir.join(SEALING_KEY_FILE);
        let sealing = SealingSecretKey::from_hex(read_key(&sealing_path)?.trim())
            .map_err(|e| anyhow::anyhow!("invalid sealing key {}: {e}", sealing_path.display()))?;

        let mut signer_paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("failed to list key directory: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("signer-") && n.ends_with(".key"))
            })
            .collect();
        signer_paths.sort();
        if signer_paths.is_empty() {
            bail!("no signer-*.key files in {}", dir.display());
        }

        let signers = signer_paths
            .iter()
            .map(|path| {
                Ed25519KeyPair::from_seed_hex(read_key(path)?.trim())
                    .map_err(|e| anyhow::anyhow!("invalid signing key {}: {e}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sealing, signers })
    }
}

/// Execute `cvault keygen`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let keys = AuthorityKeys::generate(args.signers);
    keys.write_to(&args.output)?;

    println!("OK: generated authority keys in {}", args.output.display());
    println!("  Sealing key (x25519): {}", keys.sealing.public_key().to_hex());
    for (i, signer) in keys.signers.iter().enumerate() {
        println!("  {} (Ed25519): {}", signer_stem(i), signer.public_key().to_hex());
    }
    Ok(0)
}

fn signer_stem(index: usize) -> String {
    format!("signer-{:03}", index + 1)
}

fn write_key(path: &Path, hex: &str) -> Result<()> {
    std::fs::write(path, hex).with_context(|| format!("failed to write key: {}", path.display()))
}

fn read_key(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read key: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keygen_writes_loadable_keys() {
        let dir = tempfile::tempdir().unwrap();
        let args = KeygenArgs {
            output: dir.path().join("authority"),
            signers: 2,
        };
        assert_eq!(run_keygen(&args).unwrap(), 0);
        for name in ["sealing.key", "sealing.pub", "signer-001.key", "signer-002.pub"] {
            assert!(args.output.join(name).is_file(), "{name} missing");
        }

        let loaded = AuthorityKeys::load(&args.output).unwrap();
        assert_eq!(loaded.signers.len(), 2);
        let pub_hex = std::fs::read_to_string(args.output.join("sealing.pub")).unwrap();
        assert_eq!(loaded.sealing.public_key().to_hex(), pub_hex);
    }

    #[test]
    fn signer_order_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let keys = AuthorityKeys::generate(12);
        keys.write_to(dir.path()).unwrap();
        let loaded = AuthorityKeys::load(dir.path()).unwrap();
        let original: Vec<_> = keys.signers.iter().map(|k| k.public_key()).collect();
        let reloaded: Vec<_> = loaded.signers.iter().map(|k| k.public_key()).collect();
        assert_eq!(original, reloaded);
    }

    #[test]
    fn load_without_signers_fails() {
        let dir = tempfile::tempdir().unwrap();
        let keys = AuthorityKeys::generate(1);
        keys.write_to(dir.path()).unwrap();
        std::fs::remove_file(dir.path().join("signer-001.key")).unwrap();
        assert!(AuthorityKeys::load(dir.path()).is_err());
    }

    #[test]
    fn corrupt_sealing_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        AuthorityKeys::generate(1).write_to(dir.path()).unwrap();
        std::fs::write(dir.path().join("sealing.key"), "zz").unwrap();
        assert!(AuthorityKeys::load(dir.path()).is_err());
    }
}
