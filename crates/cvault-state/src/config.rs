//! Vault configuration.
//!
//! Defaults are the protocol constants. Deployments may narrow the lock
//! bounds, never widen them, and may choose the principal that receives
//! decryption access to every stake alongside its owner.

use std::path::Path;

use serde::{Deserialize, Serialize};

use cvault_core::AccountId;

/// Shortest permitted lock, one day.
pub const MIN_LOCK_DURATION: u64 = 86_400;

/// Longest permitted lock, 365 days.
pub const MAX_LOCK_DURATION: u64 = 31_536_000;

/// Width of the largest stake the gateway can encrypt.
pub const MAX_ENCRYPTED_AMOUNT_BITS: u32 = 128;

/// Principal granted access to every stake unless configured otherwise.
pub const DEFAULT_VAULT_PRINCIPAL: AccountId = AccountId::from_bytes([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0xc7, 0x01,
]);

/// Runtime configuration for a [`Vault`](crate::Vault).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VaultConfig {
    /// Minimum lock duration in seconds.
    pub min_lock_duration: u64,
    /// Maximum lock duration in seconds.
    pub max_lock_duration: u64,
    /// The vault's own principal for decryption access grants.
    pub vault_principal: AccountId,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            min_lock_duration: MIN_LOCK_DURATION,
            max_lock_duration: MAX_LOCK_DURATION,
            vault_principal: DEFAULT_VAULT_PRINCIPAL,
        }
    }
}

impl VaultConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `CVAULT_MIN_LOCK_SECS` (default: 86400)
    /// - `CVAULT_MAX_LOCK_SECS` (default: 31536000)
    /// - `CVAULT_PRINCIPAL` (default: `0x…c701`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            min_lock_duration: env_parse(&lookup, "CVAULT_MIN_LOCK_SECS")?
                .unwrap_or(defaults.min_lock_duration),
            max_lock_duration: env_parse(&lookup, "CVAULT_MAX_LOCK_SECS")?
                .unwrap_or(defaults.max_lock_duration),
            vault_principal: env_parse(&lookup, "CVAULT_PRINCIPAL")?
                .unwrap_or(defaults.vault_principal),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Check the lock bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_lock_duration == 0 || self.max_lock_duration == 0 {
            return Err(ConfigError::InvalidBounds(
                "lock bounds must be non-zero".to_string(),
            ));
        }
        if self.min_lock_duration > self.max_lock_duration {
            return Err(ConfigError::InvalidBounds(format!(
                "min_lock_duration {} exceeds max_lock_duration {}",
                self.min_lock_duration, self.max_lock_duration
            )));
        }
        if self.min_lock_duration < MIN_LOCK_DURATION || self.max_lock_duration > MAX_LOCK_DURATION
        {
            return Err(ConfigError::InvalidBounds(format!(
                "lock bounds [{}, {}] outside protocol range [{MIN_LOCK_DURATION}, {MAX_LOCK_DURATION}]",
                self.min_lock_duration, self.max_lock_duration
            )));
        }
        Ok(())
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                var: var.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// The lock bounds are empty, inverted or outside the protocol range.
    #[error("invalid lock bounds: {0}")]
    InvalidBounds(String),
    /// The YAML document is malformed or has unknown keys.
    #[error("YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// The config file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_are_protocol_constants() {
        let cfg = VaultConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, VaultConfig::default());
        assert_eq!(cfg.min_lock_duration, 86_400);
        assert_eq!(cfg.max_lock_duration, 31_536_000);
    }

    #[test]
    fn env_overrides() {
        let cfg = VaultConfig::from_lookup(lookup(&[
            ("CVAULT_MIN_LOCK_SECS", "172800"),
            ("CVAULT_PRINCIPAL", "0x1111111111111111111111111111111111111111"),
        ]))
        .unwrap();
        assert_eq!(cfg.min_lock_duration, 172_800);
        assert_eq!(cfg.vault_principal, AccountId::from_bytes([0x11; 20]));
    }

    #[test]
    fn garbage_env_value_rejected() {
        let err = VaultConfig::from_lookup(lookup(&[("CVAULT_MAX_LOCK_SECS", "forever")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn bounds_validated() {
        let inverted = VaultConfig {
            min_lock_duration: 200_000,
            max_lock_duration: 100_000,
            ..VaultConfig::default()
        };
        assert!(inverted.validate().is_err());
        let too_wide = VaultConfig {
            max_lock_duration: MAX_LOCK_DURATION + 1,
            ..VaultConfig::default()
        };
        assert!(too_wide.validate().is_err());
        let zero = VaultConfig {
            min_lock_duration: 0,
            ..VaultConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn yaml_partial_document() {
        let cfg = VaultConfig::from_yaml_str("max_lock_duration: 604800\n").unwrap();
        assert_eq!(cfg.max_lock_duration, 604_800);
        assert_eq!(cfg.min_lock_duration, MIN_LOCK_DURATION);
    }

    #[test]
    fn yaml_unknown_key_rejected() {
        assert!(matches!(
            VaultConfig::from_yaml_str("lock: 5\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.yaml");
        std::fs::write(&path, "min_lock_duration: 259200\n").unwrap();
        let cfg = VaultConfig::from_yaml_file(&path).unwrap();
        assert_eq!(cfg.min_lock_duration, 259_200);
        assert!(matches!(
            VaultConfig::from_yaml_file(&dir.path().join("missing.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
