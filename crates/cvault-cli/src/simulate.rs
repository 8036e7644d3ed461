//! # Simulate Subcommand
//!
//! Runs a YAML scenario against an in-process vault wired to the sealed
//! gateway, the decryption oracle, a threshold verifier and a native
//! treasury. Time only moves on `advance` steps.
//!
//! ```yaml
//! name: unlock and withdraw
//! threshold: 2
//! accounts:
//!   alice: { balance: "5" }
//! steps:
//!   - stake: { account: alice, amount: "2", duration: 172800 }
//!   - request: { account: alice }
//!     expect: LockPeriodActive
//!   - advance: 172800
//!   - request: { account: alice }
//!   - finalize: { account: alice }
//! ```
//!
//! Amounts are decimal strings in whole units (18 decimals). Every step
//! expects `ok` unless it names the error it should fail with.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use cvault_core::{
    sha256_digest, AccountId, CanonicalBytes, ManualClock, NativeAmount, Timestamp,
    NATIVE_DECIMALS,
};
use cvault_gateway::{SealedDecryptor, SealedGateway};
use cvault_proof::{encode_cleartexts, DecryptionOracle};
use cvault_state::{NativeTreasury, TransferExecutor, Vault, VaultConfig, VaultError};

use crate::keygen::AuthorityKeys;

/// Arguments for `cvault simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Load authority keys from this directory instead of generating them.
    #[arg(long)]
    pub keys: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Scenario document
// ---------------------------------------------------------------------------

/// A scripted run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Clock start, epoch seconds.
    #[serde(default = "default_start")]
    pub start: u64,
    /// Signing keys to generate when none are loaded.
    #[serde(default = "default_signers")]
    pub signers: u8,
    /// Signatures required; defaults to all signers.
    #[serde(default)]
    pub threshold: Option<usize>,
    /// Named accounts and their opening wallet balances.
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountSpec>,
    /// Steps in order.
    pub steps: Vec<Step>,
}

fn default_start() -> u64 {
    1_735_689_600
}

fn default_signers() -> u8 {
    3
}

/// One named account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountSpec {
    /// Fixed address; derived from the name when absent.
    #[serde(default)]
    pub address: Option<AccountId>,
    /// Opening wallet balance in units.
    #[serde(default)]
    pub balance: Option<String>,
}

/// A step and its expected outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// What to do.
    #[serde(flatten)]
    pub action: Action,
    /// `ok` or an error name such as `LockPeriodActive`.
    #[serde(default = "default_expect")]
    pub expect: String,
}

fn default_expect() -> String {
    "ok".to_string()
}

/// What a step does.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Deposit and stake.
    Stake {
        /// Account name from the scenario.
        account: String,
        /// Deposit in whole units.
        amount: String,
        /// Lock length in seconds.
        duration: u64,
    },
    /// Move the clock forward by this many seconds.
    Advance(u64),
    /// Request withdrawal.
    Request {
        /// Account name from the scenario.
        account: String,
    },
    /// Publish the decryption and finalize.
    Finalize {
        /// Account name from the scenario.
        account: String,
        /// Claim this amount instead of the real cleartext.
        #[serde(default)]
        claim: Option<String>,
        /// Corrupt one proof byte.
        #[serde(default)]
        tamper: bool,
    },
}

impl Action {
    fn describe(&self) -> String {
        match self {
            Self::Stake {
                account,
                amount,
                duration,
            } => format!("stake {account} {amount} for {duration}s"),
            Self::Advance(secs) => format!("advance {secs}s"),
            Self::Request { account } => format!("request {account}"),
            Self::Finalize {
                account,
                claim,
                tamper,
            } => {
                let mut s = format!("finalize {account}");
                if let Some(claim) = claim {
                    s.push_str(&format!(" claiming {claim}"));
                }
                if *tamper {
                    s.push_str(" with tampered proof");
                }
                s
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// One-based position in the script.
    pub index: usize,
    /// Human-readable action.
    pub description: String,
    /// Scripted outcome.
    pub expected: String,
    /// `ok` or the error name observed.
    pub actual: String,
    /// Error message or returned value.
    pub detail: Option<String>,
}

impl StepReport {
    /// Whether the step behaved as scripted.
    pub fn matched(&self) -> bool {
        self.expected.eq_ignore_ascii_case(&self.actual)
    }
}

/// Final state of a named account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountReport {
    /// Name from the scenario.
    pub name: String,
    /// Resolved address.
    pub address: AccountId,
    /// Whether a stake is still live.
    pub has_stake: bool,
    /// Wallet balance in whole units.
    pub wallet: String,
}

/// Whole-run result.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Per-step outcomes, in order.
    pub steps: Vec<StepReport>,
    /// Final state of every named account.
    pub accounts: Vec<AccountReport>,
    /// Vault reserve in whole units.
    pub reserve: String,
    /// Committed vault events.
    pub events: usize,
}

impl SimulationReport {
    /// Number of steps whose outcome differed from the script.
    pub fn mismatches(&self) -> usize {
        self.steps.iter().filter(|s| !s.matched()).count()
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Execute `cvault simulate`.
pub fn run_simulate(args: &SimulateArgs, config: VaultConfig) -> Result<u8> {
    let scenario = load_scenario(&args.file)?;
    let keys = match &args.keys {
        Some(dir) => AuthorityKeys::load(dir)?,
        None => AuthorityKeys::generate(scenario.signers),
    };
    let report = run_scenario(&scenario, config, keys)?;

    if let Some(name) = &scenario.name {
        println!("Scenario: {name}");
    }
    for step in &report.steps {
        let mark = if step.matched() { "ok  " } else { "FAIL" };
        println!(
            "[{mark}] {:>3}. {} -> {} (expected {})",
            step.index, step.description, step.actual, step.expected
        );
        if let Some(detail) = &step.detail {
            println!("            {detail}");
        }
    }
    for account in &report.accounts {
        println!(
            "  {} {} stake={} wallet={}",
            account.name, account.address, account.has_stake, account.wallet
        );
    }
    println!("  reserve={} events={}", report.reserve, report.events);

    let mismatches = report.mismatches();
    if mismatches > 0 {
        println!("FAIL: {mismatches} step(s) did not match the scenario");
        return Ok(1);
    }
    println!("OK: {} step(s) matched", report.steps.len());
    Ok(0)
}

/// Parse a scenario file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario: {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("failed to parse scenario: {}", path.display()))
}

/// Run a parsed scenario to completion. Step failures are recorded, not
/// returned; only setup errors abort the run.
pub fn run_scenario(
    scenario: &Scenario,
    config: VaultConfig,
    keys: AuthorityKeys,
) -> Result<SimulationReport> {
    let threshold = scenario.threshold.unwrap_or(keys.signers.len());
    let gateway = Arc::new(SealedGateway::new(keys.sealing.public_key()));
    let decryptor = Arc::new(
        SealedDecryptor::new(gateway.clone(), keys.sealing)
            .context("sealing key does not match the gateway")?,
    );
    let oracle = DecryptionOracle::new(decryptor, keys.signers);
    let verifier = Arc::new(
        oracle
            .verifier(threshold)
            .context("invalid signature threshold")?,
    );
    let treasury = Arc::new(NativeTreasury::new());
    let clock = Arc::new(ManualClock::new(Timestamp::from_secs(scenario.start)));
    let vault = Vault::new(config, gateway, verifier, treasury.clone(), clock.clone())
        .context("invalid vault configuration")?;

    let mut accounts = BTreeMap::new();
    for (name, spec) in &scenario.accounts {
        let address = match spec.address {
            Some(address) => address,
            None => derive_address(name)?,
        };
        if let Some(balance) = &spec.balance {
            treasury.fund(&address, parse_units(balance)?)?;
        }
        accounts.insert(name.clone(), address);
    }

    let world = World {
        vault: &vault,
        oracle: &oracle,
        treasury: &treasury,
        clock: &clock,
        accounts: &accounts,
    };
    let mut steps = Vec::with_capacity(scenario.steps.len());
    for (i, step) in scenario.steps.iter().enumerate() {
        let (actual, detail) = match world.apply(&step.action) {
            Ok(detail) => ("ok".to_string(), detail),
            Err(StepError::Vault(err)) => (error_name(&err).to_string(), Some(err.to_string())),
            Err(StepError::Other(label, err)) => (label.to_string(), Some(format!("{err:#}"))),
        };
        let report = StepReport {
            index: i + 1,
            description: step.action.describe(),
            expected: step.expect.clone(),
            actual,
            detail,
        };
        if report.matched() {
            tracing::debug!(step = report.index, outcome = %report.actual, "step matched");
        } else {
            tracing::warn!(step = report.index, expected = %report.expected, actual = %report.actual, "step mismatch");
        }
        steps.push(report);
    }

    let account_reports = accounts
        .iter()
        .map(|(name, address)| AccountReport {
            name: name.clone(),
            address: *address,
            has_stake: vault.has_stake(address),
            wallet: format_units(treasury.balance_of(address)),
        })
        .collect();

    Ok(SimulationReport {
        steps,
        accounts: account_reports,
        reserve: format_units(treasury.reserve()),
        events: vault.events().len(),
    })
}

enum StepError {
    Vault(VaultError),
    Other(&'static str, anyhow::Error),
}

impl From<VaultError> for StepError {
    fn from(err: VaultError) -> Self {
        Self::Vault(err)
    }
}

struct World<'a> {
    vault: &'a Vault,
    oracle: &'a DecryptionOracle,
    treasury: &'a NativeTreasury,
    clock: &'a ManualClock,
    accounts: &'a BTreeMap<String, AccountId>,
}

impl World<'_> {
    fn account(&self, name: &str) -> Result<AccountId, StepError> {
        self.accounts
            .get(name)
            .copied()
            .ok_or_else(|| StepError::Other("UnknownAccount", anyhow::anyhow!("no account named {name}")))
    }

    fn apply(&self, action: &Action) -> Result<Option<String>, StepError> {
        match action {
            Action::Stake {
                account,
                amount,
                duration,
            } => {
                let who = self.account(account)?;
                let deposit = NativeAmount::parse_units(amount, NATIVE_DECIMALS)
                    .map_err(|e| StepError::Other("InvalidAmount", e.into()))?;
                // Deposits above 128 bits cannot be collected, but the vault
                // must still be the one to reject them.
                let collected = match deposit.to_u128() {
                    Some(value) => {
                        self.treasury
                            .collect(&who, value)
                            .map_err(|e| StepError::Other("InsufficientFunds", e.into()))?;
                        Some(value)
                    }
                    None => None,
                };
                match self.vault.stake(&who, *duration, deposit) {
                    Ok(handle) => Ok(Some(format!("handle {handle}"))),
                    Err(err) => {
                        if let Some(value) = collected {
                            self.treasury
                                .transfer(&who, value)
                                .map_err(|e| StepError::Other("RefundFailed", e.into()))?;
                        }
                        Err(err.into())
                    }
                }
            }
            Action::Advance(secs) => {
                let now = self.clock.advance(*secs);
                Ok(Some(format!("now {now}")))
            }
            Action::Request { account } => {
                let who = self.account(account)?;
                let handle = self.vault.request_withdrawal(&who)?;
                Ok(Some(format!("handle {handle} released")))
            }
            Action::Finalize {
                account,
                claim,
                tamper,
            } => {
                let who = self.account(account)?;
                let handle = self.vault.get_encrypted_amount(&who);
                let published = if handle.is_zero() {
                    None
                } else {
                    self.oracle.public_decrypt(&[handle]).ok()
                };
                let (mut cleartexts, mut proof) = published
                    .map(|p| (p.cleartexts, p.proof))
                    .unwrap_or_default();
                if let Some(claim) = claim {
                    cleartexts = encode_cleartexts(&[parse_units(claim)
                        .map_err(|e| StepError::Other("InvalidAmount", e))?]);
                }
                if *tamper {
                    if let Some(byte) = proof.get_mut(1) {
                        *byte ^= 0x01;
                    }
                }
                let paid = self.vault.finalize_withdrawal(&who, &cleartexts, &proof)?;
                Ok(Some(format!("paid {}", format_units(paid))))
            }
        }
    }
}

/// Stable name of a vault error, as used in scenario expectations.
fn error_name(err: &VaultError) -> &'static str {
    match err {
        VaultError::StakeAlreadyActive { .. } => "StakeAlreadyActive",
        VaultError::InvalidLockDuration { .. } => "InvalidLockDuration",
        VaultError::InvalidStakeAmount { .. } => "InvalidStakeAmount",
        VaultError::StakeAmountTooLarge { .. } => "StakeAmountTooLarge",
        VaultError::NoActiveStake { .. } => "NoActiveStake",
        VaultError::LockPeriodActive { .. } => "LockPeriodActive",
        VaultError::WithdrawalAlreadyRequested { .. } => "WithdrawalAlreadyRequested",
        VaultError::WithdrawalNotRequested { .. } => "WithdrawalNotRequested",
        VaultError::ProofVerificationFailed { .. } => "ProofVerificationFailed",
        VaultError::TransferFailed { .. } => "TransferFailed",
        VaultError::Gateway(_) => "Gateway",
    }
}

#[derive(Serialize)]
struct AccountSeed<'a> {
    account: &'a str,
}

fn derive_address(name: &str) -> Result<AccountId> {
    let canonical = CanonicalBytes::new(&AccountSeed { account: name })
        .context("failed to canonicalize account name")?;
    let digest = sha256_digest(&canonical);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest.as_bytes()[..20]);
    Ok(AccountId::from_bytes(bytes))
}

fn parse_units(s: &str) -> Result<u128> {
    NativeAmount::parse_units(s, NATIVE_DECIMALS)?
        .to_u128()
        .with_context(|| format!("{s} exceeds the 128-bit range"))
}

fn format_units(value: u128) -> String {
    NativeAmount::from_u128(value).format_units(NATIVE_DECIMALS)
}
