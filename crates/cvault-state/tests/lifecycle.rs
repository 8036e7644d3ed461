//! End-to-end lifecycle tests: the vault wired to real gateways, the
//! decryption oracle, threshold verification and a treasury.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use cvault_core::{
    AccountId, EncryptedHandle, ManualClock, NativeAmount, Timestamp, NATIVE_DECIMALS,
};
use cvault_crypto::{Ed25519KeyPair, SealingSecretKey};
use cvault_gateway::{
    EncryptionGateway, GatewayError, MockGateway, SealedDecryptor, SealedGateway,
};
use cvault_proof::{attestation_bytes, encode_cleartexts, DecryptionOracle, DecryptionProof};
use cvault_state::{
    ErrorClass, NativeTreasury, TransferError, TransferExecutor, Vault, VaultConfig, VaultError,
    VaultEvent,
};

const DAY: u64 = 86_400;
const START: u64 = 1_735_689_600;

fn account(tag: u8) -> AccountId {
    AccountId::from_bytes([tag; 20])
}

fn units(s: &str) -> NativeAmount {
    NativeAmount::parse_units(s, NATIVE_DECIMALS).unwrap()
}

fn wei(s: &str) -> u128 {
    units(s).to_u128().unwrap()
}

fn signer(i: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[i; 32])
}

struct Deployment {
    vault: Arc<Vault>,
    gateway: Arc<dyn EncryptionGateway>,
    oracle: DecryptionOracle,
    treasury: Arc<NativeTreasury>,
    clock: Arc<ManualClock>,
}

impl Deployment {
    fn with_executor(executor: Arc<dyn TransferExecutor>, treasury: Arc<NativeTreasury>) -> Self {
        let gateway = Arc::new(MockGateway::new());
        let oracle = DecryptionOracle::new(gateway.clone(), vec![signer(1), signer(2), signer(3)]);
        let verifier = Arc::new(oracle.verifier(2).unwrap());
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(START)));
        let vault = Vault::new(
            VaultConfig::default(),
            gateway.clone(),
            verifier,
            executor,
            clock.clone(),
        )
        .unwrap();
        Self {
            vault: Arc::new(vault),
            gateway,
            oracle,
            treasury,
            clock,
        }
    }

    fn mock() -> Self {
        let treasury = Arc::new(NativeTreasury::new());
        Self::with_executor(treasury.clone(), treasury)
    }

    fn sealed() -> Self {
        let authority = SealingSecretKey::generate();
        let gateway = Arc::new(SealedGateway::new(authority.public_key()));
        let decryptor = Arc::new(SealedDecryptor::new(gateway.clone(), authority).unwrap());
        let oracle = DecryptionOracle::new(decryptor, vec![signer(1), signer(2), signer(3)]);
        let verifier = Arc::new(oracle.verifier(2).unwrap());
        let treasury = Arc::new(NativeTreasury::new());
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(START)));
        let vault = Vault::new(
            VaultConfig::default(),
            gateway.clone(),
            verifier,
            treasury.clone(),
            clock.clone(),
        )
        .unwrap();
        Self {
            vault: Arc::new(vault),
            gateway,
            oracle,
            treasury,
            clock,
        }
    }

    /// Stake with the deposit moved from the account's wallet into the
    /// vault reserve, as a payable call would.
    fn deposit_and_stake(&self, who: &AccountId, duration: u64, amount: &str) -> EncryptedHandle {
        let value = wei(amount);
        self.treasury.fund(who, value).unwrap();
        self.treasury.collect(who, value).unwrap();
        self.vault.stake(who, duration, units(amount)).unwrap()
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_three_day_stake_is_readable_by_owner() {
    let d = Deployment::mock();
    let alice = account(0xa1);
    let handle = d.deposit_and_stake(&alice, 3 * DAY, "1.5");

    let summary = d.vault.get_stake_summary(&alice);
    assert!(summary.exists);
    assert_eq!(summary.lock_duration, 259_200);
    assert_eq!(summary.encrypted_amount_handle, handle);
    assert_eq!(d.oracle.user_decrypt(&handle, &alice).unwrap(), wei("1.5"));
    assert!(d.oracle.user_decrypt(&handle, &account(0xb0)).is_err());
}

#[test]
fn scenario_b_second_stake_and_early_request_rejected() {
    let d = Deployment::mock();
    let alice = account(0xa1);
    d.deposit_and_stake(&alice, 5 * DAY, "0.5");

    let err = d.vault.stake(&alice, 5 * DAY, units("0.5")).unwrap_err();
    assert!(matches!(err, VaultError::StakeAlreadyActive { .. }));
    let err = d.vault.request_withdrawal(&alice).unwrap_err();
    assert!(matches!(err, VaultError::LockPeriodActive { .. }));
    assert_eq!(err.class(), ErrorClass::State);
}

#[test]
fn scenario_c_unlock_request_finalize() {
    let d = Deployment::sealed();
    let alice = account(0xa1);
    let handle = d.deposit_and_stake(&alice, 2 * DAY, "2");
    assert_eq!(d.treasury.balance_of(&alice), 0);

    d.clock.advance(2 * DAY);
    d.vault.request_withdrawal(&alice).unwrap();
    assert!(d.gateway.is_publicly_decryptable(&handle));

    let published = d.oracle.public_decrypt(&[handle]).unwrap();
    let paid = d
        .vault
        .finalize_withdrawal(&alice, &published.cleartexts, &published.proof)
        .unwrap();
    assert_eq!(paid, wei("2"));
    assert_eq!(d.treasury.balance_of(&alice), wei("2"));
    assert_eq!(d.treasury.reserve(), 0);
    assert!(!d.vault.has_stake(&alice));

    assert_eq!(
        d.vault.events().last(),
        Some(&VaultEvent::WithdrawalFinalized {
            account: alice,
            amount: units("2"),
            handle,
        })
    );
}

// ---------------------------------------------------------------------------
// Proof handling
// ---------------------------------------------------------------------------

#[test]
fn tampered_proof_keeps_record_and_valid_retry_succeeds() {
    let d = Deployment::mock();
    let alice = account(0xa1);
    let handle = d.deposit_and_stake(&alice, DAY, "3");
    d.clock.advance(DAY);
    d.vault.request_withdrawal(&alice).unwrap();
    let published = d.oracle.public_decrypt(&[handle]).unwrap();
    let events_before = d.vault.events().len();

    let mut tampered = published.proof.clone();
    tampered[20] ^= 0x80;
    let err = d
        .vault
        .finalize_withdrawal(&alice, &published.cleartexts, &tampered)
        .unwrap_err();
    assert!(matches!(err, VaultError::ProofVerificationFailed { .. }));
    assert_eq!(err.class(), ErrorClass::Integrity);

    let inflated = encode_cleartexts(&[wei("30")]);
    let err = d
        .vault
        .finalize_withdrawal(&alice, &inflated, &published.proof)
        .unwrap_err();
    assert!(matches!(err, VaultError::ProofVerificationFailed { .. }));

    let summary = d.vault.get_stake_summary(&alice);
    assert!(summary.exists && summary.withdrawal_requested);
    assert_eq!(d.vault.events().len(), events_before);

    d.vault
        .finalize_withdrawal(&alice, &published.cleartexts, &published.proof)
        .unwrap();
    assert!(!d.vault.has_stake(&alice));
}

#[test]
fn proof_for_another_stake_is_rejected() {
    let d = Deployment::mock();
    let (alice, bob) = (account(0xa1), account(0xb0));
    d.deposit_and_stake(&alice, DAY, "1");
    let bob_handle = d.deposit_and_stake(&bob, DAY, "1");
    d.clock.advance(DAY);
    d.vault.request_withdrawal(&alice).unwrap();
    d.vault.request_withdrawal(&bob).unwrap();

    let bobs = d.oracle.public_decrypt(&[bob_handle]).unwrap();
    let err = d
        .vault
        .finalize_withdrawal(&alice, &bobs.cleartexts, &bobs.proof)
        .unwrap_err();
    assert!(matches!(err, VaultError::ProofVerificationFailed { .. }));
}

#[test]
fn single_signature_below_threshold_is_rejected() {
    let d = Deployment::mock();
    let alice = account(0xa1);
    let handle = d.deposit_and_stake(&alice, DAY, "1");
    d.clock.advance(DAY);
    d.vault.request_withdrawal(&alice).unwrap();

    let clear = encode_cleartexts(&[wei("1")]);
    let msg = attestation_bytes(&[handle], &clear).unwrap();
    let proof = DecryptionProof::new(vec![signer(1).sign(&msg)]).encode().unwrap();
    assert!(d.vault.finalize_withdrawal(&alice, &clear, &proof).is_err());
}

#[test]
fn attested_value_above_u128_is_rejected() {
    let d = Deployment::mock();
    let alice = account(0xa1);
    let handle = d.deposit_and_stake(&alice, DAY, "1");
    d.clock.advance(DAY);
    d.vault.request_withdrawal(&alice).unwrap();

    let mut word = [0u8; 32];
    word[15] = 1;
    let msg = attestation_bytes(&[handle], &word).unwrap();
    let proof = DecryptionProof::new(vec![signer(1).sign(&msg), signer(2).sign(&msg)])
        .encode()
        .unwrap();
    let err = d.vault.finalize_withdrawal(&alice, &word, &proof).unwrap_err();
    assert!(matches!(err, VaultError::ProofVerificationFailed { .. }));
    assert!(d.vault.has_stake(&alice));
}

// ---------------------------------------------------------------------------
// Hostile and failing collaborators
// ---------------------------------------------------------------------------

/// Executor that re-enters the vault before paying.
struct ReentrantExecutor {
    vault: OnceLock<Weak<Vault>>,
    replay: Mutex<Option<(Vec<u8>, Vec<u8>)>>,
    observed: Mutex<Vec<String>>,
    treasury: Arc<NativeTreasury>,
}

impl TransferExecutor for ReentrantExecutor {
    fn transfer(&self, to: &AccountId, amount: u128) -> Result<(), TransferError> {
        if let Some(vault) = self.vault.get().and_then(Weak::upgrade) {
            self.observed
                .lock()
                .push(format!("has_stake={}", vault.has_stake(to)));
            if let Some((clear, proof)) = self.replay.lock().clone() {
                let again = vault.finalize_withdrawal(to, &clear, &proof);
                self.observed.lock().push(match again {
                    Ok(_) => "reentry paid".to_string(),
                    Err(e) => format!("reentry {e}"),
                });
            }
        }
        self.treasury.transfer(to, amount)
    }
}

#[test]
fn reentrant_executor_sees_deleted_record() {
    let treasury = Arc::new(NativeTreasury::new());
    let executor = Arc::new(ReentrantExecutor {
        vault: OnceLock::new(),
        replay: Mutex::new(None),
        observed: Mutex::new(Vec::new()),
        treasury: treasury.clone(),
    });
    let d = Deployment::with_executor(executor.clone(), treasury);
    let _ = executor.vault.set(Arc::downgrade(&d.vault));

    let alice = account(0xa1);
    // Reserve covers two payouts, so only the vault's own checks stop a
    // double withdrawal.
    d.treasury.fund(&account(0xee), wei("2")).unwrap();
    d.treasury.collect(&account(0xee), wei("2")).unwrap();
    let handle = d.deposit_and_stake(&alice, DAY, "2");
    d.clock.advance(DAY);
    d.vault.request_withdrawal(&alice).unwrap();
    let published = d.oracle.public_decrypt(&[handle]).unwrap();
    *executor.replay.lock() = Some((published.cleartexts.clone(), published.proof.clone()));

    let paid = d
        .vault
        .finalize_withdrawal(&alice, &published.cleartexts, &published.proof)
        .unwrap();
    assert_eq!(paid, wei("2"));

    let observed = executor.observed.lock().clone();
    assert_eq!(observed[0], "has_stake=false");
    assert!(observed[1].starts_with("reentry"));
    assert!(observed[1].contains("no active stake"));
    assert_eq!(d.treasury.balance_of(&alice), wei("2"));
    assert_eq!(d.treasury.reserve(), wei("2"));

    let finalized = d
        .vault
        .events()
        .iter()
        .filter(|e| matches!(e, VaultEvent::WithdrawalFinalized { .. }))
        .count();
    assert_eq!(finalized, 1);
}

#[test]
fn failed_payout_restores_record() {
    let d = Deployment::mock();
    let alice = account(0xa1);
    // Staked without collecting, so the reserve is empty.
    let handle = d.vault.stake(&alice, DAY, units("4")).unwrap();
    d.clock.advance(DAY);
    d.vault.request_withdrawal(&alice).unwrap();
    let published = d.oracle.public_decrypt(&[handle]).unwrap();
    let events_before = d.vault.events();

    let err = d
        .vault
        .finalize_withdrawal(&alice, &published.cleartexts, &published.proof)
        .unwrap_err();
    assert!(matches!(
        err,
        VaultError::TransferFailed {
            source: TransferError::InsufficientFunds { .. },
            ..
        }
    ));
    assert_eq!(err.class(), ErrorClass::Resource);
    let summary = d.vault.get_stake_summary(&alice);
    assert!(summary.exists);
    assert!(summary.withdrawal_requested);
    assert_eq!(summary.encrypted_amount_handle, handle);
    assert_eq!(d.vault.events(), events_before);

    d.treasury.fund(&account(0xee), wei("4")).unwrap();
    d.treasury.collect(&account(0xee), wei("4")).unwrap();
    d.vault
        .finalize_withdrawal(&alice, &published.cleartexts, &published.proof)
        .unwrap();
    assert_eq!(d.treasury.balance_of(&alice), wei("4"));
}

/// Executor that panics while armed and otherwise pays from a treasury.
struct PanickingExecutor {
    armed: AtomicBool,
    treasury: Arc<NativeTreasury>,
}

impl TransferExecutor for PanickingExecutor {
    fn transfer(&self, to: &AccountId, amount: u128) -> Result<(), TransferError> {
        if self.armed.load(Ordering::SeqCst) {
            panic!("executor crashed mid-payout");
        }
        self.treasury.transfer(to, amount)
    }
}

#[test]
fn panicking_payout_restores_record() {
    let treasury = Arc::new(NativeTreasury::new());
    let executor = Arc::new(PanickingExecutor {
        armed: AtomicBool::new(true),
        treasury: treasury.clone(),
    });
    let d = Deployment::with_executor(executor.clone(), treasury);
    let alice = account(0xa1);
    let handle = d.deposit_and_stake(&alice, DAY, "3");
    d.clock.advance(DAY);
    d.vault.request_withdrawal(&alice).unwrap();
    let published = d.oracle.public_decrypt(&[handle]).unwrap();
    let events_before = d.vault.events();

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        d.vault
            .finalize_withdrawal(&alice, &published.cleartexts, &published.proof)
    }));
    assert!(outcome.is_err());
    assert!(d.vault.has_stake(&alice));
    assert!(d.vault.get_stake_summary(&alice).withdrawal_requested);
    assert_eq!(d.vault.events(), events_before);
    assert_eq!(d.treasury.balance_of(&alice), 0);

    // The vault stays usable and the retry commits.
    executor.armed.store(false, Ordering::SeqCst);
    let paid = d
        .vault
        .finalize_withdrawal(&alice, &published.cleartexts, &published.proof)
        .unwrap();
    assert_eq!(paid, wei("3"));
    assert!(!d.vault.has_stake(&alice));
    assert_eq!(d.treasury.balance_of(&alice), wei("3"));
}

/// Gateway that hands out the reserved zero handle.
struct ZeroHandleGateway;

impl EncryptionGateway for ZeroHandleGateway {
    fn encrypt(&self, _clear: u128) -> Result<EncryptedHandle, GatewayError> {
        Ok(EncryptedHandle::ZERO)
    }

    fn grant_access(&self, _: &EncryptedHandle, _: &AccountId) -> Result<(), GatewayError> {
        Ok(())
    }

    fn mark_publicly_decryptable(&self, _: &EncryptedHandle) -> Result<(), GatewayError> {
        Ok(())
    }

    fn has_access(&self, _: &EncryptedHandle, _: &AccountId) -> bool {
        false
    }

    fn is_publicly_decryptable(&self, _: &EncryptedHandle) -> bool {
        false
    }
}

#[test]
fn zero_handle_from_gateway_is_refused() {
    let treasury = Arc::new(NativeTreasury::new());
    let vault = Vault::new(
        VaultConfig::default(),
        Arc::new(ZeroHandleGateway),
        Arc::new(
            cvault_proof::ThresholdSignatureVerifier::new(vec![signer(1).public_key()], 1)
                .unwrap(),
        ),
        treasury,
        Arc::new(ManualClock::new(Timestamp::from_secs(START))),
    )
    .unwrap();
    let err = vault.stake(&account(0xa1), DAY, units("1")).unwrap_err();
    assert!(matches!(err, VaultError::Gateway(GatewayError::ZeroHandle)));
    assert_eq!(err.class(), ErrorClass::Collaborator);
    assert!(!vault.has_stake(&account(0xa1)));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_stakes_on_one_account_admit_exactly_one() {
    let d = Deployment::mock();
    let alice = account(0xa1);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let vault = Arc::clone(&d.vault);
            std::thread::spawn(move || vault.stake(&alice, DAY, NativeAmount::from_u128(1)).is_ok())
        })
        .collect();
    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(admitted, 1);
    assert_eq!(d.vault.stake_count(), 1);
}

#[test]
fn concurrent_stakes_on_distinct_accounts_all_land() {
    let d = Deployment::mock();
    let threads: Vec<_> = (1..=8u8)
        .map(|i| {
            let vault = Arc::clone(&d.vault);
            std::thread::spawn(move || vault.stake(&account(i), DAY, NativeAmount::from_u128(1)))
        })
        .collect();
    for t in threads {
        t.join().unwrap().unwrap();
    }
    assert_eq!(d.vault.stake_count(), 8);
    assert_eq!(d.vault.events().len(), 8);
}
