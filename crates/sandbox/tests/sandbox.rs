use std::sync::Arc;
use std::time::Duration;

use questline_client::{Funder, LedgerClient, LedgerError, TransactionStatus};
use questline_common::{ManualClock, NetworkId, STROOPS_PER_UNIT};
use questline_crypto::{PublicKey, SecretKey};
use questline_sandbox::{Fault, SandboxLedger, FRIENDBOT_AMOUNT};
use questline_tx::fee_bump;
use questline_tx::{
    Asset, ClaimPredicate, ClaimableBalanceId, Claimant, Operation, SignedTransaction,
    SigningCoordinator, TransactionBuilder, DEFAULT_TIMEOUT,
};

const START: u64 = 1_700_000_000;

struct Harness {
    clock: Arc<ManualClock>,
    ledger: SandboxLedger,
    builder: TransactionBuilder,
    signer: SigningCoordinator,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(START));
        Self {
            ledger: SandboxLedger::new(NetworkId::testnet(), clock.clone()),
            builder: TransactionBuilder::new(clock.clone()),
            signer: SigningCoordinator::new(NetworkId::testnet()),
            clock,
        }
    }

    async fn funded(&self, seed: u8) -> SecretKey {
        let key = SecretKey::from_seed(&[seed; 32]);
        self.ledger.fund(&key.public_key()).await.unwrap();
        key
    }

    async fn build(&self, source: &SecretKey, ops: Vec<Operation>, keys: &[&SecretKey]) -> SignedTransaction {
        let account = self.ledger.load_account(&source.public_key()).await.unwrap();
        let unsigned = self.builder.build(&account, ops, 100, DEFAULT_TIMEOUT).unwrap();
        self.signer.sign(unsigned, keys).unwrap()
    }

    fn balance(&self, id: &PublicKey) -> i64 {
        self.ledger.account(id).map(|a| a.balance).unwrap_or_default()
    }
}

#[tokio::test]
async fn test_fund_creates_account_once() {
    let h = Harness::new();
    let key = h.funded(1).await;

    let account = h.ledger.load_account(&key.public_key()).await.unwrap();
    assert_eq!(account.native_balance(), FRIENDBOT_AMOUNT);
    assert_eq!(account.loaded_at(), Some(START));

    let err = h.ledger.fund(&key.public_key()).await.unwrap_err();
    assert!(matches!(err, LedgerError::Rejected(_)));
}

#[tokio::test]
async fn test_unknown_account_not_found() {
    let h = Harness::new();
    let missing = SecretKey::from_seed(&[9; 32]).public_key();
    let err = h.ledger.load_account(&missing).await.unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(_)));
}

#[tokio::test]
async fn test_payment_applies_and_is_recorded() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let bob = h.funded(2).await;
    let before = h.ledger.ledger_seq();

    let tx = h
        .build(
            &alice,
            vec![Operation::payment(bob.public_key(), Asset::Native, 10 * STROOPS_PER_UNIT)],
            &[&alice],
        )
        .await;
    let response = h.ledger.submit(&tx).await.unwrap();

    assert_eq!(response.hash, tx.hash());
    assert_eq!(response.ledger, before + 1);
    assert_eq!(h.balance(&alice.public_key()), FRIENDBOT_AMOUNT - 10 * STROOPS_PER_UNIT - 100);
    assert_eq!(h.balance(&bob.public_key()), FRIENDBOT_AMOUNT + 10 * STROOPS_PER_UNIT);
    assert!(matches!(
        h.ledger.transaction_status(&tx.hash()).await.unwrap(),
        TransactionStatus::Success { ledger } if ledger == response.ledger
    ));
}

#[tokio::test]
async fn test_replayed_envelope_is_sequence_conflict() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let tx = h.build(&alice, vec![Operation::bump_sequence(0)], &[&alice]).await;

    h.ledger.submit(&tx).await.unwrap();
    let balance = h.balance(&alice.public_key());
    let err = h.ledger.submit(&tx).await.unwrap_err();

    assert!(matches!(err, LedgerError::SequenceConflict(_)));
    assert_eq!(h.balance(&alice.public_key()), balance);
}

#[tokio::test]
async fn test_failed_operation_charges_fee_and_consumes_sequence() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let bob = h.funded(2).await;
    let seq = h.ledger.account(&alice.public_key()).unwrap().seq_num;

    let tx = h
        .build(
            &alice,
            vec![Operation::payment(bob.public_key(), Asset::Native, FRIENDBOT_AMOUNT)],
            &[&alice],
        )
        .await;
    let err = h.ledger.submit(&tx).await.unwrap_err();

    assert!(matches!(err, LedgerError::InsufficientBalance(_)));
    let d = err.diagnostics().unwrap();
    assert_eq!(d.failing_operation(), Some((0, "op_underfunded")));
    assert_eq!(d.extras["result_codes"]["operations"][0], "op_underfunded");

    let alice_entry = h.ledger.account(&alice.public_key()).unwrap();
    assert_eq!(alice_entry.balance, FRIENDBOT_AMOUNT - 100);
    assert_eq!(alice_entry.seq_num, seq + 1);
    assert_eq!(h.balance(&bob.public_key()), FRIENDBOT_AMOUNT);
    assert!(matches!(
        h.ledger.transaction_status(&tx.hash()).await.unwrap(),
        TransactionStatus::Failed(LedgerError::InsufficientBalance(_))
    ));
}

#[tokio::test]
async fn test_failed_operation_rolls_back_earlier_operations() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let bob = h.funded(2).await;

    let tx = h
        .build(
            &alice,
            vec![
                Operation::manage_data("note", Some(b"kept?".to_vec())),
                Operation::payment(bob.public_key(), Asset::Native, 2 * FRIENDBOT_AMOUNT),
            ],
            &[&alice],
        )
        .await;
    let err = h.ledger.submit(&tx).await.unwrap_err();

    let d = err.diagnostics().unwrap();
    assert_eq!(d.operations, vec!["op_success", "op_underfunded"]);
    assert_eq!(h.ledger.data(&alice.public_key(), "note"), None);
}

#[tokio::test]
async fn test_expired_envelope_rejected_without_fee() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let tx = h.build(&alice, vec![Operation::bump_sequence(0)], &[&alice]).await;

    h.clock.advance(DEFAULT_TIMEOUT + Duration::from_secs(1));
    let err = h.ledger.submit(&tx).await.unwrap_err();

    assert!(matches!(err, LedgerError::Expired(_)));
    assert_eq!(h.balance(&alice.public_key()), FRIENDBOT_AMOUNT);
}

#[tokio::test]
async fn test_wrong_signer_is_insufficient_weight() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let mallory = SecretKey::from_seed(&[66; 32]);
    let tx = h.build(&alice, vec![Operation::bump_sequence(0)], &[&mallory]).await;

    let err = h.ledger.submit(&tx).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientWeight(_)));
}

#[tokio::test]
async fn test_signed_for_other_network_fails_only_at_submission() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let account = h.ledger.load_account(&alice.public_key()).await.unwrap();
    let unsigned = h
        .builder
        .build(&account, vec![Operation::bump_sequence(0)], 100, DEFAULT_TIMEOUT)
        .unwrap();

    let mainnet = SigningCoordinator::new(NetworkId::mainnet());
    let tx = mainnet.sign(unsigned, &[&alice]).unwrap();

    let err = h.ledger.submit(&tx).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientWeight(_)));
    assert_eq!(
        err.diagnostics().unwrap().transaction.as_deref(),
        Some("tx_bad_auth")
    );
    let after = h.ledger.load_account(&alice.public_key()).await.unwrap();
    assert_eq!(after.sequence(), account.sequence());
    assert_eq!(h.balance(&alice.public_key()), FRIENDBOT_AMOUNT);
}

#[tokio::test]
async fn test_extra_signature_is_rejected() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let stranger = SecretKey::from_seed(&[67; 32]);
    let tx = h
        .build(&alice, vec![Operation::bump_sequence(0)], &[&alice, &stranger])
        .await;

    let err = h.ledger.submit(&tx).await.unwrap_err();
    assert_eq!(
        err.diagnostics().unwrap().transaction.as_deref(),
        Some("tx_bad_auth_extra")
    );
}

#[tokio::test]
async fn test_unclosed_sponsorship_fails_transaction() {
    let h = Harness::new();
    let sponsor = h.funded(1).await;
    let newcomer = SecretKey::from_seed(&[2; 32]).public_key();

    let tx = h
        .build(
            &sponsor,
            vec![
                Operation::begin_sponsoring_future_reserves(newcomer),
                Operation::create_account(newcomer, 0),
            ],
            &[&sponsor],
        )
        .await;
    let err = h.ledger.submit(&tx).await.unwrap_err();

    assert_eq!(
        err.diagnostics().unwrap().transaction.as_deref(),
        Some("tx_bad_sponsorship")
    );
    assert!(h.ledger.account(&newcomer).is_none());
}

#[tokio::test]
async fn test_claimable_balance_respects_time_predicate() {
    let h = Harness::new();
    let creator = h.funded(1).await;
    let claimant = h.funded(2).await;

    let create = h
        .build(
            &creator,
            vec![Operation::create_claimable_balance(
                Asset::Native,
                100 * STROOPS_PER_UNIT,
                vec![
                    Claimant::new(claimant.public_key(), ClaimPredicate::not_before_relative(300)),
                    Claimant::unconditional(creator.public_key()),
                ],
            )],
            &[&creator],
        )
        .await;
    let balance_id = ClaimableBalanceId::derive(&creator.public_key(), create.sequence(), 0).unwrap();
    h.ledger.submit(&create).await.unwrap();
    assert_eq!(
        h.ledger.claimable_balance(&balance_id).unwrap().amount,
        100 * STROOPS_PER_UNIT
    );

    let early = h
        .build(&claimant, vec![Operation::claim_claimable_balance(balance_id)], &[&claimant])
        .await;
    let err = h.ledger.submit(&early).await.unwrap_err();
    assert_eq!(
        err.diagnostics().unwrap().failing_operation(),
        Some((0, "op_cannot_claim"))
    );

    h.clock.advance(Duration::from_secs(301));
    let claim = h
        .build(&claimant, vec![Operation::claim_claimable_balance(balance_id)], &[&claimant])
        .await;
    h.ledger.submit(&claim).await.unwrap();

    assert!(h.ledger.claimable_balance(&balance_id).is_none());
    assert_eq!(
        h.balance(&claimant.public_key()),
        FRIENDBOT_AMOUNT + 100 * STROOPS_PER_UNIT - 200
    );
}

#[tokio::test]
async fn test_dropped_response_still_applies() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let tx = h.build(&alice, vec![Operation::bump_sequence(0)], &[&alice]).await;

    h.ledger.inject_fault(Fault::DropResponse);
    let err = h.ledger.submit(&tx).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(
        h.ledger.transaction_status(&tx.hash()).await.unwrap(),
        TransactionStatus::Success { .. }
    ));
}

#[tokio::test]
async fn test_dropped_request_changes_nothing() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let tx = h.build(&alice, vec![Operation::bump_sequence(0)], &[&alice]).await;

    h.ledger.inject_fault(Fault::DropRequest);
    assert!(h.ledger.submit(&tx).await.unwrap_err().is_retryable());
    assert!(matches!(
        h.ledger.transaction_status(&tx.hash()).await.unwrap(),
        TransactionStatus::NotFound
    ));
    h.ledger.submit(&tx).await.unwrap();
}

#[tokio::test]
async fn test_fee_bump_charges_fee_source() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let payer = h.funded(2).await;

    let inner = h.build(&alice, vec![Operation::bump_sequence(0)], &[&alice]).await;
    let outer = fee_bump::wrap_at_base_fee(&payer.public_key(), 100, &inner).unwrap();
    let bumped = h.signer.sign_fee_bump(outer, &[&payer]).unwrap();

    h.ledger.submit(&bumped).await.unwrap();
    assert_eq!(h.balance(&alice.public_key()), FRIENDBOT_AMOUNT);
    assert_eq!(h.balance(&payer.public_key()), FRIENDBOT_AMOUNT - 200);
    assert!(matches!(
        h.ledger.transaction_status(&inner.hash()).await.unwrap(),
        TransactionStatus::Success { .. }
    ));
}

#[tokio::test]
async fn test_fee_bump_below_minimum_rejected() {
    let h = Harness::new();
    let alice = h.funded(1).await;
    let payer = h.funded(2).await;

    let inner = h.build(&alice, vec![Operation::bump_sequence(0)], &[&alice]).await;
    let mut outer = fee_bump::wrap_at_base_fee(&payer.public_key(), 100, &inner).unwrap();
    outer.fee = 150;
    let bumped = h.signer.sign_fee_bump(outer, &[&payer]).unwrap();

    let err = h.ledger.submit(&bumped).await.unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFee(_)));
}
