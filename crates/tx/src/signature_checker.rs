//! Signature weight checking for multi-signature accounts.
//!
//! [`SignatureChecker`] matches the signatures on an envelope against an
//! account's signers (master key included), accumulating each matching
//! signer's weight until the needed threshold is reached. Within one check,
//! each signature and each signer counts at most once. After all checks,
//! [`SignatureChecker::check_all_signatures_used`] reports signatures that
//! matched nobody, which the ledger rejects as `tx_bad_auth_extra`.
//!
//! The checker is used by the sandbox ledger and by callers that want to
//! know ahead of time whether a set of keys can authorize an operation.
//!
//! # Example
//!
//! ```ignore
//! let mut checker = SignatureChecker::new(tx_hash, frame.signatures());
//! let signers = account_signers(&account);
//! if !checker.check_signature(&signers, needed) {
//!     // tx_bad_auth
//! }
//! if !checker.check_all_signatures_used() {
//!     // tx_bad_auth_extra
//! }
//! ```

use questline_common::Hash256;
use questline_crypto::verify_decorated;
use stellar_xdr::curr::DecoratedSignature;

use crate::account::{Account, Signer};

/// Tracks which signatures on an envelope have been matched.
pub struct SignatureChecker<'a> {
    contents_hash: Hash256,
    signatures: &'a [DecoratedSignature],
    used: Vec<bool>,
}

impl<'a> SignatureChecker<'a> {
    pub fn new(contents_hash: Hash256, signatures: &'a [DecoratedSignature]) -> Self {
        Self {
            contents_hash,
            signatures,
            used: vec![false; signatures.len()],
        }
    }

    /// True once signatures from `signers` add up to `needed_weight`.
    ///
    /// At least one matching signature is always required, even for a
    /// threshold of zero. Zero-weight signers never match.
    pub fn check_signature(&mut self, signers: &[Signer], needed_weight: u32) -> bool {
        let mut remaining: Vec<Signer> = signers.iter().filter(|s| s.weight > 0).copied().collect();
        let mut total: u32 = 0;

        // Signatures already used by an earlier check may count again here;
        // the same key can authorize several operations.
        for (idx, sig) in self.signatures.iter().enumerate() {
            let found = remaining
                .iter()
                .position(|signer| verify_decorated(&signer.key, &self.contents_hash, sig));
            if let Some(pos) = found {
                self.used[idx] = true;
                total += remaining[pos].weight as u32;
                if total >= needed_weight {
                    return true;
                }
                remaining.remove(pos);
            }
        }
        false
    }

    /// False if any signature matched no signer in any check so far.
    pub fn check_all_signatures_used(&self) -> bool {
        self.used.iter().all(|&u| u)
    }

    pub fn unused_count(&self) -> usize {
        self.used.iter().filter(|&&u| !u).count()
    }
}

/// The account's signer list with the master key prepended.
pub fn account_signers(account: &Account) -> Vec<Signer> {
    let mut signers = Vec::with_capacity(account.signers().len() + 1);
    signers.push(Signer {
        key: *account.id(),
        weight: account.master_weight(),
    });
    signers.extend_from_slice(account.signers());
    signers
}
