//! Claimable balance predicates, claimants and ids.
//!
//! Predicates are built and validated here before they are encoded. The
//! ledger rewrites relative predicates into absolute ones when the balance is
//! created, so [`to_absolute`] and [`evaluate`] operate on the wire form.

use std::fmt;

use questline_common::Hash256;
use questline_crypto::PublicKey;
use stellar_xdr::curr::{
    ClaimantV0, HashIdPreimage, HashIdPreimageOperationId, SequenceNumber,
};

use crate::error::{OperationValidationError, TxError};

/// Maximum nesting depth the ledger accepts for a predicate tree.
pub const MAX_PREDICATE_DEPTH: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimPredicate {
    Unconditional,
    And(Box<ClaimPredicate>, Box<ClaimPredicate>),
    Or(Box<ClaimPredicate>, Box<ClaimPredicate>),
    Not(Box<ClaimPredicate>),
    /// Claimable while ledger close time is before this unix timestamp.
    BeforeAbsoluteTime(i64),
    /// Claimable for this many seconds after the balance is created.
    BeforeRelativeTime(i64),
}

impl ClaimPredicate {
    /// Claimable only once `seconds` have elapsed since creation.
    pub fn not_before_relative(seconds: i64) -> Self {
        ClaimPredicate::Not(Box::new(ClaimPredicate::BeforeRelativeTime(seconds)))
    }

    pub fn and(self, other: ClaimPredicate) -> Self {
        ClaimPredicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: ClaimPredicate) -> Self {
        ClaimPredicate::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        ClaimPredicate::Not(Box::new(self))
    }

    pub fn validate(&self) -> Result<(), OperationValidationError> {
        self.validate_at(1)
    }

    fn validate_at(&self, depth: u32) -> Result<(), OperationValidationError> {
        if depth > MAX_PREDICATE_DEPTH {
            return Err(OperationValidationError::InvalidClaimant(format!(
                "predicate nested deeper than {}",
                MAX_PREDICATE_DEPTH
            )));
        }
        match self {
            ClaimPredicate::Unconditional => Ok(()),
            ClaimPredicate::And(l, r) | ClaimPredicate::Or(l, r) => {
                l.validate_at(depth + 1)?;
                r.validate_at(depth + 1)
            }
            ClaimPredicate::Not(inner) => inner.validate_at(depth + 1),
            ClaimPredicate::BeforeAbsoluteTime(t) | ClaimPredicate::BeforeRelativeTime(t) => {
                if *t < 0 {
                    Err(OperationValidationError::InvalidClaimant(format!(
                        "negative time bound {}",
                        t
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn to_xdr(&self) -> Result<stellar_xdr::curr::ClaimPredicate, TxError> {
        use stellar_xdr::curr::ClaimPredicate as X;
        Ok(match self {
            ClaimPredicate::Unconditional => X::Unconditional,
            ClaimPredicate::And(l, r) => X::And(vec![l.to_xdr()?, r.to_xdr()?].try_into()?),
            ClaimPredicate::Or(l, r) => X::Or(vec![l.to_xdr()?, r.to_xdr()?].try_into()?),
            ClaimPredicate::Not(inner) => X::Not(Some(Box::new(inner.to_xdr()?))),
            ClaimPredicate::BeforeAbsoluteTime(t) => X::BeforeAbsoluteTime(*t),
            ClaimPredicate::BeforeRelativeTime(t) => X::BeforeRelativeTime(*t),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claimant {
    pub destination: PublicKey,
    pub predicate: ClaimPredicate,
}

impl Claimant {
    pub fn new(destination: PublicKey, predicate: ClaimPredicate) -> Self {
        Self {
            destination,
            predicate,
        }
    }

    pub fn unconditional(destination: PublicKey) -> Self {
        Self::new(destination, ClaimPredicate::Unconditional)
    }

    pub fn to_xdr(&self) -> Result<stellar_xdr::curr::Claimant, TxError> {
        Ok(stellar_xdr::curr::Claimant::ClaimantTypeV0(ClaimantV0 {
            destination: self.destination.to_account_id(),
            predicate: self.predicate.to_xdr()?,
        }))
    }
}

/// Rewrites relative time bounds as absolute ones anchored at `created_at`.
pub fn to_absolute(
    predicate: &stellar_xdr::curr::ClaimPredicate,
    created_at: i64,
) -> stellar_xdr::curr::ClaimPredicate {
    use stellar_xdr::curr::ClaimPredicate as X;
    match predicate {
        X::Unconditional => X::Unconditional,
        X::And(parts) => X::And(map_pair(parts, created_at)),
        X::Or(parts) => X::Or(map_pair(parts, created_at)),
        X::Not(inner) => X::Not(inner.as_ref().map(|p| Box::new(to_absolute(p, created_at)))),
        X::BeforeAbsoluteTime(t) => X::BeforeAbsoluteTime(*t),
        X::BeforeRelativeTime(secs) => X::BeforeAbsoluteTime(created_at.saturating_add(*secs)),
    }
}

fn map_pair(
    parts: &stellar_xdr::curr::VecM<stellar_xdr::curr::ClaimPredicate, 2>,
    created_at: i64,
) -> stellar_xdr::curr::VecM<stellar_xdr::curr::ClaimPredicate, 2> {
    let mapped: Vec<_> = parts.iter().map(|p| to_absolute(p, created_at)).collect();
    // Same length as the input, which already satisfied the bound.
    mapped.try_into().unwrap_or_default()
}

/// Evaluates an absolute predicate against a ledger close time.
///
/// A relative bound that was never rewritten is treated as already expired.
pub fn evaluate(predicate: &stellar_xdr::curr::ClaimPredicate, close_time: i64) -> bool {
    use stellar_xdr::curr::ClaimPredicate as X;
    match predicate {
        X::Unconditional => true,
        X::And(parts) => parts.len() == 2 && parts.iter().all(|p| evaluate(p, close_time)),
        X::Or(parts) => parts.len() == 2 && parts.iter().any(|p| evaluate(p, close_time)),
        X::Not(Some(inner)) => !evaluate(inner, close_time),
        X::Not(None) => false,
        X::BeforeAbsoluteTime(t) => close_time < *t,
        X::BeforeRelativeTime(_) => false,
    }
}

/// Identifier of a claimable balance.
///
/// Derived from the creating transaction's source account, its sequence
/// number and the operation's index within it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClaimableBalanceId(pub Hash256);

impl ClaimableBalanceId {
    pub fn derive(tx_source: &PublicKey, tx_seq: i64, op_index: u32) -> Result<Self, TxError> {
        let preimage = HashIdPreimage::OpId(HashIdPreimageOperationId {
            source_account: tx_source.to_account_id(),
            seq_num: SequenceNumber(tx_seq),
            op_num: op_index,
        });
        Ok(Self(Hash256::hash_xdr(&preimage)?))
    }

    /// Horizon form: the 4-byte type discriminant followed by the hash.
    pub fn to_hex(&self) -> String {
        format!("00000000{}", self.0.to_hex())
    }

    /// Accepts the Horizon form or a bare 64-character hash.
    pub fn from_hex(s: &str) -> Result<Self, TxError> {
        let body = match s.len() {
            72 if s.starts_with("00000000") => &s[8..],
            64 => s,
            _ => {
                return Err(TxError::Validation(format!(
                    "claimable balance id '{}' has unexpected length",
                    s
                )))
            }
        };
        Hash256::from_hex(body)
            .map(Self)
            .map_err(|e| TxError::Validation(format!("claimable balance id '{}': {}", s, e)))
    }

    pub fn to_xdr(&self) -> stellar_xdr::curr::ClaimableBalanceId {
        stellar_xdr::curr::ClaimableBalanceId::ClaimableBalanceIdTypeV0(self.0.into())
    }
}

impl From<&stellar_xdr::curr::ClaimableBalanceId> for ClaimableBalanceId {
    fn from(id: &stellar_xdr::curr::ClaimableBalanceId) -> Self {
        match id {
            stellar_xdr::curr::ClaimableBalanceId::ClaimableBalanceIdTypeV0(hash) => {
                Self(Hash256::from(hash.clone()))
            }
        }
    }
}

impl fmt::Debug for ClaimableBalanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClaimableBalanceId({})", self.to_hex())
    }
}

impl fmt::Display for ClaimableBalanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_crypto::SecretKey;

    #[test]
    fn test_not_before_relative_window() {
        let xdr = ClaimPredicate::not_before_relative(300).to_xdr().unwrap();
        let absolute = to_absolute(&xdr, 1_000);
        assert!(!evaluate(&absolute, 1_000));
        assert!(!evaluate(&absolute, 1_299));
        assert!(evaluate(&absolute, 1_300));
    }

    #[test]
    fn test_unconditional_always_true() {
        let xdr = ClaimPredicate::Unconditional.to_xdr().unwrap();
        assert!(evaluate(&to_absolute(&xdr, 0), 0));
    }

    #[test]
    fn test_composition() {
        let window = ClaimPredicate::BeforeAbsoluteTime(200)
            .and(ClaimPredicate::BeforeAbsoluteTime(100).negate());
        let xdr = window.to_xdr().unwrap();
        assert!(!evaluate(&xdr, 50));
        assert!(evaluate(&xdr, 150));
        assert!(!evaluate(&xdr, 250));
    }

    #[test]
    fn test_depth_limit() {
        let mut p = ClaimPredicate::Unconditional;
        for _ in 0..MAX_PREDICATE_DEPTH {
            p = p.negate();
        }
        assert!(p.validate().is_err());
        assert!(ClaimPredicate::not_before_relative(300).validate().is_ok());
        assert!(ClaimPredicate::BeforeRelativeTime(-1).validate().is_err());
    }

    #[test]
    fn test_balance_id_depends_on_op_index() {
        let source = SecretKey::from_seed(&[8u8; 32]).public_key();
        let first = ClaimableBalanceId::derive(&source, 42, 0).unwrap();
        let second = ClaimableBalanceId::derive(&source, 42, 1).unwrap();
        assert_ne!(first, second);
        assert_eq!(first, ClaimableBalanceId::derive(&source, 42, 0).unwrap());
    }

    #[test]
    fn test_balance_id_hex_forms() {
        let source = SecretKey::from_seed(&[8u8; 32]).public_key();
        let id = ClaimableBalanceId::derive(&source, 7, 0).unwrap();
        let hex = id.to_hex();
        assert_eq!(hex.len(), 72);
        assert_eq!(ClaimableBalanceId::from_hex(&hex).unwrap(), id);
        assert_eq!(ClaimableBalanceId::from_hex(&hex[8..]).unwrap(), id);
        assert!(ClaimableBalanceId::from_hex("abcd").is_err());
    }
}
