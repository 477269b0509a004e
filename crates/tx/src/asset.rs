//! Asset identity.
//!
//! An asset is either the native lumen or a credit asset named by
//! `(code, issuer)`. Ordering follows the ledger's canonical XDR order
//! (native, then 4-character codes, then 12-character codes, each by code and
//! issuer) because composite identifiers such as liquidity pool ids are
//! hashed over assets in that order.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use questline_common::asset::{asset_code_to_str, str_to_asset_code, validate_asset_code, AssetCodeWidth};
use questline_crypto::PublicKey;
use stellar_xdr::curr::{AlphaNum12, AlphaNum4, AssetCode12, AssetCode4, TrustLineAsset};

use crate::error::TxError;

/// A non-native asset. Fields are private so the code is always valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreditAsset {
    code: String,
    issuer: PublicKey,
}

impl CreditAsset {
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn issuer(&self) -> &PublicKey {
        &self.issuer
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Asset {
    Native,
    Credit(CreditAsset),
}

impl Asset {
    pub fn native() -> Self {
        Asset::Native
    }

    /// A credit asset; the code must be 1-12 ASCII alphanumerics.
    pub fn credit(code: &str, issuer: PublicKey) -> Result<Self, TxError> {
        validate_asset_code(code)?;
        Ok(Asset::Credit(CreditAsset {
            code: code.to_string(),
            issuer,
        }))
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    /// "XLM" for the native asset.
    pub fn code(&self) -> &str {
        match self {
            Asset::Native => "XLM",
            Asset::Credit(c) => &c.code,
        }
    }

    pub fn issuer(&self) -> Option<&PublicKey> {
        match self {
            Asset::Native => None,
            Asset::Credit(c) => Some(&c.issuer),
        }
    }

    pub fn to_xdr(&self) -> stellar_xdr::curr::Asset {
        match self {
            Asset::Native => stellar_xdr::curr::Asset::Native,
            Asset::Credit(c) => match validate_asset_code(&c.code) {
                Ok(AssetCodeWidth::Four) => stellar_xdr::curr::Asset::CreditAlphanum4(AlphaNum4 {
                    asset_code: AssetCode4(str_to_asset_code(&c.code)),
                    issuer: c.issuer.to_account_id(),
                }),
                _ => stellar_xdr::curr::Asset::CreditAlphanum12(AlphaNum12 {
                    asset_code: AssetCode12(str_to_asset_code(&c.code)),
                    issuer: c.issuer.to_account_id(),
                }),
            },
        }
    }

    pub fn to_trust_line_asset(&self) -> TrustLineAsset {
        match self.to_xdr() {
            stellar_xdr::curr::Asset::Native => TrustLineAsset::Native,
            stellar_xdr::curr::Asset::CreditAlphanum4(a) => TrustLineAsset::CreditAlphanum4(a),
            stellar_xdr::curr::Asset::CreditAlphanum12(a) => TrustLineAsset::CreditAlphanum12(a),
        }
    }

    pub fn from_xdr(asset: &stellar_xdr::curr::Asset) -> Result<Self, TxError> {
        match asset {
            stellar_xdr::curr::Asset::Native => Ok(Asset::Native),
            stellar_xdr::curr::Asset::CreditAlphanum4(a) => Asset::credit(
                &asset_code_to_str(&a.asset_code.0),
                PublicKey::try_from(&a.issuer)?,
            ),
            stellar_xdr::curr::Asset::CreditAlphanum12(a) => Asset::credit(
                &asset_code_to_str(&a.asset_code.0),
                PublicKey::try_from(&a.issuer)?,
            ),
        }
    }
}

impl PartialOrd for Asset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Asset {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_xdr().cmp(&other.to_xdr())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Credit(c) => write!(f, "{}:{}", c.code, c.issuer),
        }
    }
}

/// Parses `native`, `XLM`, or `CODE:G...`.
impl FromStr for Asset {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("native") || s == "XLM" {
            return Ok(Asset::Native);
        }
        let (code, issuer) = s
            .split_once(':')
            .ok_or_else(|| TxError::Validation(format!("asset '{}' is not CODE:ISSUER", s)))?;
        Asset::credit(code, PublicKey::from_strkey(issuer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questline_crypto::SecretKey;

    fn issuer(seed: u8) -> PublicKey {
        SecretKey::from_seed(&[seed; 32]).public_key()
    }

    #[test]
    fn test_code_width_selects_xdr_arm() {
        let short = Asset::credit("USDC", issuer(1)).unwrap();
        let long = Asset::credit("CLAWBACK", issuer(1)).unwrap();
        assert!(matches!(short.to_xdr(), stellar_xdr::curr::Asset::CreditAlphanum4(_)));
        assert!(matches!(long.to_xdr(), stellar_xdr::curr::Asset::CreditAlphanum12(_)));
    }

    #[test]
    fn test_invalid_codes_rejected() {
        assert!(Asset::credit("", issuer(1)).is_err());
        assert!(Asset::credit("TOO-LONG-CODE", issuer(1)).is_err());
    }

    #[test]
    fn test_canonical_order() {
        let a = Asset::credit("AAA", issuer(2)).unwrap();
        let b = Asset::credit("BBB", issuer(1)).unwrap();
        let long = Asset::credit("AAAAA", issuer(1)).unwrap();
        assert!(Asset::Native < a);
        assert!(a < b);
        assert!(b < long);
    }

    #[test]
    fn test_xdr_and_string_roundtrip() {
        let asset = Asset::credit("CONTROL", issuer(3)).unwrap();
        assert_eq!(Asset::from_xdr(&asset.to_xdr()).unwrap(), asset);
        assert_eq!(asset.to_string().parse::<Asset>().unwrap(), asset);
        assert_eq!("native".parse::<Asset>().unwrap(), Asset::Native);
    }
}
