//! Asset code validation and conversion.
//!
//! Credit asset codes are 1-4 characters (alphanum4) or 5-12 characters
//! (alphanum12), ASCII alphanumeric, stored NUL-padded on the wire.

use crate::error::{Error, Result};

/// The fee for liquidity pools (30 basis points = 0.3%).
pub const LIQUIDITY_POOL_FEE_V18: i32 = 30;

/// Wire width of an asset code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCodeWidth {
    Four,
    Twelve,
}

/// Checks an asset code and reports which wire form it uses.
///
/// # Examples
///
/// ```rust
/// use questline_common::asset::{validate_asset_code, AssetCodeWidth};
///
/// assert_eq!(validate_asset_code("USDC").unwrap(), AssetCodeWidth::Four);
/// assert_eq!(validate_asset_code("CLAWBACK").unwrap(), AssetCodeWidth::Twelve);
/// assert!(validate_asset_code("").is_err());
/// assert!(validate_asset_code("US-D").is_err());
/// ```
pub fn validate_asset_code(code: &str) -> Result<AssetCodeWidth> {
    if !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(Error::InvalidAssetCode(code.to_string()));
    }
    match code.len() {
        1..=4 => Ok(AssetCodeWidth::Four),
        5..=12 => Ok(AssetCodeWidth::Twelve),
        _ => Err(Error::InvalidAssetCode(code.to_string())),
    }
}

/// Convert an asset code byte array to a string, stopping at the first NUL.
pub fn asset_code_to_str<const N: usize>(code: &[u8; N]) -> String {
    let len = code.iter().position(|&b| b == 0).unwrap_or(N);
    String::from_utf8_lossy(&code[..len]).into_owned()
}

/// Copy a string into a NUL-padded asset code array, truncating if longer.
pub fn str_to_asset_code<const N: usize>(s: &str) -> [u8; N] {
    let mut result = [0u8; N];
    let n = std::cmp::min(N, s.len());
    result[..n].copy_from_slice(&s.as_bytes()[..n]);
    result
}

/// Check if a string contains only printable ASCII (data entry names, home
/// domains).
pub fn is_string_valid(s: &str) -> bool {
    s.chars().all(|c| matches!(c, ' '..='~'))
}
