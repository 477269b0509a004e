//! SHA-256 helpers.

use questline_common::Hash256;
use stellar_xdr::curr::{Limits, WriteXdr};

use crate::error::CryptoError;

/// Compute SHA-256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Hash256 {
    Hash256::hash(data)
}

/// Compute SHA-256 of the XDR encoding of `value`.
pub fn xdr_sha256<T: WriteXdr>(value: &T) -> Result<Hash256, CryptoError> {
    let bytes = value.to_xdr(Limits::none())?;
    Ok(sha256(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::Uint256;

    #[test]
    fn test_xdr_sha256_matches_manual_encoding() {
        let value = Uint256([7u8; 32]);
        // A fixed opaque[32] encodes as its raw bytes.
        assert_eq!(xdr_sha256(&value).unwrap(), sha256(&[7u8; 32]));
    }
}
