//! Signature utilities.
//!
//! Transactions are signed over their 32-byte contents hash. Each signature
//! travels with a hint (the last four bytes of the signer's public key) so the
//! ledger can match it to a signer without trying every key.

use crate::error::CryptoError;
use crate::keys::{PublicKey, SecretKey, Signature};
use questline_common::Hash256;
use stellar_xdr::curr::{DecoratedSignature, SignatureHint};

/// Compute the signature hint (last 4 bytes of public key).
pub fn signature_hint(public_key: &PublicKey) -> [u8; 4] {
    let key_bytes = public_key.as_bytes();
    [key_bytes[28], key_bytes[29], key_bytes[30], key_bytes[31]]
}

/// Sign a 32-byte hash.
pub fn sign_hash(secret_key: &SecretKey, hash: &Hash256) -> Signature {
    secret_key.sign(hash.as_bytes())
}

/// Verify a signature over a 32-byte hash.
pub fn verify_hash(
    public_key: &PublicKey,
    hash: &Hash256,
    signature: &Signature,
) -> Result<(), CryptoError> {
    public_key.verify(hash.as_bytes(), signature)
}

/// Sign `hash` and wrap the result with its hint.
pub fn decorated_signature(
    secret_key: &SecretKey,
    hash: &Hash256,
) -> Result<DecoratedSignature, CryptoError> {
    let signature = sign_hash(secret_key, hash);
    Ok(DecoratedSignature {
        hint: SignatureHint(signature_hint(&secret_key.public_key())),
        signature: signature.try_into()?,
    })
}

/// True if `sig` was produced by `public_key` over `hash`.
///
/// The hint is checked first; a mismatching hint is never verified.
pub fn verify_decorated(public_key: &PublicKey, hash: &Hash256, sig: &DecoratedSignature) -> bool {
    if sig.hint.0 != signature_hint(public_key) {
        return false;
    }
    match Signature::try_from(&sig.signature) {
        Ok(signature) => verify_hash(public_key, hash, &signature).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decorated_signature_verifies() {
        let secret = SecretKey::from_seed(&[11u8; 32]);
        let hash = Hash256::hash(b"tx");
        let sig = decorated_signature(&secret, &hash).unwrap();
        assert_eq!(sig.hint.0, signature_hint(&secret.public_key()));
        assert!(verify_decorated(&secret.public_key(), &hash, &sig));
        assert!(!verify_decorated(&secret.public_key(), &Hash256::hash(b"other"), &sig));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let signer = SecretKey::from_seed(&[1u8; 32]);
        let other = SecretKey::from_seed(&[2u8; 32]);
        let hash = Hash256::hash(b"tx");
        let sig = decorated_signature(&signer, &hash).unwrap();
        assert!(!verify_decorated(&other.public_key(), &hash, &sig));
    }
}
