//! Ed25519 key types.
//!
//! - [`PublicKey`]: 32-byte verifying key, shown as a G... account id
//! - [`SecretKey`]: 32-byte signing seed, shown as S... and never printed by `Debug`
//! - [`Signature`]: 64-byte Ed25519 signature

use crate::error::CryptoError;
use crate::strkey;
use ed25519_dalek::{SigningKey, VerifyingKey};
use std::cmp::Ordering;
use std::fmt;
use stellar_xdr::curr::{AccountId, MuxedAccount, Uint256};

/// An Ed25519 public key (verifying key).
///
/// `Debug` and `Display` show the StrKey encoding so log lines carry the
/// same account ids a block explorer would.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Creates a public key from raw 32-byte Ed25519 key material.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPublicKey`] if the bytes do not represent
    /// a valid point on the Ed25519 curve.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        let key = VerifyingKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(key))
    }

    /// Returns the raw 32-byte key material.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Verifies an Ed25519 signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CryptoError> {
        use ed25519_dalek::Verifier;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        self.0
            .verify(message, &sig)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    /// Encodes the public key as a Stellar account ID (G...).
    pub fn to_strkey(&self) -> String {
        strkey::encode_account_id(self.as_bytes())
    }

    /// Parses a public key from a Stellar account ID (G...).
    pub fn from_strkey(s: &str) -> Result<Self, CryptoError> {
        let bytes = strkey::decode_account_id(s)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_account_id(&self) -> AccountId {
        self.into()
    }

    pub fn to_muxed_account(&self) -> MuxedAccount {
        MuxedAccount::Ed25519(Uint256(*self.as_bytes()))
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_strkey())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strkey())
    }
}

impl std::str::FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_strkey(s)
    }
}

impl TryFrom<&stellar_xdr::curr::PublicKey> for PublicKey {
    type Error = CryptoError;

    fn try_from(xdr: &stellar_xdr::curr::PublicKey) -> Result<Self, Self::Error> {
        match xdr {
            stellar_xdr::curr::PublicKey::PublicKeyTypeEd25519(Uint256(bytes)) => {
                Self::from_bytes(bytes)
            }
        }
    }
}

impl TryFrom<&AccountId> for PublicKey {
    type Error = CryptoError;

    fn try_from(id: &AccountId) -> Result<Self, Self::Error> {
        Self::try_from(&id.0)
    }
}

impl TryFrom<&MuxedAccount> for PublicKey {
    type Error = CryptoError;

    fn try_from(account: &MuxedAccount) -> Result<Self, Self::Error> {
        match account {
            MuxedAccount::Ed25519(Uint256(bytes)) => Self::from_bytes(bytes),
            MuxedAccount::MuxedEd25519(m) => Self::from_bytes(&m.ed25519.0),
        }
    }
}

impl From<&PublicKey> for stellar_xdr::curr::PublicKey {
    fn from(pk: &PublicKey) -> Self {
        stellar_xdr::curr::PublicKey::PublicKeyTypeEd25519(Uint256(*pk.as_bytes()))
    }
}

impl From<&PublicKey> for AccountId {
    fn from(pk: &PublicKey) -> Self {
        AccountId(pk.into())
    }
}

/// An Ed25519 secret key (signing key).
///
/// The underlying `SigningKey` zeroizes itself on drop and `Debug` never
/// reveals key material.
///
/// # Example
///
/// ```
/// use questline_crypto::SecretKey;
///
/// let secret = SecretKey::generate();
/// let seed = secret.to_strkey();
/// let restored = SecretKey::from_strkey(&seed).unwrap();
/// assert_eq!(restored.public_key(), secret.public_key());
/// ```
pub struct SecretKey {
    inner: SigningKey,
}

impl SecretKey {
    /// Generates a new random secret key using the OS random number generator.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            inner: SigningKey::generate(&mut csprng),
        }
    }

    /// Creates a secret key from a 32-byte seed. Deterministic.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            inner: SigningKey::from_bytes(seed),
        }
    }

    /// Signs a message, producing a 64-byte Ed25519 signature.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.inner.sign(message).to_bytes())
    }

    /// Derives the corresponding public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.inner.verifying_key())
    }

    /// Encodes the secret key as a Stellar seed (S...).
    ///
    /// The returned string is sensitive; avoid logging it.
    pub fn to_strkey(&self) -> String {
        strkey::encode_secret_seed(self.inner.as_bytes())
    }

    /// Parses a secret key from a Stellar seed (S...).
    pub fn from_strkey(s: &str) -> Result<Self, CryptoError> {
        let bytes = strkey::decode_secret_seed(s)?;
        Ok(Self::from_seed(&bytes))
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

impl Clone for SecretKey {
    fn clone(&self) -> Self {
        Self {
            inner: SigningKey::from_bytes(self.inner.as_bytes()),
        }
    }
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0[..8]))
    }
}

impl TryFrom<Signature> for stellar_xdr::curr::Signature {
    type Error = CryptoError;

    fn try_from(sig: Signature) -> Result<Self, Self::Error> {
        Ok(stellar_xdr::curr::Signature(sig.0.to_vec().try_into()?))
    }
}

impl TryFrom<&stellar_xdr::curr::Signature> for Signature {
    type Error = CryptoError;

    fn try_from(xdr: &stellar_xdr::curr::Signature) -> Result<Self, Self::Error> {
        let bytes: [u8; 64] =
            xdr.0
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::InvalidLength {
                    expected: 64,
                    got: xdr.0.len(),
                })?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let secret = SecretKey::generate();
        let public = secret.public_key();
        assert!(public.to_strkey().starts_with('G'));
        assert!(secret.to_strkey().starts_with('S'));
    }

    #[test]
    fn test_seed_is_deterministic() {
        let a = SecretKey::from_seed(&[3u8; 32]);
        let b = SecretKey::from_seed(&[3u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"msg"), b.sign(b"msg"));
    }

    #[test]
    fn test_verify_rejects_other_message() {
        let secret = SecretKey::from_seed(&[9u8; 32]);
        let sig = secret.sign(b"one");
        assert!(secret.public_key().verify(b"one", &sig).is_ok());
        assert!(secret.public_key().verify(b"two", &sig).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secret = SecretKey::from_seed(&[1u8; 32]);
        assert_eq!(format!("{:?}", secret), "SecretKey([REDACTED])");
    }

    #[test]
    fn test_xdr_account_id_roundtrip() {
        let public = SecretKey::from_seed(&[5u8; 32]).public_key();
        let account_id = public.to_account_id();
        assert_eq!(PublicKey::try_from(&account_id).unwrap(), public);
        let muxed = public.to_muxed_account();
        assert_eq!(PublicKey::try_from(&muxed).unwrap(), public);
    }
}
