//! Cryptographic primitives for questline.
//!
//! - **Ed25519**: key generation, signing and verification via [`SecretKey`]
//!   and [`PublicKey`]
//! - **SHA-256**: [`sha256`] and [`xdr_sha256`] for hashing XDR values
//! - **StrKey**: Stellar's base32 key format (G... account ids, S... seeds)
//! - **Decorated signatures**: [`decorated_signature`] pairs a signature with
//!   the 4-byte hint the ledger uses to find the matching signer
//!
//! # Example
//!
//! ```
//! use questline_crypto::{SecretKey, sha256};
//!
//! let secret = SecretKey::generate();
//! let public = secret.public_key();
//!
//! let signature = secret.sign(b"hello stellar");
//! assert!(public.verify(b"hello stellar", &signature).is_ok());
//!
//! let parsed = questline_crypto::PublicKey::from_strkey(&public.to_strkey()).unwrap();
//! assert_eq!(parsed, public);
//! let _ = sha256(b"stellar");
//! ```

mod error;
mod hash;
mod keys;
mod signature;
mod strkey;

pub use error::CryptoError;
pub use hash::*;
pub use keys::*;
pub use signature::*;
pub use strkey::*;

pub use questline_common::Hash256;
