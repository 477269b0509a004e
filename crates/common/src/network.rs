//! Network identity types.
//!
//! A [`NetworkId`] is the SHA-256 of the network passphrase; it is mixed into
//! every transaction hash so a signature produced for one network is never
//! valid on another. [`NetworkContext`] pairs that identity with the endpoint
//! the submission client talks to.

use crate::types::Hash256;

/// Passphrase of the public test network.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Passphrase of the public main network.
pub const MAINNET_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// Network identifier derived from network passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkId(pub Hash256);

impl NetworkId {
    /// Create a network ID from a passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        Self(Hash256::hash(passphrase.as_bytes()))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Stellar public testnet.
    pub fn testnet() -> Self {
        Self::from_passphrase(TESTNET_PASSPHRASE)
    }

    /// Stellar public mainnet.
    pub fn mainnet() -> Self {
        Self::from_passphrase(MAINNET_PASSPHRASE)
    }
}

impl From<NetworkId> for stellar_xdr::curr::Hash {
    fn from(id: NetworkId) -> Self {
        stellar_xdr::curr::Hash(id.0 .0)
    }
}

/// Which ledger network a builder/submission pair targets.
///
/// Created once from configuration and passed by value into every component
/// that signs or submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    /// Base URL of the ledger API (Horizon).
    pub endpoint: String,
    /// Network passphrase; hashed into [`NetworkId`].
    pub passphrase: String,
    /// Funding side-channel, only present on test networks.
    pub friendbot_url: Option<String>,
}

impl NetworkContext {
    pub fn new(endpoint: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            passphrase: passphrase.into(),
            friendbot_url: None,
        }
    }

    pub fn with_friendbot(mut self, url: impl Into<String>) -> Self {
        self.friendbot_url = Some(url.into());
        self
    }

    pub fn testnet() -> Self {
        Self::new("https://horizon-testnet.stellar.org", TESTNET_PASSPHRASE)
            .with_friendbot("https://friendbot.stellar.org")
    }

    pub fn mainnet() -> Self {
        Self::new("https://horizon.stellar.org", MAINNET_PASSPHRASE)
    }

    /// The signature domain for this network.
    pub fn network_id(&self) -> NetworkId {
        NetworkId::from_passphrase(&self.passphrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_ids_differ() {
        assert_ne!(NetworkId::testnet(), NetworkId::mainnet());
        assert!(!NetworkId::testnet().0.is_zero());
    }

    #[test]
    fn test_testnet_id_known_value() {
        assert_eq!(
            NetworkId::testnet().0.to_hex(),
            "cee0302d59844d32bdca915c8203dd44b33fbb7edc19051ea37abedf28ecd472"
        );
    }

    #[test]
    fn test_context_network_id_matches_passphrase() {
        let ctx = NetworkContext::testnet();
        assert_eq!(ctx.network_id(), NetworkId::testnet());
        assert!(ctx.friendbot_url.is_some());
        assert!(NetworkContext::mainnet().friendbot_url.is_none());
    }
}
