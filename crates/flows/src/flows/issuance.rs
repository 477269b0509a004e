use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use questline_common::Price;
use questline_crypto::SecretKey;
use questline_tx::{Asset, Operation};
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::orchestrator::{Flow, FlowRun, Step};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OfferKind {
    /// Sells XLM without taking offers at the same price.
    PassiveSell,
    Sell,
    /// `amount` is the amount of the asset to buy.
    Buy,
}

impl fmt::Display for OfferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OfferKind::PassiveSell => "passive-sell",
            OfferKind::Sell => "sell",
            OfferKind::Buy => "buy",
        })
    }
}

impl FromStr for OfferKind {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "passive-sell" | "passive" => Ok(OfferKind::PassiveSell),
            "sell" => Ok(OfferKind::Sell),
            "buy" => Ok(OfferKind::Buy),
            other => Err(FlowError::validation(format!("unknown offer kind: {}", other))),
        }
    }
}

/// Trusts an issued asset and offers XLM for it, in one transaction.
///
/// Prices are exact fractions of the asset per XLM. A new offer is always
/// created; existing offers are left alone.
#[derive(Debug, Clone)]
pub struct AssetIssuanceFlow {
    pub trader: SecretKey,
    pub asset: Asset,
    pub kind: OfferKind,
    pub price: Price,
    pub amount: i64,
}

impl AssetIssuanceFlow {
    fn offer(&self) -> Operation {
        let (selling, buying) = (Asset::Native, self.asset.clone());
        match self.kind {
            OfferKind::PassiveSell => {
                Operation::create_passive_sell_offer(selling, buying, self.amount, self.price)
            }
            OfferKind::Sell => Operation::manage_sell_offer(selling, buying, self.amount, self.price, 0),
            OfferKind::Buy => Operation::manage_buy_offer(selling, buying, self.amount, self.price, 0),
        }
    }
}

#[async_trait]
impl Flow for AssetIssuanceFlow {
    type Output = ();

    fn name(&self) -> &str {
        "asset-offer"
    }

    async fn execute(&self, run: &mut FlowRun<'_>) -> Result<()> {
        if self.asset.is_native() {
            return Err(FlowError::validation("offers need an issued counter asset"));
        }
        run.submit(Step::new(
            "trust-and-offer",
            &self.trader,
            vec![
                Operation::change_trust(self.asset.clone(), i64::MAX),
                self.offer(),
            ],
        ))
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_kind_parses_its_display_form() {
        for kind in [OfferKind::PassiveSell, OfferKind::Sell, OfferKind::Buy] {
            assert_eq!(kind.to_string().parse::<OfferKind>().unwrap(), kind);
        }
        assert!("swap".parse::<OfferKind>().is_err());
    }

    #[test]
    fn test_offer_matches_kind() {
        let issuer = SecretKey::from_seed(&[9; 32]).public_key();
        let mut flow = AssetIssuanceFlow {
            trader: SecretKey::from_seed(&[1; 32]),
            asset: Asset::credit("USDC", issuer).unwrap(),
            kind: OfferKind::Buy,
            price: Price { n: 1, d: 10 },
            amount: 5,
        };
        assert_eq!(flow.offer().kind(), "manageBuyOffer");
        flow.kind = OfferKind::PassiveSell;
        assert_eq!(flow.offer().kind(), "createPassiveSellOffer");
    }
}
