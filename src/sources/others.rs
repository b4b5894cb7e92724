use crate::config::OtherHolding;
use crate::domain::models::WalletCoin;
use crate::sources::{Analyzer, RequestCache};
use async_trait::async_trait;

/// Manually entered holdings.
pub struct OthersAnalyzer {
    holdings: Vec<OtherHolding>,
}

impl OthersAnalyzer {
    pub const WALLET: &'static str = "others";

    pub fn new(holdings: Vec<OtherHolding>) -> Self {
        Self { holdings }
    }
}

#[async_trait]
impl Analyzer for OthersAnalyzer {
    fn analyzer_name(&self) -> &str {
        "Others Analyzer"
    }

    async fn verify_configs(&self) -> bool {
        self.holdings
            .iter()
            .all(|h| !h.symbol.trim().is_empty() && h.amount.is_finite())
    }

    async fn load_portfolio(&self, _cache: &RequestCache) -> anyhow::Result<Vec<WalletCoin>> {
        Ok(self
            .holdings
            .iter()
            .map(|h| WalletCoin::new(h.symbol.trim().to_uppercase(), h.amount, Self::WALLET))
            .collect())
    }
}
