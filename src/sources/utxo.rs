use crate::config::Addresses;
use crate::domain::models::WalletCoin;
use crate::sources::{Analyzer, HttpFetcher, RequestCache};
use anyhow::anyhow;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

// blockcypher reports balances in the chain's smallest unit
const SATOSHI_PER_COIN: f64 = 100_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtxoChain {
    Btc,
    Doge,
}

impl UtxoChain {
    fn symbol(&self) -> &'static str {
        match self {
            UtxoChain::Btc => "BTC",
            UtxoChain::Doge => "DOGE",
        }
    }

    fn analyzer_name(&self) -> &'static str {
        match self {
            UtxoChain::Btc => "BTC Analyzer",
            UtxoChain::Doge => "DOGE Analyzer",
        }
    }

    pub fn is_valid_address(&self, address: &str) -> bool {
        match self {
            UtxoChain::Btc => {
                if address.to_lowercase().starts_with("bc1") {
                    return matches!(
                        bech32::segwit::decode(address),
                        Ok((hrp, _, _)) if hrp == bech32::hrp::BC
                    );
                }
                address.starts_with(['1', '3']) && base58_len(address) == Some(25)
            }
            UtxoChain::Doge => address.starts_with(['D', 'A', '9']) && base58_len(address) == Some(25),
        }
    }
}

fn base58_len(address: &str) -> Option<usize> {
    bs58::decode(address).into_vec().ok().map(|b| b.len())
}

/// Address balances for UTXO chains through a blockcypher-compatible API.
pub struct UtxoAnalyzer {
    chain: UtxoChain,
    addresses: Addresses,
    http: HttpFetcher,
    base_url: String,
    pace: Duration,
}

impl UtxoAnalyzer {
    pub fn new(chain: UtxoChain, addresses: Addresses, http: HttpFetcher, base_url: String, pace: Duration) -> Self {
        Self {
            chain,
            addresses,
            http,
            base_url,
            pace,
        }
    }

    pub fn btc(addresses: Addresses, http: HttpFetcher, base_url: String, pace: Duration) -> Self {
        Self::new(UtxoChain::Btc, addresses, http, base_url, pace)
    }

    pub fn doge(addresses: Addresses, http: HttpFetcher, base_url: String, pace: Duration) -> Self {
        Self::new(UtxoChain::Doge, addresses, http, base_url, pace)
    }

    async fn query(&self, address: &str, cache: &RequestCache) -> anyhow::Result<f64> {
        let url = format!("{}/addrs/{}/balance", self.base_url.trim_end_matches('/'), address);
        let body = self.http.get_json(&url, cache).await?;
        let units = body["final_balance"]
            .as_f64()
            .ok_or_else(|| anyhow!("missing final_balance for {}", address))?;
        Ok(units / SATOSHI_PER_COIN)
    }
}

#[async_trait]
impl Analyzer for UtxoAnalyzer {
    fn analyzer_name(&self) -> &str {
        self.chain.analyzer_name()
    }

    async fn verify_configs(&self) -> bool {
        self.addresses
            .address_list()
            .iter()
            .all(|a| self.chain.is_valid_address(a))
    }

    async fn load_portfolio(&self, cache: &RequestCache) -> anyhow::Result<Vec<WalletCoin>> {
        let mut coins = Vec::new();
        for (i, address) in self.addresses.address_list().into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.pace).await;
            }
            let amount = self.query(&address, cache).await?;
            debug!(chain = self.chain.symbol(), address = %address, amount, "Loaded balance");
            coins.push(WalletCoin::new(self.chain.symbol(), amount, address));
        }
        Ok(coins)
    }
}
