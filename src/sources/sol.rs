use crate::config::Addresses;
use crate::domain::models::WalletCoin;
use crate::sources::{Analyzer, HttpFetcher, RequestCache};
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Native SOL balances over JSON-RPC `getBalance`.
pub struct SolAnalyzer {
    addresses: Addresses,
    http: HttpFetcher,
    rpc_url: String,
    pace: Duration,
}

impl SolAnalyzer {
    pub fn new(addresses: Addresses, http: HttpFetcher, rpc_url: String, pace: Duration) -> Self {
        Self {
            addresses,
            http,
            rpc_url,
            pace,
        }
    }

    pub fn is_valid_address(address: &str) -> bool {
        bs58::decode(address)
            .into_vec()
            .map(|b| b.len() == 32)
            .unwrap_or(false)
    }

    async fn query(&self, address: &str, cache: &RequestCache) -> anyhow::Result<f64> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [address],
        });
        let resp = self.http.post_json(&self.rpc_url, &body, cache).await?;
        if let Some(err) = resp.get("error") {
            return Err(anyhow!("rpc error for {}: {}", address, err));
        }
        let lamports = resp["result"]["value"]
            .as_f64()
            .ok_or_else(|| anyhow!("missing balance for {}", address))?;
        Ok(lamports / LAMPORTS_PER_SOL)
    }
}

#[async_trait]
impl Analyzer for SolAnalyzer {
    fn analyzer_name(&self) -> &str {
        "SOL Analyzer"
    }

    async fn verify_configs(&self) -> bool {
        self.addresses
            .address_list()
            .iter()
            .all(|a| Self::is_valid_address(a))
    }

    async fn load_portfolio(&self, cache: &RequestCache) -> anyhow::Result<Vec<WalletCoin>> {
        let mut coins = Vec::new();
        for (i, address) in self.addresses.address_list().into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.pace).await;
            }
            let amount = self.query(&address, cache).await?;
            coins.push(WalletCoin::new("SOL", amount, address));
        }
        Ok(coins)
    }
}
