use crate::domain::models::WalletInfo;
use crate::error::{AppError, RepoResult};
use crate::sources::OthersAnalyzer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_QUERY_SIZE: usize = 10;

/// Process settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub portfolio_config: Option<String>,
    pub price_api_key: String,
    pub endpoints: Endpoints,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub price_api_url: String,
    pub btc_api_url: String,
    pub doge_api_url: String,
    pub sol_rpc_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            price_api_url: "https://pro-api.coinmarketcap.com/v1/cryptocurrency/listings/latest"
                .to_string(),
            btc_api_url: "https://api.blockcypher.com/v1/btc/main".to_string(),
            doge_api_url: "https://api.blockcypher.com/v1/doge/main".to_string(),
            sol_rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
        }
    }
}

impl AppSettings {
    pub fn from_env() -> RepoResult<Self> {
        dotenv::dotenv().ok();
        let defaults = Endpoints::default();

        Ok(AppSettings {
            database_url: env_var_or_default(
                "DATABASE_URL",
                "sqlite://data/portfolio.db?mode=rwc".to_string(),
            )?,
            server_host: env_var_or_default("SERVER_HOST", "127.0.0.1".to_string())?,
            server_port: env_var_or_default("SERVER_PORT", 3001)?,
            portfolio_config: std::env::var("PORTFOLIO_CONFIG").ok(),
            price_api_key: std::env::var("PRICE_API_KEY").unwrap_or_default(),
            endpoints: Endpoints {
                price_api_url: env_var_or_default("PRICE_API_URL", defaults.price_api_url)?,
                btc_api_url: env_var_or_default("BTC_API_URL", defaults.btc_api_url)?,
                doge_api_url: env_var_or_default("DOGE_API_URL", defaults.doge_api_url)?,
                sol_rpc_url: env_var_or_default("SOL_RPC_URL", defaults.sol_rpc_url)?,
            },
            http_timeout: Duration::from_secs(env_var_or_default("HTTP_TIMEOUT_SECS", 20)?),
        })
    }
}

fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> RepoResult<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|e| AppError::Config(format!("failed to parse {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

// Portfolio configuration, stored as JSON in the snapshot database.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default)]
    pub exchanges: Vec<ExchangeConfig>,
    #[serde(default)]
    pub erc20: Addresses,
    #[serde(default)]
    pub btc: Addresses,
    #[serde(default)]
    pub sol: Addresses,
    #[serde(default)]
    pub doge: Addresses,
    #[serde(default)]
    pub others: Vec<OtherHolding>,
    #[serde(default)]
    pub configs: Options,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeConfig {
    pub name: String,
    pub init_params: ExchangeCredentials,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeCredentials {
    pub api_key: String,
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Addresses {
    #[serde(default)]
    pub addresses: Vec<AddressEntry>,
}

/// An address is either a bare string or `{address, alias}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressEntry {
    Plain(String),
    Aliased {
        address: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
}

impl AddressEntry {
    pub fn address(&self) -> &str {
        match self {
            AddressEntry::Plain(a) => a,
            AddressEntry::Aliased { address, .. } => address,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            AddressEntry::Plain(_) => None,
            AddressEntry::Aliased { alias, .. } => alias.as_deref(),
        }
    }
}

impl Addresses {
    pub fn address_list(&self) -> Vec<String> {
        self.addresses
            .iter()
            .map(|a| a.address().trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherHolding {
    pub symbol: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    #[serde(default, rename = "groupUSD")]
    pub group_usd: bool,
    #[serde(default = "default_query_size")]
    pub query_size: usize,
    // Display currency for clients; stored and returned untouched, every
    // computed value stays in USD.
    #[serde(default = "default_currency")]
    pub prefer_currency: String,
}

fn default_query_size() -> usize {
    DEFAULT_QUERY_SIZE
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for Options {
    fn default() -> Self {
        Self {
            group_usd: false,
            query_size: DEFAULT_QUERY_SIZE,
            prefer_currency: default_currency(),
        }
    }
}

impl GlobalConfig {
    pub fn from_json(raw: &str) -> RepoResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> RepoResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Wallet type and alias keyed by the wallet string the adapters record.
    pub fn wallet_infos(&self) -> HashMap<String, WalletInfo> {
        let mut infos = HashMap::new();
        let chains = [
            ("ERC20", &self.erc20),
            ("BTC", &self.btc),
            ("SOL", &self.sol),
            ("DOGE", &self.doge),
        ];
        for (wallet_type, addresses) in chains {
            for entry in &addresses.addresses {
                let address = entry.address().trim();
                if address.is_empty() {
                    continue;
                }
                infos.insert(
                    address.to_string(),
                    WalletInfo {
                        wallet_type: Some(wallet_type.to_string()),
                        wallet_alias: entry.alias().map(str::to_string),
                    },
                );
            }
        }
        infos.insert(
            OthersAnalyzer::WALLET.to_string(),
            WalletInfo {
                wallet_type: Some("Others".to_string()),
                wallet_alias: None,
            },
        );
        infos
    }
}
