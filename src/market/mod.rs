pub mod coingecko;
pub mod pulse;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::ProvidersConfig;
use crate::error::UpstreamError;
use crate::market::coingecko::CoinGeckoClient;
use crate::market::pulse::PulseClient;

/// One row of a market listing (top-10 or price lookup).
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshotRow {
    pub name: String,
    pub symbol: String,
    pub current_price: f64,
    pub change_24h_percent: f64,
    pub market_cap: f64,
    pub volume_24h: f64,
}

/// Result of a `/price` lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinDetail {
    pub snapshot: MarketSnapshotRow,
    pub market_cap_rank: Option<u32>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendingItem {
    pub name: String,
    pub symbol: String,
    pub market_cap_rank: Option<u32>,
    pub price_btc: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalStats {
    pub total_market_cap_usd: f64,
    pub total_volume_usd: f64,
    pub btc_dominance_percent: f64,
    pub active_cryptocurrencies: u64,
    pub markets: u64,
}

/// A freshly created token as reported by the pulse provider.
///
/// Only `name` and `symbol` are guaranteed. Optional numeric fields holding
/// zero are treated as absent when rendered.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseListing {
    pub name: String,
    #[serde(alias = "ticker")]
    pub symbol: String,
    #[serde(default, deserialize_with = "pulse::lenient_f64", alias = "priceUsd")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "pulse::lenient_f64", alias = "market_cap")]
    pub market_cap: Option<f64>,
    #[serde(
        default,
        deserialize_with = "pulse::lenient_f64",
        alias = "volume_24h",
        alias = "volume"
    )]
    pub volume_24h: Option<f64>,
    #[serde(default, deserialize_with = "pulse::lenient_u64")]
    pub holders: Option<u64>,
    #[serde(default, rename = "age", alias = "ageLabel")]
    pub age_label: Option<String>,
    #[serde(
        default,
        rename = "change24h",
        alias = "change_24h",
        deserialize_with = "pulse::lenient_f64"
    )]
    pub change_24h_percent: Option<f64>,
    #[serde(default, rename = "progress", deserialize_with = "pulse::lenient_f64")]
    pub progress_percent: Option<f64>,
    #[serde(default, rename = "migrationTime", alias = "migration_time")]
    pub migration_time_label: Option<String>,
}

/// Lifecycle stage of a pulse listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseSection {
    NewPairs,
    FinalStretch,
    Migrated,
}

impl PulseSection {
    pub const ALL: [PulseSection; 3] = [
        PulseSection::NewPairs,
        PulseSection::FinalStretch,
        PulseSection::Migrated,
    ];

    /// Path segment used by the provider endpoint.
    pub fn slug(self) -> &'static str {
        match self {
            PulseSection::NewPairs => "new-pairs",
            PulseSection::FinalStretch => "final-stretch",
            PulseSection::Migrated => "migrated",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PulseSection::NewPairs => "🆕 New Pairs",
            PulseSection::FinalStretch => "🏁 Final Stretch",
            PulseSection::Migrated => "🎓 Migrated",
        }
    }
}

impl std::fmt::Display for PulseSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Everything the command dispatcher needs from the outside world.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn global_stats(&self) -> Result<GlobalStats, UpstreamError>;

    /// Top ten coins by market cap, in provider order.
    async fn top10(&self) -> Result<Vec<MarketSnapshotRow>, UpstreamError>;

    async fn trending(&self) -> Result<Vec<TrendingItem>, UpstreamError>;

    /// `Ok(None)` when the search has no hits.
    async fn search_price(&self, query: &str) -> Result<Option<CoinDetail>, UpstreamError>;

    /// Never fails: provider trouble is replaced by a fixed sample listing.
    async fn pulse_section(&self, section: PulseSection) -> Vec<PulseListing>;
}

/// Live providers: CoinGecko for market data, the pulse API for new listings.
pub struct Providers {
    coingecko: CoinGeckoClient,
    pulse: PulseClient,
}

impl Providers {
    pub fn new(client: reqwest::Client, config: &ProvidersConfig) -> Result<Self> {
        Ok(Self {
            coingecko: CoinGeckoClient::new(client.clone(), &config.coingecko_base_url)?,
            pulse: PulseClient::new(client, config.pulse_base_url.as_deref()),
        })
    }
}

#[async_trait]
impl MarketData for Providers {
    async fn global_stats(&self) -> Result<GlobalStats, UpstreamError> {
        self.coingecko.global_stats().await
    }

    async fn top10(&self) -> Result<Vec<MarketSnapshotRow>, UpstreamError> {
        self.coingecko.top_markets(10).await
    }

    async fn trending(&self) -> Result<Vec<TrendingItem>, UpstreamError> {
        self.coingecko.trending().await
    }

    async fn search_price(&self, query: &str) -> Result<Option<CoinDetail>, UpstreamError> {
        self.coingecko.search_and_fetch(query).await
    }

    async fn pulse_section(&self, section: PulseSection) -> Vec<PulseListing> {
        self.pulse.fetch_section(section).await
    }
}

/// Build the shared HTTP client used for every outbound call.
pub fn http_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}

/// GET `url` and decode the JSON body, mapping every failure to [`UpstreamError`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, UpstreamError> {
    debug!("GET {}", url);

    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|source| UpstreamError::Transport {
            endpoint: url.to_string(),
            source,
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| UpstreamError::Transport {
            endpoint: url.to_string(),
            source,
        })?;

    if !status.is_success() {
        return Err(UpstreamError::Status {
            endpoint: url.to_string(),
            status,
            body,
        });
    }

    serde_json::from_str(&body).map_err(|source| UpstreamError::Decode {
        endpoint: url.to_string(),
        source,
    })
}
