use std::collections::HashMap;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::debug;

use crate::error::UpstreamError;
use crate::market::{get_json, CoinDetail, GlobalStats, MarketSnapshotRow, TrendingItem};

/// Currency-keyed amounts, e.g. `{"usd": 1.0, "eur": 0.9}`. Values may be null.
type CurrencyMap = HashMap<String, Option<f64>>;

fn usd(map: &Option<CurrencyMap>) -> Option<f64> {
    map.as_ref()?.get("usd").copied().flatten()
}

#[derive(Debug, Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Debug, Deserialize)]
struct GlobalData {
    #[serde(default)]
    total_market_cap: Option<CurrencyMap>,
    #[serde(default)]
    total_volume: Option<CurrencyMap>,
    #[serde(default)]
    market_cap_percentage: Option<CurrencyMap>,
    #[serde(default)]
    active_cryptocurrencies: u64,
    #[serde(default)]
    markets: u64,
}

#[derive(Debug, Deserialize)]
struct MarketRow {
    name: String,
    symbol: String,
    current_price: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
}

impl From<MarketRow> for MarketSnapshotRow {
    fn from(row: MarketRow) -> Self {
        Self {
            name: row.name,
            symbol: row.symbol,
            current_price: row.current_price.unwrap_or_default(),
            change_24h_percent: row.price_change_percentage_24h.unwrap_or_default(),
            market_cap: row.market_cap.unwrap_or_default(),
            volume_24h: row.total_volume.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    coins: Vec<TrendingCoin>,
}

#[derive(Debug, Deserialize)]
struct TrendingCoin {
    item: TrendingCoinItem,
}

#[derive(Debug, Deserialize)]
struct TrendingCoinItem {
    name: String,
    symbol: String,
    market_cap_rank: Option<u32>,
    price_btc: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    name: String,
    symbol: String,
    market_cap_rank: Option<u32>,
    #[serde(default)]
    market_data: Option<CoinMarketData>,
}

#[derive(Debug, Default, Deserialize)]
struct CoinMarketData {
    #[serde(default)]
    current_price: Option<CurrencyMap>,
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    market_cap: Option<CurrencyMap>,
    #[serde(default)]
    total_volume: Option<CurrencyMap>,
    #[serde(default)]
    high_24h: Option<CurrencyMap>,
    #[serde(default)]
    low_24h: Option<CurrencyMap>,
}

impl From<CoinResponse> for CoinDetail {
    fn from(coin: CoinResponse) -> Self {
        let data = coin.market_data.unwrap_or_default();
        Self {
            snapshot: MarketSnapshotRow {
                name: coin.name,
                symbol: coin.symbol,
                current_price: usd(&data.current_price).unwrap_or_default(),
                change_24h_percent: data.price_change_percentage_24h.unwrap_or_default(),
                market_cap: usd(&data.market_cap).unwrap_or_default(),
                volume_24h: usd(&data.total_volume).unwrap_or_default(),
            },
            market_cap_rank: coin.market_cap_rank,
            high_24h: usd(&data.high_24h),
            low_24h: usd(&data.low_24h),
        }
    }
}

/// Client for the public CoinGecko v3 API.
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl CoinGeckoClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> anyhow::Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .with_context(|| format!("Invalid CoinGecko base URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("CoinGecko base URL cannot take a path: {base_url}");
        }
        Ok(Self { client, base_url })
    }

    /// Base URL with `segments` appended, each percent-encoded on its own.
    fn url(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn global_stats(&self) -> Result<GlobalStats, UpstreamError> {
        let url = self.url(&["global"]);
        let response: GlobalResponse = get_json(&self.client, url.as_str(), &[]).await?;
        let data = response.data;

        Ok(GlobalStats {
            total_market_cap_usd: usd(&data.total_market_cap).unwrap_or_default(),
            total_volume_usd: usd(&data.total_volume).unwrap_or_default(),
            btc_dominance_percent: data
                .market_cap_percentage
                .as_ref()
                .and_then(|m| m.get("btc").copied().flatten())
                .unwrap_or_default(),
            active_cryptocurrencies: data.active_cryptocurrencies,
            markets: data.markets,
        })
    }

    /// Coins ordered by descending market cap. The provider's order is kept as is.
    pub async fn top_markets(&self, count: usize) -> Result<Vec<MarketSnapshotRow>, UpstreamError> {
        let url = self.url(&["coins", "markets"]);
        let per_page = count.to_string();
        let rows: Vec<MarketRow> = get_json(
            &self.client,
            url.as_str(),
            &[
                ("vs_currency", "usd"),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
                ("sparkline", "false"),
            ],
        )
        .await?;

        Ok(rows.into_iter().map(MarketSnapshotRow::from).collect())
    }

    pub async fn trending(&self) -> Result<Vec<TrendingItem>, UpstreamError> {
        let url = self.url(&["search", "trending"]);
        let response: TrendingResponse = get_json(&self.client, url.as_str(), &[]).await?;

        Ok(response
            .coins
            .into_iter()
            .map(|coin| TrendingItem {
                name: coin.item.name,
                symbol: coin.item.symbol,
                market_cap_rank: coin.item.market_cap_rank,
                price_btc: coin.item.price_btc,
            })
            .collect())
    }

    /// Search by free text, then fetch the detail record of the first hit.
    pub async fn search_and_fetch(&self, query: &str) -> Result<Option<CoinDetail>, UpstreamError> {
        let url = self.url(&["search"]);
        let search: SearchResponse =
            get_json(&self.client, url.as_str(), &[("query", query)]).await?;

        let Some(hit) = search.coins.into_iter().next() else {
            debug!("No search hits for '{}'", query);
            return Ok(None);
        };

        let url = self.url(&["coins", hit.id.as_str()]);
        let coin: CoinResponse = get_json(
            &self.client,
            url.as_str(),
            &[
                ("localization", "false"),
                ("tickers", "false"),
                ("community_data", "false"),
                ("developer_data", "false"),
            ],
        )
        .await?;

        Ok(Some(coin.into()))
    }
}
