use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::market::{get_json, PulseListing, PulseSection};

/// Client for the pulse listings provider.
///
/// Unlike the market-data calls, a section fetch never fails: any transport,
/// status or payload problem substitutes the section's sample listing.
pub struct PulseClient {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl PulseClient {
    pub fn new(client: reqwest::Client, base_url: Option<&str>) -> Self {
        Self {
            client,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }

    pub async fn fetch_section(&self, section: PulseSection) -> Vec<PulseListing> {
        let Some(base_url) = &self.base_url else {
            debug!("No pulse provider configured, using sample {} listing", section);
            return fallback_listings(section);
        };

        match self.fetch_live(base_url, section).await {
            Ok(listings) => listings,
            Err(e) => {
                warn!("Pulse section {} unavailable, using sample listing: {:#}", section, e);
                fallback_listings(section)
            }
        }
    }

    async fn fetch_live(
        &self,
        base_url: &str,
        section: PulseSection,
    ) -> Result<Vec<PulseListing>, UpstreamError> {
        let url = format!("{}/pulse/{}", base_url, section.slug());
        let payload: Value = get_json(&self.client, &url, &[]).await?;

        normalize_listings(payload).map_err(|source| UpstreamError::Decode {
            endpoint: url,
            source,
        })
    }
}

/// Accept a bare array, `{"data": [...]}` or `{"tokens": [...]}`.
/// Any other shape is an empty listing.
pub fn normalize_listings(payload: Value) -> Result<Vec<PulseListing>, serde_json::Error> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut record) => match (record.remove("data"), record.remove("tokens")) {
            (Some(Value::Array(items)), _) => items,
            (_, Some(Value::Array(items))) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items.into_iter().map(serde_json::from_value).collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
}

/// Numeric field that may arrive as a JSON number, a numeric string, or null.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberLike>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberLike::Number(n)) => Some(n),
        Some(NumberLike::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_f64(deserializer)?
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64))
}

struct Sample {
    name: &'static str,
    symbol: &'static str,
    price: f64,
    market_cap: f64,
    volume_24h: f64,
    holders: u64,
    age: &'static str,
    change_24h: f64,
    progress: f64,
    migrated: &'static str,
}

#[rustfmt::skip]
const NEW_PAIRS: [Sample; 5] = [
    Sample { name: "Moon Frog", symbol: "MFROG", price: 0.000_042_1, market_cap: 42_100.0, volume_24h: 8_350.0, holders: 112, age: "2m", change_24h: 184.2, progress: 12.5, migrated: "" },
    Sample { name: "Based Cat", symbol: "BCAT", price: 0.000_018_7, market_cap: 18_700.0, volume_24h: 3_120.0, holders: 64, age: "4m", change_24h: 56.8, progress: 6.1, migrated: "" },
    Sample { name: "Turbo Snail", symbol: "TSNAIL", price: 0.000_009_3, market_cap: 9_300.0, volume_24h: 1_480.0, holders: 31, age: "7m", change_24h: -12.4, progress: 3.2, migrated: "" },
    Sample { name: "Laser Eyes", symbol: "LASER", price: 0.000_061_0, market_cap: 61_000.0, volume_24h: 15_900.0, holders: 240, age: "11m", change_24h: 312.0, progress: 21.7, migrated: "" },
    Sample { name: "Gm Token", symbol: "GM", price: 0.000_027_5, market_cap: 27_500.0, volume_24h: 4_010.0, holders: 88, age: "15m", change_24h: 0.0, progress: 9.4, migrated: "" },
];

#[rustfmt::skip]
const FINAL_STRETCH: [Sample; 5] = [
    Sample { name: "Rocket Dog", symbol: "RDOG", price: 0.000_412, market_cap: 412_000.0, volume_24h: 96_500.0, holders: 1_420, age: "1h", change_24h: 642.5, progress: 97.3, migrated: "" },
    Sample { name: "Chad Coin", symbol: "CHAD", price: 0.000_377, market_cap: 377_000.0, volume_24h: 81_200.0, holders: 1_105, age: "2h", change_24h: 410.1, progress: 93.8, migrated: "" },
    Sample { name: "Pixel Ape", symbol: "PXAPE", price: 0.000_351, market_cap: 351_000.0, volume_24h: 60_740.0, holders: 980, age: "48m", change_24h: 288.9, progress: 89.6, migrated: "" },
    Sample { name: "Sol Surfer", symbol: "SURF", price: 0.000_329, market_cap: 329_000.0, volume_24h: 52_300.0, holders: 874, age: "3h", change_24h: -4.7, progress: 86.2, migrated: "" },
    Sample { name: "Bonk Jr", symbol: "BONKJR", price: 0.000_305, market_cap: 305_000.0, volume_24h: 47_800.0, holders: 812, age: "1h", change_24h: 97.0, progress: 81.5, migrated: "" },
];

#[rustfmt::skip]
const MIGRATED: [Sample; 5] = [
    Sample { name: "Giga Brain", symbol: "GIGA", price: 0.002_84, market_cap: 2_840_000.0, volume_24h: 1_250_000.0, holders: 6_310, age: "5h", change_24h: 1_204.0, progress: 0.0, migrated: "12m ago" },
    Sample { name: "Wif Hat 2", symbol: "WIF2", price: 0.001_96, market_cap: 1_960_000.0, volume_24h: 884_000.0, holders: 4_920, age: "9h", change_24h: 733.6, progress: 0.0, migrated: "35m ago" },
    Sample { name: "Neon Panda", symbol: "NPANDA", price: 0.001_12, market_cap: 1_120_000.0, volume_24h: 402_500.0, holders: 3_280, age: "14h", change_24h: 215.3, progress: 0.0, migrated: "1h ago" },
    Sample { name: "Slerf Max", symbol: "SLMAX", price: 0.000_874, market_cap: 874_000.0, volume_24h: 199_000.0, holders: 2_145, age: "1d", change_24h: -22.8, progress: 0.0, migrated: "3h ago" },
    Sample { name: "Hodl Hippo", symbol: "HIPPO", price: 0.000_653, market_cap: 653_000.0, volume_24h: 120_400.0, holders: 1_730, age: "1d", change_24h: 41.9, progress: 0.0, migrated: "6h ago" },
];

/// Fixed sample listing shown when the provider cannot be used.
pub fn fallback_listings(section: PulseSection) -> Vec<PulseListing> {
    let samples = match section {
        PulseSection::NewPairs => &NEW_PAIRS,
        PulseSection::FinalStretch => &FINAL_STRETCH,
        PulseSection::Migrated => &MIGRATED,
    };

    samples
        .iter()
        .map(|s| PulseListing {
            name: s.name.to_string(),
            symbol: s.symbol.to_string(),
            price: Some(s.price),
            market_cap: Some(s.market_cap),
            volume_24h: Some(s.volume_24h),
            holders: Some(s.holders),
            age_label: Some(s.age.to_string()),
            change_24h_percent: Some(s.change_24h),
            progress_percent: Some(s.progress),
            migration_time_label: (!s.migrated.is_empty()).then(|| s.migrated.to_string()),
        })
        .collect()
}
