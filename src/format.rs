//! MarkdownV2 renderers for every reply the bot sends.
//!
//! All interpolated text goes through [`escape`]; the only unescaped markup
//! emitted here is the `*` pair around titles and names.

use crate::market::{
    CoinDetail, GlobalStats, MarketSnapshotRow, PulseListing, PulseSection, TrendingItem,
};
use crate::markup::{bold, escape, escape_opt};

const UP: &str = "🟢";
const DOWN: &str = "🔴";

/// Listings shown per pulse section.
pub const PULSE_ITEMS_PER_SECTION: usize = 5;

/// Insert `,` every three digits of an unsigned integer string.
fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn sign(value: f64) -> &'static str {
    if value < 0.0 {
        "-"
    } else {
        ""
    }
}

/// `$67,234.12` for values of at least one dollar, `$0.00001234` below that.
pub fn format_usd(value: f64) -> String {
    let abs = value.abs();
    let body = if abs >= 1.0 || abs == 0.0 {
        let fixed = format!("{abs:.2}");
        match fixed.split_once('.') {
            Some((int, frac)) => format!("{}.{}", group_digits(int), frac),
            None => group_digits(&fixed),
        }
    } else {
        let fixed = format!("{abs:.8}");
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    };
    format!("{}${}", sign(value), body)
}

/// Whole-dollar amount, e.g. `$1,234,567`.
pub fn format_usd_whole(value: f64) -> String {
    format!("{}${}", sign(value), group_digits(&format!("{:.0}", value.abs())))
}

pub fn format_count(value: u64) -> String {
    group_digits(&value.to_string())
}

/// Trend glyph and `12.34%` text. Zero counts as positive.
pub fn format_percent(value: f64) -> (&'static str, String) {
    let value = if value == 0.0 { 0.0 } else { value };
    let glyph = if value >= 0.0 { UP } else { DOWN };
    (glyph, format!("{value:.2}%"))
}

fn format_btc(value: f64) -> String {
    let fixed = format!("{value:.10}");
    format!("{} BTC", fixed.trim_end_matches('0').trim_end_matches('.'))
}

fn heading(title: &str) -> String {
    bold(&escape(title))
}

fn name_and_symbol(name: &str, symbol: &str) -> String {
    format!(
        "{} \\({}\\)",
        bold(&escape(name)),
        escape(&symbol.to_uppercase())
    )
}

pub fn help() -> String {
    let lines = [
        "/top10 - Top 10 coins by market cap",
        "/trending - Trending coins right now",
        "/global - Global market overview",
        "/pulse - Fresh token listings",
        "/price <coin> - Price details, e.g. /price bitcoin",
        "/help - Show this message",
    ];

    let mut out = heading("📊 Crypto Market Bot");
    out.push_str("\n\n");
    out.push_str(&escape("Live market data at your fingertips. Commands:"));
    out.push_str("\n\n");
    for line in lines {
        out.push_str(&escape(line));
        out.push('\n');
    }
    out
}

pub fn global_stats(stats: &GlobalStats) -> String {
    let mut out = heading("🌍 Global Crypto Market");
    out.push_str("\n\n");
    out.push_str(&format!(
        "💰 Total Market Cap: {}\n",
        escape(&format_usd_whole(stats.total_market_cap_usd))
    ));
    out.push_str(&format!(
        "📊 24h Volume: {}\n",
        escape(&format_usd_whole(stats.total_volume_usd))
    ));
    out.push_str(&format!(
        "₿ BTC Dominance: {}\n",
        escape(&format!("{:.2}%", stats.btc_dominance_percent))
    ));
    out.push_str(&format!(
        "🪙 Active Cryptocurrencies: {}\n",
        escape(&format_count(stats.active_cryptocurrencies))
    ));
    out.push_str(&format!("🏦 Markets: {}\n", escape(&format_count(stats.markets))));
    out
}

fn snapshot_lines(row: &MarketSnapshotRow) -> String {
    let (glyph, change) = format_percent(row.change_24h_percent);
    format!(
        "💵 Price: {}\n{} 24h: {}\n📊 Market Cap: {}\n💹 Volume 24h: {}\n",
        escape(&format_usd(row.current_price)),
        glyph,
        escape(&change),
        escape(&format_usd_whole(row.market_cap)),
        escape(&format_usd_whole(row.volume_24h)),
    )
}

pub fn top10(rows: &[MarketSnapshotRow]) -> String {
    let mut out = heading("🏆 Top 10 Cryptocurrencies");
    out.push_str("\n\n");
    for (i, row) in rows.iter().take(10).enumerate() {
        out.push_str(&format!(
            "{}\\. {}\n",
            i + 1,
            name_and_symbol(&row.name, &row.symbol)
        ));
        out.push_str(&snapshot_lines(row));
        out.push('\n');
    }
    out
}

pub fn trending(items: &[TrendingItem]) -> String {
    let mut out = heading("🔥 Trending Coins");
    out.push_str("\n\n");
    if items.is_empty() {
        out.push_str(&escape("Nothing is trending right now."));
        out.push('\n');
        return out;
    }
    for (i, item) in items.iter().take(10).enumerate() {
        out.push_str(&format!(
            "{}\\. {}\n",
            i + 1,
            name_and_symbol(&item.name, &item.symbol)
        ));
        if let Some(rank) = item.market_cap_rank {
            out.push_str(&format!("🏅 Rank: \\#{rank}\n"));
        }
        if let Some(price) = item.price_btc {
            out.push_str(&format!("₿ Price: {}\n", escape(&format_btc(price))));
        }
        out.push('\n');
    }
    out
}

pub fn coin_detail(detail: &CoinDetail) -> String {
    let row = &detail.snapshot;
    let mut out = format!("💰 {}\n\n", name_and_symbol(&row.name, &row.symbol));
    if let Some(rank) = detail.market_cap_rank {
        out.push_str(&format!("🏅 Rank: \\#{rank}\n"));
    }
    out.push_str(&snapshot_lines(row));
    if let Some(high) = detail.high_24h {
        out.push_str(&format!("⬆️ 24h High: {}\n", escape(&format_usd(high))));
    }
    if let Some(low) = detail.low_24h {
        out.push_str(&format!("⬇️ 24h Low: {}\n", escape(&format_usd(low))));
    }
    out
}

pub fn coin_not_found(query: &str) -> String {
    format!(
        "❌ No coin found for {}\n\n{}",
        bold(&escape(query)),
        escape("Try the full name, e.g. /price bitcoin")
    )
}

/// Present and non-zero.
fn nonzero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

pub fn pulse_listing(index: usize, listing: &PulseListing) -> String {
    let mut out = format!(
        "{}\\. {}\n",
        index,
        name_and_symbol(&listing.name, &listing.symbol)
    );
    if let Some(price) = nonzero(listing.price) {
        out.push_str(&format!("💵 Price: {}\n", escape(&format_usd(price))));
    }
    if let Some(cap) = nonzero(listing.market_cap) {
        out.push_str(&format!("📊 MCap: {}\n", escape(&format_usd_whole(cap))));
    }
    if let Some(volume) = nonzero(listing.volume_24h) {
        out.push_str(&format!("💹 Vol 24h: {}\n", escape(&format_usd_whole(volume))));
    }
    if let Some(holders) = listing.holders.filter(|h| *h != 0) {
        out.push_str(&format!("👥 Holders: {}\n", escape(&format_count(holders))));
    }
    let age = escape_opt(listing.age_label.as_deref());
    if !age.trim().is_empty() {
        out.push_str(&format!("⏱ Age: {age}\n"));
    }
    if let Some(change) = nonzero(listing.change_24h_percent) {
        let (glyph, text) = format_percent(change);
        out.push_str(&format!("{} 24h: {}\n", glyph, escape(&text)));
    }
    if let Some(progress) = nonzero(listing.progress_percent) {
        out.push_str(&format!(
            "📈 Progress: {}\n",
            escape(&format!("{progress:.2}%"))
        ));
    }
    let migrated = escape_opt(listing.migration_time_label.as_deref());
    if !migrated.trim().is_empty() {
        out.push_str(&format!("🎓 Migrated: {migrated}\n"));
    }
    out
}

/// Render each non-empty section under its own heading, at most
/// [`PULSE_ITEMS_PER_SECTION`] listings each.
pub fn pulse(sections: &[(PulseSection, Vec<PulseListing>)]) -> String {
    let mut out = heading("⚡ Pulse: New Token Listings");
    out.push_str("\n\n");

    if sections.iter().all(|(_, listings)| listings.is_empty()) {
        out.push_str(&escape("No new listings right now. Check back soon!"));
        out.push('\n');
        return out;
    }

    for (section, listings) in sections.iter().filter(|(_, l)| !l.is_empty()) {
        out.push_str(&heading(section.title()));
        out.push_str("\n\n");
        for (i, listing) in listings.iter().take(PULSE_ITEMS_PER_SECTION).enumerate() {
            out.push_str(&pulse_listing(i + 1, listing));
            out.push('\n');
        }
    }
    out
}

/// Fixed apology for a command whose data could not be fetched.
pub fn failure(what: &str) -> String {
    format!(
        "❌ {}",
        escape(&format!("Could not fetch {what}. Please try again later."))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, symbol: &str, change: f64) -> MarketSnapshotRow {
        MarketSnapshotRow {
            name: name.to_string(),
            symbol: symbol.to_string(),
            current_price: 1234.5,
            change_24h_percent: change,
            market_cap: 1_000_000.0,
            volume_24h: 25_000.4,
        }
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits("0"), "0");
        assert_eq!(group_digits("999"), "999");
        assert_eq!(group_digits("1000"), "1,000");
        assert_eq!(group_digits("1234567"), "1,234,567");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(67234.123), "$67,234.12");
        assert_eq!(format_usd(1.0), "$1.00");
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(0.5), "$0.5");
        assert_eq!(format_usd(0.000_012_34), "$0.00001234");
        assert_eq!(format_usd(-1500.0), "-$1,500.00");
        assert_eq!(format_usd(999.999), "$1,000.00");
    }

    #[test]
    fn test_format_usd_whole() {
        assert_eq!(format_usd_whole(1_320_000_000_000.4), "$1,320,000,000,000");
        assert_eq!(format_usd_whole(12.0), "$12");
    }

    #[test]
    fn test_format_percent_glyphs() {
        assert_eq!(format_percent(2.346), (UP, "2.35%".to_string()));
        assert_eq!(format_percent(-0.5), (DOWN, "-0.50%".to_string()));
        assert_eq!(format_percent(0.0), (UP, "0.00%".to_string()));
        assert_eq!(format_percent(-0.0), (UP, "0.00%".to_string()));
    }

    #[test]
    fn test_help_is_escaped() {
        let text = help();
        assert!(text.starts_with("*📊 Crypto Market Bot*"));
        assert!(text.contains("/top10 \\- Top 10 coins"));
        assert!(text.contains("/price <coin\\> \\- Price details, e\\.g\\. /price bitcoin"));
    }

    #[test]
    fn test_global_stats() {
        let text = global_stats(&GlobalStats {
            total_market_cap_usd: 2.5e12,
            total_volume_usd: 9.1e10,
            btc_dominance_percent: 52.3,
            active_cryptocurrencies: 12_345,
            markets: 950,
        });
        assert!(text.starts_with("*🌍 Global Crypto Market*"));
        assert!(text.contains("Total Market Cap: $2,500,000,000,000"));
        assert!(text.contains("24h Volume: $91,000,000,000"));
        assert!(text.contains("BTC Dominance: 52\\.30%"));
        assert!(text.contains("Active Cryptocurrencies: 12,345"));
        assert!(text.contains("Markets: 950"));
    }

    #[test]
    fn test_top10_rows_in_order_with_glyphs() {
        let rows: Vec<_> = (0..12)
            .map(|i| {
                let change = if i % 2 == 0 { 1.0 } else { -1.0 };
                row(&format!("Coin{i}"), &format!("c{i}"), change)
            })
            .collect();
        let text = top10(&rows);

        assert_eq!(text.matches("💵 Price:").count(), 10);
        assert!(!text.contains("Coin10"));
        let first = text.find("*Coin0*").unwrap();
        let second = text.find("*Coin1*").unwrap();
        assert!(first < second);
        assert!(text.contains("1\\. *Coin0* \\(C0\\)"));
        assert!(text.contains("🟢 24h: 1\\.00%"));
        assert!(text.contains("🔴 24h: \\-1\\.00%"));
        assert!(text.contains("💵 Price: $1,234\\.50"));
        assert!(text.contains("💹 Volume 24h: $25,000"));
    }

    #[test]
    fn test_trending_optional_fields() {
        let text = trending(&[
            TrendingItem {
                name: "Pepe".into(),
                symbol: "pepe".into(),
                market_cap_rank: Some(30),
                price_btc: Some(0.000_000_15),
            },
            TrendingItem {
                name: "Unranked".into(),
                symbol: "unr".into(),
                market_cap_rank: None,
                price_btc: None,
            },
        ]);
        assert!(text.contains("1\\. *Pepe* \\(PEPE\\)"));
        assert!(text.contains("Rank: \\#30"));
        assert!(text.contains("₿ Price: 0\\.00000015 BTC"));
        assert_eq!(text.matches("Rank:").count(), 1);
    }

    #[test]
    fn test_trending_empty() {
        assert!(trending(&[]).contains("Nothing is trending right now\\."));
    }

    #[test]
    fn test_coin_detail() {
        let text = coin_detail(&CoinDetail {
            snapshot: row("Bitcoin", "btc", 2.5),
            market_cap_rank: Some(1),
            high_24h: Some(1300.0),
            low_24h: None,
        });
        assert!(text.contains("*Bitcoin* \\(BTC\\)"));
        assert!(text.contains("$1,234\\.50"));
        assert!(text.contains("Rank: \\#1"));
        assert!(text.contains("24h High: $1,300\\.00"));
        assert!(!text.contains("24h Low"));
    }

    #[test]
    fn test_coin_not_found_echoes_query() {
        let text = coin_not_found("doesnotexist123");
        assert!(text.contains("*doesnotexist123*"));
        assert!(!text.contains("Price:"));
        assert!(coin_not_found("a.b").contains("*a\\.b*"));
    }

    #[test]
    fn test_pulse_listing_skips_absent_and_zero() {
        let listing = PulseListing {
            name: "Frog".into(),
            symbol: "frog".into(),
            price: Some(0.0012),
            market_cap: Some(0.0),
            holders: Some(0),
            age_label: Some(String::new()),
            change_24h_percent: None,
            progress_percent: Some(0.0),
            ..Default::default()
        };
        let text = pulse_listing(1, &listing);
        assert!(text.starts_with("1\\. *Frog* \\(FROG\\)\n"));
        assert!(text.contains("💵 Price: $0\\.0012"));
        assert!(!text.contains("MCap"));
        assert!(!text.contains("Holders"));
        assert!(!text.contains("Age"));
        assert!(!text.contains("24h:"));
        assert!(!text.contains("Progress"));
        assert!(!text.contains("Migrated"));
    }

    #[test]
    fn test_pulse_listing_renders_present_fields() {
        let listing = PulseListing {
            name: "Frog".into(),
            symbol: "FROG".into(),
            volume_24h: Some(1500.0),
            holders: Some(1200),
            age_label: Some("5m".into()),
            change_24h_percent: Some(-3.0),
            progress_percent: Some(42.5),
            migration_time_label: Some("1h ago".into()),
            ..Default::default()
        };
        let text = pulse_listing(2, &listing);
        assert!(text.contains("Vol 24h: $1,500"));
        assert!(text.contains("Holders: 1,200"));
        assert!(text.contains("Age: 5m"));
        assert!(text.contains("🔴 24h: \\-3\\.00%"));
        assert!(text.contains("Progress: 42\\.50%"));
        assert!(text.contains("Migrated: 1h ago"));
    }

    #[test]
    fn test_pulse_only_non_empty_sections_and_capped() {
        let many: Vec<_> = (0..8)
            .map(|i| PulseListing {
                name: format!("T{i}"),
                symbol: format!("T{i}"),
                ..Default::default()
            })
            .collect();
        let text = pulse(&[
            (PulseSection::NewPairs, many),
            (PulseSection::FinalStretch, Vec::new()),
            (PulseSection::Migrated, Vec::new()),
        ]);
        assert!(text.contains("*🆕 New Pairs*"));
        assert!(!text.contains("Final Stretch"));
        assert!(!text.contains("Migrated*"));
        assert!(text.contains("5\\. *T4*"));
        assert!(!text.contains("*T5*"));
        assert!(!text.contains("No new listings"));
    }

    #[test]
    fn test_pulse_all_empty() {
        let text = pulse(&[
            (PulseSection::NewPairs, Vec::new()),
            (PulseSection::FinalStretch, Vec::new()),
            (PulseSection::Migrated, Vec::new()),
        ]);
        assert!(text.contains("No new listings right now\\."));
        assert!(!text.contains("New Pairs"));
    }

    #[test]
    fn test_failure_is_escaped() {
        assert_eq!(
            failure("top 10 data"),
            "❌ Could not fetch top 10 data\\. Please try again later\\."
        );
    }
}
