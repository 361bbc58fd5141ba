//! Built-in mock catalog.
//!
//! Fifteen hand-written markets covering every record shape the feed has to
//! handle: a market with no renderable data (id 1), multi-outcome markets,
//! yes/no markets with and without an explicit chance.

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::types::{MarketRecord, Outcome};
use crate::detail::{Comment, PricePoint};

static MOCK_MARKETS: Lazy<Vec<MarketRecord>> = Lazy::new(build_markets);

static MOCK_COMMENTS: Lazy<Vec<Comment>> = Lazy::new(build_comments);

static MOCK_PRICE_HISTORY: Lazy<Vec<PricePoint>> = Lazy::new(build_price_history);

/// The mock market catalog, in feed order.
pub fn mock_markets() -> &'static [MarketRecord] {
    &MOCK_MARKETS
}

/// Mock comments for the market detail page, newest first.
pub fn mock_comments() -> &'static [Comment] {
    &MOCK_COMMENTS
}

/// Mock monthly price history for the detail chart.
pub fn mock_price_history() -> &'static [PricePoint] {
    &MOCK_PRICE_HISTORY
}

fn pair(a: (&str, Decimal), b: (&str, Decimal)) -> Vec<Outcome> {
    vec![Outcome::new(a.0, a.1), Outcome::new(b.0, b.1)]
}

fn build_markets() -> Vec<MarketRecord> {
    vec![
        MarketRecord::new(1, "When will the Government shutdown end?", "🏛️", "$1m")
            .deadline("Nov 4, 2025"),
        MarketRecord::new(2, "New York City Mayoral Election", "🗽", "$209m")
            .deadline("Nov 4, 2025")
            .outcomes(vec![
                Outcome::new("Zohran Mamdani", dec!(93)).with_change(dec!(1)),
                Outcome::new("Andrew Cuomo", dec!(6)),
            ]),
        MarketRecord::new(3, "Fed decision in October?", "💵", "$99m")
            .deadline("Nov 7, 2025")
            .outcomes(pair(("60+ bps decrease", dec!(3)), ("25 bps decrease", dec!(96)))),
        MarketRecord::new(
            4,
            "What will Trump say during Australia PM events on October...",
            "🇺🇸",
            "$92k",
        )
        .deadline("Oct 31, 2025")
        .outcomes(pair(
            ("Trillion / Million / Billion...", dec!(66)),
            ("China 3+ times", dec!(86)),
        )),
        MarketRecord::new(5, "Israel x Hamas ceasefire cancelled by...?", "🇮🇱", "$858k")
            .deadline("Dec 31, 2025")
            .outcomes(pair(("October 31", dec!(10)), ("December 31", dec!(37)))),
        MarketRecord::new(6, "Will any Louvre heist robbers be arrested by...?", "🎨", "$37k")
            .deadline("Oct 24, 2025")
            .outcomes(pair(("October 20", dec!(5)), ("October 24", dec!(23)))),
        MarketRecord::new(7, "Russia x Ukraine ceasefire in 2025?", "🇷🇺", "$23m")
            .deadline("Dec 31, 2025")
            .outcomes(pair(("Yes", dec!(18)), ("No", dec!(82))))
            .chance(dec!(18)),
        MarketRecord::new(8, "Monad airdrop by...?", "💎", "$11m")
            .deadline("Nov 30, 2025")
            .outcomes(pair(("November 15", dec!(24)), ("November 30", dec!(87)))),
        MarketRecord::new(9, "#1 Searched Person on Google this year?", "🔍", "$3m")
            .deadline("Dec 31, 2025")
            .outcomes(pair(("Pope Leo XIV", dec!(27)), ("Donald Trump", dec!(21)))),
        MarketRecord::new(10, "Will Trump meet with Xi Jinping by October 31?", "🤝", "$2m")
            .deadline("Oct 31, 2025")
            .outcomes(pair(("Yes", dec!(83)), ("No", dec!(17))))
            .chance(dec!(83)),
        MarketRecord::new(11, "100% tariff on China in effect by November 1?", "🇨🇳", "$1.5m")
            .deadline("Nov 1, 2025")
            .outcomes(pair(("Yes", dec!(10)), ("No", dec!(90))))
            .chance(dec!(10)),
        MarketRecord::new(12, "World Series Champion 2025", "⚾", "$5m")
            .deadline("Nov 5, 2025")
            .outcomes(vec![
                Outcome::new("Yankees", dec!(45)).with_change(dec!(2)),
                Outcome::new("Dodgers", dec!(55)).with_change(dec!(-2)),
            ]),
        MarketRecord::new(13, "Will Tesla (TSLA) beat quarterly earnings?", "🚗", "$800k")
            .deadline("Oct 23, 2025")
            .outcomes(vec![
                Outcome::new("Yes", dec!(75)).with_change(dec!(5)),
                Outcome::new("No", dec!(25)).with_change(dec!(-5)),
            ]),
        MarketRecord::new(14, "Bolivia Presidential Election Margin of Victory", "🇧🇴", "$1m")
            .deadline("Nov 1, 2025")
            .outcomes(pair(("Paz by 5-10%", dec!(52)), ("Paz by 0-5%", dec!(1)))),
        MarketRecord::new(15, "US x Venezuela military engagement by...?", "🇻🇪", "$4m")
            .deadline("Oct 31, 2025")
            .outcomes(pair(("October 31", dec!(9)), ("November 30", dec!(30)))),
    ]
}

fn build_comments() -> Vec<Comment> {
    vec![
        Comment::new(1, "jillianhicks", "👩", "768 Curtis Sliwa", "32m ago", "free money", 0),
        Comment::new(2, "bikkon", "👨", "100 Eric Adams", "4h ago", "Eric", 3),
        Comment::new(3, "Common-Authorisa...", "🔵", "1.0K Rudy Giuliani", "8h ago", "Rudi", 6),
        Comment::new(4, "martinsituwcs", "🟣", "1 Zohran Mamdani", "12h ago", "a", 1),
    ]
}

fn build_price_history() -> Vec<PricePoint> {
    let point = |month: &str, zohran: Decimal, andrew: Decimal, curtis: Decimal, eric: Decimal| {
        PricePoint::new(month)
            .with("Zohran Mamdani", zohran)
            .with("Andrew Cuomo", andrew)
            .with("Curtis Sliwa", curtis)
            .with("Eric Adams", eric)
    };

    vec![
        point("Jun", dec!(90), dec!(5), dec!(3), dec!(2)),
        point("Jul", dec!(85), dec!(8), dec!(4), dec!(3)),
        point("Aug", dec!(88), dec!(6), dec!(3), dec!(3)),
        point("Sep", dec!(91), dec!(5), dec!(2), dec!(2)),
        point("Oct", dec!(93), dec!(6), dec!(1), dec!(1)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn mock_catalog_has_fifteen_unique_markets() {
        let markets = mock_markets();
        assert_eq!(markets.len(), 15);

        let ids: HashSet<u64> = markets.iter().map(|m| m.id.0).collect();
        assert_eq!(ids.len(), 15);
        assert_eq!(markets[0].id.0, 1);
        assert_eq!(markets[14].id.0, 15);
    }

    #[test]
    fn first_market_has_no_renderable_signal() {
        let first = &mock_markets()[0];
        assert!(first.outcomes.is_none());
        assert!(first.time_ranges.is_none());
        assert!(first.chance.is_none());
    }

    #[test]
    fn mock_comments_are_newest_first() {
        let comments = mock_comments();
        assert_eq!(comments.len(), 4);
        assert_eq!(comments[0].time_ago, "32m ago");
    }
}
