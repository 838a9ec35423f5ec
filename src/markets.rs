use serde::Serialize;

use crate::odds::{extract_1x2, implied_probabilities, round_to};
use crate::state::{
    FeedEvent, GROUP_1X2, Market, MarketCategory, MarketEntry, Outcome, Side, TotalDirection,
};

/// Quotes below this are treated as feed noise.
pub const MIN_PLAUSIBLE_PRICE: f64 = 1.1;

const GROUP_TOTALS: i64 = 2;
const GROUP_ASIAN_HANDICAP: i64 = 3;
const GROUP_EURO_HANDICAP: i64 = 4;
const GROUP_PARITY: i64 = 5;
const GROUP_CORNERS: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSource {
    Feed,
    Synthetic,
}

/// Maps every non-1X2 entry with a plausible price to a named, categorized market.
pub fn categorize(event: &FeedEvent) -> Vec<Market> {
    event
        .entries
        .iter()
        .filter(|e| e.group != GROUP_1X2)
        .filter_map(|e| {
            let price = e.price.filter(|p| p.is_finite() && *p >= MIN_PLAUSIBLE_PRICE)?;
            Some(categorize_entry(e, price, event))
        })
        .collect()
}

fn categorize_entry(entry: &MarketEntry, price: f64, event: &FeedEvent) -> Market {
    let param = entry.param.filter(|p| p.is_finite());
    match (entry.group, entry.kind, param) {
        (GROUP_TOTALS, 1, _) => {
            let line = param.unwrap_or(2.5);
            Market::new(format!("Plus de {line} buts"), price, MarketCategory::Totals)
                .with_total(TotalDirection::Over, line)
        }
        (GROUP_TOTALS, 2, _) => {
            let line = param.unwrap_or(2.5);
            Market::new(format!("Moins de {line} buts"), price, MarketCategory::Totals)
                .with_total(TotalDirection::Under, line)
        }
        (GROUP_ASIAN_HANDICAP, _, Some(p)) => Market::new(
            format!("Handicap {} {}", event.home, signed(p)),
            price,
            MarketCategory::Handicap,
        )
        .with_line(p)
        .with_team(Side::Home),
        (GROUP_EURO_HANDICAP, _, Some(p)) => Market::new(
            format!("Handicap européen {}", signed(p)),
            price,
            MarketCategory::Handicap,
        )
        .with_line(p),
        (GROUP_PARITY, 1, _) => Market::new("Total buts pair", price, MarketCategory::Parity),
        (GROUP_PARITY, _, _) => Market::new("Total buts impair", price, MarketCategory::Parity),
        (GROUP_CORNERS, 1, _) => {
            let line = param.unwrap_or(9.0);
            Market::new(format!("Plus de {line} corners"), price, MarketCategory::Corners)
                .with_total(TotalDirection::Over, line)
        }
        (GROUP_CORNERS, 2, _) => {
            let line = param.unwrap_or(9.0);
            Market::new(format!("Moins de {line} corners"), price, MarketCategory::Corners)
                .with_total(TotalDirection::Under, line)
        }
        (group, _, Some(p)) => generic(format!("Marché {group} ({p})"), price, event),
        (group, _, None) => generic(format!("Marché alt. {group}"), price, event),
    }
}

fn generic(name: String, price: f64, event: &FeedEvent) -> Market {
    let category = classify_name(&name, &event.home, &event.away);
    let mut market = Market::new(name, price, category);
    market.team = detect_team(&market.name, &event.home, &event.away);
    market
}

fn signed(p: f64) -> String {
    if p > 0.0 { format!("+{p}") } else { format!("{p}") }
}

/// Keyword classification for markets known only by name.
pub fn classify_name(name: &str, home: &str, away: &str) -> MarketCategory {
    let n = name.to_lowercase();
    let has = |keys: &[&str]| keys.iter().any(|k| n.contains(k));

    if has(&["corner"]) {
        MarketCategory::Corners
    } else if has(&["impair", "pair", "even", "odd"]) {
        MarketCategory::Parity
    } else if has(&["plus de", "moins de", "total", "over", "under"]) {
        MarketCategory::Totals
    } else if has(&["handicap"]) {
        MarketCategory::Handicap
    } else if has(&["mi-temps", "half", "1ère", "2ème"]) {
        MarketCategory::HalfTime
    } else if detect_team(name, home, away).is_some() {
        MarketCategory::Team
    } else {
        MarketCategory::Other
    }
}

/// Team a market name refers to, by team name or the feed's `O1`/`O2` tags.
pub fn detect_team(name: &str, home: &str, away: &str) -> Option<Side> {
    let n = name.to_lowercase();
    let mentions = |team: &str, tag: &str| {
        let team = team.trim().to_lowercase();
        (!team.is_empty() && n.contains(&team)) || n.contains(tag)
    };
    if mentions(home, "o1") {
        Some(Side::Home)
    } else if mentions(away, "o2") {
        Some(Side::Away)
    } else {
        None
    }
}

/// Attacking tendency derived from the 1X2 probabilities. Absent outcomes
/// count as 0.33.
pub fn attack_index(home: f64, draw: f64, away: f64) -> f64 {
    let or_default = |p: f64| if p > 0.0 { p } else { 0.33 };
    let (p1, px, p2) = (or_default(home), or_default(draw), or_default(away));
    0.5 * (p1 + p2) + 0.3 * (1.0 - px)
}

/// Under price that pairs with `over` at zero margin.
pub fn complementary_price(over: f64) -> f64 {
    1.0 / (1.0 - 1.0 / over)
}

/// Deterministic fallback menu built from the 1X2 prices alone.
pub fn synthetic_markets(event: &FeedEvent) -> Vec<Market> {
    let probs = implied_probabilities(&extract_1x2(&event.entries));
    let attack = attack_index(probs.home, probs.draw, probs.away);

    let over_05 = band(attack, 0.7, 0.5, [1.25, 1.45, 1.65]);
    let over_15 = band(attack, 0.6, 0.4, [1.55, 1.85, 2.2]);
    let over_25 = band(attack, 0.5, 0.3, [2.1, 2.5, 3.0]);

    let mut out = Vec::with_capacity(10);
    for (line, over) in [(0.5, over_05), (1.5, over_15), (2.5, over_25)] {
        out.push(
            Market::new(format!("Plus de {line} buts"), round_to(over, 2), MarketCategory::Totals)
                .with_total(TotalDirection::Over, line),
        );
        out.push(
            Market::new(
                format!("Moins de {line} buts"),
                round_to(complementary_price(over), 2),
                MarketCategory::Totals,
            )
            .with_total(TotalDirection::Under, line),
        );
    }
    out.push(Market::new("Total buts pair", 1.95, MarketCategory::Parity));
    out.push(Market::new("Total buts impair", 1.9, MarketCategory::Parity));

    let home_p = if probs.home > 0.0 { probs.home } else { 0.33 };
    let away_p = if probs.away > 0.0 { probs.away } else { 0.33 };
    out.push(
        Market::new(
            format!("{} marque", event.home),
            band(home_p, 0.4, 0.3, [2.0, 2.3, 2.6]),
            MarketCategory::Team,
        )
        .with_team(Side::Home),
    );
    out.push(
        Market::new(
            format!("{} marque", event.away),
            band(away_p, 0.4, 0.3, [2.0, 2.3, 2.6]),
            MarketCategory::Team,
        )
        .with_team(Side::Away),
    );
    out
}

fn band(v: f64, hi: f64, mid: f64, prices: [f64; 3]) -> f64 {
    if v > hi {
        prices[0]
    } else if v > mid {
        prices[1]
    } else {
        prices[2]
    }
}

/// Feed markets when any survive categorization, otherwise the synthetic menu.
pub fn secondary_markets(event: &FeedEvent) -> (Vec<Market>, MarketSource) {
    let from_feed = categorize(event);
    if !from_feed.is_empty() {
        return (from_feed, MarketSource::Feed);
    }
    (synthetic_markets(event), MarketSource::Synthetic)
}

/// Named 1X2 markets followed by the secondary markets.
pub fn betting_markets(event: &FeedEvent) -> Vec<Market> {
    let odds = extract_1x2(&event.entries);
    let mut out: Vec<Market> = odds
        .present()
        .into_iter()
        .map(|(outcome, price)| {
            let mut m = Market::new(
                outcome.market_name(&event.home, &event.away),
                price,
                MarketCategory::MatchResult,
            );
            m.team = Outcome::side(outcome);
            m
        })
        .collect();
    out.extend(secondary_markets(event).0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(group: i64, kind: i64, param: Option<f64>, price: f64) -> MarketEntry {
        MarketEntry {
            group,
            kind,
            param,
            price: Some(price),
        }
    }

    fn event(entries: Vec<MarketEntry>) -> FeedEvent {
        FeedEvent {
            id: "9".into(),
            home: "Porto".into(),
            away: "Braga".into(),
            entries,
            ..FeedEvent::default()
        }
    }

    #[test]
    fn group_codes_map_to_names() {
        let ev = event(vec![
            entry(1, 1, None, 2.0),
            entry(2, 1, Some(1.5), 1.7),
            entry(2, 2, None, 2.1),
            entry(3, 7, Some(-1.0), 2.4),
            entry(4, 1, Some(2.0), 3.1),
            entry(5, 1, None, 1.9),
            entry(5, 2, None, 1.9),
            entry(6, 1, None, 1.8),
            entry(17, 9, Some(3.0), 1.6),
            entry(42, 1, None, 1.6),
        ]);
        let names: Vec<String> = categorize(&ev).into_iter().map(|m| m.name).collect();
        assert_eq!(
            names,
            vec![
                "Plus de 1.5 buts",
                "Moins de 2.5 buts",
                "Handicap Porto -1",
                "Handicap européen +2",
                "Total buts pair",
                "Total buts impair",
                "Plus de 9 corners",
                "Marché 17 (3)",
                "Marché alt. 42",
            ]
        );
    }

    #[test]
    fn implausible_prices_are_dropped() {
        let ev = event(vec![
            entry(2, 1, Some(0.5), 1.05),
            MarketEntry {
                group: 2,
                kind: 2,
                param: Some(0.5),
                price: None,
            },
        ]);
        assert!(categorize(&ev).is_empty());
    }

    #[test]
    fn parity_is_not_a_total() {
        let ev = event(vec![entry(5, 1, None, 1.9)]);
        assert_eq!(categorize(&ev)[0].category, MarketCategory::Parity);
        assert_eq!(
            classify_name("Total buts impair", "A", "B"),
            MarketCategory::Parity
        );
    }

    #[test]
    fn names_classify_by_keyword() {
        assert_eq!(
            classify_name("Plus de 1.5 buts 1ère mi-temps", "A", "B"),
            MarketCategory::Totals
        );
        assert_eq!(
            classify_name("Vainqueur 1ère période", "A", "B"),
            MarketCategory::HalfTime
        );
        assert_eq!(
            classify_name("Porto marque", "Porto", "Braga"),
            MarketCategory::Team
        );
        assert_eq!(classify_name("Marché 99", "A", "B"), MarketCategory::Other);
    }

    #[test]
    fn synthetic_under_complements_over() {
        for attack_prices in [1.25, 1.45, 1.65, 1.55, 1.85, 2.2, 2.1, 2.5, 3.0] {
            let under = round_to(complementary_price(attack_prices), 2);
            let implied = 1.0 / attack_prices + 1.0 / under;
            assert!((implied - 1.0).abs() < 0.005, "{attack_prices}: {implied}");
        }
    }

    #[test]
    fn synthetic_menu_is_used_when_feed_has_none() {
        let ev = event(vec![
            entry(1, 1, None, 2.0),
            entry(1, 2, None, 3.2),
            entry(1, 3, None, 3.5),
        ]);
        let (markets, source) = secondary_markets(&ev);
        assert_eq!(source, MarketSource::Synthetic);
        assert_eq!(markets.len(), 10);
        assert_eq!(markets[0].name, "Plus de 0.5 buts");
        assert_eq!(markets[0].price, 1.45);
        assert_eq!(markets[1].price, 3.22);
        assert_eq!(markets[8].name, "Porto marque");
        assert_eq!(markets[8].price, 2.0);
        assert_eq!(markets[9].price, 2.6);

        let again = synthetic_markets(&ev);
        assert_eq!(again, markets);
    }

    #[test]
    fn betting_markets_lead_with_results() {
        let ev = event(vec![
            entry(1, 1, None, 2.0),
            entry(1, 3, None, 3.5),
            entry(2, 1, Some(2.5), 1.9),
        ]);
        let names: Vec<String> = betting_markets(&ev).into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Victoire Porto", "Victoire Braga", "Plus de 2.5 buts"]);
    }
}
