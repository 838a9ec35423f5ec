use serde::Serialize;

use crate::odds::{desc, round_to};
use crate::state::{ImpliedProbability, Market, MarketCategory};

const MIN_EDGE: f64 = 0.05;
const MAX_VALUE_BETS: usize = 5;
const KELLY_CAP: f64 = 0.05;

/// Bankroll the stake attached to each value bet is expressed against.
pub const REFERENCE_BANKROLL: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueGrade {
    Excellent,
    Good,
    Fair,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueBet {
    pub market: String,
    pub price: f64,
    /// Estimated probability in percent.
    pub estimated_probability: f64,
    pub edge: f64,
    pub grade: ValueGrade,
    pub stake: StakeSuggestion,
}

/// Secondary markets whose rough probability estimate beats the quoted
/// price by more than five percent, best edge first.
pub fn value_bets(markets: &[Market], probs: &ImpliedProbability) -> Vec<ValueBet> {
    let mut bets: Vec<ValueBet> = markets
        .iter()
        .filter(|m| m.category != MarketCategory::MatchResult && m.price > 1.0)
        .filter_map(|m| {
            let estimated = estimate_probability(m, probs);
            let edge = estimated / 100.0 * m.price - 1.0;
            if edge <= MIN_EDGE {
                return None;
            }
            let grade = if edge > 0.15 {
                ValueGrade::Excellent
            } else if edge > 0.10 {
                ValueGrade::Good
            } else {
                ValueGrade::Fair
            };
            Some(ValueBet {
                market: m.name.clone(),
                price: m.price,
                estimated_probability: round_to(estimated, 2),
                edge: round_to(edge, 4),
                grade,
                stake: kelly_stake(REFERENCE_BANKROLL, estimated, m.price),
            })
        })
        .collect();
    bets.sort_by(|a, b| desc(a.edge, b.edge));
    bets.truncate(MAX_VALUE_BETS);
    bets
}

fn estimate_probability(market: &Market, probs: &ImpliedProbability) -> f64 {
    match market.category {
        MarketCategory::Totals => {
            let over = over_goals_estimate(probs);
            if market.is_under() { 100.0 - over } else { over }
        }
        MarketCategory::Corners => 55.0,
        MarketCategory::Parity => 50.0,
        _ => 100.0 / market.price,
    }
}

fn over_goals_estimate(probs: &ImpliedProbability) -> f64 {
    let home = probs.home * 100.0;
    let away = probs.away * 100.0;
    if home > 50.0 || away > 50.0 {
        65.0
    } else if home > 40.0 && away > 40.0 {
        70.0
    } else {
        45.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StakeVerdict {
    Excellent,
    Good,
    Cautious,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StakeSuggestion {
    pub fraction: f64,
    pub stake: f64,
    pub verdict: StakeVerdict,
}

/// Kelly fraction capped at five percent of the bankroll.
pub fn kelly_stake(bankroll: f64, probability_percent: f64, price: f64) -> StakeSuggestion {
    let skip = StakeSuggestion {
        fraction: 0.0,
        stake: 0.0,
        verdict: StakeVerdict::Skip,
    };
    if !price.is_finite() || price <= 1.0 || !bankroll.is_finite() || bankroll <= 0.0 {
        return skip;
    }
    let b = price - 1.0;
    let p = (probability_percent / 100.0).clamp(0.0, 1.0);
    let q = 1.0 - p;
    let raw = (b * p - q) / b;
    if raw <= 0.0 {
        return skip;
    }
    let fraction = raw.min(KELLY_CAP);
    let verdict = if fraction > 0.03 {
        StakeVerdict::Excellent
    } else if fraction > 0.01 {
        StakeVerdict::Good
    } else {
        StakeVerdict::Cautious
    };
    StakeSuggestion {
        fraction,
        stake: round_to(bankroll * fraction, 2),
        verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TotalDirection;

    #[test]
    fn kelly_is_capped() {
        let s = kelly_stake(1000.0, 80.0, 2.0);
        assert_eq!(s.fraction, KELLY_CAP);
        assert_eq!(s.stake, 50.0);
        assert_eq!(s.verdict, StakeVerdict::Excellent);
    }

    #[test]
    fn kelly_skips_negative_edge_and_bad_price() {
        assert_eq!(kelly_stake(1000.0, 30.0, 2.0).verdict, StakeVerdict::Skip);
        let bad = kelly_stake(1000.0, 90.0, 1.0);
        assert_eq!(bad.stake, 0.0);
        assert_eq!(bad.verdict, StakeVerdict::Skip);
    }

    #[test]
    fn small_edge_is_cautious() {
        let s = kelly_stake(100.0, 50.4, 2.0);
        assert!(s.fraction > 0.0 && s.fraction < 0.01);
        assert_eq!(s.verdict, StakeVerdict::Cautious);
    }

    #[test]
    fn parity_at_generous_price_is_a_value_bet() {
        let probs = ImpliedProbability {
            home: 0.45,
            draw: 0.25,
            away: 0.30,
        };
        let markets = vec![
            Market::new("Total buts pair", 2.4, MarketCategory::Parity),
            Market::new("Total buts impair", 1.9, MarketCategory::Parity),
            Market::new("Plus de 2.5 buts", 1.5, MarketCategory::Totals)
                .with_total(TotalDirection::Over, 2.5),
        ];
        let bets = value_bets(&markets, &probs);
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].market, "Total buts pair");
        assert_eq!(bets[0].grade, ValueGrade::Excellent);
        assert_eq!(bets[0].stake.verdict, StakeVerdict::Excellent);
        assert_eq!(bets[0].stake.stake, 5.0);
    }
}
