use serde::{Deserialize, Serialize};

use crate::alternative::ScoredOption;
use crate::analysis::MatchAnalysis;
use crate::odds::round_to;
use crate::state::Market;

const PICK_MIN: f64 = 1.25;
const PICK_MAX: f64 = 2.2;
const FALLBACK_MAX: f64 = 2.1;
const MASTER_MIN_CONFIDENCE: f64 = 50.0;
const TOP_RANKED: usize = 3;

pub const FALLBACK_CONFIDENCE: f64 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickSource {
    Master,
    Top3,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub market: String,
    pub price: f64,
    pub confidence: f64,
    pub source: PickSource,
}

/// One link of the pick chain.
pub trait PickPolicy: Send + Sync {
    fn pick(&self, analysis: &MatchAnalysis) -> Option<Pick>;
}

fn in_window(price: f64, max: f64) -> bool {
    price.is_finite() && (PICK_MIN..=max).contains(&price)
}

/// The primary consensus choice, when confident and in the target band.
pub struct MasterPolicy;

impl PickPolicy for MasterPolicy {
    fn pick(&self, analysis: &MatchAnalysis) -> Option<Pick> {
        let chosen = analysis.primary.chosen.as_ref()?;
        let market = analysis.market(chosen.name())?;
        let confidence = analysis.primary.collective_confidence;
        if confidence < MASTER_MIN_CONFIDENCE || !in_window(market.price, PICK_MAX) {
            return None;
        }
        Some(Pick {
            market: market.name.clone(),
            price: market.price,
            confidence,
            source: PickSource::Master,
        })
    }
}

/// Best composite score among the three highest-ranked secondary options.
pub struct Top3Policy;

impl PickPolicy for Top3Policy {
    fn pick(&self, analysis: &MatchAnalysis) -> Option<Pick> {
        analysis
            .alternative
            .ranked
            .iter()
            .take(TOP_RANKED)
            .filter(|o| in_window(o.market.price, PICK_MAX))
            .fold(None, |best: Option<&ScoredOption>, o| match best {
                Some(b) if b.score >= o.score => Some(b),
                _ => Some(o),
            })
            .map(|o| Pick {
                market: o.market.name.clone(),
                price: o.market.price,
                confidence: o.score,
                source: PickSource::Top3,
            })
    }
}

/// Shortest price on the board within [1.25, 2.1].
pub struct CheapestPolicy;

impl PickPolicy for CheapestPolicy {
    fn pick(&self, analysis: &MatchAnalysis) -> Option<Pick> {
        analysis
            .markets
            .iter()
            .filter(|m| in_window(m.price, FALLBACK_MAX))
            .fold(None, |best: Option<&Market>, m| match best {
                Some(b) if b.price <= m.price => Some(b),
                _ => Some(m),
            })
            .map(|m| Pick {
                market: m.name.clone(),
                price: m.price,
                confidence: FALLBACK_CONFIDENCE,
                source: PickSource::Fallback,
            })
    }
}

pub fn default_policies() -> Vec<Box<dyn PickPolicy>> {
    vec![
        Box::new(MasterPolicy),
        Box::new(Top3Policy),
        Box::new(CheapestPolicy),
    ]
}

/// First pick any policy yields, in order. Confidence is kept to one decimal.
pub fn pick_option(analysis: &MatchAnalysis, policies: &[Box<dyn PickPolicy>]) -> Option<Pick> {
    policies
        .iter()
        .find_map(|p| p.pick(analysis))
        .map(|mut pick| {
            pick.confidence = round_to(pick.confidence, 1);
            pick
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::config::EngineConfig;
    use crate::state::{FeedEvent, GROUP_1X2, MarketEntry};

    fn event(prices: [f64; 3], extra: Vec<MarketEntry>) -> FeedEvent {
        let mut entries: Vec<MarketEntry> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| MarketEntry {
                group: GROUP_1X2,
                kind: i as i64 + 1,
                param: None,
                price: Some(*p),
            })
            .collect();
        entries.extend(extra);
        FeedEvent {
            id: "12".into(),
            home: "Roma".into(),
            away: "Lazio".into(),
            entries,
            ..FeedEvent::default()
        }
    }

    fn totals(kind: i64, line: f64, price: f64) -> MarketEntry {
        MarketEntry {
            group: 2,
            kind,
            param: Some(line),
            price: Some(price),
        }
    }

    #[test]
    fn master_pick_wins_when_in_band() {
        let a = analyze(&event([1.6, 3.8, 5.5], vec![]), &EngineConfig::default(), 0);
        let pick = pick_option(&a, &default_policies());
        let pick = pick.expect("pick");
        assert_eq!(pick.source, PickSource::Master);
        assert_eq!(pick.market, "Plus de 1.5 buts");
        assert_eq!(pick.price, 1.55);
        assert_eq!(pick.confidence, 95.0);
    }

    #[test]
    fn long_prices_everywhere_yield_nothing() {
        let a = analyze(
            &event([2.4, 3.0, 2.9], vec![totals(1, 3.5, 3.5), totals(2, 3.5, 1.2)]),
            &EngineConfig::default(),
            0,
        );
        assert!(pick_option(&a, &default_policies()).is_none());
    }

    #[test]
    fn top3_takes_over_when_master_is_out_of_band() {
        let a = analyze(
            &event([2.4, 3.0, 2.9], vec![totals(1, 1.5, 2.15), totals(2, 1.5, 3.6)]),
            &EngineConfig::default(),
            0,
        );
        assert!(MasterPolicy.pick(&a).is_none());
        let pick = pick_option(&a, &default_policies()).expect("pick");
        assert_eq!(pick.source, PickSource::Top3);
        assert_eq!(pick.market, "Plus de 1.5 buts");
    }

    #[test]
    fn cheapest_policy_uses_fallback_confidence() {
        let a = analyze(
            &event([1.9, 3.4, 4.0], vec![totals(1, 0.5, 1.3)]),
            &EngineConfig::default(),
            0,
        );
        let pick = CheapestPolicy.pick(&a).expect("pick");
        assert_eq!(pick.market, "Plus de 0.5 buts");
        assert_eq!(pick.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(pick.source, PickSource::Fallback);
    }
}
