use serde::Serialize;

use crate::alternative::{AlternativeReport, alternative_report};
use crate::config::EngineConfig;
use crate::consensus::ConsensusDecision;
use crate::markets::{betting_markets, secondary_markets};
use crate::odds::{PredictionReport, UltimateReport, predict, ultimate_predictions};
use crate::primary::primary_consensus;
use crate::state::{FeedEvent, Market};
use crate::upcoming::event_is_upcoming;
use crate::value::{ValueBet, value_bets};

/// Per-match payload consumed by the coupon builder and ticket validator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchAnalysis {
    pub id: String,
    pub home: String,
    pub away: String,
    pub league: String,
    pub start_unix: i64,
    pub upcoming: bool,
    pub prediction: PredictionReport,
    pub ultimate: UltimateReport,
    /// Named 1X2 markets first, then secondary markets.
    pub markets: Vec<Market>,
    pub primary: ConsensusDecision,
    pub alternative: AlternativeReport,
    pub value_bets: Vec<ValueBet>,
}

impl MatchAnalysis {
    pub fn market(&self, name: &str) -> Option<&Market> {
        self.markets.iter().find(|m| m.name == name)
    }

    pub fn teams(&self) -> String {
        format!("{} vs {}", self.home, self.away)
    }
}

pub fn analyze(event: &FeedEvent, cfg: &EngineConfig, now_unix: i64) -> MatchAnalysis {
    let prediction = predict(event);
    let ultimate = ultimate_predictions(event, cfg.ultimate_min_odds);
    let (secondary, source) = secondary_markets(event);
    let primary = primary_consensus(event, &secondary);
    let value_bets = value_bets(&secondary, &prediction.probabilities);
    let alternative = alternative_report(event, secondary, source);

    MatchAnalysis {
        id: event.id.clone(),
        home: event.home.clone(),
        away: event.away.clone(),
        league: event.league.clone(),
        start_unix: event.start_unix,
        upcoming: event_is_upcoming(event, now_unix),
        prediction,
        ultimate,
        markets: betting_markets(event),
        primary,
        alternative,
        value_bets,
    }
}
