use serde::Serialize;
use tracing::debug;

use crate::consensus::{
    Assessment, Candidate, ConsensusDecision, MatchContext, Scorer, Verdict, VotingPanel,
};
use crate::markets::{MarketSource, secondary_markets};
use crate::odds::desc;
use crate::state::{FeedEvent, Market, MarketCategory, Side};

const OPTION_MIN: f64 = 1.4;
const OPTION_MAX: f64 = 4.0;
const TOP_OPTIONS: usize = 2;
const LISTED_MARKETS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredOption {
    pub market: Market,
    pub score: f64,
    pub confidence: f64,
}

/// `min(100, 100/price)` plus a category bonus drawn from the strength profiles.
pub fn evaluate_option(market: &Market, ctx: &MatchContext) -> ScoredOption {
    let price_score = (100.0 / market.price).min(100.0);
    let (home, away) = (&ctx.home_strength, &ctx.away_strength);

    let bonus = match market.category {
        MarketCategory::Totals => {
            if market.is_over() {
                (home.late() + away.late()) / 2.0 * 0.3
            } else {
                (home.early() + away.early()) / 4.0 * 0.3
            }
        }
        MarketCategory::Handicap => {
            if (home.total() - away.total()).abs() > 20.0 {
                15.0
            } else {
                5.0
            }
        }
        MarketCategory::Corners => ((home.late() + away.late()) * 0.2).min(20.0),
        MarketCategory::Parity => {
            if market.name.to_lowercase().contains("impair") {
                8.0
            } else {
                5.0
            }
        }
        MarketCategory::Team => match market.team {
            Some(side) => {
                let (own, other) = match side {
                    Side::Home => (home.total(), away.total()),
                    Side::Away => (away.total(), home.total()),
                };
                if own > other { 15.0 } else { -10.0 }
            }
            None => 0.0,
        },
        _ => 0.0,
    };

    ScoredOption {
        market: market.clone(),
        score: (price_score + bonus).clamp(0.0, 100.0),
        confidence: (price_score * 0.8 + bonus * 0.5).min(90.0),
    }
}

/// Every secondary market priced in [1.4, 4.0], best composite score first.
/// Equal scores keep category order, then feed order.
pub fn rank_options(markets: &[Market], ctx: &MatchContext) -> Vec<ScoredOption> {
    let mut ranked: Vec<ScoredOption> = MarketCategory::SECONDARY
        .iter()
        .flat_map(|cat| markets.iter().filter(move |m| m.category == *cat))
        .filter(|m| m.price >= OPTION_MIN && m.price <= OPTION_MAX)
        .map(|m| evaluate_option(m, ctx))
        .collect();
    ranked.sort_by(|a, b| desc(a.score, b.score));
    ranked
}

fn to_candidates(options: &[ScoredOption], ctx: &MatchContext) -> Vec<Candidate> {
    options
        .iter()
        .enumerate()
        .map(|(id, o)| Candidate {
            id,
            market: o.market.clone(),
            outcome: None,
            target_team: o.market.team.map(|s| ctx.team_name(s).to_string()),
            confidence: o.confidence,
            score: o.score,
        })
        .collect()
}

/// Live goals against the market's threshold.
pub struct TotalsScorer;

impl Scorer for TotalsScorer {
    fn name(&self) -> &'static str {
        "totals"
    }

    fn score(&self, candidate: &Candidate, ctx: &MatchContext) -> Assessment {
        let market = &candidate.market;
        let threshold = market.threshold().unwrap_or(2.5);
        let goals = ctx.goals as f64;
        let late = ctx.minute > 80;

        let probability = if market.is_over() {
            if goals >= threshold {
                95.0
            } else if late && threshold - goals > 1.0 {
                15.0
            } else {
                60.0
            }
        } else if market.is_under() {
            if goals >= threshold {
                5.0
            } else if late && goals < threshold - 1.0 {
                90.0
            } else {
                40.0
            }
        } else {
            50.0
        };
        Assessment {
            probability,
            confidence: (probability * 0.9).min(95.0),
            verdict: Verdict::by_threshold(probability, 60.0, 40.0),
        }
    }
}

/// Strength gap in favour of the side the market backs.
pub struct HandicapScorer;

impl Scorer for HandicapScorer {
    fn name(&self) -> &'static str {
        "handicap"
    }

    fn score(&self, candidate: &Candidate, ctx: &MatchContext) -> Assessment {
        let diff = ctx.home_strength.total() - ctx.away_strength.total();
        let gap = match candidate.target() {
            Some(Side::Home) => Some(diff),
            Some(Side::Away) => Some(-diff),
            None => None,
        };
        let probability = match gap {
            Some(g) if g > 10.0 => 75.0,
            Some(g) if g > 0.0 => 65.0,
            Some(_) => 35.0,
            None => 50.0,
        };
        Assessment {
            probability,
            confidence: (probability * 0.8).min(80.0),
            verdict: Verdict::by_threshold(probability, 60.0, 40.0),
        }
    }
}

/// Late-match pressure from both sides.
pub struct CornersScorer;

impl Scorer for CornersScorer {
    fn name(&self) -> &'static str {
        "corners"
    }

    fn score(&self, _candidate: &Candidate, ctx: &MatchContext) -> Assessment {
        let mut expected = 8;
        if ctx.home_strength.late() > 50.0 {
            expected += 2;
        }
        if ctx.away_strength.late() > 50.0 {
            expected += 2;
        }
        let probability = if expected > 9 { 70.0 } else { 50.0 };
        Assessment {
            probability,
            confidence: 70.0,
            verdict: Verdict::by_threshold(probability, 60.0, 40.0),
        }
    }
}

pub struct MarketFormScorer;

impl Scorer for MarketFormScorer {
    fn name(&self) -> &'static str {
        "form"
    }

    fn score(&self, candidate: &Candidate, ctx: &MatchContext) -> Assessment {
        let probability = match candidate.market.category {
            MarketCategory::Team => {
                if ctx.home_strength.total() > ctx.away_strength.total() {
                    60.0
                } else {
                    40.0
                }
            }
            _ => 55.0,
        };
        Assessment {
            probability,
            confidence: (probability * 0.7).min(70.0),
            verdict: Verdict::by_threshold(probability, 60.0, 40.0),
        }
    }
}

pub fn alternative_panel() -> VotingPanel {
    let mut panel = VotingPanel::new();
    panel.register(Box::new(TotalsScorer));
    panel.register(Box::new(HandicapScorer));
    panel.register(Box::new(CornersScorer));
    panel.register(Box::new(MarketFormScorer));
    panel
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternativeReport {
    pub source: MarketSource,
    /// Top two options by composite score.
    pub options: Vec<ScoredOption>,
    pub ranked: Vec<ScoredOption>,
    pub recommended: Option<ScoredOption>,
    pub decision: ConsensusDecision,
    pub markets: Vec<Market>,
}

pub fn alternative_predictions(event: &FeedEvent) -> AlternativeReport {
    let (markets, source) = secondary_markets(event);
    alternative_report(event, markets, source)
}

pub(crate) fn alternative_report(
    event: &FeedEvent,
    markets: Vec<Market>,
    source: MarketSource,
) -> AlternativeReport {
    let ctx = MatchContext::from_event(event);
    let ranked = rank_options(&markets, &ctx);
    let options: Vec<ScoredOption> = ranked.iter().take(TOP_OPTIONS).cloned().collect();
    let candidates = to_candidates(&options, &ctx);
    let decision = alternative_panel().deliberate(&candidates, &ctx);
    debug!(
        match_id = %event.id,
        decision = ?decision.decision_type,
        ranked = ranked.len(),
        "alternative consensus"
    );

    AlternativeReport {
        source,
        recommended: options.first().cloned(),
        options,
        ranked,
        decision,
        markets: markets.into_iter().take(LISTED_MARKETS).collect(),
    }
}
