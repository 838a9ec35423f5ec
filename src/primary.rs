use tracing::debug;

use crate::consensus::{
    Assessment, Balance, Candidate, ConsensusDecision, MatchContext, Scorer, Verdict,
    VotingPanel, favourite,
};
use crate::markets::detect_team;
use crate::state::{FeedEvent, Market, MarketCategory, Side};

const SECONDARY_MIN: f64 = 1.5;
const SECONDARY_MAX: f64 = 3.0;

/// The 1X2 favourite plus the cheapest secondary market priced in [1.5, 3.0].
/// On equal prices the later market wins.
pub fn primary_candidates(ctx: &MatchContext, secondary: &[Market]) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(2);

    if let Some((outcome, price)) = favourite(&ctx.odds) {
        let mut market = Market::new(
            outcome.market_name(&ctx.home, &ctx.away),
            price,
            MarketCategory::MatchResult,
        );
        market.team = outcome.side();
        let confidence = (100.0 / price).floor().min(95.0);
        out.push(Candidate {
            id: out.len(),
            target_team: market.team.map(|s| ctx.team_name(s).to_string()),
            market,
            outcome: Some(outcome),
            confidence,
            score: confidence,
        });
    }

    let cheapest = secondary
        .iter()
        .filter(|m| m.price >= SECONDARY_MIN && m.price <= SECONDARY_MAX)
        .fold(None::<&Market>, |best, m| match best {
            Some(b) if b.price < m.price => Some(b),
            _ => Some(m),
        });
    if let Some(m) = cheapest {
        let mut market = m.clone();
        if market.team.is_none() {
            market.team = detect_team(&market.name, &ctx.home, &ctx.away);
        }
        let confidence = (100.0 / market.price).floor().min(90.0);
        out.push(Candidate {
            id: out.len(),
            target_team: market.team.map(|s| ctx.team_name(s).to_string()),
            market,
            outcome: None,
            confidence,
            score: confidence,
        });
    }

    out.truncate(2);
    out
}

/// Strength-share heuristic.
pub struct StatisticalScorer;

impl Scorer for StatisticalScorer {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn score(&self, candidate: &Candidate, ctx: &MatchContext) -> Assessment {
        let probability = if candidate.outcome.is_some() {
            let total = ctx.total_strength();
            let share = |side: Side| {
                if total > 0.0 {
                    ctx.strength(side).total() / total * 100.0
                } else {
                    33.0
                }
            };
            let (p1, p2) = (share(Side::Home), share(Side::Away));
            match candidate.target() {
                Some(Side::Home) => p1,
                Some(Side::Away) => p2,
                None => (100.0 - p1 - p2).max(15.0),
            }
        } else {
            (100.0 / candidate.price()).min(85.0)
        };
        Assessment {
            probability,
            confidence: (probability * 0.9).min(90.0),
            verdict: Verdict::by_threshold(probability, 60.0, 40.0),
        }
    }
}

/// Implied probability nudged by how lopsided the 1X2 prices are.
pub struct OddsScorer;

impl Scorer for OddsScorer {
    fn name(&self) -> &'static str {
        "odds"
    }

    fn score(&self, candidate: &Candidate, ctx: &MatchContext) -> Assessment {
        let adjustment = match ctx.balance {
            Balance::VeryBalanced => 0.95,
            Balance::Balanced => 1.0,
            Balance::Medium => 1.05,
            Balance::Unbalanced => 1.1,
        };
        let price = candidate.price();
        let probability = (100.0 / price * adjustment).min(95.0);
        let verdict = if price < 2.0 {
            Verdict::Favorable
        } else if price < 2.5 {
            Verdict::Neutral
        } else {
            Verdict::Unfavorable
        };
        Assessment {
            probability,
            confidence: (probability * 0.85).min(85.0),
            verdict,
        }
    }
}

/// Looks up the margin-free probability of the candidate's outcome.
pub struct SimulationScorer;

impl Scorer for SimulationScorer {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn score(&self, candidate: &Candidate, ctx: &MatchContext) -> Assessment {
        let probability = match candidate.outcome {
            Some(outcome) => match ctx.odds.get(outcome) {
                Some(_) => ctx.probabilities.get(outcome) * 100.0,
                None => 33.0,
            },
            None if candidate.price() > 0.0 => 100.0 / candidate.price(),
            None => 50.0,
        };
        Assessment {
            probability,
            confidence: (probability * 0.8).min(80.0),
            verdict: Verdict::by_threshold(probability, 55.0, 35.0),
        }
    }
}

/// Share of total strength held by the team the candidate backs.
pub struct FormScorer;

impl Scorer for FormScorer {
    fn name(&self) -> &'static str {
        "form"
    }

    fn score(&self, candidate: &Candidate, ctx: &MatchContext) -> Assessment {
        let total = ctx.total_strength();
        let ratio = match candidate.target() {
            Some(side) if total > 0.0 => ctx.strength(side).total() / total,
            _ => 0.33,
        };
        let probability = ratio * 100.0;
        Assessment {
            probability,
            confidence: (probability * 0.75).min(75.0),
            verdict: Verdict::by_threshold(probability, 50.0, 30.0),
        }
    }
}

pub fn primary_panel() -> VotingPanel {
    let mut panel = VotingPanel::new();
    panel.register(Box::new(StatisticalScorer));
    panel.register(Box::new(OddsScorer));
    panel.register(Box::new(SimulationScorer));
    panel.register(Box::new(FormScorer));
    panel
}

/// Runs the primary panel over one event's favourite and best secondary market.
pub fn primary_consensus(event: &FeedEvent, secondary: &[Market]) -> ConsensusDecision {
    let ctx = MatchContext::from_event(event);
    let candidates = primary_candidates(&ctx, secondary);
    let decision = primary_panel().deliberate(&candidates, &ctx);
    debug!(
        match_id = %event.id,
        decision = ?decision.decision_type,
        confidence = decision.collective_confidence,
        chosen = decision.chosen.as_ref().map(|c| c.name()).unwrap_or("-"),
        "primary consensus"
    );
    decision
}
