use serde::Serialize;

use crate::odds::{extract_1x2, implied_probabilities};
use crate::state::{FeedEvent, ImpliedProbability, Market, Odds1X2, Outcome, Side};

/// Position of a candidate within one evaluation round.
pub type OptionId = usize;

/// Confidence attached to a decision no scorer could vote on.
pub const DEFAULT_CONFIDENCE: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: OptionId,
    pub market: Market,
    pub outcome: Option<Outcome>,
    pub target_team: Option<String>,
    pub confidence: f64,
    /// Ranking score before voting. Equal to `confidence` for primary candidates.
    pub score: f64,
}

impl Candidate {
    pub fn name(&self) -> &str {
        &self.market.name
    }

    pub fn price(&self) -> f64 {
        self.market.price
    }

    pub fn target(&self) -> Option<Side> {
        self.market.team
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Balance {
    VeryBalanced,
    Balanced,
    Medium,
    Unbalanced,
}

impl Balance {
    /// Classifies the spread between the longest and shortest 1X2 price.
    pub fn from_odds(odds: &Odds1X2) -> Self {
        let prices: Vec<f64> = odds.present().into_iter().map(|(_, p)| p).collect();
        if prices.is_empty() {
            return Balance::Medium;
        }
        let max = prices.iter().cloned().fold(f64::MIN, f64::max);
        let min = prices.iter().cloned().fold(f64::MAX, f64::min);
        let spread = max - min;
        if spread < 0.5 {
            Balance::VeryBalanced
        } else if spread < 1.0 {
            Balance::Balanced
        } else if spread < 2.0 {
            Balance::Medium
        } else {
            Balance::Unbalanced
        }
    }
}

/// Five-bucket scoring tendency, earliest phase first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StrengthProfile(pub [u32; 5]);

impl StrengthProfile {
    pub const NEUTRAL: StrengthProfile = StrengthProfile([20, 35, 30, 15, 0]);

    pub fn from_win_percent(p: f64) -> Self {
        if p >= 60.0 {
            StrengthProfile([5, 15, 30, 35, 15])
        } else if p >= 45.0 {
            StrengthProfile([10, 25, 35, 25, 5])
        } else if p >= 30.0 {
            StrengthProfile::NEUTRAL
        } else {
            StrengthProfile([35, 40, 20, 5, 0])
        }
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum::<u32>() as f64
    }

    pub fn early(&self) -> f64 {
        (self.0[0] + self.0[1]) as f64
    }

    pub fn late(&self) -> f64 {
        self.0[2..].iter().sum::<u32>() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchContext {
    pub home: String,
    pub away: String,
    pub odds: Odds1X2,
    pub probabilities: ImpliedProbability,
    pub balance: Balance,
    pub favourite: Option<Outcome>,
    pub home_strength: StrengthProfile,
    pub away_strength: StrengthProfile,
    pub goals: u32,
    pub minute: u32,
}

impl MatchContext {
    pub fn from_event(event: &FeedEvent) -> Self {
        let odds = extract_1x2(&event.entries);
        let probabilities = implied_probabilities(&odds);
        let win_percent = |o: Outcome| match odds.get(o) {
            Some(_) => probabilities.get(o) * 100.0,
            None => 33.33,
        };
        Self {
            home: event.home.clone(),
            away: event.away.clone(),
            odds,
            probabilities,
            balance: Balance::from_odds(&odds),
            favourite: favourite(&odds).map(|(o, _)| o),
            home_strength: StrengthProfile::from_win_percent(win_percent(Outcome::Home)),
            away_strength: StrengthProfile::from_win_percent(win_percent(Outcome::Away)),
            goals: event.live.total_goals(),
            minute: event.live.minute.unwrap_or(0),
        }
    }

    pub fn strength(&self, side: Side) -> &StrengthProfile {
        match side {
            Side::Home => &self.home_strength,
            Side::Away => &self.away_strength,
        }
    }

    pub fn team_name(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub(crate) fn total_strength(&self) -> f64 {
        self.home_strength.total() + self.away_strength.total()
    }
}

/// Shortest-priced outcome; home wins ties, then draw.
pub fn favourite(odds: &Odds1X2) -> Option<(Outcome, f64)> {
    odds.present()
        .into_iter()
        .fold(None, |best, (o, p)| match best {
            Some((_, bp)) if bp <= p => best,
            _ => Some((o, p)),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Favorable,
    Neutral,
    Unfavorable,
}

impl Verdict {
    pub fn by_threshold(value: f64, favorable_above: f64, neutral_above: f64) -> Self {
        if value > favorable_above {
            Verdict::Favorable
        } else if value > neutral_above {
            Verdict::Neutral
        } else {
            Verdict::Unfavorable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assessment {
    pub probability: f64,
    pub confidence: f64,
    pub verdict: Verdict,
}

impl Assessment {
    pub fn weighted(&self) -> f64 {
        self.probability * (self.confidence / 100.0)
    }
}

/// One independent heuristic on the panel.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, candidate: &Candidate, ctx: &MatchContext) -> Assessment;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vote {
    pub scorer: &'static str,
    pub preferred: Option<OptionId>,
    pub score: f64,
    pub confidence: f64,
    pub assessments: Vec<Assessment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionType {
    ConsensusStrong,
    Majority,
    Divided,
    Default,
}

impl DecisionType {
    pub fn from_votes(count: usize) -> Self {
        match count {
            0 => DecisionType::Default,
            1 => DecisionType::Divided,
            2 => DecisionType::Majority,
            _ => DecisionType::ConsensusStrong,
        }
    }

    fn status(self) -> &'static str {
        match self {
            DecisionType::ConsensusStrong => "UNANIMOUS CONSENSUS",
            DecisionType::Majority => "MAJORITY AGREES",
            DecisionType::Divided => "SYSTEMS DIVIDED",
            DecisionType::Default => "DEFAULT",
        }
    }
}

pub fn collective_confidence(decision: DecisionType, count: usize) -> f64 {
    let base = match decision {
        DecisionType::ConsensusStrong => 85.0,
        DecisionType::Majority => 70.0,
        DecisionType::Divided => 50.0,
        DecisionType::Default => return DEFAULT_CONFIDENCE,
    };
    (base + 5.0 * count as f64).min(95.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusDecision {
    pub chosen: Option<Candidate>,
    pub decision_type: DecisionType,
    pub collective_confidence: f64,
    pub vote_count: usize,
    pub final_score: f64,
    pub votes: Vec<Vote>,
    pub summary: String,
}

#[derive(Default)]
pub struct VotingPanel {
    scorers: Vec<Box<dyn Scorer>>,
}

impl VotingPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scorers vote in registration order.
    pub fn register(&mut self, scorer: Box<dyn Scorer>) {
        self.scorers.push(scorer);
    }

    pub fn cast_votes(&self, candidates: &[Candidate], ctx: &MatchContext) -> Vec<Vote> {
        self.scorers
            .iter()
            .map(|scorer| {
                let assessments: Vec<Assessment> =
                    candidates.iter().map(|c| scorer.score(c, ctx)).collect();
                let mut preferred = None;
                let mut best = 0.0;
                let mut confidence = 0.0;
                for (candidate, a) in candidates.iter().zip(&assessments) {
                    let s = a.weighted();
                    if s > best {
                        best = s;
                        preferred = Some(candidate.id);
                        confidence = a.confidence;
                    }
                }
                Vote {
                    scorer: scorer.name(),
                    preferred,
                    score: best,
                    confidence,
                    assessments,
                }
            })
            .collect()
    }

    pub fn deliberate(&self, candidates: &[Candidate], ctx: &MatchContext) -> ConsensusDecision {
        let votes = self.cast_votes(candidates, ctx);
        let tally = tally(&votes);

        let Some(&(winner, count, final_score)) = tally
            .iter()
            .fold(None, |best: Option<&(OptionId, usize, f64)>, entry| match best {
                Some(b) if b.1 >= entry.1 => Some(b),
                _ => Some(entry),
            })
        else {
            let chosen = candidates.first().cloned();
            return finish(chosen, DecisionType::Default, 0, 0.0, votes);
        };

        let chosen = candidates.iter().find(|c| c.id == winner).cloned();
        let decision_type = DecisionType::from_votes(count);
        finish(chosen, decision_type, count, final_score, votes)
    }
}

/// Vote counts per option in first-vote order.
fn tally(votes: &[Vote]) -> Vec<(OptionId, usize, f64)> {
    let mut out: Vec<(OptionId, usize, f64)> = Vec::new();
    for vote in votes {
        let Some(id) = vote.preferred else {
            continue;
        };
        match out.iter_mut().find(|(oid, _, _)| *oid == id) {
            Some(entry) => {
                entry.1 += 1;
                entry.2 += vote.score;
            }
            None => out.push((id, 1, vote.score)),
        }
    }
    out
}

fn finish(
    chosen: Option<Candidate>,
    decision_type: DecisionType,
    vote_count: usize,
    final_score: f64,
    votes: Vec<Vote>,
) -> ConsensusDecision {
    let mut decision = ConsensusDecision {
        chosen,
        decision_type,
        collective_confidence: collective_confidence(decision_type, vote_count),
        vote_count,
        final_score,
        votes,
        summary: String::new(),
    };
    decision.summary = render_summary(&decision);
    decision
}

pub fn stake_action(confidence: f64) -> &'static str {
    if confidence >= 80.0 {
        "STAKE RECOMMENDED"
    } else if confidence >= 65.0 {
        "MODERATE STAKE"
    } else if confidence >= 50.0 {
        "CAUTIOUS STAKE"
    } else {
        "AVOID"
    }
}

pub fn render_summary(decision: &ConsensusDecision) -> String {
    let Some(chosen) = &decision.chosen else {
        return "NO CONSENSUS".to_string();
    };
    let on_team = chosen
        .target_team
        .as_deref()
        .map(|t| format!(" on {t}"))
        .unwrap_or_default();
    let votes: Vec<String> = decision
        .votes
        .iter()
        .map(|v| {
            let mark = if v.preferred.is_some() { "✓" } else { "✗" };
            format!("{}: {mark}", capitalize(v.scorer))
        })
        .collect();
    format!(
        "{}: {}{} | Odds: {} | Confidence: {:.1}% | ACTION: {} | Votes: [{}]",
        decision.decision_type.status(),
        chosen.name(),
        on_team,
        chosen.price(),
        decision.collective_confidence,
        stake_action(decision.collective_confidence),
        votes.join(", ")
    )
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MarketCategory;

    struct Fixed {
        name: &'static str,
        scores: Vec<f64>,
    }

    impl Scorer for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn score(&self, candidate: &Candidate, _ctx: &MatchContext) -> Assessment {
            let p = self.scores.get(candidate.id).copied().unwrap_or(0.0);
            Assessment {
                probability: p,
                confidence: 100.0,
                verdict: Verdict::Neutral,
            }
        }
    }

    fn candidates(n: usize) -> Vec<Candidate> {
        (0..n)
            .map(|id| Candidate {
                id,
                market: Market::new(format!("Option {id}"), 1.5 + id as f64, MarketCategory::Other),
                outcome: None,
                target_team: None,
                confidence: 50.0,
                score: 50.0,
            })
            .collect()
    }

    fn panel(scores: &[&[f64]]) -> VotingPanel {
        let names = ["alpha", "beta", "gamma", "delta"];
        let mut panel = VotingPanel::new();
        for (i, s) in scores.iter().enumerate() {
            panel.register(Box::new(Fixed {
                name: names[i],
                scores: s.to_vec(),
            }));
        }
        panel
    }

    fn ctx() -> MatchContext {
        MatchContext::from_event(&FeedEvent::default())
    }

    #[test]
    fn three_agreeing_votes_are_strong() {
        let p = panel(&[&[10.0, 20.0], &[10.0, 30.0], &[5.0, 6.0], &[9.0, 1.0]]);
        let d = p.deliberate(&candidates(2), &ctx());
        assert_eq!(d.decision_type, DecisionType::ConsensusStrong);
        assert_eq!(d.vote_count, 3);
        assert_eq!(d.collective_confidence, 95.0);
        assert_eq!(d.chosen.as_ref().map(|c| c.id), Some(1));
    }

    #[test]
    fn split_two_two_goes_to_first_voted() {
        let p = panel(&[&[10.0, 20.0], &[30.0, 10.0], &[5.0, 6.0], &[9.0, 1.0]]);
        let d = p.deliberate(&candidates(2), &ctx());
        assert_eq!(d.decision_type, DecisionType::Majority);
        assert_eq!(d.collective_confidence, 80.0);
        assert_eq!(d.chosen.as_ref().map(|c| c.id), Some(1));
    }

    #[test]
    fn single_votes_are_divided() {
        let p = panel(&[&[10.0, 0.0, 0.0], &[0.0, 10.0, 0.0], &[0.0, 0.0, 10.0]]);
        let d = p.deliberate(&candidates(3), &ctx());
        assert_eq!(d.decision_type, DecisionType::Divided);
        assert_eq!(d.collective_confidence, 55.0);
        assert_eq!(d.chosen.as_ref().map(|c| c.id), Some(0));
    }

    #[test]
    fn ties_inside_a_scorer_keep_the_first_candidate() {
        let p = panel(&[&[10.0, 10.0]]);
        let votes = p.cast_votes(&candidates(2), &ctx());
        assert_eq!(votes[0].preferred, Some(0));
    }

    #[test]
    fn no_positive_score_falls_back_to_default() {
        let p = panel(&[&[0.0, 0.0], &[0.0, 0.0]]);
        let d = p.deliberate(&candidates(2), &ctx());
        assert_eq!(d.decision_type, DecisionType::Default);
        assert_eq!(d.collective_confidence, DEFAULT_CONFIDENCE);
        assert_eq!(d.chosen.as_ref().map(|c| c.id), Some(0));
        assert!(d.summary.contains("Alpha: ✗"));
    }

    #[test]
    fn empty_round_has_no_choice() {
        let p = panel(&[&[1.0]]);
        let d = p.deliberate(&[], &ctx());
        assert_eq!(d.decision_type, DecisionType::Default);
        assert!(d.chosen.is_none());
        assert_eq!(d.summary, "NO CONSENSUS");
    }

    #[test]
    fn favourite_prefers_home_on_equal_prices() {
        let odds = Odds1X2 {
            home: Some(2.5),
            draw: Some(3.0),
            away: Some(2.5),
        };
        assert_eq!(favourite(&odds), Some((Outcome::Home, 2.5)));
        assert_eq!(Balance::from_odds(&odds), Balance::Balanced);
    }

    #[test]
    fn summary_names_team_and_action() {
        let p = panel(&[&[10.0], &[10.0], &[10.0]]);
        let mut c = candidates(1);
        c[0].target_team = Some("Lyon".to_string());
        let d = p.deliberate(&c, &ctx());
        assert!(d.summary.starts_with("UNANIMOUS CONSENSUS: Option 0 on Lyon | Odds: 1.5"));
        assert!(d.summary.contains("Confidence: 95.0%"));
        assert!(d.summary.contains("ACTION: STAKE RECOMMENDED"));
    }
}
