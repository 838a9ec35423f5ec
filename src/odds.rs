use std::cmp::Ordering;

use serde::Serialize;

use crate::state::{FeedEvent, GROUP_1X2, ImpliedProbability, MarketEntry, Odds1X2, Outcome};

/// Pulls home/draw/away prices out of the raw entries. Non-finite or
/// non-positive prices leave the outcome absent.
pub fn extract_1x2(entries: &[MarketEntry]) -> Odds1X2 {
    let mut odds = Odds1X2::default();
    for entry in entries {
        if entry.group != GROUP_1X2 {
            continue;
        }
        let Some(outcome) = Outcome::from_kind(entry.kind) else {
            continue;
        };
        let Some(price) = usable_price(entry.price) else {
            continue;
        };
        let slot = match outcome {
            Outcome::Home => &mut odds.home,
            Outcome::Draw => &mut odds.draw,
            Outcome::Away => &mut odds.away,
        };
        if slot.is_none() {
            *slot = Some(price);
        }
    }
    odds
}

fn usable_price(raw: Option<f64>) -> Option<f64> {
    raw.filter(|p| p.is_finite() && *p > 0.0)
}

/// Margin-free implied probabilities over the present outcomes.
pub fn implied_probabilities(odds: &Odds1X2) -> ImpliedProbability {
    let present = odds.present();
    let sum: f64 = present.iter().map(|(_, p)| 1.0 / p).sum();
    let mut probs = ImpliedProbability::default();
    if sum <= 0.0 {
        return probs;
    }
    for (outcome, price) in present {
        let p = (1.0 / price) / sum;
        match outcome {
            Outcome::Home => probs.home = p,
            Outcome::Draw => probs.draw = p,
            Outcome::Away => probs.away = p,
        }
    }
    probs
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAssessment {
    pub outcome: Outcome,
    pub price: f64,
    pub probability: f64,
    pub fair_odds: f64,
    /// `fair_odds / price - 1`; negative when the quote is longer than fair.
    pub value_index: f64,
}

pub fn assess_value(odds: &Odds1X2, probs: &ImpliedProbability) -> Vec<ValueAssessment> {
    odds.present()
        .into_iter()
        .filter_map(|(outcome, price)| {
            let probability = probs.get(outcome);
            if probability <= 0.0 {
                return None;
            }
            let fair_odds = 1.0 / probability;
            Some(ValueAssessment {
                outcome,
                price,
                probability,
                fair_odds,
                value_index: fair_odds / price - 1.0,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedOutcome {
    pub outcome: Outcome,
    pub market: String,
    pub team: Option<String>,
    pub price: f64,
    pub probability: f64,
    pub value_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub outcome: Outcome,
    pub market: String,
    pub team: Option<String>,
    pub price: f64,
    pub probability: f64,
    /// Winning probability as a whole percentage, capped at 100.
    pub confidence: u8,
    pub value_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    pub odds: Odds1X2,
    pub probabilities: ImpliedProbability,
    pub ranked: Vec<RankedOutcome>,
    pub prediction: Option<Prediction>,
}

fn ranked_outcomes(event: &FeedEvent, odds: &Odds1X2) -> Vec<RankedOutcome> {
    let probs = implied_probabilities(odds);
    assess_value(odds, &probs)
        .into_iter()
        .map(|v| RankedOutcome {
            outcome: v.outcome,
            market: v.outcome.market_name(&event.home, &event.away),
            team: team_name(event, v.outcome),
            price: v.price,
            probability: v.probability,
            value_index: v.value_index,
        })
        .collect()
}

fn team_name(event: &FeedEvent, outcome: Outcome) -> Option<String> {
    match outcome {
        Outcome::Home => Some(event.home.clone()),
        Outcome::Away => Some(event.away.clone()),
        Outcome::Draw => None,
    }
}

/// Ranks the present outcomes by probability; `prediction` is `None`
/// when the event carries no usable result prices.
pub fn predict(event: &FeedEvent) -> PredictionReport {
    let odds = extract_1x2(&event.entries);
    let probabilities = implied_probabilities(&odds);
    let mut ranked = ranked_outcomes(event, &odds);
    ranked.sort_by(|a, b| desc(a.probability, b.probability));

    let prediction = ranked.first().map(|top| Prediction {
        outcome: top.outcome,
        market: top.market.clone(),
        team: top.team.clone(),
        price: top.price,
        probability: top.probability,
        confidence: (top.probability * 100.0).round().clamp(0.0, 100.0) as u8,
        value_index: top.value_index,
    });

    PredictionReport {
        odds,
        probabilities,
        ranked,
        prediction,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UltimateReport {
    pub min_odds: f64,
    pub options: Vec<RankedOutcome>,
    pub recommended: Option<RankedOutcome>,
}

/// Outcomes priced at or above `min_odds`, ranked by
/// `value_index + 0.5 * probability`.
pub fn ultimate_predictions(event: &FeedEvent, min_odds: f64) -> UltimateReport {
    let odds = extract_1x2(&event.entries);
    let mut options: Vec<RankedOutcome> = ranked_outcomes(event, &odds)
        .into_iter()
        .filter(|o| o.price >= min_odds)
        .collect();
    options.sort_by(|a, b| desc(ultimate_score(a), ultimate_score(b)));
    let recommended = options.first().cloned();

    UltimateReport {
        min_odds,
        options,
        recommended,
    }
}

fn ultimate_score(o: &RankedOutcome) -> f64 {
    o.value_index + 0.5 * o.probability
}

pub(crate) fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

pub(crate) fn round_to(v: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (v * factor).round() / factor
}
