use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::{MatchAnalysis, analyze};
use crate::config::EngineConfig;
use crate::feed::{MatchFeed, fetch_details};
use crate::odds::{desc, round_to};
use crate::picks::{PickPolicy, PickSource, default_policies, pick_option};
use crate::state::FeedEvent;
use crate::ticket::TicketSelection;
use crate::upcoming::event_is_upcoming;

pub const MIN_SIZE: usize = 1;
pub const MAX_SIZE: usize = 12;
const SWEET_SPOT: f64 = 1.65;
const DISTANCE_PENALTY: f64 = 11.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponRequest {
    pub size: usize,
    /// `None` or `"all"` keeps every league.
    pub league: Option<String>,
}

impl CouponRequest {
    pub fn new(size: usize, league: Option<&str>) -> Self {
        Self {
            size,
            league: league.map(str::to_string),
        }
    }

    pub fn clamped_size(&self) -> usize {
        self.size.clamp(MIN_SIZE, MAX_SIZE)
    }

    pub fn accepts_league(&self, league: &str) -> bool {
        let wanted = self
            .league
            .as_deref()
            .map(|l| l.trim().to_lowercase())
            .unwrap_or_default();
        wanted.is_empty() || wanted == "all" || league.trim().to_lowercase() == wanted
    }
}

impl Default for CouponRequest {
    fn default() -> Self {
        Self::new(3, None)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponSelection {
    pub match_id: String,
    pub home: String,
    pub away: String,
    pub league: String,
    pub market: String,
    pub price: f64,
    pub confidence: f64,
    pub safety_score: f64,
    pub source: PickSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub selections: Vec<CouponSelection>,
    pub combined_price: Option<f64>,
    pub average_confidence: f64,
    pub requested_size: usize,
    pub candidate_count: usize,
}

impl Coupon {
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn to_ticket(&self) -> Vec<TicketSelection> {
        self.selections
            .iter()
            .map(|s| TicketSelection {
                match_id: s.match_id.clone(),
                market: s.market.clone(),
                price: Some(s.price),
            })
            .collect()
    }
}

pub fn safety_score(confidence: f64, price: f64) -> f64 {
    round_to(confidence - (price - SWEET_SPOT).abs() * DISTANCE_PENALTY, 2)
}

/// Coupon line for one analysed match. Team names and league come from the
/// listing row since detail payloads may omit them.
pub fn selection_for(
    listing: &FeedEvent,
    analysis: &MatchAnalysis,
    policies: &[Box<dyn PickPolicy>],
) -> Option<CouponSelection> {
    let pick = pick_option(analysis, policies)?;
    Some(CouponSelection {
        match_id: listing.id.clone(),
        home: listing.home.clone(),
        away: listing.away.clone(),
        league: listing.league.clone(),
        safety_score: safety_score(pick.confidence, pick.price),
        market: pick.market,
        price: pick.price,
        confidence: pick.confidence,
        source: pick.source,
    })
}

/// Orders candidates by safety and keeps the first `size`. Ties keep feed order.
pub fn assemble_coupon(mut candidates: Vec<CouponSelection>, size: usize) -> Coupon {
    let candidate_count = candidates.len();
    candidates.sort_by(|a, b| desc(a.safety_score, b.safety_score));
    candidates.truncate(size);

    let combined_price = if candidates.is_empty() {
        None
    } else {
        Some(round_to(candidates.iter().map(|s| s.price).product(), 3))
    };
    let average_confidence = if candidates.is_empty() {
        0.0
    } else {
        let total: f64 = candidates.iter().map(|s| s.confidence).sum();
        round_to(total / candidates.len() as f64, 1)
    };

    Coupon {
        selections: candidates,
        combined_price,
        average_confidence,
        requested_size: size,
        candidate_count,
    }
}

pub fn build_coupon<F>(feed: &F, cfg: &EngineConfig, req: &CouponRequest, now_unix: i64) -> Result<Coupon>
where
    F: MatchFeed + ?Sized,
{
    let size = req.clamped_size();
    let listing = feed.list_events().context("failed to list matches")?;
    let sample: Vec<FeedEvent> = listing
        .into_iter()
        .filter(|e| req.accepts_league(&e.league))
        .filter(|e| event_is_upcoming(e, now_unix))
        .take(cfg.coupon_sample_cap)
        .collect();

    let ids: Vec<String> = sample.iter().map(|e| e.id.clone()).collect();
    let details = fetch_details(feed, &ids);

    let mut fetched = Vec::with_capacity(sample.len());
    for (event, detail) in sample.iter().zip(details) {
        match detail {
            Ok(Some(detail)) => fetched.push((event, detail)),
            Ok(None) => debug!(match_id = %event.id, "match vanished from feed"),
            Err(err) => warn!(match_id = %event.id, error = %err, "detail fetch failed"),
        }
    }

    let policies = default_policies();
    let candidates: Vec<CouponSelection> = fetched
        .par_iter()
        .filter_map(|(event, detail)| {
            let analysis = analyze(detail, cfg, now_unix);
            selection_for(event, &analysis, &policies)
        })
        .collect();

    let coupon = assemble_coupon(candidates, size);
    info!(
        sampled = sample.len(),
        candidates = coupon.candidate_count,
        selections = coupon.len(),
        combined_price = ?coupon.combined_price,
        "coupon built"
    );
    Ok(coupon)
}
