use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::feed::StaticFeed;
use crate::odds::round_to;
use crate::state::{FeedEvent, GROUP_1X2, LiveStatus, MarketEntry, PREMATCH_STATUS_CODE};

const LEAGUES: [&str; 2] = ["FIFA. Penalty", "PES. Penalty"];
const TEAMS: [&str; 16] = [
    "Real Madrid",
    "Barcelona",
    "Bayern",
    "Dortmund",
    "Juventus",
    "Inter",
    "PSG",
    "Marseille",
    "Liverpool",
    "Chelsea",
    "Ajax",
    "Porto",
    "Benfica",
    "Napoli",
    "Atletico",
    "Arsenal",
];
const MARGIN: f64 = 1.06;
const MATCH_SPACING_SECS: i64 = 90;

/// Deterministic feed of penalty matches for offline runs and benches.
///
/// The same seed and clock always yield the same board. Every fifth match
/// is already in play so filters have something to reject.
pub fn demo_feed(seed: u64, now_unix: i64, count: usize) -> StaticFeed {
    let mut rng = StdRng::seed_from_u64(seed);
    let events = (0..count)
        .map(|idx| demo_event(&mut rng, idx, now_unix))
        .collect();
    StaticFeed::new(events)
}

fn demo_event(rng: &mut StdRng, idx: usize, now_unix: i64) -> FeedEvent {
    let home_idx = rng.gen_range(0..TEAMS.len());
    let mut away_idx = rng.gen_range(0..TEAMS.len() - 1);
    if away_idx >= home_idx {
        away_idx += 1;
    }
    let in_play = idx % 5 == 4;
    let minutes_out = idx as i64 + 1;

    let live = if in_play {
        let minute = rng.gen_range(1..90);
        LiveStatus {
            status_code: Some(3),
            status_text: String::new(),
            info_text: String::new(),
            phase: format!("2ème mi-temps {minute}'"),
            score: Some((rng.gen_range(0..4), rng.gen_range(0..4))),
            minute: Some(minute),
        }
    } else {
        LiveStatus {
            status_code: Some(PREMATCH_STATUS_CODE),
            status_text: format!("Début dans {minutes_out} min"),
            ..LiveStatus::default()
        }
    };

    FeedEvent {
        id: format!("{}", 500_000_000 + idx),
        home: TEAMS[home_idx].to_string(),
        away: TEAMS[away_idx].to_string(),
        league: LEAGUES[idx % LEAGUES.len()].to_string(),
        start_unix: if in_play {
            now_unix - 60
        } else {
            now_unix + minutes_out * MATCH_SPACING_SECS
        },
        live,
        entries: demo_entries(rng),
    }
}

fn demo_entries(rng: &mut StdRng) -> Vec<MarketEntry> {
    let home: f64 = rng.gen_range(0.22..0.62);
    let draw: f64 = rng.gen_range(0.18..0.30);
    let away = (1.0 - home - draw).max(0.08);

    let mut entries: Vec<MarketEntry> = [home, draw, away]
        .iter()
        .enumerate()
        .map(|(i, p)| entry(GROUP_1X2, i as i64 + 1, None, price_for(*p)))
        .collect();

    if rng.gen_bool(0.6) {
        let line = if rng.gen_bool(0.5) { 1.5 } else { 2.5 };
        let over: f64 = if line < 2.0 {
            rng.gen_range(0.62..0.80)
        } else {
            rng.gen_range(0.38..0.58)
        };
        entries.push(entry(2, 1, Some(line), price_for(over)));
        entries.push(entry(2, 2, Some(line), price_for(1.0 - over)));
    }
    if rng.gen_bool(0.4) {
        let even: f64 = rng.gen_range(0.46..0.54);
        entries.push(entry(5, 1, None, price_for(even)));
        entries.push(entry(5, 2, None, price_for(1.0 - even)));
    }
    entries
}

fn price_for(probability: f64) -> f64 {
    round_to((1.0 / (probability * MARGIN)).max(1.01), 2)
}

fn entry(group: i64, kind: i64, param: Option<f64>, price: f64) -> MarketEntry {
    MarketEntry {
        group,
        kind,
        param,
        price: Some(price),
    }
}
