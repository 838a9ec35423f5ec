use std::collections::HashSet;
use std::env;

use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::http_client::fetch_text;
use crate::state::{FeedEvent, LiveStatus, MarketEntry};

/// Source of match listings and per-match details.
///
/// `event_detail` returns `Ok(None)` when the match is unknown and `Err`
/// when the feed could not be reached or decoded.
pub trait MatchFeed: Send + Sync {
    fn list_events(&self) -> Result<Vec<FeedEvent>>;

    fn event_detail(&self, id: &str) -> Result<Option<FeedEvent>>;
}

pub struct HttpFeed {
    cfg: FeedConfig,
}

impl HttpFeed {
    pub fn new(cfg: FeedConfig) -> Self {
        Self { cfg }
    }

    fn list_url(&self, sport_id: u32) -> String {
        format!(
            "{}?sports={sport_id}&count={}&lng={}&mode=4&country=96&getEmpty=true&virtualSports=true&noFilterBlockEvent=true",
            self.cfg.base_url, self.cfg.count, self.cfg.lang
        )
    }

    fn detail_url(&self, id: &str) -> String {
        format!(
            "{}?id={id}&lng={}&isSubGames=true&GroupEvents=true&countevents=250",
            self.cfg.detail_url, self.cfg.lang
        )
    }
}

impl MatchFeed for HttpFeed {
    fn list_events(&self) -> Result<Vec<FeedEvent>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut last_err = None;
        let mut any_ok = false;

        for sport_id in &self.cfg.sport_ids {
            let url = self.list_url(*sport_id);
            let events = fetch_text(&url, self.cfg.timeout).and_then(|body| parse_events_json(&body));
            match events {
                Ok(events) => {
                    any_ok = true;
                    debug!(sport_id, count = events.len(), "feed listing");
                    for event in events {
                        if seen.insert(event.id.clone()) {
                            out.push(event);
                        }
                    }
                }
                Err(err) => {
                    warn!(sport_id, error = %err, "feed listing failed");
                    last_err = Some(err);
                }
            }
        }

        match (any_ok, last_err) {
            (false, Some(err)) => Err(err.context("every sport listing failed")),
            _ => Ok(out),
        }
    }

    fn event_detail(&self, id: &str) -> Result<Option<FeedEvent>> {
        let body = fetch_text(&self.detail_url(id), self.cfg.timeout)
            .with_context(|| format!("detail fetch failed for match {id}"))?;
        parse_event_json(&body)
    }
}

/// In-memory feed. Ids in `failing` behave like unreachable details.
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    events: Vec<FeedEvent>,
    failing: HashSet<String>,
}

impl StaticFeed {
    pub fn new(events: Vec<FeedEvent>) -> Self {
        Self {
            events,
            failing: HashSet::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(Self::new(parse_events_json(raw)?))
    }

    pub fn with_failing(mut self, ids: &[&str]) -> Self {
        self.failing.extend(ids.iter().map(|id| id.to_string()));
        self
    }

    pub fn events(&self) -> &[FeedEvent] {
        &self.events
    }
}

impl MatchFeed for StaticFeed {
    fn list_events(&self) -> Result<Vec<FeedEvent>> {
        Ok(self.events.clone())
    }

    fn event_detail(&self, id: &str) -> Result<Option<FeedEvent>> {
        if self.failing.contains(id) {
            return Err(anyhow!("detail unavailable for match {id}"));
        }
        Ok(self.events.iter().find(|e| e.id == id).cloned())
    }
}

/// Fetches every id's detail, preserving input order.
pub fn fetch_details<F>(feed: &F, ids: &[String]) -> Vec<Result<Option<FeedEvent>>>
where
    F: MatchFeed + ?Sized,
{
    let pool = build_fetch_pool();
    with_fetch_pool(&pool, || {
        ids.par_iter()
            .map(|id| feed.event_detail(id))
            .collect::<Vec<_>>()
    })
}

pub fn build_fetch_pool() -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(fetch_parallelism())
        .build()
        .ok()
}

pub fn with_fetch_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

fn fetch_parallelism() -> usize {
    env::var("FETCH_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(6)
        .clamp(2, 32)
}

/// Accepts the `{Success, Value: [...]}` envelope or a bare array.
pub fn parse_events_json(raw: &str) -> Result<Vec<FeedEvent>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid feed listing json")?;
    let Some(list) = unwrap_envelope(&root) else {
        return Ok(Vec::new());
    };
    let Some(items) = list.as_array() else {
        return Ok(Vec::new());
    };
    Ok(items.iter().filter_map(parse_event).collect())
}

/// Accepts the `{Success, Value: {...}}` envelope or a bare event object.
pub fn parse_event_json(raw: &str) -> Result<Option<FeedEvent>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid feed detail json")?;
    Ok(unwrap_envelope(&root).and_then(parse_event))
}

fn unwrap_envelope(root: &Value) -> Option<&Value> {
    match root.get("Success") {
        Some(Value::Bool(false)) => None,
        Some(_) => root.get("Value").filter(|v| !v.is_null()),
        None => Some(root),
    }
}

pub fn parse_event(value: &Value) -> Option<FeedEvent> {
    let id = pick_string(value, &["I", "id"])?;
    if id.is_empty() {
        return None;
    }
    let sc = value.get("SC").unwrap_or(&Value::Null);
    Some(FeedEvent {
        id,
        home: pick_string(value, &["O1", "home"]).unwrap_or_default(),
        away: pick_string(value, &["O2", "away"]).unwrap_or_default(),
        league: pick_string(value, &["L", "LE", "league"]).unwrap_or_default(),
        start_unix: pick_i64(value, &["S", "start"]).unwrap_or(0),
        live: parse_live(sc),
        entries: parse_entries(value),
    })
}

fn parse_live(sc: &Value) -> LiveStatus {
    let phase = pick_string(sc, &["CPS"]).unwrap_or_default();
    let fs = sc.get("FS").unwrap_or(&Value::Null);
    let s1 = pick_i64(fs, &["S1"]);
    let s2 = pick_i64(fs, &["S2"]);
    let score = match (s1, s2) {
        (None, None) => None,
        (a, b) => Some((clamp_goals(a), clamp_goals(b))),
    };
    LiveStatus {
        status_code: pick_i64(sc, &["GS"]),
        status_text: pick_string(sc, &["SLS"]).unwrap_or_default(),
        info_text: pick_string(sc, &["I"]).unwrap_or_default(),
        minute: parse_minute(&phase),
        phase,
        score,
    }
}

fn clamp_goals(v: Option<i64>) -> u32 {
    v.unwrap_or(0).clamp(0, u32::MAX as i64) as u32
}

/// Minute from phase strings such as `"2ème mi-temps 67'"`.
pub fn parse_minute(phase: &str) -> Option<u32> {
    let chars: Vec<char> = phase.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let digits: String = chars[start..i].iter().collect();
        let mut j = i;
        while j < chars.len() && chars[j].is_whitespace() {
            j += 1;
        }
        if j < chars.len() && (chars[j] == '\'' || chars[j] == '’') {
            return digits.parse().ok();
        }
    }
    None
}

/// Flat `E` entries plus grouped `GE[].E[][]` entries from detail payloads.
fn parse_entries(value: &Value) -> Vec<MarketEntry> {
    let mut out: Vec<MarketEntry> = value
        .get("E")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_entry).collect())
        .unwrap_or_default();

    let Some(groups) = value.get("GE").and_then(Value::as_array) else {
        return out;
    };
    for group in groups {
        let Some(columns) = group.get("E").and_then(Value::as_array) else {
            continue;
        };
        for column in columns {
            let Some(items) = column.as_array() else {
                continue;
            };
            for item in items {
                let Some(entry) = parse_entry(item) else {
                    continue;
                };
                if !out.contains(&entry) {
                    out.push(entry);
                }
            }
        }
    }
    out
}

fn parse_entry(value: &Value) -> Option<MarketEntry> {
    Some(MarketEntry {
        group: pick_i64(value, &["G"])?,
        kind: pick_i64(value, &["T"])?,
        param: pick_f64(value, &["P"]),
        price: pick_f64(value, &["C"]),
    })
}

fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(s) = as_string(v) {
                return Some(s);
            }
        }
    }
    None
}

fn pick_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(num) = v.as_i64() {
                return Some(num);
            }
            if let Some(num) = v.as_f64().filter(|n| n.is_finite()) {
                return Some(num as i64);
            }
            if let Some(s) = v.as_str() {
                if let Ok(num) = s.trim().parse::<i64>() {
                    return Some(num);
                }
            }
        }
    }
    None
}

fn pick_f64(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            if let Some(num) = v.as_f64() {
                return Some(num).filter(|n| n.is_finite());
            }
            if let Some(s) = v.as_str() {
                if let Ok(num) = s.trim().replace(',', ".").parse::<f64>() {
                    return Some(num).filter(|n| n.is_finite());
                }
            }
        }
    }
    None
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
