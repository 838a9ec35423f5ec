use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://1xbet.com/service-api/LiveFeed/Get1x2_VZip";
const DEFAULT_DETAIL_URL: &str = "https://1xbet.com/service-api/LiveFeed/GetGameZip";

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub base_url: String,
    pub detail_url: String,
    pub sport_ids: Vec<u32>,
    pub count: u32,
    pub lang: String,
    pub timeout: Duration,
}

impl FeedConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("FEED_BASE_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let detail_url = std::env::var("FEED_DETAIL_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DETAIL_URL.to_string());
        let sport_ids = std::env::var("FEED_SPORT_IDS")
            .ok()
            .map(|v| parse_id_list(&v))
            .filter(|ids| !ids.is_empty())
            .unwrap_or_else(|| vec![85, 144, 86]);
        let count = std::env::var("FEED_COUNT")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(100)
            .clamp(1, 500);
        let lang = std::env::var("FEED_LANG")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "fr".to_string());
        let timeout_secs = std::env::var("FEED_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(10)
            .clamp(1, 60);

        Self {
            base_url,
            detail_url,
            sport_ids,
            count,
            lang,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            detail_url: DEFAULT_DETAIL_URL.to_string(),
            sport_ids: vec![85, 144, 86],
            count: 100,
            lang: "fr".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Tunables for the analysis, coupon and ticket layers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Minimum price an outcome needs to enter the "ultimate" ranking.
    pub ultimate_min_odds: f64,
    /// Drift percentage above which a ticket selection is flagged.
    pub drift_threshold_percent: f64,
    /// How many upcoming matches the coupon builder inspects.
    pub coupon_sample_cap: usize,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let ultimate_min_odds = env_f64("ULTIMATE_MIN_ODDS")
            .filter(|v| *v > 1.0)
            .unwrap_or(2.0);
        let drift_threshold_percent = env_f64("DRIFT_THRESHOLD_PERCENT")
            .filter(|v| *v >= 0.0)
            .unwrap_or(6.0);
        let coupon_sample_cap = std::env::var("COUPON_SAMPLE_CAP")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(20)
            .clamp(1, 200);

        Self {
            ultimate_min_odds,
            drift_threshold_percent,
            coupon_sample_cap,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ultimate_min_odds: 2.0,
            drift_threshold_percent: 6.0,
            coupon_sample_cap: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .ok()
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_id_list(raw: &str) -> Vec<u32> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u32>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_skips_garbage() {
        assert_eq!(parse_id_list("85, 144,x,,86"), vec![85, 144, 86]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.ultimate_min_odds, 2.0);
        assert_eq!(cfg.drift_threshold_percent, 6.0);
        assert_eq!(cfg.coupon_sample_cap, 20);

        let feed = FeedConfig::default();
        assert_eq!(feed.sport_ids, vec![85, 144, 86]);
        assert_eq!(feed.lang, "fr");
    }
}
