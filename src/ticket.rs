use anyhow::{Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::{MatchAnalysis, analyze};
use crate::config::EngineConfig;
use crate::feed::{MatchFeed, fetch_details};
use crate::odds::round_to;
use crate::picks::{Pick, PickPolicy, default_policies, pick_option};

const MIN_CONFIDENCE: f64 = 50.0;
const UNMATCHED_CONFIDENCE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSelection {
    pub match_id: String,
    #[serde(alias = "selectedMarket", alias = "pari")]
    pub market: String,
    #[serde(default, alias = "selectedPrice", alias = "cote")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TicketRequest {
    pub selections: Vec<TicketSelection>,
    pub drift_threshold_percent: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TicketFile {
    Bare(Vec<TicketSelection>),
    Wrapped {
        #[serde(default)]
        selections: Vec<TicketSelection>,
        #[serde(default, rename = "driftThresholdPercent")]
        drift_threshold_percent: Option<f64>,
    },
}

impl TicketRequest {
    /// Accepts a bare selection array or `{selections, driftThresholdPercent}`.
    pub fn from_json(raw: &str) -> Result<Self> {
        let file: TicketFile = serde_json::from_str(raw).context("invalid ticket json")?;
        Ok(match file {
            TicketFile::Bare(selections) => Self {
                selections,
                drift_threshold_percent: None,
            },
            TicketFile::Wrapped {
                selections,
                drift_threshold_percent,
            } => Self {
                selections,
                drift_threshold_percent,
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    Ok,
    Replace,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    MatchAlreadyStarted,
    MarketUnavailable,
    OddDrift,
    LowConfidence,
    MatchNotFound,
    DetailsUnavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedSelection {
    pub match_id: String,
    pub teams: Option<String>,
    pub league: Option<String>,
    pub status: SelectionStatus,
    pub selected_market: String,
    pub selected_price: Option<f64>,
    pub current_market: Option<String>,
    pub current_price: Option<f64>,
    pub confidence: Option<f64>,
    pub drift_percent: Option<f64>,
    pub reason_codes: Vec<ReasonCode>,
    pub recommendation: Option<Pick>,
}

impl ValidatedSelection {
    fn invalid(sel: &TicketSelection, reason: ReasonCode) -> Self {
        Self {
            match_id: sel.match_id.clone(),
            teams: None,
            league: None,
            status: SelectionStatus::Invalid,
            selected_market: sel.market.clone(),
            selected_price: sel.price,
            current_market: None,
            current_price: None,
            confidence: None,
            drift_percent: None,
            reason_codes: vec![reason],
            recommendation: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SelectionStatus::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    TicketOk,
    TicketNeedsFix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total: usize,
    pub ok: usize,
    pub to_fix: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketIssue {
    pub code: ReasonCode,
    pub match_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub status: TicketStatus,
    pub drift_threshold_percent: f64,
    /// RFC 3339 timestamp of the clock the validation ran against.
    pub validated_at: String,
    pub summary: ValidationSummary,
    pub issues: Vec<TicketIssue>,
    pub selections: Vec<ValidatedSelection>,
}

impl ValidationReport {
    pub fn from_selections(selections: Vec<ValidatedSelection>, threshold: f64, now_unix: i64) -> Self {
        let total = selections.len();
        let ok = selections.iter().filter(|s| s.is_ok()).count();
        let to_fix = total - ok;
        let issues = selections
            .iter()
            .filter(|s| !s.is_ok())
            .filter_map(issue_for)
            .collect();

        Self {
            status: if to_fix == 0 {
                TicketStatus::TicketOk
            } else {
                TicketStatus::TicketNeedsFix
            },
            drift_threshold_percent: threshold,
            validated_at: DateTime::from_timestamp(now_unix, 0)
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
            summary: ValidationSummary { total, ok, to_fix },
            issues,
            selections,
        }
    }
}

fn issue_for(sel: &ValidatedSelection) -> Option<TicketIssue> {
    let code = *sel.reason_codes.first()?;
    let message = match code {
        ReasonCode::MatchNotFound => format!("match {} not found", sel.match_id),
        ReasonCode::DetailsUnavailable => format!("could not check match {}", sel.match_id),
        _ => format!(
            "{}: replacement advised ({})",
            sel.teams.as_deref().unwrap_or(&sel.match_id),
            reason_names(&sel.reason_codes)
        ),
    };
    Some(TicketIssue {
        code,
        match_id: sel.match_id.clone(),
        message,
    })
}

fn reason_names(codes: &[ReasonCode]) -> String {
    codes
        .iter()
        .filter_map(|c| serde_json::to_value(c).ok())
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `|current - selected| / selected` in percent, two decimals.
pub fn drift_percent(selected: Option<f64>, current: Option<f64>) -> Option<f64> {
    let selected = selected.filter(|p| p.is_finite() && *p > 0.0)?;
    let current = current.filter(|p| p.is_finite() && *p > 0.0)?;
    Some(round_to(((current - selected) / selected).abs() * 100.0, 2))
}

/// Re-checks one selection against a fresh analysis of its match.
pub fn check_selection(
    sel: &TicketSelection,
    analysis: &MatchAnalysis,
    threshold: f64,
    policies: &[Box<dyn PickPolicy>],
) -> ValidatedSelection {
    let market = analysis.market(&sel.market);
    let current_price = market.map(|m| m.price);
    let drift = drift_percent(sel.price, current_price);
    let recommendation = pick_option(analysis, policies);
    let confidence = recommendation
        .as_ref()
        .filter(|r| r.market == sel.market)
        .map(|r| r.confidence)
        .unwrap_or(UNMATCHED_CONFIDENCE);

    let mut reason_codes = Vec::new();
    if !analysis.upcoming {
        reason_codes.push(ReasonCode::MatchAlreadyStarted);
    }
    if market.is_none() {
        reason_codes.push(ReasonCode::MarketUnavailable);
    }
    if drift.is_some_and(|d| d > threshold) {
        reason_codes.push(ReasonCode::OddDrift);
    }
    if confidence < MIN_CONFIDENCE {
        reason_codes.push(ReasonCode::LowConfidence);
    }

    ValidatedSelection {
        match_id: sel.match_id.clone(),
        teams: Some(analysis.teams()),
        league: Some(analysis.league.clone()),
        status: if reason_codes.is_empty() {
            SelectionStatus::Ok
        } else {
            SelectionStatus::Replace
        },
        selected_market: sel.market.clone(),
        selected_price: sel.price,
        current_market: market.map(|m| m.name.clone()),
        current_price,
        confidence: Some(round_to(confidence, 1)),
        drift_percent: drift,
        reason_codes,
        recommendation,
    }
}

/// Validates every selection independently; a failed lookup marks only its
/// own selection invalid. A non-finite or negative threshold falls back to
/// the configured one.
pub fn validate_ticket<F>(
    feed: &F,
    cfg: &EngineConfig,
    selections: &[TicketSelection],
    threshold: Option<f64>,
    now_unix: i64,
) -> ValidationReport
where
    F: MatchFeed + ?Sized,
{
    let threshold = threshold
        .filter(|t| t.is_finite() && *t >= 0.0)
        .unwrap_or(cfg.drift_threshold_percent);
    let ids: Vec<String> = selections.iter().map(|s| s.match_id.clone()).collect();
    let details = fetch_details(feed, &ids);
    let policies = default_policies();

    let validated: Vec<ValidatedSelection> = selections
        .iter()
        .zip(details)
        .map(|(sel, detail)| match detail {
            Ok(Some(event)) => {
                let analysis = analyze(&event, cfg, now_unix);
                check_selection(sel, &analysis, threshold, &policies)
            }
            Ok(None) => ValidatedSelection::invalid(sel, ReasonCode::MatchNotFound),
            Err(err) => {
                warn!(match_id = %sel.match_id, error = %err, "ticket detail fetch failed");
                ValidatedSelection::invalid(sel, ReasonCode::DetailsUnavailable)
            }
        })
        .collect();

    let report = ValidationReport::from_selections(validated, threshold, now_unix);
    info!(
        total = report.summary.total,
        ok = report.summary.ok,
        to_fix = report.summary.to_fix,
        "ticket validated"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_is_relative_to_selected_price() {
        assert_eq!(drift_percent(Some(1.80), Some(1.62)), Some(10.0));
        assert_eq!(drift_percent(Some(2.0), Some(2.12)), Some(6.0));
        assert_eq!(drift_percent(None, Some(2.0)), None);
        assert_eq!(drift_percent(Some(2.0), Some(0.0)), None);
    }

    #[test]
    fn ticket_json_accepts_both_shapes() {
        let bare = TicketRequest::from_json(r#"[{"matchId":"1","market":"Match nul","price":3.1}]"#).unwrap();
        assert_eq!(bare.selections.len(), 1);
        assert_eq!(bare.drift_threshold_percent, None);

        let wrapped = TicketRequest::from_json(
            r#"{"selections":[{"matchId":"2","selectedMarket":"Match nul"}],"driftThresholdPercent":8}"#,
        )
        .unwrap();
        assert_eq!(wrapped.selections[0].market, "Match nul");
        assert_eq!(wrapped.selections[0].price, None);
        assert_eq!(wrapped.drift_threshold_percent, Some(8.0));

        assert!(TicketRequest::from_json("{").is_err());
    }

    #[test]
    fn french_client_keys_are_accepted() {
        let req = TicketRequest::from_json(
            r#"{"selections":[{"matchId":"7","pari":"Plus de 1.5 buts","cote":1.55}]}"#,
        )
        .unwrap();
        assert_eq!(req.selections[0].market, "Plus de 1.5 buts");
        assert_eq!(req.selections[0].price, Some(1.55));
    }

    #[test]
    fn replace_issue_lists_every_reason() {
        let sel = ValidatedSelection {
            teams: Some("Lille vs Nantes".into()),
            status: SelectionStatus::Replace,
            reason_codes: vec![ReasonCode::OddDrift, ReasonCode::LowConfidence],
            ..ValidatedSelection::invalid(
                &TicketSelection {
                    match_id: "105".into(),
                    market: "Plus de 2.5 buts".into(),
                    price: Some(1.8),
                },
                ReasonCode::OddDrift,
            )
        };
        let issue = issue_for(&sel).expect("issue");
        assert_eq!(issue.code, ReasonCode::OddDrift);
        assert_eq!(
            issue.message,
            "Lille vs Nantes: replacement advised (ODD_DRIFT, LOW_CONFIDENCE)"
        );
    }

    #[test]
    fn report_counts_and_issues() {
        let sel = TicketSelection {
            match_id: "5".into(),
            market: "Match nul".into(),
            price: Some(3.0),
        };
        let report = ValidationReport::from_selections(
            vec![ValidatedSelection::invalid(&sel, ReasonCode::MatchNotFound)],
            6.0,
            0,
        );
        assert_eq!(report.status, TicketStatus::TicketNeedsFix);
        assert_eq!(report.summary, ValidationSummary { total: 1, ok: 0, to_fix: 1 });
        assert_eq!(report.issues[0].code, ReasonCode::MatchNotFound);
        assert_eq!(report.validated_at, "1970-01-01T00:00:00+00:00");

        let empty = ValidationReport::from_selections(Vec::new(), 6.0, 0);
        assert_eq!(empty.status, TicketStatus::TicketOk);
    }
}
