use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use vfoot_consensus::analysis::analyze;
use vfoot_consensus::config::EngineConfig;
use vfoot_consensus::consensus::render_summary;
use vfoot_consensus::feed::parse_events_json;

/// Replays a saved feed snapshot through the analysis pipeline.
///
/// Usage: `replay [snapshot.json] [now_unix]`. The clock defaults to the
/// earliest start in the snapshot so pre-match rows stay upcoming.
fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let mut args = env::args().skip(1);
    let path = args.next().map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("feed_events.json")
    });
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let events = parse_events_json(&raw)?;

    let now = match args.next() {
        Some(val) => val.parse::<i64>().context("now_unix must be an integer")?,
        None => events
            .iter()
            .map(|e| e.start_unix - 1)
            .min()
            .unwrap_or_default(),
    };

    let cfg = EngineConfig::from_env();
    for event in &events {
        let analysis = analyze(event, &cfg, now);
        let row = json!({
            "id": analysis.id,
            "teams": analysis.teams(),
            "upcoming": analysis.upcoming,
            "prediction": analysis.prediction.prediction,
            "primary": render_summary(&analysis.primary),
            "alternative": render_summary(&analysis.alternative.decision),
            "valueBets": analysis.value_bets.len(),
        });
        println!("{}", serde_json::to_string(&row)?);
    }
    Ok(())
}
