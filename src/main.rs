use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};

use vfoot_consensus::analysis::analyze;
use vfoot_consensus::config::{EngineConfig, FeedConfig, LogFormat};
use vfoot_consensus::coupon::{CouponRequest, build_coupon};
use vfoot_consensus::demo_feed::demo_feed;
use vfoot_consensus::feed::{HttpFeed, MatchFeed};
use vfoot_consensus::ticket::{TicketRequest, validate_ticket};
use vfoot_consensus::upcoming::event_is_upcoming;

const DEMO_MATCHES: usize = 24;

#[derive(Parser, Debug)]
#[command(name = "vfoot", about = "Consensus picks and ticket checks for virtual football")]
struct Cli {
    /// Use the seeded offline feed instead of the live one.
    #[arg(long, global = true)]
    demo: bool,

    #[arg(long, global = true, default_value_t = 42)]
    seed: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List upcoming matches.
    Matches,
    /// Full analysis for one match.
    Predict { id: String },
    /// Build a coupon from the upcoming board.
    Coupon {
        #[arg(long, default_value_t = 3)]
        size: usize,
        #[arg(long)]
        league: Option<String>,
        /// Also write the ticket to this path for a later `validate`.
        #[arg(long)]
        ticket_out: Option<PathBuf>,
    },
    /// Re-check a saved ticket against current odds.
    Validate {
        path: PathBuf,
        #[arg(long)]
        threshold: Option<f64>,
    },
}

#[derive(Serialize)]
struct MatchRow {
    id: String,
    home: String,
    away: String,
    league: String,
    start: Option<String>,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
    init_tracing(LogFormat::from_env());

    let cli = Cli::parse();
    let cfg = EngineConfig::from_env();
    let now = Utc::now().timestamp();
    let feed: Box<dyn MatchFeed> = if cli.demo {
        Box::new(demo_feed(cli.seed, now, DEMO_MATCHES))
    } else {
        Box::new(HttpFeed::new(FeedConfig::from_env()))
    };

    match cli.command {
        Command::Matches => {
            let rows: Vec<MatchRow> = feed
                .list_events()
                .context("failed to list matches")?
                .into_iter()
                .filter(|e| event_is_upcoming(e, now))
                .map(|e| MatchRow {
                    start: DateTime::from_timestamp(e.start_unix, 0).map(|ts| ts.to_rfc3339()),
                    id: e.id,
                    home: e.home,
                    away: e.away,
                    league: e.league,
                })
                .collect();
            print_json(&rows)
        }
        Command::Predict { id } => {
            let event = feed
                .event_detail(&id)?
                .ok_or_else(|| anyhow!("match {id} not found"))?;
            print_json(&analyze(&event, &cfg, now))
        }
        Command::Coupon {
            size,
            league,
            ticket_out,
        } => {
            let req = CouponRequest::new(size, league.as_deref());
            let coupon = build_coupon(&*feed, &cfg, &req, now)?;
            if let Some(path) = ticket_out {
                let raw = serde_json::to_string_pretty(&coupon.to_ticket())?;
                fs::write(&path, raw)
                    .with_context(|| format!("failed to write ticket {}", path.display()))?;
            }
            print_json(&coupon)
        }
        Command::Validate { path, threshold } => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read ticket {}", path.display()))?;
            let req = TicketRequest::from_json(&raw)?;
            let threshold = threshold.or(req.drift_threshold_percent);
            let report = validate_ticket(&*feed, &cfg, &req.selections, threshold, now);
            print_json(&report)
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Pretty => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{out}");
    Ok(())
}
