use std::fs;
use std::path::PathBuf;

use vfoot_consensus::feed::{parse_event_json, parse_events_json};
use vfoot_consensus::markets::{MarketSource, categorize, secondary_markets};
use vfoot_consensus::state::{MarketCategory, PREMATCH_STATUS_CODE};
use vfoot_consensus::upcoming::event_is_upcoming;

const NOW: i64 = 1_700_000_000;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_feed_listing_fixture() {
    let raw = read_fixture("feed_events.json");
    let events = parse_events_json(&raw).expect("fixture should parse");
    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["101", "102", "103", "104", "105"]);

    let first = &events[0];
    assert_eq!(first.home, "Ajax");
    assert_eq!(first.away, "PSV");
    assert_eq!(first.league, "FIFA. Penalty");
    assert_eq!(first.live.status_code, Some(PREMATCH_STATUS_CODE));
    assert_eq!(first.entries.len(), 3);
    assert!(first.live.score.is_none());

    let lille = &events[4];
    assert_eq!(lille.start_unix, 1_700_000_300);
    assert_eq!(lille.entries[0].price, Some(2.0));
}

#[test]
fn live_rows_carry_score_and_minute() {
    let raw = read_fixture("feed_events.json");
    let events = parse_events_json(&raw).expect("fixture should parse");
    let live = events.iter().find(|e| e.id == "104").expect("live row");
    assert_eq!(live.live.score, Some((1, 0)));
    assert_eq!(live.live.minute, Some(67));
    assert_eq!(live.live.total_goals(), 1);
    assert!(!event_is_upcoming(live, NOW));
}

#[test]
fn upcoming_filter_on_fixture() {
    let raw = read_fixture("feed_events.json");
    let events = parse_events_json(&raw).expect("fixture should parse");
    let upcoming: Vec<&str> = events
        .iter()
        .filter(|e| event_is_upcoming(e, NOW))
        .map(|e| e.id.as_str())
        .collect();
    assert_eq!(upcoming, vec!["101", "102", "103", "105"]);
}

#[test]
fn parses_grouped_detail_fixture() {
    let raw = read_fixture("game_detail.json");
    let event = parse_event_json(&raw)
        .expect("fixture should parse")
        .expect("detail present");
    assert_eq!(event.id, "105");
    assert_eq!(event.entries.len(), 8);

    let markets = categorize(&event);
    let names: Vec<&str> = markets.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Plus de 2.5 buts",
            "Moins de 2.5 buts",
            "Total buts pair",
            "Total buts impair"
        ]
    );
    assert_eq!(markets[2].category, MarketCategory::Parity);

    let (_, source) = secondary_markets(&event);
    assert_eq!(source, MarketSource::Feed);
}

#[test]
fn bare_detail_object_parses_too() {
    let raw = r#"{"I": 9, "O1": "A", "O2": "B", "E": []}"#;
    let event = parse_event_json(raw).expect("valid json").expect("event");
    assert_eq!(event.id, "9");
    let (markets, source) = secondary_markets(&event);
    assert_eq!(source, MarketSource::Synthetic);
    assert_eq!(markets.len(), 10);
}
