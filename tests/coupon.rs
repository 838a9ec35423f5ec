use std::fs;
use std::path::PathBuf;

use vfoot_consensus::config::EngineConfig;
use vfoot_consensus::coupon::{CouponRequest, build_coupon};
use vfoot_consensus::demo_feed::demo_feed;
use vfoot_consensus::feed::StaticFeed;
use vfoot_consensus::picks::PickSource;

const NOW: i64 = 1_700_000_000;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn fixture_feed() -> StaticFeed {
    StaticFeed::from_json(&read_fixture("feed_events.json")).expect("fixture should parse")
}

#[test]
fn short_pool_yields_short_coupon() {
    let req = CouponRequest::new(3, Some("FIFA. Penalty"));
    let coupon = build_coupon(&fixture_feed(), &EngineConfig::default(), &req, NOW)
        .expect("coupon should build");

    assert_eq!(coupon.len(), 2);
    assert_eq!(coupon.requested_size, 3);
    let ids: Vec<&str> = coupon.selections.iter().map(|s| s.match_id.as_str()).collect();
    assert!(ids.contains(&"101"));
    assert!(ids.contains(&"103"));
    assert!(!ids.contains(&"104"));
}

#[test]
fn strongest_pick_leads_and_prices_multiply() {
    let req = CouponRequest::new(3, Some("fifa. penalty"));
    let coupon = build_coupon(&fixture_feed(), &EngineConfig::default(), &req, NOW)
        .expect("coupon should build");

    let lead = &coupon.selections[0];
    assert_eq!(lead.match_id, "101");
    assert_eq!(lead.market, "Plus de 1.5 buts");
    assert_eq!(lead.source, PickSource::Master);
    assert_eq!(lead.safety_score, 93.9);
    assert_eq!(lead.home, "Ajax");

    let product: f64 = coupon.selections.iter().map(|s| s.price).product();
    let combined = coupon.combined_price.expect("combined price");
    assert!((combined - product).abs() < 1e-3);

    let scores: Vec<f64> = coupon.selections.iter().map(|s| s.safety_score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn matches_without_a_pick_are_left_out() {
    let req = CouponRequest::new(12, None);
    let coupon = build_coupon(&fixture_feed(), &EngineConfig::default(), &req, NOW)
        .expect("coupon should build");
    assert!(coupon.selections.iter().all(|s| s.match_id != "102"));
    assert!(coupon.selections.iter().all(|s| s.match_id != "104"));
}

#[test]
fn failed_detail_fetch_is_skipped() {
    let feed = fixture_feed().with_failing(&["101"]);
    let req = CouponRequest::new(3, Some("FIFA. Penalty"));
    let coupon = build_coupon(&feed, &EngineConfig::default(), &req, NOW)
        .expect("one failure must not abort the coupon");
    assert_eq!(coupon.len(), 1);
    assert_eq!(coupon.selections[0].match_id, "103");
}

#[test]
fn unknown_league_gives_empty_coupon() {
    let req = CouponRequest::new(3, Some("Nowhere League"));
    let coupon = build_coupon(&fixture_feed(), &EngineConfig::default(), &req, NOW)
        .expect("coupon should build");
    assert!(coupon.is_empty());
    assert_eq!(coupon.combined_price, None);
}

#[test]
fn sample_cap_bounds_the_pool() {
    let cfg = EngineConfig {
        coupon_sample_cap: 1,
        ..EngineConfig::default()
    };
    let req = CouponRequest::new(5, Some("FIFA. Penalty"));
    let coupon = build_coupon(&fixture_feed(), &cfg, &req, NOW).expect("coupon should build");
    assert_eq!(coupon.len(), 1);
    assert_eq!(coupon.selections[0].match_id, "101");
}

#[test]
fn demo_board_builds_a_coupon() {
    let feed = demo_feed(42, NOW, 24);
    let coupon = build_coupon(&feed, &EngineConfig::default(), &CouponRequest::new(4, None), NOW)
        .expect("coupon should build");
    assert!(coupon.len() <= 4);
    assert!(coupon
        .selections
        .iter()
        .all(|s| (1.25..=2.2).contains(&s.price)));
}
