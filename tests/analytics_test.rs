//! Integration tests against the CSV fixtures in `tests/fixtures/`.
//!
//! The fixture holds four bidders (T100-T400) over six projects, plus a bid
//! on an unknown project, a bid without TIN, and one malformed row in each
//! file that the loader must skip.

use bid_intel_toolkit::projects::aggregate_monthly;
use bid_intel_toolkit::win_rate::aggregate_win_rates;
use bid_intel_toolkit::{
    CsvStore, DataStore, Engine, IntelError, MemoryStore, StoreStatus,
};
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn csv_store() -> CsvStore {
    CsvStore::new(fixture("projects.csv"), fixture("bids.csv"))
}

fn memory_store() -> MemoryStore {
    MemoryStore::load_csv(&fixture("projects.csv"), &fixture("bids.csv")).unwrap()
}

fn tins(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let v = actual.expect("value should be defined");
    assert!((v - expected).abs() < 1e-9, "expected {}, got {}", expected, v);
}

#[test]
fn test_store_status() {
    let status = StoreStatus::collect(&csv_store()).unwrap();
    assert_eq!(status.projects, 6);
    assert_eq!(status.bids, 15);
    assert_eq!(status.companies, 4);
    assert_eq!(status.orphan_bids, 1);
    assert_eq!(status.bids_without_tin, 1);
    assert_eq!(status.invalid_bid_amounts, 1);
    assert_eq!(status.projects_without_value, 1);
    assert_eq!(status.tins_with_name_variants, 1);
    assert_eq!(status.duplicate_project_ids, 0);
}

#[test]
fn test_win_rates() {
    let store = csv_store();
    let engine = Engine::new(&store);
    let rows = engine
        .win_rates(&tins(&["T100", "T200", "T300", "T400"]))
        .unwrap();

    let order: Vec<&str> = rows.iter().map(|r| r.tin.as_str()).collect();
    assert_eq!(order, vec!["T200", "T300", "T100", "T400"]);

    let alpha = &rows[2];
    assert_eq!(alpha.company, "ALPHA CONSTRUCTION");
    assert_eq!(alpha.total_bids, 5);
    assert_eq!(alpha.wins, 2);
    assert_eq!(alpha.win_rate_pct, Some(40.0));
    assert_eq!(alpha.total_bid_value, 2_080_000.0);
    // P5 is worth 0 and contributes no ratio
    assert_close(alpha.avg_bid_ratio, (0.8 + 0.9 + 1.025 + 1.04) / 4.0);

    // The P9 bid has no project: counted, never a win
    let delta = &rows[3];
    assert_eq!(delta.total_bids, 3);
    assert_eq!(delta.wins, 0);
    assert_eq!(delta.win_rate_pct, Some(0.0));

    for r in &rows {
        assert!(r.wins <= r.total_bids);
        let rate = r.win_rate_pct.unwrap();
        assert!((0.0..=100.0).contains(&rate));
    }
}

#[test]
fn test_win_rates_unknown_tin_is_absent() {
    let store = csv_store();
    let rows = Engine::new(&store).win_rates(&tins(&["T100", "NOPE"])).unwrap();
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_win_rates_order_independent() {
    let store = memory_store();
    let projects = store.projects(&Default::default()).unwrap();
    let bids = store.bids(&Default::default()).unwrap();
    let expected = aggregate_win_rates(&projects, &bids);

    let mut reversed = bids.clone();
    reversed.reverse();
    assert_eq!(aggregate_win_rates(&projects, &reversed), expected);

    let mut rotated = bids.clone();
    rotated.rotate_left(5);
    assert_eq!(aggregate_win_rates(&projects, &rotated), expected);
}

#[test]
fn test_search() {
    let store = csv_store();
    let engine = Engine::new(&store);

    let rows = engine.search_companies("alpha").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tin, "T100");
    assert_eq!(rows[0].total_bids, 5);

    let by_tin = engine.search_companies("t2").unwrap();
    assert_eq!(by_tin[0].tin, "T200");

    // Only valid bids are searched; Epsilon's row was malformed
    assert!(engine.search_companies("epsilon").unwrap().is_empty());
    assert!(matches!(
        engine.search_companies("a"),
        Err(IntelError::InvalidInput(_))
    ));
}

#[test]
fn test_head_to_head() {
    let store = csv_store();
    let engine = Engine::new(&store);
    let result = engine.head_to_head("T100", None).unwrap();
    assert_eq!(result.company, "ALPHA CONSTRUCTION");

    let order: Vec<&str> = result
        .competitors
        .iter()
        .map(|c| c.competitor_tin.as_str())
        .collect();
    assert_eq!(order, vec!["T200", "T300", "T400"]);

    let beta = &result.competitors[0];
    assert_eq!(beta.competitor, "Beta Engineering");
    assert_eq!(beta.encounters, 3);
    assert_eq!(beta.company_wins, 2);
    assert_eq!(beta.competitor_wins, 1);
    assert_eq!(beta.win_rate_vs_competitor, 66.67);

    for c in &result.competitors {
        assert!(c.company_wins + c.competitor_wins <= c.encounters);
        assert!(c.encounters > 1);
    }

    let top = engine.head_to_head("T100", Some(2)).unwrap();
    assert_eq!(top.competitors.len(), 2);

    assert!(matches!(
        engine.head_to_head("NOPE", None),
        Err(IntelError::NotFound { .. })
    ));
}

#[test]
fn test_bid_strategy() {
    let store = csv_store();
    let engine = Engine::new(&store);
    let result = engine.bid_strategy("T100").unwrap();
    let s = &result.bid_ratio_stats;

    assert_eq!(s.valid_bids, 5);
    assert_eq!(s.min_bid_ratio, Some(0.8));
    assert_eq!(s.max_bid_ratio, Some(1.04));
    assert_close(s.median_bid_ratio, (0.9 + 1.025) / 2.0);
    assert_close(s.avg_winning_bid_ratio, 0.85);
    assert_close(s.avg_losing_bid_ratio, (1.04 + 1.025) / 2.0);
    assert!(s.std_bid_ratio.is_some());

    // Population: T100 and T200 have three or more valid bids; T200 prices higher
    assert_eq!(s.percentile, Some(50.0));
    let beta = engine.bid_strategy("T200").unwrap();
    assert_eq!(beta.bid_ratio_stats.percentile, Some(100.0));

    let depts: Vec<(&str, usize, usize)> = result
        .department_analysis
        .iter()
        .map(|d| (d.dept_name.as_str(), d.bids, d.wins))
        .collect();
    assert_eq!(
        depts,
        vec![("Highways", 2, 1), ("Waterworks", 2, 1), ("Education", 1, 0)]
    );
}

#[test]
fn test_bid_strategy_below_threshold_is_projected() {
    let store = csv_store();
    // T300: two valid bids (0.99 and 1.0), both above every population average
    let result = Engine::new(&store).bid_strategy("T300").unwrap();
    assert_eq!(result.bid_ratio_stats.valid_bids, 2);
    assert_eq!(result.bid_ratio_stats.percentile, Some(100.0));
}

#[test]
fn test_adjacent_companies() {
    let store = csv_store();
    let rows = Engine::new(&store).adjacent_companies("T100").unwrap();

    let summary: Vec<(&str, usize, usize, usize, f64)> = rows
        .iter()
        .map(|r| (r.tin.as_str(), r.common_bids, r.total_bids, r.wins, r.win_rate_pct))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("T200", 3, 4, 2, 50.0),
            ("T300", 2, 2, 1, 50.0),
            // P9 does not resolve, so only two of Delta's three bids count
            ("T400", 2, 2, 0, 0.0),
        ]
    );
    assert!(Engine::new(&store)
        .adjacent_companies("NOPE")
        .unwrap()
        .is_empty());
}

#[test]
fn test_project_listings() {
    let store = csv_store();
    let engine = Engine::new(&store);

    let won: Vec<String> = engine
        .company_projects("T100")
        .unwrap()
        .into_iter()
        .map(|p| p.project_id)
        .collect();
    assert_eq!(won, vec!["P3", "P1"]);

    let shared = engine.competitor_projects("T100", "T200").unwrap();
    let rows: Vec<(&str, Option<bool>)> = shared
        .iter()
        .map(|p| (p.project_id.as_str(), p.company_won))
        .collect();
    assert_eq!(
        rows,
        vec![("P3", Some(true)), ("P2", Some(false)), ("P1", Some(true))]
    );

    let bidders = engine.project_bidders(&tins(&["P5"])).unwrap();
    assert_eq!(bidders.len(), 2);
    assert_eq!(bidders[0].company.as_deref(), Some("Alpha Construction"));

    let top = engine.top_company_projects(Some(1)).unwrap();
    let ids: Vec<&str> = top.iter().map(|p| p.project_id.as_str()).collect();
    assert_eq!(ids, vec!["P1", "P3"]);
}

#[test]
fn test_monthly_totals() {
    let store = memory_store();
    let engine = Engine::new(&store);

    let all = engine.monthly_totals(None).unwrap();
    let months: Vec<(i32, u32, usize)> = all.iter().map(|m| (m.year, m.month, m.count)).collect();
    assert_eq!(
        months,
        vec![(2023, 1, 1), (2023, 2, 2), (2023, 3, 1), (2024, 1, 1)]
    );
    assert_eq!(all[1].total_sum_price_agree, 750_000.0);
    assert_eq!(all[1].month_name, "February");

    let projects = store.projects(&Default::default()).unwrap();
    assert_eq!(aggregate_monthly(&projects, Some(2023)).len(), 3);
}

#[test]
fn test_results_are_idempotent() {
    let store = csv_store();
    let engine = Engine::new(&store);

    assert_eq!(
        engine.bid_strategy("T100").unwrap(),
        engine.bid_strategy("T100").unwrap()
    );
    assert_eq!(
        engine.head_to_head("T200", None).unwrap(),
        engine.head_to_head("T200", None).unwrap()
    );
    assert_eq!(
        engine.adjacent_companies("T400").unwrap(),
        engine.adjacent_companies("T400").unwrap()
    );
}

#[test]
fn test_memory_and_csv_stores_agree() {
    let csv = csv_store();
    let mem = memory_store();
    assert_eq!(
        Engine::new(&csv).dossier("T100").unwrap(),
        Engine::new(&mem).dossier("T100").unwrap()
    );
}

#[test]
fn test_export_workbook() {
    let store = memory_store();
    let dossier = Engine::new(&store).dossier("T100").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dossier.xlsx");
    let summary = bid_intel_toolkit::report::export_workbook(&dossier, &path).unwrap();

    assert!(path.exists());
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
    assert!(summary.contains("Competitors: 3"));
    assert!(summary.contains("Adjacent: 3"));
}
