//! Per-company bid and win tallies.

use crate::error::{IntelError, StoreResultExt};
use crate::join::{group_by_tin, left_join, DisplayNames, JoinedBid, ProjectIndex};
use crate::model::{Bid, Project};
use crate::ratio_math::{mean, pct, round_to, sum};
use crate::store::{BidFilter, DataStore, ProjectFilter};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Bid/win summary for one company.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyWinRate {
    pub tin: String,
    /// Display name
    pub company: String,
    pub total_bids: usize,
    pub wins: usize,
    /// `100 * wins / total_bids`, two decimals
    pub win_rate_pct: Option<f64>,
    /// Sum of recorded bid amounts
    pub total_bid_value: f64,
    pub avg_bid: Option<f64>,
    /// Mean of the defined bid ratios
    pub avg_bid_ratio: Option<f64>,
}

/// Win rates for the given TINs, highest rate first.
///
/// TINs without any bids are absent from the result. Ties are broken by
/// `total_bids` descending, then TIN ascending.
pub fn win_rates(
    store: &dyn DataStore,
    tins: &BTreeSet<String>,
) -> Result<Vec<CompanyWinRate>, IntelError> {
    if tins.is_empty() {
        return Ok(Vec::new());
    }

    let bids = store
        .bids(&BidFilter::tins(tins.iter().cloned()))
        .during("win_rates")?;
    let projects = projects_for(store, &bids, "win_rates")?;

    let mut rows = aggregate_win_rates(&projects, &bids);
    rows.sort_by(compare_by_win_rate);
    Ok(rows)
}

/// Companies whose name or TIN contains `query` (case-insensitive).
///
/// Only valid bids (TIN present, amount `> 0`) are considered. A company
/// matches when any of its valid bids matches; its summary then covers all of
/// its valid bids. Ordered by `total_bids` descending and capped at `limit`.
pub fn search_companies(
    store: &dyn DataStore,
    query: &str,
    limit: usize,
) -> Result<Vec<CompanyWinRate>, IntelError> {
    let needle = query.trim().to_lowercase();

    let valid: Vec<Bid> = store
        .bids(&BidFilter::all())
        .during("search_companies")?
        .into_iter()
        .filter(|b| b.tin.is_some() && b.positive_amount().is_some())
        .collect();

    let matched: BTreeSet<&str> = valid
        .iter()
        .filter(|b| bid_matches(b, &needle))
        .filter_map(Bid::tin)
        .collect();
    log::debug!("search '{}': {} matching companies", needle, matched.len());

    let kept: Vec<Bid> = valid
        .iter()
        .filter(|b| b.tin().is_some_and(|tin| matched.contains(tin)))
        .cloned()
        .collect();
    let projects = projects_for(store, &kept, "search_companies")?;

    let mut rows = aggregate_win_rates(&projects, &kept);
    rows.retain(|r| r.total_bids >= 1);
    rows.sort_by(|a, b| b.total_bids.cmp(&a.total_bids).then_with(|| a.tin.cmp(&b.tin)));
    rows.truncate(limit);
    Ok(rows)
}

/// Aggregate every TIN present in `bids`. Output is in TIN order.
pub fn aggregate_win_rates(projects: &[Project], bids: &[Bid]) -> Vec<CompanyWinRate> {
    let index = ProjectIndex::new(projects);
    let joined = left_join(bids, &index);
    let names = DisplayNames::from_bids(bids);
    let groups: Vec<_> = group_by_tin(&joined).into_iter().collect();

    groups
        .par_iter()
        .map(|(tin, rows)| summarize(tin, rows, &names))
        .collect()
}

fn summarize(tin: &str, rows: &[JoinedBid<'_>], names: &DisplayNames) -> CompanyWinRate {
    let total_bids = rows.len();
    let wins = rows.iter().filter(|j| j.won()).count();

    CompanyWinRate {
        tin: tin.to_string(),
        company: names.name_or_tin(tin),
        total_bids,
        wins,
        win_rate_pct: pct(wins, total_bids).map(|p| round_to(p, 2)),
        total_bid_value: sum(rows.iter().map(|j| j.bid.bid)),
        avg_bid: mean(rows.iter().map(|j| j.bid.bid)),
        avg_bid_ratio: mean(rows.iter().map(|j| j.ratio())),
    }
}

fn bid_matches(bid: &Bid, needle: &str) -> bool {
    let hit = |field: Option<&str>| field.is_some_and(|s| s.to_lowercase().contains(needle));
    hit(bid.company.as_deref()) || hit(bid.tin())
}

/// Projects referenced by `bids`, fetched in one filtered read.
pub(crate) fn projects_for(
    store: &dyn DataStore,
    bids: &[Bid],
    operation: &'static str,
) -> Result<Vec<Project>, IntelError> {
    if bids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: BTreeSet<&str> = bids.iter().map(|b| b.project_id.as_str()).collect();
    store
        .projects(&ProjectFilter::project_ids(ids))
        .during(operation)
}

/// Rate descending (undefined last), then bids descending, then TIN ascending.
fn compare_by_win_rate(a: &CompanyWinRate, b: &CompanyWinRate) -> Ordering {
    let rate = match (a.win_rate_pct, b.win_rate_pct) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    rate.then_with(|| b.total_bids.cmp(&a.total_bids))
        .then_with(|| a.tin.cmp(&b.tin))
}
