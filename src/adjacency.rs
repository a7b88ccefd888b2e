//! Co-bidder discovery: who keeps showing up on the same projects.

use crate::error::{IntelError, StoreResultExt};
use crate::join::{projects_by_tin, DisplayNames, ProjectIndex};
use crate::model::{Bid, Project};
use crate::ratio_math::{pct, round_to};
use crate::store::{BidFilter, DataStore};
use crate::win_rate::projects_for;
use serde::Serialize;
use std::collections::BTreeSet;

/// A company that bid on at least one of the subject's projects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjacentCompany {
    pub tin: String,
    pub company: String,
    /// Distinct projects shared with the subject
    pub common_bids: usize,
    /// Distinct known projects this company bid on, anywhere
    pub total_bids: usize,
    /// Distinct projects this company won, anywhere
    pub wins: usize,
    /// One decimal. `0.0` (not undefined) when `total_bids == 0`.
    pub win_rate_pct: f64,
}

/// Companies sharing projects with `tin`, most shared first, capped at `limit`.
///
/// Win figures describe each company's overall record, not just the shared
/// projects. An unknown subject yields an empty list.
pub fn adjacent_companies(
    store: &dyn DataStore,
    tin: &str,
    limit: usize,
) -> Result<Vec<AdjacentCompany>, IntelError> {
    const OP: &str = "adjacent_companies";

    let subject_bids = store.bids(&BidFilter::tins([tin])).during(OP)?;
    let subject_projects: BTreeSet<&str> =
        subject_bids.iter().map(|b| b.project_id.as_str()).collect();
    if subject_projects.is_empty() {
        return Ok(Vec::new());
    }

    let shared_bids = store
        .bids(&BidFilter::project_ids(subject_projects.iter().copied()))
        .during(OP)?;
    let ranked = rank_co_bidders(tin, &shared_bids, limit);
    if ranked.is_empty() {
        return Ok(Vec::new());
    }

    let history = store
        .bids(&BidFilter::tins(ranked.iter().map(|(other, _)| other.to_string())))
        .during(OP)?;
    let projects = projects_for(store, &history, OP)?;

    let result = summarize_adjacent(&ranked, &projects, &history);
    log::debug!(
        "adjacent_companies {}: {} shared projects, {} co-bidders",
        tin,
        subject_projects.len(),
        result.len()
    );
    Ok(result)
}

/// Other bidders in `bids` with their shared-project count, descending, then
/// TIN ascending. `bids` must cover every bid on the subject's projects.
pub fn rank_co_bidders<'a>(tin: &str, bids: &'a [Bid], limit: usize) -> Vec<(&'a str, usize)> {
    let sets = projects_by_tin(bids);
    let Some(subject_set) = sets.get(tin) else {
        return Vec::new();
    };

    let mut ranked: Vec<(&str, usize)> = sets
        .iter()
        .filter(|(other, _)| **other != tin)
        .map(|(other, set)| (*other, set.intersection(subject_set).count()))
        .filter(|(_, common)| *common > 0)
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Attach global win records to ranked co-bidders. `history` holds every bid
/// of the ranked companies; `projects` the projects those bids reference.
pub fn summarize_adjacent(
    ranked: &[(&str, usize)],
    projects: &[Project],
    history: &[Bid],
) -> Vec<AdjacentCompany> {
    let index = ProjectIndex::new(projects);
    let names = DisplayNames::from_bids(history);
    let sets = projects_by_tin(history);

    ranked
        .iter()
        .map(|&(other, common_bids)| {
            let known: Vec<&Project> = sets
                .get(other)
                .into_iter()
                .flatten()
                .filter_map(|pid| index.get(pid))
                .collect();
            let total_bids = known.len();
            let wins = known.iter().filter(|p| p.is_won_by(other)).count();

            AdjacentCompany {
                tin: other.to_string(),
                company: names.name_or_tin(other),
                common_bids,
                total_bids,
                wins,
                win_rate_pct: pct(wins, total_bids)
                    .map(|p| round_to(p, 1))
                    .unwrap_or(0.0),
            }
        })
        .collect()
}
