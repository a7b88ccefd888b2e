//! Pairwise competitor comparison restricted to shared projects.

use crate::error::{IntelError, StoreResultExt};
use crate::join::{projects_by_tin, DisplayNames, ProjectIndex};
use crate::model::{Bid, Project};
use crate::ratio_math::{pct, round_to};
use crate::store::{BidFilter, DataStore, ProjectFilter};
use serde::Serialize;
use std::collections::BTreeSet;

/// Subject vs one competitor over the projects both bid on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadEntry {
    pub competitor_tin: String,
    pub competitor: String,
    /// Distinct projects both companies bid on
    pub encounters: usize,
    /// Shared projects won by the subject
    pub company_wins: usize,
    /// Shared projects won by the competitor
    pub competitor_wins: usize,
    /// `100 * company_wins / encounters`, two decimals
    pub win_rate_vs_competitor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadResult {
    /// Subject display name
    pub company: String,
    /// Ordered by encounters, most frequent first
    pub competitors: Vec<HeadToHeadEntry>,
}

/// Head-to-head breakdown of `tin` against its `top_n` most frequent rivals.
///
/// Competitors met on a single project only are not considered head-to-head
/// and are left out. Returns [`IntelError::NotFound`] when `tin` never bid.
pub fn head_to_head(
    store: &dyn DataStore,
    tin: &str,
    top_n: usize,
) -> Result<HeadToHeadResult, IntelError> {
    const OP: &str = "head_to_head";

    let subject_bids = store.bids(&BidFilter::tins([tin])).during(OP)?;
    if subject_bids.is_empty() {
        return Err(IntelError::not_found(tin));
    }
    let company = DisplayNames::from_bids(&subject_bids).name_or_tin(tin);

    let subject_projects: BTreeSet<&str> =
        subject_bids.iter().map(|b| b.project_id.as_str()).collect();
    let shared_bids = store
        .bids(&BidFilter::project_ids(subject_projects.iter().copied()))
        .during(OP)?;
    let projects = store
        .projects(&ProjectFilter::project_ids(subject_projects.iter().copied()))
        .during(OP)?;

    let mut competitors = rank_competitors(tin, &projects, &shared_bids, top_n);

    // Competitor names come from their full bid history, not just the shared slice
    if !competitors.is_empty() {
        let rival_bids = store
            .bids(&BidFilter::tins(
                competitors.iter().map(|c| c.competitor_tin.clone()),
            ))
            .during(OP)?;
        let names = DisplayNames::from_bids(&rival_bids);
        for c in &mut competitors {
            c.competitor = names.name_or_tin(&c.competitor_tin);
        }
    }

    log::debug!(
        "head_to_head {}: {} shared projects, {} competitors kept",
        tin,
        subject_projects.len(),
        competitors.len()
    );

    Ok(HeadToHeadResult {
        company,
        competitors,
    })
}

/// Rank rivals of `tin` among `bids` and tally wins on the shared projects.
///
/// `bids` must contain every bid on the subject's projects. Only projects
/// present in `projects` count as shared. Competitor names are resolved from
/// `bids`.
pub fn rank_competitors(
    tin: &str,
    projects: &[Project],
    bids: &[Bid],
    top_n: usize,
) -> Vec<HeadToHeadEntry> {
    let index = ProjectIndex::new(projects);
    let names = DisplayNames::from_bids(bids);
    let mut sets = projects_by_tin(bids);
    // Projects missing from the project relation are never encounters
    for set in sets.values_mut() {
        set.retain(|pid| index.get(pid).is_some());
    }

    let Some(subject_set) = sets.get(tin) else {
        return Vec::new();
    };

    // (competitor, shared projects), only rivals met more than once
    let mut rivals: Vec<(&str, Vec<&str>)> = sets
        .iter()
        .filter(|(other, _)| **other != tin)
        .map(|(other, set)| (*other, set.intersection(subject_set).copied().collect::<Vec<_>>()))
        .filter(|(_, shared)| shared.len() > 1)
        .collect();

    rivals.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
    rivals.truncate(top_n);

    rivals
        .into_iter()
        .map(|(other, shared)| {
            let won_by = |who: &str| {
                shared
                    .iter()
                    .filter(|pid| index.get(pid).is_some_and(|p| p.is_won_by(who)))
                    .count()
            };
            let company_wins = won_by(tin);
            let competitor_wins = won_by(other);
            let encounters = shared.len();

            HeadToHeadEntry {
                competitor_tin: other.to_string(),
                competitor: names.name_or_tin(other),
                encounters,
                company_wins,
                competitor_wins,
                win_rate_vs_competitor: pct(company_wins, encounters)
                    .map(|p| round_to(p, 2))
                    .unwrap_or(0.0),
            }
        })
        .collect()
}
