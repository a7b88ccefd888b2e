//! Explicit relational join of bids onto projects.
//!
//! Every analyzer goes through [`left_join`] so the join semantics live in one
//! place: a bid whose project cannot be found is kept with `project: None` and
//! counts as a non-win with an undefined ratio.

use crate::model::{Bid, Project};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Projects indexed by id. The first record wins when ids repeat.
pub struct ProjectIndex<'a> {
    by_id: HashMap<&'a str, &'a Project>,
}

impl<'a> ProjectIndex<'a> {
    pub fn new(projects: &'a [Project]) -> Self {
        let mut by_id: HashMap<&'a str, &'a Project> = HashMap::with_capacity(projects.len());
        for p in projects {
            if by_id.contains_key(p.project_id.as_str()) {
                log::debug!("Duplicate project_id {} ignored", p.project_id);
                continue;
            }
            by_id.insert(p.project_id.as_str(), p);
        }
        Self { by_id }
    }

    pub fn get(&self, project_id: &str) -> Option<&'a Project> {
        self.by_id.get(project_id).copied()
    }
}

/// A bid paired with its project, if the project exists.
#[derive(Debug, Clone, Copy)]
pub struct JoinedBid<'a> {
    pub bid: &'a Bid,
    pub project: Option<&'a Project>,
}

impl<'a> JoinedBid<'a> {
    /// Bidder TIN (bids without one never reach the aggregations).
    pub fn tin(&self) -> Option<&'a str> {
        self.bid.tin.as_deref()
    }

    /// `bid.tin == project.winner_tin`; a missing project is a non-win.
    pub fn won(&self) -> bool {
        match (self.project, self.tin()) {
            (Some(p), Some(tin)) => p.is_won_by(tin),
            _ => false,
        }
    }

    /// `bid / sum_price_agree`, undefined when either side is missing or the
    /// denominator is not positive.
    pub fn ratio(&self) -> Option<f64> {
        let amount = self.bid.bid.filter(|v| v.is_finite())?;
        let value = self.project?.positive_value()?;
        Some(amount / value)
    }

    /// Analytically valid: positive amount and a resolvable project.
    pub fn is_valid(&self) -> bool {
        self.bid.positive_amount().is_some() && self.project.is_some()
    }
}

/// Left join of `bids` onto `projects` by `project_id`, preserving bid order.
pub fn left_join<'a>(bids: &'a [Bid], index: &ProjectIndex<'a>) -> Vec<JoinedBid<'a>> {
    let joined: Vec<JoinedBid<'a>> = bids
        .iter()
        .map(|bid| JoinedBid {
            bid,
            project: index.get(&bid.project_id),
        })
        .collect();

    let orphans = joined.iter().filter(|j| j.project.is_none()).count();
    if orphans > 0 {
        log::debug!("{} of {} bids reference unknown projects", orphans, joined.len());
    }
    joined
}

/// Group joined bids by bidder TIN. Bids without a TIN are dropped.
///
/// Uses a `BTreeMap` so iteration is ordered by TIN.
pub fn group_by_tin<'a>(joined: &[JoinedBid<'a>]) -> BTreeMap<&'a str, Vec<JoinedBid<'a>>> {
    let mut groups: BTreeMap<&'a str, Vec<JoinedBid<'a>>> = BTreeMap::new();
    for j in joined {
        if let Some(tin) = j.tin() {
            groups.entry(tin).or_default().push(*j);
        }
    }
    groups
}

/// Distinct project ids each TIN bid on.
pub fn projects_by_tin(bids: &[Bid]) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut sets: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for b in bids {
        if let Some(tin) = b.tin() {
            sets.entry(tin).or_default().insert(b.project_id.as_str());
        }
    }
    sets
}

// ============================================================================
// Display names
// ============================================================================

/// Display name per TIN.
///
/// The same TIN may be recorded under several spellings; the lexicographically
/// smallest trimmed spelling is used so the choice does not depend on row order.
#[derive(Debug, Default, Clone)]
pub struct DisplayNames {
    names: HashMap<String, String>,
}

impl DisplayNames {
    pub fn from_bids(bids: &[Bid]) -> Self {
        let mut names: HashMap<String, String> = HashMap::new();
        for b in bids {
            let (Some(tin), Some(company)) = (b.tin(), b.company.as_deref()) else {
                continue;
            };
            let company = company.trim();
            if company.is_empty() {
                continue;
            }
            match names.get_mut(tin) {
                Some(current) if company < current.as_str() => *current = company.to_string(),
                Some(_) => {}
                None => {
                    names.insert(tin.to_string(), company.to_string());
                }
            }
        }
        Self { names }
    }

    pub fn get(&self, tin: &str) -> Option<&str> {
        self.names.get(tin).map(String::as_str)
    }

    /// Display name, falling back to the TIN itself when no name was recorded.
    pub fn name_or_tin(&self, tin: &str) -> String {
        self.get(tin).unwrap_or(tin).to_string()
    }
}
