//! Project listings: awards per company, shared projects between two
//! bidders, bidders per project, monthly award totals and top winners.

use crate::error::{IntelError, StoreResultExt};
use crate::join::DisplayNames;
use crate::model::{Bid, Project};
use crate::ratio_math::sum;
use crate::store::{BidFilter, DataStore, ProjectFilter};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// An awarded project as listed for its winner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyProject {
    pub project_id: String,
    pub winner: String,
    pub project_name: String,
    pub sum_price_agree: f64,
    pub transaction_date: Option<NaiveDate>,
    pub contract_date: Option<NaiveDate>,
}

/// A project two companies both bid on, with both bids side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorProject {
    pub project_id: String,
    pub project_name: Option<String>,
    /// Awarded value
    pub winning_bid: Option<f64>,
    pub winner: Option<String>,
    pub winner_tin: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub contract_date: Option<NaiveDate>,
    pub company_name: String,
    pub company_bid: Option<f64>,
    pub competitor_name: String,
    pub competitor_bid: Option<f64>,
    /// `Some(true)` company won, `Some(false)` competitor won, else `None`
    pub company_won: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ProjectBidder {
    pub tin: String,
    pub company: Option<String>,
    pub project_id: String,
}

/// Awarded value and project count for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    pub year: i32,
    /// 1-12
    pub month: u32,
    pub month_name: String,
    pub total_sum_price_agree: f64,
    pub count: usize,
}

// ============================================================================
// Company projects
// ============================================================================

/// Projects won by `tin`, most recent first.
///
/// Only named projects with a positive value are listed. When nothing is
/// recorded under the TIN, projects whose `winner` matches the company's
/// display name (case-insensitive) are listed instead.
pub fn company_projects(
    store: &dyn DataStore,
    tin: &str,
) -> Result<Vec<CompanyProject>, IntelError> {
    const OP: &str = "company_projects";

    let won = store.projects(&ProjectFilter::winner_tins([tin])).during(OP)?;
    let listed = list_projects(&won);
    if !listed.is_empty() {
        log::debug!("company_projects {}: {} projects", tin, listed.len());
        return Ok(listed);
    }

    let bids = store.bids(&BidFilter::tins([tin])).during(OP)?;
    let Some(name) = DisplayNames::from_bids(&bids).get(tin).map(str::to_lowercase) else {
        return Ok(Vec::new());
    };
    log::info!("No projects recorded under TIN {}, matching winner name '{}'", tin, name);

    let all = store.projects(&ProjectFilter::all()).during(OP)?;
    let by_name: Vec<Project> = all
        .into_iter()
        .filter(|p| {
            p.winner
                .as_deref()
                .is_some_and(|w| w.trim().to_lowercase() == name)
        })
        .collect();
    Ok(list_projects(&by_name))
}

/// [`company_projects`] for several TINs at once, without the name fallback.
pub fn company_projects_bulk(
    store: &dyn DataStore,
    tins: &BTreeSet<String>,
) -> Result<Vec<CompanyProject>, IntelError> {
    if tins.is_empty() {
        return Ok(Vec::new());
    }
    let won = store
        .projects(&ProjectFilter::winner_tins(tins.iter().cloned()))
        .during("company_projects_bulk")?;
    Ok(list_projects(&won))
}

/// Named, positively valued projects ordered by date then value.
fn list_projects(projects: &[Project]) -> Vec<CompanyProject> {
    let mut listed: Vec<(&Project, CompanyProject)> = projects
        .iter()
        .filter_map(|p| Some((p, listing(p)?)))
        .collect();
    listed.sort_by(|(a, _), (b, _)| by_date_then_value(a, b));
    listed.into_iter().map(|(_, row)| row).collect()
}

fn listing(p: &Project) -> Option<CompanyProject> {
    let project_name = p.project_name.clone()?;
    let sum_price_agree = p.positive_value()?;
    Some(CompanyProject {
        project_id: p.project_id.clone(),
        winner: p.winner.clone().unwrap_or_default(),
        project_name,
        sum_price_agree,
        transaction_date: p.transaction_date,
        contract_date: p.contract_date,
    })
}

/// Effective date descending with undated last, value descending, id ascending.
fn by_date_then_value(a: &Project, b: &Project) -> Ordering {
    newest_first(a.effective_date(), b.effective_date())
        .then_with(|| {
            let (x, y) = (a.sum_price_agree.unwrap_or(0.0), b.sum_price_agree.unwrap_or(0.0));
            y.total_cmp(&x)
        })
        .then_with(|| a.project_id.cmp(&b.project_id))
}

fn newest_first(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ============================================================================
// Competitor projects
// ============================================================================

/// Known projects both `tin` and `competitor_tin` bid on, newest contract first.
///
/// When a company bid more than once on a project its lowest recorded amount
/// is shown.
pub fn competitor_projects(
    store: &dyn DataStore,
    tin: &str,
    competitor_tin: &str,
) -> Result<Vec<CompetitorProject>, IntelError> {
    const OP: &str = "competitor_projects";

    let bids = store.bids(&BidFilter::tins([tin, competitor_tin])).during(OP)?;
    let mine: BTreeSet<&str> = project_ids_of(&bids, tin);
    let theirs: BTreeSet<&str> = project_ids_of(&bids, competitor_tin);
    let shared: BTreeSet<&str> = mine.intersection(&theirs).copied().collect();
    if shared.is_empty() {
        return Ok(Vec::new());
    }

    let projects = store
        .projects(&ProjectFilter::project_ids(shared.iter().copied()))
        .during(OP)?;
    let names = DisplayNames::from_bids(&bids);
    let company_name = names.name_or_tin(tin);
    let competitor_name = names.name_or_tin(competitor_tin);

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut rows: Vec<CompetitorProject> = projects
        .iter()
        .filter(|p| seen.insert(p.project_id.as_str()))
        .map(|p| CompetitorProject {
            project_id: p.project_id.clone(),
            project_name: p.project_name.clone(),
            winning_bid: p.sum_price_agree,
            winner: p.winner.clone(),
            winner_tin: p.winner_tin.clone(),
            transaction_date: p.transaction_date,
            contract_date: p.contract_date,
            company_name: company_name.clone(),
            company_bid: lowest_bid(&bids, &p.project_id, tin),
            competitor_name: competitor_name.clone(),
            competitor_bid: lowest_bid(&bids, &p.project_id, competitor_tin),
            company_won: if p.is_won_by(tin) {
                Some(true)
            } else if p.is_won_by(competitor_tin) {
                Some(false)
            } else {
                None
            },
        })
        .collect();

    rows.sort_by(|a, b| {
        newest_first(a.contract_date, b.contract_date).then_with(|| a.project_id.cmp(&b.project_id))
    });
    log::debug!("competitor_projects {} vs {}: {} shared", tin, competitor_tin, rows.len());
    Ok(rows)
}

fn project_ids_of<'a>(bids: &'a [Bid], tin: &str) -> BTreeSet<&'a str> {
    bids.iter()
        .filter(|b| b.is_by(tin))
        .map(|b| b.project_id.as_str())
        .collect()
}

fn lowest_bid(bids: &[Bid], project_id: &str, tin: &str) -> Option<f64> {
    bids.iter()
        .filter(|b| b.project_id == project_id && b.is_by(tin))
        .filter_map(|b| b.bid.filter(|v| v.is_finite()))
        .min_by(f64::total_cmp)
}

// ============================================================================
// Project bidders
// ============================================================================

/// Distinct bidders on the given projects, ordered by company name, then TIN,
/// then project id. Unnamed bidders come last.
pub fn project_bidders(
    store: &dyn DataStore,
    project_ids: &BTreeSet<String>,
) -> Result<Vec<ProjectBidder>, IntelError> {
    if project_ids.is_empty() {
        return Ok(Vec::new());
    }
    let bids = store
        .bids(&BidFilter::project_ids(project_ids.iter().cloned()))
        .during("project_bidders")?;

    let distinct: BTreeSet<ProjectBidder> = bids
        .iter()
        .filter_map(|b| {
            Some(ProjectBidder {
                tin: b.tin()?.to_string(),
                company: b.company.clone(),
                project_id: b.project_id.clone(),
            })
        })
        .collect();

    let mut rows: Vec<ProjectBidder> = distinct.into_iter().collect();
    rows.sort_by(|a, b| {
        (a.company.is_none(), &a.company, &a.tin, &a.project_id)
            .cmp(&(b.company.is_none(), &b.company, &b.tin, &b.project_id))
    });
    Ok(rows)
}

// ============================================================================
// Monthly totals
// ============================================================================

/// Awarded value and project count per contract month, oldest first.
///
/// Projects without a `contract_date` are left out. Missing values count
/// toward `count` but add nothing to the total.
pub fn monthly_totals(
    store: &dyn DataStore,
    year: Option<i32>,
) -> Result<Vec<MonthlyTotal>, IntelError> {
    let projects = store.projects(&ProjectFilter::all()).during("monthly_totals")?;
    Ok(aggregate_monthly(&projects, year))
}

pub fn aggregate_monthly(projects: &[Project], year: Option<i32>) -> Vec<MonthlyTotal> {
    let mut months: BTreeMap<(i32, u32), (NaiveDate, Vec<Option<f64>>)> = BTreeMap::new();
    for p in projects {
        let Some(date) = p.contract_date else {
            continue;
        };
        if year.is_some_and(|y| y != date.year()) {
            continue;
        }
        months
            .entry((date.year(), date.month()))
            .or_insert_with(|| (date, Vec::new()))
            .1
            .push(p.sum_price_agree);
    }

    months
        .into_iter()
        .map(|((year, month), (date, values))| MonthlyTotal {
            year,
            month,
            month_name: date.format("%B").to_string(),
            total_sum_price_agree: sum(values.iter().copied()),
            count: values.len(),
        })
        .collect()
}

// ============================================================================
// Top company projects
// ============================================================================

/// All listable projects of the `limit` winners with the highest total
/// awarded value, largest project first.
pub fn top_company_projects(
    store: &dyn DataStore,
    limit: usize,
) -> Result<Vec<CompanyProject>, IntelError> {
    let projects = store
        .projects(&ProjectFilter::all())
        .during("top_company_projects")?;
    Ok(rank_top_companies(&projects, limit))
}

pub fn rank_top_companies(projects: &[Project], limit: usize) -> Vec<CompanyProject> {
    let mut values: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
    for p in projects {
        if let (Some(winner), Some(value)) = (p.winner.as_deref(), p.positive_value()) {
            values.entry(winner).or_default().push(Some(value));
        }
    }

    let mut totals: Vec<(&str, f64)> = values
        .into_iter()
        .map(|(winner, vals)| (winner, sum(vals)))
        .collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals.truncate(limit);
    let top: BTreeSet<&str> = totals.into_iter().map(|(winner, _)| winner).collect();

    let mut rows: Vec<CompanyProject> = projects
        .iter()
        .filter(|p| p.winner.as_deref().is_some_and(|w| top.contains(w)))
        .filter_map(listing)
        .collect();
    rows.sort_by(|a, b| {
        b.sum_price_agree
            .total_cmp(&a.sum_price_agree)
            .then_with(|| a.project_id.cmp(&b.project_id))
    });
    rows
}
