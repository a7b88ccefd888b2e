//! Bid-ratio distribution, population percentile and department breakdown
//! for a single company.

use crate::error::{IntelError, StoreResultExt};
use crate::join::{group_by_tin, left_join, DisplayNames, JoinedBid, ProjectIndex};
use crate::model::{Bid, Project};
use crate::ratio_math::{
    clean, mean, median, pct, percentile_rank, projected_percentile_rank, round_to, sample_stddev,
};
use crate::store::{BidFilter, DataStore, ProjectFilter};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Distribution of a company's bid ratios. Every ratio field is `None` when
/// the company has no bid with a defined ratio.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BidRatioStats {
    /// Bids with a positive amount on a known project
    pub valid_bids: usize,
    pub avg_bid_ratio: Option<f64>,
    pub median_bid_ratio: Option<f64>,
    pub min_bid_ratio: Option<f64>,
    pub max_bid_ratio: Option<f64>,
    /// Sample standard deviation; needs two ratios
    pub std_bid_ratio: Option<f64>,
    pub avg_winning_bid_ratio: Option<f64>,
    pub avg_losing_bid_ratio: Option<f64>,
    /// Rank of `avg_bid_ratio` among all sufficiently active bidders, 0-100
    pub percentile: Option<f64>,
}

/// Performance with one awarding department.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentAnalysis {
    pub dept_name: String,
    pub bids: usize,
    pub wins: usize,
    /// Two decimals
    pub win_rate_pct: Option<f64>,
    pub avg_bid_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidStrategyResult {
    pub company: String,
    pub bid_ratio_stats: BidRatioStats,
    /// Most active department first
    pub department_analysis: Vec<DepartmentAnalysis>,
}

/// Bid strategy for `tin`.
///
/// The percentile population is every bidder with at least `min_bids` valid
/// bids and a defined average ratio. A subject below that threshold is
/// projected onto the population rather than ranked inside it.
pub fn bid_strategy(
    store: &dyn DataStore,
    tin: &str,
    min_bids: usize,
) -> Result<BidStrategyResult, IntelError> {
    const OP: &str = "bid_strategy";

    let bids = store.bids(&BidFilter::all()).during(OP)?;
    if !bids.iter().any(|b| b.is_by(tin)) {
        return Err(IntelError::not_found(tin));
    }
    let projects = store.projects(&ProjectFilter::all()).during(OP)?;

    Ok(analyze_bid_strategy(tin, &projects, &bids, min_bids))
}

/// Pure computation behind [`bid_strategy`]. `bids` is the whole relation.
pub fn analyze_bid_strategy(
    tin: &str,
    projects: &[Project],
    bids: &[Bid],
    min_bids: usize,
) -> BidStrategyResult {
    let index = ProjectIndex::new(projects);
    let joined = left_join(bids, &index);
    let valid: Vec<JoinedBid<'_>> = joined.into_iter().filter(JoinedBid::is_valid).collect();
    let groups = group_by_tin(&valid);

    let company = DisplayNames::from_bids(bids).name_or_tin(tin);
    let subject: &[JoinedBid<'_>] = groups.get(tin).map(Vec::as_slice).unwrap_or(&[]);

    let mut stats = ratio_stats(subject);

    // Per-company averages across the whole bidder population
    let population: Vec<(&str, f64)> = groups
        .iter()
        .collect::<Vec<_>>()
        .par_iter()
        .filter(|(_, rows)| rows.len() >= min_bids)
        .filter_map(|(other, rows)| Some((**other, mean(rows.iter().map(|j| j.ratio()))?)))
        .collect();
    let averages: Vec<f64> = population.iter().map(|(_, avg)| *avg).collect();
    let in_population = population.iter().any(|(other, _)| *other == tin);

    stats.percentile = stats.avg_bid_ratio.and_then(|avg| {
        if in_population {
            percentile_rank(&averages, avg)
        } else {
            projected_percentile_rank(&averages, avg)
        }
    });

    log::debug!(
        "bid_strategy {}: {} valid bids, population of {}",
        tin,
        stats.valid_bids,
        averages.len()
    );

    BidStrategyResult {
        company,
        bid_ratio_stats: stats,
        department_analysis: departments(subject),
    }
}

fn ratio_stats(rows: &[JoinedBid<'_>]) -> BidRatioStats {
    let ratios = clean(rows.iter().map(|j| j.ratio()));

    BidRatioStats {
        valid_bids: rows.len(),
        avg_bid_ratio: mean(ratios.iter().copied().map(Some)),
        median_bid_ratio: median(ratios.iter().copied().map(Some)),
        min_bid_ratio: ratios.first().copied(),
        max_bid_ratio: ratios.last().copied(),
        std_bid_ratio: sample_stddev(ratios.iter().copied().map(Some)),
        avg_winning_bid_ratio: mean(rows.iter().filter(|j| j.won()).map(|j| j.ratio())),
        avg_losing_bid_ratio: mean(rows.iter().filter(|j| !j.won()).map(|j| j.ratio())),
        percentile: None,
    }
}

fn departments(rows: &[JoinedBid<'_>]) -> Vec<DepartmentAnalysis> {
    let mut by_dept: BTreeMap<&str, Vec<&JoinedBid<'_>>> = BTreeMap::new();
    for j in rows {
        if let Some(dept) = j.project.and_then(|p| p.dept_name.as_deref()) {
            by_dept.entry(dept).or_default().push(j);
        }
    }

    let mut out: Vec<DepartmentAnalysis> = by_dept
        .into_iter()
        .map(|(dept, rows)| {
            let bids = rows.len();
            let wins = rows.iter().filter(|j| j.won()).count();
            DepartmentAnalysis {
                dept_name: dept.to_string(),
                bids,
                wins,
                win_rate_pct: pct(wins, bids).map(|p| round_to(p, 2)),
                avg_bid_ratio: mean(rows.iter().map(|j| j.ratio())),
            }
        })
        .collect();

    // Stable: equal counts keep department-name order
    out.sort_by(|a, b| b.bids.cmp(&a.bids));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_single_bid_stats() {
        let projects = vec![Project::new("1").with_winner("B", "Beta").with_value(200.0)];
        let bids = vec![Bid::new("1", "A", "Alpha", 150.0)];
        let result = analyze_bid_strategy("A", &projects, &bids, 3);
        let s = &result.bid_ratio_stats;

        assert_eq!(s.valid_bids, 1);
        assert_eq!(s.avg_bid_ratio, Some(0.75));
        assert_eq!(s.median_bid_ratio, s.avg_bid_ratio);
        assert_eq!(s.min_bid_ratio, Some(0.75));
        assert_eq!(s.max_bid_ratio, Some(0.75));
        assert_eq!(s.std_bid_ratio, None);
        assert_eq!(s.avg_winning_bid_ratio, None);
        assert_eq!(s.avg_losing_bid_ratio, Some(0.75));
        // Nobody reaches three bids, so the population is empty
        assert_eq!(s.percentile, None);
    }

    #[test]
    fn test_no_valid_bids_is_not_an_error() {
        let store = MemoryStore::new(
            vec![Project::new("1").with_value(100.0)],
            vec![Bid::new("1", "A", "Alpha", 0.0), Bid::new("404", "A", "Alpha", 5.0)],
        );
        let result = bid_strategy(&store, "A", 3).unwrap();
        assert_eq!(result.company, "Alpha");
        assert_eq!(result.bid_ratio_stats, BidRatioStats::default());
        assert!(result.department_analysis.is_empty());
    }

    #[test]
    fn test_zero_value_project_excluded_from_ratios() {
        let projects = vec![
            Project::new("1").with_value(100.0),
            Project::new("2").with_value(0.0),
        ];
        let bids = vec![Bid::new("1", "A", "Alpha", 80.0), Bid::new("2", "A", "Alpha", 50.0)];
        let result = analyze_bid_strategy("A", &projects, &bids, 3);
        assert_eq!(result.bid_ratio_stats.valid_bids, 2);
        assert_eq!(result.bid_ratio_stats.avg_bid_ratio, Some(0.8));
        assert_eq!(result.bid_ratio_stats.max_bid_ratio, Some(0.8));
    }

    #[test]
    fn test_percentile_inside_population() {
        let mut projects = Vec::new();
        let mut bids = Vec::new();
        // Company i bids (i + 1) * 10 on three projects worth 100
        for (i, tin) in ["A", "B", "C", "D"].iter().enumerate() {
            for k in 0..3 {
                let id = format!("{}{}", tin, k);
                projects.push(Project::new(&id).with_value(100.0));
                bids.push(Bid::new(&id, tin, tin, (i as f64 + 1.0) * 10.0));
            }
        }
        let result = analyze_bid_strategy("B", &projects, &bids, 3);
        assert_eq!(result.bid_ratio_stats.percentile, Some(50.0));

        let result = analyze_bid_strategy("D", &projects, &bids, 3);
        assert_eq!(result.bid_ratio_stats.percentile, Some(100.0));
    }

    #[test]
    fn test_percentile_projected_below_threshold() {
        let mut projects = Vec::new();
        let mut bids = Vec::new();
        for (i, tin) in ["A", "B"].iter().enumerate() {
            for k in 0..3 {
                let id = format!("{}{}", tin, k);
                projects.push(Project::new(&id).with_value(100.0));
                bids.push(Bid::new(&id, tin, tin, (i as f64 + 1.0) * 40.0));
            }
        }
        // Z has one bid at 0.5: above A (0.4), below B (0.8)
        projects.push(Project::new("z").with_value(100.0));
        bids.push(Bid::new("z", "Z", "Zeta", 50.0));

        let result = analyze_bid_strategy("Z", &projects, &bids, 3);
        assert_eq!(result.bid_ratio_stats.percentile, Some(50.0));
    }

    #[test]
    fn test_department_breakdown() {
        let projects = vec![
            Project::new("1").with_winner("A", "Alpha").with_value(100.0).with_dept("Roads"),
            Project::new("2").with_winner("X", "X").with_value(100.0).with_dept("Roads"),
            Project::new("3").with_winner("A", "Alpha").with_value(100.0).with_dept("Water"),
            Project::new("4").with_value(100.0),
        ];
        let bids = vec![
            Bid::new("1", "A", "Alpha", 50.0),
            Bid::new("2", "A", "Alpha", 150.0),
            Bid::new("3", "A", "Alpha", 75.0),
            Bid::new("4", "A", "Alpha", 50.0),
        ];
        let result = analyze_bid_strategy("A", &projects, &bids, 3);
        let depts = &result.department_analysis;

        assert_eq!(depts.len(), 2);
        assert_eq!(depts[0].dept_name, "Roads");
        assert_eq!(depts[0].bids, 2);
        assert_eq!(depts[0].wins, 1);
        assert_eq!(depts[0].win_rate_pct, Some(50.0));
        assert_eq!(depts[0].avg_bid_ratio, Some(1.0));
        assert_eq!(depts[1].dept_name, "Water");
        assert_eq!(depts[1].win_rate_pct, Some(100.0));

        let s = &result.bid_ratio_stats;
        assert_eq!(s.avg_winning_bid_ratio, Some(0.625));
        assert_eq!(s.avg_losing_bid_ratio, Some(1.0));
    }

    #[test]
    fn test_unknown_subject() {
        let store = MemoryStore::new(vec![], vec![Bid::new("1", "B", "Beta", 1.0)]);
        assert!(matches!(
            bid_strategy(&store, "A", 3),
            Err(IntelError::NotFound { .. })
        ));
    }
}
