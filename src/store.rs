//! Read-only access to the `Project` and `Bid` relations.
//!
//! The analyzers only ever see a [`DataStore`]. Two implementations are
//! provided: [`MemoryStore`] (fixtures, or a snapshot loaded once) and
//! [`CsvStore`] (re-reads its files on every call).

use crate::error::StoreError;
use crate::model::{Bid, Project};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

// ============================================================================
// Filters
// ============================================================================

/// Predicate applied by [`DataStore::projects`]. The default matches everything.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    project_ids: Option<HashSet<String>>,
    winner_tins: Option<HashSet<String>>,
}

impl ProjectFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn project_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            project_ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn winner_tins<I, S>(tins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            winner_tins: Some(tins.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn matches(&self, project: &Project) -> bool {
        if let Some(ids) = &self.project_ids {
            if !ids.contains(&project.project_id) {
                return false;
            }
        }
        if let Some(tins) = &self.winner_tins {
            match &project.winner_tin {
                Some(tin) if tins.contains(tin) => {}
                _ => return false,
            }
        }
        true
    }
}

/// Predicate applied by [`DataStore::bids`]. The default matches everything.
#[derive(Debug, Clone, Default)]
pub struct BidFilter {
    tins: Option<HashSet<String>>,
    project_ids: Option<HashSet<String>>,
}

impl BidFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn tins<I, S>(tins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tins: Some(tins.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn project_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            project_ids: Some(ids.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn matches(&self, bid: &Bid) -> bool {
        if let Some(tins) = &self.tins {
            match &bid.tin {
                Some(tin) if tins.contains(tin) => {}
                _ => return false,
            }
        }
        if let Some(ids) = &self.project_ids {
            if !ids.contains(&bid.project_id) {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// DataStore
// ============================================================================

/// Supplier of the two relations. Sequences are returned in store order.
pub trait DataStore: Send + Sync {
    fn projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError>;

    fn bids(&self, filter: &BidFilter) -> Result<Vec<Bid>, StoreError>;

    /// Short human-readable description of where the data comes from.
    fn describe(&self) -> String;
}

/// Relations held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    projects: Vec<Project>,
    bids: Vec<Bid>,
}

impl MemoryStore {
    pub fn new(projects: Vec<Project>, bids: Vec<Bid>) -> Self {
        Self { projects, bids }
    }

    /// Load both CSV files once into memory.
    pub fn load_csv(projects_path: &Path, bids_path: &Path) -> Result<Self, StoreError> {
        let projects = read_projects(projects_path)?;
        let bids = read_bids(bids_path)?;
        log::info!(
            "Loaded {} projects from {} and {} bids from {}",
            projects.len(),
            projects_path.display(),
            bids.len(),
            bids_path.display()
        );
        Ok(Self { projects, bids })
    }
}

impl DataStore for MemoryStore {
    fn projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError> {
        Ok(self
            .projects
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    fn bids(&self, filter: &BidFilter) -> Result<Vec<Bid>, StoreError> {
        Ok(self.bids.iter().filter(|b| filter.matches(b)).cloned().collect())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

/// Relations backed by two CSV files, read again on every call.
#[derive(Debug, Clone)]
pub struct CsvStore {
    projects_path: PathBuf,
    bids_path: PathBuf,
}

impl CsvStore {
    pub fn new(projects_path: impl Into<PathBuf>, bids_path: impl Into<PathBuf>) -> Self {
        Self {
            projects_path: projects_path.into(),
            bids_path: bids_path.into(),
        }
    }
}

impl DataStore for CsvStore {
    fn projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError> {
        let mut rows = read_projects(&self.projects_path)?;
        rows.retain(|p| filter.matches(p));
        Ok(rows)
    }

    fn bids(&self, filter: &BidFilter) -> Result<Vec<Bid>, StoreError> {
        let mut rows = read_bids(&self.bids_path)?;
        rows.retain(|b| filter.matches(b));
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!(
            "csv: {} + {}",
            self.projects_path.display(),
            self.bids_path.display()
        )
    }
}

// ============================================================================
// CSV reading
// ============================================================================

/// Read `projects.csv`. Rows that fail to parse are skipped with a warning.
pub fn read_projects(path: &Path) -> Result<Vec<Project>, StoreError> {
    read_records(path)
}

/// Read `bids.csv`. Rows that fail to parse are skipped with a warning.
pub fn read_bids(path: &Path) -> Result<Vec<Bid>, StoreError> {
    read_records(path)
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let file = std::fs::File::open(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    // Fail early on an unusable header row
    reader.headers().map_err(|source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (row_num, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                // I/O failures mid-file mean the source went away, not a bad row
                if let csv::ErrorKind::Io(_) = e.kind() {
                    return Err(StoreError::Csv {
                        path: path.to_path_buf(),
                        source: e,
                    });
                }
                log::warn!("{} row {}: skipped: {}", path.display(), row_num + 1, e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::warn!(
            "{}: skipped {} malformed rows ({} loaded)",
            path.display(),
            skipped,
            rows.len()
        );
    }
    Ok(rows)
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Row counts and data-quality indicators for a store snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    /// Where the data came from
    pub source: String,
    pub projects: usize,
    pub bids: usize,
    /// Distinct bidder TINs
    pub companies: usize,
    /// Project ids that appear more than once in the project relation
    pub duplicate_project_ids: usize,
    /// Bids whose `project_id` matches no project
    pub orphan_bids: usize,
    /// Bids without a TIN
    pub bids_without_tin: usize,
    /// Bids with a missing or non-positive amount
    pub invalid_bid_amounts: usize,
    /// Projects without a positive `sum_price_agree`
    pub projects_without_value: usize,
    /// TINs recorded under more than one display-name spelling
    pub tins_with_name_variants: usize,
}

impl StoreStatus {
    pub fn collect(store: &dyn DataStore) -> Result<Self, StoreError> {
        let projects = store.projects(&ProjectFilter::all())?;
        let bids = store.bids(&BidFilter::all())?;

        let mut seen_ids: HashSet<&str> = HashSet::new();
        let mut duplicate_project_ids = 0usize;
        for p in &projects {
            if !seen_ids.insert(p.project_id.as_str()) {
                duplicate_project_ids += 1;
            }
        }

        let mut names_by_tin: HashMap<&str, HashSet<&str>> = HashMap::new();
        let mut orphan_bids = 0usize;
        let mut bids_without_tin = 0usize;
        let mut invalid_bid_amounts = 0usize;
        for b in &bids {
            if !seen_ids.contains(b.project_id.as_str()) {
                orphan_bids += 1;
            }
            if b.positive_amount().is_none() {
                invalid_bid_amounts += 1;
            }
            match b.tin() {
                Some(tin) => {
                    let names = names_by_tin.entry(tin).or_default();
                    if let Some(name) = b.company.as_deref() {
                        names.insert(name);
                    }
                }
                None => bids_without_tin += 1,
            }
        }

        Ok(StoreStatus {
            source: store.describe(),
            projects: projects.len(),
            bids: bids.len(),
            companies: names_by_tin.len(),
            duplicate_project_ids,
            orphan_bids,
            bids_without_tin,
            invalid_bid_amounts,
            projects_without_value: projects
                .iter()
                .filter(|p| p.positive_value().is_none())
                .count(),
            tins_with_name_variants: names_by_tin.values().filter(|n| n.len() > 1).count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_store() -> MemoryStore {
        MemoryStore::new(
            vec![
                Project::new("1").with_winner("A", "Alpha").with_value(100.0),
                Project::new("2").with_winner("B", "Beta").with_value(0.0),
            ],
            vec![
                Bid::new("1", "A", "Alpha", 90.0),
                Bid::new("1", "B", "Beta", 95.0),
                Bid::new("2", "B", "BETA ", 50.0),
                Bid::new("9", "A", "Alpha", -1.0),
            ],
        )
    }

    #[test]
    fn test_bid_filter_by_tin() {
        let store = sample_store();
        let bids = store.bids(&BidFilter::tins(["B"])).unwrap();
        assert_eq!(bids.len(), 2);
        assert!(bids.iter().all(|b| b.is_by("B")));
    }

    #[test]
    fn test_bid_filter_skips_missing_tin() {
        let mut store = sample_store();
        store.bids.push(Bid {
            project_id: "1".to_string(),
            tin: None,
            company: None,
            bid: Some(1.0),
        });
        assert_eq!(store.bids(&BidFilter::tins(["A"])).unwrap().len(), 2);
        assert_eq!(store.bids(&BidFilter::all()).unwrap().len(), 5);
    }

    #[test]
    fn test_project_filter() {
        let store = sample_store();
        assert_eq!(store.projects(&ProjectFilter::project_ids(["2"])).unwrap().len(), 1);
        assert_eq!(store.projects(&ProjectFilter::winner_tins(["A"])).unwrap()[0].project_id, "1");
        assert!(store.projects(&ProjectFilter::winner_tins(["Z"])).unwrap().is_empty());
    }

    #[test]
    fn test_status_counts() {
        let status = StoreStatus::collect(&sample_store()).unwrap();
        assert_eq!(status.projects, 2);
        assert_eq!(status.bids, 4);
        assert_eq!(status.companies, 2);
        assert_eq!(status.orphan_bids, 1);
        assert_eq!(status.invalid_bid_amounts, 1);
        assert_eq!(status.projects_without_value, 1);
        assert_eq!(status.tins_with_name_variants, 1);
        assert_eq!(status.duplicate_project_ids, 0);
    }

    #[test]
    fn test_csv_store_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let projects = dir.path().join("projects.csv");
        let bids = dir.path().join("bids.csv");

        let mut f = std::fs::File::create(&projects).unwrap();
        writeln!(f, "project_id,project_name,winner,winner_tin,sum_price_agree,dept_name,transaction_date,contract_date").unwrap();
        writeln!(f, "1,Bridge,Alpha,A,100,Roads,2021-01-01,2021-02-01").unwrap();
        writeln!(f, "2,Canal,Beta,B,not-a-number,,,").unwrap();

        let mut f = std::fs::File::create(&bids).unwrap();
        writeln!(f, "project_id,tin,company,bid").unwrap();
        writeln!(f, "1,A,Alpha,90").unwrap();
        writeln!(f, "1,B,Beta,95").unwrap();

        let store = CsvStore::new(&projects, &bids);
        let rows = store.projects(&ProjectFilter::all()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].dept_name.as_deref(), Some("Roads"));
        assert_eq!(store.bids(&BidFilter::all()).unwrap().len(), 2);
    }

    #[test]
    fn test_csv_store_missing_file() {
        let store = CsvStore::new("/nonexistent/projects.csv", "/nonexistent/bids.csv");
        let err = store.projects(&ProjectFilter::all()).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
