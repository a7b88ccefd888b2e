//! Request-level entry point.
//!
//! [`Engine`] validates inputs against its [`AnalysisConfig`], then hands off to
//! the analyzer modules. Invalid requests are rejected before the store is
//! touched.

use crate::adjacency::{self, AdjacentCompany};
use crate::bid_strategy::{self, BidStrategyResult};
use crate::config::AnalysisConfig;
use crate::error::{IntelError, StoreResultExt};
use crate::head_to_head::{self, HeadToHeadResult};
use crate::projects::{self, CompanyProject, CompetitorProject, MonthlyTotal, ProjectBidder};
use crate::store::{DataStore, StoreStatus};
use crate::win_rate::{self, CompanyWinRate};
use serde::Serialize;
use std::collections::BTreeSet;

/// Everything known about one company, as exported to the dossier workbook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dossier {
    pub tin: String,
    pub win_rate: Option<CompanyWinRate>,
    pub head_to_head: HeadToHeadResult,
    pub strategy: BidStrategyResult,
    pub adjacent: Vec<AdjacentCompany>,
    pub projects: Vec<CompanyProject>,
}

/// Analytics operations over a borrowed [`DataStore`].
pub struct Engine<'s> {
    store: &'s dyn DataStore,
    config: AnalysisConfig,
}

impl<'s> Engine<'s> {
    pub fn new(store: &'s dyn DataStore) -> Self {
        Self::with_config(store, AnalysisConfig::default())
    }

    pub fn with_config(store: &'s dyn DataStore, config: AnalysisConfig) -> Self {
        Engine { store, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Win rates for a set of TINs. Blank entries are ignored; an empty set is
    /// rejected.
    pub fn win_rates(&self, tins: &[String]) -> Result<Vec<CompanyWinRate>, IntelError> {
        let tins = key_set(tins);
        if tins.is_empty() {
            return Err(IntelError::invalid("at least one TIN is required"));
        }
        log::debug!("win_rates for {} TINs", tins.len());
        win_rate::win_rates(self.store, &tins)
    }

    pub fn search_companies(&self, query: &str) -> Result<Vec<CompanyWinRate>, IntelError> {
        self.search_companies_limited(query, self.config.search_limit)
    }

    /// Search with a caller-chosen cap, at most the configured `search_limit`.
    pub fn search_companies_limited(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CompanyWinRate>, IntelError> {
        check_range("limit", limit, self.config.search_limit)?;
        let query = query.trim();
        if query.chars().count() < self.config.min_query_len {
            return Err(IntelError::invalid(format!(
                "search query must be at least {} characters",
                self.config.min_query_len
            )));
        }
        win_rate::search_companies(self.store, query, limit)
    }

    /// Head-to-head against the `top_n` most frequent rivals; `None` uses the
    /// configured default.
    pub fn head_to_head(
        &self,
        tin: &str,
        top_n: Option<usize>,
    ) -> Result<HeadToHeadResult, IntelError> {
        let tin = check_tin(tin)?;
        let top_n = top_n.unwrap_or(self.config.default_top_n);
        check_range("top_n", top_n, self.config.max_top_n)?;
        head_to_head::head_to_head(self.store, tin, top_n)
    }

    pub fn bid_strategy(&self, tin: &str) -> Result<BidStrategyResult, IntelError> {
        let tin = check_tin(tin)?;
        bid_strategy::bid_strategy(self.store, tin, self.config.percentile_min_bids)
    }

    pub fn adjacent_companies(&self, tin: &str) -> Result<Vec<AdjacentCompany>, IntelError> {
        self.adjacent_companies_limited(tin, self.config.adjacency_limit)
    }

    /// Co-bidders with a caller-chosen cap, at most the configured
    /// `adjacency_limit`.
    pub fn adjacent_companies_limited(
        &self,
        tin: &str,
        limit: usize,
    ) -> Result<Vec<AdjacentCompany>, IntelError> {
        let tin = check_tin(tin)?;
        check_range("limit", limit, self.config.adjacency_limit)?;
        adjacency::adjacent_companies(self.store, tin, limit)
    }

    // ========================================================================
    // Project listings
    // ========================================================================

    pub fn company_projects(&self, tin: &str) -> Result<Vec<CompanyProject>, IntelError> {
        let tin = check_tin(tin)?;
        projects::company_projects(self.store, tin)
    }

    pub fn company_projects_bulk(
        &self,
        tins: &[String],
    ) -> Result<Vec<CompanyProject>, IntelError> {
        projects::company_projects_bulk(self.store, &key_set(tins))
    }

    pub fn competitor_projects(
        &self,
        tin: &str,
        competitor_tin: &str,
    ) -> Result<Vec<CompetitorProject>, IntelError> {
        let tin = check_tin(tin)?;
        let competitor_tin = check_tin(competitor_tin)?;
        projects::competitor_projects(self.store, tin, competitor_tin)
    }

    pub fn project_bidders(
        &self,
        project_ids: &[String],
    ) -> Result<Vec<ProjectBidder>, IntelError> {
        projects::project_bidders(self.store, &key_set(project_ids))
    }

    pub fn monthly_totals(&self, year: Option<i32>) -> Result<Vec<MonthlyTotal>, IntelError> {
        projects::monthly_totals(self.store, year)
    }

    pub fn top_company_projects(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CompanyProject>, IntelError> {
        let limit = limit.unwrap_or(self.config.default_top_companies);
        check_range("limit", limit, self.config.max_top_companies)?;
        projects::top_company_projects(self.store, limit)
    }

    // ========================================================================
    // Diagnostics and export
    // ========================================================================

    pub fn status(&self) -> Result<StoreStatus, IntelError> {
        StoreStatus::collect(self.store).during("status")
    }

    /// Gather every per-company view for the dossier export.
    pub fn dossier(&self, tin: &str) -> Result<Dossier, IntelError> {
        let tin = check_tin(tin)?;
        let strategy = self.bid_strategy(tin)?;
        let head_to_head = self.head_to_head(tin, None)?;
        let adjacent = self.adjacent_companies(tin)?;
        let projects = self.company_projects(tin)?;
        let win_rate = self.win_rates(&[tin.to_string()])?.into_iter().next();

        log::info!(
            "Dossier for {}: {} competitors, {} adjacent, {} projects",
            tin,
            head_to_head.competitors.len(),
            adjacent.len(),
            projects.len()
        );

        Ok(Dossier {
            tin: tin.to_string(),
            win_rate,
            head_to_head,
            strategy,
            adjacent,
            projects,
        })
    }
}

fn check_tin(tin: &str) -> Result<&str, IntelError> {
    let tin = tin.trim();
    if tin.is_empty() {
        return Err(IntelError::invalid("TIN must not be empty"));
    }
    Ok(tin)
}

fn check_range(name: &str, value: usize, max: usize) -> Result<(), IntelError> {
    if value == 0 || value > max {
        return Err(IntelError::invalid(format!(
            "{} must be between 1 and {}, got {}",
            name, max, value
        )));
    }
    Ok(())
}

/// Trimmed, de-duplicated, non-blank keys (TINs or project ids).
fn key_set(keys: &[String]) -> BTreeSet<String> {
    keys.iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
