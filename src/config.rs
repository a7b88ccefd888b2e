//! Tunable limits for the analytics operations.

/// Limits and thresholds applied by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Competitors returned by head-to-head when the caller does not say
    pub default_top_n: usize,
    /// Upper bound accepted for head-to-head `top_n` (lower bound is 1)
    pub max_top_n: usize,
    /// Maximum companies returned by search
    pub search_limit: usize,
    /// Minimum search query length after trimming
    pub min_query_len: usize,
    /// Maximum co-bidders returned by the adjacency finder
    pub adjacency_limit: usize,
    /// Valid bids a company needs to enter the percentile population
    pub percentile_min_bids: usize,
    /// Winners listed by top-company-projects when the caller does not say
    pub default_top_companies: usize,
    /// Upper bound accepted for top-company-projects `limit`
    pub max_top_companies: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_top_n: 5,
            max_top_n: 20,
            search_limit: 20,
            min_query_len: 2,
            adjacency_limit: 20,
            percentile_min_bids: 3,
            default_top_companies: 20,
            max_top_companies: 100,
        }
    }
}

impl AnalysisConfig {
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn with_adjacency_limit(mut self, limit: usize) -> Self {
        self.adjacency_limit = limit;
        self
    }

    /// Change the noise filter for the percentile population.
    pub fn with_percentile_min_bids(mut self, min_bids: usize) -> Self {
        self.percentile_min_bids = min_bids;
        self
    }
}
