//! Bid Intelligence Toolkit
//!
//! Competitive analytics over public procurement records: who bids, who wins,
//! how aggressively they price, and whom they keep meeting.
//!
//! This library provides:
//! - `store`: read-only access to the `Project` and `Bid` relations (CSV or in-memory)
//! - `join`: the bid-to-project left join every analyzer goes through
//! - `ratio_math`: deterministic aggregate statistics and percentile ranks
//! - `win_rate`: per-company bid/win tallies and company search
//! - `head_to_head`: pairwise comparison restricted to shared projects
//! - `bid_strategy`: bid-ratio distribution, population percentile, departments
//! - `adjacency`: co-bidders ranked by shared projects
//! - `projects`: project listings and monthly award totals
//! - `engine`: validated request entry point tying the above together
//! - `report`: text tables, JSON/CSV output and the xlsx dossier
//!
//! Binaries:
//! - `bid-intel`: run any analysis from the command line
//! - `store-check`: row counts and data-quality indicators for a data set

pub mod adjacency;
pub mod bid_strategy;
pub mod config;
pub mod engine;
pub mod error;
pub mod head_to_head;
pub mod join;
pub mod model;
pub mod projects;
pub mod ratio_math;
pub mod report;
pub mod store;
pub mod win_rate;

pub use config::AnalysisConfig;
pub use engine::{Dossier, Engine};
pub use error::{IntelError, StoreError};
pub use model::{Bid, Project};
pub use store::{CsvStore, DataStore, MemoryStore, StoreStatus};
