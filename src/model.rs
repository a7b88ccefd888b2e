//! Raw procurement records supplied by a [`DataStore`](crate::store::DataStore).
//!
//! Field names follow the column headers of the `projects.csv` and `bids.csv`
//! exports, so the same structs are used for CSV deserialization and for
//! in-memory fixtures.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One government contract/award.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "de_trimmed")]
    pub project_id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub project_name: Option<String>,
    /// Winning company's display name
    #[serde(default, deserialize_with = "de_opt_string")]
    pub winner: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub winner_tin: Option<String>,
    /// Awarded contract value
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub sum_price_agree: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub dept_name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub transaction_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub contract_date: Option<NaiveDate>,
}

impl Project {
    /// Create a project with only an id; fill the rest with the `with_*` methods.
    pub fn new(project_id: &str) -> Self {
        Project {
            project_id: project_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.project_name = Some(name.to_string());
        self
    }

    pub fn with_winner(mut self, tin: &str, name: &str) -> Self {
        self.winner_tin = Some(tin.to_string());
        self.winner = Some(name.to_string());
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.sum_price_agree = Some(value);
        self
    }

    pub fn with_dept(mut self, dept: &str) -> Self {
        self.dept_name = Some(dept.to_string());
        self
    }

    pub fn with_contract_date(mut self, date: NaiveDate) -> Self {
        self.contract_date = Some(date);
        self
    }

    pub fn with_transaction_date(mut self, date: NaiveDate) -> Self {
        self.transaction_date = Some(date);
        self
    }

    /// Awarded value usable as a ratio denominator (`> 0` and finite).
    pub fn positive_value(&self) -> Option<f64> {
        self.sum_price_agree.filter(|v| v.is_finite() && *v > 0.0)
    }

    /// `contract_date` when present, otherwise `transaction_date`.
    pub fn effective_date(&self) -> Option<NaiveDate> {
        self.contract_date.or(self.transaction_date)
    }

    /// Whether `tin` is the recorded winner.
    pub fn is_won_by(&self, tin: &str) -> bool {
        self.winner_tin.as_deref() == Some(tin)
    }
}

/// One company's bid on one project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bid {
    #[serde(deserialize_with = "de_trimmed")]
    pub project_id: String,
    /// Bidder TIN; bids without one are never attributed to a company
    #[serde(default, deserialize_with = "de_opt_string")]
    pub tin: Option<String>,
    /// Display name as recorded on this bid (spelling may vary per TIN)
    #[serde(default, deserialize_with = "de_opt_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub bid: Option<f64>,
}

impl Bid {
    pub fn new(project_id: &str, tin: &str, company: &str, amount: f64) -> Self {
        Bid {
            project_id: project_id.to_string(),
            tin: Some(tin.to_string()),
            company: Some(company.to_string()),
            bid: Some(amount),
        }
    }

    /// Bid amount when analytically valid (`> 0` and finite).
    pub fn positive_amount(&self) -> Option<f64> {
        self.bid.filter(|v| v.is_finite() && *v > 0.0)
    }

    pub fn tin(&self) -> Option<&str> {
        self.tin.as_deref()
    }

    pub fn is_by(&self, tin: &str) -> bool {
        self.tin.as_deref() == Some(tin)
    }
}

// ============================================================================
// Lenient cell parsing
// ============================================================================

fn de_trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

fn de_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

fn de_opt_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_amount(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {}", s))),
    }
}

fn de_opt_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
    }
}

/// Parse an amount cell, tolerating thousands separators (`1,234.50`).
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse `YYYY-MM-DD`, ignoring any trailing time part (`2021-03-04T00:00:00Z`).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let day_part = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}
