//! Rendering of analysis results: aligned text tables, JSON, CSV and the
//! company dossier workbook.

use crate::adjacency::AdjacentCompany;
use crate::bid_strategy::BidStrategyResult;
use crate::engine::Dossier;
use crate::head_to_head::HeadToHeadResult;
use crate::projects::{CompanyProject, CompetitorProject, MonthlyTotal, ProjectBidder};
use crate::store::StoreStatus;
use crate::win_rate::CompanyWinRate;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

// ============================================================================
// Serialized output
// ============================================================================

/// Pretty-printed JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize JSON")
}

/// CSV with a header row taken from the record's field names.
pub fn to_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Failed to write CSV record")?;
    }
    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

// ============================================================================
// Text tables
// ============================================================================

pub fn win_rate_table(rows: &[CompanyWinRate]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:=^110}", " Win Rates ")?;
    writeln!(
        out,
        "{:<14} {:<36} {:>6} {:>6} {:>9} {:>16} {:>14} {:>9}",
        "TIN", "Company", "Bids", "Wins", "Win%", "Total Bid", "Avg Bid", "Avg Ratio"
    )?;
    writeln!(out, "{:-<110}", "")?;
    for r in rows {
        writeln!(
            out,
            "{:<14} {:<36} {:>6} {:>6} {:>9} {:>16.2} {:>14} {:>9}",
            r.tin,
            truncate_name(&r.company, 36),
            r.total_bids,
            r.wins,
            opt(r.win_rate_pct, 2),
            r.total_bid_value,
            opt(r.avg_bid, 2),
            opt(r.avg_bid_ratio, 4)
        )?;
    }
    writeln!(out, "{:-<110}", "")?;
    writeln!(out, "{} companies", rows.len())?;
    Ok(out)
}

pub fn head_to_head_table(result: &HeadToHeadResult) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:=^90}", format!(" Head to Head: {} ", result.company))?;
    if result.competitors.is_empty() {
        writeln!(out, "(No competitor shares more than one project)")?;
        return Ok(out);
    }
    writeln!(
        out,
        "{:<14} {:<36} {:>10} {:>8} {:>8} {:>9}",
        "TIN", "Competitor", "Encounters", "Won", "Lost", "Win%"
    )?;
    writeln!(out, "{:-<90}", "")?;
    for c in &result.competitors {
        writeln!(
            out,
            "{:<14} {:<36} {:>10} {:>8} {:>8} {:>9.2}",
            c.competitor_tin,
            truncate_name(&c.competitor, 36),
            c.encounters,
            c.company_wins,
            c.competitor_wins,
            c.win_rate_vs_competitor
        )?;
    }
    Ok(out)
}

pub fn bid_strategy_table(result: &BidStrategyResult) -> Result<String> {
    let s = &result.bid_ratio_stats;
    let mut out = String::new();
    writeln!(out, "{:=^80}", format!(" Bid Strategy: {} ", result.company))?;
    writeln!(out, "{:<24} {:>12}", "Valid bids", s.valid_bids)?;
    for (label, value) in [
        ("Average ratio", s.avg_bid_ratio),
        ("Median ratio", s.median_bid_ratio),
        ("Min ratio", s.min_bid_ratio),
        ("Max ratio", s.max_bid_ratio),
        ("Std deviation", s.std_bid_ratio),
        ("Avg winning ratio", s.avg_winning_bid_ratio),
        ("Avg losing ratio", s.avg_losing_bid_ratio),
    ] {
        writeln!(out, "{:<24} {:>12}", label, opt(value, 4))?;
    }
    writeln!(out, "{:<24} {:>12}", "Percentile", opt(s.percentile, 1))?;

    writeln!(out, "\n{:=^80}", " Departments ")?;
    if result.department_analysis.is_empty() {
        writeln!(out, "(No department data)")?;
        return Ok(out);
    }
    writeln!(
        out,
        "{:<44} {:>6} {:>6} {:>9} {:>10}",
        "Department", "Bids", "Wins", "Win%", "Avg Ratio"
    )?;
    writeln!(out, "{:-<80}", "")?;
    for d in &result.department_analysis {
        writeln!(
            out,
            "{:<44} {:>6} {:>6} {:>9} {:>10}",
            truncate_name(&d.dept_name, 44),
            d.bids,
            d.wins,
            opt(d.win_rate_pct, 2),
            opt(d.avg_bid_ratio, 4)
        )?;
    }
    Ok(out)
}

pub fn adjacent_table(rows: &[AdjacentCompany]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:=^90}", " Adjacent Companies ")?;
    writeln!(
        out,
        "{:<14} {:<36} {:>8} {:>8} {:>8} {:>8}",
        "TIN", "Company", "Common", "Bids", "Wins", "Win%"
    )?;
    writeln!(out, "{:-<90}", "")?;
    for r in rows {
        writeln!(
            out,
            "{:<14} {:<36} {:>8} {:>8} {:>8} {:>8.1}",
            r.tin,
            truncate_name(&r.company, 36),
            r.common_bids,
            r.total_bids,
            r.wins,
            r.win_rate_pct
        )?;
    }
    Ok(out)
}

pub fn company_projects_table(rows: &[CompanyProject]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:=^110}", " Awarded Projects ")?;
    writeln!(
        out,
        "{:<14} {:<44} {:<24} {:>16} {:>10}",
        "Project", "Name", "Winner", "Value", "Date"
    )?;
    writeln!(out, "{:-<110}", "")?;
    for r in rows {
        writeln!(
            out,
            "{:<14} {:<44} {:<24} {:>16.2} {:>10}",
            r.project_id,
            truncate_name(&r.project_name, 44),
            truncate_name(&r.winner, 24),
            r.sum_price_agree,
            date(r.contract_date.or(r.transaction_date))
        )?;
    }
    writeln!(out, "{} projects", rows.len())?;
    Ok(out)
}

pub fn competitor_projects_table(rows: &[CompetitorProject]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:=^110}", " Shared Projects ")?;
    writeln!(
        out,
        "{:<14} {:<36} {:>16} {:>16} {:>16} {:>6}",
        "Project", "Name", "Awarded", "Company Bid", "Rival Bid", "Won"
    )?;
    writeln!(out, "{:-<110}", "")?;
    for r in rows {
        let won = match r.company_won {
            Some(true) => "yes",
            Some(false) => "no",
            None => "-",
        };
        writeln!(
            out,
            "{:<14} {:<36} {:>16} {:>16} {:>16} {:>6}",
            r.project_id,
            truncate_name(r.project_name.as_deref().unwrap_or(""), 36),
            opt(r.winning_bid, 2),
            opt(r.company_bid, 2),
            opt(r.competitor_bid, 2),
            won
        )?;
    }
    Ok(out)
}

pub fn project_bidders_table(rows: &[ProjectBidder]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:<14} {:<44} {:<14}", "TIN", "Company", "Project")?;
    writeln!(out, "{:-<74}", "")?;
    for r in rows {
        writeln!(
            out,
            "{:<14} {:<44} {:<14}",
            r.tin,
            truncate_name(r.company.as_deref().unwrap_or(""), 44),
            r.project_id
        )?;
    }
    Ok(out)
}

pub fn monthly_table(rows: &[MonthlyTotal]) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:<6} {:<10} {:>20} {:>8}", "Year", "Month", "Awarded", "Count")?;
    writeln!(out, "{:-<47}", "")?;
    for r in rows {
        writeln!(
            out,
            "{:<6} {:<10} {:>20.2} {:>8}",
            r.year, r.month_name, r.total_sum_price_agree, r.count
        )?;
    }
    Ok(out)
}

pub fn status_table(status: &StoreStatus) -> Result<String> {
    let mut out = String::new();
    writeln!(out, "{:=^60}", " Store Status ")?;
    writeln!(out, "Source: {}\n", status.source)?;
    for (label, value) in [
        ("Projects", status.projects),
        ("Bids", status.bids),
        ("Companies", status.companies),
        ("Duplicate project ids", status.duplicate_project_ids),
        ("Orphan bids", status.orphan_bids),
        ("Bids without TIN", status.bids_without_tin),
        ("Invalid bid amounts", status.invalid_bid_amounts),
        ("Projects without value", status.projects_without_value),
        ("TINs with name variants", status.tins_with_name_variants),
    ] {
        writeln!(out, "{:<30} {:>12}", label, value)?;
    }
    Ok(out)
}

fn opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else {
        let kept: String = name.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

// ============================================================================
// Dossier workbook
// ============================================================================

/// Write `dossier` to an xlsx workbook at `output`.
///
/// Sheets: Overview, Head to Head, Departments, Adjacent, Projects.
/// Returns a summary string on success.
pub fn export_workbook(dossier: &Dossier, output: &Path) -> Result<String> {
    use rust_xlsxwriter::{Format, FormatAlign, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let title_fmt = Format::new().set_bold().set_font_size(16);
    let left_fmt = Format::new().set_align(FormatAlign::Left);
    let money_fmt = Format::new().set_num_format("#,##0.00");
    let ratio_fmt = Format::new().set_num_format("0.0000");

    // ---------------------------------------------------------------
    // Overview
    // ---------------------------------------------------------------
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Overview")?;
        let mut row: u32 = 0;

        sheet.write_string_with_format(row, 0, &dossier.strategy.company, &title_fmt)?;
        row += 2;
        sheet.write_string_with_format(row, 0, "TIN", &bold)?;
        sheet.write_string_with_format(row, 1, &dossier.tin, &left_fmt)?;
        row += 2;

        if let Some(rate) = &dossier.win_rate {
            sheet.write_string_with_format(row, 0, "Bids", &bold)?;
            sheet.write_number(row, 1, rate.total_bids as f64)?;
            row += 1;
            sheet.write_string_with_format(row, 0, "Wins", &bold)?;
            sheet.write_number(row, 1, rate.wins as f64)?;
            row += 1;
            sheet.write_string_with_format(row, 0, "Win %", &bold)?;
            if let Some(v) = rate.win_rate_pct {
                sheet.write_number(row, 1, v)?;
            }
            row += 1;
            sheet.write_string_with_format(row, 0, "Total Bid Value", &bold)?;
            sheet.write_number_with_format(row, 1, rate.total_bid_value, &money_fmt)?;
            row += 2;
        }

        let s = &dossier.strategy.bid_ratio_stats;
        for (label, value) in [
            ("Average Ratio", s.avg_bid_ratio),
            ("Median Ratio", s.median_bid_ratio),
            ("Min Ratio", s.min_bid_ratio),
            ("Max Ratio", s.max_bid_ratio),
            ("Std Deviation", s.std_bid_ratio),
            ("Avg Winning Ratio", s.avg_winning_bid_ratio),
            ("Avg Losing Ratio", s.avg_losing_bid_ratio),
        ] {
            sheet.write_string_with_format(row, 0, label, &bold)?;
            if let Some(v) = value {
                sheet.write_number_with_format(row, 1, v, &ratio_fmt)?;
            }
            row += 1;
        }
        sheet.write_string_with_format(row, 0, "Percentile", &bold)?;
        if let Some(v) = s.percentile {
            sheet.write_number(row, 1, v)?;
        }

        sheet.set_column_width(0, 22)?;
        sheet.set_column_width(1, 28)?;
    }

    // ---------------------------------------------------------------
    // Head to Head
    // ---------------------------------------------------------------
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Head to Head")?;
        let headers = ["TIN", "Competitor", "Encounters", "Won", "Lost", "Win %"];
        for (col, h) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *h, &bold)?;
        }
        for (i, c) in dossier.head_to_head.competitors.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, &c.competitor_tin)?;
            sheet.write_string(row, 1, &c.competitor)?;
            sheet.write_number(row, 2, c.encounters as f64)?;
            sheet.write_number(row, 3, c.company_wins as f64)?;
            sheet.write_number(row, 4, c.competitor_wins as f64)?;
            sheet.write_number(row, 5, c.win_rate_vs_competitor)?;
        }
        sheet.set_column_width(0, 16)?;
        sheet.set_column_width(1, 40)?;
    }

    // ---------------------------------------------------------------
    // Departments
    // ---------------------------------------------------------------
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Departments")?;
        let headers = ["Department", "Bids", "Wins", "Win %", "Avg Ratio"];
        for (col, h) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *h, &bold)?;
        }
        for (i, d) in dossier.strategy.department_analysis.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, &d.dept_name)?;
            sheet.write_number(row, 1, d.bids as f64)?;
            sheet.write_number(row, 2, d.wins as f64)?;
            if let Some(v) = d.win_rate_pct {
                sheet.write_number(row, 3, v)?;
            }
            if let Some(v) = d.avg_bid_ratio {
                sheet.write_number_with_format(row, 4, v, &ratio_fmt)?;
            }
        }
        sheet.set_column_width(0, 48)?;
    }

    // ---------------------------------------------------------------
    // Adjacent
    // ---------------------------------------------------------------
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Adjacent")?;
        let headers = ["TIN", "Company", "Common Bids", "Bids", "Wins", "Win %"];
        for (col, h) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *h, &bold)?;
        }
        for (i, a) in dossier.adjacent.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, &a.tin)?;
            sheet.write_string(row, 1, &a.company)?;
            sheet.write_number(row, 2, a.common_bids as f64)?;
            sheet.write_number(row, 3, a.total_bids as f64)?;
            sheet.write_number(row, 4, a.wins as f64)?;
            sheet.write_number(row, 5, a.win_rate_pct)?;
        }
        let last = dossier.adjacent.len() as u32;
        if last > 0 {
            sheet.autofilter(0, 0, last, 5)?;
        }
        sheet.set_column_width(0, 16)?;
        sheet.set_column_width(1, 40)?;
    }

    // ---------------------------------------------------------------
    // Projects
    // ---------------------------------------------------------------
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Projects")?;
        let headers = ["Project", "Name", "Value", "Contract Date", "Transaction Date"];
        for (col, h) in headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *h, &bold)?;
        }
        for (i, p) in dossier.projects.iter().enumerate() {
            let row = (i + 1) as u32;
            sheet.write_string(row, 0, &p.project_id)?;
            sheet.write_string(row, 1, &p.project_name)?;
            sheet.write_number_with_format(row, 2, p.sum_price_agree, &money_fmt)?;
            sheet.write_string(row, 3, date(p.contract_date))?;
            sheet.write_string(row, 4, date(p.transaction_date))?;
        }
        let last = dossier.projects.len() as u32;
        if last > 0 {
            sheet.autofilter(0, 0, last, 4)?;
        }
        sheet.set_column_width(1, 60)?;
        sheet.set_column_width(2, 18)?;
        sheet.set_column_width(3, 14)?;
        sheet.set_column_width(4, 16)?;
    }

    workbook
        .save(output)
        .with_context(|| format!("Failed to save workbook to {}", output.display()))?;

    Ok(format!(
        "Wrote {}\n  Competitors: {}\n  Departments: {}\n  Adjacent: {}\n  Projects: {}",
        output.display(),
        dossier.head_to_head.competitors.len(),
        dossier.strategy.department_analysis.len(),
        dossier.adjacent.len(),
        dossier.projects.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> CompanyWinRate {
        CompanyWinRate {
            tin: "0105".to_string(),
            company: "Alpha Construction".to_string(),
            total_bids: 4,
            wins: 1,
            win_rate_pct: Some(25.0),
            total_bid_value: 1000.0,
            avg_bid: Some(250.0),
            avg_bid_ratio: None,
        }
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("short", 10), "short");
        assert_eq!(truncate_name("a much longer name", 10), "a much ...");
    }

    #[test]
    fn test_opt_formats_missing_as_dash() {
        assert_eq!(opt(None, 2), "-");
        assert_eq!(opt(Some(0.5), 2), "0.50");
    }

    #[test]
    fn test_win_rate_table() {
        let table = win_rate_table(&[row()]).unwrap();
        assert!(table.contains("Alpha Construction"));
        assert!(table.contains("25.00"));
        assert!(table.contains("1 companies"));
    }

    #[test]
    fn test_csv_output() {
        let csv = to_csv(&[row()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("tin,company,total_bids,wins,win_rate_pct,total_bid_value,avg_bid,avg_bid_ratio")
        );
        assert_eq!(lines.next(), Some("0105,Alpha Construction,4,1,25.0,1000.0,250.0,"));
    }

    #[test]
    fn test_json_output() {
        let json = to_json(&[row()]).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["tin"], "0105");
        assert!(parsed[0]["avg_bid_ratio"].is_null());
    }
}
