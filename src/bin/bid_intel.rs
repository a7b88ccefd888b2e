//! Bid Intel - competitive analytics over procurement CSV exports
//!
//! Loads `projects.csv` and `bids.csv` once, runs one analysis and prints the
//! result as a text table, JSON or CSV.

use anyhow::{Context, Result};
use bid_intel_toolkit::report::{self, to_csv, to_json};
use bid_intel_toolkit::{AnalysisConfig, Engine, MemoryStore};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bid-intel")]
#[command(about = "Win rates, competitor and bid-strategy analysis for procurement records")]
struct Cli {
    /// Projects CSV export
    #[arg(long, env = "BID_INTEL_PROJECTS", global = true, default_value = "projects.csv")]
    projects: PathBuf,

    /// Bids CSV export
    #[arg(long, env = "BID_INTEL_BIDS", global = true, default_value = "bids.csv")]
    bids: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value = "table")]
    format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Win rates for one or more companies
    WinRates {
        /// Company TINs
        #[arg(required = true, value_delimiter = ',')]
        tins: Vec<String>,
    },

    /// Find companies by name or TIN fragment
    Search {
        query: String,

        /// Maximum companies returned (1-20)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Compare a company against its most frequent competitors
    HeadToHead {
        tin: String,

        /// Number of competitors (1-20)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Bid-ratio distribution, percentile and department breakdown
    BidStrategy {
        tin: String,

        /// Valid bids a company needs to enter the percentile population
        #[arg(long, default_value = "3")]
        min_bids: usize,
    },

    /// Companies that bid on the same projects
    Adjacent {
        tin: String,

        /// Maximum companies returned (1-20)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Projects won by a company
    CompanyProjects { tin: String },

    /// Projects won by any of several companies
    CompanyProjectsBulk {
        #[arg(required = true, value_delimiter = ',')]
        tins: Vec<String>,
    },

    /// Projects two companies both bid on
    CompetitorProjects { tin: String, competitor_tin: String },

    /// Bidders on the given projects
    ProjectBidders {
        #[arg(required = true, value_delimiter = ',')]
        project_ids: Vec<String>,
    },

    /// Awarded value per contract month
    Monthly {
        /// Restrict to one year
        #[arg(long)]
        year: Option<i32>,
    },

    /// Projects of the winners with the highest total awarded value
    TopCompanies {
        /// Number of winners (1-100)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Write a company dossier workbook (.xlsx)
    Export {
        tin: String,

        /// Output xlsx path
        #[arg(long)]
        xlsx: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Cli::parse();

    let store = MemoryStore::load_csv(&cli.projects, &cli.bids)
        .context("Failed to load procurement data")?;

    let mut config = AnalysisConfig::default();
    if let Commands::BidStrategy { min_bids, .. } = &cli.command {
        config = config.with_percentile_min_bids(*min_bids);
    }
    let engine = Engine::with_config(&store, config);
    let format = cli.format;

    let rendered = match &cli.command {
        Commands::WinRates { tins } => {
            let rows = engine.win_rates(tins)?;
            render(format, &rows, report::win_rate_table)?
        }
        Commands::Search { query, limit } => {
            let limit = limit.unwrap_or(engine.config().search_limit);
            let rows = engine.search_companies_limited(query, limit)?;
            render(format, &rows, report::win_rate_table)?
        }
        Commands::HeadToHead { tin, top_n } => {
            let result = engine.head_to_head(tin, *top_n)?;
            match format {
                OutputFormat::Table => report::head_to_head_table(&result)?,
                OutputFormat::Json => to_json(&result)?,
                OutputFormat::Csv => to_csv(&result.competitors)?,
            }
        }
        Commands::BidStrategy { tin, .. } => {
            let result = engine.bid_strategy(tin)?;
            match format {
                OutputFormat::Table => report::bid_strategy_table(&result)?,
                OutputFormat::Json => to_json(&result)?,
                OutputFormat::Csv => to_csv(&result.department_analysis)?,
            }
        }
        Commands::Adjacent { tin, limit } => {
            let limit = limit.unwrap_or(engine.config().adjacency_limit);
            let rows = engine.adjacent_companies_limited(tin, limit)?;
            render(format, &rows, report::adjacent_table)?
        }
        Commands::CompanyProjects { tin } => {
            let rows = engine.company_projects(tin)?;
            render(format, &rows, report::company_projects_table)?
        }
        Commands::CompanyProjectsBulk { tins } => {
            let rows = engine.company_projects_bulk(tins)?;
            render(format, &rows, report::company_projects_table)?
        }
        Commands::CompetitorProjects {
            tin,
            competitor_tin,
        } => {
            let rows = engine.competitor_projects(tin, competitor_tin)?;
            render(format, &rows, report::competitor_projects_table)?
        }
        Commands::ProjectBidders { project_ids } => {
            let rows = engine.project_bidders(project_ids)?;
            render(format, &rows, report::project_bidders_table)?
        }
        Commands::Monthly { year } => {
            let rows = engine.monthly_totals(*year)?;
            render(format, &rows, report::monthly_table)?
        }
        Commands::TopCompanies { limit } => {
            let rows = engine.top_company_projects(*limit)?;
            render(format, &rows, report::company_projects_table)?
        }
        Commands::Export { tin, xlsx } => {
            let dossier = engine.dossier(tin)?;
            report::export_workbook(&dossier, xlsx)?
        }
    };

    if let Some(path) = &cli.output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("Wrote {}", path.display());
    } else {
        print!("{}", rendered);
        if !rendered.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}

fn render<T: serde::Serialize>(
    format: OutputFormat,
    rows: &[T],
    table: fn(&[T]) -> Result<String>,
) -> Result<String> {
    match format {
        OutputFormat::Table => table(rows),
        OutputFormat::Json => to_json(rows),
        OutputFormat::Csv => to_csv(rows),
    }
}
