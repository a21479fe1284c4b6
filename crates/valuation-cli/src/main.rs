//! valuation CLI - statement and valuation reports for listed Japanese companies

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;
use valuation::{
    Company, CommentaryProvider, CommentaryRequest, CompanyDirectory, CompanyReport,
    DisabledCommentary, EngineConfig, ValuationEngine, strategy_for,
};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "valuation=info";

#[derive(Parser)]
#[command(name = "valuation")]
#[command(about = "Fetch financial statements and compute valuation metrics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Number of companies analyzed concurrently (1 = sequential)
    #[arg(long, default_value_t = 1)]
    concurrency: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze companies by securities code
    Analyze {
        /// Securities codes, e.g. 7203 or 72030
        #[arg(value_name = "CODE", required = true)]
        codes: Vec<String>,

        /// EDINET code list used to resolve names and industries
        #[arg(short, long)]
        list: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Analyze every company (or the named ones) in the given industries
    Industry {
        /// EDINET code list (Shift_JIS CSV)
        #[arg(short, long)]
        list: PathBuf,

        /// Industry names
        #[arg(short, long = "industry", required = true)]
        industries: Vec<String>,

        /// Restrict to these company names
        #[arg(short, long = "company")]
        companies: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// List the industries present in a code list
    Industries {
        /// EDINET code list (Shift_JIS CSV)
        #[arg(short, long)]
        list: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            codes,
            list,
            output,
        } => {
            let directory = list.map(load_directory).transpose()?;
            let companies: Vec<Company> = codes
                .iter()
                .map(|code| resolve_code(directory.as_ref(), code))
                .collect();
            run(companies, &output).await
        }
        Commands::Industry {
            list,
            industries,
            companies,
            output,
        } => {
            let directory = load_directory(list)?;
            let selected: Vec<Company> = directory
                .in_industries(&industries)
                .into_iter()
                .filter(|c| companies.is_empty() || companies.contains(&c.name))
                .cloned()
                .collect();
            if selected.is_empty() {
                bail!("no companies match the given industries and names");
            }
            run(selected, &output).await
        }
        Commands::Industries { list } => {
            let directory = load_directory(list)?;
            for industry in directory.industries() {
                println!("{industry}");
            }
            Ok(())
        }
    }
}

fn load_directory(path: PathBuf) -> anyhow::Result<CompanyDirectory> {
    let directory = CompanyDirectory::from_path(&path)
        .with_context(|| format!("failed to load company list {}", path.display()))?;
    info!(companies = directory.len(), "Loaded company list");
    Ok(directory)
}

/// Finds `code` in the directory, falling back to an anonymous entry.
fn resolve_code(directory: Option<&CompanyDirectory>, code: &str) -> Company {
    let probe = Company::new(code, "", code);
    directory
        .and_then(|d| {
            d.companies()
                .iter()
                .find(|c| c.ticker.is_some() && c.ticker == probe.ticker)
        })
        .cloned()
        .unwrap_or(probe)
}

async fn run(companies: Vec<Company>, output: &OutputArgs) -> anyhow::Result<()> {
    let config = EngineConfig::from_env().context("invalid configuration")?;
    let engine = ValuationEngine::from_config(&config).context("failed to build providers")?;
    let strategy = strategy_for(output.concurrency);

    let reports = strategy.run(&engine, &companies).await;

    let commentary = DisabledCommentary;
    let mut rendered = Vec::with_capacity(reports.len());
    for (company, report) in companies.iter().zip(&reports) {
        rendered.push(render(&commentary, company, report).await?);
    }

    let json = if output.pretty {
        serde_json::to_string_pretty(&rendered)?
    } else {
        serde_json::to_string(&rendered)?
    };
    println!("{json}");
    Ok(())
}

async fn render(
    commentary: &dyn CommentaryProvider,
    company: &Company,
    report: &CompanyReport,
) -> anyhow::Result<Value> {
    let comment = commentary
        .comment(CommentaryRequest {
            industry: &company.industry,
            metrics: report.metrics.as_ref(),
            statements: &report.statements,
        })
        .await;

    let mut value = serde_json::to_value(report)?;
    if let Value::Object(map) = &mut value {
        map.insert("Industry".to_string(), Value::String(company.industry.clone()));
        map.insert("Commentary".to_string(), Value::String(comment));
    }
    Ok(value)
}
