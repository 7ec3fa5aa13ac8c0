//! Sitegeist command-line interface
//!
//! Thin shell over the library: `audit` runs a crawl and writes the JSON
//! report, `compare` diffs two saved reports, `export` re-projects a saved
//! report into CSV tables.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sitegeist::config::load_config;
use sitegeist::report::{compare_reports, export_csv, AuditReport};
use sitegeist::{AuditConfig, SiteAudit};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Sitegeist: SEO site audit engine
#[derive(Parser, Debug)]
#[command(name = "sitegeist")]
#[command(version)]
#[command(about = "Crawl a site, derive SEO issues, and report on its health", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site and write the audit report
    Audit {
        /// Seed URL to audit
        url: String,

        /// Path to a TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Where to write the JSON report
        #[arg(short, long, default_value = "audit-report.json")]
        out: PathBuf,

        /// Also export pages/issues/edges CSV tables into this directory
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Override the configured page cap
        #[arg(long)]
        max_pages: Option<usize>,

        /// Override the configured depth cap
        #[arg(long)]
        max_depth: Option<u32>,

        /// Override the configured worker count
        #[arg(long)]
        workers: Option<usize>,

        /// Ignore robots.txt disallow rules
        #[arg(long)]
        no_robots: bool,
    },

    /// Diff two saved audit reports
    Compare {
        /// The earlier report (JSON)
        old: PathBuf,

        /// The later report (JSON)
        new: PathBuf,

        /// Write the diff here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Export CSV tables from a saved report
    Export {
        /// The report to project (JSON)
        report: PathBuf,

        /// Target directory for pages.csv, issues.csv, edges.csv
        #[arg(short, long, default_value = "export")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Audit {
            url,
            config,
            out,
            export_dir,
            max_pages,
            max_depth,
            workers,
            no_robots,
        } => {
            let mut audit_config = match &config {
                Some(path) => load_config(path)
                    .with_context(|| format!("loading config from {}", path.display()))?,
                None => AuditConfig::default(),
            };

            if let Some(max_pages) = max_pages {
                audit_config.crawl.max_pages = max_pages;
            }
            if let Some(max_depth) = max_depth {
                audit_config.crawl.max_depth = max_depth;
            }
            if let Some(workers) = workers {
                audit_config.crawl.workers = workers;
            }
            if no_robots {
                audit_config.crawl.respect_robots = false;
            }

            let report = SiteAudit::new(&url, audit_config)?.run().await?;

            print_summary(&report);

            std::fs::write(&out, serde_json::to_string_pretty(&report)?)
                .with_context(|| format!("writing report to {}", out.display()))?;
            tracing::info!("Report written to {}", out.display());

            if let Some(dir) = export_dir {
                let paths = export_csv(&report, &dir)?;
                tracing::info!(
                    "CSV tables written: {}, {}, {}",
                    paths.pages_csv.display(),
                    paths.issues_csv.display(),
                    paths.edges_csv.display()
                );
            }
        }

        Command::Compare { old, new, out } => {
            let old_report = read_report(&old)?;
            let new_report = read_report(&new)?;
            let diff = compare_reports(&old_report, &new_report);

            let rendered = serde_json::to_string_pretty(&diff)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("writing diff to {}", path.display()))?;
                }
                None => println!("{}", rendered),
            }
        }

        Command::Export { report, dir } => {
            let report = read_report(&report)?;
            let paths = export_csv(&report, &dir)?;
            println!("{}", paths.pages_csv.display());
            println!("{}", paths.issues_csv.display());
            println!("{}", paths.edges_csv.display());
        }
    }

    Ok(())
}

fn read_report(path: &PathBuf) -> anyhow::Result<AuditReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading report from {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing report {}", path.display()))
}

fn print_summary(report: &AuditReport) {
    let summary = &report.summary;
    println!("Audit of {}", summary.root_url);
    if report.partial {
        println!("  (partial: crawl was cancelled before completion)");
    }
    println!(
        "  pages: {} fetched, {} errored, {} skipped (robots), {} skipped (scope)",
        summary.crawl.fetched,
        summary.crawl.errored,
        summary.crawl.skipped_robots,
        summary.crawl.skipped_scope
    );
    println!(
        "  issues: {} errors, {} warnings, {} notices",
        summary.issue_counts.errors, summary.issue_counts.warnings, summary.issue_counts.notices
    );
    println!("  health score: {}", summary.health_score);
    if let Some(avg) = summary.avg_page_score {
        println!("  average page score: {}", avg);
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            1 => EnvFilter::new("sitegeist=debug,info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
