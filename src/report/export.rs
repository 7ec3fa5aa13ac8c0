//! CSV export: flat projections of the report
//!
//! Three fixed-column tables (pages, issues, internal-link edges). This is a
//! pure projection of an existing report; nothing is recomputed.

use crate::report::{AuditReport, LinkRel};
use crate::url::LinkScope;
use crate::Result;
use std::path::{Path, PathBuf};

/// Where the three tables landed
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub pages_csv: PathBuf,
    pub issues_csv: PathBuf,
    pub edges_csv: PathBuf,
}

/// Writes pages.csv, issues.csv, and edges.csv into `dir`
pub fn export_csv(report: &AuditReport, dir: &Path) -> Result<ExportPaths> {
    std::fs::create_dir_all(dir)?;

    let paths = ExportPaths {
        pages_csv: dir.join("pages.csv"),
        issues_csv: dir.join("issues.csv"),
        edges_csv: dir.join("edges.csv"),
    };

    write_pages(report, &paths.pages_csv)?;
    write_issues(report, &paths.issues_csv)?;
    write_edges(report, &paths.edges_csv)?;

    Ok(paths)
}

fn write_pages(report: &AuditReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "url",
        "depth",
        "status",
        "elapsed_ms",
        "redirect_hops",
        "title",
        "meta_description",
        "word_count",
        "h1_count",
        "canonical_url",
        "score",
    ])?;

    for page in &report.pages {
        let analysis = page.analysis.as_ref();
        let row = [
            page.url.clone(),
            page.depth.to_string(),
            page.status.map(|s| s.to_string()).unwrap_or_default(),
            page.elapsed_ms.to_string(),
            page.redirect_chain.len().to_string(),
            analysis
                .and_then(|a| a.title.clone())
                .unwrap_or_default(),
            analysis
                .and_then(|a| a.meta_description.clone())
                .unwrap_or_default(),
            analysis
                .map(|a| a.word_count.to_string())
                .unwrap_or_default(),
            analysis
                .map(|a| a.h1_count.to_string())
                .unwrap_or_default(),
            analysis
                .and_then(|a| a.canonical_url.clone())
                .unwrap_or_default(),
            analysis.map(|a| a.score.to_string()).unwrap_or_default(),
        ];
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_issues(report: &AuditReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["url", "code", "title", "severity", "category", "details"])?;

    for issue in &report.issues {
        let row = [
            issue.url.clone(),
            issue.code.clone(),
            issue.title.clone(),
            issue.severity.to_string(),
            issue.category.to_string(),
            issue.details.clone(),
        ];
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_edges(report: &AuditReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["source", "target", "rel"])?;

    for edge in report
        .edges
        .iter()
        .filter(|e| e.scope == LinkScope::Internal)
    {
        let rel = match edge.rel {
            LinkRel::Follow => "follow",
            LinkRel::Nofollow => "nofollow",
        };
        writer.write_record([edge.source.as_str(), edge.target.as_str(), rel])?;
    }

    writer.flush()?;
    Ok(())
}
