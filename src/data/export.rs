//! Tabular export of classified result rows (CSV or Parquet).

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::prelude::{DataFrame, NamedFrom, ParquetWriter, Series};
use serde::Serialize;
use tracing::info;

use crate::pipeline::merge::ResultRow;

/// Flat export layout with the historical column names.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    doi: Option<&'a str>,
    url: Option<&'a str>,
    year: Option<i32>,
    author: Option<&'a str>,
    title: Option<&'a str>,
    journal: Option<&'a str>,
    #[serde(rename = "1st_keyword")]
    keyword_1: &'a str,
    general_term_x: Option<&'a str>,
    displayed_term_x: Option<&'a str>,
    #[serde(rename = "2nd_keyword")]
    keyword_2: &'a str,
    general_term_y: Option<&'a str>,
    displayed_term_y: Option<&'a str>,
    sentences: &'a str,
    category: &'a str,
    bib_id: i64,
}

impl<'a> From<&'a ResultRow> for ExportRow<'a> {
    fn from(row: &'a ResultRow) -> Self {
        Self {
            doi: row.doi.as_deref(),
            url: row.url.as_deref(),
            year: row.year,
            author: row.author.as_deref(),
            title: row.title.as_deref(),
            journal: row.journal.as_deref(),
            keyword_1: &row.keyword_1,
            general_term_x: row.general_term_x.as_deref(),
            displayed_term_x: row.displayed_term_x.as_deref(),
            keyword_2: &row.keyword_2,
            general_term_y: row.general_term_y.as_deref(),
            displayed_term_y: row.displayed_term_y.as_deref(),
            sentences: &row.sentence,
            category: row.category.map(|c| c.as_str()).unwrap_or(""),
            bib_id: row.document_id,
        }
    }
}

/// Write rows to `path`; `.parquet` selects Parquet, anything else CSV.
pub fn write_results(path: &Path, rows: &[ResultRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let is_parquet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(path, rows)?;
    } else {
        write_csv(path, rows)?;
    }
    info!(path = %path.display(), rows = rows.len(), "exported results");
    Ok(())
}

fn write_csv(path: &Path, rows: &[ResultRow]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for row in rows {
        writer.serialize(ExportRow::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[ResultRow]) -> Result<()> {
    fn text<F>(rows: &[ResultRow], field: F) -> Vec<Option<String>>
    where
        F: Fn(&ResultRow) -> Option<&str>,
    {
        rows.iter().map(|row| field(row).map(str::to_string)).collect()
    }

    let mut df = DataFrame::new(vec![
        Series::new("doi".into(), text(rows, |r| r.doi.as_deref())),
        Series::new("url".into(), text(rows, |r| r.url.as_deref())),
        Series::new(
            "year".into(),
            rows.iter().map(|r| r.year).collect::<Vec<Option<i32>>>(),
        ),
        Series::new("author".into(), text(rows, |r| r.author.as_deref())),
        Series::new("title".into(), text(rows, |r| r.title.as_deref())),
        Series::new("journal".into(), text(rows, |r| r.journal.as_deref())),
        Series::new("1st_keyword".into(), text(rows, |r| Some(r.keyword_1.as_str()))),
        Series::new(
            "general_term_x".into(),
            text(rows, |r| r.general_term_x.as_deref()),
        ),
        Series::new(
            "displayed_term_x".into(),
            text(rows, |r| r.displayed_term_x.as_deref()),
        ),
        Series::new("2nd_keyword".into(), text(rows, |r| Some(r.keyword_2.as_str()))),
        Series::new(
            "general_term_y".into(),
            text(rows, |r| r.general_term_y.as_deref()),
        ),
        Series::new(
            "displayed_term_y".into(),
            text(rows, |r| r.displayed_term_y.as_deref()),
        ),
        Series::new("sentences".into(), text(rows, |r| Some(r.sentence.as_str()))),
        Series::new(
            "category".into(),
            text(rows, |r| r.category.map(|c| c.as_str())),
        ),
        Series::new(
            "bib_id".into(),
            rows.iter().map(|r| r.document_id).collect::<Vec<i64>>(),
        ),
    ])?;
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    ParquetWriter::new(file).finish(&mut df)?;
    Ok(())
}
