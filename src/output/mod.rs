//! Rendering of the final result list.

use crate::error::{FormatErrorKind, Result, TallyError};
use crate::model::ScoreResult;
use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;

/// Output format for results
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per repository, lowest score first
    #[default]
    Short,
    /// One line per package with every field
    Wide,
    /// The result list as a JSON array
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short => write!(f, "short"),
            Self::Wide => write!(f, "wide"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Write `results` in `format`. Without `all`, unscored results are left out.
pub fn write_results<W: Write>(
    writer: &mut W,
    results: &[ScoreResult],
    format: OutputFormat,
    all: bool,
) -> Result<()> {
    let shown: Vec<&ScoreResult> = results.iter().filter(|r| all || r.has_score()).collect();
    match format {
        OutputFormat::Short => write_short(writer, &shown)?,
        OutputFormat::Wide => write_wide(writer, &shown)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, &shown).map_err(render_error)?;
            writeln!(writer)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// One line per distinct repository, sorted worst first. Packages without
/// a repository are listed by package name when `all` let them through.
fn write_short<W: Write>(writer: &mut W, results: &[&ScoreResult]) -> std::io::Result<()> {
    let mut lines: Vec<(String, Option<f64>)> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for result in results {
        let key = result
            .repository()
            .map_or_else(|| result.package.to_string(), str::to_string);
        match seen.get(&key) {
            Some(&i) => {
                if lines[i].1.is_none() {
                    lines[i].1 = result.score;
                }
            }
            None => {
                seen.insert(key.clone(), lines.len());
                lines.push((key, result.score));
            }
        }
    }

    // Unscored sort after scored; among equals, by name
    lines.sort_by(|a, b| match (a.1, b.1) {
        (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.0.cmp(&b.0)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.0.cmp(&b.0),
    });

    let width = lines.iter().map(|(name, _)| name.len()).max().unwrap_or(0).max(10);
    writeln!(writer, "{:<width$}  SCORE", "REPOSITORY")?;
    for (name, score) in &lines {
        writeln!(writer, "{:<width$}  {}", name, format_score(*score))?;
    }
    Ok(())
}

fn write_wide<W: Write>(writer: &mut W, results: &[&ScoreResult]) -> std::io::Result<()> {
    let rows: Vec<[String; 7]> = results
        .iter()
        .map(|r| {
            [
                r.package.package_type.to_string(),
                r.package.name.clone(),
                r.package.version.clone(),
                r.repository().unwrap_or("-").to_string(),
                format_score(r.score),
                r.date.map_or_else(|| "-".to_string(), |d| d.to_string()),
                r.source.map_or_else(|| "-".to_string(), |s| s.to_string()),
            ]
        })
        .collect();

    let header = ["TYPE", "PACKAGE", "VERSION", "REPOSITORY", "SCORE", "DATE", "SOURCE"];
    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    write_row(writer, &header, &widths)?;
    for row in &rows {
        write_row(writer, row, &widths)?;
    }
    Ok(())
}

fn write_row<W: Write, S: AsRef<str>>(
    writer: &mut W,
    cells: &[S],
    widths: &[usize],
) -> std::io::Result<()> {
    let last = cells.len().saturating_sub(1);
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i == last {
            writeln!(writer, "{}", cell.as_ref())?;
        } else {
            write!(writer, "{:<width$}  ", cell.as_ref(), width = *width)?;
        }
    }
    Ok(())
}

/// Writer failures stay I/O errors; anything else failed to serialize.
fn render_error(err: serde_json::Error) -> TallyError {
    if err.is_io() {
        std::io::Error::from(err).into()
    } else {
        TallyError::format(
            "rendering JSON output",
            FormatErrorKind::InvalidJson(err.to_string()),
        )
    }
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{s:.1}"))
}
