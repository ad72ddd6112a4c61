use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::report::FormType;

/// One row of an EDGAR filings index (`master.idx`, `form.idx` or a CSV
/// conversion of either).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRecord {
    #[serde(rename = "CIK")]
    pub cik: String,
    #[serde(rename = "Company Name")]
    pub company_name: String,
    #[serde(rename = "Form Type")]
    pub form_type: String,
    #[serde(rename = "Date Filed")]
    pub date_filed: NaiveDate,
    #[serde(rename = "Filename")]
    pub filename: String,
}

/// Parses the pipe-delimited body of an EDGAR `master.idx` file.
///
/// Everything up to the dashed separator under the column header is
/// preamble. Rows that don't have five fields or carry an unparseable date
/// are logged and dropped.
pub fn parse_master_index(text: &str) -> Vec<FilingRecord> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|line| is_separator(line))
        .map_or(0, |idx| idx + 1);

    lines[start..]
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(offset, line)| match parse_master_line(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping index line {}: {}", start + offset + 1, e);
                None
            }
        })
        .collect()
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-')
}

fn parse_master_line(line: &str) -> Result<FilingRecord> {
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() != 5 {
        return Err(anyhow!("expected 5 fields, found {}", fields.len()));
    }

    let date_filed = NaiveDate::parse_from_str(fields[3], "%Y-%m-%d")
        .with_context(|| format!("invalid filing date {:?}", fields[3]))?;

    Ok(FilingRecord {
        cik: fields[0].to_string(),
        company_name: fields[1].to_string(),
        form_type: fields[2].to_string(),
        date_filed,
        filename: fields[4].to_string(),
    })
}

pub fn read_index_csv(path: &Path) -> Result<Vec<FilingRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open index CSV {:?}", path))?;

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<FilingRecord>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping CSV row {} in {:?}: {}", row + 2, path, e),
        }
    }
    Ok(records)
}

/// Loads an index file, choosing the parser by extension: `.idx` files are
/// read as raw EDGAR indexes, everything else as CSV.
pub fn load_index(path: &Path) -> Result<Vec<FilingRecord>> {
    let is_idx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("idx"));

    let records = if is_idx {
        // EDGAR indexes are mostly ASCII but occasionally carry Latin-1 names.
        let raw = fs::read(path).with_context(|| format!("Failed to read index {:?}", path))?;
        parse_master_index(&String::from_utf8_lossy(&raw))
    } else {
        read_index_csv(path)?
    };

    info!("Loaded {} index rows from {:?}", records.len(), path);
    Ok(records)
}

/// Writes the index as CSV, newest filings first.
pub fn write_index_csv(records: &[FilingRecord], path: &Path) -> Result<()> {
    crate::utils::dirs::ensure_parent_dir(path)?;

    let mut sorted: Vec<&FilingRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.date_filed.cmp(&a.date_filed));

    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    for record in sorted {
        writer.serialize(record)?;
    }
    writer.flush()?;

    debug!("Wrote {} index rows to {:?}", records.len(), path);
    Ok(())
}

/// Rows whose form type matches `form`, in their original relative order.
pub fn select_form(records: &[FilingRecord], form: &FormType) -> Vec<FilingRecord> {
    records
        .iter()
        .filter(|record| form.matches(&record.form_type))
        .cloned()
        .collect()
}
