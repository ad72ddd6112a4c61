use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::WriterBuilder;
use log::{info, warn};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use strum::{Display, EnumString};

use crate::edgar::filing::{ExtractError, Extraction, FilingExtractor};
use crate::edgar::index::{select_form, FilingRecord};
use crate::edgar::parsing::text::clean_filing_html;
use crate::edgar::report::FormType;
use crate::fetch::PageFetcher;
use crate::repl::{prompt_for_count, CountPrompt};
use crate::utils::dirs::ensure_parent_dir;
use crate::utils::progress::ProgressTracker;

/// One downloaded and cleaned filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilingText {
    #[serde(rename = "Company Name")]
    pub company_name: String,
    #[serde(rename = "CIK")]
    pub cik: String,
    #[serde(rename = "Date Filed")]
    pub date_filed: NaiveDate,
    #[serde(rename = "Filing URL")]
    pub filing_url: String,
    #[serde(rename = "Filing Text")]
    pub filing_text: String,
    #[serde(rename = "Cleaned Text")]
    pub cleaned_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Extraction(ExtractError),
    EmptyDocument,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Extraction(e) => write!(f, "{}", e),
            SkipReason::EmptyDocument => write!(f, "Filing document was empty"),
        }
    }
}

fn as_display<T: fmt::Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// A requested row that produced no output, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFiling {
    #[serde(rename = "Company Name")]
    pub company_name: String,
    #[serde(rename = "CIK")]
    pub cik: String,
    #[serde(rename = "Date Filed")]
    pub date_filed: NaiveDate,
    #[serde(rename = "Filename")]
    pub filename: String,
    #[serde(rename = "Filing URL")]
    pub filing_url: Option<String>,
    #[serde(rename = "Reason", serialize_with = "as_display")]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

/// Result of a harvest run, in processing order. `filings` holds the
/// six-column output table; rows that were requested but yielded no document
/// are kept apart in `skipped`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestTable {
    pub requested: usize,
    pub filings: Vec<FilingText>,
    pub skipped: Vec<SkippedFiling>,
}

impl HarvestTable {
    pub fn is_empty(&self) -> bool {
        self.filings.is_empty()
    }

    pub fn write(&self, path: &Path, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Csv => write_csv(&self.filings, path)?,
            OutputFormat::Json => {
                ensure_parent_dir(path)?;
                let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
                let mut writer = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, &self.filings)?;
                writer.flush()?;
            }
        }
        info!("Wrote {} filings to {:?}", self.filings.len(), path);
        Ok(())
    }

    pub fn write_skipped(&self, path: &Path) -> Result<()> {
        write_csv(&self.skipped, path)?;
        info!("Wrote {} skipped rows to {:?}", self.skipped.len(), path);
        Ok(())
    }
}

fn write_csv<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Drives extraction and cleaning over an index, one filing at a time.
pub struct Harvester<F> {
    extractor: FilingExtractor<F>,
    user_agent: String,
    form: FormType,
    progress: ProgressTracker,
}

impl<F: PageFetcher> Harvester<F> {
    pub fn new(extractor: FilingExtractor<F>, user_agent: impl Into<String>, form: FormType) -> Self {
        Self {
            extractor,
            user_agent: user_agent.into(),
            form,
            progress: ProgressTracker::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    pub fn extractor(&self) -> &FilingExtractor<F> {
        &self.extractor
    }

    /// Selects the rows of the target form, asks how many to fetch and
    /// harvests that many from the top.
    pub async fn download_many<P: CountPrompt + ?Sized>(
        &self,
        dataset: &[FilingRecord],
        prompt: &mut P,
    ) -> Result<HarvestTable> {
        let selected = select_form(dataset, &self.form);
        let total = selected.len();

        if total == 0 {
            println!("No {} filings found in the dataset.", self.form);
            return Ok(HarvestTable::default());
        }

        println!("Found {} {} filings in the dataset.", total, self.form);

        let count = prompt_for_count(prompt, &self.form, total)?;
        Ok(self.harvest(&selected[..count]).await)
    }

    /// Extracts and cleans each record in order. Never fails; rows without a
    /// document end up in `skipped`.
    pub async fn harvest(&self, records: &[FilingRecord]) -> HarvestTable {
        let mut table = HarvestTable {
            requested: records.len(),
            ..Default::default()
        };

        self.progress.start(records.len() as u64);

        for record in records {
            self.progress.update_message(&record.company_name);

            match self.extractor.extract(record, &self.user_agent).await {
                Extraction::Downloaded { filing_url, html } if !html.is_empty() => {
                    let cleaned_text = clean_filing_html(&html);
                    table.filings.push(FilingText {
                        company_name: record.company_name.clone(),
                        cik: record.cik.clone(),
                        date_filed: record.date_filed,
                        filing_url: filing_url.to_string(),
                        filing_text: html,
                        cleaned_text,
                    });
                }
                Extraction::Downloaded { filing_url, .. } => {
                    warn!("Empty filing document: {}", filing_url);
                    table
                        .skipped
                        .push(skipped(record, Some(filing_url.to_string()), SkipReason::EmptyDocument));
                }
                Extraction::Failed { filing_url, error } => {
                    table.skipped.push(skipped(
                        record,
                        filing_url.map(|url| url.to_string()),
                        SkipReason::Extraction(error),
                    ));
                }
            }

            self.progress.increment(1);
        }

        self.progress.finish();
        info!(
            "Harvested {} of {} requested {} filings ({} skipped)",
            table.filings.len(),
            table.requested,
            self.form,
            table.skipped.len()
        );
        table
    }
}

fn skipped(record: &FilingRecord, filing_url: Option<String>, reason: SkipReason) -> SkippedFiling {
    SkippedFiling {
        company_name: record.company_name.clone(),
        cik: record.cik.clone(),
        date_filed: record.date_filed,
        filename: record.filename.clone(),
        filing_url,
        reason,
    }
}
