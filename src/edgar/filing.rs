use log::{error, info};
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use std::fmt;
use std::time::Duration;
use url::Url;

use super::index::FilingRecord;
use crate::fetch::PageFetcher;

pub const EDGAR_ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar";
pub const INDEX_TIMEOUT: Duration = Duration::from_secs(10);
pub const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(15);

const INDEX_SUFFIX: &str = "-index.htm";
const DOCUMENT_EXTENSION: &str = ".htm";
const INLINE_VIEWER_PREFIX: &str = "ix?doc=";

static FILE_TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.tableFile").expect("file table selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("link selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Index,
    Document,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStage::Index => write!(f, "index page"),
            FetchStage::Document => write!(f, "filing document"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingStructure {
    FileTable,
    PrimaryDocument,
}

impl fmt::Display for MissingStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingStructure::FileTable => write!(f, "document table"),
            MissingStructure::PrimaryDocument => write!(f, ".htm filing document"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("Invalid path in Filename: {filename:?}")]
    PathMalformed { filename: String },
    #[error("Failed to load {stage} {url}: {reason}")]
    FetchFailed {
        stage: FetchStage,
        url: String,
        reason: String,
    },
    #[error("Could not find {what} at {url}")]
    StructureNotFound { what: MissingStructure, url: String },
    #[error("Unexpected fault: {detail}")]
    Unexpected { detail: String },
}

/// Outcome of resolving and downloading one filing.
///
/// `Failed` keeps the document URL when the server answered the document
/// request with a non-200 status, so callers can tell a dead link from an
/// unresolvable row. Transport faults carry the URL only in the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Downloaded {
        filing_url: Url,
        html: String,
    },
    Failed {
        filing_url: Option<Url>,
        error: ExtractError,
    },
}

impl Extraction {
    fn failed(filing_url: Option<Url>, error: ExtractError) -> Self {
        error!("{}", error);
        Extraction::Failed { filing_url, error }
    }

    pub fn filing_url(&self) -> Option<&Url> {
        match self {
            Extraction::Downloaded { filing_url, .. } => Some(filing_url),
            Extraction::Failed { filing_url, .. } => filing_url.as_ref(),
        }
    }

    pub fn html(&self) -> Option<&str> {
        match self {
            Extraction::Downloaded { html, .. } => Some(html),
            Extraction::Failed { .. } => None,
        }
    }

    /// The `(url, html)` pair view: both present, url only, or neither.
    pub fn into_parts(self) -> (Option<Url>, Option<String>) {
        match self {
            Extraction::Downloaded { filing_url, html } => (Some(filing_url), Some(html)),
            Extraction::Failed { filing_url, .. } => (filing_url, None),
        }
    }
}

/// CIK and accession number decoded from an index row's `Filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingPath {
    pub cik: String,
    pub accession: String,
}

impl FilingPath {
    /// Accepts `edgar/data/<CIK>/<ACCESSION>/<file>` as well as the
    /// `edgar/data/<CIK>/<ACCESSION>.txt` form used by `master.idx`.
    pub fn parse(filename: &str) -> Result<Self, ExtractError> {
        let cleaned: String = filename.chars().filter(|c| !c.is_whitespace()).collect();
        let parts: Vec<&str> = cleaned.split('/').collect();
        let malformed = || ExtractError::PathMalformed {
            filename: cleaned.clone(),
        };

        if parts.len() < 4 {
            return Err(malformed());
        }

        let cik = parts[2];
        let accession = parts[3].strip_suffix(".txt").unwrap_or(parts[3]);
        if cik.is_empty() || accession.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            cik: cik.to_string(),
            accession: accession.to_string(),
        })
    }

    /// Directory form of the accession number used in archive paths.
    pub fn accession_no_dashes(&self) -> String {
        self.accession.replace('-', "")
    }

    pub fn index_url(&self, archives_url: &Url) -> Result<Url, ExtractError> {
        let raw = format!(
            "{}/data/{}/{}/{}{}",
            archives_url.as_str().trim_end_matches('/'),
            self.cik,
            self.accession_no_dashes(),
            self.accession,
            INDEX_SUFFIX
        );
        Url::parse(&raw).map_err(|e| ExtractError::Unexpected {
            detail: format!("invalid index URL {}: {}", raw, e),
        })
    }
}

/// Finds the primary document link in a filing index page: the first link in
/// the file table that points at an `.htm` document other than an index page.
pub fn locate_primary_document(index_html: &str) -> Result<String, MissingStructure> {
    let document = Html::parse_document(index_html);
    let table = document
        .select(&FILE_TABLE)
        .next()
        .ok_or(MissingStructure::FileTable)?;

    table
        .select(&LINK)
        .filter_map(|link| link.value().attr("href"))
        .map(str::trim)
        .find(|href| is_primary_document(href))
        .map(str::to_string)
        .ok_or(MissingStructure::PrimaryDocument)
}

fn is_primary_document(href: &str) -> bool {
    href.ends_with(DOCUMENT_EXTENSION) && !href.ends_with(INDEX_SUFFIX)
}

/// Builds the document URL from a file-table link. Links are site-root
/// relative (`/Archives/edgar/data/...`), so they are joined to the site root
/// as-is. Inline XBRL viewer links (`/ix?doc=/Archives/...`) are unwrapped to
/// the underlying document.
pub fn document_url(site_url: &Url, href: &str) -> Result<Url, ExtractError> {
    if let Ok(absolute) = Url::parse(href) {
        return Ok(absolute);
    }

    let relative = href.trim_start_matches('/');
    let relative = relative
        .strip_prefix(INLINE_VIEWER_PREFIX)
        .map(|doc| doc.trim_start_matches('/'))
        .unwrap_or(relative);

    site_url.join(relative).map_err(|e| ExtractError::Unexpected {
        detail: format!("invalid document link {:?}: {}", href, e),
    })
}

/// Resolves index rows to filing documents through a [`PageFetcher`].
pub struct FilingExtractor<F> {
    fetcher: F,
    archives_url: Url,
    site_url: Url,
}

impl<F: PageFetcher> FilingExtractor<F> {
    pub fn new(fetcher: F, archives_url: Url) -> anyhow::Result<Self> {
        let site_url = archives_url.join("/")?;
        Ok(Self {
            fetcher,
            archives_url,
            site_url,
        })
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetches the filing's index page, follows it to the primary document and
    /// downloads that. Every failure is logged and returned as
    /// [`Extraction::Failed`]; nothing is raised.
    pub async fn extract(&self, record: &FilingRecord, user_agent: &str) -> Extraction {
        let path = match FilingPath::parse(&record.filename) {
            Ok(path) => path,
            Err(e) => return Extraction::failed(None, e),
        };

        let index_url = match path.index_url(&self.archives_url) {
            Ok(url) => url,
            Err(e) => return Extraction::failed(None, e),
        };

        info!(
            "Resolving {} {} ({}): {}",
            record.form_type, record.company_name, record.date_filed, index_url
        );

        let index_page = match self
            .fetcher
            .fetch_page(&index_url, user_agent, INDEX_TIMEOUT)
            .await
        {
            Ok(page) if page.status == StatusCode::OK => page,
            Ok(page) => {
                return Extraction::failed(
                    None,
                    fetch_failed(FetchStage::Index, &index_url, format!("HTTP {}", page.status)),
                )
            }
            Err(e) => {
                return Extraction::failed(
                    None,
                    fetch_failed(FetchStage::Index, &index_url, format!("{:#}", e)),
                )
            }
        };

        let href = match locate_primary_document(&index_page.body) {
            Ok(href) => href,
            Err(what) => {
                return Extraction::failed(
                    None,
                    ExtractError::StructureNotFound {
                        what,
                        url: index_url.to_string(),
                    },
                )
            }
        };

        let filing_url = match document_url(&self.site_url, &href) {
            Ok(url) => url,
            Err(e) => return Extraction::failed(None, e),
        };

        log::debug!("Primary document link {:?} -> {}", href, filing_url);

        match self
            .fetcher
            .fetch_page(&filing_url, user_agent, DOCUMENT_TIMEOUT)
            .await
        {
            Ok(page) if page.status == StatusCode::OK => {
                info!("Downloaded: {}", filing_url);
                Extraction::Downloaded {
                    filing_url,
                    html: page.body,
                }
            }
            Ok(page) => {
                let error =
                    fetch_failed(FetchStage::Document, &filing_url, format!("HTTP {}", page.status));
                Extraction::failed(Some(filing_url), error)
            }
            Err(e) => {
                let error = fetch_failed(FetchStage::Document, &filing_url, format!("{:#}", e));
                Extraction::failed(None, error)
            }
        }
    }
}

fn fetch_failed(stage: FetchStage, url: &Url, reason: String) -> ExtractError {
    ExtractError::FetchFailed {
        stage,
        url: url.to_string(),
        reason,
    }
}
