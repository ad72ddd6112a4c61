use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use url::Url;

use crate::edgar::filing::EDGAR_ARCHIVES_URL;
use crate::utils::dirs::{DATA_DIR, FILINGS_SUBDIR};

pub const DEFAULT_USER_AGENT: &str = "software@example.com";

#[derive(Clone, Debug)]
pub struct HarvesterConfig {
    /// Contact sent as `User-Agent`; SEC fair-access rules require one.
    pub user_agent: String,
    pub data_dir: PathBuf,
    pub archives_url: Url,
}

impl HarvesterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let user_agent = lookup("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let data_dir = PathBuf::from(
            lookup("HARVESTER_DATA_DIR").unwrap_or_else(|| DATA_DIR.to_string()),
        );

        let raw_archives =
            lookup("EDGAR_ARCHIVES_URL").unwrap_or_else(|| EDGAR_ARCHIVES_URL.to_string());
        let archives_url = Url::parse(&raw_archives)
            .with_context(|| format!("EDGAR_ARCHIVES_URL is not a valid URL: {}", raw_archives))?;

        Self {
            user_agent,
            data_dir,
            archives_url,
        }
        .validated()
    }

    /// Replaces the configured contact, e.g. with a `--user-agent` flag.
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Result<Self> {
        if let Some(user_agent) = user_agent {
            self.user_agent = user_agent;
        }
        self.validated()
    }

    pub fn filings_dir(&self) -> PathBuf {
        self.data_dir.join(FILINGS_SUBDIR)
    }

    fn validated(mut self) -> Result<Self> {
        self.user_agent = self.user_agent.trim().to_string();
        if self.user_agent.is_empty() {
            return Err(anyhow!("USER_AGENT must name a contact, e.g. an email address"));
        }
        if !self.user_agent.contains('@') {
            log::warn!(
                "User agent {:?} has no contact email; www.sec.gov may refuse requests",
                self.user_agent
            );
        }
        if self.archives_url.cannot_be_a_base() {
            return Err(anyhow!("EDGAR_ARCHIVES_URL must be a hierarchical URL"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HarvesterConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.archives_url.as_str(), EDGAR_ARCHIVES_URL);
        assert_eq!(config.filings_dir(), PathBuf::from("data").join("filings"));
    }

    #[test]
    fn test_environment_overrides() {
        let config = HarvesterConfig::from_lookup(lookup(&[
            ("USER_AGENT", " Jane Analyst jane@example.org "),
            ("HARVESTER_DATA_DIR", "/tmp/harvest"),
            ("EDGAR_ARCHIVES_URL", "http://localhost:8080/Archives/edgar"),
        ]))
        .unwrap();
        assert_eq!(config.user_agent, "Jane Analyst jane@example.org");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/harvest"));
        assert_eq!(config.archives_url.host_str(), Some("localhost"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(HarvesterConfig::from_lookup(lookup(&[("EDGAR_ARCHIVES_URL", "not a url")])).is_err());
        assert!(HarvesterConfig::from_lookup(lookup(&[("EDGAR_ARCHIVES_URL", "mailto:x@y.z")])).is_err());

        let config = HarvesterConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.clone().with_user_agent(Some("   ".to_string())).is_err());
        let overridden = config.with_user_agent(Some("ops@example.com".to_string())).unwrap();
        assert_eq!(overridden.user_agent, "ops@example.com");
    }
}
