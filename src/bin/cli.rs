use anyhow::{anyhow, Result};
use colored::*;
use harvester::{
    core::config::HarvesterConfig,
    edgar::{index, report::FormType},
    fetch::EdgarClient,
    harvest::{HarvestTable, OutputFormat},
    repl::{PresetCount, RustylinePrompt},
    FilingExtractor, Harvester, ProgressTracker,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "harvester-cli",
    about = "Download and clean SEC filings listed in an EDGAR index"
)]
struct Opt {
    /// EDGAR index file: master.idx / form.idx, or a CSV conversion of one
    #[structopt(short, long, parse(from_os_str))]
    index: PathBuf,

    /// Contact sent as User-Agent (defaults to $USER_AGENT)
    #[structopt(short, long)]
    user_agent: Option<String>,

    /// Form type to harvest, e.g. 10-K or 8-K
    #[structopt(short, long, default_value = "10-K")]
    form: String,

    /// Number of filings to download; asked interactively when omitted
    #[structopt(short, long, allow_hyphen_values = true)]
    count: Option<i64>,

    /// Where to write the harvested filings
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Output format: csv or json
    #[structopt(long, default_value = "csv")]
    format: OutputFormat,

    /// Also write the rows that produced no document to this CSV
    #[structopt(long, parse(from_os_str))]
    skipped: Option<PathBuf>,

    /// Convert the index to CSV at this path and exit
    #[structopt(long, parse(from_os_str))]
    convert_to: Option<PathBuf>,
}

fn print_summary(table: &HarvestTable, output: &Path) {
    println!();
    println!(
        "{} {} of {} requested filings",
        "Downloaded".green().bold(),
        table.filings.len(),
        table.requested
    );
    if !table.skipped.is_empty() {
        println!("{} {} filings:", "Skipped".yellow().bold(), table.skipped.len());
        for skipped in &table.skipped {
            println!(
                "  {} ({}): {}",
                skipped.company_name,
                skipped.date_filed,
                skipped.reason.to_string().dimmed()
            );
        }
    }
    if !table.is_empty() {
        println!("Saved to {}", output.display().to_string().cyan());
    }
}

/// Log filter read from `filter_var`, `info` when unset so each filing's
/// outcome is reported.
fn logger(filter_var: &str) -> env_logger::Builder {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(filter_var, "info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logger("RUST_LOG").init();

    let opt = Opt::from_args();
    let config = HarvesterConfig::from_env()?.with_user_agent(opt.user_agent.clone())?;

    let dataset = index::load_index(&opt.index)?;

    if let Some(target) = &opt.convert_to {
        index::write_index_csv(&dataset, target)?;
        println!("Converted {} index rows to {}", dataset.len(), target.display());
        return Ok(());
    }

    let form = FormType::from_str(&opt.form)
        .map_err(|e| anyhow!("{} (known types: {})", e, FormType::list_types()))?;

    let extractor = FilingExtractor::new(EdgarClient::new()?, config.archives_url.clone())?;
    let harvester = Harvester::new(extractor, config.user_agent.clone(), form.clone())
        .with_progress(ProgressTracker::new(&form.to_string()));

    let table = match opt.count {
        Some(count) => {
            harvester
                .download_many(&dataset, &mut PresetCount::new(count))
                .await?
        }
        None => {
            harvester
                .download_many(&dataset, &mut RustylinePrompt::new()?)
                .await?
        }
    };

    let output = opt.output.clone().unwrap_or_else(|| {
        config
            .filings_dir()
            .join(format!("{}_filings.{}", form.file_stem(), opt.format))
    });

    if !table.is_empty() {
        table.write(&output, opt.format)?;
    }
    if let Some(skipped_path) = &opt.skipped {
        table.write_skipped(skipped_path)?;
    }

    print_summary(&table, &output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;

    #[test]
    fn test_logger_defaults_to_info() {
        let logger = logger("HARVESTER_CLI_UNSET_LOG_FILTER").build();
        assert_eq!(logger.filter(), LevelFilter::Info);
    }

    #[test]
    fn test_count_accepts_negative_values() {
        let opt = Opt::from_iter(vec!["harvester-cli", "-i", "master.idx", "-c", "-1"]);
        assert_eq!(opt.count, Some(-1));
        assert_eq!(opt.form, "10-K");
        assert_eq!(opt.format, OutputFormat::Csv);
    }
}
