use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const RUNNING_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
const DONE_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Per-run progress bar over the filings being harvested. A hidden tracker
/// accepts every call and draws nothing.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
    label: String,
}

impl ProgressTracker {
    pub fn new(label: &str) -> Self {
        Self {
            progress_bar: Some(ProgressBar::new(0)),
            label: label.to_string(),
        }
    }

    pub fn hidden() -> Self {
        Self {
            progress_bar: None,
            label: String::new(),
        }
    }

    pub fn start(&self, total: u64) {
        if let Some(pb) = &self.progress_bar {
            pb.reset();
            pb.set_style(style(RUNNING_TEMPLATE));
            pb.set_length(total);
            pb.set_position(0);
            pb.set_message(format!("Downloading {}", self.label));
            pb.enable_steady_tick(Duration::from_millis(100));
        }
    }

    pub fn update_message(&self, message: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("Downloading {} - {}", self.label, message));
        }
    }

    pub fn increment(&self, delta: u64) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(delta);
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.set_style(style(DONE_TEMPLATE));
            pb.finish_with_message(format!("Complete [{}]", self.label));
        }
    }
}
