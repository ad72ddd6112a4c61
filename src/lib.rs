pub mod core;
pub mod edgar;
pub mod fetch;
pub mod harvest;
pub mod repl;
pub mod utils;

// Re-exports
pub use edgar::filing::{Extraction, FilingExtractor};
pub use edgar::index::FilingRecord;
pub use harvest::{HarvestTable, Harvester};
pub use utils::progress::ProgressTracker;
