pub mod text;

pub use text::clean_filing_html;
