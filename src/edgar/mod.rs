pub mod filing;
pub mod index;
pub mod parsing;
pub mod report;
