//! [`mapsift_crawler::TabularStore`] implementations.

mod a1;
mod client;
mod csv_store;

pub use a1::{column_letter, row_range, sheet_range};
pub use client::{SheetsClient, SHEETS_API};
pub use csv_store::{CsvStore, CsvTerminator, CsvWriterConfig};
