// src/lib.rs

//! Fetch the UCI Taiwan credit-card-default spreadsheet, convert it to CSV and
//! store it in S3, falling back to a streamed multipart upload when the
//! direct write fails.

pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod store;
pub mod table;

#[cfg(test)]
mod testing;

pub use config::LoaderConfig;
pub use error::{FetchError, LoadError, ParseError, SchemaError, WriteError};
pub use pipeline::{LoadReport, Loader, Stage};
pub use store::{Destination, ObjectSink, WriteOutcome};
pub use table::{Cell, Table};
