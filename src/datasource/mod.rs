//! Datasource module
//!
//! Sinks the queuing appender can write to:
//!
//! - [`Datasource`]: appends CSV or NDJSON through `/v0/datasources`
//! - [`EventsSink`]: streams NDJSON through the events API `/v0/events`
//! - [`FileDatasource`]: appends CSV rows to a local file, for development

mod encode;
mod events;
mod file;
mod remote;

pub use encode::{gzip, to_csv, to_ndjson};
pub use events::EventsSink;
pub use file::FileDatasource;
pub use remote::Datasource;
