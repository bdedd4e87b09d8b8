//! Request body encoders

use crate::error::{Error, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::Write;

/// Encode rows as CSV with minimal quoting and `\n` line endings
pub fn to_csv<S: AsRef<str>>(rows: &[Vec<S>], delimiter: u8) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row.iter().map(|field| field.as_ref()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::encode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::encode(e.to_string()))
}

/// Encode records as newline-delimited JSON
pub fn to_ndjson<T: Serialize>(records: &[T]) -> Result<String> {
    let docs = records
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(docs.join("\n"))
}

/// Gzip a request body
pub fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
