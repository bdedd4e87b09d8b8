//! Local CSV file sink for development

use super::encode::to_csv;
use crate::error::Result;
use crate::sink::{AppendResponse, Sink};
use crate::types::CsvRow;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Appends CSV rows to a file instead of the API
#[derive(Debug, Clone)]
pub struct FileDatasource {
    name: String,
    path: PathBuf,
}

impl FileDatasource {
    /// Create a sink writing to `path`; the name is the file name
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    /// Target file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back all lines written so far
    pub async fn read_lines(&self) -> Result<Vec<String>> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(content.lines().map(ToString::to_string).collect())
    }
}

#[async_trait]
impl Sink<CsvRow> for FileDatasource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn append(&self, batch: &[CsvRow]) -> Result<AppendResponse> {
        if !batch.is_empty() {
            let data = to_csv(batch, b',')?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .await?;
            file.write_all(data.as_bytes()).await?;
            file.flush().await?;
        }

        Ok(AppendResponse::ok())
    }
}
