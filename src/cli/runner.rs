//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::Config;
use crate::datasource::{Datasource, EventsSink, FileDatasource};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::queue::RecordQueue;
use crate::sink::Sink;
use crate::types::{AppendFormat, CsvRow, JsonValue};
use crate::worker::{DropReason, QueuingAppender};
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info};

/// Counts reported after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSummary {
    /// Records read from the input
    pub enqueued: usize,
    /// Records in batches the appender gave up on
    pub dropped: usize,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Append {
                datasource,
                version,
                format,
                delimiter,
                input,
                output_file,
            } => {
                self.append(
                    datasource,
                    *version,
                    *format,
                    *delimiter,
                    input.as_deref(),
                    output_file.as_deref(),
                )
                .await
            }
            Commands::Events {
                name,
                wait,
                compress,
                input,
            } => {
                self.events(name, *wait, *compress, input.as_deref())
                    .await
            }
            Commands::Config => self.show_config(),
        }
    }

    /// Load configuration: file, then environment, then flags
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.cli.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        }
        .with_env();

        if let Some(host) = &self.cli.host {
            config.host.clone_from(host);
        }
        if let Some(token) = &self.cli.token {
            config.token = Some(token.clone());
        }
        if let Some(secs) = self.cli.min_interval {
            config.appender.min_interval = Duration::try_from_secs_f64(secs)
                .map_err(|e| Error::invalid_value("min_interval", e.to_string()))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Append lines to a datasource (or a local file)
    async fn append(
        &self,
        datasource: &str,
        version: Option<u32>,
        format: AppendFormat,
        delimiter: char,
        input: Option<&Path>,
        output_file: Option<&Path>,
    ) -> Result<()> {
        let config = self.load_config()?;
        let delimiter = u8::try_from(delimiter)
            .map_err(|_| Error::invalid_value("delimiter", "must be a single ASCII character"))?;

        let (sink_name, summary) = match (format, output_file) {
            (AppendFormat::Csv, Some(path)) => {
                let sink = Arc::new(FileDatasource::new(path));
                let summary =
                    pump(&config, sink, input, |line| parse_csv_line(line, delimiter)).await?;
                (path.display().to_string(), summary)
            }
            (AppendFormat::Ndjson, Some(_)) => {
                return Err(Error::config("--output-file only supports the csv format"));
            }
            (format, None) => {
                let client = Arc::new(HttpClient::from_config(&config)?);
                let mut ds = Datasource::new(datasource, client).with_delimiter(delimiter);
                if let Some(version) = version {
                    ds = ds.with_version(version);
                }
                let sink_name = ds.canonical_name();
                let sink = Arc::new(ds);

                let summary = match format {
                    AppendFormat::Csv => {
                        pump::<CsvRow, _, _>(&config, sink, input, |line| {
                            parse_csv_line(line, delimiter)
                        })
                        .await?
                    }
                    AppendFormat::Ndjson => {
                        pump::<JsonValue, _, _>(&config, sink, input, parse_json_line).await?
                    }
                };
                (sink_name, summary)
            }
        };

        print_summary(&sink_name, summary);
        Ok(())
    }

    /// Send NDJSON lines to the events API
    async fn events(
        &self,
        name: &str,
        wait: bool,
        compress: bool,
        input: Option<&Path>,
    ) -> Result<()> {
        let config = self.load_config()?;
        let client = Arc::new(HttpClient::from_config(&config)?);
        let sink = Arc::new(
            EventsSink::new(name, client)
                .with_wait(wait)
                .with_compression(compress),
        );

        let summary = pump(&config, sink, input, parse_json_line).await?;
        print_summary(name, summary);
        Ok(())
    }

    /// Print the effective configuration with the token masked
    fn show_config(&self) -> Result<()> {
        let mut config = self.load_config()?;
        if config.token.is_some() {
            config.token = Some("****".to_string());
        }
        print!("{}", config.to_yaml()?);
        Ok(())
    }
}

/// Feed every input line through a queue and appender into `sink`
///
/// Waits until everything read has been handed to the sink. Parse errors stop
/// reading; records already queued before the error are discarded.
pub async fn pump<R, S, F>(
    config: &Config,
    sink: Arc<S>,
    input: Option<&Path>,
    parse: F,
) -> Result<PumpSummary>
where
    R: Send + Sync + 'static,
    S: Sink<R> + 'static,
    F: Fn(&str) -> Result<R>,
{
    let started = Instant::now();
    let queue = Arc::new(RecordQueue::new());
    let dropped = Arc::new(AtomicUsize::new(0));

    let hook = {
        let dropped = dropped.clone();
        move |batch: Vec<R>, _: &DropReason| {
            dropped.fetch_add(batch.len(), Ordering::Relaxed);
        }
    };
    let appender = Arc::new(
        QueuingAppender::new(queue.clone(), sink, config.appender.clone()).with_dead_letter(hook),
    );
    let handle = tokio::spawn({
        let appender = appender.clone();
        async move { appender.run().await }
    });

    let mut enqueued = 0;
    let read = async {
        let mut lines = BufReader::new(open_input(input).await?).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            queue.put(parse(&line)?).await;
            enqueued += 1;
        }
        Ok::<_, Error>(())
    }
    .await;

    if read.is_ok() {
        appender.close_after_drain();
    } else {
        appender.close();
    }
    handle
        .await
        .map_err(|e| Error::Other(format!("appender task failed: {e}")))?;
    read?;

    let summary = PumpSummary {
        enqueued,
        dropped: dropped.load(Ordering::Relaxed),
    };
    info!(
        enqueued = summary.enqueued,
        dropped = summary.dropped,
        duration_secs = started.elapsed().as_secs_f64(),
        "input drained"
    );
    Ok(summary)
}

async fn open_input(input: Option<&Path>) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match input {
        Some(path) => {
            debug!(path = %path.display(), "reading records from file");
            let file = tokio::fs::File::open(path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FileNotFound {
                        path: path.display().to_string(),
                    }
                } else {
                    Error::Io(e)
                }
            })?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

/// Parse one CSV line into a row
pub fn parse_csv_line(line: &str, delimiter: u8) -> Result<CsvRow> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(ToString::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

/// Parse one NDJSON line
pub fn parse_json_line(line: &str) -> Result<JsonValue> {
    Ok(serde_json::from_str(line)?)
}

fn print_summary(sink: &str, summary: PumpSummary) {
    let msg = json!({
        "type": "SUMMARY",
        "sink": sink,
        "enqueued": summary.enqueued,
        "dropped": summary.dropped,
    });
    println!("{msg}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppenderConfig;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn fast_config() -> Config {
        Config {
            appender: AppenderConfig::builder()
                .min_interval(Duration::ZERO)
                .build(),
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_csv_line() {
        assert_eq!(
            parse_csv_line(r#"a,1,"{""x"":1}""#, b',').unwrap(),
            vec!["a", "1", r#"{"x":1}"#]
        );
        assert_eq!(parse_csv_line("a;b", b';').unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_json_line() {
        assert_eq!(parse_json_line(r#"{"k":1}"#).unwrap(), json!({"k": 1}));
        assert!(matches!(
            parse_json_line("{not json"),
            Err(Error::JsonParse(_))
        ));
    }

    #[tokio::test]
    async fn test_pump_into_file_datasource() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("input.csv");
        let mut input = std::fs::File::create(&input_path).unwrap();
        writeln!(input, "a,1").unwrap();
        writeln!(input).unwrap();
        writeln!(input, "b,2").unwrap();
        writeln!(input, "c,3").unwrap();
        drop(input);

        let sink = Arc::new(FileDatasource::new(dir.path().join("out.csv")));
        let summary = pump(&fast_config(), sink.clone(), Some(&input_path), |line| {
            parse_csv_line(line, b',')
        })
        .await
        .unwrap();

        assert_eq!(
            summary,
            PumpSummary {
                enqueued: 3,
                dropped: 0
            }
        );
        assert_eq!(sink.read_lines().await.unwrap(), vec!["a,1", "b,2", "c,3"]);
    }

    #[tokio::test]
    async fn test_pump_stops_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("input.ndjson");
        std::fs::write(&input_path, "{\"a\":1}\nnot json\n").unwrap();

        let sink = Arc::new(FileDatasource::new(dir.path().join("out.csv")));
        let result = pump(&fast_config(), sink, Some(&input_path), |line| {
            parse_json_line(line).map(|v| vec![v.to_string()])
        })
        .await;

        assert!(matches!(result, Err(Error::JsonParse(_))));
    }

    #[tokio::test]
    async fn test_pump_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(FileDatasource::new(dir.path().join("out.csv")));
        let result = pump(
            &fast_config(),
            sink,
            Some(&dir.path().join("missing.csv")),
            |line| parse_csv_line(line, b','),
        )
        .await;

        assert!(matches!(result, Err(Error::FileNotFound { .. })));
    }
}
