use chrono::Utc;
use clap::{Parser, ValueEnum};
use rss_merge::{
    config, writer, Aggregator, FeedDocument, FetchConfig, FetchSource, Fetcher, MergeError,
    DEFAULT_WORKERS,
};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};

/// Merge RSS feeds.
#[derive(Parser)]
#[command(name = "rss-merge", version)]
struct Cli {
    /// Logging level
    #[arg(short = 'l', long = "log", value_enum, default_value_t = LogLevel::Info)]
    log: LogLevel,

    /// Output file for the log (default: standard error)
    #[arg(long = "log-output", value_name = "FILE")]
    log_output: Option<PathBuf>,

    /// Output RSS file (default: standard output)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum number of simultaneous fetches
    #[arg(short = 'w', long = "workers", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Output character encoding
    #[arg(short = 'e', long = "encoding", default_value = "utf-8")]
    encoding: String,

    /// JSON file describing the feeds to merge
    #[arg(value_name = "feeds.json")]
    feeds_file: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            // tracing has no CRITICAL; ERROR is the closest level.
            LogLevel::Critical | LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let builder = tracing_subscriber::fmt().with_max_level(cli.log.filter());
    match &cli.log_output {
        Some(path) => {
            let file = File::create(path)?;
            builder.with_writer(Arc::new(file)).with_ansi(false).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

/// Number of output feeds that would fall back to the shared CLI `-o`
/// destination. More than one means each write would clobber the last.
fn feeds_sharing_cli_output(document: &FeedDocument) -> usize {
    document
        .outputs
        .iter()
        .filter(|output| output.output.is_none())
        .count()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let document = config::load_document(&cli.feeds_file).map_err(|e| {
        error!("Error while opening the input file \"{}\": {}", cli.feeds_file.display(), e);
        e
    })?;

    if let Some(path) = &cli.output {
        let sharing = feeds_sharing_cli_output(&document);
        if sharing > 1 {
            let e = MergeError::Config(format!(
                "{} output feeds have no per-feed output path and would overwrite \"{}\"; \
                 give each an \"output\" field in the document",
                sharing,
                path.display()
            ));
            error!("{}", e);
            return Err(e.into());
        }
    }

    // One clock reading per run, threaded through to the serializer.
    let now = Utc::now();

    let fetcher: Arc<dyn FetchSource> = Arc::new(Fetcher::new(FetchConfig::default()));
    let aggregator = Aggregator::new(fetcher, cli.workers);

    for output in &document.outputs {
        let items = aggregator.build_output_feed(output).await;

        let destination = output.output.as_ref().or(cli.output.as_ref());
        match destination {
            Some(path) => {
                let mut file = File::create(path).map_err(|e| {
                    error!("Cannot open output file \"{}\": {}", path.display(), e);
                    e
                })?;
                writer::write_channel(output, &items, now, &cli.encoding, &mut file)?;
                info!("Wrote \"{}\" to {}", output.title, path.display());
            }
            None => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                writer::write_channel(output, &items, now, &cli.encoding, &mut handle)?;
                handle.flush()?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_feeds_that_would_share_the_cli_output_path() {
        let document = config::parse_document(json!({
            "outputs": [
                { "feeds": [] },
                { "output": "dedicated.xml", "feeds": [] },
                { "feeds": [] }
            ]
        }))
        .unwrap();

        // Two feeds have no per-feed destination; a single shared `-o`
        // path must be rejected rather than overwritten in turn.
        assert_eq!(feeds_sharing_cli_output(&document), 2);

        let single = config::parse_document(json!({ "outputs": [{ "feeds": [] }] })).unwrap();
        assert_eq!(feeds_sharing_cli_output(&single), 1);
    }
}
