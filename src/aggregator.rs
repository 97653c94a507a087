use crate::fetcher::FetchSource;
use crate::normalizer::Normalizer;
use crate::types::{NormalizedItem, OutputFeedConfig, Result, SourceConfig};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info};

pub const DEFAULT_WORKERS: usize = 6;

/// Builds one merged output feed by running fetch+normalize for every
/// source through a bounded worker pool and collecting the results.
pub struct Aggregator {
    fetcher: Arc<dyn FetchSource>,
    normalizer: Normalizer,
    workers: usize,
}

impl Aggregator {
    pub fn new(fetcher: Arc<dyn FetchSource>, workers: usize) -> Self {
        Self {
            fetcher,
            normalizer: Normalizer::new(),
            workers: workers.max(1),
        }
    }

    /// Fetch and normalize every source concurrently, then merge, sort
    /// and truncate. A failed source is logged and contributes nothing;
    /// it never aborts its siblings. `buffered` yields results in
    /// source-list order, so the tie-break between equal timestamps is
    /// source order followed by within-source order, regardless of
    /// which fetch finishes first.
    pub async fn build_output_feed(&self, output: &OutputFeedConfig) -> Vec<NormalizedItem> {
        info!("Creating feed \"{}\"", output.title);

        let results: Vec<(&SourceConfig, Result<Vec<NormalizedItem>>)> =
            stream::iter(output.feeds.iter())
                .map(|source| async move {
                    (source, self.fetch_and_normalize(source).await)
                })
                .buffered(self.workers)
                .collect()
                .await;

        let mut merged = Vec::new();
        for (source, result) in results {
            match result {
                Ok(items) => merged.extend(items),
                Err(e) => error!("Source \"{}\" failed, skipping it: {}", source.name, e),
            }
        }

        merged.sort_by(|a, b| b.published.cmp(&a.published));
        merged.truncate(output.size);
        merged
    }

    async fn fetch_and_normalize(&self, source: &SourceConfig) -> Result<Vec<NormalizedItem>> {
        let fetched = self.fetcher.fetch(source).await?;
        self.normalizer.normalize(source, fetched.entries)
    }
}
