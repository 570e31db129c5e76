//! One scrape-merge-publish run.

use crate::baseline::{BaselineLoader, BaselineSource};
use crate::error::Result;
use crate::merge::merge;
use crate::publish::{PublishOutcome, publish};
use crate::scraper::TimelineScraper;
use crate::tweet::Tweet;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Inputs of a run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: String,
    pub baseline: BaselineSource,
    pub output: PathBuf,
}

/// Counts describing a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub baseline: usize,
    pub scraped: usize,
    pub inserted: usize,
    pub total: usize,
    /// `None` when there was nothing to publish.
    pub written_to: Option<PathBuf>,
}

impl RunReport {
    fn new(baseline: usize, scraped: usize, inserted: usize, total: usize, outcome: PublishOutcome) -> Self {
        let written_to = match outcome {
            PublishOutcome::Written { path, .. } => Some(path),
            PublishOutcome::Skipped => None,
        };
        Self {
            baseline,
            scraped,
            inserted,
            total,
            written_to,
        }
    }
}

/// Load the baseline and scrape concurrently, merge, then publish.
///
/// A scrape failure aborts before anything is written.
#[instrument(skip_all, fields(url = %config.url))]
pub async fn run(
    config: &RunConfig,
    loader: &BaselineLoader,
    scraper: &dyn TimelineScraper,
) -> Result<RunReport> {
    let (baseline, scraped) = tokio::join!(loader.load(&config.baseline), scraper.scrape(&config.url));
    let scraped = scraped?;
    merge_and_publish(baseline, &scraped, config.output.clone()).await
}

/// Merge already-materialized logs into `baseline` and publish the result.
pub async fn merge_and_publish(
    baseline: Vec<Tweet>,
    incoming: &[Tweet],
    output: PathBuf,
) -> Result<RunReport> {
    let outcome = merge(&baseline, incoming);
    info!(
        baseline = baseline.len(),
        incoming = incoming.len(),
        inserted = outcome.inserted,
        total = outcome.log.len(),
        "Merged session into baseline"
    );

    let (inserted, total) = (outcome.inserted, outcome.log.len());
    let published = tokio::task::spawn_blocking(move || publish(&output, outcome.log))
        .await
        .map_err(|e| std::io::Error::other(format!("publish task failed: {e}")))??;

    Ok(RunReport::new(
        baseline.len(),
        incoming.len(),
        inserted,
        total,
        published,
    ))
}
