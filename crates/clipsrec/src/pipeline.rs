//! One end-to-end clip job.
//!
//! Stages run strictly in order: token, catalog, selection, URL resolution,
//! output directory, metadata, downloads. Anything before the downloads is
//! fatal; every URL is resolved before the output directory is touched, so a
//! malformed record leaves the previous output in place.

use std::path::PathBuf;
use std::time::Instant;

use reqwest::Client;
use tracing::info;

use crate::auth::fetch_token;
use crate::catalog::ClipCatalog;
use crate::config::RunConfig;
use crate::downloader::{ClipDownloader, DownloadOutcome};
use crate::http::create_client;
use crate::output::OutputDir;
use crate::record::ClipRecord;
use crate::{Result, resolver, selector};

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub output_dir: PathBuf,
    pub metadata_path: PathBuf,
    /// Selected records, in catalog order.
    pub selected: Vec<ClipRecord>,
    /// One outcome per selected clip, in completion order.
    pub outcomes: Vec<DownloadOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o {
                DownloadOutcome::Success { bytes, .. } => *bytes,
                DownloadOutcome::Failure { .. } => 0,
            })
            .sum()
    }
}

pub struct ClipJob {
    client: Client,
    config: RunConfig,
}

impl ClipJob {
    pub fn new(config: RunConfig) -> Result<Self> {
        let client = create_client(&config.http)?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: RunConfig) -> Self {
        Self { client, config }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let config = &self.config;
        config.validate()?;
        let started = Instant::now();

        let token = fetch_token(
            &self.client,
            &config.endpoints,
            &config.credentials,
            config.http.request_timeout,
        )
        .await?;

        let clips = ClipCatalog::new(&self.client, &config.endpoints, &config.credentials, &token)
            .with_timeout(config.http.request_timeout)
            .fetch(&config.query)
            .await?;
        let listed = clips.len();

        let selected = selector::select(clips, config.budget)?;
        info!(
            listed,
            selected = selected.len(),
            budget_secs = config.budget.as_secs(),
            "Clips selected"
        );

        let resolved =
            resolver::resolve_all(selected, &config.endpoints.fallback_media_template)?;
        let selected: Vec<ClipRecord> = resolved.iter().map(|c| c.record.clone()).collect();

        let output = OutputDir::recreate(&config.output_dir).await?;
        let metadata_path = output.write_metadata(&selected).await?;

        let downloader =
            ClipDownloader::new(self.client.clone(), output.clone(), config.download.clone());
        let outcomes = downloader.download_all(&resolved).await;

        let report = RunReport {
            output_dir: output.path().to_path_buf(),
            metadata_path,
            selected,
            outcomes,
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            bytes = report.downloaded_bytes(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Clip job finished"
        );
        Ok(report)
    }
}
