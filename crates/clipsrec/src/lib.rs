//! Clipsrec: a batch engine that collects the most popular recent Twitch clips.
//!
//! One run exchanges app credentials for a token, lists clips, keeps the
//! shortest catalog prefix that fills a duration budget, and downloads every
//! kept clip concurrently into a freshly recreated output directory next to a
//! `clips.json` metadata file.
//!
//! ## Core Types
//!
//! - [`ClipJob`] - Runs the whole job and returns a [`RunReport`]
//! - [`RunConfig`] - Credentials, query, budget and download options
//! - [`CatalogQuery`] - Helix (explicit window) or legacy top clips (named period)
//! - [`ClipRecord`] - A raw catalog record plus the fields the engine relies on
//! - [`DownloadOutcome`] - Per-clip success or failure
//!
//! ## Errors
//!
//! [`Error`] aborts a run. [`DownloadError`] only ever appears inside a
//! [`DownloadOutcome::Failure`].

pub mod auth;
pub mod catalog;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod selector;

pub use auth::{AccessToken, fetch_token};
pub use catalog::{Broadcaster, CatalogQuery, ClipCatalog, Period, TimeWindow};
pub use config::{Credentials, DownloadConfig, Endpoints, HttpConfig, RunConfig};
pub use downloader::{ClipDownloader, DownloadOutcome};
pub use error::{DownloadError, Error, Result};
pub use output::OutputDir;
pub use pipeline::{ClipJob, RunReport};
pub use record::{ClipRecord, MediaSource};
pub use resolver::{ClipUrl, ResolvedClip};
