use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use clipsrec_engine::config::DEFAULT_CHUNK_SIZE;
use clipsrec_engine::{
    Broadcaster, CatalogQuery, Credentials, DownloadConfig, HttpConfig, Period, RunConfig,
    TimeWindow,
};

/// Which clip listing to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Api {
    /// Helix `clips` endpoint over an explicit time window
    Helix,
    /// Legacy top clips endpoint over a named period
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    Day,
    Week,
    Month,
    All,
}

impl From<PeriodArg> for Period {
    fn from(value: PeriodArg) -> Self {
        match value {
            PeriodArg::Day => Period::Day,
            PeriodArg::Week => Period::Week,
            PeriodArg::Month => Period::Month,
            PeriodArg::All => Period::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable summary
    Pretty,
    /// Machine readable JSON summary
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "clipsrec",
    version,
    about = "Download the most popular recent clips of a Twitch channel"
)]
pub struct Args {
    /// JSON file holding CLIENT_ID and CLIENT_SECRET
    #[arg(long, env = "CLIPSREC_CREDENTIALS", default_value = "env.json")]
    pub credentials: PathBuf,

    /// Channel login
    #[arg(short, long, env = "CLIPSREC_CHANNEL", default_value = "pokelawls")]
    pub channel: String,

    /// Numeric broadcaster id for the Helix API; looked up from --channel when absent
    #[arg(long)]
    pub broadcaster_id: Option<String>,

    #[arg(long, value_enum, default_value_t = Api::Top)]
    pub api: Api,

    /// Named period for the legacy top clips listing
    #[arg(long, value_enum, default_value_t = PeriodArg::Day)]
    pub period: PeriodArg,

    /// Length of the Helix time window, ending now
    #[arg(long, default_value_t = 24)]
    pub window_hours: u64,

    /// Maximum number of clips to list
    #[arg(short, long, default_value_t = 100)]
    pub limit: u32,

    /// Target total duration of the selected clips, in seconds
    #[arg(short, long, default_value_t = 600)]
    pub budget_secs: u64,

    /// Output directory, deleted and recreated on every run
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Bytes per read/write step while streaming a clip
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Upper bound on simultaneous downloads (unbounded when absent)
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Per-clip download deadline in seconds
    #[arg(long)]
    pub clip_timeout_secs: Option<u64>,

    /// Timeout for token and catalog requests in seconds (0 disables it)
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Proxy URL (http, https or socks5)
    #[arg(long, env = "CLIPSREC_PROXY")]
    pub proxy: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Format of the final summary printed to stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}

impl Args {
    pub fn query(&self) -> Result<CatalogQuery> {
        let query = match self.api {
            Api::Top => CatalogQuery::Top {
                channel: self.channel.clone(),
                limit: self.limit,
                period: self.period.into(),
            },
            Api::Helix => {
                if self.window_hours == 0 {
                    bail!("--window-hours must be at least 1");
                }
                let Some(window_secs) = self.window_hours.checked_mul(3600) else {
                    bail!("--window-hours {} is too large", self.window_hours);
                };
                let broadcaster = match &self.broadcaster_id {
                    Some(id) => Broadcaster::Id(id.clone()),
                    None => Broadcaster::Login(self.channel.clone()),
                };
                CatalogQuery::Helix {
                    broadcaster,
                    first: self.limit,
                    window: TimeWindow::last(Duration::from_secs(window_secs)),
                }
            }
        };
        Ok(query)
    }

    pub fn run_config(&self) -> Result<RunConfig> {
        let credentials = Credentials::from_file(&self.credentials)
            .with_context(|| format!("loading {}", self.credentials.display()))?;

        let http = HttpConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            proxy: self.proxy.clone(),
            ..Default::default()
        };
        let download = DownloadConfig {
            chunk_size: self.chunk_size,
            max_concurrent: self.max_concurrent,
            clip_timeout: self.clip_timeout_secs.map(Duration::from_secs),
        };

        Ok(RunConfig::new(credentials, self.query()?)
            .with_budget(Duration::from_secs(self.budget_secs))
            .with_output_dir(&self.output)
            .with_http(http)
            .with_download(download))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["clipsrec"]).unwrap();
        assert_eq!(args.api, Api::Top);
        assert_eq!(args.budget_secs, 600);
        assert_eq!(args.chunk_size, 1024 * 1024);
        assert_eq!(args.output, PathBuf::from("output"));
        assert!(args.max_concurrent.is_none());

        match args.query().unwrap() {
            CatalogQuery::Top { limit, period, .. } => {
                assert_eq!(limit, 100);
                assert_eq!(period, Period::Day);
            }
            other => panic!("unexpected query {other:?}"),
        }
    }

    #[test]
    fn test_helix_without_id_uses_login() {
        let args =
            Args::try_parse_from(["clipsrec", "--api", "helix", "--channel", "someone"]).unwrap();
        match args.query().unwrap() {
            CatalogQuery::Helix { broadcaster, .. } => {
                assert_eq!(broadcaster, Broadcaster::Login("someone".to_string()));
            }
            other => panic!("unexpected query {other:?}"),
        }
    }

    #[test]
    fn test_helix_with_id() {
        let args = Args::try_parse_from([
            "clipsrec",
            "--api",
            "helix",
            "--broadcaster-id",
            "12943173",
            "--window-hours",
            "48",
        ])
        .unwrap();
        match args.query().unwrap() {
            CatalogQuery::Helix {
                broadcaster,
                window,
                ..
            } => {
                assert_eq!(broadcaster, Broadcaster::Id("12943173".to_string()));
                assert_eq!((window.ended_at - window.started_at).num_hours(), 48);
            }
            other => panic!("unexpected query {other:?}"),
        }
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Args::try_parse_from(["clipsrec", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_oversized_window_is_rejected() {
        let hours = u64::MAX.to_string();
        let args = Args::try_parse_from([
            "clipsrec",
            "--api",
            "helix",
            "--window-hours",
            hours.as_str(),
        ])
        .unwrap();
        assert!(args.query().is_err());
    }

    #[test]
    fn test_missing_credentials_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("env.json");
        let args =
            Args::try_parse_from(["clipsrec", "--credentials", path.to_str().unwrap()]).unwrap();
        assert!(args.run_config().is_err());
    }
}
