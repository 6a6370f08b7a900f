use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::catalog::CatalogQuery;
use crate::{Error, Result};

pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const DEFAULT_HELIX_BASE_URL: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_TOP_CLIPS_URL: &str = "https://api.twitch.tv/kraken/clips/top";

/// Best-effort media URL for clips without any preview data. `{}` is replaced
/// by the tracking id.
pub const DEFAULT_FALLBACK_MEDIA_TEMPLATE: &str =
    "https://clips-media-assets2.twitch.tv/AT-cm%7C{}.mp4";

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

pub const DEFAULT_BUDGET: Duration = Duration::from_secs(10 * 60);

pub const DEFAULT_USER_AGENT: &str = concat!("clipsrec/", env!("CARGO_PKG_VERSION"));

/// Application credentials for the client-credentials exchange.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "CLIENT_ID")]
    pub client_id: String,
    #[serde(rename = "CLIENT_SECRET")]
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Load credentials from a JSON file holding `CLIENT_ID` and `CLIENT_SECRET`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "cannot read credentials file `{}`: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&raw).map_err(|e| match e {
            Error::Configuration(msg) => {
                Error::config(format!("credentials file `{}`: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let credentials: Credentials =
            serde_json::from_str(raw).map_err(|e| Error::config(format!("malformed JSON: {e}")))?;
        credentials.validate()?;
        Ok(credentials)
    }

    fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::config("CLIENT_ID is empty"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(Error::config("CLIENT_SECRET is empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Remote endpoints. Overridable so tests can point the engine at a mock server.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub token_url: String,
    pub helix_base_url: String,
    pub top_clips_url: String,
    pub fallback_media_template: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            helix_base_url: DEFAULT_HELIX_BASE_URL.to_owned(),
            top_clips_url: DEFAULT_TOP_CLIPS_URL.to_owned(),
            fallback_media_template: DEFAULT_FALLBACK_MEDIA_TEMPLATE.to_owned(),
        }
    }
}

impl Endpoints {
    /// All endpoints must be absolute http(s) URLs.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("token URL", &self.token_url),
            ("Helix base URL", &self.helix_base_url),
            ("top clips URL", &self.top_clips_url),
        ] {
            let url = Url::parse(value)
                .map_err(|e| Error::config(format!("invalid {name} `{value}`: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "{name} `{value}` must use http or https"
                )));
            }
        }
        if !self.fallback_media_template.contains("{}") {
            return Err(Error::config(
                "fallback media template needs a `{}` placeholder",
            ));
        }
        Ok(())
    }

    pub fn helix(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.helix_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Options for the shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout for API calls. Zero disables it.
    pub request_timeout: Duration,

    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,

    pub user_agent: String,

    /// Explicit proxy URL (`http://`, `https://` or `socks5://`).
    pub proxy: Option<String>,

    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            proxy: None,
            pool_max_idle_per_host: 10,
        }
    }
}

/// Options for the download orchestrator.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Bytes read from the response and written to disk per step.
    pub chunk_size: usize,

    /// Upper bound on simultaneous downloads. `None` starts every clip at once.
    pub max_concurrent: Option<usize>,

    /// Deadline for one clip, from request to final flush.
    pub clip_timeout: Option<Duration>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent: None,
            clip_timeout: None,
        }
    }
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
    pub query: CatalogQuery,
    pub budget: Duration,
    pub output_dir: PathBuf,
    pub http: HttpConfig,
    pub download: DownloadConfig,
}

impl RunConfig {
    pub fn new(credentials: Credentials, query: CatalogQuery) -> Self {
        Self {
            credentials,
            endpoints: Endpoints::default(),
            query,
            budget: DEFAULT_BUDGET,
            output_dir: PathBuf::from("output"),
            http: HttpConfig::default(),
            download: DownloadConfig::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    pub fn with_download(mut self, download: DownloadConfig) -> Self {
        self.download = download;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.budget.is_zero() {
            return Err(Error::config("budget must be greater than zero"));
        }
        if self.download.chunk_size == 0 {
            return Err(Error::config("chunk size must be greater than zero"));
        }
        if self.download.max_concurrent == Some(0) {
            return Err(Error::config("max concurrent downloads must be at least 1"));
        }
        self.endpoints.validate()?;
        self.query.validate()
    }
}
