//! Clip listing against the Helix and legacy "top clips" endpoints.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::AccessToken;
use crate::config::{Credentials, Endpoints};
use crate::http::{body_snippet, with_timeout};
use crate::record::ClipRecord;
use crate::{Error, Result};

/// Largest page size Helix accepts for `first`.
pub const HELIX_MAX_FIRST: u32 = 100;

const LEGACY_ACCEPT: &str = "application/vnd.twitchtv.v5+json";

/// Named relative period understood by the legacy top clips listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "all" => Ok(Self::All),
            other => Err(Error::config(format!("unknown period `{other}`"))),
        }
    }
}

/// Half-open `[started_at, ended_at)` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            ended_at,
        }
    }

    /// The window ending now and spanning `span`.
    pub fn last(span: Duration) -> Self {
        let ended_at = Utc::now();
        let span = chrono::Duration::from_std(span).unwrap_or(chrono::Duration::MAX);
        let started_at = ended_at
            .checked_sub_signed(span)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self::new(started_at, ended_at)
    }
}

/// RFC3339 in UTC with a literal `Z` and no fractional seconds.
pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Whose clips to list on Helix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Broadcaster {
    Id(String),
    /// Channel login, resolved to an id through channel search first.
    Login(String),
}

impl Broadcaster {
    fn value(&self) -> &str {
        match self {
            Self::Id(v) | Self::Login(v) => v,
        }
    }
}

/// What to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    /// `GET /helix/clips` for one broadcaster over an explicit window.
    Helix {
        broadcaster: Broadcaster,
        first: u32,
        window: TimeWindow,
    },
    /// Legacy `GET /kraken/clips/top` for a channel login over a named period.
    Top {
        channel: String,
        limit: u32,
        period: Period,
    },
}

impl CatalogQuery {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Helix {
                broadcaster,
                first,
                window,
            } => {
                if broadcaster.value().trim().is_empty() {
                    return Err(Error::config("broadcaster is empty"));
                }
                if *first == 0 {
                    return Err(Error::config("clip count must be at least 1"));
                }
                if window.started_at >= window.ended_at {
                    return Err(Error::config("time window start must precede its end"));
                }
            }
            Self::Top { channel, limit, .. } => {
                if channel.trim().is_empty() {
                    return Err(Error::config("channel name is empty"));
                }
                if *limit == 0 {
                    return Err(Error::config("clip count must be at least 1"));
                }
            }
        }
        Ok(())
    }

    /// Name of the array holding the clips in the response body.
    fn list_key(&self) -> &'static str {
        match self {
            Self::Helix { .. } => "data",
            Self::Top { .. } => "clips",
        }
    }
}

/// Authenticated access to the clip listing endpoints.
pub struct ClipCatalog<'a> {
    client: &'a Client,
    endpoints: &'a Endpoints,
    credentials: &'a Credentials,
    token: &'a AccessToken,
    timeout: Duration,
}

impl<'a> ClipCatalog<'a> {
    pub fn new(
        client: &'a Client,
        endpoints: &'a Endpoints,
        credentials: &'a Credentials,
        token: &'a AccessToken,
    ) -> Self {
        Self {
            client,
            endpoints,
            credentials,
            token,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&'static str, String)],
        legacy: bool,
    ) -> Result<Value> {
        debug!(url = %url, params = ?params, "Sending catalog request");

        let mut request = self
            .client
            .get(url)
            .query(params)
            .header(AUTHORIZATION, self.token.bearer())
            .header("Client-Id", &self.credentials.client_id);
        if legacy {
            request = request.header(ACCEPT, LEGACY_ACCEPT);
        }

        let response = with_timeout(request, self.timeout)
            .send()
            .await
            .map_err(|e| Error::catalog(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = body_snippet(response).await;
            return Err(Error::catalog(format!("{url} answered HTTP {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::catalog(format!("failed to read response from {url}: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| Error::catalog(format!("malformed JSON from {url}: {e}")))
    }

    /// List clips. One request, no retry, no pagination.
    ///
    /// A Helix query naming a login costs one extra channel search request.
    pub async fn fetch(&self, query: &CatalogQuery) -> Result<Vec<ClipRecord>> {
        let (url, params, legacy) = match query {
            CatalogQuery::Helix {
                broadcaster,
                first,
                window,
            } => {
                let broadcaster_id = match broadcaster {
                    Broadcaster::Id(id) => id.clone(),
                    Broadcaster::Login(login) => self.lookup_broadcaster_id(login).await?,
                };
                let params = vec![
                    ("broadcaster_id", broadcaster_id),
                    ("first", (*first).min(HELIX_MAX_FIRST).to_string()),
                    ("started_at", to_rfc3339(&window.started_at)),
                    ("ended_at", to_rfc3339(&window.ended_at)),
                ];
                (self.endpoints.helix("clips"), params, false)
            }
            CatalogQuery::Top {
                channel,
                limit,
                period,
            } => {
                let params = vec![
                    ("channel", channel.clone()),
                    ("limit", limit.to_string()),
                    ("period", period.to_string()),
                ];
                (self.endpoints.top_clips_url.clone(), params, true)
            }
        };
        let mut body = self.get_json(&url, &params, legacy).await?;

        let key = query.list_key();
        let Some(Value::Array(entries)) = body.get_mut(key).map(Value::take) else {
            return Err(Error::catalog(format!(
                "response from {url} has no `{key}` array"
            )));
        };

        // An unusable record only matters if the selector would reach it, so it
        // is dropped from the listing instead of failing the run.
        let mut clips = Vec::with_capacity(entries.len());
        let mut skipped = 0usize;
        for (index, entry) in entries.into_iter().enumerate() {
            match ClipRecord::decode(entry) {
                Ok(clip) => clips.push(clip),
                Err(e) => {
                    skipped += 1;
                    warn!(index, error = %e, "Skipping unusable clip record");
                }
            }
        }

        info!(count = clips.len(), skipped, "Clip catalog fetched");
        Ok(clips)
    }

    /// Resolve a channel login to its broadcaster id via channel search.
    pub async fn lookup_broadcaster_id(&self, login: &str) -> Result<String> {
        let url = self.endpoints.helix("search/channels");
        let body = self
            .get_json(&url, &[("query", login.to_owned())], false)
            .await?;

        let entries = body
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::catalog(format!("response from {url} has no `data` array")))?;

        let id = entries
            .iter()
            .find(|entry| {
                entry
                    .get("broadcaster_login")
                    .and_then(Value::as_str)
                    .is_some_and(|l| l.eq_ignore_ascii_case(login))
            })
            .and_then(|entry| entry.get("id"))
            .and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| Error::catalog(format!("no channel with login `{login}`")))?;

        debug!(login = %login, broadcaster_id = %id, "Broadcaster resolved");
        Ok(id)
    }
}
