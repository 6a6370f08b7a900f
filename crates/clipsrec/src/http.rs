use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Client, Proxy};
use tracing::debug;

use crate::config::HttpConfig;
use crate::{Error, Result};

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build a proxy from a URL. Bare `host:port` values are treated as HTTP proxies.
fn build_proxy(url: &str) -> Result<Proxy> {
    let url = if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    };
    Proxy::all(&url).map_err(|e| Error::config(format!("invalid proxy URL `{url}`: {e}")))
}

/// Build the client shared by the token exchange, the catalog calls and all
/// clip downloads.
///
/// `request_timeout` is not applied here: it would cut long clip bodies
/// short. API calls apply it per request instead.
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    install_rustls_provider();

    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.connect_timeout);

    if config.pool_max_idle_per_host > 0 {
        builder = builder.pool_max_idle_per_host(config.pool_max_idle_per_host);
    }

    if let Some(proxy) = config.proxy.as_deref() {
        builder = builder.proxy(build_proxy(proxy)?);
    }

    Ok(builder.build()?)
}

/// Apply an API request timeout, skipping it when zero.
pub(crate) fn with_timeout(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> reqwest::RequestBuilder {
    if timeout > Duration::ZERO {
        request.timeout(timeout)
    } else {
        request
    }
}

/// Read a response body for diagnostics, truncated to keep log lines short.
pub(crate) async fn body_snippet(response: reqwest::Response) -> String {
    const MAX: usize = 256;
    match response.text().await {
        Ok(text) if text.len() > MAX => {
            let mut end = MAX;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &text[..end])
        }
        Ok(text) => text,
        Err(e) => format!("<unreadable body: {e}>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_proxy_accepts_bare_host() {
        assert!(build_proxy("127.0.0.1:8080").is_ok());
        assert!(build_proxy("socks5://127.0.0.1:1080").is_ok());
    }

    #[test]
    fn test_create_client_with_defaults() {
        assert!(create_client(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_create_client_rejects_bad_proxy() {
        let config = HttpConfig {
            proxy: Some("http://[::1".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            create_client(&config),
            Err(Error::Configuration(_))
        ));
    }
}
