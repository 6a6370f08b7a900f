use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_DIRECTIVES: &str = "clipsrec=info,clipsrec_engine=info";

/// Pick the filter directives. `RUST_LOG` wins unless a flag asks otherwise.
fn directives(verbose: u8, quiet: bool) -> Option<&'static str> {
    match (quiet, verbose) {
        (true, _) => Some("warn"),
        (false, 0) => None,
        (false, 1) => Some("clipsrec=debug,clipsrec_engine=debug"),
        (false, _) => Some("clipsrec=trace,clipsrec_engine=trace"),
    }
}

pub fn init_logging(verbose: u8, quiet: bool, json: bool) -> Result<()> {
    let filter = match directives(verbose, quiet) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(verbose > 0)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    result.map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        assert_eq!(directives(0, false), None);
        assert_eq!(directives(3, true), Some("warn"));
        assert!(directives(1, false).unwrap().contains("debug"));
        assert!(directives(2, false).unwrap().contains("trace"));
    }
}
