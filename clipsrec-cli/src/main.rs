mod cli;
mod logging;
mod output;

use std::process;

use anyhow::Result;
use clap::Parser;
use clipsrec_engine::ClipJob;
use mimalloc::MiMalloc;
use tracing::{debug, error};

use crate::cli::{Args, OutputFormat};
use crate::logging::init_logging;
use crate::output::{format_error, format_report};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let format = args.format;

    if let Err(e) = init_logging(args.verbose, args.quiet, args.log_json) {
        eprintln!("{e}");
    }

    if let Err(e) = run(args).await {
        let stage = e
            .downcast_ref::<clipsrec_engine::Error>()
            .map(clipsrec_engine::Error::stage);
        error!(stage = stage.unwrap_or("startup"), "Clip job failed: {e:#}");

        let message = format_error(&format!("{e:#}"), stage, format);
        match format {
            OutputFormat::Json => println!("{message}"),
            OutputFormat::Pretty => eprintln!("{message}"),
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.run_config()?;
    debug!(?config, "Configuration loaded");

    let job = ClipJob::new(config)?;
    let report = job.run().await?;

    println!("{}", format_report(&report, args.format)?.trim_end());
    Ok(())
}
