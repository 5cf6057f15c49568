//! CLI entry point for the harvester tool.

use std::fs;
use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use harvester_core::config::{FileConfig, load_config_file};
use harvester_core::{
    CacheKey, HarvestConfig, HarvestStatistics, HarvestedPosting, Harvester, ResultCache,
    RunReport, RunRequest,
};
use tracing::{debug, info, warn};

mod cli;
mod progress;

use cli::Args;
use progress::ProgressUi;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = load_config_file(args.config.as_deref())?;
    if let Some(path) = loaded.path.as_deref().filter(|_| loaded.config.is_some()) {
        info!(path = %path.display(), "config file loaded");
    }
    let file = loaded.config.unwrap_or_default();

    let config = file
        .apply(HarvestConfig::default())
        .with_concurrency(args.concurrency_or(file.concurrency));
    let request = RunRequest::new(
        args.section_or(file.section.as_deref()),
        args.pages,
        !args.no_attachments,
    );
    info!(
        section = %request.section,
        pages = request.pages,
        parse_attachments = request.parse_attachments,
        concurrency = config.effective_concurrency(),
        "Harvester starting"
    );

    let cache = if args.no_cache {
        None
    } else {
        ResultCache::open(&args.cache_db).await
    };
    let key = CacheKey::for_run(
        &request.section,
        request.pages,
        request.parse_attachments,
        Local::now().date_naive(),
    );

    let cached = match &cache {
        Some(cache) => cache.lookup(&key).await,
        None => None,
    };

    let postings = if let Some(postings) = cached {
        info!(postings = postings.len(), "using cached results from today");
        postings
    } else {
        let report = harvest(&args, &file, config, &request).await?;
        if report.cancelled {
            warn!("run cancelled, results are partial and not cached");
        } else if let Some(cache) = &cache {
            cache.store(&key, &report.postings).await;
        }
        report.postings
    };

    let statistics = HarvestStatistics::from_postings(&postings);
    if !args.quiet {
        eprintln!("\n{statistics}");
    }
    write_output(&args, &postings)?;
    Ok(())
}

async fn harvest(
    args: &Args,
    file: &FileConfig,
    config: HarvestConfig,
    request: &RunRequest,
) -> Result<RunReport> {
    let mut harvester = Harvester::new(config).context("Failed to build HTTP client")?;

    let provider = args.provider_or(file.provider);
    let model_name = args.model.as_deref().or(file.model.as_deref());
    match provider.model_from_env(model_name)? {
        Some(model) => {
            info!(%provider, model = model.name(), "model analysis enabled");
            harvester = harvester.with_model(model);
        }
        None => warn!(
            "{} not set, postings get the fallback analysis",
            provider.api_key_env()
        ),
    }

    let cancel = harvester.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight postings");
            cancel.cancel();
        }
    });

    let ui = ProgressUi::new(!args.quiet && io::stderr().is_terminal());
    let report = harvester.run(request, &ui).await;
    ui.finish();

    info!(
        attempted = report.stats.postings_attempted,
        succeeded = report.stats.postings_succeeded,
        attachments = report.stats.attachments_detected,
        parsed = report.stats.attachments_parsed,
        file_emails = report.stats.file_emails,
        "Harvest complete"
    );
    if !args.quiet {
        eprintln!("{}", report.stats);
    }

    Ok(report)
}

fn write_output(args: &Args, postings: &[HarvestedPosting]) -> Result<()> {
    let json = serde_json::to_string_pretty(postings).context("Failed to encode results")?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!(path = %path.display(), postings = postings.len(), "results written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
