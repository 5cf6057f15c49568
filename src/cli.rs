//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use harvester_core::ModelProvider;
use harvester_core::config::{DEFAULT_CONCURRENCY, MAX_PAGES, SECTION_TENDERS};

/// Default number of listing pages crawled.
pub const DEFAULT_PAGES: u32 = 5;

/// Harvest postings, their attached documents and contact emails.
///
/// Crawls the listing pages of one section, fetches every posting with its
/// PDF/DOCX/DOC attachments, recovers contact emails and writes one
/// structured record per posting as JSON.
#[derive(Parser, Debug)]
#[command(name = "harvester")]
#[command(author, version, about)]
pub struct Args {
    /// Listing section to crawl (e.g. appels-doffres, offres-demploi)
    #[arg(short, long)]
    pub section: Option<String>,

    /// Number of listing pages to crawl (1-50)
    #[arg(short, long, default_value_t = DEFAULT_PAGES, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_PAGES)))]
    pub pages: u32,

    /// Only read attachment metadata; do not download or parse documents
    #[arg(long)]
    pub no_attachments: bool,

    /// Postings processed concurrently (1-8)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=8))]
    pub concurrency: Option<u8>,

    /// Write the JSON results to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Result cache database path
    #[arg(long, default_value = "harvester-cache.db", conflicts_with = "no_cache")]
    pub cache_db: PathBuf,

    /// Always crawl, neither reading nor writing the result cache
    #[arg(long)]
    pub no_cache: bool,

    /// Completion API: anthropic (ANTHROPIC_API_KEY) or gemini (GEMINI_API_KEY)
    #[arg(long)]
    pub provider: Option<ModelProvider>,

    /// Model used for posting analysis (default depends on the provider)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Config file path (default: $XDG_CONFIG_HOME/harvester/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Section from the command line, else `fallback`, else calls for tenders.
    pub fn section_or(&self, fallback: Option<&str>) -> String {
        self.section
            .as_deref()
            .or(fallback)
            .unwrap_or(SECTION_TENDERS)
            .to_string()
    }

    /// Provider from the command line, else `fallback`, else Anthropic.
    pub fn provider_or(&self, fallback: Option<ModelProvider>) -> ModelProvider {
        self.provider.or(fallback).unwrap_or_default()
    }

    /// Concurrency from the command line, else `fallback`, else the default.
    pub fn concurrency_or(&self, fallback: Option<usize>) -> usize {
        self.concurrency
            .map(usize::from)
            .or(fallback)
            .unwrap_or(DEFAULT_CONCURRENCY)
    }
}
