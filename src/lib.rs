//! Harvester Core Library
//!
//! Crawls the paginated listing sections of a postings website (calls for
//! tenders, job offers), fetches every posting's detail page and attached
//! documents, extracts their text and recovers contact emails, then produces
//! one structured analysis per posting.
//!
//! # Architecture
//!
//! - [`crawl`] - HTTP boundary, politeness pacing, listing/detail crawlers and attachments
//! - [`extract`] - PDF, DOCX and legacy `.doc` text extraction
//! - [`email`] - Email recognition and normalization
//! - [`analysis`] - Payload merging, the model boundary and consolidation
//! - [`pipeline`] - Run driver with progress reporting and cancellation
//! - [`cache`] / [`db`] - Daily result cache in SQLite
//! - [`report`] - Run counters and aggregate statistics

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod cache;
pub mod config;
pub mod crawl;
pub mod db;
pub mod email;
pub mod extract;
pub mod pipeline;
pub mod posting;
pub mod report;
pub mod text;
pub mod user_agent;

// Re-export commonly used types
pub use analysis::{
    AnalysisModel, AnthropicModel, GeminiModel, ModelError, ModelOutcome, ModelProvider,
};
pub use cache::{CacheError, CacheKey, ResultCache};
pub use config::{
    DelayRange, ExtractionLimits, HarvestConfig, HttpSettings, PacingSettings, SiteProfile,
};
pub use crawl::{CrawlError, Crawler, FetchError, HttpClient, Pacer};
pub use db::{Database, DbError};
pub use email::recognize_emails;
pub use extract::{DocumentKind, ExtractedDocument, extract_document};
pub use pipeline::{CancelHandle, Harvester, NoProgress, ProgressObserver, RunReport, RunRequest};
pub use posting::{
    AnalysisResult, AnalysisSource, Attachment, AttachmentKind, HarvestedPosting, PostingRecord,
};
pub use report::{HarvestStatistics, RunStats};
