//! Key = value configuration file for harvester defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::{DelayRange, HarvestConfig, MAX_CONCURRENCY};
use crate::analysis::ModelProvider;

/// Values read from the configuration file. Unset keys keep built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Base URL of the listings site.
    pub base_url: Option<String>,
    /// Default listing section.
    pub section: Option<String>,
    /// Postings processed concurrently.
    pub concurrency: Option<usize>,
    /// Page fetch timeout in seconds.
    pub page_timeout_secs: Option<u64>,
    /// Attachment download timeout in seconds.
    pub attachment_timeout_secs: Option<u64>,
    /// Attachment size cap in megabytes.
    pub max_attachment_mb: Option<u64>,
    /// Listing delay lower bound in milliseconds.
    pub listing_delay_min_ms: Option<u64>,
    /// Listing delay upper bound in milliseconds.
    pub listing_delay_max_ms: Option<u64>,
    /// Detail delay lower bound in milliseconds.
    pub detail_delay_min_ms: Option<u64>,
    /// Detail delay upper bound in milliseconds.
    pub detail_delay_max_ms: Option<u64>,
    /// Legacy `.doc` converter program.
    pub legacy_converter: Option<String>,
    /// Completion API for the analysis stage.
    pub provider: Option<ModelProvider>,
    /// Model name for the analysis stage.
    pub model: Option<String>,
}

impl FileConfig {
    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range key.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(1..=MAX_CONCURRENCY).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `concurrency`: {concurrency}. Expected range: 1..={MAX_CONCURRENCY}"
            );
        }
        validate_timeout_secs("page_timeout_secs", self.page_timeout_secs)?;
        validate_timeout_secs("attachment_timeout_secs", self.attachment_timeout_secs)?;
        if let Some(mb) = self.max_attachment_mb
            && !(1..=100).contains(&mb)
        {
            bail!("Invalid config value for `max_attachment_mb`: {mb}. Expected range: 1..=100");
        }
        for (field, value) in [
            ("listing_delay_min_ms", self.listing_delay_min_ms),
            ("listing_delay_max_ms", self.listing_delay_max_ms),
            ("detail_delay_min_ms", self.detail_delay_min_ms),
            ("detail_delay_max_ms", self.detail_delay_max_ms),
        ] {
            if let Some(ms) = value
                && ms > 60_000
            {
                bail!("Invalid config value for `{field}`: {ms}. Expected range: 0..=60000");
            }
        }
        if let Some(base_url) = &self.base_url {
            url::Url::parse(base_url)
                .with_context(|| format!("Invalid config value for `base_url`: {base_url}"))?;
        }
        Ok(())
    }

    /// Applies the file values on top of `config`.
    #[must_use]
    pub fn apply(&self, mut config: HarvestConfig) -> HarvestConfig {
        if let Some(base_url) = &self.base_url {
            config.site = config.site.with_base_url(base_url);
        }
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(secs) = self.page_timeout_secs {
            config.http.page_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.attachment_timeout_secs {
            config.http.attachment_timeout = Duration::from_secs(secs);
        }
        if let Some(mb) = self.max_attachment_mb {
            config.limits.max_attachment_bytes = mb * 1024 * 1024;
            config.limits.max_docx_xml_bytes = 8 * config.limits.max_attachment_bytes;
        }
        config.pacing.listing_delay = merge_delay(
            config.pacing.listing_delay,
            self.listing_delay_min_ms,
            self.listing_delay_max_ms,
        );
        config.pacing.detail_delay = merge_delay(
            config.pacing.detail_delay,
            self.detail_delay_min_ms,
            self.detail_delay_max_ms,
        );
        if let Some(converter) = &self.legacy_converter {
            config.limits.legacy_converter.clone_from(converter);
        }
        config
    }
}

fn merge_delay(current: DelayRange, min_ms: Option<u64>, max_ms: Option<u64>) -> DelayRange {
    let min = min_ms.map_or(current.min, Duration::from_millis);
    let max = max_ms.map_or(current.max, Duration::from_millis);
    DelayRange::new(min, max)
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path the config was looked up at.
    pub path: Option<PathBuf>,
    /// Parsed values when the file exists.
    pub config: Option<FileConfig>,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/harvester/config.toml`
/// 2. `$HOME/.config/harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("harvester")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("harvester")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file at `explicit` or, when `None`, at the default path.
///
/// A missing default file is not an error; a missing explicit file is.
///
/// # Errors
///
/// Returns an error when the file cannot be read, parsed or validated.
pub fn load_config_file(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = read_config_file(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(p) if p.exists() => Some(read_config_file(p)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config = parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Parses `key = value` lines. `#` starts a comment; strings may be quoted.
///
/// # Errors
///
/// Returns an error for malformed lines, unknown keys or unparsable values.
pub fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };
        let key = raw_key.trim();
        let value = raw_value.trim();

        match key {
            "base_url" => cfg.base_url = Some(parse_string_literal(value)),
            "section" => cfg.section = Some(parse_string_literal(value)),
            "legacy_converter" => cfg.legacy_converter = Some(parse_string_literal(value)),
            "model" => cfg.model = Some(parse_string_literal(value)),
            "provider" => {
                let provider = parse_string_literal(value)
                    .parse::<ModelProvider>()
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("Invalid `provider` value on line {line_no}"))?;
                cfg.provider = Some(provider);
            }
            "concurrency" => {
                let parsed = parse_integer(value)
                    .with_context(|| format!("Invalid `concurrency` value on line {line_no}"))?;
                cfg.concurrency = Some(usize::try_from(parsed)?);
            }
            "page_timeout_secs" => {
                cfg.page_timeout_secs = Some(parse_integer(value).with_context(|| {
                    format!("Invalid `page_timeout_secs` value on line {line_no}")
                })?);
            }
            "attachment_timeout_secs" => {
                cfg.attachment_timeout_secs = Some(parse_integer(value).with_context(|| {
                    format!("Invalid `attachment_timeout_secs` value on line {line_no}")
                })?);
            }
            "max_attachment_mb" => {
                cfg.max_attachment_mb = Some(parse_integer(value).with_context(|| {
                    format!("Invalid `max_attachment_mb` value on line {line_no}")
                })?);
            }
            "listing_delay_min_ms" => {
                cfg.listing_delay_min_ms = Some(parse_integer(value).with_context(|| {
                    format!("Invalid `listing_delay_min_ms` value on line {line_no}")
                })?);
            }
            "listing_delay_max_ms" => {
                cfg.listing_delay_max_ms = Some(parse_integer(value).with_context(|| {
                    format!("Invalid `listing_delay_max_ms` value on line {line_no}")
                })?);
            }
            "detail_delay_min_ms" => {
                cfg.detail_delay_min_ms = Some(parse_integer(value).with_context(|| {
                    format!("Invalid `detail_delay_min_ms` value on line {line_no}")
                })?);
            }
            "detail_delay_max_ms" => {
                cfg.detail_delay_max_ms = Some(parse_integer(value).with_context(|| {
                    format!("Invalid `detail_delay_max_ms` value on line {line_no}")
                })?);
            }
            other => bail!("Unknown config key `{other}` on line {line_no}"),
        }
    }
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_quotes = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

fn parse_integer(value: &str) -> Result<u64> {
    value
        .replace('_', "")
        .parse::<u64>()
        .with_context(|| format!("expected a non-negative integer, got `{value}`"))
}
