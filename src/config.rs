//! Configuration Module
//!
//! Loads the TOML settings file, applies environment overrides and validates
//! everything into an immutable [`Settings`] before the server starts.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::cache::MAX_SOURCE_ID_LENGTH;
use crate::error::ConfigError;

/// Environment variable naming the settings file
pub const CONFIG_PATH_ENV: &str = "FRONTPAGE_CONFIG";
/// Settings file used when `FRONTPAGE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
/// URL template of the Freedom Forum front page archive
pub const DEFAULT_URL_TEMPLATE: &str = "https://cdn.freedomforum.org/dfp/pdf{day}/{slug}.pdf";

// == Validated Settings ==

/// Fractions of width/height removed from each edge before resizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSpec {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl CropSpec {
    pub const NONE: CropSpec = CropSpec {
        left: 0.0,
        right: 0.0,
        top: 0.0,
        bottom: 0.0,
    };
}

/// Rendering resolution and output bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub dpi: u32,
    pub max_width: u32,
    pub max_height: u32,
}

/// Daily refresh instant: a wall-clock time in an IANA timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSpec {
    pub time: NaiveTime,
    pub timezone: Tz,
}

/// Where a source's document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentLocation {
    /// A fixed URL, date placeholders still expanded if present
    Direct(String),
    /// The shared URL template with `{slug}` bound to this source
    Template { template: String, slug: String },
}

/// One configured newspaper.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub id: String,
    pub location: DocumentLocation,
    pub crop: Option<CropSpec>,
}

impl SourceSpec {
    /// Resolves the document URL for one candidate edition date.
    ///
    /// Supported placeholders: `{slug}`, `{day}`, `{dd}`, `{month}`, `{year}`, `{date}`.
    pub fn url_for(&self, date: NaiveDate) -> String {
        let pattern = match &self.location {
            DocumentLocation::Direct(url) => url.clone(),
            DocumentLocation::Template { template, slug } => template.replace("{slug}", slug),
        };

        pattern
            .replace("{date}", &date.format("%Y-%m-%d").to_string())
            .replace("{year}", &date.year().to_string())
            .replace("{month}", &format!("{:02}", date.month()))
            .replace("{dd}", &format!("{:02}", date.day()))
            .replace("{day}", &date.day().to_string())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebSettings {
    pub host: IpAddr,
    pub port: u16,
}

/// Fully validated, immutable server configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: Vec<SourceSpec>,
    pub web: WebSettings,
    pub image: ImageLimits,
    pub refresh: RefreshSpec,
    /// Number of candidate dates tried per source, today included
    pub max_lookback_days: u32,
    /// Upper bound on a single document retrieval
    pub fetch_timeout: Duration,
    /// Path or name of the `pdftoppm` executable
    pub renderer: String,
}

impl Settings {
    /// Loads settings from the file named by `FRONTPAGE_CONFIG` (or `config.toml`),
    /// then applies `FRONTPAGE_HOST` / `FRONTPAGE_PORT` overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut raw = RawConfig::load(Path::new(&path))?;

        if let Ok(host) = env::var("FRONTPAGE_HOST") {
            raw.web.host = host;
        }
        if let Ok(port) = env::var("FRONTPAGE_PORT") {
            raw.web.port = port
                .parse()
                .map_err(|_| ConfigError::invalid("FRONTPAGE_PORT", format!("`{port}` is not a number")))?;
        }

        raw.validate()
    }

    /// Parses and validates settings from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        raw.validate()
    }

    /// Ordered source identifiers, as used by the rotation.
    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id.clone()).collect()
    }
}

// == Raw File Schema ==

#[derive(Debug, Deserialize)]
struct RawCrop {
    left_edge: f64,
    right_edge: f64,
    top_edge: f64,
    bottom_edge: f64,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    newspaper: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    crop: Option<RawCrop>,
}

#[derive(Debug, Deserialize)]
struct RawWeb {
    host: String,
    port: i64,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    dpi: i64,
    max_width: i64,
    max_height: i64,
}

#[derive(Debug, Deserialize)]
struct RawScheduler {
    time: String,
    timezone: String,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    pdfs: Vec<RawSource>,
    web: RawWeb,
    image: RawImage,
    refresh_scheduler: RawScheduler,
    #[serde(default = "default_url_template")]
    url_template: String,
    #[serde(default = "default_lookback")]
    max_lookback_days: i64,
    #[serde(default = "default_fetch_timeout")]
    fetch_timeout_secs: i64,
    #[serde(default = "default_renderer")]
    renderer: String,
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

fn default_lookback() -> i64 {
    3
}

fn default_fetch_timeout() -> i64 {
    30
}

fn default_renderer() -> String {
    "pdftoppm".to_string()
}

impl RawConfig {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    fn validate(self) -> Result<Settings, ConfigError> {
        if self.pdfs.is_empty() {
            return Err(ConfigError::invalid("pdfs", "at least one source is required"));
        }

        let mut seen = HashSet::new();
        let mut sources = Vec::with_capacity(self.pdfs.len());
        for (i, raw) in self.pdfs.into_iter().enumerate() {
            let id = raw.newspaper.trim().to_string();
            if id.is_empty() {
                return Err(ConfigError::invalid(format!("pdfs[{i}].newspaper"), "must not be empty"));
            }
            if id.len() > MAX_SOURCE_ID_LENGTH {
                return Err(ConfigError::invalid(
                    format!("pdfs[{i}].newspaper"),
                    format!("longer than {MAX_SOURCE_ID_LENGTH} bytes"),
                ));
            }
            if id.chars().any(char::is_control) {
                return Err(ConfigError::invalid(
                    format!("pdfs[{i}].newspaper"),
                    "must not contain control characters",
                ));
            }
            if !seen.insert(id.clone()) {
                return Err(ConfigError::invalid(
                    format!("pdfs[{i}].newspaper"),
                    format!("duplicate source `{id}`"),
                ));
            }

            let crop = raw
                .crop
                .map(|c| validate_crop(&format!("pdfs[{i}].crop"), &c))
                .transpose()?;

            let location = match raw.url {
                Some(url) if url.trim().is_empty() => {
                    return Err(ConfigError::invalid(format!("pdfs[{i}].url"), "must not be empty"));
                }
                Some(url) => DocumentLocation::Direct(url),
                None => {
                    if !self.url_template.contains("{slug}") {
                        return Err(ConfigError::invalid(
                            "url_template",
                            "must contain `{slug}` when a source has no explicit url",
                        ));
                    }
                    DocumentLocation::Template {
                        template: self.url_template.clone(),
                        slug: id.clone(),
                    }
                }
            };

            sources.push(SourceSpec { id, location, crop });
        }

        let host = IpAddr::from_str(self.web.host.trim())
            .map_err(|_| ConfigError::invalid("web.host", format!("`{}` is not an IP address", self.web.host)))?;
        if !(1..=65535).contains(&self.web.port) {
            return Err(ConfigError::invalid("web.port", "Port must be in range 1 to 65535"));
        }

        let image = ImageLimits {
            dpi: positive("image.dpi", self.image.dpi)?,
            max_width: positive("image.max_width", self.image.max_width)?,
            max_height: positive("image.max_height", self.image.max_height)?,
        };

        let time = parse_time(&self.refresh_scheduler.time)?;
        let timezone = Tz::from_str(self.refresh_scheduler.timezone.trim()).map_err(|_| {
            ConfigError::invalid(
                "refresh_scheduler.timezone",
                "Invalid timezone string. Please consult the IANA timezone list for examples.",
            )
        })?;

        let max_lookback_days = positive("max_lookback_days", self.max_lookback_days)?;
        let fetch_timeout = Duration::from_secs(u64::from(positive(
            "fetch_timeout_secs",
            self.fetch_timeout_secs,
        )?));

        Ok(Settings {
            sources,
            web: WebSettings {
                host,
                port: self.web.port as u16,
            },
            image,
            refresh: RefreshSpec { time, timezone },
            max_lookback_days,
            fetch_timeout,
            renderer: self.renderer,
        })
    }
}

fn validate_crop(field: &str, raw: &RawCrop) -> Result<CropSpec, ConfigError> {
    let edges = [
        ("left_edge", raw.left_edge),
        ("right_edge", raw.right_edge),
        ("top_edge", raw.top_edge),
        ("bottom_edge", raw.bottom_edge),
    ];
    for (name, value) in edges {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::invalid(
                format!("{field}.{name}"),
                format!("{value} is outside [0.0, 1.0]"),
            ));
        }
    }

    Ok(CropSpec {
        left: raw.left_edge,
        right: raw.right_edge,
        top: raw.top_edge,
        bottom: raw.bottom_edge,
    })
}

fn positive(field: &str, value: i64) -> Result<u32, ConfigError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| ConfigError::invalid(field, format!("{value} is not a positive integer")))
}

/// Parses a strict `HH:MM` wall-clock time.
pub fn parse_time(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ConfigError::invalid("refresh_scheduler.time", "Time must be in format '%H:%M'"))
}
