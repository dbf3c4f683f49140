use std::path::PathBuf;
use std::time::Duration;

use crate::geo::GeoPoint;
use crate::models::{TagMatching, PRESET_AREAS};

/// Application-level constants
pub const APP_NAME: &str = "PetTriage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generative Language REST endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Candidate models, highest priority first.
pub const DEFAULT_MODEL_CANDIDATES: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-1.5-flash",
];

/// Lightweight model for the daily tip.
pub const DEFAULT_TIP_MODEL: &str = "gemini-2.0-flash-lite";

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MATCH_CAP: usize = 5;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8710";
pub const DEFAULT_CATALOG_FILE: &str = "data/facilities.csv";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,pet_triage=debug,hyper=warn,reqwest=warn"
}

/// ~/PetTriage/ when a home directory is known.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got {value:?}")]
    InvalidValue {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} must list at least one model")]
    EmptyModelList(&'static str),
}

/// Everything the service reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` keeps the service up; triage then answers with the
    /// not-configured fallback.
    pub api_key: Option<String>,
    pub api_base: String,
    pub model_candidates: Vec<String>,
    pub tip_model: String,
    pub request_timeout: Duration,
    pub max_attempts: u32,
    pub catalog_path: PathBuf,
    pub radius_km: Option<f64>,
    /// `None` means unlimited.
    pub match_cap: Option<usize>,
    pub tag_matching: TagMatching,
    pub bind_addr: String,
    pub default_location: GeoPoint,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model_candidates: DEFAULT_MODEL_CANDIDATES.iter().map(|m| m.to_string()).collect(),
            tip_model: DEFAULT_TIP_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            catalog_path: PathBuf::from(DEFAULT_CATALOG_FILE),
            radius_km: None,
            match_cap: Some(DEFAULT_MATCH_CAP),
            tag_matching: TagMatching::Lenient,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            default_location: PRESET_AREAS[0].point(),
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.api_key = get("GOOGLE_API_KEY");

        if let Some(base) = get("PET_TRIAGE_API_BASE") {
            config.api_base = base.trim_end_matches('/').to_string();
        }

        if let Some(list) = get("PET_TRIAGE_MODELS") {
            let models: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
            if models.is_empty() {
                return Err(ConfigError::EmptyModelList("PET_TRIAGE_MODELS"));
            }
            config.model_candidates = models;
        }

        if let Some(model) = get("PET_TRIAGE_TIP_MODEL") {
            config.tip_model = model;
        }

        if let Some(raw) = get("PET_TRIAGE_TIMEOUT_SECS") {
            let secs = parse_positive::<u64>("PET_TRIAGE_TIMEOUT_SECS", &raw)?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = get("PET_TRIAGE_MAX_ATTEMPTS") {
            config.max_attempts = parse_positive::<u32>("PET_TRIAGE_MAX_ATTEMPTS", &raw)?;
        }

        config.catalog_path = match get("PET_TRIAGE_CATALOG") {
            Some(path) => PathBuf::from(path),
            None => default_catalog_path(),
        };

        if let Some(raw) = get("PET_TRIAGE_RADIUS_KM") {
            let radius = raw.parse::<f64>().ok().filter(|r| r.is_finite() && *r > 0.0);
            config.radius_km = Some(radius.ok_or(ConfigError::InvalidValue {
                var: "PET_TRIAGE_RADIUS_KM",
                expected: "a positive number of kilometres",
                value: raw,
            })?);
        }

        if let Some(raw) = get("PET_TRIAGE_MATCH_CAP") {
            let cap = raw.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
                var: "PET_TRIAGE_MATCH_CAP",
                expected: "a non-negative integer (0 = unlimited)",
                value: raw.clone(),
            })?;
            config.match_cap = (cap > 0).then_some(cap);
        }

        if let Some(raw) = get("PET_TRIAGE_STRICT_TAGS") {
            config.tag_matching = match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => TagMatching::Strict,
                "0" | "false" | "no" => TagMatching::Lenient,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "PET_TRIAGE_STRICT_TAGS",
                        expected: "true or false",
                        value: raw,
                    })
                }
            };
        }

        if let Some(addr) = get("PET_TRIAGE_BIND") {
            config.bind_addr = addr;
        }

        match (get("PET_TRIAGE_DEFAULT_LAT"), get("PET_TRIAGE_DEFAULT_LON")) {
            (Some(lat), Some(lon)) => {
                config.default_location =
                    GeoPoint::parse(&lat, &lon).map_err(|e| ConfigError::InvalidValue {
                        var: "PET_TRIAGE_DEFAULT_LAT/LON",
                        expected: "a valid coordinate pair",
                        value: e.to_string(),
                    })?;
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    var: "PET_TRIAGE_DEFAULT_LAT/LON",
                    expected: "both set or both unset",
                    value: "only one set".into(),
                })
            }
        }

        Ok(config)
    }
}

/// `data/facilities.csv` next to the working directory, else ~/PetTriage/.
fn default_catalog_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CATALOG_FILE);
    if local.exists() {
        return local;
    }
    app_data_dir()
        .map(|dir| dir.join("facilities.csv"))
        .unwrap_or(local)
}

fn parse_positive<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.parse::<T>()
        .ok()
        .filter(|v| *v > T::default())
        .ok_or_else(|| ConfigError::InvalidValue {
            var,
            expected: "a positive integer",
            value: raw.to_string(),
        })
}
