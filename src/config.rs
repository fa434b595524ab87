//! Application-level configuration loading: pacing, reaper and fan-out tuning.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, DurationSeconds};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/arena.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_ARENA_CONFIG_PATH";
/// Environment variable holding the token required by the admin surface.
const ADMIN_TOKEN_ENV: &str = "ARENA_ADMIN_TOKEN";

const DEFAULT_REAPER_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(15 * 60);
const DEFAULT_PACING_GRACE: Duration = Duration::from_secs(2);
const DEFAULT_SCORE_ATTEMPTS: u32 = 5;
const DEFAULT_SCORE_BACKOFF: Duration = Duration::from_millis(20);
const DEFAULT_HUB_CAPACITY: usize = 32;
const DEFAULT_QUIZ_CATALOG: &str = "config/quizzes.json";

/// Settings of the orphaned-session sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperConfig {
    /// Time between two periodic sweeps.
    pub interval: Duration,
    /// Heartbeat age after which a non-finished session is abandoned.
    pub stale_after: Duration,
}

/// Settings of the server-side question timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    /// Added to the question countdown so late clients can still submit.
    pub grace: Duration,
}

/// Retry policy of the score compare-and-swap loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringConfig {
    /// Writes attempted before giving up with a conflict.
    pub max_attempts: u32,
    /// First backoff step; doubled after every conflict.
    pub retry_backoff: Duration,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Abandoned-session sweeper settings.
    pub reaper: ReaperConfig,
    /// Question timer settings.
    pub pacing: PacingConfig,
    /// Score write retry policy.
    pub scoring: ScoringConfig,
    /// Broadcast buffer of every per-session topic.
    pub hub_capacity: usize,
    /// JSON file read by the catalog quiz source.
    pub quiz_catalog: PathBuf,
    /// Token expected in `X-Admin-Token`; the admin surface is closed when unset.
    pub admin_token: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        reaper_interval = ?config.reaper.interval,
                        stale_after = ?config.reaper.stale_after,
                        "loaded arena config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.admin_token = env::var(ADMIN_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty());
        if config.admin_token.is_none() {
            warn!("{ADMIN_TOKEN_ENV} is not set; admin routes will reject every request");
        }
        config
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reaper: ReaperConfig {
                interval: DEFAULT_REAPER_INTERVAL,
                stale_after: DEFAULT_STALE_AFTER,
            },
            pacing: PacingConfig {
                grace: DEFAULT_PACING_GRACE,
            },
            scoring: ScoringConfig {
                max_attempts: DEFAULT_SCORE_ATTEMPTS,
                retry_backoff: DEFAULT_SCORE_BACKOFF,
            },
            hub_capacity: DEFAULT_HUB_CAPACITY,
            quiz_catalog: PathBuf::from(DEFAULT_QUIZ_CATALOG),
            admin_token: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    reaper: RawReaper,
    pacing: RawPacing,
    scoring: RawScoring,
    hub_capacity: Option<usize>,
    quiz_catalog: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawReaper {
    #[serde(with = "serde_with::As::<Option<DurationSeconds<u64>>>")]
    interval_seconds: Option<Duration>,
    #[serde(with = "serde_with::As::<Option<DurationSeconds<u64>>>")]
    stale_after_seconds: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPacing {
    #[serde(with = "serde_with::As::<Option<DurationMilliSeconds<u64>>>")]
    grace_ms: Option<Duration>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawScoring {
    max_attempts: Option<u32>,
    #[serde(with = "serde_with::As::<Option<DurationMilliSeconds<u64>>>")]
    retry_backoff_ms: Option<Duration>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            reaper: ReaperConfig {
                interval: value
                    .reaper
                    .interval_seconds
                    .filter(|interval| !interval.is_zero())
                    .unwrap_or(defaults.reaper.interval),
                stale_after: value
                    .reaper
                    .stale_after_seconds
                    .unwrap_or(defaults.reaper.stale_after),
            },
            pacing: PacingConfig {
                grace: value.pacing.grace_ms.unwrap_or(defaults.pacing.grace),
            },
            scoring: ScoringConfig {
                max_attempts: value
                    .scoring
                    .max_attempts
                    .filter(|attempts| *attempts > 0)
                    .unwrap_or(defaults.scoring.max_attempts),
                retry_backoff: value
                    .scoring
                    .retry_backoff_ms
                    .unwrap_or(defaults.scoring.retry_backoff),
            },
            hub_capacity: value
                .hub_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.hub_capacity),
            quiz_catalog: value.quiz_catalog.unwrap_or(defaults.quiz_catalog),
            admin_token: None,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
