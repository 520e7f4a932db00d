use crate::error::{Result, UpwatchError};
use crate::paths;
use crate::plan::{self, UpgradePlan};
use crate::watcher::FatalPolicy;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Environment variables
// ---------------------------------------------------------------------------

pub const ENV_HOME: &str = "DAEMON_HOME";
pub const ENV_NAME: &str = "DAEMON_NAME";
pub const ENV_POLL_INTERVAL: &str = "DAEMON_POLL_INTERVAL";
pub const ENV_DISABLE_RECASE: &str = "COSMOVISOR_DISABLE_RECASE";
pub const ENV_SKIP_HEIGHT_CHECK: &str = "UPWATCH_SKIP_HEIGHT_CHECK";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(300);

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Watcher configuration. Loaded from YAML and/or assembled by the CLI from
/// flags and environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Daemon home directory (`DAEMON_HOME`).
    pub home: PathBuf,
    /// Daemon binary name (`DAEMON_NAME`).
    pub name: String,
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "poll_interval_from_yaml"
    )]
    pub poll_interval: Duration,
    #[serde(default)]
    pub disable_recase: bool,
    /// Report height 0 instead of running `<daemon> status`.
    #[serde(default)]
    pub skip_height_check: bool,
    #[serde(default)]
    pub fatal_policy: FatalPolicy,
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn poll_interval_from_yaml<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => Ok(Duration::from_millis(ms)),
        Raw::Text(s) => parse_poll_interval(&s).map_err(serde::de::Error::custom),
    }
}

impl Config {
    pub fn new(home: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            name: name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            disable_recase: false,
            skip_height_check: false,
            fatal_policy: FatalPolicy::default(),
        }
    }

    /// Load a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.home.as_os_str().is_empty() {
            return Err(UpwatchError::MissingConfig(ENV_HOME));
        }
        if self.name.is_empty() {
            return Err(UpwatchError::MissingConfig(ENV_NAME));
        }
        if self.poll_interval.is_zero() {
            return Err(UpwatchError::InvalidConfig(
                "poll interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn upgrade_info_path(&self) -> PathBuf {
        paths::upgrade_info_path(&self.home)
    }

    pub fn current_bin(&self) -> PathBuf {
        paths::current_bin(&self.home, &self.name)
    }

    /// The plan the running binary was installed for. A missing marker file
    /// means the genesis binary is running, reported as an empty plan.
    pub fn current_upgrade(&self) -> Result<UpgradePlan> {
        let path = paths::current_upgrade_path(&self.home);
        match plan::read_plan_file(&path, self.disable_recase) {
            Ok(p) => Ok(p),
            Err(UpwatchError::PlanNotFound(_)) => Ok(UpgradePlan::default()),
            Err(e) => Err(e),
        }
    }
}

/// Parse a poll interval: `500ms`, `2s`, `1m`, or a bare number of
/// milliseconds.
pub fn parse_poll_interval(raw: &str) -> std::result::Result<Duration, String> {
    let s = raw.trim();
    let (digits, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "ms"),
    };
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid poll interval '{raw}'"))?;
    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("poll interval '{raw}' is too large")),
        other => Err(format!("invalid poll interval unit '{other}' in '{raw}'")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
