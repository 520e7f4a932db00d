use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use upwatch_core::config::{
    self, Config, ENV_DISABLE_RECASE, ENV_HOME, ENV_NAME, ENV_POLL_INTERVAL,
    ENV_SKIP_HEIGHT_CHECK,
};
use upwatch_core::{FatalPolicy, UpgradePlan};

/// Daemon settings shared by every subcommand. Flags win over the YAML file.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// YAML config file (keys: home, name, poll_interval, disable_recase, ...)
    #[arg(long, global = true, env = "UPWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Daemon home directory
    #[arg(long, global = true, env = ENV_HOME)]
    pub home: Option<PathBuf>,

    /// Daemon binary name
    #[arg(long, global = true, env = ENV_NAME)]
    pub name: Option<String>,

    /// Poll interval (300ms, 2s, or bare milliseconds)
    #[arg(long, global = true, env = ENV_POLL_INTERVAL, value_parser = config::parse_poll_interval)]
    pub poll_interval: Option<Duration>,

    /// Keep upgrade names as written instead of lower-casing them
    #[arg(long, global = true, env = ENV_DISABLE_RECASE, value_parser = BoolishValueParser::new())]
    pub disable_recase: bool,

    /// Skip `<daemon> status`; the current height is treated as unknown
    #[arg(long, global = true, env = ENV_SKIP_HEIGHT_CHECK, value_parser = BoolishValueParser::new())]
    pub skip_height_check: bool,

    /// Return plan-file errors instead of aborting the process
    #[arg(long, global = true)]
    pub propagate_errors: bool,
}

impl ConfigArgs {
    pub fn resolve(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => {
                let Some(home) = &self.home else {
                    bail!("daemon home is not set: pass --home or set {ENV_HOME}");
                };
                Config::new(home, self.name.clone().unwrap_or_default())
            }
        };

        if let Some(home) = &self.home {
            cfg.home = home.clone();
        }
        if let Some(name) = &self.name {
            cfg.name = name.clone();
        }
        if let Some(interval) = self.poll_interval {
            cfg.poll_interval = interval;
        }
        if self.disable_recase {
            cfg.disable_recase = true;
        }
        if self.skip_height_check {
            cfg.skip_height_check = true;
        }
        if self.propagate_errors {
            cfg.fatal_policy = FatalPolicy::Propagate;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

/// The upgrade the running binary belongs to: `--current` if given, otherwise
/// the marker file under `cosmovisor/current`.
pub fn current_upgrade(cfg: &Config, explicit: Option<&str>) -> Result<UpgradePlan> {
    match explicit {
        Some(name) => Ok(UpgradePlan {
            name: name.to_string(),
            ..UpgradePlan::default()
        }),
        None => cfg
            .current_upgrade()
            .context("failed to read the running upgrade"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn flags_build_config() {
        let args = ConfigArgs {
            home: Some(PathBuf::from("/srv/node")),
            name: Some("appd".into()),
            poll_interval: Some(Duration::from_secs(1)),
            skip_height_check: true,
            propagate_errors: true,
            ..Default::default()
        };
        let cfg = args.resolve().unwrap();
        assert_eq!(cfg.home, PathBuf::from("/srv/node"));
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert!(cfg.skip_height_check);
        assert_eq!(cfg.fatal_policy, FatalPolicy::Propagate);
    }

    #[test]
    fn flags_override_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upwatch.yaml");
        std::fs::write(&path, "home: /srv/node\nname: appd\npoll_interval: 5s\n").unwrap();
        let args = ConfigArgs {
            config: Some(path),
            name: Some("otherd".into()),
            ..Default::default()
        };
        let cfg = args.resolve().unwrap();
        assert_eq!(cfg.name, "otherd");
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn missing_home_is_an_error() {
        let err = ConfigArgs::default().resolve().unwrap_err();
        assert!(err.to_string().contains(ENV_HOME));
    }

    #[test]
    fn explicit_current_upgrade_wins() {
        let cfg = Config::new("/nonexistent", "appd");
        assert_eq!(current_upgrade(&cfg, Some("v3")).unwrap().name, "v3");
        assert_eq!(current_upgrade(&cfg, None).unwrap().name, "");
    }
}
