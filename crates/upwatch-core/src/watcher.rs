//! Upgrade-plan file watcher.
//!
//! [`UpgradeWatcher::check_update`] is the single decision routine: it stats
//! the watched file, decodes a fresh plan, fires callbacks, gates on the
//! daemon's height and decides whether the plan is new. [`Monitor`] runs it
//! on a timer in one background task and reports readiness exactly once per
//! arm.
//!
//! ```text
//! Idle ──monitor()──▶ Polling ──check_update()=true──▶ Ready
//!                       │                               │
//!                       └──stop()──▶ Idle   finish()+monitor() re-arms
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::callback::{CallbackDispatcher, CallbackEvent, Notifier};
use crate::config::Config;
use crate::error::{Result, UpwatchError};
use crate::plan::{self, UpgradePlan};
use crate::probe::{FixedHeight, HeightProbe, StatusCommandProbe};
use crate::version;

// ---------------------------------------------------------------------------
// FatalPolicy
// ---------------------------------------------------------------------------

/// What to do when the watched file exists but holds an unreadable or
/// invalid plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalPolicy {
    /// Log and abort the process.
    #[default]
    Abort,
    /// Return the error from `check_update` (and from [`Monitor::finish`]).
    Propagate,
}

// ---------------------------------------------------------------------------
// WatcherSnapshot
// ---------------------------------------------------------------------------

/// Immutable copy of the watcher state, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatcherSnapshot {
    pub filename: PathBuf,
    pub current_info: UpgradePlan,
    pub last_mod_time: Option<DateTime<Utc>>,
    pub needs_update: bool,
    pub initialized: bool,
}

// ---------------------------------------------------------------------------
// UpgradeWatcher
// ---------------------------------------------------------------------------

pub struct UpgradeWatcher {
    filename: PathBuf,
    interval: Duration,
    disable_recase: bool,
    fatal_policy: FatalPolicy,
    probe: Box<dyn HeightProbe>,
    notifier: Box<dyn Notifier>,

    current_info: UpgradePlan,
    last_mod_time: Option<SystemTime>,
    needs_update: bool,
    initialized: bool,
}

impl std::fmt::Debug for UpgradeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeWatcher")
            .field("filename", &self.filename)
            .field("interval", &self.interval)
            .field("current_info", &self.current_info)
            .field("needs_update", &self.needs_update)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl UpgradeWatcher {
    /// Watch `filename`, polling every `interval`.
    ///
    /// The parent directory of `filename` must already exist. The watcher
    /// starts with an unknown-height probe and callbacks targeted from the
    /// environment; use the `with_*` builders to replace them.
    pub fn new(filename: impl AsRef<Path>, interval: Duration) -> Result<Self> {
        let filename = filename.as_ref();
        if filename.as_os_str().is_empty() {
            return Err(UpwatchError::InvalidPath {
                path: PathBuf::new(),
                reason: "filename undefined".into(),
            });
        }
        if interval.is_zero() {
            return Err(UpwatchError::InvalidConfig(
                "poll interval must be greater than zero".into(),
            ));
        }

        let absolute = std::path::absolute(filename).map_err(|e| UpwatchError::InvalidPath {
            path: filename.to_path_buf(),
            reason: format!("must be a valid file path: {e}"),
        })?;

        let dir = filename.parent().unwrap_or(Path::new("."));
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        if !dir.is_dir() {
            return Err(UpwatchError::InvalidPath {
                path: dir.to_path_buf(),
                reason: "must be an existing directory".into(),
            });
        }

        Ok(Self {
            filename: absolute,
            interval,
            disable_recase: false,
            fatal_policy: FatalPolicy::default(),
            probe: Box::new(FixedHeight::UNKNOWN),
            notifier: Box::new(CallbackDispatcher::from_env()),
            current_info: UpgradePlan::default(),
            last_mod_time: None,
            needs_update: false,
            initialized: false,
        })
    }

    /// Watcher over the daemon layout described by `cfg`, probing height via
    /// `<current bin> status` unless height checks are disabled.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        cfg.validate()?;
        let watcher = Self::new(cfg.upgrade_info_path(), cfg.poll_interval)?
            .disable_recase(cfg.disable_recase)
            .fatal_policy(cfg.fatal_policy);

        if cfg.skip_height_check {
            return Ok(watcher);
        }
        Ok(watcher.with_probe(StatusCommandProbe::new(cfg.current_bin())))
    }

    pub fn with_probe(mut self, probe: impl HeightProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn disable_recase(mut self, disable: bool) -> Self {
        self.disable_recase = disable;
        self
    }

    pub fn fatal_policy(mut self, policy: FatalPolicy) -> Self {
        self.fatal_policy = policy;
        self
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// The most recently accepted plan.
    pub fn current_info(&self) -> &UpgradePlan {
        &self.current_info
    }

    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub fn snapshot(&self) -> WatcherSnapshot {
        WatcherSnapshot {
            filename: self.filename.clone(),
            current_info: self.current_info.clone(),
            last_mod_time: self.last_mod_time.map(DateTime::<Utc>::from),
            needs_update: self.needs_update,
            initialized: self.initialized,
        }
    }

    /// Decide whether the watched file declares an upgrade that still has to
    /// be acted on. `current` is the upgrade the running binary belongs to.
    ///
    /// Returns `Ok(false)` for every transient condition (no file, unchanged
    /// file, height not reached). An invalid plan file is escalated according
    /// to the [`FatalPolicy`].
    pub fn check_update(&mut self, current: &UpgradePlan) -> Result<bool> {
        if self.needs_update {
            return Ok(true);
        }

        let modified = match std::fs::metadata(&self.filename).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => return Ok(false),
        };

        if self.last_mod_time.is_some_and(|last| modified <= last) {
            return Ok(false);
        }

        let info = match plan::read_plan_file(&self.filename, self.disable_recase) {
            Ok(p) => p,
            Err(e) => return self.escalate(e),
        };

        let urls = plan::binary_urls(&info.info);
        let (repo, version) = version::version_and_repo_from_urls(&urls);
        let event = CallbackEvent::new(&info, repo, version);

        // The same bytes are reused for the height-reached notice, even if
        // serialization failed and they are empty.
        let payload = match serde_json::to_vec(&event) {
            Ok(bytes) => {
                self.notifier.upgrade_detected(&bytes);
                bytes
            }
            Err(e) => {
                warn!(error = %e, "failed to serialize upgrade callback");
                Vec::new()
            }
        };

        let current_height = match self.probe.current_height() {
            Ok(h) => h,
            Err(e) => {
                debug!(error = %e, "current height unknown");
                0
            }
        };
        if current_height > 0 && current_height < info.height {
            debug!(
                current_height,
                upgrade_height = info.height,
                "upgrade height not reached"
            );
            return Ok(false);
        }

        if !self.initialized {
            self.initialized = true;
            self.current_info = info.clone();
            self.last_mod_time = Some(modified);

            // After a restart there is no record of whether the upgrade was
            // applied; a plan that differs from the running upgrade is taken
            // as still pending.
            if !names_match(&current.name, &self.current_info.name) {
                info!(
                    upgrade = %self.current_info.name,
                    running = %current.name,
                    "pending upgrade found on startup"
                );
                self.needs_update = true;
                self.notifier.height_reached(&payload);
                return Ok(true);
            }
        }

        if info.height > self.current_info.height {
            info!(upgrade = %info.name, height = info.height, "new upgrade plan accepted");
            self.current_info = info;
            self.last_mod_time = Some(modified);
            self.needs_update = true;
            self.notifier.height_reached(&payload);
            return Ok(true);
        }

        Ok(false)
    }

    fn escalate(&self, err: UpwatchError) -> Result<bool> {
        match self.fatal_policy {
            FatalPolicy::Abort => {
                error!(
                    path = %self.filename.display(),
                    error = %err,
                    "failed to parse upgrade info file"
                );
                std::process::abort();
            }
            FatalPolicy::Propagate => Err(err),
        }
    }

    /// Start polling in a background task. The watcher moves into the task
    /// and is handed back by [`Monitor::finish`], ready to be re-armed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn monitor(self, current: UpgradePlan) -> Monitor {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(self, current, ready_tx, cancel_rx));
        Monitor {
            ready: Some(ready_rx),
            outcome: None,
            cancel: cancel_tx,
            task,
        }
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

async fn poll_loop(
    mut watcher: UpgradeWatcher,
    current: UpgradePlan,
    ready_tx: oneshot::Sender<()>,
    mut cancel_rx: watch::Receiver<bool>,
) -> Result<UpgradeWatcher> {
    let mut ticker = tokio::time::interval(watcher.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; polling starts one interval in.
    ticker.tick().await;

    debug!(path = %watcher.filename.display(), "watching for upgrade plans");

    loop {
        tokio::select! {
            biased;
            _ = cancel_rx.changed() => {
                debug!("upgrade watcher stopped");
                return Ok(watcher);
            }
            _ = ticker.tick() => {}
        }

        let plan = current.clone();
        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = watcher.check_update(&plan);
            (watcher, outcome)
        })
        .await
        .map_err(|e| UpwatchError::Runtime(e.to_string()))?;
        watcher = returned;

        if outcome? {
            let _ = ready_tx.send(());
            return Ok(watcher);
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// How an armed watcher ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// A pending upgrade was found.
    Ready,
    /// The worker exited without reporting: stopped, or failed with an error
    /// that [`Monitor::finish`] returns.
    Stopped,
}

/// Handle to a polling watcher. Dropping it stops the worker.
#[derive(Debug)]
pub struct Monitor {
    ready: Option<oneshot::Receiver<()>>,
    outcome: Option<MonitorOutcome>,
    cancel: watch::Sender<bool>,
    task: JoinHandle<Result<UpgradeWatcher>>,
}

impl Monitor {
    /// Wait until the watcher reports ready or stops. Safe to call again; the
    /// first outcome is remembered.
    pub async fn wait(&mut self) -> MonitorOutcome {
        if let Some(outcome) = self.outcome {
            return outcome;
        }
        let outcome = match self.ready.take() {
            Some(rx) => match rx.await {
                Ok(()) => MonitorOutcome::Ready,
                Err(_) => MonitorOutcome::Stopped,
            },
            None => MonitorOutcome::Stopped,
        };
        self.outcome = Some(outcome);
        outcome
    }

    /// Ask the worker to stop. Observed between ticks; a status probe that is
    /// already running completes first.
    pub fn stop(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the worker (if still running) and take the watcher back.
    pub async fn finish(self) -> Result<UpgradeWatcher> {
        self.stop();
        self.task
            .await
            .map_err(|e| UpwatchError::Runtime(e.to_string()))?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
