//! `upwatch-core` — watches a daemon's `upgrade-info.json` for pending
//! upgrade plans.
//!
//! # Architecture
//!
//! ```text
//! Monitor (tokio task, interval ticks, cancel signal)
//!     │
//!     ▼
//! UpgradeWatcher::check_update   ← single-writer decision routine
//!     │
//!     ├── plan::read_plan_file    decode + validate + recase
//!     ├── version::version_and_repo_from_urls
//!     ├── callback::Notifier      "upgrade detected" / "height reached"
//!     └── probe::HeightProbe      `<daemon> status` → latest block height
//! ```

pub mod callback;
pub mod config;
pub mod error;
pub mod paths;
pub mod plan;
pub mod probe;
pub mod version;
pub mod watcher;

pub use callback::{CallbackDispatcher, CallbackEvent, ExternalTarget, Notifier};
pub use config::Config;
pub use error::{ProbeError, Result, UpwatchError};
pub use plan::{UpgradeInfo, UpgradePlan};
pub use probe::{FixedHeight, HeightProbe, StatusCommandProbe};
pub use watcher::{FatalPolicy, Monitor, MonitorOutcome, UpgradeWatcher, WatcherSnapshot};
