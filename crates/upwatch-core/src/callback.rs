//! Best-effort upgrade notifications to an external operations API.
//!
//! Two endpoints are derived from `CALLBACK_API`, `NODE_ID` and
//! `DEPLOYMENT_ID`:
//!
//! ```text
//! <CALLBACK_API>/internal/cosmos/<NODE_ID>/<DEPLOYMENT_ID>/cosmos_notify_upgrade
//! <CALLBACK_API>/internal/cosmos/<NODE_ID>/<DEPLOYMENT_ID>/cosmos_upgrade_height_reached
//! ```
//!
//! Delivery is at-most-once: failures are logged and dropped.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::plan::UpgradePlan;

pub const ENV_CALLBACK_API: &str = "CALLBACK_API";
pub const ENV_NODE_ID: &str = "NODE_ID";
pub const ENV_DEPLOYMENT_ID: &str = "DEPLOYMENT_ID";

pub const NOTIFY_UPGRADE_SUFFIX: &str = "cosmos_notify_upgrade";
pub const HEIGHT_REACHED_SUFFIX: &str = "cosmos_upgrade_height_reached";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// CallbackEvent
// ---------------------------------------------------------------------------

/// Body of both callback requests. Built fresh for every detected plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackEvent {
    pub name: String,
    pub version: String,
    pub repo: String,
    pub info: String,
    pub height: i64,
}

impl CallbackEvent {
    pub fn new(plan: &UpgradePlan, repo: String, version: String) -> Self {
        Self {
            name: plan.name.clone(),
            version,
            repo,
            info: plan.info.clone(),
            height: plan.height,
        }
    }
}

// ---------------------------------------------------------------------------
// ExternalTarget
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalTarget {
    pub base_url: String,
    pub node_id: String,
    pub deployment_id: String,
}

impl ExternalTarget {
    /// Read the target from the process environment. Unset variables are
    /// treated as empty strings.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).unwrap_or_default();
        Self {
            base_url: var(ENV_CALLBACK_API),
            node_id: var(ENV_NODE_ID),
            deployment_id: var(ENV_DEPLOYMENT_ID),
        }
    }

    pub fn url(&self, suffix: &str) -> String {
        format!(
            "{}/internal/cosmos/{}/{}/{}",
            self.base_url, self.node_id, self.deployment_id, suffix
        )
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Receives the serialized [`CallbackEvent`] at the two notification points
/// of the watcher. Implementations must not fail the caller.
pub trait Notifier: Send {
    /// A new plan was observed, regardless of height.
    fn upgrade_detected(&self, payload: &[u8]);

    /// The plan's height (or the restart heuristic) was satisfied.
    fn height_reached(&self, payload: &[u8]);
}

/// Posts events to the external callback API over HTTP.
#[derive(Debug, Default)]
pub struct CallbackDispatcher {
    target: Option<ExternalTarget>,
    timeout: Option<Duration>,
    client: OnceLock<Client>,
}

impl CallbackDispatcher {
    /// Dispatcher that reads the target from the environment on every send.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Dispatcher with a fixed target.
    pub fn with_target(target: ExternalTarget) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn target(&self) -> ExternalTarget {
        self.target.clone().unwrap_or_else(ExternalTarget::from_env)
    }

    // The blocking client owns a runtime thread, so build it on first use
    // from the (blocking) caller rather than wherever the dispatcher is made.
    fn client(&self) -> &Client {
        self.client.get_or_init(|| {
            Client::builder()
                .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
                .build()
                .unwrap_or_else(|e| {
                    warn!(error = %e, "failed to build callback client, using defaults");
                    Client::new()
                })
        })
    }

    fn post(&self, suffix: &str, payload: &[u8]) {
        let url = self.target().url(suffix);
        info!(url = %url, "sending upgrade callback");

        let result = self
            .client()
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec())
            .send();

        match result {
            Ok(resp) if !resp.status().is_success() => {
                warn!(url = %url, status = %resp.status(), "upgrade callback returned non-success status");
            }
            Err(e) => {
                warn!(url = %url, error = %e, "failed to send upgrade callback");
            }
            Ok(_) => {}
        }
    }
}

impl Notifier for CallbackDispatcher {
    fn upgrade_detected(&self, payload: &[u8]) {
        self.post(NOTIFY_UPGRADE_SUFFIX, payload);
    }

    fn height_reached(&self, payload: &[u8]) {
        self.post(HEIGHT_REACHED_SUFFIX, payload);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
