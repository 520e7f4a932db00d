use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpwatchError {
    #[error("upgrade plan file not found: {}", .0.display())]
    PlanNotFound(PathBuf),

    #[error("empty upgrade plan file: {}", .0.display())]
    EmptyPlanFile(PathBuf),

    #[error("failed to decode upgrade plan {}: {source}", path.display())]
    PlanDecode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid upgrade plan content: {reason}, got: {plan}")]
    PlanValidation { reason: String, plan: String },

    #[error("invalid path: {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("watcher task failed: {0}")]
    Runtime(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl UpwatchError {
    /// Errors caused by the content of the upgrade plan file itself. These are
    /// operator mistakes and are escalated by the watcher instead of retried.
    pub fn is_plan_error(&self) -> bool {
        matches!(
            self,
            UpwatchError::PlanNotFound(_)
                | UpwatchError::EmptyPlanFile(_)
                | UpwatchError::PlanDecode { .. }
                | UpwatchError::PlanValidation { .. }
        )
    }
}

/// Failures of the height probe. These never escape the watcher: any probe
/// failure means the current height is unknown.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run status command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("status command exited with code {code:?}: {stderr}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("status output is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("latest block height is empty")]
    MissingField,

    #[error("latest block height is not an integer: {0}")]
    InvalidHeight(#[from] std::num::ParseIntError),
}

pub type Result<T> = std::result::Result<T, UpwatchError>;
