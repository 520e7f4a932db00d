//! Current-height probe for the supervised daemon.
//!
//! The production probe runs `<daemon> status` and reads
//! `SyncInfo.latest_block_height` from its JSON output. Height `0` means
//! "unknown" to the watcher and never blocks an upgrade, which is what
//! [`FixedHeight::UNKNOWN`] reports without touching any subprocess.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::error::ProbeError;

/// Source of the daemon's current block height.
pub trait HeightProbe: Send {
    fn current_height(&self) -> Result<i64, ProbeError>;
}

// ---------------------------------------------------------------------------
// FixedHeight
// ---------------------------------------------------------------------------

/// A probe that always reports the same height. Used when height checks are
/// disabled and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeight(pub i64);

impl FixedHeight {
    pub const UNKNOWN: FixedHeight = FixedHeight(0);
}

impl HeightProbe for FixedHeight {
    fn current_height(&self) -> Result<i64, ProbeError> {
        Ok(self.0)
    }
}

// ---------------------------------------------------------------------------
// StatusCommandProbe
// ---------------------------------------------------------------------------

/// Runs the daemon binary with a `status` argument and parses its stdout.
#[derive(Debug, Clone)]
pub struct StatusCommandProbe {
    program: PathBuf,
    args: Vec<OsString>,
}

impl StatusCommandProbe {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self {
            program: bin.into(),
            args: Vec::new(),
        }
    }

    /// Run `program args... status` instead of `bin status`. Lets a wrapper
    /// (e.g. an interpreter and script) stand in for the daemon.
    pub fn with_command<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl HeightProbe for StatusCommandProbe {
    fn current_height(&self) -> Result<i64, ProbeError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("status")
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(500)
                .collect::<String>();
            return Err(ProbeError::Exit {
                code: output.status.code(),
                stderr,
            });
        }

        parse_status_output(&output.stdout)
    }
}

#[derive(Debug, Default, Deserialize)]
struct StatusResponse {
    #[serde(rename = "SyncInfo", alias = "sync_info", default)]
    sync_info: SyncInfo,
}

#[derive(Debug, Default, Deserialize)]
struct SyncInfo {
    #[serde(default)]
    latest_block_height: String,
}

/// Parse the JSON printed by `<daemon> status`.
pub fn parse_status_output(stdout: &[u8]) -> Result<i64, ProbeError> {
    let resp: StatusResponse = serde_json::from_slice(stdout)?;
    let height = resp.sync_info.latest_block_height.trim();
    if height.is_empty() {
        return Err(ProbeError::MissingField);
    }
    Ok(height.parse()?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
