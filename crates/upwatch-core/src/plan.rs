use crate::error::{Result, UpwatchError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// UpgradePlan
// ---------------------------------------------------------------------------

/// A named, height-targeted upgrade declaration as written to
/// `upgrade-info.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePlan {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "height_from_number_or_string")]
    pub height: i64,
    #[serde(default)]
    pub info: String,
}

impl UpgradePlan {
    pub fn new(name: impl Into<String>, height: i64) -> Self {
        Self {
            name: name.into(),
            height,
            info: String::new(),
        }
    }

    /// Required values must be set: a non-empty name and a positive height.
    pub fn validate_basic(&self) -> Result<()> {
        let reason = if self.name.is_empty() {
            "name cannot be empty"
        } else if self.height <= 0 {
            "height must be greater than 0"
        } else {
            return Ok(());
        };
        Err(UpwatchError::PlanValidation {
            reason: reason.to_string(),
            plan: self.to_string(),
        })
    }
}

impl fmt::Display for UpgradePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Plan{{name: {:?}, height: {}, info: {:?}}}",
            self.name, self.height, self.info
        )
    }
}

// Protobuf-JSON encoders render int64 as a string; the daemon's own writer
// uses a number. Both appear in the wild.
fn height_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Height {
        Number(i64),
        Text(String),
    }

    match Height::deserialize(deserializer)? {
        Height::Number(n) => Ok(n),
        Height::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Read, decode and validate an upgrade plan file.
///
/// Unless `disable_recase` is set, the plan name is lower-cased so that later
/// comparisons are insensitive to operator casing mistakes.
pub fn read_plan_file(path: &Path, disable_recase: bool) -> Result<UpgradePlan> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(UpwatchError::PlanNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(UpwatchError::Io(e)),
    };

    if bytes.is_empty() {
        return Err(UpwatchError::EmptyPlanFile(path.to_path_buf()));
    }

    let mut plan: UpgradePlan =
        serde_json::from_slice(&bytes).map_err(|source| UpwatchError::PlanDecode {
            path: path.to_path_buf(),
            source,
        })?;

    plan.validate_basic()?;

    if !disable_recase {
        plan.name = plan.name.to_lowercase();
    }

    Ok(plan)
}

// ---------------------------------------------------------------------------
// UpgradeInfo
// ---------------------------------------------------------------------------

/// Structured form of a plan's `info` field:
/// `{"binaries": {"linux/amd64": "https://...", "any": "https://..."}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeInfo {
    #[serde(default)]
    pub binaries: BTreeMap<String, String>,
}

impl UpgradeInfo {
    pub fn parse(info: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(info.trim())
    }
}

/// Download URLs embedded in a plan's `info` payload, in iteration order.
///
/// A JSON object contributes its `binaries` values (sorted by platform key).
/// Anything else is scanned for whitespace-separated `http(s)://` tokens.
/// Never fails: an unrecognised payload yields no URLs.
pub fn binary_urls(info: &str) -> Vec<String> {
    let trimmed = info.trim();
    if trimmed.starts_with('{') {
        return match UpgradeInfo::parse(trimmed) {
            Ok(parsed) => parsed.binaries.into_values().collect(),
            Err(e) => {
                tracing::debug!(error = %e, "upgrade info is not a binaries document");
                Vec::new()
            }
        };
    }
    trimmed
        .split_whitespace()
        .filter(|tok| tok.starts_with("https://") || tok.starts_with("http://"))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("upgrade-info.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn reads_valid_plan() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{"name":"v2","height":120,"info":"{}"}"#);
        let plan = read_plan_file(&path, false).unwrap();
        assert_eq!(plan.name, "v2");
        assert_eq!(plan.height, 120);
        assert_eq!(plan.info, "{}");
    }

    #[test]
    fn recases_name_by_default() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{"name":"Upgrade-X","height":10}"#);
        assert_eq!(read_plan_file(&path, false).unwrap().name, "upgrade-x");
        assert_eq!(read_plan_file(&path, true).unwrap().name, "Upgrade-X");
    }

    #[test]
    fn accepts_string_height() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{"name":"v3","height":"77"}"#);
        assert_eq!(read_plan_file(&path, false).unwrap().height, 77);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_plan_file(&dir.path().join("nope.json"), false).unwrap_err();
        assert!(matches!(err, UpwatchError::PlanNotFound(_)));
    }

    #[test]
    fn empty_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "");
        let err = read_plan_file(&path, false).unwrap_err();
        assert!(matches!(err, UpwatchError::EmptyPlanFile(_)));
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "{not json");
        let err = read_plan_file(&path, false).unwrap_err();
        assert!(matches!(err, UpwatchError::PlanDecode { .. }));
        assert!(err.is_plan_error());
    }

    #[test]
    fn missing_name_or_height_fails_validation() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, r#"{"height":5}"#);
        let err = read_plan_file(&path, false).unwrap_err();
        assert!(err.to_string().contains("name cannot be empty"));

        let path = write(&dir, r#"{"name":"v2","height":0}"#);
        let err = read_plan_file(&path, false).unwrap_err();
        assert!(matches!(err, UpwatchError::PlanValidation { .. }));
        assert!(err.to_string().contains("height must be greater than 0"));
    }

    #[test]
    fn binary_urls_from_json_are_sorted_by_platform() {
        let info = r#"{"binaries":{
            "linux/arm64":"https://example.com/arm64",
            "darwin/amd64":"https://example.com/darwin"
        }}"#;
        assert_eq!(
            binary_urls(info),
            vec!["https://example.com/darwin", "https://example.com/arm64"]
        );
    }

    #[test]
    fn binary_urls_from_plain_text() {
        let info = "see https://a.example/x\nhttp://b.example/y and ftp://c";
        assert_eq!(
            binary_urls(info),
            vec!["https://a.example/x", "http://b.example/y"]
        );
    }

    #[test]
    fn binary_urls_tolerates_garbage() {
        assert!(binary_urls("{broken").is_empty());
        assert!(binary_urls("").is_empty());
    }
}
