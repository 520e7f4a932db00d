use upwatch_core::callback::{ENV_CALLBACK_API, ENV_DEPLOYMENT_ID, ENV_NODE_ID};
use upwatch_core::config::{
    ENV_DISABLE_RECASE, ENV_HOME, ENV_NAME, ENV_POLL_INTERVAL, ENV_SKIP_HEIGHT_CHECK,
};

pub const DOCS_URL: &str = "https://docs.cosmos.network/main/tooling/cosmovisor";

/// Long help appended to `upwatch --help`.
pub fn help_text() -> String {
    format!(
        "Upwatch polls a daemon's upgrade-info.json for pending upgrade plans and reports
when the running binary has to be replaced. It follows the Cosmovisor directory
layout; see {DOCS_URL}.

Environment variables:
  {ENV_HOME:<26} daemon home directory (watches <home>/data/upgrade-info.json)
  {ENV_NAME:<26} daemon binary name, queried with `<name> status` for the height
  {ENV_POLL_INTERVAL:<26} poll interval: 300ms (default), 2s, or bare milliseconds
  {ENV_DISABLE_RECASE:<26} keep upgrade names as written instead of lower-casing
  {ENV_SKIP_HEIGHT_CHECK:<26} do not run the status command; height is unknown
  {ENV_CALLBACK_API:<26} base URL of the upgrade callback API
  {ENV_NODE_ID:<26} node identifier used in callback URLs
  {ENV_DEPLOYMENT_ID:<26} deployment identifier used in callback URLs
"
    )
}
