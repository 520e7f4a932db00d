use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Daemon layout constants
// ---------------------------------------------------------------------------

pub const DATA_DIR: &str = "data";
pub const COSMOVISOR_DIR: &str = "cosmovisor";
pub const CURRENT_LINK: &str = "current";
pub const GENESIS_DIR: &str = "genesis";
pub const BIN_DIR: &str = "bin";

pub const UPGRADE_INFO_FILE: &str = "upgrade-info.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<home>/data/upgrade-info.json` — written by the daemon when it halts for
/// an upgrade.
pub fn upgrade_info_path(home: &Path) -> PathBuf {
    home.join(DATA_DIR).join(UPGRADE_INFO_FILE)
}

pub fn cosmovisor_dir(home: &Path) -> PathBuf {
    home.join(COSMOVISOR_DIR)
}

pub fn current_dir(home: &Path) -> PathBuf {
    cosmovisor_dir(home).join(CURRENT_LINK)
}

pub fn genesis_dir(home: &Path) -> PathBuf {
    cosmovisor_dir(home).join(GENESIS_DIR)
}

/// Plan of the upgrade the running binary was installed for.
pub fn current_upgrade_path(home: &Path) -> PathBuf {
    current_dir(home).join(UPGRADE_INFO_FILE)
}

/// Binary the daemon is currently running. Falls back to the genesis binary
/// when no `current` link has been created yet.
pub fn current_bin(home: &Path, name: &str) -> PathBuf {
    let current = current_dir(home);
    if current.exists() {
        current.join(BIN_DIR).join(name)
    } else {
        genesis_dir(home).join(BIN_DIR).join(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn path_helpers() {
        let home = Path::new("/tmp/node");
        assert_eq!(
            upgrade_info_path(home),
            PathBuf::from("/tmp/node/data/upgrade-info.json")
        );
        assert_eq!(
            current_upgrade_path(home),
            PathBuf::from("/tmp/node/cosmovisor/current/upgrade-info.json")
        );
    }

    #[test]
    fn current_bin_falls_back_to_genesis() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            current_bin(dir.path(), "appd"),
            dir.path().join("cosmovisor/genesis/bin/appd")
        );
    }

    #[test]
    fn current_bin_prefers_current_link() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cosmovisor/current/bin")).unwrap();
        assert_eq!(
            current_bin(dir.path(), "appd"),
            dir.path().join("cosmovisor/current/bin/appd")
        );
    }
}
