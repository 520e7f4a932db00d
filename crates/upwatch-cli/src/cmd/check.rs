use crate::output::print_json;
use crate::settings::{current_upgrade, ConfigArgs};
use anyhow::Result;
use serde::Serialize;
use upwatch_core::watcher::WatcherSnapshot;
use upwatch_core::UpgradeWatcher;

#[derive(Serialize)]
struct CheckReport {
    ready: bool,
    state: WatcherSnapshot,
}

pub fn run(args: &ConfigArgs, current: Option<&str>, json: bool) -> Result<()> {
    let cfg = args.resolve()?;
    let current = current_upgrade(&cfg, current)?;
    let mut watcher = UpgradeWatcher::from_config(&cfg)?;

    let ready = watcher.check_update(&current)?;

    if json {
        return print_json(&CheckReport {
            ready,
            state: watcher.snapshot(),
        });
    }

    if ready {
        let plan = watcher.current_info();
        println!("ready: upgrade '{}' at height {}", plan.name, plan.height);
    } else {
        println!("not ready");
    }
    Ok(())
}
