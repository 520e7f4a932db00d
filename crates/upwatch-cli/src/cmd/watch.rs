use crate::output::print_json;
use crate::settings::{current_upgrade, ConfigArgs};
use anyhow::{Context, Result};
use upwatch_core::{MonitorOutcome, UpgradeWatcher};

pub fn run(args: &ConfigArgs, current: Option<&str>, json: bool) -> Result<()> {
    let cfg = args.resolve()?;
    let current = current_upgrade(&cfg, current)?;
    let watcher = UpgradeWatcher::from_config(&cfg).context("failed to create upgrade watcher")?;

    tracing::info!(
        path = %watcher.filename().display(),
        running = %current.name,
        poll_interval = ?cfg.poll_interval,
        "watching for upgrade plans"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut monitor = watcher.monitor(current);

        let outcome = tokio::select! {
            outcome = monitor.wait() => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };

        let watcher = monitor.finish().await?;
        match outcome {
            Some(MonitorOutcome::Ready) => {
                let plan = watcher.current_info();
                if json {
                    print_json(plan)?;
                } else {
                    println!("upgrade '{}' pending at height {}", plan.name, plan.height);
                }
            }
            Some(MonitorOutcome::Stopped) | None => {
                eprintln!("stopped before an upgrade was found");
            }
        }
        Ok::<_, anyhow::Error>(())
    })
}
