use crate::output::print_json;
use crate::settings::ConfigArgs;
use anyhow::Result;
use std::path::Path;
use upwatch_core::plan;

pub fn run(args: &ConfigArgs, file: Option<&Path>, json: bool) -> Result<()> {
    // An explicit file needs no daemon home, but a config file still decides
    // recasing.
    let (path, disable_recase) = match file {
        Some(f) if args.config.is_none() => (f.to_path_buf(), args.disable_recase),
        Some(f) => (f.to_path_buf(), args.resolve()?.disable_recase),
        None => {
            let cfg = args.resolve()?;
            (cfg.upgrade_info_path(), cfg.disable_recase)
        }
    };

    let plan = plan::read_plan_file(&path, disable_recase)?;

    if json {
        return print_json(&plan);
    }

    println!("name:   {}", plan.name);
    println!("height: {}", plan.height);
    let urls = plan::binary_urls(&plan.info);
    if urls.is_empty() {
        if !plan.info.is_empty() {
            println!("info:   {}", plan.info);
        }
    } else {
        println!("binaries:");
        for url in urls {
            println!("  {url}");
        }
    }
    Ok(())
}
