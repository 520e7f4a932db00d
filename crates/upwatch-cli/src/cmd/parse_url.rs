use crate::output::print_json;
use anyhow::Result;
use serde::Serialize;
use upwatch_core::version;

#[derive(Serialize)]
struct Release {
    repo: String,
    version: String,
}

pub fn run(urls: &[String], json: bool) -> Result<()> {
    let (repo, version) = version::version_and_repo_from_urls(urls);

    if json {
        return print_json(&Release { repo, version });
    }

    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    println!("repo:    {}", or_dash(&repo));
    println!("version: {}", or_dash(&version));
    Ok(())
}
