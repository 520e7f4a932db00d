//! Best-effort extraction of a release tag and source repository from binary
//! download URLs. Both results may be empty; callers must tolerate that.

use regex::Regex;
use std::sync::OnceLock;

static VERSION_RE: OnceLock<Regex> = OnceLock::new();

fn version_re() -> &'static Regex {
    VERSION_RE.get_or_init(|| Regex::new(r"^[vV]\d+\.\d+\.\d+").unwrap())
}

/// Split `url` on `/` and return `(repo, version)`.
///
/// `repo` is everything up to and including the second segment after a
/// `github.com` host segment (host, org, repo name). It is empty when no
/// `github.com` segment precedes the version tag. `version` is the first
/// segment that looks like `v1.2.3...`; scanning stops there.
pub fn version_and_repo_from_url(url: &str) -> (String, String) {
    let mut github_idx: Option<usize> = None;
    let mut repo = String::new();
    let mut version = String::new();

    for (idx, segment) in url.split('/').enumerate() {
        if segment.eq_ignore_ascii_case("github.com") {
            github_idx = Some(idx);
        }
        let in_repo = match github_idx {
            None => true,
            Some(gh) => idx <= gh + 2,
        };
        if in_repo {
            if idx > 0 {
                repo.push('/');
            }
            repo.push_str(segment);
        }
        if version_re().is_match(segment) {
            version = segment.to_string();
            break;
        }
    }

    if github_idx.is_none() {
        repo.clear();
    }
    (repo, version)
}

/// Run the extractor over each URL in order and keep the first one that
/// yields a version, together with its repo. First match wins, not best match.
pub fn version_and_repo_from_urls<I, S>(urls: I) -> (String, String)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for url in urls {
        let (repo, version) = version_and_repo_from_url(url.as_ref());
        if !version.is_empty() {
            return (repo, version);
        }
    }
    (String::new(), String::new())
}
