use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::env_vars::EnvVarMap;
use crate::error::DeployResult;
use crate::platform::Platform;

/// Canonical key holding the last deployed commit.
pub const COMMIT_SHA: &str = "COMMIT_SHA";

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^COMMIT_[0-9a-fA-F]{40}$").expect("static regex"));

/// What stamping an app found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StampOutcome {
    /// The app already carried the marker for this commit.
    pub previously_stamped: bool,
    /// Stale markers that were unset.
    pub removed: Vec<String>,
}

/// Marker key for a commit.
#[must_use]
pub fn marker_key(commit_sha: &str) -> String {
    format!("COMMIT_{commit_sha}")
}

/// Marker keys in `config` that belong to other commits.
#[must_use]
pub fn stale_markers(config: &EnvVarMap, commit_sha: &str) -> Vec<String> {
    let current = marker_key(commit_sha);
    config
        .keys()
        .filter(|key| **key != current && MARKER.is_match(key))
        .cloned()
        .collect()
}

/// Record `commit_sha` as the deployed commit of `app`.
///
/// Stale markers are unset first in one call. That cleanup is
/// best-effort: a failure is logged and the stamp still happens.
pub async fn set_commit_marker(
    platform: &dyn Platform,
    app: &str,
    commit_sha: &str,
) -> DeployResult<StampOutcome> {
    let config = platform.get_all_env_vars(app).await?;
    let key = marker_key(commit_sha);
    let previously_stamped = config.contains_key(&key);

    let mut removed = stale_markers(&config, commit_sha);
    if !removed.is_empty() {
        if let Err(e) = platform.unset_env_vars(app, &removed).await {
            warn!(app, error = %e, "could not unset stale commit markers");
            removed.clear();
        }
    }

    let mut stamp = EnvVarMap::new();
    stamp.insert(COMMIT_SHA.to_string(), commit_sha.to_string());
    stamp.insert(key, commit_sha.to_string());
    platform.set_env_vars(app, &stamp).await?;

    info!(app, commit = commit_sha, previously_stamped, "stamped commit");
    Ok(StampOutcome {
        previously_stamped,
        removed,
    })
}
