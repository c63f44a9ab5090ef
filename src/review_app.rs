//! Naming rules for ephemeral per-pull-request review apps.
//!
//! Every destructive or data-seeding operation is gated on these
//! checks, so the pattern is fixed rather than configurable.

use std::sync::LazyLock;

use regex::Regex;

static REVIEW_APP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^runn-pr-(\d+)-(?:app|hasura)$").expect("static regex"));

/// Whether `app_name` is exactly a review app name
/// (`runn-pr-<digits>-app` or `runn-pr-<digits>-hasura`).
#[must_use]
pub fn is_review_app_name(app_name: &str) -> bool {
    REVIEW_APP.is_match(app_name)
}

/// The pull-request number embedded in a review app name.
#[must_use]
pub fn pull_request_number(app_name: &str) -> Option<u64> {
    REVIEW_APP
        .captures(app_name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Primary app name for a pull request.
#[must_use]
pub fn primary_app_name(pr: u64) -> String {
    format!("runn-pr-{pr}-app")
}

/// Gateway app name for a pull request.
#[must_use]
pub fn gateway_app_name(pr: u64) -> String {
    format!("runn-pr-{pr}-hasura")
}
