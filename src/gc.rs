use std::collections::HashSet;

use futures::future::try_join_all;
use tracing::info;

use crate::error::DeployResult;
use crate::platform::Platform;
use crate::review_app;
use crate::source_control::SourceControl;

/// Review apps kept and destroyed by a collection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub kept: Vec<String>,
    pub destroyed: Vec<String>,
}

/// Destroy every review app of `team` whose pull request is no
/// longer open. Apps that are not review apps are never touched.
pub async fn collect_review_apps(
    platform: &dyn Platform,
    source_control: &dyn SourceControl,
    team: &str,
) -> DeployResult<CollectReport> {
    let open: HashSet<u64> = source_control
        .list_open_pull_requests()
        .await?
        .into_iter()
        .map(|pr| pr.number)
        .collect();

    let apps = platform.list_apps(team).await?;

    let mut report = CollectReport::default();
    for app in apps {
        let Some(number) = review_app::pull_request_number(&app.name) else {
            continue;
        };
        if open.contains(&number) {
            info!(app = %app.name, pr = number, "pull request still open, keeping");
            report.kept.push(app.name);
        } else {
            info!(app = %app.name, pr = number, "pull request closed, destroying");
            report.destroyed.push(app.name);
        }
    }

    try_join_all(report.destroyed.iter().map(|name| platform.destroy_app(name))).await?;

    Ok(report)
}
