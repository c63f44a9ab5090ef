pub mod github;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::DeployResult;

/// An open pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub head_sha: String,
}

/// State of a deployment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentState {
    Error,
    Failure,
    Inactive,
    InProgress,
    Queued,
    Pending,
    Success,
}

impl DeploymentState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Failure => "failure",
            Self::Inactive => "inactive",
            Self::InProgress => "in_progress",
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Success => "success",
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The source-control host of the deployed repository.
#[async_trait]
pub trait SourceControl: Send + Sync {
    /// All open pull requests, across every page.
    async fn list_open_pull_requests(&self) -> DeployResult<Vec<PullRequest>>;

    /// Create a deployment record for `git_ref` and return its id.
    async fn create_deployment(&self, git_ref: &str, environment: &str) -> DeployResult<u64>;

    async fn set_deployment_status(
        &self,
        deployment_id: u64,
        git_ref: &str,
        state: DeploymentState,
        environment_url: &str,
    ) -> DeployResult<()>;
}
