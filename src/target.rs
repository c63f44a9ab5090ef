use std::fmt;

use crate::error::{DeployError, DeployResult};
use crate::review_app;
use crate::settings::Settings;

/// Pipeline stage an app is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Development,
    Staging,
    Production,
}

impl PipelineStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The CI event that triggered this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    Push { branch: String, sha: String },
    PullRequest { number: Option<u64>, head_sha: String },
}

impl TriggerEvent {
    /// Build an event from the runner's event name, ref, SHA, and
    /// (for pull requests) the event payload.
    pub fn from_github(
        event_name: &str,
        git_ref: &str,
        sha: &str,
        payload: Option<&serde_json::Value>,
    ) -> DeployResult<Self> {
        match event_name {
            "push" => Ok(Self::Push {
                branch: git_ref.to_string(),
                sha: sha.to_string(),
            }),
            "pull_request" | "pull_request_target" => {
                let number = payload.and_then(|p| {
                    p["number"]
                        .as_u64()
                        .or_else(|| p["pull_request"]["number"].as_u64())
                });
                let head_sha = payload
                    .and_then(|p| p["pull_request"]["head"]["sha"].as_str())
                    .unwrap_or(sha)
                    .to_string();
                Ok(Self::PullRequest { number, head_sha })
            }
            other => Err(DeployError::UnresolvableTarget(format!(
                "unhandled event \"{other}\""
            ))),
        }
    }
}

/// One deployment environment: a primary app and its gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub commit_sha: String,
    pub primary_app: String,
    pub primary_url: String,
    pub gateway_app: String,
    pub team: String,
    pub pipeline_name: String,
    pub pipeline_stage: PipelineStage,
    /// Only review app targets may be created on the fly.
    pub create_app_if_not_exists: bool,
    pub has_pull_request: bool,
}

/// Resolve the targets for an event.
///
/// A pull request maps to its own review app pair. A push maps to
/// every persistent environment registered for the branch.
pub fn resolve_targets(event: &TriggerEvent, settings: &Settings) -> DeployResult<Vec<Target>> {
    match event {
        TriggerEvent::PullRequest { number, head_sha } => {
            let number = number.ok_or_else(|| {
                DeployError::UnresolvableTarget(
                    "could not find the pull request number in the event".into(),
                )
            })?;
            let primary_app = review_app::primary_app_name(number);
            Ok(vec![Target {
                commit_sha: head_sha.clone(),
                primary_url: settings.app_url(&primary_app),
                gateway_app: review_app::gateway_app_name(number),
                primary_app,
                team: settings.team.clone(),
                pipeline_name: settings.pipeline_name.clone(),
                pipeline_stage: PipelineStage::Development,
                create_app_if_not_exists: true,
                has_pull_request: true,
            }])
        }
        TriggerEvent::Push { branch, sha } => {
            let targets: Vec<Target> = settings
                .targets_for_branch(branch)
                .into_iter()
                .map(|t| Target {
                    commit_sha: sha.clone(),
                    primary_app: t.primary_app.clone(),
                    primary_url: settings.app_url(&t.primary_app),
                    gateway_app: t.gateway_app.clone(),
                    team: settings.team.clone(),
                    pipeline_name: settings.pipeline_name.clone(),
                    pipeline_stage: t.stage,
                    create_app_if_not_exists: false,
                    has_pull_request: false,
                })
                .collect();

            if targets.is_empty() {
                return Err(DeployError::UnresolvableTarget(format!(
                    "unknown branch \"{branch}\""
                )));
            }
            Ok(targets)
        }
    }
}
