pub mod heroku;

use async_trait::async_trait;
use serde::Deserialize;

use crate::env_vars::EnvVarMap;
use crate::error::DeployResult;
use crate::settings::Addon;
use crate::target::PipelineStage;

/// Observed state of one dyno.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynoStatus {
    pub process_type: String,
    pub running: bool,
}

/// An app as listed for a team.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppSummary {
    pub name: String,
}

/// Operations the deploy workflow needs from the hosting platform.
///
/// Every call queries or mutates remote state directly; nothing is
/// cached between calls.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Whether the app exists. Any failure of the lookup, including
    /// "not found", reads as `false`.
    async fn app_exists(&self, app: &str) -> bool;

    /// Create the app shell and attach it to a pipeline stage.
    async fn create_app(
        &self,
        app: &str,
        team: &str,
        pipeline: &str,
        stage: PipelineStage,
    ) -> DeployResult<()>;

    async fn create_addon(&self, app: &str, addon: &Addon) -> DeployResult<()>;

    async fn get_env_var(&self, app: &str, name: &str) -> DeployResult<String>;

    async fn get_all_env_vars(&self, app: &str) -> DeployResult<EnvVarMap>;

    /// Merge `vars` into the app's configuration.
    async fn set_env_vars(&self, app: &str, vars: &EnvVarMap) -> DeployResult<()>;

    async fn unset_env_vars(&self, app: &str, names: &[String]) -> DeployResult<()>;

    /// Promote the latest pushed image of each process type.
    async fn release_container(&self, app: &str, process_types: &[String]) -> DeployResult<()>;

    /// Run a one-off command and return its output.
    async fn run(&self, app: &str, process_type: &str, command: &[String])
    -> DeployResult<String>;

    async fn list_dyno_statuses(&self, app: &str) -> DeployResult<Vec<DynoStatus>>;

    async fn scale_to_one(&self, app: &str, process_types: &[String]) -> DeployResult<()>;

    /// Scale to zero dynos, keeping the release in place.
    async fn scale_to_zero(&self, app: &str, process_types: &[String]) -> DeployResult<()>;

    async fn restart_process(&self, app: &str, process_type: &str) -> DeployResult<()>;

    async fn list_apps(&self, team: &str) -> DeployResult<Vec<AppSummary>>;

    /// Destroy an app. Implementations must refuse anything that is
    /// not a review app name.
    async fn destroy_app(&self, app: &str) -> DeployResult<()>;
}
