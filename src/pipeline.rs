use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info};

use crate::env_vars::EnvVarMap;
use crate::error::DeployResult;
use crate::gc::{self, CollectReport};
use crate::platform::Platform;
use crate::reconcile::{self, Freshness};
use crate::registry::Registry;
use crate::release::{self, ImageRef, ReleaseReport};
use crate::settings::Settings;
use crate::source_control::{DeploymentState, SourceControl};
use crate::target::{self, Target, TriggerEvent};

/// Inputs of one deploy run.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub event: TriggerEvent,
    /// Baseline configuration for newly created primary apps.
    pub env_vars: EnvVarMap,
    pub images: Vec<ImageRef>,
}

/// Result of deploying one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub freshness: Freshness,
    pub release: ReleaseReport,
    pub deployment_id: Option<u64>,
}

#[derive(Debug)]
pub struct TargetOutcome {
    pub target: Target,
    pub result: DeployResult<TargetReport>,
}

#[derive(Debug)]
pub struct RunReport {
    pub collected: CollectReport,
    pub targets: Vec<TargetOutcome>,
}

impl RunReport {
    /// Outcomes of the targets that failed.
    pub fn failures(&self) -> impl Iterator<Item = &TargetOutcome> {
        self.targets.iter().filter(|t| t.result.is_err())
    }
}

/// Deployment pipeline: garbage collection, then every target of
/// the triggering event.
pub struct Pipeline {
    platform: Arc<dyn Platform>,
    registry: Arc<dyn Registry>,
    source_control: Arc<dyn SourceControl>,
    settings: Settings,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        platform: Arc<dyn Platform>,
        registry: Arc<dyn Registry>,
        source_control: Arc<dyn SourceControl>,
    ) -> Self {
        Self {
            platform,
            registry,
            source_control,
            settings: Settings::default(),
        }
    }

    #[must_use]
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Destroy review apps of closed pull requests.
    pub async fn collect(&self) -> DeployResult<CollectReport> {
        gc::collect_review_apps(
            self.platform.as_ref(),
            self.source_control.as_ref(),
            &self.settings.team,
        )
        .await
    }

    /// Run a full deploy pass.
    ///
    /// Target resolution and garbage collection failures abort the
    /// run. Targets are then deployed concurrently and a failing
    /// target does not stop the others; its error is kept in the
    /// returned report.
    pub async fn deploy(&self, request: &DeployRequest) -> DeployResult<RunReport> {
        let targets = target::resolve_targets(&request.event, &self.settings)?;
        let collected = self.collect().await?;

        info!(
            targets = ?targets.iter().map(|t| &t.primary_app).collect::<Vec<_>>(),
            "resolved deployment targets"
        );

        let outcomes = join_all(targets.into_iter().map(|target| async move {
            let result = self.deploy_target(&target, request).await;
            if let Err(e) = &result {
                error!(target = %target.primary_app, error = %e, "target failed");
            }
            TargetOutcome { target, result }
        }))
        .await;

        Ok(RunReport {
            collected,
            targets: outcomes,
        })
    }

    async fn deploy_target(
        &self,
        target: &Target,
        request: &DeployRequest,
    ) -> DeployResult<TargetReport> {
        let freshness = reconcile::create_app_environment(
            self.platform.as_ref(),
            &self.settings,
            target,
            &request.env_vars,
        )
        .await?;

        let release = release::release_target(
            self.platform.as_ref(),
            self.registry.as_ref(),
            &self.settings,
            target,
            freshness,
            &request.images,
        )
        .await?;

        let deployment_id = if target.has_pull_request {
            Some(self.record_deployment(target).await?)
        } else {
            None
        };

        Ok(TargetReport {
            freshness,
            release,
            deployment_id,
        })
    }

    async fn record_deployment(&self, target: &Target) -> DeployResult<u64> {
        let id = self
            .source_control
            .create_deployment(&target.commit_sha, &self.settings.deployment_environment)
            .await?;
        self.source_control
            .set_deployment_status(
                id,
                &target.commit_sha,
                DeploymentState::Success,
                &target.primary_url,
            )
            .await?;
        Ok(id)
    }
}
