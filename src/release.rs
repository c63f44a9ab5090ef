//! Publish images and bring a target's processes up to date.
//!
//! Per app, the order is fixed: every image is pushed, then the
//! release happens, then one-off commands run against it, then
//! processes are booted or restarted. A freshly created gateway is
//! held at zero dynos so it never serves against a database that
//! has not been migrated and seeded yet. An existing gateway that is
//! down is booted by any run that releases something.

use std::str::FromStr;

use futures::future::try_join_all;
use tracing::info;

use crate::commit_marker;
use crate::error::{DeployError, DeployResult};
use crate::platform::Platform;
use crate::reconcile::Freshness;
use crate::registry::Registry;
use crate::review_app;
use crate::settings::Settings;
use crate::target::Target;

/// Which app of a target an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppType {
    Primary,
    Gateway,
}

impl AppType {
    /// The app of `target` this type refers to.
    #[must_use]
    pub fn app_name(self, target: &Target) -> &str {
        match self {
            Self::Primary => &target.primary_app,
            Self::Gateway => &target.gateway_app,
        }
    }
}

impl FromStr for AppType {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "app" | "primary" => Ok(Self::Primary),
            "hasura" | "gateway" => Ok(Self::Gateway),
            other => Err(DeployError::UnsupportedAppType(other.to_string())),
        }
    }
}

/// A locally built image, named `<appType>_<processType>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub source: String,
    pub app_type: AppType,
    pub process_type: String,
}

impl ImageRef {
    /// Parse an image name such as `app_web` or `hasura_web:latest`.
    pub fn parse(source: &str) -> DeployResult<Self> {
        let name = source.split_once(':').map_or(source, |(name, _)| name);
        let (app_type, process_type) = name
            .split_once('_')
            .ok_or_else(|| DeployError::InvalidImageName(source.to_string()))?;
        if process_type.is_empty() {
            return Err(DeployError::InvalidImageName(source.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            app_type: app_type.parse()?,
            process_type: process_type.to_string(),
        })
    }
}

/// Parse a comma-separated image list. Blank entries are skipped.
pub fn parse_image_list(raw: &str) -> DeployResult<Vec<ImageRef>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ImageRef::parse)
        .collect()
}

/// What to do with one process type after a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessAction {
    Boot,
    Restart,
    Leave,
}

impl ProcessAction {
    /// Down processes are always booted. Running ones are only
    /// restarted when `restart_running` is set.
    #[must_use]
    pub const fn decide(running: bool, restart_running: bool) -> Self {
        match (running, restart_running) {
            (false, _) => Self::Boot,
            (true, true) => Self::Restart,
            (true, false) => Self::Leave,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessChange {
    pub app: String,
    pub process_type: String,
    pub action: ProcessAction,
}

/// Summary of one target's release.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub published: Vec<String>,
    pub database_changed: bool,
    pub seeded: bool,
    /// The gateway was left scaled to zero.
    pub gateway_held: bool,
    /// Apps that already carried this commit's marker.
    pub redeployed: Vec<String>,
    pub changes: Vec<ProcessChange>,
}

/// Publish `images` and release them to `target`.
pub async fn release_target(
    platform: &dyn Platform,
    registry: &dyn Registry,
    settings: &Settings,
    target: &Target,
    freshness: Freshness,
    images: &[ImageRef],
) -> DeployResult<ReleaseReport> {
    let published = try_join_all(
        images
            .iter()
            .map(|image| publish(registry, settings, target, image)),
    )
    .await?;

    let gateway_types = process_types(images, AppType::Gateway);
    let primary_types = process_types(images, AppType::Primary);
    let mut report = ReleaseReport {
        published,
        ..ReleaseReport::default()
    };

    if !gateway_types.is_empty() {
        let app = &target.gateway_app;
        platform.release_container(app, &gateway_types).await?;
        stamp(platform, app, &target.commit_sha, &mut report).await?;

        if freshness.gateway_created {
            info!(app, "holding new gateway at zero dynos");
            platform.scale_to_zero(app, &gateway_types).await?;
            report.gateway_held = true;
        }
    }

    if !primary_types.is_empty() {
        let app = &target.primary_app;
        platform.release_container(app, &primary_types).await?;
        stamp(platform, app, &target.commit_sha, &mut report).await?;

        let output = platform
            .run(app, &settings.one_off_process_type, &settings.migrate_command)
            .await?;
        report.database_changed = output.contains(&settings.migration_marker);
        info!(app, database_changed = report.database_changed, "migrated");

        if freshness.primary_created {
            if !review_app::is_review_app_name(app) {
                return Err(DeployError::UnsafeSeedRejected(app.clone()));
            }
            platform
                .run(app, &settings.one_off_process_type, &settings.seed_command)
                .await?;
            report.seeded = true;
            info!(app, "seeded");
        }

        let changes = converge_processes(
            platform,
            app,
            &settings.primary_process_types,
            report.database_changed,
        )
        .await?;
        report.changes.extend(changes);
    }

    // A new gateway has nothing to boot until a later run.
    let released_any = !gateway_types.is_empty() || !primary_types.is_empty();
    if released_any && !freshness.gateway_created {
        let changes = converge_processes(
            platform,
            &target.gateway_app,
            &settings.gateway_process_types,
            false,
        )
        .await?;
        report.changes.extend(changes);
    }

    Ok(report)
}

async fn stamp(
    platform: &dyn Platform,
    app: &str,
    commit_sha: &str,
    report: &mut ReleaseReport,
) -> DeployResult<()> {
    let outcome = commit_marker::set_commit_marker(platform, app, commit_sha).await?;
    if outcome.previously_stamped {
        info!(app, commit = commit_sha, "commit was already deployed here");
        report.redeployed.push(app.to_string());
    }
    Ok(())
}

async fn publish(
    registry: &dyn Registry,
    settings: &Settings,
    target: &Target,
    image: &ImageRef,
) -> DeployResult<String> {
    let app = image.app_type.app_name(target);
    let target_image = settings.registry_image(app, &image.process_type);

    registry.tag(&image.source, &target_image).await?;
    registry.push(&target_image).await?;
    Ok(target_image)
}

fn process_types(images: &[ImageRef], app_type: AppType) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for image in images.iter().filter(|i| i.app_type == app_type) {
        if !types.contains(&image.process_type) {
            types.push(image.process_type.clone());
        }
    }
    types
}

/// Boot every declared process type that is down, and restart the
/// running ones when `restart_running` is set.
pub async fn converge_processes(
    platform: &dyn Platform,
    app: &str,
    declared: &[String],
    restart_running: bool,
) -> DeployResult<Vec<ProcessChange>> {
    let statuses = platform.list_dyno_statuses(app).await?;

    let changes: Vec<ProcessChange> = declared
        .iter()
        .map(|process_type| {
            let running = statuses
                .iter()
                .any(|s| s.running && s.process_type == *process_type);
            ProcessChange {
                app: app.to_string(),
                process_type: process_type.clone(),
                action: ProcessAction::decide(running, restart_running),
            }
        })
        .collect();

    let to_boot: Vec<String> = changes
        .iter()
        .filter(|c| c.action == ProcessAction::Boot)
        .map(|c| c.process_type.clone())
        .collect();
    if !to_boot.is_empty() {
        platform.scale_to_one(app, &to_boot).await?;
    }

    for change in changes.iter().filter(|c| c.action == ProcessAction::Restart) {
        platform.restart_process(app, &change.process_type).await?;
    }

    Ok(changes)
}
