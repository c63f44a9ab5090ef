use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cmd;
use crate::env_vars::EnvVarMap;
use crate::error::{DeployError, DeployResult};
use crate::platform::{AppSummary, DynoStatus, Platform};
use crate::review_app;
use crate::settings::Addon;
use crate::target::PipelineStage;

const HEROKU: &str = "heroku";

/// Heroku platform adapter driving the `heroku` CLI.
pub struct Heroku {
    registry_host: String,
}

impl Heroku {
    #[must_use]
    pub fn new(registry_host: &str) -> Self {
        Self {
            registry_host: registry_host.to_string(),
        }
    }

    /// Check that the `heroku` and `docker` CLIs are on PATH.
    pub async fn check_prerequisites() -> DeployResult<()> {
        for program in [HEROKU, "docker"] {
            if !cmd::command_exists(program).await {
                return Err(DeployError::PrerequisiteMissing(format!(
                    "{program} is not installed"
                )));
            }
        }
        Ok(())
    }

    /// Authenticate the CLI through `~/.netrc` and log docker into
    /// the container registry.
    pub async fn login(&self, email: &str, api_key: &str) -> DeployResult<()> {
        let home = std::env::var("HOME").map_err(|_| DeployError::EnvMissing("HOME".into()))?;
        let netrc_path = PathBuf::from(home).join(".netrc");

        tokio::fs::write(&netrc_path, render_netrc(email, api_key)).await?;
        debug!(path = %netrc_path.display(), "wrote netrc");

        cmd::run(HEROKU, &["whoami"]).await.map_err(|_| {
            DeployError::PrerequisiteMissing(
                "heroku rejected the supplied credentials".into(),
            )
        })?;

        let token = cmd::run(HEROKU, &["auth:token"]).await?;
        cmd::run_with_stdin(
            "docker",
            &[
                "login",
                "--username",
                "_",
                "--password-stdin",
                &self.registry_host,
            ],
            token.as_bytes(),
        )
        .await?;

        info!(registry = %self.registry_host, "logged in to heroku");
        Ok(())
    }
}

#[async_trait]
impl Platform for Heroku {
    async fn app_exists(&self, app: &str) -> bool {
        cmd::run(HEROKU, &["apps:info", "--app", app]).await.is_ok()
    }

    async fn create_app(
        &self,
        app: &str,
        team: &str,
        pipeline: &str,
        stage: PipelineStage,
    ) -> DeployResult<()> {
        info!(app, team, pipeline, %stage, "creating app");
        cmd::run(
            HEROKU,
            &[
                "apps:create",
                app,
                "--team",
                team,
                "--no-remote",
                "--stack=container",
            ],
        )
        .await?;
        cmd::run(
            HEROKU,
            &[
                "pipelines:add",
                pipeline,
                "--stage",
                stage.as_str(),
                "--app",
                app,
            ],
        )
        .await?;
        Ok(())
    }

    async fn create_addon(&self, app: &str, addon: &Addon) -> DeployResult<()> {
        info!(app, plan = %addon.plan, wait = addon.wait, "creating add-on");
        let args = addon_args(app, addon);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run(HEROKU, &refs).await?;
        Ok(())
    }

    async fn get_env_var(&self, app: &str, name: &str) -> DeployResult<String> {
        cmd::run(HEROKU, &["config:get", name, "--app", app]).await
    }

    async fn get_all_env_vars(&self, app: &str) -> DeployResult<EnvVarMap> {
        let output = cmd::run(HEROKU, &["config", "--json", "--app", app]).await?;
        Ok(serde_json::from_str(&output)?)
    }

    async fn set_env_vars(&self, app: &str, vars: &EnvVarMap) -> DeployResult<()> {
        if vars.is_empty() {
            return Ok(());
        }
        let mut args = vec!["config:set".to_string()];
        args.extend(vars.iter().map(|(k, v)| format!("{k}={v}")));
        args.extend(["--app".to_string(), app.to_string()]);

        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run(HEROKU, &refs).await?;
        Ok(())
    }

    async fn unset_env_vars(&self, app: &str, names: &[String]) -> DeployResult<()> {
        let mut args = vec!["config:unset"];
        args.extend(names.iter().map(String::as_str));
        args.extend(["--app", app]);
        cmd::run(HEROKU, &args).await?;
        Ok(())
    }

    async fn release_container(&self, app: &str, process_types: &[String]) -> DeployResult<()> {
        info!(app, ?process_types, "releasing container");
        let mut args = vec!["container:release"];
        args.extend(process_types.iter().map(String::as_str));
        args.extend(["--app", app]);
        cmd::run_interactive(HEROKU, &args).await
    }

    async fn run(
        &self,
        app: &str,
        process_type: &str,
        command: &[String],
    ) -> DeployResult<String> {
        info!(app, process = process_type, command = %command.join(" "), "running one-off");
        let mut args = vec!["run", "--type", process_type, "--exit-code", "--app", app, "--"];
        args.extend(command.iter().map(String::as_str));
        cmd::run(HEROKU, &args).await
    }

    async fn list_dyno_statuses(&self, app: &str) -> DeployResult<Vec<DynoStatus>> {
        let output = cmd::run(HEROKU, &["ps", "--json", "--app", app]).await?;
        parse_dyno_list(&output)
    }

    async fn scale_to_one(&self, app: &str, process_types: &[String]) -> DeployResult<()> {
        scale(app, process_types, 1).await
    }

    async fn scale_to_zero(&self, app: &str, process_types: &[String]) -> DeployResult<()> {
        scale(app, process_types, 0).await
    }

    async fn restart_process(&self, app: &str, process_type: &str) -> DeployResult<()> {
        info!(app, process = process_type, "restarting");
        cmd::run(HEROKU, &["ps:restart", process_type, "--app", app]).await?;
        Ok(())
    }

    async fn list_apps(&self, team: &str) -> DeployResult<Vec<AppSummary>> {
        let output = cmd::run(HEROKU, &["apps", "--team", team, "--json"]).await?;
        parse_app_list(&output)
    }

    async fn destroy_app(&self, app: &str) -> DeployResult<()> {
        if !review_app::is_review_app_name(app) {
            return Err(DeployError::UnsafeDestroyRejected(app.to_string()));
        }
        info!(app, "destroying app");
        cmd::run(HEROKU, &["apps:destroy", "--app", app, "--confirm", app]).await?;
        Ok(())
    }
}

async fn scale(app: &str, process_types: &[String], count: u32) -> DeployResult<()> {
    info!(app, ?process_types, count, "scaling");
    let mut args = vec!["ps:scale".to_string()];
    args.extend(process_types.iter().map(|t| format!("{t}={count}")));
    args.extend(["--app".to_string(), app.to_string()]);

    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    cmd::run(HEROKU, &refs).await?;
    Ok(())
}

/// Arguments for `heroku addons:create`.
#[must_use]
pub fn addon_args(app: &str, addon: &Addon) -> Vec<String> {
    let mut args = vec![
        "addons:create".to_string(),
        addon.plan.clone(),
        "--app".to_string(),
        app.to_string(),
    ];
    if let Some(version) = &addon.version {
        args.push("--version".to_string());
        args.push(version.clone());
    }
    if addon.wait {
        args.push("--wait".to_string());
    }
    args
}

/// Contents of `~/.netrc` granting the CLI API and git access.
#[must_use]
pub fn render_netrc(email: &str, api_key: &str) -> String {
    format!(
        "machine api.heroku.com\n    \
         login {email}\n    \
         password {api_key}\n\
         machine git.heroku.com\n    \
         login {email}\n    \
         password {api_key}\n"
    )
}

#[derive(Deserialize)]
struct DynoRecord {
    #[serde(rename = "type")]
    process_type: String,
    state: String,
}

/// Parse `heroku ps --json` output. A dyno is running when its
/// state is `up`.
pub fn parse_dyno_list(json: &str) -> DeployResult<Vec<DynoStatus>> {
    let records: Vec<DynoRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| DynoStatus {
            running: r.state == "up",
            process_type: r.process_type,
        })
        .collect())
}

/// Parse `heroku apps --json` output.
pub fn parse_app_list(json: &str) -> DeployResult<Vec<AppSummary>> {
    Ok(serde_json::from_str(json)?)
}
