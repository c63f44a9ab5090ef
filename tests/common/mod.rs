//! In-memory fakes of the platform, registry, and source-control
//! host. Every call is recorded so tests can assert on ordering.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tandem::env_vars::EnvVarMap;
use tandem::error::{DeployError, DeployResult};
use tandem::platform::{AppSummary, DynoStatus, Platform};
use tandem::registry::Registry;
use tandem::review_app;
use tandem::settings::Addon;
use tandem::source_control::{DeploymentState, PullRequest, SourceControl};
use tandem::target::{PipelineStage, Target};

pub const SHA: &str = "0123456789abcdef0123456789abcdef01234567";
pub const OLD_SHA: &str = "fedcba9876543210fedcba9876543210fedcba98";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AppExists(String),
    CreateApp(String, PipelineStage),
    CreateAddon(String, String),
    GetEnvVar(String, String),
    GetAllEnvVars(String),
    SetEnvVars(String, Vec<String>),
    UnsetEnvVars(String, Vec<String>),
    Release(String, Vec<String>),
    Run(String, String, String),
    ListDynos(String),
    ScaleToOne(String, Vec<String>),
    ScaleToZero(String, Vec<String>),
    Restart(String, String),
    ListApps(String),
    Destroy(String),
}

#[derive(Debug, Default, Clone)]
pub struct FakeApp {
    pub config: EnvVarMap,
    /// Process type -> running.
    pub dynos: BTreeMap<String, bool>,
}

#[derive(Default)]
struct State {
    apps: BTreeMap<String, FakeApp>,
    calls: Vec<Call>,
    migrate_output: String,
    fail_unset: bool,
    fail_addon: Option<String>,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(self, name: &str, config: &[(&str, &str)]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let app = state.apps.entry(name.to_string()).or_default();
            for (k, v) in config {
                app.config.insert((*k).to_string(), (*v).to_string());
            }
        }
        self
    }

    pub fn with_dyno(self, app: &str, process_type: &str, running: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state
                .apps
                .entry(app.to_string())
                .or_default()
                .dynos
                .insert(process_type.to_string(), running);
        }
        self
    }

    pub fn migrate_output(self, output: &str) -> Self {
        self.state.lock().unwrap().migrate_output = output.to_string();
        self
    }

    pub fn fail_unset(self) -> Self {
        self.state.lock().unwrap().fail_unset = true;
        self
    }

    pub fn fail_addon(self, plan: &str) -> Self {
        self.state.lock().unwrap().fail_addon = Some(plan.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn app(&self, name: &str) -> Option<FakeApp> {
        self.state.lock().unwrap().apps.get(name).cloned()
    }

    pub fn config(&self, name: &str) -> EnvVarMap {
        self.app(name).map(|a| a.config).unwrap_or_default()
    }

    pub fn is_running(&self, app: &str, process_type: &str) -> bool {
        self.app(app)
            .and_then(|a| a.dynos.get(process_type).copied())
            .unwrap_or(false)
    }

    pub fn position(&self, wanted: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == wanted)
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn failed(command: &str) -> DeployError {
    DeployError::CommandFailed {
        command: command.to_string(),
        status: std::process::ExitStatus::default(),
        output: "fake failure".to_string(),
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn app_exists(&self, app: &str) -> bool {
        self.record(Call::AppExists(app.to_string()));
        self.state.lock().unwrap().apps.contains_key(app)
    }

    async fn create_app(
        &self,
        app: &str,
        _team: &str,
        _pipeline: &str,
        stage: PipelineStage,
    ) -> DeployResult<()> {
        self.record(Call::CreateApp(app.to_string(), stage));
        self.state
            .lock()
            .unwrap()
            .apps
            .insert(app.to_string(), FakeApp::default());
        Ok(())
    }

    async fn create_addon(&self, app: &str, addon: &Addon) -> DeployResult<()> {
        self.record(Call::CreateAddon(app.to_string(), addon.plan.clone()));
        let mut state = self.state.lock().unwrap();
        if state.fail_addon.as_deref() == Some(addon.plan.as_str()) {
            return Err(failed("addons:create"));
        }
        if addon.plan.starts_with("heroku-postgresql") {
            let app_state = state.apps.entry(app.to_string()).or_default();
            app_state
                .config
                .insert("DATABASE_URL".into(), format!("postgres://fake/{app}"));
        }
        Ok(())
    }

    async fn get_env_var(&self, app: &str, name: &str) -> DeployResult<String> {
        self.record(Call::GetEnvVar(app.to_string(), name.to_string()));
        Ok(self.config(app).get(name).cloned().unwrap_or_default())
    }

    async fn get_all_env_vars(&self, app: &str) -> DeployResult<EnvVarMap> {
        self.record(Call::GetAllEnvVars(app.to_string()));
        Ok(self.config(app))
    }

    async fn set_env_vars(&self, app: &str, vars: &EnvVarMap) -> DeployResult<()> {
        self.record(Call::SetEnvVars(app.to_string(), vars.keys().cloned().collect()));
        let mut state = self.state.lock().unwrap();
        let app_state = state.apps.entry(app.to_string()).or_default();
        for (k, v) in vars {
            app_state.config.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    async fn unset_env_vars(&self, app: &str, names: &[String]) -> DeployResult<()> {
        self.record(Call::UnsetEnvVars(app.to_string(), names.to_vec()));
        let mut state = self.state.lock().unwrap();
        if state.fail_unset {
            return Err(failed("config:unset"));
        }
        let app_state = state.apps.entry(app.to_string()).or_default();
        for name in names {
            app_state.config.shift_remove(name);
        }
        Ok(())
    }

    async fn release_container(&self, app: &str, process_types: &[String]) -> DeployResult<()> {
        self.record(Call::Release(app.to_string(), process_types.to_vec()));
        Ok(())
    }

    async fn run(
        &self,
        app: &str,
        process_type: &str,
        command: &[String],
    ) -> DeployResult<String> {
        let command = command.join(" ");
        self.record(Call::Run(app.to_string(), process_type.to_string(), command.clone()));
        if command.contains("db:migrate") {
            Ok(self.state.lock().unwrap().migrate_output.clone())
        } else {
            Ok(String::new())
        }
    }

    async fn list_dyno_statuses(&self, app: &str) -> DeployResult<Vec<DynoStatus>> {
        self.record(Call::ListDynos(app.to_string()));
        Ok(self
            .app(app)
            .map(|a| {
                a.dynos
                    .into_iter()
                    .map(|(process_type, running)| DynoStatus {
                        process_type,
                        running,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn scale_to_one(&self, app: &str, process_types: &[String]) -> DeployResult<()> {
        self.record(Call::ScaleToOne(app.to_string(), process_types.to_vec()));
        let mut state = self.state.lock().unwrap();
        let app_state = state.apps.entry(app.to_string()).or_default();
        for t in process_types {
            app_state.dynos.insert(t.clone(), true);
        }
        Ok(())
    }

    async fn scale_to_zero(&self, app: &str, process_types: &[String]) -> DeployResult<()> {
        self.record(Call::ScaleToZero(app.to_string(), process_types.to_vec()));
        let mut state = self.state.lock().unwrap();
        let app_state = state.apps.entry(app.to_string()).or_default();
        for t in process_types {
            app_state.dynos.insert(t.clone(), false);
        }
        Ok(())
    }

    async fn restart_process(&self, app: &str, process_type: &str) -> DeployResult<()> {
        self.record(Call::Restart(app.to_string(), process_type.to_string()));
        Ok(())
    }

    async fn list_apps(&self, team: &str) -> DeployResult<Vec<AppSummary>> {
        self.record(Call::ListApps(team.to_string()));
        Ok(self
            .state
            .lock()
            .unwrap()
            .apps
            .keys()
            .map(|name| AppSummary { name: name.clone() })
            .collect())
    }

    async fn destroy_app(&self, app: &str) -> DeployResult<()> {
        if !review_app::is_review_app_name(app) {
            return Err(DeployError::UnsafeDestroyRejected(app.to_string()));
        }
        self.record(Call::Destroy(app.to_string()));
        self.state.lock().unwrap().apps.remove(app);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    ops: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn tag(&self, source_image: &str, target_image: &str) -> DeployResult<()> {
        self.ops
            .lock()
            .unwrap()
            .push(format!("tag {source_image} {target_image}"));
        Ok(())
    }

    async fn push(&self, image: &str) -> DeployResult<()> {
        self.ops.lock().unwrap().push(format!("push {image}"));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSourceControl {
    open: Vec<u64>,
    deployments: Mutex<Vec<(String, String)>>,
    statuses: Mutex<Vec<(u64, DeploymentState, String)>>,
}

impl FakeSourceControl {
    pub fn with_open(open: &[u64]) -> Self {
        Self {
            open: open.to_vec(),
            ..Self::default()
        }
    }

    pub fn deployments(&self) -> Vec<(String, String)> {
        self.deployments.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<(u64, DeploymentState, String)> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceControl for FakeSourceControl {
    async fn list_open_pull_requests(&self) -> DeployResult<Vec<PullRequest>> {
        Ok(self
            .open
            .iter()
            .map(|&number| PullRequest {
                number,
                head_sha: SHA.to_string(),
            })
            .collect())
    }

    async fn create_deployment(&self, git_ref: &str, environment: &str) -> DeployResult<u64> {
        let mut deployments = self.deployments.lock().unwrap();
        deployments.push((git_ref.to_string(), environment.to_string()));
        Ok(deployments.len() as u64)
    }

    async fn set_deployment_status(
        &self,
        deployment_id: u64,
        _git_ref: &str,
        state: DeploymentState,
        environment_url: &str,
    ) -> DeployResult<()> {
        self.statuses
            .lock()
            .unwrap()
            .push((deployment_id, state, environment_url.to_string()));
        Ok(())
    }
}

pub fn review_target(pr: u64) -> Target {
    let primary_app = review_app::primary_app_name(pr);
    Target {
        commit_sha: SHA.to_string(),
        primary_url: format!("https://{primary_app}.herokuapp.com"),
        primary_app,
        gateway_app: review_app::gateway_app_name(pr),
        team: "runn".to_string(),
        pipeline_name: "runn-app".to_string(),
        pipeline_stage: PipelineStage::Development,
        create_app_if_not_exists: true,
        has_pull_request: true,
    }
}

pub fn staging_target() -> Target {
    Target {
        commit_sha: SHA.to_string(),
        primary_app: "runn-app-staging".to_string(),
        primary_url: "https://runn-app-staging.herokuapp.com".to_string(),
        gateway_app: "runn-hasura-staging".to_string(),
        team: "runn".to_string(),
        pipeline_name: "runn-app".to_string(),
        pipeline_stage: PipelineStage::Staging,
        create_app_if_not_exists: false,
        has_pull_request: false,
    }
}

pub fn supplied(vars: &[(&str, &str)]) -> EnvVarMap {
    vars.iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
