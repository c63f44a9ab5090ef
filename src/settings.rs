use crate::target::PipelineStage;

/// A managed add-on provisioned on newly created primary apps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addon {
    pub plan: String,
    pub version: Option<String>,
    /// Block until provisioning completes.
    pub wait: bool,
}

impl Addon {
    #[must_use]
    pub fn new(plan: &str) -> Self {
        Self {
            plan: plan.to_string(),
            version: None,
            wait: false,
        }
    }

    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    #[must_use]
    pub const fn wait(mut self) -> Self {
        self.wait = true;
        self
    }
}

/// A persistent environment deployed when a branch is pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTarget {
    /// Full ref, e.g. `refs/heads/production`.
    pub branch: String,
    pub primary_app: String,
    pub gateway_app: String,
    pub stage: PipelineStage,
}

impl BranchTarget {
    #[must_use]
    pub fn new(branch: &str, primary_app: &str, gateway_app: &str, stage: PipelineStage) -> Self {
        Self {
            branch: branch.to_string(),
            primary_app: primary_app.to_string(),
            gateway_app: gateway_app.to_string(),
            stage,
        }
    }
}

/// Static configuration for a deployment run.
///
/// # Example
///
/// ```
/// use tandem::settings::{BranchTarget, Settings};
/// use tandem::target::PipelineStage;
///
/// let settings = Settings::new()
///     .team("acme")
///     .branch(BranchTarget::new(
///         "refs/heads/production",
///         "acme-app-production-eu",
///         "acme-hasura-production-eu",
///         PipelineStage::Production,
///     ));
///
/// assert_eq!(settings.team, "acme");
/// assert_eq!(settings.targets_for_branch("production").len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Settings {
    pub team: String,
    pub pipeline_name: String,
    pub registry_host: String,
    pub app_domain: String,
    pub repo_owner: String,
    pub repo_name: String,
    /// Environment label on deployment records.
    pub deployment_environment: String,
    pub addons: Vec<Addon>,
    pub primary_process_types: Vec<String>,
    pub gateway_process_types: Vec<String>,
    /// Process type used for one-off commands.
    pub one_off_process_type: String,
    pub migrate_command: Vec<String>,
    pub seed_command: Vec<String>,
    /// Substring of the migrate output that means the schema changed.
    pub migration_marker: String,
    pub branches: Vec<BranchTarget>,
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self {
            team: "runn".to_string(),
            pipeline_name: "runn-app".to_string(),
            registry_host: "registry.heroku.com".to_string(),
            app_domain: "herokuapp.com".to_string(),
            repo_owner: "Runn-Fast".to_string(),
            repo_name: "runn".to_string(),
            deployment_environment: "Heroku".to_string(),
            addons: vec![
                Addon::new("rediscloud:30"),
                Addon::new("coralogix:free-30mbday"),
                Addon::new("heroku-postgresql:hobby-dev").version("12").wait(),
            ],
            primary_process_types: strings(&["web", "worker"]),
            gateway_process_types: strings(&["web"]),
            one_off_process_type: "worker".to_string(),
            migrate_command: strings(&["bundle", "exec", "rake", "db:migrate"]),
            seed_command: strings(&["bundle", "exec", "rake", "db:seed"]),
            migration_marker: "migrating".to_string(),
            branches: vec![
                BranchTarget::new(
                    "refs/heads/development",
                    "runn-app-staging",
                    "runn-hasura-staging",
                    PipelineStage::Staging,
                ),
                BranchTarget::new(
                    "refs/heads/test",
                    "runn-app-test",
                    "runn-hasura-test",
                    PipelineStage::Staging,
                ),
                BranchTarget::new(
                    "refs/heads/production",
                    "runn-app-production",
                    "runn-hasura-production",
                    PipelineStage::Production,
                ),
            ],
        }
    }

    #[must_use]
    pub fn team(mut self, team: &str) -> Self {
        self.team = team.to_string();
        self
    }

    #[must_use]
    pub fn pipeline_name(mut self, name: &str) -> Self {
        self.pipeline_name = name.to_string();
        self
    }

    #[must_use]
    pub fn registry_host(mut self, host: &str) -> Self {
        self.registry_host = host.to_string();
        self
    }

    #[must_use]
    pub fn repository(mut self, owner: &str, name: &str) -> Self {
        self.repo_owner = owner.to_string();
        self.repo_name = name.to_string();
        self
    }

    #[must_use]
    pub fn addons(mut self, addons: Vec<Addon>) -> Self {
        self.addons = addons;
        self
    }

    #[must_use]
    pub fn migration_marker(mut self, marker: &str) -> Self {
        self.migration_marker = marker.to_string();
        self
    }

    /// Add a branch target. A branch may map to several targets.
    #[must_use]
    pub fn branch(mut self, target: BranchTarget) -> Self {
        self.branches.push(target);
        self
    }

    /// Replace the whole branch table.
    #[must_use]
    pub fn branches(mut self, targets: Vec<BranchTarget>) -> Self {
        self.branches = targets;
        self
    }

    /// Public URL of an app.
    #[must_use]
    pub fn app_url(&self, app_name: &str) -> String {
        format!("https://{app_name}.{}", self.app_domain)
    }

    /// Registry path an image must be pushed to for release.
    #[must_use]
    pub fn registry_image(&self, app_name: &str, process_type: &str) -> String {
        format!("{}/{app_name}/{process_type}", self.registry_host)
    }

    /// Branch targets matching `branch`, given with or without the
    /// `refs/heads/` prefix.
    #[must_use]
    pub fn targets_for_branch(&self, branch: &str) -> Vec<&BranchTarget> {
        let wanted = normalize_ref(branch);
        self.branches
            .iter()
            .filter(|t| normalize_ref(&t.branch) == wanted)
            .collect()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_ref(branch: &str) -> &str {
    branch.strip_prefix("refs/heads/").unwrap_or(branch)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
