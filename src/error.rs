use std::process::ExitStatus;

pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        output: String,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("environment variable missing: {0}")]
    EnvMissing(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("invalid env-var config, could not parse line {line}: \"{content}\"")]
    EnvVarParse { line: usize, content: String },

    #[error("no deployment target: {0}")]
    UnresolvableTarget(String),

    #[error(
        "the app \"{app}\" does not exist and this environment \
         does not allow creating it"
    )]
    EnvironmentNotBootstrapped { app: String },

    #[error("the app \"{app}\" does not have a {name} env var")]
    MissingRequiredSecret { app: String, name: String },

    #[error("refusing to destroy \"{0}\": only review apps may be destroyed")]
    UnsafeDestroyRejected(String),

    #[error("refusing to seed \"{0}\": only review apps may be seeded")]
    UnsafeSeedRejected(String),

    #[error("unsupported app type: \"{0}\"")]
    UnsupportedAppType(String),

    #[error("invalid image name: \"{0}\"")]
    InvalidImageName(String),

    #[error("source control: {0}")]
    SourceControl(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
