//! Deploy a primary app and its GraphQL gateway to Heroku from CI.
//!
//! Tandem runs once per CI event (a branch push or a pull request).
//! It garbage-collects review apps whose pull request has closed,
//! works out which environments the event deploys to, and brings
//! each of them up to date:
//!
//! 1. **Reconcile** - make sure the primary app and the gateway app
//!    exist. Review apps are created on the fly, with add-ons and a
//!    freshly generated secret triad; the gateway is wired to the
//!    primary app's JWT secret and database.
//! 2. **Publish** - tag and push every image to the registry path
//!    of its app and process type.
//! 3. **Release** - release each app, stamp the commit, migrate the
//!    primary database, seed it if the app is new, and boot or
//!    restart processes based on what is actually running.
//! 4. **Notify** - for pull requests, record a successful deployment
//!    pointing at the primary app.
//!
//! Every step re-reads remote state before acting, so a run that
//! failed halfway can simply be re-run.
//!
//! # Architecture
//!
//! The workflow only talks to the outside world through three
//! traits, each with one production implementation:
//!
//! - [`Platform`] - the hosting platform ([`Heroku`], via the
//!   `heroku` CLI)
//! - [`Registry`] - container tag/push ([`Docker`])
//! - [`SourceControl`] - pull requests and deployment records
//!   ([`GitHub`], via the REST API)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tandem::{
//!     DeployRequest, Docker, GitHub, Heroku, Pipeline, Settings,
//!     TriggerEvent,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new();
//!     let heroku = Heroku::new(&settings.registry_host);
//!     heroku.login("ci@example.com", "api-key").await?;
//!
//!     let github = GitHub::new("token", "Runn-Fast", "runn")?;
//!     let pipeline = Pipeline::new(
//!         Arc::new(heroku),
//!         Arc::new(Docker::new()),
//!         Arc::new(github),
//!     )
//!     .settings(settings);
//!
//!     let report = pipeline
//!         .deploy(&DeployRequest {
//!             event: TriggerEvent::PullRequest {
//!                 number: Some(42),
//!                 head_sha: "0123456789abcdef0123456789abcdef01234567".into(),
//!             },
//!             env_vars: tandem::env_vars::parse("HASURA_ADMIN_SECRET=s3cret")?,
//!             images: tandem::release::parse_image_list("app_web,app_worker,hasura_web")?,
//!         })
//!         .await?;
//!
//!     assert_eq!(report.failures().count(), 0);
//!     Ok(())
//! }
//! ```
//!
//! [`Platform`]: platform::Platform
//! [`Registry`]: registry::Registry
//! [`SourceControl`]: source_control::SourceControl

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cli;
pub mod cmd;
pub mod commit_marker;
pub mod env_vars;
pub mod error;
pub mod gc;
pub mod logging;
pub mod pipeline;
pub mod platform;
pub mod reconcile;
pub mod registry;
pub mod release;
pub mod review_app;
pub mod secrets;
pub mod settings;
pub mod source_control;
pub mod target;

pub use pipeline::{DeployRequest, Pipeline};
pub use platform::heroku::Heroku;
pub use registry::docker::Docker;
pub use settings::Settings;
pub use source_control::github::GitHub;
pub use target::{Target, TriggerEvent};
