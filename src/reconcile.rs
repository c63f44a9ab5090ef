//! Ensure both apps of a target exist and are wired together.
//!
//! The primary app and the gateway app are checked independently on
//! every run: either may have been created out of band, or left
//! behind by a run that failed halfway. Secrets are only generated
//! when the primary app is created, and only flow one way, from the
//! primary app to the gateway.

use serde_json::json;
use tracing::info;

use crate::env_vars::EnvVarMap;
use crate::error::{DeployError, DeployResult};
use crate::platform::Platform;
use crate::secrets::{self, SecretTriad};
use crate::settings::Settings;
use crate::target::Target;

/// Supplied variable holding the gateway admin secret.
pub const ADMIN_SECRET_INPUT: &str = "HASURA_ADMIN_SECRET";

/// Which apps were created by this run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Freshness {
    pub primary_created: bool,
    pub gateway_created: bool,
}

/// Values the gateway needs from its primary app.
#[derive(Clone)]
pub struct GatewaySecrets {
    pub jwt_secret: String,
    pub database_url: String,
    pub actions_secret: Option<String>,
}

/// Create whichever of the target's apps are missing.
///
/// `supplied` is the baseline configuration for a new primary app;
/// it must also carry [`ADMIN_SECRET_INPUT`] when the gateway has
/// to be created.
pub async fn create_app_environment(
    platform: &dyn Platform,
    settings: &Settings,
    target: &Target,
    supplied: &EnvVarMap,
) -> DeployResult<Freshness> {
    let created_secrets = ensure_primary_app(platform, settings, target, supplied).await?;
    let gateway_created =
        ensure_gateway_app(platform, target, supplied, created_secrets.as_ref()).await?;

    Ok(Freshness {
        primary_created: created_secrets.is_some(),
        gateway_created,
    })
}

/// Returns the new app's secrets when it had to be created.
async fn ensure_primary_app(
    platform: &dyn Platform,
    settings: &Settings,
    target: &Target,
    supplied: &EnvVarMap,
) -> DeployResult<Option<GatewaySecrets>> {
    let app = target.primary_app.as_str();

    if platform.app_exists(app).await {
        info!(app, "primary app exists");
        return Ok(None);
    }
    ensure_creatable(target, app)?;

    platform
        .create_app(app, &target.team, &target.pipeline_name, target.pipeline_stage)
        .await?;
    for addon in &settings.addons {
        platform.create_addon(app, addon).await?;
    }

    let triad = SecretTriad::generate();
    let mut config = supplied.clone();
    for (name, value) in triad.env_vars() {
        config.insert(name.to_string(), value.to_string());
    }
    platform.set_env_vars(app, &config).await?;

    let database_url = required_var(platform, app, secrets::DATABASE_URL).await?;
    info!(app, "primary app created");

    Ok(Some(GatewaySecrets {
        jwt_secret: triad.jwt_secret,
        database_url,
        actions_secret: Some(triad.actions_secret),
    }))
}

/// Returns whether the gateway had to be created.
async fn ensure_gateway_app(
    platform: &dyn Platform,
    target: &Target,
    supplied: &EnvVarMap,
    known: Option<&GatewaySecrets>,
) -> DeployResult<bool> {
    let app = target.gateway_app.as_str();

    if platform.app_exists(app).await {
        if let Some(secrets) = known {
            // The primary app was recreated under an existing
            // gateway, so its old secrets are gone.
            info!(app, "gateway app exists, rewiring to new primary app");
            platform.set_env_vars(app, &secret_config(secrets)).await?;
        } else {
            info!(app, "gateway app exists");
        }
        return Ok(false);
    }
    ensure_creatable(target, app)?;

    let admin_secret = supplied
        .get(ADMIN_SECRET_INPUT)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DeployError::EnvMissing(ADMIN_SECRET_INPUT.into()))?;

    // No gateway app may exist without its configuration.
    let secrets = match known {
        Some(secrets) => secrets.clone(),
        None => read_primary_secrets(platform, &target.primary_app).await?,
    };

    platform
        .create_app(app, &target.team, &target.pipeline_name, target.pipeline_stage)
        .await?;

    let config = gateway_config(&target.primary_url, &secrets, admin_secret);
    platform.set_env_vars(app, &config).await?;
    info!(app, "gateway app created");

    Ok(true)
}

fn ensure_creatable(target: &Target, app: &str) -> DeployResult<()> {
    if target.create_app_if_not_exists {
        Ok(())
    } else {
        Err(DeployError::EnvironmentNotBootstrapped {
            app: app.to_string(),
        })
    }
}

/// Read the gateway's secrets from an existing primary app. The
/// JWT secret and database URL must be set; the actions secret is
/// optional.
pub async fn read_primary_secrets(
    platform: &dyn Platform,
    primary_app: &str,
) -> DeployResult<GatewaySecrets> {
    let jwt_secret = required_var(platform, primary_app, secrets::JWT_SECRET).await?;
    let database_url = required_var(platform, primary_app, secrets::DATABASE_URL).await?;
    let actions_secret = platform
        .get_env_var(primary_app, secrets::ACTIONS_SECRET)
        .await?;

    Ok(GatewaySecrets {
        jwt_secret,
        database_url,
        actions_secret: Some(actions_secret).filter(|v| !v.trim().is_empty()),
    })
}

async fn required_var(platform: &dyn Platform, app: &str, name: &str) -> DeployResult<String> {
    let value = platform.get_env_var(app, name).await?;
    if value.trim().is_empty() {
        return Err(DeployError::MissingRequiredSecret {
            app: app.to_string(),
            name: name.to_string(),
        });
    }
    Ok(value)
}

/// JSON descriptor the gateway uses to verify JWTs.
#[must_use]
pub fn jwt_secret_descriptor(key: &str) -> String {
    json!({
        "type": "HS256",
        "key": key,
        "claims_format": "json",
    })
    .to_string()
}

/// Gateway variables derived from the primary app's secrets.
#[must_use]
pub fn secret_config(secrets: &GatewaySecrets) -> EnvVarMap {
    let mut config = EnvVarMap::new();
    config.insert(
        "HASURA_GRAPHQL_DATABASE_URL".into(),
        secrets.database_url.clone(),
    );
    config.insert(
        "HASURA_GRAPHQL_JWT_SECRET".into(),
        jwt_secret_descriptor(&secrets.jwt_secret),
    );
    if let Some(actions_secret) = &secrets.actions_secret {
        config.insert(
            "HASURA_ACTIONS_AUTHORIZATION_HEADER".into(),
            format!("Bearer {actions_secret}"),
        );
    }
    config
}

/// Full configuration of a new gateway app.
#[must_use]
pub fn gateway_config(
    primary_url: &str,
    secrets: &GatewaySecrets,
    admin_secret: &str,
) -> EnvVarMap {
    let mut config = secret_config(secrets);
    config.insert("HASURA_GRAPHQL_ADMIN_SECRET".into(), admin_secret.to_string());
    config.insert("HASURA_GRAPHQL_DEV_MODE".into(), "true".into());
    config.insert("HASURA_GRAPHQL_ENABLE_CONSOLE".into(), "true".into());
    config.insert("HASURA_GRAPHQL_ENABLE_TELEMETRY".into(), "false".into());
    config.insert("HASURA_ACTIONS_RUBY_ENDPOINT".into(), primary_url.to_string());
    config
}
