use async_trait::async_trait;
use tracing::info;

use crate::cmd;
use crate::error::DeployResult;
use crate::registry::Registry;

/// Registry access through the local `docker` CLI. The daemon must
/// already be logged in to the target registry.
pub struct Docker;

impl Docker {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for Docker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Registry for Docker {
    async fn tag(&self, source_image: &str, target_image: &str) -> DeployResult<()> {
        cmd::run("docker", &["tag", source_image, target_image]).await?;
        Ok(())
    }

    async fn push(&self, image: &str) -> DeployResult<()> {
        info!(image, "pushing image");
        cmd::run_interactive("docker", &["push", image]).await
    }
}
