pub mod docker;

use async_trait::async_trait;

use crate::error::DeployResult;

/// Tags and pushes container images.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn tag(&self, source_image: &str, target_image: &str) -> DeployResult<()>;

    async fn push(&self, image: &str) -> DeployResult<()>;
}
