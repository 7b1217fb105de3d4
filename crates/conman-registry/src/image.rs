//! Container image pull with content trust.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{RegistryError, RegistryResult};

/// Fetches the application's container image.
#[async_trait]
pub trait ImagePuller: Send + Sync {
    /// Pull `<repository>:<app>`.
    async fn pull(&self, repository: &str, app: &str) -> RegistryResult<()>;
}

/// Runs `docker pull` with `DOCKER_CONTENT_TRUST=1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerPuller;

#[async_trait]
impl ImagePuller for DockerPuller {
    async fn pull(&self, repository: &str, app: &str) -> RegistryResult<()> {
        let image = format!("{}:{}", repository, app);

        let docker = which::which("docker").map_err(|_| RegistryError::MissingTool {
            tool: "docker".to_string(),
        })?;

        debug!(image = %image, "pulling image");

        let output = Command::new(docker)
            .args(["pull", &image])
            .env("DOCKER_CONTENT_TRUST", "1")
            .output()
            .await
            .map_err(|e| RegistryError::ImagePull {
                image: image.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(RegistryError::ImagePull {
                image,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(image = %image, "pulled image");
        Ok(())
    }
}

/// Skips the pull; for platforms that run the image on demand.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPull;

#[async_trait]
impl ImagePuller for NoPull {
    async fn pull(&self, repository: &str, app: &str) -> RegistryResult<()> {
        debug!(repository, app, "image pull disabled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_pull_succeeds() {
        NoPull.pull("docker.io/conman/apps", "spotify").await.unwrap();
    }
}
