use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::image::{PushImageOptions, TagImageOptions};
use bollard::Docker;
use daytona_common::{EngineError, ImageEngine, ImageReference, RegistryAuth};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// [`ImageEngine`] backed by the local Docker daemon.
#[derive(Clone)]
pub struct DockerEngine {
    docker: Arc<Docker>,
}

impl DockerEngine {
    pub fn new(docker: Arc<Docker>) -> Self {
        Self { docker }
    }

    /// Connects using `DOCKER_HOST` or the platform default socket.
    pub fn connect() -> Result<Self, EngineError> {
        let docker = Docker::connect_with_defaults().map_err(docker_err)?;
        Ok(Self::new(Arc::new(docker)))
    }
}

fn docker_err(e: bollard::errors::Error) -> EngineError {
    EngineError::Docker(e.to_string())
}

fn credentials(registry_auth: &str) -> Result<DockerCredentials, EngineError> {
    let auth = RegistryAuth::decode(registry_auth)
        .map_err(|e| EngineError::Reported(format!("invalid registry auth: {e}")))?;
    Ok(DockerCredentials {
        username: Some(auth.username),
        password: Some(auth.password),
        serveraddress: Some(auth.server_address),
        ..Default::default()
    })
}

#[async_trait]
impl ImageEngine for DockerEngine {
    async fn inspect_image(&self, reference: &str) -> Result<(), EngineError> {
        self.docker
            .inspect_image(reference)
            .await
            .map(|_| ())
            .map_err(docker_err)
    }

    async fn tag_image(&self, source: &str, target: &ImageReference) -> Result<(), EngineError> {
        self.docker
            .tag_image(
                source,
                Some(TagImageOptions {
                    repo: target.repository.as_str(),
                    tag: target.tag.as_str(),
                }),
            )
            .await
            .map_err(docker_err)
    }

    async fn remove_image(&self, reference: &str) -> Result<(), EngineError> {
        self.docker
            .remove_image(reference, None, None)
            .await
            .map(|_| ())
            .map_err(docker_err)
    }

    #[instrument(skip(self, registry_auth))]
    async fn push_image(&self, target: &ImageReference, registry_auth: &str) -> Result<(), EngineError> {
        let progress = self.docker.push_image(
            &target.repository,
            Some(PushImageOptions {
                tag: target.tag.as_str(),
            }),
            Some(credentials(registry_auth)?),
        );
        futures::pin_mut!(progress);

        // the daemon reports registry failures inside the stream, not as an HTTP error
        while let Some(item) = progress.next().await {
            let info = item.map_err(docker_err)?;
            if let Some(error) = info.error {
                return Err(EngineError::Reported(error));
            }
            if let Some(status) = info.status {
                debug!(%status, "push progress");
            }
        }
        Ok(())
    }

    async fn inspect_manifest(
        &self,
        target: &ImageReference,
        registry_auth: &str,
    ) -> Result<(), EngineError> {
        self.docker
            .inspect_registry_image(&target.to_string(), Some(credentials(registry_auth)?))
            .await
            .map(|_| ())
            .map_err(docker_err)
    }
}
