//! Local Docker implementation of the container-runtime abstraction.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerStateStatusEnum, HostConfig, PortBinding};
use bollard::Docker;
use futures::TryStreamExt;
use tracing::{debug, info, warn};

use crate::runtime::{ContainerHandle, ContainerRuntime, ContainerState, RunRequest, RuntimeError};
use crate::serving::LocalDockerConfig;

/// Host interface containers are published on.
const HOST_IP: &str = "127.0.0.1";

/// Translate a Docker API error, classifying HTTP 404 as not-found.
fn classify(err: DockerError) -> RuntimeError {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404,
            message,
        } => RuntimeError::NotFound(message),
        other => RuntimeError::Docker(other),
    }
}

/// Container runtime backed by a single-host Docker daemon.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect with the environment's local defaults (unix socket or
    /// `DOCKER_HOST`).
    pub fn new() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker })
    }

    /// Connect according to a serving spec's local Docker platform options.
    pub fn from_config(config: &LocalDockerConfig) -> Result<Self, RuntimeError> {
        let timeout = config.client_timeout.as_secs();
        let docker = match &config.base_url {
            Some(addr) => Docker::connect_with_http(addr, timeout, bollard::API_DEFAULT_VERSION)?,
            None => Docker::connect_with_local_defaults()?,
        };
        Ok(Self { docker })
    }

    /// Pull the image unless it is already present locally.
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        if self.docker.inspect_image(image).await.is_ok() {
            return Ok(());
        }

        info!(image = %image, "Pulling image");
        let options = Some(CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        });
        let mut stream = self.docker.create_image(options, None, None);
        while let Some(_progress) = stream.try_next().await.map_err(classify)? {}
        Ok(())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    type Handle = DockerContainer;

    async fn run(&self, request: RunRequest) -> Result<DockerContainer, RuntimeError> {
        self.ensure_image(&request.image).await?;

        let mut port_bindings = HashMap::new();
        let mut exposed_ports = HashMap::new();
        for (container_port, host_port) in &request.ports {
            let key = format!("{}/tcp", container_port);
            port_bindings.insert(
                key.clone(),
                Some(vec![PortBinding {
                    host_ip: Some(HOST_IP.to_string()),
                    host_port: Some(host_port.to_string()),
                }]),
            );
            exposed_ports.insert(key, HashMap::new());
        }

        let binds: Vec<String> = request
            .mounts
            .iter()
            .map(|mount| {
                let mode = if mount.read_only { "ro" } else { "rw" };
                format!("{}:{}:{}", mount.host_path, mount.container_path, mode)
            })
            .collect();

        let env: Vec<String> = request
            .environment
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            auto_remove: Some(request.auto_remove),
            binds: if binds.is_empty() { None } else { Some(binds) },
            ..Default::default()
        };

        let config = Config {
            image: Some(request.image.clone()),
            env: Some(env),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let create = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(classify)?;

        if let Err(err) = self
            .docker
            .start_container(&create.id, None::<StartContainerOptions<String>>)
            .await
        {
            // Do not leave the created-but-never-started container behind.
            let _ = self
                .docker
                .remove_container(
                    &create.id,
                    Some(RemoveContainerOptions {
                        force: true,
                        v: true,
                        ..Default::default()
                    }),
                )
                .await;
            return Err(classify(err));
        }

        debug!(container_id = %create.id, image = %request.image, "Container started");

        Ok(DockerContainer {
            docker: self.docker.clone(),
            id: create.id,
        })
    }
}

/// Handle to one Docker container, owned by a single runner.
#[derive(Debug)]
pub struct DockerContainer {
    docker: Docker,
    id: String,
}

impl DockerContainer {
    /// Docker's runtime identifier for this container.
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[async_trait]
impl ContainerHandle for DockerContainer {
    async fn refresh(&mut self) -> Result<ContainerState, RuntimeError> {
        let inspect = self
            .docker
            .inspect_container(&self.id, None::<InspectContainerOptions>)
            .await
            .map_err(classify)?;

        let status = inspect
            .state
            .and_then(|state| state.status)
            .unwrap_or(ContainerStateStatusEnum::EMPTY);

        let state = match status {
            ContainerStateStatusEnum::CREATED => ContainerState::Created,
            ContainerStateStatusEnum::RUNNING => ContainerState::Running,
            ContainerStateStatusEnum::PAUSED => ContainerState::Paused,
            ContainerStateStatusEnum::RESTARTING => ContainerState::Restarting,
            ContainerStateStatusEnum::REMOVING => ContainerState::Removing,
            ContainerStateStatusEnum::EXITED => ContainerState::Exited,
            ContainerStateStatusEnum::DEAD => ContainerState::Dead,
            _ => ContainerState::Unknown,
        };

        Ok(state)
    }

    async fn remove(&mut self) -> Result<(), RuntimeError> {
        debug!(container_id = %self.id, "Removing container");
        self.docker
            .remove_container(
                &self.id,
                Some(RemoveContainerOptions {
                    force: true,
                    v: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|err| {
                let err = classify(err);
                if !matches!(err, RuntimeError::NotFound(_)) {
                    warn!(container_id = %self.id, error = %err, "Failed to remove container");
                }
                err
            })
    }
}
