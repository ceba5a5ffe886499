//! Model-server lifecycle runner.
//!
//! A [`LocalDockerRunner`] owns exactly one serving container for one
//! trained model: `start` launches it on a freshly allocated host port,
//! `wait_until_running` polls the runtime until the server is genuinely
//! running (or never will be, or took too long), `endpoint` reports where
//! validation traffic can reach it, and `stop` tears it down.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{ValidatorError, ValidatorResult};
use crate::model::ModelArtifact;
use crate::ports;
use crate::runtime::{
    ContainerHandle, ContainerRuntime, ContainerState, Mount, RunRequest, RuntimeError,
};
use crate::serving::{BinaryKind, ModelServerClient, ServingSpec};

/// Sleep between status polls in `wait_until_running`.
const POLLING_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle contract for a single model-server instance.
///
/// The state machine moves forward only: not-started, then started by the
/// first `start`. Whether a started server is running, aborted, or timing
/// out is an outcome of `wait_until_running`, recomputed from the live
/// container each call, not a cached state.
#[async_trait]
pub trait ModelServerRunner: Send {
    /// Launch the model server. Fails with
    /// [`ValidatorError::IllegalState`] if called more than once.
    async fn start(&mut self) -> ValidatorResult<()>;

    /// `host:port` where the server can be reached. Defined once `start`
    /// has succeeded, whether or not the server is serving yet.
    fn endpoint(&self) -> ValidatorResult<String>;

    /// Block until the runtime reports the container running, the
    /// container reaches a status it cannot recover from
    /// ([`ValidatorError::JobAborted`]), or `deadline` elapses
    /// ([`ValidatorError::DeadlineExceeded`]).
    async fn wait_until_running(&mut self, deadline: Duration) -> ValidatorResult<()>;

    /// Remove the container if one is held. Safe to call before `start`
    /// and after any outcome of `wait_until_running`; idempotent.
    async fn stop(&mut self) -> ValidatorResult<()>;
}

/// Runs one model server in a local Docker container.
///
/// Bound to one model artifact, one binary kind, and one serving spec for
/// its whole lifetime. The container handle and host port are set together,
/// exactly once, by `start`; the handle is released by `stop`.
pub struct LocalDockerRunner<R: ContainerRuntime, C: Clock = SystemClock> {
    model: ModelArtifact,
    binary: BinaryKind,
    spec: ServingSpec,
    runtime: R,
    clock: C,
    container: Option<R::Handle>,
    host_port: Option<u16>,
}

impl<R: ContainerRuntime> LocalDockerRunner<R, SystemClock> {
    /// Create a runner polling against the wall clock.
    pub fn new(model: ModelArtifact, binary: BinaryKind, spec: ServingSpec, runtime: R) -> Self {
        Self::with_clock(model, binary, spec, runtime, SystemClock)
    }
}

impl<R: ContainerRuntime, C: Clock> LocalDockerRunner<R, C> {
    /// Create a runner with an explicit clock.
    pub fn with_clock(
        model: ModelArtifact,
        binary: BinaryKind,
        spec: ServingSpec,
        runtime: R,
        clock: C,
    ) -> Self {
        Self {
            model,
            binary,
            spec,
            runtime,
            clock,
            container: None,
            host_port: None,
        }
    }

    /// Serving spec this runner was built from.
    pub fn serving_spec(&self) -> &ServingSpec {
        &self.spec
    }

    /// Protocol client for the started server's endpoint.
    pub fn client(&self) -> ValidatorResult<ModelServerClient> {
        let endpoint = self.endpoint()?;
        Ok(self.binary.make_client(&endpoint))
    }
}

#[async_trait]
impl<R: ContainerRuntime, C: Clock> ModelServerRunner for LocalDockerRunner<R, C> {
    async fn start(&mut self) -> ValidatorResult<()> {
        if self.host_port.is_some() {
            return Err(ValidatorError::IllegalState(
                "You cannot start model server multiple times.",
            ));
        }

        let host_port = ports::find_available_port()?;
        let image = self.binary.image();
        let container_port = self.binary.container_port();
        let environment = self.binary.env_vars();
        let mounts = vec![Mount {
            host_path: self.model.uri().display().to_string(),
            container_path: self.binary.model_base_path(),
            read_only: true,
        }];

        info!(
            image = %image,
            container_port = container_port,
            host_port = host_port,
            "Starting model server"
        );

        let container = self
            .runtime
            .run(RunRequest {
                image,
                ports: HashMap::from([(container_port, host_port)]),
                environment,
                mounts,
                auto_remove: true,
                detach: true,
            })
            .await?;

        self.container = Some(container);
        self.host_port = Some(host_port);
        Ok(())
    }

    fn endpoint(&self) -> ValidatorResult<String> {
        match self.host_port {
            Some(port) => Ok(format!("localhost:{}", port)),
            None => Err(ValidatorError::IllegalState(
                "Model server is not started; endpoint is not available.",
            )),
        }
    }

    async fn wait_until_running(&mut self, deadline: Duration) -> ValidatorResult<()> {
        let Some(container) = self.container.as_mut() else {
            return Err(ValidatorError::IllegalState("container is not started."));
        };

        let start = self.clock.now();
        loop {
            let status = match container.refresh().await {
                Ok(status) => status,
                Err(RuntimeError::NotFound(message)) => {
                    warn!(error = %message, "Container disappeared before becoming ready");
                    return Err(ValidatorError::JobAborted(format!(
                        "container was removed before reaching a running state: {}",
                        message
                    )));
                }
                Err(err) => return Err(err.into()),
            };

            debug!(status = status.as_str(), "Polled container status");

            if status == ContainerState::Running {
                return Ok(());
            }
            if status.is_fatal() {
                warn!(status = status.as_str(), "Container will not recover");
                return Err(ValidatorError::JobAborted(format!(
                    "container entered status {}",
                    status.as_str()
                )));
            }

            if self.clock.now().duration_since(start) >= deadline {
                return Err(ValidatorError::DeadlineExceeded(format!(
                    "container is not running after {:?}",
                    deadline
                )));
            }
            self.clock.sleep(POLLING_INTERVAL).await;
        }
    }

    async fn stop(&mut self) -> ValidatorResult<()> {
        if let Some(mut container) = self.container.take() {
            match container.remove().await {
                // Auto-remove may have removed the container already.
                Ok(()) | Err(RuntimeError::NotFound(_)) => {}
                Err(err) => return Err(err.into()),
            }
            debug!("Model server container removed");
        }
        Ok(())
    }
}
