//! Container-runtime abstraction consumed by the runner.
//!
//! The runner only needs three operations from a container runtime: run a
//! container detached, refresh a handle's status, and remove a container.
//! They are expressed as traits so tests can drive the lifecycle state
//! machine with a scripted runtime instead of a live Docker daemon.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a container runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The container no longer exists. On refresh this means the container
    /// exited and was removed (auto-remove) before reaching a ready state.
    #[error("container not found: {0}")]
    NotFound(String),

    /// Any other Docker daemon or transport failure, surfaced as-is.
    #[error(transparent)]
    Docker(#[from] bollard::errors::Error),
}

/// Runtime-reported container status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    /// Created but not yet started.
    Created,
    /// Main process is running.
    Running,
    /// Paused by the runtime.
    Paused,
    /// Being restarted.
    Restarting,
    /// Being removed.
    Removing,
    /// Main process exited.
    Exited,
    /// Daemon failed to stop or remove the container.
    Dead,
    /// Status missing or unrecognized.
    Unknown,
}

impl ContainerState {
    /// String representation matching the Docker status names.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Created => "created",
            ContainerState::Running => "running",
            ContainerState::Paused => "paused",
            ContainerState::Restarting => "restarting",
            ContainerState::Removing => "removing",
            ContainerState::Exited => "exited",
            ContainerState::Dead => "dead",
            ContainerState::Unknown => "unknown",
        }
    }

    /// Returns true for statuses the container will not recover from.
    ///
    /// The set is fixed: `exited` and `dead`. Every other non-`running`
    /// status is treated as "still starting" and polled again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ContainerState::Exited | ContainerState::Dead)
    }
}

/// A host-path mount into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Absolute path on the host.
    pub host_path: String,
    /// Mount target inside the container.
    pub container_path: String,
    /// Mount read-only.
    pub read_only: bool,
}

/// Parameters for creating and starting one container.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Image reference, e.g. `tensorflow/serving:1.15.0`.
    pub image: String,
    /// TCP port publications, container port to host port.
    pub ports: HashMap<u16, u16>,
    /// Environment variables.
    pub environment: HashMap<String, String>,
    /// Host-path mounts.
    pub mounts: Vec<Mount>,
    /// Remove the container automatically once it exits.
    pub auto_remove: bool,
    /// Run without attaching to the container's output streams.
    pub detach: bool,
}

/// A container runtime capable of launching detached containers.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Handle to a container this runtime launched.
    type Handle: ContainerHandle;

    /// Create and start a container. Returns once the runtime accepted the
    /// container; whether the process inside ever becomes ready is observed
    /// through [`ContainerHandle::refresh`].
    async fn run(&self, request: RunRequest) -> Result<Self::Handle, RuntimeError>;
}

/// Exclusive handle to one launched container.
///
/// The handle is owned by a single runner for its whole lifetime; the
/// status snapshot returned by `refresh` is the only external state the
/// lifecycle state machine reads.
#[async_trait]
pub trait ContainerHandle: Send {
    /// Fetch the container's current status from the runtime.
    async fn refresh(&mut self) -> Result<ContainerState, RuntimeError>;

    /// Remove the container, stopping it first if necessary.
    async fn remove(&mut self) -> Result<(), RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_set_is_exactly_exited_and_dead() {
        let fatal = [ContainerState::Exited, ContainerState::Dead];
        let transient = [
            ContainerState::Created,
            ContainerState::Running,
            ContainerState::Paused,
            ContainerState::Restarting,
            ContainerState::Removing,
            ContainerState::Unknown,
        ];

        for state in fatal {
            assert!(state.is_fatal(), "{} must be fatal", state.as_str());
        }
        for state in transient {
            assert!(!state.is_fatal(), "{} must not be fatal", state.as_str());
        }
    }

    #[test]
    fn test_status_names_match_docker() {
        assert_eq!(ContainerState::Running.as_str(), "running");
        assert_eq!(ContainerState::Exited.as_str(), "exited");
        assert_eq!(ContainerState::Dead.as_str(), "dead");
    }
}
