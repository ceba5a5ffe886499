//! Infra validator - serving-readiness validation for trained models.
//!
//! Before a trained model is promoted, the pipeline launches the model's
//! serving binary in an isolated container, confirms it reaches a genuinely
//! serving-ready state, and learns the address to send validation traffic
//! to. This crate provides that lifecycle runner:
//!
//! - **Runner**: exactly-once start, a single `localhost:<port>` endpoint,
//!   and a deadline-bounded polling protocol that tells "still starting"
//!   apart from "never going to start" and "took too long"
//! - **Binary kinds**: translate a serving spec into the image, port, and
//!   environment of a concrete serving binary (TensorFlow Serving)
//! - **Container runtime**: a trait seam over container create/inspect/
//!   remove, implemented for the local Docker daemon via bollard
//!
//! # Architecture
//!
//! ```text
//! Pipeline executor --> LocalDockerRunner --> ContainerRuntime (Docker)
//!                            |
//!                            +--> endpoint --> validation traffic (downstream)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use infra_validator::{
//!     BinaryKind, DockerRuntime, LocalDockerConfig, LocalDockerRunner, ModelArtifact,
//!     ModelServerRunner, ServingBinaryConfig, ServingPlatformConfig, ServingSpec,
//! };
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = ServingSpec {
//!     binary: ServingBinaryConfig::TensorFlowServing {
//!         model_name: "chicago-taxi".to_string(),
//!         tags: vec!["1.15.0".to_string()],
//!     },
//!     platform: ServingPlatformConfig::LocalDocker(LocalDockerConfig::default()),
//! };
//! let binary = BinaryKind::parse(&spec).remove(0);
//!
//! let mut runner = LocalDockerRunner::new(
//!     ModelArtifact::new("/pipelines/trainer/current"),
//!     binary,
//!     spec,
//!     DockerRuntime::new()?,
//! );
//!
//! runner.start().await?;
//! runner.wait_until_running(Duration::from_secs(60)).await?;
//! println!("Model server ready at {}", runner.endpoint()?);
//!
//! // ... drive validation traffic through runner.client() ...
//!
//! runner.stop().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod docker;
pub mod error;
pub mod model;
pub mod ports;
pub mod runner;
pub mod runtime;
pub mod serving;

// Re-export main types for convenience
pub use clock::{Clock, SystemClock};
pub use docker::{DockerContainer, DockerRuntime};
pub use error::{ValidatorError, ValidatorResult};
pub use model::ModelArtifact;
pub use ports::find_available_port;
pub use runner::{LocalDockerRunner, ModelServerRunner};
pub use runtime::{ContainerHandle, ContainerRuntime, ContainerState, Mount, RunRequest, RuntimeError};
pub use serving::{
    BinaryKind, LocalDockerConfig, ModelServerClient, ModelServerClientConfig,
    ServingBinaryConfig, ServingPlatformConfig, ServingSpec, TensorFlowServingBinary,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify that all main types are accessible from the crate root.
    #[test]
    fn test_exports() {
        let _ = ContainerState::Running;
        let _ = SystemClock;

        let err = ValidatorError::IllegalState("container is not started.");
        assert!(err.to_string().contains("not started"));
    }
}
