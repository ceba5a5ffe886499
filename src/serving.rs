//! Serving specification and serving-binary kinds.
//!
//! A [`ServingSpec`] says *what* should serve the model (binary name and
//! tags) and *where* (only the local Docker platform is supported). A
//! [`BinaryKind`] translates that abstract spec into the concrete image
//! reference, serving port, and environment a specific serving technology
//! needs, and can construct a protocol client for the eventual endpoint.

use std::collections::HashMap;
use std::time::Duration;

use tonic::transport::{Channel, Endpoint};
use tracing::debug;

/// Default connection timeout for model-server clients.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout for model-server clients.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Immutable serving configuration for one validation run.
#[derive(Debug, Clone)]
pub struct ServingSpec {
    /// Which serving binary to launch.
    pub binary: ServingBinaryConfig,
    /// Which serving platform to launch it on.
    pub platform: ServingPlatformConfig,
}

/// Serving-binary selection. Closed set: adding a binary means adding a
/// variant here and a matching [`BinaryKind`] variant.
#[derive(Debug, Clone)]
pub enum ServingBinaryConfig {
    /// TensorFlow Serving, one launch per requested image tag.
    TensorFlowServing {
        /// Model name announced to the serving binary.
        model_name: String,
        /// Image tags to validate against (e.g. `"1.15.0"`).
        tags: Vec<String>,
    },
}

/// Serving-platform selection.
#[derive(Debug, Clone)]
pub enum ServingPlatformConfig {
    /// Single-host Docker daemon.
    LocalDocker(LocalDockerConfig),
}

/// Local Docker platform options.
#[derive(Debug, Clone)]
pub struct LocalDockerConfig {
    /// Daemon address (e.g. `"http://localhost:2375"`). `None` uses the
    /// environment's local defaults (unix socket or `DOCKER_HOST`).
    pub base_url: Option<String>,
    /// Docker client API timeout.
    pub client_timeout: Duration,
}

impl Default for LocalDockerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            client_timeout: Duration::from_secs(120),
        }
    }
}

/// A serving-binary descriptor: everything the runner needs to launch and
/// later talk to one concrete serving binary.
#[derive(Debug, Clone)]
pub enum BinaryKind {
    /// TensorFlow Serving at a specific image tag.
    TensorFlowServing(TensorFlowServingBinary),
}

impl BinaryKind {
    /// Expand a serving spec into binary kinds, one per requested tag.
    pub fn parse(spec: &ServingSpec) -> Vec<BinaryKind> {
        match &spec.binary {
            ServingBinaryConfig::TensorFlowServing { model_name, tags } => tags
                .iter()
                .map(|tag| {
                    BinaryKind::TensorFlowServing(TensorFlowServingBinary {
                        model_name: model_name.clone(),
                        tag: tag.clone(),
                    })
                })
                .collect(),
        }
    }

    /// Container image reference for this binary.
    pub fn image(&self) -> String {
        match self {
            BinaryKind::TensorFlowServing(tfs) => tfs.image(),
        }
    }

    /// Port the serving binary listens on inside the container.
    pub fn container_port(&self) -> u16 {
        match self {
            BinaryKind::TensorFlowServing(_) => TensorFlowServingBinary::GRPC_PORT,
        }
    }

    /// Environment variables the serving binary requires.
    pub fn env_vars(&self) -> HashMap<String, String> {
        match self {
            BinaryKind::TensorFlowServing(tfs) => tfs.env_vars(),
        }
    }

    /// In-container directory where the model must be mounted.
    pub fn model_base_path(&self) -> String {
        match self {
            BinaryKind::TensorFlowServing(tfs) => tfs.model_base_path(),
        }
    }

    /// Construct a protocol client for a served endpoint (`host:port`).
    pub fn make_client(&self, endpoint: &str) -> ModelServerClient {
        ModelServerClient::new(endpoint)
    }
}

/// TensorFlow Serving binary descriptor.
#[derive(Debug, Clone)]
pub struct TensorFlowServingBinary {
    model_name: String,
    tag: String,
}

impl TensorFlowServingBinary {
    /// gRPC serving port inside the `tensorflow/serving` image.
    pub const GRPC_PORT: u16 = 8500;

    /// In-container base directory TensorFlow Serving scans for models.
    pub const MODEL_BASE_PATH: &'static str = "/model";

    /// Model name announced to the serving binary.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Requested image tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Full image reference, e.g. `tensorflow/serving:1.15.0`.
    pub fn image(&self) -> String {
        format!("tensorflow/serving:{}", self.tag)
    }

    /// Environment variables TensorFlow Serving needs to find the model.
    pub fn env_vars(&self) -> HashMap<String, String> {
        HashMap::from([
            ("MODEL_NAME".to_string(), self.model_name.clone()),
            (
                "MODEL_BASE_PATH".to_string(),
                Self::MODEL_BASE_PATH.to_string(),
            ),
        ])
    }

    /// Mount target for the model: `<base path>/<model name>`.
    pub fn model_base_path(&self) -> String {
        format!("{}/{}", Self::MODEL_BASE_PATH, self.model_name)
    }
}

/// Client configuration for a model-server endpoint.
#[derive(Debug, Clone)]
pub struct ModelServerClientConfig {
    /// Server endpoint as `host:port`.
    pub endpoint: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
}

/// Lazy client handle for a running model server.
///
/// Holds the endpoint and timeouts; the transport channel is only built on
/// [`connect`](ModelServerClient::connect). Validation traffic itself is
/// driven by downstream components over the returned channel.
#[derive(Debug, Clone)]
pub struct ModelServerClient {
    config: ModelServerClientConfig,
}

impl ModelServerClient {
    /// Create a client for the given `host:port` endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            config: ModelServerClientConfig {
                endpoint: endpoint.into(),
                connect_timeout: DEFAULT_CONNECT_TIMEOUT,
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
            },
        }
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Target URI the channel will connect to.
    pub fn target_uri(&self) -> String {
        format!("http://{}", self.config.endpoint)
    }

    /// Open a transport channel to the server.
    pub async fn connect(&self) -> Result<Channel, tonic::transport::Error> {
        debug!(endpoint = %self.config.endpoint, "Connecting to model server");
        let channel = Endpoint::from_shared(self.target_uri())?
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .connect()
            .await?;
        Ok(channel)
    }
}
