//! Trained-model artifact consumed by the runner.

use std::path::{Path, PathBuf};

/// Reference to an exported, trained model on the local filesystem.
///
/// Produced by the surrounding pipeline (the trainer writes it, the
/// validation step reads it). The runner mounts `uri` read-only into the
/// serving container at the binary kind's model base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    uri: PathBuf,
}

impl ModelArtifact {
    /// Create an artifact reference from the exported model directory.
    pub fn new(uri: impl Into<PathBuf>) -> Self {
        Self { uri: uri.into() }
    }

    /// Filesystem path of the exported model.
    pub fn uri(&self) -> &Path {
        &self.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_roundtrip() {
        let model = ModelArtifact::new("/tmp/pipeline/trainer/current");
        assert_eq!(model.uri(), Path::new("/tmp/pipeline/trainer/current"));
    }
}
