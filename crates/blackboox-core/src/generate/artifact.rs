//! Generated files and their all-or-nothing commit.

use crate::error::GenerationWriteError;
use blackboox_util::fs::{same_contents, StagedFile};
use std::path::{Path, PathBuf};

/// One generated file: absolute destination plus full contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Outcome of [`ArtifactSet::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Files whose contents changed, in set order.
    pub written: Vec<PathBuf>,
    /// Files already holding the rendered contents.
    pub unchanged: usize,
}

/// Artifacts rendered from one registry snapshot.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    artifacts: Vec<Artifact>,
}

impl ArtifactSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    pub fn extend(&mut self, other: ArtifactSet) {
        self.artifacts.extend(other.artifacts);
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Write every changed artifact.
    ///
    /// All new contents are staged next to their destinations first; only
    /// when every stage succeeded are they renamed into place. A staging
    /// failure removes the temp files and leaves every destination as it was.
    pub fn commit(&self) -> Result<CommitSummary, GenerationWriteError> {
        let mut summary = CommitSummary::default();
        let mut staged = Vec::new();

        for artifact in &self.artifacts {
            if same_contents(&artifact.path, artifact.contents.as_bytes()) {
                summary.unchanged += 1;
                continue;
            }
            let stage = StagedFile::stage(&artifact.path, artifact.contents.as_bytes()).map_err(
                |source| GenerationWriteError {
                    path: artifact.path.clone(),
                    source,
                },
            )?;
            staged.push(stage);
        }

        for stage in staged {
            let path = stage.target().to_path_buf();
            stage
                .commit()
                .map_err(|source| GenerationWriteError {
                    path: path.clone(),
                    source,
                })?;
            summary.written.push(path);
        }

        Ok(summary)
    }
}

impl IntoIterator for ArtifactSet {
    type Item = Artifact;
    type IntoIter = std::vec::IntoIter<Artifact>;

    fn into_iter(self) -> Self::IntoIter {
        self.artifacts.into_iter()
    }
}
