use std::path::PathBuf;

/// Everything that can abort an alignment run.
///
/// Nothing here is retried; the orchestrator hands the error back as-is.
#[derive(thiserror::Error, Debug)]
pub enum AlignError {
    /// An image, cache artifact, georeference or config could not be decoded.
    #[error("cannot read {}: {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("insufficient correspondences: need {needed}, got {got}")]
    InsufficientCorrespondences { needed: usize, got: usize },

    /// RANSAC never reached the required support.
    #[error("no consensus: best sample had {best} inliers, need {needed}")]
    NoConsensus { best: usize, needed: usize },

    #[error("paired point lists differ in length ({left} vs {right})")]
    MismatchedLengths { left: usize, right: usize },

    /// A cache artifact or a report could not be written.
    #[error("cannot write {}", path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AlignError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AlignError::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
