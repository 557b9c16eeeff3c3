use std::path::PathBuf;

/// Everything that can stop a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The provider could not be reached or returned something unusable.
    #[error("failed to fetch publications from {provider}: {source}")]
    FetchFailed {
        provider: String,
        source: anyhow::Error,
    },

    #[error("no publications found")]
    NoPublications,

    #[error("file {} not found", path.display())]
    DocumentNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not find publication markers in {}: {missing} is missing", path.display())]
    MarkersNotFound { path: PathBuf, missing: String },

    #[error("invalid publication markers: {reason}")]
    InvalidMarkers { reason: String },

    #[error("failed to update {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A git step failed. Whatever was written locally stays written.
    #[error("{step} failed: {detail}")]
    PublishFailed { step: String, detail: String },
}

impl SyncError {
    /// Follow-up advice printed under the error, if there is any worth giving.
    pub fn hint(&self) -> Option<String> {
        match self {
            SyncError::FetchFailed { .. } => Some(
                "make sure the Scholar ID is correct, check your internet connection, \
                 or try again in a few minutes"
                    .to_string(),
            ),
            SyncError::MarkersNotFound { .. } => Some(
                "add the start and end marker comments to the file where the publications \
                 should go"
                    .to_string(),
            ),
            SyncError::DocumentNotFound { .. } => {
                Some("run from the folder containing the page or pass --file".to_string())
            }
            SyncError::PublishFailed { step, .. } if step == "git push" => Some(
                "you may need to authenticate, lack write access, or be behind the remote; \
                 push manually with `git push`"
                    .to_string(),
            ),
            _ => None,
        }
    }
}
