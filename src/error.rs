//! User-visible error states of the discovery controller.

/// Errors shown to the user. Neither kind is fatal; the next filter change
/// starts a fresh attempt and clears them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// One or more facet vocabularies could not be fetched
    #[error("failed to load filter options")]
    MetadataLoad { reason: String },

    /// The primary search failed or returned a non-success status
    #[error("search failed: {reason}")]
    Search { reason: String },
}

impl DiscoveryError {
    pub fn metadata(reason: impl Into<String>) -> Self {
        Self::MetadataLoad {
            reason: reason.into(),
        }
    }

    pub fn search(err: &anyhow::Error) -> Self {
        Self::Search {
            reason: format!("{err:#}"),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::MetadataLoad { reason } | Self::Search { reason } => reason,
        }
    }
}
