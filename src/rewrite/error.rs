//! Rewrite failures.

use thiserror::Error;

use super::Flow;
use crate::dom::{DomError, ParseError};
use crate::fetch::FetchError;

/// Fatal errors that abort a pipeline run.
///
/// Per-item declines (unparseable URLs, refused proxy URIs, undecodable
/// images) are not errors; the affected node is left untouched.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("unable to parse content for rewriting")]
    Parse(#[from] ParseError),

    #[error("document mutation failed")]
    Dom(#[from] DomError),

    #[error("no document available after parsing")]
    MissingDocument,

    #[error("no rewrite pipeline registered for container `{container}` and flow `{flow}`")]
    NoPipeline { container: String, flow: Flow },

    #[error("visitor `{visitor}` failed: {message}")]
    Visitor {
        visitor: &'static str,
        message: String,
    },

    #[error("fetching `{url}` failed")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
}

impl RewriteError {
    pub fn visitor(visitor: &'static str, message: impl Into<String>) -> Self {
        Self::Visitor {
            visitor,
            message: message.into(),
        }
    }

    /// HTTP status to report when this error reaches a serving layer.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Fetch { .. } => 502,
            _ => 500,
        }
    }
}
