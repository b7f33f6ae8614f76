use thiserror::Error;

use crate::content::LoadError;

/// Fatal failures while building a session tree. Any error in a child
/// rejects the whole subtree; the non-fatal conditions (missing lookups,
/// out-of-range cursor moves) are logged instead and degrade to `None` or
/// a no-op.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A loaded document was structurally unusable for the node it was
    /// meant to configure.
    #[error("invalid options for {0}")]
    InvalidOptions(&'static str),

    #[error("could not load '{locator}': {source}")]
    Load {
        locator: String,
        source: LoadError,
    },

    #[error("could not parse '{locator}': {reason}")]
    Parse { locator: String, reason: String },

    /// Script sources are never evaluated. Behaviors are registered with a
    /// [`crate::registry::BehaviorRegistry`] up front and referenced by
    /// name from structured documents.
    #[error("script source '{0}' cannot be evaluated; register behaviors by name instead")]
    Script(String),
}

impl SessionError {
    pub(crate) fn load(locator: impl Into<String>, source: LoadError) -> Self {
        Self::Load {
            locator: locator.into(),
            source,
        }
    }

    pub(crate) fn parse(locator: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }
}
