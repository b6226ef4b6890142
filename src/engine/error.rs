//! Errors raised by a reconciliation pass.

use repoaccess::{ErrorCategory, InvitationId};
use thiserror::Error;

/// Why a sync pass stopped.
///
/// Every variant is fatal to the pass. Nothing is retried; re-running after
/// fixing the cause is safe because the pass is idempotent.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A desired entry is malformed. Raised before any remote call.
    #[error("invalid desired collaborator {entry}: {reason}")]
    Validation { entry: String, reason: String },

    /// The remote rejected or failed a call.
    #[error("remote access failed")]
    RemoteAccess(#[from] repoaccess::Error),

    /// An invitation was deleted so it could be re-sent with a new
    /// permission, and the re-invite failed. The principal is left with no
    /// pending invitation until the next run.
    #[error(
        "invitation {invitation} for {identity} was deleted but re-inviting failed, {identity} has no pending invitation"
    )]
    InvitationReplace {
        identity: String,
        invitation: InvitationId,
        #[source]
        source: repoaccess::Error,
    },
}

impl SyncError {
    /// The underlying remote failure, if this error came from the remote.
    pub fn remote(&self) -> Option<&repoaccess::Error> {
        match self {
            Self::RemoteAccess(source) | Self::InvitationReplace { source, .. } => Some(source),
            Self::Validation { .. } => None,
        }
    }

    /// Category of the remote failure, for operator advice.
    pub fn category(&self) -> Option<ErrorCategory> {
        self.remote().map(repoaccess::Error::category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_access_wraps_cause() {
        let err: SyncError = repoaccess::Error::http("HTTP 401", Some(401)).into();
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("HTTP 401"));
        assert_eq!(err.category(), Some(ErrorCategory::Auth));
    }

    #[test]
    fn test_invitation_replace_message_names_principal() {
        let err = SyncError::InvitationReplace {
            identity: "bob".to_string(),
            invitation: InvitationId(12),
            source: repoaccess::Error::http("HTTP 502", Some(502)),
        };
        let message = err.to_string();
        assert!(message.contains("invitation 12 for bob"));
        assert_eq!(err.remote().and_then(repoaccess::Error::status), Some(502));
        assert_eq!(err.category(), Some(ErrorCategory::Network));
    }

    #[test]
    fn test_validation_has_no_remote_cause() {
        let err = SyncError::Validation {
            entry: r#"{"identity":"","permission":"push"}"#.to_string(),
            reason: "identity is empty".to_string(),
        };
        assert!(err.remote().is_none());
        assert!(err.to_string().contains(r#"{"identity":"","permission":"push"}"#));
    }
}
