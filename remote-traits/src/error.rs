use thiserror::Error;

/// Errors surfaced by remote catalog gateways.
///
/// The taxonomy distinguishes transient failures (eligible for
/// caller-directed retry with backoff) from terminal ones. The engine
/// never retries silently; it only classifies.
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    #[error("Remote request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Remote service returned status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Rate limited by remote service (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("{entity_kind} {id} not found remotely")]
    NotFound { entity_kind: String, id: String },

    #[error("Concurrency token rejected for collection {collection_id}")]
    TokenRejected { collection_id: String },

    #[error("Malformed remote payload: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Whether a caller may reasonably retry the same request with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Timeout { .. } | RemoteError::RateLimited { .. } => true,
            RemoteError::Http { status, .. } => *status >= 500,
            RemoteError::NotFound { .. }
            | RemoteError::TokenRejected { .. }
            | RemoteError::Protocol(_) => false,
        }
    }

    /// Whether the failure means the requested entity is confirmed absent,
    /// as opposed to temporarily unreachable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(RemoteError::Timeout { seconds: 30 }.is_transient());
        assert!(RemoteError::RateLimited {
            retry_after_secs: Some(5)
        }
        .is_transient());
        assert!(RemoteError::Http {
            status: 503,
            message: "unavailable".into()
        }
        .is_transient());
        assert!(!RemoteError::Http {
            status: 404,
            message: "missing".into()
        }
        .is_transient());
        assert!(!RemoteError::TokenRejected {
            collection_id: "pl1".into()
        }
        .is_transient());
    }

    #[test]
    fn not_found_is_terminal() {
        let err = RemoteError::NotFound {
            entity_kind: "album".into(),
            id: "a1".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }
}
