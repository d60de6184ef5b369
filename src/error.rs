use thiserror::Error;

/// Result alias used across the crate.
pub type NamingResult<T> = Result<T, NamingError>;

#[derive(Debug, Error)]
pub enum NamingError {
    #[error("name not found: {0}")]
    NotFound(String),

    #[error("name already bound: {0}")]
    AlreadyBound(String),

    #[error("not a context: {0}")]
    NotAContext(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("no active namespace for the calling scope")]
    NoActiveScope,

    #[error("cannot build object for '{name}'")]
    BuildFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("cannot resolve link '{target}'")]
    LinkFailed {
        target: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Display: one per variant ─────────────────────────────────

    #[test]
    fn display_not_found() {
        let e = NamingError::NotFound("jdbc/ds".into());
        assert_eq!(e.to_string(), "name not found: jdbc/ds");
    }

    #[test]
    fn display_already_bound() {
        let e = NamingError::AlreadyBound("env".into());
        assert_eq!(e.to_string(), "name already bound: env");
    }

    #[test]
    fn display_not_a_context() {
        let e = NamingError::NotAContext("port".into());
        assert_eq!(e.to_string(), "not a context: port");
    }

    #[test]
    fn display_invalid_name() {
        let e = NamingError::InvalidName("empty name".into());
        assert_eq!(e.to_string(), "invalid name: empty name");
    }

    #[test]
    fn display_unsupported() {
        let e = NamingError::Unsupported("destroy_subcontext");
        assert_eq!(e.to_string(), "unsupported operation: destroy_subcontext");
    }

    #[test]
    fn display_no_active_scope() {
        assert_eq!(
            NamingError::NoActiveScope.to_string(),
            "no active namespace for the calling scope"
        );
    }

    #[test]
    fn build_failed_preserves_cause() {
        let e = NamingError::BuildFailed {
            name: "jdbc/ds".into(),
            source: anyhow::anyhow!("pool exhausted"),
        };
        assert_eq!(e.to_string(), "cannot build object for 'jdbc/ds'");
        let cause = std::error::Error::source(&e).map(|cause| cause.to_string());
        assert_eq!(cause.as_deref(), Some("pool exhausted"));
    }

    #[test]
    fn link_failed_preserves_cause() {
        let e = NamingError::LinkFailed {
            target: "shared/cache".into(),
            source: anyhow::Error::new(NamingError::NotFound("shared".into())),
        };
        assert_eq!(e.to_string(), "cannot resolve link 'shared/cache'");
        let cause = std::error::Error::source(&e).map(|cause| cause.to_string());
        assert_eq!(cause.as_deref(), Some("name not found: shared"));
    }
}
