/// Errors that stop the server from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] audiograb::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_bind() {
        let e = ServerError::Bind {
            addr: "0.0.0.0:80".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(e.to_string(), "failed to bind 0.0.0.0:80: denied");
    }

    #[test]
    fn test_error_from_config() {
        let e: ServerError = audiograb::Error::InvalidOption("bad".into()).into();
        assert!(matches!(e, ServerError::Config(_)));
        assert_eq!(e.to_string(), "invalid configuration: invalid option: bad");
    }
}
