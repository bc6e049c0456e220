//! Error types shared across Scenecast crates.

/// Top-level error type for Scenecast operations.
#[derive(Debug, thiserror::Error)]
pub enum ScenecastError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Consistency check failed: {message}")]
    Consistency { message: String },

    #[error("Renderer error: {message}")]
    Renderer { message: String },

    #[error("Encoder error: {message}")]
    Encoder { message: String },

    #[error("Encoder input is closed")]
    EncoderClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ScenecastError.
pub type ScenecastResult<T> = Result<T, ScenecastError>;

impl ScenecastError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency {
            message: msg.into(),
        }
    }

    pub fn renderer(msg: impl Into<String>) -> Self {
        Self::Renderer {
            message: msg.into(),
        }
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder {
            message: msg.into(),
        }
    }

    /// Errors detected before any expensive resource is acquired.
    ///
    /// These are reported to the operator as configuration problems rather
    /// than as a failed capture.
    pub fn is_setup_error(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::Consistency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_classification() {
        assert!(ScenecastError::config("bad fps").is_setup_error());
        assert!(ScenecastError::consistency("wrong source").is_setup_error());
        assert!(!ScenecastError::renderer("page crashed").is_setup_error());
        assert!(!ScenecastError::EncoderClosed.is_setup_error());
    }

    #[test]
    fn test_display_includes_message() {
        let err = ScenecastError::config("Unknown output-type: \"gif\"");
        assert_eq!(
            err.to_string(),
            "Configuration error: Unknown output-type: \"gif\""
        );
    }
}
