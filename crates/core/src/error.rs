//! Error types for the particle-fx core.

use thiserror::Error;

use crate::render::RenderError;

/// Errors produced by engine operations.
///
/// Everything except [`EngineError::Tick`] and [`EngineError::Render`] is a
/// configuration error: it is returned synchronously from construction or
/// rebuild, before any animation loop runs against the field.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Width or height was zero (or non-finite) when sizing a field or surface.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// The sampling density cannot produce a usable grid spacing.
    #[error("invalid density: {0}")]
    InvalidDensity(String),

    /// A configuration value was out of range or could not be parsed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The source mask could not be read back (e.g. pixel readback denied).
    #[error("source unreadable: {0}")]
    SourceUnreadable(String),

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A palette could not be constructed from the given colors.
    #[error("invalid palette: {0}")]
    InvalidPalette(String),

    /// An effect name was not recognized by the registry.
    #[error("unknown effect: {0}")]
    UnknownEffect(String),

    /// A drawing surface operation failed outside of a tick.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// A tick failed fatally and the animation loop was stopped.
    #[error("tick failed: {0}")]
    Tick(String),

    /// Filesystem or encoding failure (snapshots, image loading).
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::InvalidConfig(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_dimensions_displays_readable_message() {
        let msg = EngineError::InvalidDimensions.to_string();
        assert!(
            msg.contains("width") && msg.contains("height"),
            "expected message mentioning width and height, got: {msg}"
        );
    }

    #[test]
    fn invalid_density_includes_reason() {
        let msg = EngineError::InvalidDensity("count must be positive".into()).to_string();
        assert!(msg.contains("count must be positive"), "got: {msg}");
    }

    #[test]
    fn source_unreadable_includes_reason() {
        let msg = EngineError::SourceUnreadable("readback denied".into()).to_string();
        assert!(msg.contains("readback denied"), "got: {msg}");
    }

    #[test]
    fn unknown_effect_includes_name() {
        let msg = EngineError::UnknownEffect("sparkles".into()).to_string();
        assert!(msg.contains("sparkles"), "got: {msg}");
    }

    #[test]
    fn render_error_converts_via_from() {
        let err: EngineError = RenderError::Unavailable("context lost".into()).into();
        assert!(matches!(err, EngineError::Render(_)));
        assert!(err.to_string().contains("context lost"));
    }

    #[test]
    fn serde_json_error_becomes_invalid_config() {
        let bad = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err = EngineError::from(bad);
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn engine_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
    }

    #[test]
    fn engine_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<EngineError>();
    }
}
