//! Error types for the event dispatcher

/// Errors raised while registering listeners or dispatching events
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// A registration argument was rejected
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A listener reported a failure while handling an event
    #[error("Listener failed on '{event_type}': {message}")]
    ListenerFailed {
        /// Type of the event being handled
        event_type: String,
        /// Failure reported by the listener
        message: String,
    },
}

impl EventError {
    /// Shorthand for listeners reporting a failure.
    pub fn listener_failed(event_type: impl Into<String>, message: impl Into<String>) -> Self {
        EventError::ListenerFailed {
            event_type: event_type.into(),
            message: message.into(),
        }
    }
}

/// Errors that can occur while loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML could not be parsed
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config could not be written back as TOML
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A setting holds an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
