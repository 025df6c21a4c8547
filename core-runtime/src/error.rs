use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Native runtime {runtime} failed to {action}: {source}")]
    Lifecycle {
        runtime: String,
        action: &'static str,
        #[source]
        source: bridge_traits::BridgeError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
