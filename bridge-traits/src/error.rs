use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// A native entry point returned a failure code.
    #[error("Native call {function} failed with code {code:#010x}")]
    NativeCall { function: &'static str, code: i32 },

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Shorthand for wrapping a raw native result code.
    pub fn native(function: &'static str, code: i32) -> Self {
        BridgeError::NativeCall { function, code }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
