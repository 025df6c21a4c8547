//! Process-wide native runtime hooks.
//!
//! Some native media stacks must be started before any transform is created
//! and shut down after the last one is released. The core wraps this trait in
//! a reference-counted lifecycle; implementations only perform the raw calls.

use crate::error::Result;

/// Startup/shutdown entry points of a native media runtime.
pub trait NativeRuntime: Send + Sync {
    /// Human-readable backend name used in logs.
    fn name(&self) -> &str;

    /// Initialize the native runtime.
    fn startup(&self) -> Result<()>;

    /// Release the native runtime.
    fn shutdown(&self) -> Result<()>;
}

/// Runtime for backends that need no global initialization.
#[derive(Debug, Clone, Default)]
pub struct NoopRuntime;

impl NativeRuntime for NoopRuntime {
    fn name(&self) -> &str {
        "noop"
    }

    fn startup(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
