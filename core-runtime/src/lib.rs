//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the transcoding core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Reference-counted native runtime lifecycle
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the adapter crates depend on. It
//! establishes the logging conventions and owns the startup/shutdown
//! bookkeeping of the native media runtime, so several independent adapters
//! can share one runtime without a hidden global.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, CoreRuntime};
pub use error::{Error, Result};
pub use lifecycle::{RuntimeGuard, RuntimeLifecycle};
