//! # Core Configuration Module
//!
//! Builder for the runtime dependencies of the transcoding core.
//!
//! ## Overview
//!
//! A `CoreConfig` holds the injected native runtime and the optional logging
//! setup. The builder fails fast when the native runtime is missing, so a
//! misconfigured host is caught before the first adapter is opened.
//!
//! ## Required Dependencies
//!
//! - `NativeRuntime` - Startup/shutdown hooks of the native media stack
//!   (use [`NoopRuntime`](bridge_traits::NoopRuntime) for pure-Rust backends)
//!
//! ## Optional Dependencies
//!
//! - `LoggingConfig` - Installs the global tracing subscriber when present
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, CoreRuntime};
//! use bridge_traits::NoopRuntime;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .native_runtime(Arc::new(NoopRuntime))
//!     .build()
//!     .expect("Failed to build config");
//!
//! let runtime = CoreRuntime::new(config)?;
//! let _guard = runtime.lifecycle().acquire()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing native runtime
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing native runtime");
//! ```

use crate::error::{Error, Result};
use crate::lifecycle::RuntimeLifecycle;
use crate::logging::{init_logging, LoggingConfig};
use bridge_traits::runtime::NativeRuntime;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Runtime dependencies of the transcoding core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Native media runtime (required)
    pub native_runtime: Arc<dyn NativeRuntime>,

    /// Logging setup (optional; logging is left untouched when absent)
    pub logging: Option<LoggingConfig>,

    /// Start the native runtime eagerly in [`CoreRuntime::new`]
    pub eager_startup: bool,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("native_runtime", &self.native_runtime.name())
            .field("logging", &self.logging)
            .field("eager_startup", &self.eager_startup)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    native_runtime: Option<Arc<dyn NativeRuntime>>,
    logging: Option<LoggingConfig>,
    eager_startup: bool,
}

impl CoreConfigBuilder {
    pub fn native_runtime(mut self, runtime: Arc<dyn NativeRuntime>) -> Self {
        self.native_runtime = Some(runtime);
        self
    }

    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Start the native runtime as soon as the [`CoreRuntime`] is created
    /// instead of on first acquisition.
    pub fn eager_startup(mut self, enable: bool) -> Self {
        self.eager_startup = enable;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] when no native runtime was provided.
    pub fn build(self) -> Result<CoreConfig> {
        let native_runtime = self.native_runtime.ok_or_else(|| Error::CapabilityMissing {
            capability: "NativeRuntime".to_string(),
            message: "No native runtime provided. Pass the platform media runtime, \
                      or NoopRuntime for backends that need no global initialization."
                .to_string(),
        })?;

        Ok(CoreConfig {
            native_runtime,
            logging: self.logging,
            eager_startup: self.eager_startup,
        })
    }
}

/// Initialized runtime: logging installed and native lifecycle owned.
pub struct CoreRuntime {
    config: CoreConfig,
    lifecycle: Arc<RuntimeLifecycle>,
}

impl CoreRuntime {
    /// Install logging (if configured) and wrap the native runtime in a
    /// lifecycle.
    pub fn new(config: CoreConfig) -> Result<Self> {
        if let Some(logging) = config.logging.clone() {
            init_logging(logging)?;
        }

        let lifecycle = RuntimeLifecycle::new(Arc::clone(&config.native_runtime));
        if config.eager_startup {
            lifecycle.startup()?;
        }

        info!(
            runtime = config.native_runtime.name(),
            eager = config.eager_startup,
            "Core runtime initialized"
        );

        Ok(Self { config, lifecycle })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> &Arc<RuntimeLifecycle> {
        &self.lifecycle
    }

    /// Release an eager startup. Adapters still holding guards keep the
    /// runtime alive until they are dropped.
    pub fn shutdown(&self) -> Result<()> {
        self.lifecycle.shutdown()
    }
}

impl fmt::Debug for CoreRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreRuntime")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}
