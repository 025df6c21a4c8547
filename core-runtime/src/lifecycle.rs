//! # Native Runtime Lifecycle
//!
//! Reference-counted startup/shutdown of a [`NativeRuntime`].
//!
//! Adapters call [`RuntimeLifecycle::acquire`] when they open a native
//! transform and keep the returned [`RuntimeGuard`] for as long as the
//! transform lives. The runtime is started by the first acquisition and shut
//! down when the last guard drops.
//!
//! Hosts that prefer to keep the runtime alive between adapters call
//! [`startup`](RuntimeLifecycle::startup) explicitly. An explicit startup pins
//! the runtime until [`shutdown`](RuntimeLifecycle::shutdown) is called; if
//! guards are still alive at that point, the shutdown happens when the last of
//! them drops.
//!
//! Each `RuntimeLifecycle` is an ordinary value. Independent lifecycles (for
//! example one per test) never observe each other.

use crate::error::{Error, Result};
use bridge_traits::runtime::NativeRuntime;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct LifecycleState {
    started: bool,
    pinned: bool,
    guards: usize,
}

/// Reference-counted owner of a native runtime.
pub struct RuntimeLifecycle {
    runtime: Arc<dyn NativeRuntime>,
    state: Mutex<LifecycleState>,
}

impl fmt::Debug for RuntimeLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RuntimeLifecycle")
            .field("runtime", &self.runtime.name())
            .field("started", &state.started)
            .field("pinned", &state.pinned)
            .field("guards", &state.guards)
            .finish()
    }
}

impl RuntimeLifecycle {
    pub fn new(runtime: Arc<dyn NativeRuntime>) -> Arc<Self> {
        Arc::new(Self {
            runtime,
            state: Mutex::new(LifecycleState::default()),
        })
    }

    /// Start the runtime and keep it running until [`shutdown`](Self::shutdown).
    ///
    /// Idempotent.
    pub fn startup(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.start_locked(&mut state)?;
        state.pinned = true;
        Ok(())
    }

    /// Release an explicit startup.
    ///
    /// Shuts the runtime down immediately when no guard is alive, otherwise
    /// when the last guard drops. Idempotent.
    pub fn shutdown(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.pinned = false;
        if state.guards > 0 {
            debug!(
                runtime = self.runtime.name(),
                guards = state.guards,
                "Shutdown deferred until active guards are released"
            );
            return Ok(());
        }
        self.stop_locked(&mut state)
    }

    /// Acquire a reference to the running runtime, starting it if needed.
    pub fn acquire(self: &Arc<Self>) -> Result<RuntimeGuard> {
        let mut state = self.state.lock();
        self.start_locked(&mut state)?;
        state.guards += 1;
        debug!(runtime = self.runtime.name(), guards = state.guards, "Runtime acquired");
        Ok(RuntimeGuard {
            lifecycle: Arc::clone(self),
        })
    }

    /// Returns `true` while the native runtime is started.
    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Number of live guards.
    pub fn active_guards(&self) -> usize {
        self.state.lock().guards
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.guards = state.guards.saturating_sub(1);
        debug!(runtime = self.runtime.name(), guards = state.guards, "Runtime released");
        if state.guards == 0 && !state.pinned {
            if let Err(err) = self.stop_locked(&mut state) {
                warn!("Native runtime shutdown failed: {}", err);
            }
        }
    }

    fn start_locked(&self, state: &mut LifecycleState) -> Result<()> {
        if state.started {
            return Ok(());
        }
        self.runtime.startup().map_err(|source| Error::Lifecycle {
            runtime: self.runtime.name().to_string(),
            action: "start",
            source,
        })?;
        state.started = true;
        info!(runtime = self.runtime.name(), "Native runtime started");
        Ok(())
    }

    fn stop_locked(&self, state: &mut LifecycleState) -> Result<()> {
        if !state.started {
            return Ok(());
        }
        // Mark stopped first so a failing shutdown is never retried.
        state.started = false;
        self.runtime.shutdown().map_err(|source| Error::Lifecycle {
            runtime: self.runtime.name().to_string(),
            action: "shut down",
            source,
        })?;
        info!(runtime = self.runtime.name(), "Native runtime shut down");
        Ok(())
    }
}

/// Keeps the native runtime started while alive.
#[must_use = "the runtime may shut down as soon as the guard is dropped"]
pub struct RuntimeGuard {
    lifecycle: Arc<RuntimeLifecycle>,
}

impl RuntimeGuard {
    pub fn lifecycle(&self) -> &Arc<RuntimeLifecycle> {
        &self.lifecycle
    }
}

impl fmt::Debug for RuntimeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeGuard")
            .field("runtime", &self.lifecycle.runtime.name())
            .finish()
    }
}

impl Drop for RuntimeGuard {
    fn drop(&mut self) {
        self.lifecycle.release();
    }
}
