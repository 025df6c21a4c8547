//! Workspace facade crate.
//!
//! Re-exports the workspace crates under one name so host applications can
//! depend on `wavebridge-workspace` and toggle the decoder backend through a
//! single feature flag.

pub use bridge_traits as bridge;
pub use core_runtime as runtime;
pub use core_transcode as transcode;
