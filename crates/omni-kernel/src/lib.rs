//! OmniAutomator kernel.
//!
//! This crate holds the narrow seams the automation pipeline talks through:
//!
//! - **[`action`]** -- the blocking [`ActionExecutor`] contract, the
//!   [`Executable`] capability trait, and request/outcome types.
//! - **[`registry`]** -- concurrent [`ActionRegistry`] mapping action names to
//!   executables using [`DashMap`](dashmap::DashMap); fails closed on unknown
//!   actions.
//! - **[`permission`]** -- the [`PermissionGate`] consulted before each step.
//! - **[`pattern`]** -- ordered regex [`PatternTable`]s and aho-corasick
//!   [`PhraseSet`]s that back every text grammar.
//! - **[`progress`]** -- publish/subscribe [`ProgressBus`] backed by
//!   [`tokio::sync::broadcast`].
//! - **[`error`]** -- Unified kernel error types via [`thiserror`].
//!
//! All public types are `Send + Sync` and designed for use within a
//! multi-threaded tokio runtime.

pub mod action;
pub mod error;
pub mod pattern;
pub mod permission;
pub mod progress;
pub mod registry;

// Re-export the most commonly used types at the crate root for convenience.
pub use action::{ActionExecutor, ActionOutcome, ActionOutput, ActionRequest, Executable, Params};
pub use error::{KernelError, Result};
pub use pattern::{PatternTable, PhraseSet};
pub use permission::{AllowAll, PermissionGate};
pub use progress::{ProgressBus, ProgressEvent};
pub use registry::{ActionInfo, ActionRegistry};
