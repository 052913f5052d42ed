//! Action adapters for OmniAutomator.
//!
//! - **[`filesystem`]** -- folder, file, bulk and nested folder creation plus
//!   copy, move, rename and delete, registered into an
//!   [`ActionRegistry`](omni_kernel::ActionRegistry) by
//!   [`register_filesystem`].
//! - **[`paths`]** -- the [`Workspace`] root and its location aliases; every
//!   path is confined to the root.
//! - **[`permission`]** -- [`RulePermissionGate`], the rule-based
//!   [`PermissionGate`](omni_kernel::PermissionGate).

pub mod error;
pub mod filesystem;
pub mod paths;
pub mod permission;

pub use error::{AdapterError, Result};
pub use filesystem::{MAX_BULK_FOLDERS, register_filesystem};
pub use paths::Workspace;
pub use permission::{AccessKind, RulePermissionGate};
