//! Authoritative in-process session directory.
//!
//! [`SessionRegistry`] owns the live `Session` objects of this process and
//! falls back to the shared cache for sessions created elsewhere. Call sites
//! depend on the [`SessionDirectory`] trait so the backing store can be swapped.

pub mod session_registry;

pub use session_registry::{SessionDirectory, SessionRegistry, SessionRegistryBuilder};
