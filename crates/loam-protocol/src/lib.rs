//! Protocol dispatch engine for the Loam runtime.
//!
//! A protocol is a named, namespace-scoped set of polymorphic operations.
//! Each operation is a [`ProtocolFn`] that dispatches on the runtime type
//! of its first argument, resolved at call time against per-type
//! extensions registered after the fact -- types need no formal
//! relationship to a protocol to implement it.
//!
//! ## Pieces
//!
//! - [`declare_protocol`] / [`Protocol`]: declaration and registration
//!   against a namespace, idempotent on redeclaration
//! - [`ProtocolFn`]: two-tier per-type dispatch (attached table, fallback
//!   table), optional default, deterministic resolution order
//! - [`ExtensionEngine`]: structural adoption of declared members,
//!   propagation down subclass hierarchies, and deriving whole protocols
//!   from an existing type's public surface
//! - [`NamespaceRegistry`]: the binding-space adapter protocols publish
//!   into
//!
//! Registries are explicit process-scoped objects passed to every
//! registration and extension call; there is no hidden global state.
//! Extension is expected at load/definition time, dispatch in steady
//! state; both are safe against each other (see the locking notes on
//! [`function`]).
//!
//! # Error Types
//!
//! - [`ProtocolError`] - declaration/derivation failures
//! - [`DispatchError`] - per-call resolution failures

#![warn(missing_docs)]

pub mod error;
pub mod extend;
pub mod function;
pub mod namespace;
pub mod protocol;

pub use error::{DispatchError, ProtocolError};
pub use extend::ExtensionEngine;
pub use function::ProtocolFn;
pub use namespace::{Binding, Namespace, NamespaceRegistry};
pub use protocol::{declare_protocol, Protocol};
