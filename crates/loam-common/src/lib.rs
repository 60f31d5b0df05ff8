//! Shared runtime types for the Loam runtime.
//!
//! This crate holds the pieces of the object model that the rest of the
//! runtime builds on:
//!
//! - [`value`]: the dynamic [`Value`] enum, user-type instances, and the
//!   [`RtFn`] callable alias that runtime functions are expressed as
//! - [`types`]: type identity ([`TypeId`]), author-supplied type
//!   descriptors ([`TypeSpec`]), and the process-scoped [`TypeRegistry`]
//!   that answers name, member, and subclass queries
//!
//! It deliberately contains no dispatch logic; the protocol engine in
//! `loam-protocol` consumes these types through the registry interface.

pub mod types;
pub mod value;

pub use types::{TypeId, TypeRegistry, TypeSpec};
pub use value::{rt_fn, Instance, RtFn, Value};
