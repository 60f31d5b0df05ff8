//! Error types for protocol declaration and dispatch.
//!
//! Declaration errors ([`ProtocolError`]) are fatal to the declaring call
//! and never corrupt registrations made by earlier calls. Dispatch errors
//! ([`DispatchError`]) are surfaced per call; resolution is a pure
//! function of registration state, so there is no retry path.

use std::fmt;

use serde::Serialize;

/// An error raised while declaring or deriving a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProtocolError {
    /// The declaration named no operations.
    EmptyDeclaration { protocol: String },
    /// The declaration named the same operation more than once.
    DuplicateOperation { protocol: String, op: String },
    /// The namespace already binds an operation name to something that is
    /// not a protocol function, so it cannot be reused.
    BindingCollision { namespace: String, name: String },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyDeclaration { protocol } => {
                write!(f, "protocol `{}` declares no operations", protocol)
            }
            Self::DuplicateOperation { protocol, op } => {
                write!(
                    f,
                    "protocol `{}` declares operation `{}` more than once",
                    protocol, op
                )
            }
            Self::BindingCollision { namespace, name } => {
                write!(
                    f,
                    "namespace `{}` already binds `{}` to a non-function value",
                    namespace, name
                )
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// An error raised by a protocol function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DispatchError {
    /// No attached implementation, no dispatch-table entry, and no default
    /// exist for the argument's runtime type.
    Unresolved { op: String, type_name: String },
    /// The call had no arguments to dispatch on.
    NoArguments { op: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved { op, type_name } => {
                write!(f, "no implementation of `{}` for type `{}`", op, type_name)
            }
            Self::NoArguments { op } => {
                write!(f, "`{}` called with no arguments to dispatch on", op)
            }
        }
    }
}

impl std::error::Error for DispatchError {}
