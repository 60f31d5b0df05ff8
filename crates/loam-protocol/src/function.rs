//! Protocol functions: named operations that dispatch on the runtime type
//! of their first argument.
//!
//! A [`ProtocolFn`] owns two per-type implementation tables plus an
//! optional default:
//!
//! - the **attached** table holds implementations for types that support
//!   carrying them directly (the highest-precedence, latest-bound form of
//!   extension)
//! - the **dispatch** table is the fallback tier for types that cannot
//!   (built-in scalars and anything registered `not_attachable`)
//!
//! [`ProtocolFn::extend`] routes a type to exactly one tier based on its
//! registered attachability, so a type never occupies both resolution
//! paths. Resolution order is fixed: attached, then dispatch table, then
//! default, then error.
//!
//! ## Locking
//!
//! Each table sits behind its own `RwLock`. Extension takes a write lock;
//! dispatch takes read locks and clones the resolved `Arc` out before
//! invoking, so a call racing a concurrent extension sees the table state
//! before or after the write, never a torn entry, and never holds a lock
//! across user code.

use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use loam_common::{RtFn, TypeId, TypeRegistry, Value};

use crate::error::DispatchError;

/// One polymorphic operation within a protocol.
pub struct ProtocolFn {
    qualified_name: String,
    op: String,
    attached: RwLock<FxHashMap<TypeId, RtFn>>,
    table: RwLock<FxHashMap<TypeId, RtFn>>,
    default: RwLock<Option<RtFn>>,
}

/// Outcome of implementation lookup for one call, in precedence order.
enum Resolution {
    Attached(RtFn),
    Table(RtFn),
    Default(RtFn),
    Missing,
}

impl ProtocolFn {
    /// Create an operation named `op`, qualified by its owning namespace.
    pub fn new(ns: &str, op: &str) -> ProtocolFn {
        ProtocolFn {
            qualified_name: format!("{}/{}", ns, op),
            op: op.to_string(),
            attached: RwLock::new(FxHashMap::default()),
            table: RwLock::new(FxHashMap::default()),
            default: RwLock::new(None),
        }
    }

    /// The unqualified operation name.
    pub fn op(&self) -> &str {
        &self.op
    }

    /// The namespace-qualified name (`"ns/op"`), as surfaced in errors.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Register an implementation for a type.
    ///
    /// Types that support attachment land in the attached tier, everything
    /// else in the dispatch table. Re-extending the same type replaces its
    /// previous implementation (last write wins).
    pub fn extend(&self, types: &TypeRegistry, tp: TypeId, f: RtFn) {
        if types.supports_attach(tp) {
            self.attached.write().insert(tp, f);
        } else {
            self.table.write().insert(tp, f);
        }
    }

    /// Register the same implementation for each of the given types.
    pub fn extend_for_types(&self, types: &TypeRegistry, tps: &[TypeId], f: RtFn) {
        for &tp in tps {
            self.extend(types, tp, f.clone());
        }
    }

    /// Set the fallback implementation, replacing any previous default.
    pub fn set_default(&self, f: RtFn) {
        *self.default.write() = Some(f);
    }

    /// Whether the type has an implementation in either tier.
    ///
    /// A pure membership check: never invokes an implementation and never
    /// consults the default.
    pub fn is_extended_by(&self, tp: TypeId) -> bool {
        self.attached.read().contains_key(&tp) || self.table.read().contains_key(&tp)
    }

    fn resolve(&self, tp: TypeId) -> Resolution {
        if let Some(f) = self.attached.read().get(&tp) {
            return Resolution::Attached(f.clone());
        }
        if let Some(f) = self.table.read().get(&tp) {
            return Resolution::Table(f.clone());
        }
        if let Some(f) = self.default.read().as_ref() {
            return Resolution::Default(f.clone());
        }
        Resolution::Missing
    }

    /// Dispatch a call on the runtime type of `args[0]`.
    ///
    /// Exactly one resolution branch fires per call; a miss reports the
    /// qualified operation name and the failing type.
    pub fn call(&self, types: &TypeRegistry, args: &[Value]) -> Result<Value, DispatchError> {
        let first = args.first().ok_or_else(|| DispatchError::NoArguments {
            op: self.qualified_name.clone(),
        })?;
        let tp = types.type_of(first);
        match self.resolve(tp) {
            Resolution::Attached(f) | Resolution::Table(f) | Resolution::Default(f) => Ok(f(args)),
            Resolution::Missing => Err(DispatchError::Unresolved {
                op: self.qualified_name.clone(),
                type_name: types.name(tp),
            }),
        }
    }
}

impl fmt::Display for ProtocolFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtocolFn<{}>", self.qualified_name)
    }
}
