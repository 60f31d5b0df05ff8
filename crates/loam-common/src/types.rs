//! Type identity, descriptors, and the process-scoped type registry.
//!
//! Loam types are registered, not reflected: each type supplies a
//! [`TypeSpec`] at registration time naming its display name, its callable
//! members, its base types, and whether implementations may be attached
//! directly to it. The registry indexes direct subclasses as types are
//! registered, so subclass enumeration is a table lookup rather than a
//! host-reflection probe.
//!
//! The registry is process-wide shared state: interior `RwLock`s make all
//! queries `&self`, and registration at load time may race queries from
//! running code without tearing.

use std::fmt;

use parking_lot::RwLock;
use serde::Serialize;

use crate::value::{RtFn, Value};

/// Opaque identifier for a registered type.
///
/// Issued by [`TypeRegistry::register`]; the built-in scalar types have
/// fixed ids pre-registered by [`TypeRegistry::new`]. Ids are only
/// meaningful to the registry that issued them.
///
/// Equality and hashing are by id. The display name is looked up through
/// the registry and is not guaranteed unique across independently
/// registered types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TypeId(u32);

impl TypeId {
    /// The type of `Value::Nil`.
    pub const NIL: TypeId = TypeId(0);
    /// The type of `Value::Bool`.
    pub const BOOL: TypeId = TypeId(1);
    /// The type of `Value::Int`.
    pub const INT: TypeId = TypeId(2);
    /// The type of `Value::Float`.
    pub const FLOAT: TypeId = TypeId(3);
    /// The type of `Value::Str`.
    pub const STR: TypeId = TypeId(4);
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{}", self.0)
    }
}

/// Author-supplied descriptor for a type being registered.
///
/// The member list is the type's declared capability surface: structural
/// adoption and reflected protocol derivation both read it. Members whose
/// name starts with `_` are implementation-private and excluded from
/// [`TypeRegistry::public_members`].
pub struct TypeSpec {
    name: String,
    members: Vec<(String, RtFn)>,
    bases: Vec<TypeId>,
    attachable: bool,
}

impl TypeSpec {
    /// Start a descriptor for a type with the given display name.
    ///
    /// Types are attachable by default; built-in-like types that cannot
    /// carry attached implementations opt out with [`TypeSpec::not_attachable`].
    pub fn new(name: impl Into<String>) -> TypeSpec {
        TypeSpec {
            name: name.into(),
            members: Vec::new(),
            bases: Vec::new(),
            attachable: true,
        }
    }

    /// Declare a callable member (builder style). Declaration order is
    /// preserved.
    pub fn member(mut self, name: impl Into<String>, f: RtFn) -> TypeSpec {
        self.members.push((name.into(), f));
        self
    }

    /// Declare a base type. The new type becomes a direct subclass of
    /// every base named here.
    pub fn base(mut self, base: TypeId) -> TypeSpec {
        self.bases.push(base);
        self
    }

    /// Mark the type as unable to carry attached implementations; the
    /// protocol engine will track it in its fallback table instead.
    pub fn not_attachable(mut self) -> TypeSpec {
        self.attachable = false;
        self
    }
}

struct TypeData {
    name: String,
    members: Vec<(String, RtFn)>,
    subclasses: Vec<TypeId>,
    attachable: bool,
}

/// The process-scoped type registry.
///
/// Supplies type identity, display names, declared members, the direct
/// subclass index, and the attachability flag. All query methods take
/// ids issued by this registry; an id from a different registry is a
/// contract violation.
pub struct TypeRegistry {
    types: RwLock<Vec<TypeData>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry with the built-in scalar types pre-registered
    /// under their fixed [`TypeId`] constants.
    pub fn new() -> TypeRegistry {
        let registry = TypeRegistry {
            types: RwLock::new(Vec::new()),
        };
        for name in ["Nil", "Bool", "Int", "Float", "Str"] {
            registry.register(TypeSpec::new(name).not_attachable());
        }
        registry
    }

    /// Register a type and return its id.
    ///
    /// The new type is appended to the direct-subclass index of every
    /// base named in the spec.
    pub fn register(&self, spec: TypeSpec) -> TypeId {
        let mut types = self.types.write();
        let id = TypeId(types.len() as u32);
        for base in &spec.bases {
            types[base.0 as usize].subclasses.push(id);
        }
        types.push(TypeData {
            name: spec.name,
            members: spec.members,
            subclasses: Vec::new(),
            attachable: spec.attachable,
        });
        id
    }

    /// The runtime type of a value.
    pub fn type_of(&self, value: &Value) -> TypeId {
        match value {
            Value::Nil => TypeId::NIL,
            Value::Bool(_) => TypeId::BOOL,
            Value::Int(_) => TypeId::INT,
            Value::Float(_) => TypeId::FLOAT,
            Value::Str(_) => TypeId::STR,
            Value::Obj(inst) => inst.type_id(),
        }
    }

    /// The display name of a type.
    pub fn name(&self, id: TypeId) -> String {
        self.types.read()[id.0 as usize].name.clone()
    }

    /// Look up a declared member by exact name, private names included.
    pub fn member(&self, id: TypeId, name: &str) -> Option<RtFn> {
        self.types.read()[id.0 as usize]
            .members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f.clone())
    }

    /// The type's public members in declaration order.
    ///
    /// Members whose name starts with `_` are implementation-private and
    /// excluded.
    pub fn public_members(&self, id: TypeId) -> Vec<(String, RtFn)> {
        self.types.read()[id.0 as usize]
            .members
            .iter()
            .filter(|(n, _)| !n.starts_with('_'))
            .map(|(n, f)| (n.clone(), f.clone()))
            .collect()
    }

    /// The direct subclasses of a type, in registration order.
    pub fn direct_subclasses(&self, id: TypeId) -> Vec<TypeId> {
        self.types.read()[id.0 as usize].subclasses.clone()
    }

    /// Whether implementations may be attached directly to this type.
    pub fn supports_attach(&self, id: TypeId) -> bool {
        self.types.read()[id.0 as usize].attachable
    }
}
