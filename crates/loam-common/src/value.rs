//! Dynamic value model for the Loam runtime.
//!
//! A [`Value`] is either one of the built-in scalar types or an [`Instance`]
//! of a user-registered type. Values are cheap to clone: instances are
//! shared behind an `Arc`, scalars are copied.
//!
//! Runtime callables are [`RtFn`]s: they receive the full argument slice
//! (dispatched value first) and return a new value. The protocol engine
//! stores these in its dispatch tables and type descriptors list them as
//! members.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::types::TypeId;

/// A runtime callable: the dispatched value plus remaining arguments in,
/// one value out.
pub type RtFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Wrap a closure as an [`RtFn`].
pub fn rt_fn<F>(f: F) -> RtFn
where
    F: Fn(&[Value]) -> Value + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A dynamically typed runtime value.
#[derive(Clone, Debug)]
pub enum Value {
    /// The absent value.
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// An instance of a user-registered type.
    Obj(Arc<Instance>),
}

impl Value {
    /// Create a string value.
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    /// Wrap an instance as a value.
    pub fn obj(inst: Instance) -> Value {
        Value::Obj(Arc::new(inst))
    }

    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The instance payload, if this is an `Obj`.
    pub fn as_obj(&self) -> Option<&Arc<Instance>> {
        match self {
            Value::Obj(inst) => Some(inst),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // Instances compare by identity, not structure.
            (Value::Obj(a), Value::Obj(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Obj(inst) => write!(f, "#<instance {:?}>", inst.type_id()),
        }
    }
}

/// An instance of a user-registered type: its [`TypeId`] plus a field map.
///
/// Fields are set at construction time; the instance itself is immutable
/// once wrapped in a [`Value`].
#[derive(Debug)]
pub struct Instance {
    type_id: TypeId,
    fields: FxHashMap<String, Value>,
}

impl Instance {
    /// Create a fieldless instance of the given type.
    pub fn new(type_id: TypeId) -> Instance {
        Instance {
            type_id,
            fields: FxHashMap::default(),
        }
    }

    /// Add a field (builder style).
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Instance {
        self.fields.insert(name.into(), value);
        self
    }

    /// The type this instance was constructed with.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_equality() {
        assert_eq!(Value::Int(5), Value::Int(5));
        assert_ne!(Value::Int(5), Value::Int(6));
        assert_ne!(Value::Int(5), Value::Float(5.0));
        assert_eq!(Value::str("a"), Value::Str("a".to_string()));
        assert_eq!(Value::Nil, Value::Nil);
    }

    #[test]
    fn instances_compare_by_identity() {
        let a = Value::obj(Instance::new(TypeId::INT).with_field("x", Value::Int(1)));
        let b = Value::obj(Instance::new(TypeId::INT).with_field("x", Value::Int(1)));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn instance_field_lookup() {
        let inst = Instance::new(TypeId::INT)
            .with_field("side", Value::Int(4))
            .with_field("name", Value::str("sq"));
        assert_eq!(inst.field("side"), Some(&Value::Int(4)));
        assert_eq!(inst.field("missing"), None);
    }

    #[test]
    fn rt_fn_invocation() {
        let f = rt_fn(|args| Value::Int(args.len() as i64));
        assert_eq!(f(&[Value::Nil, Value::Nil]), Value::Int(2));
    }
}
