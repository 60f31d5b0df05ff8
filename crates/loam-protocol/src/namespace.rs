//! Namespace registry: named binding spaces for protocols and their
//! functions.
//!
//! A [`Namespace`] maps attribute names to typed [`Binding`]s. Protocol
//! declaration publishes one binding per operation; reflected derivation
//! additionally publishes the protocol itself under the source type's
//! name. Namespaces live for the process's duration inside the
//! [`NamespaceRegistry`] and are shared handles: lookups return `Arc`s,
//! mutation goes through an interior `RwLock`.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::function::ProtocolFn;
use crate::protocol::Protocol;

/// A value published into a namespace.
#[derive(Clone)]
pub enum Binding {
    /// A polymorphic operation, published under its operation name.
    Fn(Arc<ProtocolFn>),
    /// A protocol, published under its protocol name.
    Protocol(Arc<Protocol>),
}

impl Binding {
    /// The protocol function, if this binding is one.
    pub fn as_fn(&self) -> Option<&Arc<ProtocolFn>> {
        match self {
            Binding::Fn(f) => Some(f),
            _ => None,
        }
    }

    /// The protocol, if this binding is one.
    pub fn as_protocol(&self) -> Option<&Arc<Protocol>> {
        match self {
            Binding::Protocol(p) => Some(p),
            _ => None,
        }
    }
}

/// A named binding space.
pub struct Namespace {
    name: String,
    bindings: RwLock<FxHashMap<String, Binding>>,
}

impl Namespace {
    fn new(name: impl Into<String>) -> Namespace {
        Namespace {
            name: name.into(),
            bindings: RwLock::new(FxHashMap::default()),
        }
    }

    /// The namespace's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a binding.
    pub fn get(&self, attr: &str) -> Option<Binding> {
        self.bindings.read().get(attr).cloned()
    }

    /// Publish a binding, replacing any previous one under that name.
    pub fn set(&self, attr: impl Into<String>, binding: Binding) {
        self.bindings.write().insert(attr.into(), binding);
    }

    /// Publish a binding only if the name is unbound. Returns whether the
    /// binding was installed (first writer wins).
    pub fn set_if_absent(&self, attr: impl Into<String>, binding: Binding) -> bool {
        let mut bindings = self.bindings.write();
        let attr = attr.into();
        if bindings.contains_key(&attr) {
            return false;
        }
        bindings.insert(attr, binding);
        true
    }

    /// Whether the name is bound.
    pub fn contains(&self, attr: &str) -> bool {
        self.bindings.read().contains_key(attr)
    }
}

/// The process-scoped namespace registry.
pub struct NamespaceRegistry {
    spaces: RwLock<FxHashMap<String, Arc<Namespace>>>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceRegistry {
    /// Create an empty registry.
    pub fn new() -> NamespaceRegistry {
        NamespaceRegistry {
            spaces: RwLock::new(FxHashMap::default()),
        }
    }

    /// Resolve a namespace, creating it on first reference.
    pub fn find_or_create(&self, name: &str) -> Arc<Namespace> {
        let mut spaces = self.spaces.write();
        spaces
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Namespace::new(name)))
            .clone()
    }

    /// Look up an existing namespace without creating it.
    pub fn find(&self, name: &str) -> Option<Arc<Namespace>> {
        self.spaces.read().get(name).cloned()
    }
}
