//! Protocol declaration and registration.
//!
//! A [`Protocol`] is a named, namespace-scoped bundle of
//! [`ProtocolFn`]s, declared once and extended from anywhere.
//! [`declare_protocol`] publishes one binding per operation into the
//! namespace; redeclaring a protocol whose operation names are already
//! bound reuses the existing functions, so previously registered
//! extensions survive and protocols sharing an operation name layer onto
//! the same function.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use loam_common::TypeId;

use crate::error::ProtocolError;
use crate::function::ProtocolFn;
use crate::namespace::{Binding, NamespaceRegistry};

/// A named set of polymorphic operations.
pub struct Protocol {
    ns: String,
    name: String,
    ops: Vec<String>,
    fns: FxHashMap<String, Arc<ProtocolFn>>,
    /// Implementors keyed by type display name, not identity: two types
    /// registered under the same name are treated as one implementor.
    implementors: RwLock<FxHashMap<String, TypeId>>,
}

impl Protocol {
    /// The owning namespace's name.
    pub fn namespace(&self) -> &str {
        &self.ns
    }

    /// The protocol's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared operation names, in declaration order.
    pub fn operations(&self) -> &[String] {
        &self.ops
    }

    /// The protocol function for an operation.
    pub fn function(&self, op: &str) -> Option<Arc<ProtocolFn>> {
        self.fns.get(op).cloned()
    }

    /// Iterate over `(operation, function)` pairs in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = (&str, &Arc<ProtocolFn>)> {
        self.ops
            .iter()
            .filter_map(move |op| self.fns.get(op).map(|f| (op.as_str(), f)))
    }

    /// Record a type as an implementor of this protocol.
    ///
    /// Deduplicated by display name, first writer wins: a second type
    /// sharing the name of an existing implementor is not recorded.
    pub fn mark_implementor(&self, name: &str, tp: TypeId) {
        let mut implementors = self.implementors.write();
        if implementors.contains_key(name) {
            return;
        }
        implementors.insert(name.to_string(), tp);
    }

    /// Whether a type of this display name has been recorded as an
    /// implementor.
    pub fn is_implementor(&self, name: &str) -> bool {
        self.implementors.read().contains_key(name)
    }

    /// The recorded implementor names, sorted.
    pub fn implementor_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.implementors.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Protocol<{}>", self.name)
    }
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol")
            .field("ns", &self.ns)
            .field("name", &self.name)
            .field("ops", &self.ops)
            .finish_non_exhaustive()
    }
}

/// Declare a protocol named `name` in namespace `ns` with the given
/// operations.
///
/// For each operation the namespace either already binds a protocol
/// function (which is reused) or receives a freshly published one. The
/// declaration is validated before anything is published, so a failed
/// call leaves the namespace untouched.
pub fn declare_protocol(
    namespaces: &NamespaceRegistry,
    ns: &str,
    name: &str,
    ops: &[&str],
) -> Result<Arc<Protocol>, ProtocolError> {
    if ops.is_empty() {
        return Err(ProtocolError::EmptyDeclaration {
            protocol: name.to_string(),
        });
    }
    for (i, op) in ops.iter().enumerate() {
        if ops[..i].contains(op) {
            return Err(ProtocolError::DuplicateOperation {
                protocol: name.to_string(),
                op: op.to_string(),
            });
        }
    }

    let handle = namespaces.find_or_create(ns);

    // Check every existing binding is reusable before publishing anything.
    for op in ops {
        if let Some(binding) = handle.get(op) {
            if binding.as_fn().is_none() {
                return Err(ProtocolError::BindingCollision {
                    namespace: ns.to_string(),
                    name: op.to_string(),
                });
            }
        }
    }

    let mut fns = FxHashMap::default();
    for op in ops {
        let pf = match handle.get(op).as_ref().and_then(Binding::as_fn) {
            Some(existing) => existing.clone(),
            None => {
                let created = Arc::new(ProtocolFn::new(ns, op));
                handle.set(*op, Binding::Fn(created.clone()));
                created
            }
        };
        fns.insert(op.to_string(), pf);
    }

    Ok(Arc::new(Protocol {
        ns: ns.to_string(),
        name: name.to_string(),
        ops: ops.iter().map(|op| op.to_string()).collect(),
        fns,
        implementors: RwLock::new(FxHashMap::default()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_common::{TypeRegistry, TypeSpec};

    #[test]
    fn declaration_publishes_functions() {
        let namespaces = NamespaceRegistry::new();
        let proto = declare_protocol(&namespaces, "shapes", "Sized", &["size", "area"]).unwrap();

        assert_eq!(proto.operations(), ["size", "area"]);
        assert_eq!(proto.to_string(), "Protocol<Sized>");

        let ns = namespaces.find("shapes").unwrap();
        let published = ns.get("size").and_then(|b| b.as_fn().cloned()).unwrap();
        let owned = proto.function("size").unwrap();
        assert!(Arc::ptr_eq(&published, &owned));
        assert_eq!(owned.qualified_name(), "shapes/size");
    }

    #[test]
    fn redeclaration_reuses_existing_functions() {
        let namespaces = NamespaceRegistry::new();
        let first = declare_protocol(&namespaces, "shapes", "Sized", &["size"]).unwrap();
        let second = declare_protocol(&namespaces, "shapes", "Sized2", &["size", "area"]).unwrap();

        // The shared operation resolves to the same function object.
        assert!(Arc::ptr_eq(
            &first.function("size").unwrap(),
            &second.function("size").unwrap()
        ));
        // The new operation got a fresh one.
        assert!(second.function("area").is_some());
    }

    #[test]
    fn empty_declaration_rejected() {
        let namespaces = NamespaceRegistry::new();
        let err = declare_protocol(&namespaces, "shapes", "Sized", &[]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::EmptyDeclaration {
                protocol: "Sized".to_string()
            }
        );
        // Nothing was created as a side effect.
        assert!(namespaces.find("shapes").is_none());
    }

    #[test]
    fn duplicate_operation_rejected() {
        let namespaces = NamespaceRegistry::new();
        let err = declare_protocol(&namespaces, "shapes", "Sized", &["size", "size"]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::DuplicateOperation {
                protocol: "Sized".to_string(),
                op: "size".to_string()
            }
        );
    }

    #[test]
    fn non_function_binding_collides() {
        let namespaces = NamespaceRegistry::new();
        let first = declare_protocol(&namespaces, "shapes", "Sized", &["size"]).unwrap();
        let ns = namespaces.find_or_create("shapes");
        ns.set("area", Binding::Protocol(first));

        let err = declare_protocol(&namespaces, "shapes", "Area", &["perimeter", "area"])
            .unwrap_err();
        assert_eq!(
            err,
            ProtocolError::BindingCollision {
                namespace: "shapes".to_string(),
                name: "area".to_string()
            }
        );
        // Validation happens before publication: `perimeter` was not bound.
        assert!(!ns.contains("perimeter"));
    }

    #[test]
    fn implementors_keyed_by_display_name() {
        let namespaces = NamespaceRegistry::new();
        let types = TypeRegistry::new();
        let proto = declare_protocol(&namespaces, "shapes", "Sized", &["size"]).unwrap();

        let a = types.register(TypeSpec::new("Thing"));
        let b = types.register(TypeSpec::new("Thing"));

        proto.mark_implementor(&types.name(a), a);
        proto.mark_implementor(&types.name(b), b);

        // Same display name: one entry, first writer wins.
        assert_eq!(proto.implementor_names(), vec!["Thing"]);
        assert!(proto.is_implementor("Thing"));
        assert!(!proto.is_implementor("Other"));
    }
}
