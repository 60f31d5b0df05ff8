//! Structural and bulk extension: adopting declared members as protocol
//! implementations, propagating protocols down subclass hierarchies, and
//! deriving protocols from existing types.
//!
//! The [`ExtensionEngine`] ties the protocol machinery to the two
//! process-scoped registries and owns the derived-protocol index: for
//! each type used as a protocol prototype, the list of protocols derived
//! from it. Subclass propagation and cross-type adoption both consult
//! that index.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use loam_common::{TypeId, TypeRegistry};

use crate::error::ProtocolError;
use crate::namespace::{Binding, NamespaceRegistry};
use crate::protocol::{declare_protocol, Protocol};

/// The extension algorithms, bound to a type registry and a namespace
/// registry for the process's lifetime.
pub struct ExtensionEngine {
    types: Arc<TypeRegistry>,
    namespaces: Arc<NamespaceRegistry>,
    /// Protocols derived from each prototype type, in derivation order.
    derived: RwLock<FxHashMap<TypeId, Vec<Arc<Protocol>>>>,
}

impl ExtensionEngine {
    /// Create an engine over the given registries.
    pub fn new(types: Arc<TypeRegistry>, namespaces: Arc<NamespaceRegistry>) -> ExtensionEngine {
        ExtensionEngine {
            types,
            namespaces,
            derived: RwLock::new(FxHashMap::default()),
        }
    }

    /// The engine's type registry.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The engine's namespace registry.
    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    /// The protocols previously derived from `tp`, in derivation order.
    pub fn derived_protocols(&self, tp: TypeId) -> Vec<Arc<Protocol>> {
        self.derived.read().get(&tp).cloned().unwrap_or_default()
    }

    /// Structurally adopt a protocol for a type: every operation with a
    /// declared member of the same name on `tp` is extended with that
    /// member.
    ///
    /// The type is marked as an implementor regardless of how many
    /// operations matched -- even zero. Adoption declares intent to
    /// implement, not completeness.
    pub fn extend_protocol_for_class(&self, proto: &Protocol, tp: TypeId) {
        for (op, pf) in proto.functions() {
            if let Some(member) = self.types.member(tp, op) {
                pf.extend(&self.types, tp, member);
            }
        }
        proto.mark_implementor(&self.types.name(tp), tp);
    }

    /// Apply every protocol derived from `tp` to `tp` itself and to every
    /// transitive subclass reachable through the direct-subclass index.
    ///
    /// The walk is pre-order and does not deduplicate: a type reachable
    /// through several inheritance paths is visited once per path, which
    /// is redundant but safe because extension is last-write-wins. A type
    /// with no derived protocols is a no-op.
    pub fn extend_for_all_subclasses(&self, tp: TypeId) {
        for proto in self.derived_protocols(tp) {
            self.extend_subtree(&proto, tp);
        }
    }

    fn extend_subtree(&self, proto: &Arc<Protocol>, tp: TypeId) {
        self.extend_protocol_for_class(proto, tp);
        for sub in self.types.direct_subclasses(tp) {
            self.extend_subtree(proto, sub);
        }
    }

    /// Apply every protocol derived from `source` to the unrelated
    /// `target` by structural match alone.
    ///
    /// `target` needs no relationship to `source`: any declared member
    /// whose name matches an operation is adopted. A source with no
    /// derived protocols is a no-op.
    pub fn extend_for_type(&self, source: TypeId, target: TypeId) {
        for proto in self.derived_protocols(source) {
            self.extend_protocol_for_class(&proto, target);
        }
    }

    /// Derive a protocol from an existing type's public surface.
    ///
    /// The type's public members (declaration order, `_`-prefixed names
    /// excluded) become the operations of a protocol named after the
    /// type, declared in `ns`. The protocol is recorded against the type
    /// for later [`ExtensionEngine::extend_for_all_subclasses`] calls,
    /// and published into the namespace under the type's name only if
    /// that name is still unbound (first writer wins).
    pub fn protocol_from_type(&self, ns: &str, tp: TypeId) -> Result<Arc<Protocol>, ProtocolError> {
        let type_name = self.types.name(tp);
        let members = self.types.public_members(tp);
        let ops: Vec<&str> = members.iter().map(|(name, _)| name.as_str()).collect();

        let proto = declare_protocol(&self.namespaces, ns, &type_name, &ops)?;

        self.derived
            .write()
            .entry(tp)
            .or_default()
            .push(proto.clone());

        let handle = self.namespaces.find_or_create(ns);
        handle.set_if_absent(type_name, Binding::Protocol(proto.clone()));

        Ok(proto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_common::{rt_fn, TypeSpec, Value};

    fn engine() -> ExtensionEngine {
        ExtensionEngine::new(
            Arc::new(TypeRegistry::new()),
            Arc::new(NamespaceRegistry::new()),
        )
    }

    fn const_int(n: i64) -> loam_common::RtFn {
        rt_fn(move |_| Value::Int(n))
    }

    #[test]
    fn structural_adoption_matches_members() {
        let engine = engine();
        let proto =
            declare_protocol(engine.namespaces(), "shapes", "Sized", &["size", "area"]).unwrap();
        let tp = engine
            .types()
            .register(TypeSpec::new("Square").member("size", const_int(4)));

        engine.extend_protocol_for_class(&proto, tp);

        assert!(proto.function("size").unwrap().is_extended_by(tp));
        assert!(!proto.function("area").unwrap().is_extended_by(tp));
        assert!(proto.is_implementor("Square"));
    }

    #[test]
    fn zero_matches_still_marks_implementor() {
        let engine = engine();
        let proto = declare_protocol(engine.namespaces(), "shapes", "Sized", &["size"]).unwrap();
        let tp = engine.types().register(TypeSpec::new("Blob"));

        engine.extend_protocol_for_class(&proto, tp);

        assert!(!proto.function("size").unwrap().is_extended_by(tp));
        assert!(proto.is_implementor("Blob"));
    }

    #[test]
    fn derivation_records_and_publishes_once() {
        let engine = engine();
        let shape = engine.types().register(
            TypeSpec::new("Shape")
                .member("area", const_int(0))
                .member("_invalidate", const_int(0)),
        );

        let proto = engine.protocol_from_type("geo", shape).unwrap();
        assert_eq!(proto.operations(), ["area"]);
        assert_eq!(engine.derived_protocols(shape).len(), 1);

        // Published under the type name, first writer wins.
        let ns = engine.namespaces().find("geo").unwrap();
        let bound = ns.get("Shape").and_then(|b| b.as_protocol().cloned()).unwrap();
        assert!(Arc::ptr_eq(&bound, &proto));

        // A second derivation appends to the index but leaves the
        // namespace binding untouched.
        let proto2 = engine.protocol_from_type("geo", shape).unwrap();
        assert_eq!(engine.derived_protocols(shape).len(), 2);
        let still_bound = ns.get("Shape").and_then(|b| b.as_protocol().cloned()).unwrap();
        assert!(Arc::ptr_eq(&still_bound, &proto));
        assert!(!Arc::ptr_eq(&still_bound, &proto2));
    }

    #[test]
    fn derivation_of_memberless_type_is_malformed() {
        let engine = engine();
        let tp = engine.types().register(TypeSpec::new("Opaque"));
        let err = engine.protocol_from_type("geo", tp).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::EmptyDeclaration {
                protocol: "Opaque".to_string()
            }
        );
        assert!(engine.derived_protocols(tp).is_empty());
    }

    #[test]
    fn diamond_hierarchy_visits_are_safe() {
        // A <- B, A <- C, and D inherits from both B and C: D is visited
        // twice by the walk, which must be harmless.
        let engine = engine();
        let a = engine
            .types()
            .register(TypeSpec::new("A").member("size", const_int(1)));
        let b = engine.types().register(TypeSpec::new("B").base(a));
        let c = engine.types().register(TypeSpec::new("C").base(a));
        let d = engine
            .types()
            .register(TypeSpec::new("D").base(b).base(c).member("size", const_int(4)));

        let proto = engine.protocol_from_type("geo", a).unwrap();
        engine.extend_for_all_subclasses(a);

        let size = proto.function("size").unwrap();
        assert!(size.is_extended_by(a));
        assert!(size.is_extended_by(d));
        // B and C declare no members but are marked as implementors.
        assert!(proto.is_implementor("B"));
        assert!(proto.is_implementor("C"));
        assert_eq!(proto.implementor_names(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn propagation_without_derivation_is_a_no_op() {
        let engine = engine();
        let tp = engine.types().register(TypeSpec::new("Plain"));
        engine.extend_for_all_subclasses(tp);
        engine.extend_for_type(tp, tp);
        assert!(engine.derived_protocols(tp).is_empty());
    }
}
