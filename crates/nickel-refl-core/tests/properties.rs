// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Property tests for the attribute algebra and structural merge.

use nickel_refl_core::derive_identifier;
use nickel_refl_core::tree::{ClassNode, EnumNode, NamespaceNode, VariableNode};
use nickel_refl_core::{effective, merge, record_into, Access, Node, ReflAttributes};
use proptest::prelude::*;

fn attrs() -> impl Strategy<Value = ReflAttributes> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(wants_reflection, force_no_reflection, wants_script, force_no_script)| ReflAttributes {
            wants_reflection,
            force_no_reflection,
            wants_script,
            force_no_script,
        },
    )
}

/// Fold `effective` down a chain of local records, root first.
fn resolve_chain(chain: &[ReflAttributes]) -> ReflAttributes {
    chain
        .iter()
        .fold(ReflAttributes::NONE, |parent, local| effective(*local, parent))
}

proptest! {
    #[test]
    fn need_is_inherited_unless_vetoed(chain in prop::collection::vec(attrs(), 1..6)) {
        let out = resolve_chain(&chain);
        let vetoed_refl = chain.iter().any(|a| a.force_no_reflection);
        let wanted_refl = chain.iter().any(|a| a.wants_reflection);
        prop_assert_eq!(out.wants_reflection, wanted_refl && !vetoed_refl);

        let vetoed_script = chain.iter().any(|a| a.force_no_script);
        let wanted_script = chain.iter().any(|a| a.wants_script);
        prop_assert_eq!(out.wants_script, wanted_script && !vetoed_script);
    }

    #[test]
    fn veto_cannot_be_lifted_by_descendants(
        ancestors in prop::collection::vec(attrs(), 0..4),
        descendants in prop::collection::vec(attrs(), 0..4),
    ) {
        let veto = ReflAttributes { force_no_reflection: true, force_no_script: true, ..ReflAttributes::NONE };
        let mut chain = ancestors;
        chain.push(veto);
        chain.extend(descendants);
        let out = resolve_chain(&chain);
        prop_assert!(!out.wants_reflection);
        prop_assert!(!out.wants_script);
        prop_assert!(out.force_no_reflection && out.force_no_script);
    }

    #[test]
    fn resolving_against_the_root_is_idempotent(local in attrs()) {
        let once = effective(local, ReflAttributes::NONE);
        prop_assert_eq!(effective(once, ReflAttributes::NONE), once);
    }
}

const NAMES: [&str; 3] = ["alpha", "beta", "gamma"];
const FIELDS: [&str; 3] = ["m_x", "m_y", "m_z"];

fn name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(NAMES.to_vec())
}

/// Every same-named enum/class is derived from its name, so merges never conflict.
fn enum_named(name: &str) -> EnumNode {
    EnumNode {
        name: name.to_owned(),
        attrs: ReflAttributes::parse("nickel(refl)"),
        items: vec![format!("{name}_first"), format!("{name}_second")],
    }
}

fn class_named(name: &str, fields: &[&str]) -> ClassNode {
    let mut class = ClassNode::new(name);
    class.attrs = ReflAttributes::parse("nickel(refl, script)");
    for field in fields {
        class.fields.push(
            Access::Public,
            VariableNode {
                name: (*field).to_owned(),
                attrs: class.attrs,
                ty: "int".into(),
                is_static: false,
                is_member: true,
            },
        );
    }
    class
}

fn scope(name: &str, children: Vec<Node>) -> Node {
    let mut ns = NamespaceNode::new(name);
    for child in children {
        record_into(&mut ns.children, child).unwrap();
    }
    Node::Namespace(ns)
}

fn leaf() -> impl Strategy<Value = Node> {
    prop_oneof![
        name().prop_map(|n| Node::Enum(enum_named(n))),
        (name(), prop::collection::btree_set(prop::sample::select(FIELDS.to_vec()), 0..3)).prop_map(
            |(n, fields)| {
                let fields: Vec<&str> = fields.into_iter().collect();
                Node::Class(class_named(n, &fields))
            }
        ),
    ]
}

fn tree() -> impl Strategy<Value = Node> {
    let node = leaf().prop_recursive(3, 24, 4, |inner| {
        (name(), prop::collection::vec(inner, 0..4)).prop_map(|(n, kids)| scope(n, kids))
    });
    prop::collection::vec(node, 0..4).prop_map(|kids| scope("", kids))
}

/// Order-insensitive view: children sorted by key, partitions sorted by content.
fn canonical(node: &Node) -> serde_json::Value {
    let mut value = serde_json::to_value(node).unwrap();
    sort_arrays(&mut value);
    value
}

fn sort_arrays(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                sort_arrays(item);
            }
            items.sort_by_key(ToString::to_string);
        }
        serde_json::Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                // Enum item order is declaration order and must survive.
                if key != "items" {
                    sort_arrays(item);
                }
            }
        }
        _ => {}
    }
}

fn merged(mut a: Node, b: Node) -> Node {
    merge(&mut a, b).unwrap();
    a
}

proptest! {
    #[test]
    fn merge_is_idempotent(a in tree()) {
        let twice = merged(a.clone(), a.clone());
        prop_assert_eq!(canonical(&twice), canonical(&a));
    }

    #[test]
    fn merge_is_commutative(a in tree(), b in tree()) {
        let ab = merged(a.clone(), b.clone());
        let ba = merged(b, a);
        prop_assert_eq!(canonical(&ab), canonical(&ba));
    }

    #[test]
    fn merge_is_associative(a in tree(), b in tree(), c in tree()) {
        let left = merged(merged(a.clone(), b.clone()), c.clone());
        let right = merged(a, merged(b, c));
        prop_assert_eq!(canonical(&left), canonical(&right));
    }

    #[test]
    fn identifiers_are_stable_and_separator_free(
        parts in prop::collection::vec("[a-z][a-z0-9_]{0,6}", 1..5),
        prefix in prop::sample::select(vec!["", "./", "../"]),
    ) {
        let path = format!("{prefix}{}.hpp", parts.join("/"));
        let id = derive_identifier(&path);
        prop_assert_eq!(&id, &derive_identifier(&format!("{}.hpp", parts.join("/"))));
        prop_assert!(!id.contains('/') && !id.contains('.'));
        prop_assert_eq!(id, parts.join("_"));
    }
}
