// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Metadata tree for one header and its structural merge.
//!
//! A [`Node`] is a closed set of declaration kinds. Scopes (namespaces and
//! classes) own their nested scopes in `children`; class members live in
//! access-partitioned lists on [`ClassNode`].
//!
//! Invariants after [`record_into`]/[`merge`]:
//! - siblings in a scope are unique by `(name, kind)`, in first-seen order;
//! - only namespaces, classes and enums appear as scope children;
//! - two different enums with the same name never coalesce (merge fails).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attrs::ReflAttributes;

/// C++ member access specifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    /// `public:`
    Public,
    /// `protected:`
    Protected,
    /// `private:`
    Private,
}

/// Three ordered lists partitioned by access specifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLists<T> {
    /// Public entries, declaration order.
    pub public: Vec<T>,
    /// Protected entries, declaration order.
    pub protected: Vec<T>,
    /// Private entries, declaration order.
    pub private: Vec<T>,
}

impl<T> Default for AccessLists<T> {
    fn default() -> Self {
        Self {
            public: Vec::new(),
            protected: Vec::new(),
            private: Vec::new(),
        }
    }
}

impl<T> AccessLists<T> {
    /// Append `item` to the partition for `access`.
    pub fn push(&mut self, access: Access, item: T) {
        self.partition_mut(access).push(item);
    }

    /// Entries declared with `access`.
    pub fn get(&self, access: Access) -> &[T] {
        match access {
            Access::Public => &self.public,
            Access::Protected => &self.protected,
            Access::Private => &self.private,
        }
    }

    /// Total entry count across partitions.
    pub fn len(&self) -> usize {
        self.public.len() + self.protected.len() + self.private.len()
    }

    /// True when every partition is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn partition_mut(&mut self, access: Access) -> &mut Vec<T> {
        match access {
            Access::Public => &mut self.public,
            Access::Protected => &mut self.protected,
            Access::Private => &mut self.private,
        }
    }
}

impl<T: PartialEq> AccessLists<T> {
    /// Concatenate `other` partition-wise, skipping entries already present.
    fn absorb(&mut self, other: Self) {
        for (access, items) in [
            (Access::Public, other.public),
            (Access::Protected, other.protected),
            (Access::Private, other.private),
        ] {
            let dst = self.partition_mut(access);
            for item in items {
                if !dst.contains(&item) {
                    dst.push(item);
                }
            }
        }
    }
}

/// Kind tag of a [`Node`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// [`NamespaceNode`]
    Namespace,
    /// [`ClassNode`]
    Class,
    /// [`EnumNode`]
    Enum,
    /// [`VariableNode`]
    Variable,
    /// [`FunctionNode`]
    Function,
    /// [`ConstructorNode`]
    Constructor,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::Variable => "variable",
            Self::Function => "function",
            Self::Constructor => "constructor",
        };
        f.write_str(label)
    }
}

/// Structural merge failure. Always fatal for a run.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MergeError {
    /// Two nodes with the same name but different kinds.
    #[error("cannot merge {incoming} `{name}` into {target} `{name}`")]
    KindMismatch {
        /// Shared name.
        name: String,
        /// Kind already recorded.
        target: NodeKind,
        /// Kind being merged in.
        incoming: NodeKind,
    },
    /// Two differing declarations of a kind that never merges (enums).
    #[error("conflicting {kind} declarations named `{name}`")]
    Conflict {
        /// Shared name.
        name: String,
        /// Kind of both declarations.
        kind: NodeKind,
    },
    /// A member-level node was placed directly in a scope's children.
    #[error("{kind} `{name}` cannot be a scope child")]
    NotAScopeChild {
        /// Offending node name.
        name: String,
        /// Offending kind.
        kind: NodeKind,
    },
}

/// `namespace name { ... }`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceNode {
    /// Namespace name; empty for the file root and anonymous namespaces.
    pub name: String,
    /// Effective attributes.
    pub attrs: ReflAttributes,
    /// Recorded namespaces, classes and enums, first-seen order.
    pub children: Vec<Node>,
}

impl NamespaceNode {
    /// Empty namespace with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn merge(&mut self, incoming: Self) -> Result<(), MergeError> {
        let mut all = std::mem::take(&mut self.children);
        all.extend(incoming.children);
        self.children = coalesce(all)?;
        Ok(())
    }
}

/// `struct`/`class` definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNode {
    /// Class name.
    pub name: String,
    /// Effective attributes.
    pub attrs: ReflAttributes,
    /// Data members.
    pub fields: AccessLists<VariableNode>,
    /// Member functions.
    pub methods: AccessLists<FunctionNode>,
    /// Nested enums. Never recorded as independent scope children.
    pub enums: AccessLists<EnumNode>,
    /// Constructors.
    pub ctors: AccessLists<ConstructorNode>,
    /// Recorded nested classes.
    pub children: Vec<Node>,
}

impl ClassNode {
    /// Empty class with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn merge(&mut self, incoming: Self) -> Result<(), MergeError> {
        self.fields.absorb(incoming.fields);
        self.methods.absorb(incoming.methods);
        self.enums.absorb(incoming.enums);
        self.ctors.absorb(incoming.ctors);
        let mut all = std::mem::take(&mut self.children);
        all.extend(incoming.children);
        self.children = coalesce(all)?;
        Ok(())
    }
}

/// `enum`/`enum class` definition.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumNode {
    /// Enum name.
    pub name: String,
    /// Effective attributes.
    pub attrs: ReflAttributes,
    /// Constant names in declaration order.
    pub items: Vec<String>,
}

/// Data member.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableNode {
    /// Member name as declared (e.g. `m_value`).
    pub name: String,
    /// Effective attributes.
    pub attrs: ReflAttributes,
    /// Type spelling.
    pub ty: String,
    /// `static` storage.
    pub is_static: bool,
    /// Declared inside a class body.
    pub is_member: bool,
}

/// Member function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionNode {
    /// Function name.
    pub name: String,
    /// Effective attributes.
    pub attrs: ReflAttributes,
    /// Parameter type spellings in order.
    pub params: Vec<String>,
    /// Return type spelling.
    pub return_type: String,
    /// `static` member function.
    pub is_static: bool,
    /// Full declared type, usable as a function-pointer signature.
    pub declared_type: String,
}

/// Constructor (unnamed).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorNode {
    /// Effective attributes.
    pub attrs: ReflAttributes,
    /// Parameter type spellings in order.
    pub params: Vec<String>,
}

/// One declaration in the metadata tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// Namespace scope.
    Namespace(NamespaceNode),
    /// Class scope.
    Class(ClassNode),
    /// Enum.
    Enum(EnumNode),
    /// Data member.
    Variable(VariableNode),
    /// Member function.
    Function(FunctionNode),
    /// Constructor.
    Constructor(ConstructorNode),
}

impl Node {
    /// The canonical empty tree: an unnamed namespace with no children.
    pub fn empty_root() -> Self {
        Self::Namespace(NamespaceNode::new(""))
    }

    /// Declared name; empty for constructors and the root.
    pub fn name(&self) -> &str {
        match self {
            Self::Namespace(n) => &n.name,
            Self::Class(n) => &n.name,
            Self::Enum(n) => &n.name,
            Self::Variable(n) => &n.name,
            Self::Function(n) => &n.name,
            Self::Constructor(_) => "",
        }
    }

    /// Kind tag.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Namespace(_) => NodeKind::Namespace,
            Self::Class(_) => NodeKind::Class,
            Self::Enum(_) => NodeKind::Enum,
            Self::Variable(_) => NodeKind::Variable,
            Self::Function(_) => NodeKind::Function,
            Self::Constructor(_) => NodeKind::Constructor,
        }
    }

    /// Effective attributes.
    pub fn attrs(&self) -> ReflAttributes {
        match self {
            Self::Namespace(n) => n.attrs,
            Self::Class(n) => n.attrs,
            Self::Enum(n) => n.attrs,
            Self::Variable(n) => n.attrs,
            Self::Function(n) => n.attrs,
            Self::Constructor(n) => n.attrs,
        }
    }

    /// Recorded scope children; empty for non-scope kinds.
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Namespace(n) => &n.children,
            Self::Class(n) => &n.children,
            Self::Enum(_) | Self::Variable(_) | Self::Function(_) | Self::Constructor(_) => &[],
        }
    }

    /// True when the node has no recorded scope children.
    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }

    /// Whether this node must be kept in its parent.
    ///
    /// A node is kept when it needs reflection or scripting itself, or when
    /// anything below it that emits independently of it does: recorded nested
    /// scopes and, for classes, public nested enums. Namespaces have no need of
    /// their own to satisfy.
    pub fn needs_recording(&self) -> bool {
        match self {
            Self::Namespace(n) => n.children.iter().any(Node::needs_recording),
            Self::Class(n) => {
                n.attrs.any_need()
                    || n.children.iter().any(Node::needs_recording)
                    || n.enums.public.iter().any(|e| e.attrs.any_need())
            }
            Self::Enum(n) => n.attrs.any_need(),
            Self::Variable(n) => n.attrs.any_need(),
            Self::Function(n) => n.attrs.any_need(),
            Self::Constructor(n) => n.attrs.any_need(),
        }
    }
}

/// Merge `incoming` into `target`. Both must share `(name, kind)`.
///
/// Namespaces concatenate children and coalesce duplicates recursively.
/// Classes concatenate their member partitions and coalesce nested classes.
/// Identical enums are accepted as-is; differing ones are a [`MergeError::Conflict`].
pub fn merge(target: &mut Node, incoming: Node) -> Result<(), MergeError> {
    if target.name() != incoming.name() || target.kind() != incoming.kind() {
        return Err(MergeError::KindMismatch {
            name: incoming.name().to_owned(),
            target: target.kind(),
            incoming: incoming.kind(),
        });
    }
    match (target, incoming) {
        (Node::Namespace(t), Node::Namespace(i)) => t.merge(i),
        (Node::Class(t), Node::Class(i)) => t.merge(i),
        (t, i) if *t == i => Ok(()),
        (t, _) => Err(MergeError::Conflict {
            name: t.name().to_owned(),
            kind: t.kind(),
        }),
    }
}

/// Record `node` into a scope's children.
///
/// An existing sibling with equal `(name, kind)` absorbs it in place;
/// otherwise it is appended. Namespaces without children are dropped.
pub fn record_into(children: &mut Vec<Node>, node: Node) -> Result<(), MergeError> {
    if let Node::Namespace(ns) = &node {
        if ns.children.is_empty() {
            return Ok(());
        }
    }
    let key = scope_key(&node)?;
    match children
        .iter_mut()
        .find(|c| c.kind() == key.1 && c.name() == key.0)
    {
        Some(existing) => merge(existing, node),
        None => {
            children.push(node);
            Ok(())
        }
    }
}

fn scope_key(node: &Node) -> Result<(&str, NodeKind), MergeError> {
    match node.kind() {
        NodeKind::Namespace | NodeKind::Class | NodeKind::Enum => Ok((node.name(), node.kind())),
        kind => Err(MergeError::NotAScopeChild {
            name: node.name().to_owned(),
            kind,
        }),
    }
}

/// Group by `(name, kind)` keeping first-seen order, merging each group.
fn coalesce(nodes: Vec<Node>) -> Result<Vec<Node>, MergeError> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut index: HashMap<(String, NodeKind), usize> = HashMap::new();
    for node in nodes {
        let (name, kind) = scope_key(&node)?;
        let key = (name.to_owned(), kind);
        if let Some(&slot) = index.get(&key) {
            merge(&mut out[slot], node)?;
        } else {
            index.insert(key, out.len());
            out.push(node);
        }
    }
    Ok(out)
}
