// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Emission planning: canonical tree in, template documents out.
//!
//! Walk order per scope: enums first (bindings refer to enum values), then
//! nested scopes, then, for classes, the class's own fragment last so nested
//! types are registered before their enclosing class.
//!
//! Only public partitions are exposed. Reflection and binding fragments are
//! independent streams gated on `wants_reflection` / `wants_script`.

use serde::Serialize;

use crate::ident::{derive_identifier, normalize_path};
use crate::render::{RenderError, Renderer, Template};
use crate::tree::{ClassNode, EnumNode, FunctionNode, Node};

/// Extension of per-file artifacts.
pub const HEADER_EXTENSION: &str = "hpp";
/// Aggregate reflection declaration file.
pub const REFL_HEADER_FILE: &str = "refl_generate.hpp";
/// Aggregate reflection implementation file.
pub const REFL_IMPL_FILE: &str = "refl_generate.cpp";
/// Aggregate binding declaration file.
pub const BINDING_HEADER_FILE: &str = "script_binding.hpp";
/// Aggregate binding implementation file.
pub const BINDING_IMPL_FILE: &str = "script_binding.cpp";

/// Reflection registration function for a file identifier.
pub fn refl_function_name(identifier: &str) -> String {
    format!("register_{identifier}_ReflInfo")
}

/// Script binding registration function for a file identifier.
pub fn binding_function_name(identifier: &str) -> String {
    format!("register_{identifier}_QJSBinding")
}

/// Registered property (field or, for bindings, method).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDoc {
    /// Name exposed at runtime.
    pub register_name: String,
    /// Fully qualified C++ member name.
    pub qualified_field_name: String,
    /// Pointer type to `static_cast` the member to; set for overloaded methods.
    pub signature: Option<String>,
}

/// Class reflection document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReflDoc {
    /// Fully qualified class name.
    pub class_name: String,
    /// Unqualified class name.
    pub register_name: String,
    /// Reflected public fields.
    pub properties: Vec<PropertyDoc>,
}

/// One enumerator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumItemDoc {
    /// Enumerator name.
    pub item_register_name: String,
    /// Fully qualified enumerator.
    pub qualified_item_name: String,
}

/// Enum document, shared by both streams.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDoc {
    /// Fully qualified enum name.
    pub enum_name: String,
    /// Unqualified enum name.
    pub register_name: String,
    /// Enumerators in declaration order.
    pub items: Vec<EnumItemDoc>,
}

/// Constructor signature for bindings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CtorDoc {
    /// Comma-joined parameter types.
    pub params: String,
}

/// Class binding document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassBindingDoc {
    /// Fully qualified class name.
    pub class_name: String,
    /// Unqualified class name.
    pub register_name: String,
    /// Exposed public fields, then public methods.
    pub properties: Vec<PropertyDoc>,
    /// Exposed public nested enums.
    pub enums: Vec<EnumDoc>,
    /// At most one constructor.
    pub ctor: Vec<CtorDoc>,
}

/// Rendered enum fragment inside a file document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnumFragment {
    /// Fragment text.
    #[serde(rename = "enum")]
    pub text: String,
}

/// Rendered class fragment inside a file document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassFragment {
    /// Fragment text.
    #[serde(rename = "class")]
    pub text: String,
}

/// Per-file document for either stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDoc {
    /// Normalized header path, as included by the generated code.
    pub file_path: String,
    /// Registration function defined by the artifact.
    pub function_name: String,
    /// Enum fragments.
    pub enums: Vec<EnumFragment>,
    /// Class fragments.
    pub classes: Vec<ClassFragment>,
}

/// `{ headerFile }` entry of an aggregate document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderEntry {
    /// Per-file artifact name.
    pub header_file: String,
}

/// `{ funcCall }` entry of an aggregate document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEntry {
    /// Registration function name.
    pub func_call: String,
}

/// Aggregate document for one stream.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateDoc {
    /// Per-file headers to include.
    pub header_files: Vec<HeaderEntry>,
    /// Registration functions to invoke, same order.
    pub func_calls: Vec<CallEntry>,
}

/// Structured fragments for one file, before rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePlan {
    /// Derived identifier.
    pub identifier: String,
    /// Normalized header path.
    pub file_path: String,
    /// Reflection enum fragments, walk order.
    pub refl_enums: Vec<EnumDoc>,
    /// Reflection class fragments, walk order.
    pub refl_classes: Vec<ClassReflDoc>,
    /// Binding enum fragments, walk order.
    pub binding_enums: Vec<EnumDoc>,
    /// Binding class fragments, walk order.
    pub binding_classes: Vec<ClassBindingDoc>,
}

/// Rendered per-file artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedFile {
    /// Artifact file name (`<identifier>.hpp`), same in both output directories.
    pub artifact_name: String,
    /// Reflection artifact text.
    pub reflection: String,
    /// Binding artifact text.
    pub binding: String,
}

impl FilePlan {
    /// Artifact file name for this plan.
    pub fn artifact_name(&self) -> String {
        format!("{}.{HEADER_EXTENSION}", self.identifier)
    }

    /// Render both per-file artifacts.
    pub fn render<R: Renderer>(&self, renderer: &R) -> Result<RenderedFile, RenderError> {
        let reflection = FileDoc {
            file_path: self.file_path.clone(),
            function_name: refl_function_name(&self.identifier),
            enums: render_enums(renderer, Template::EnumRefl, &self.refl_enums)?,
            classes: self
                .refl_classes
                .iter()
                .map(|doc| {
                    renderer
                        .render(Template::ClassRefl, doc)
                        .map(|text| ClassFragment { text })
                })
                .collect::<Result<_, _>>()?,
        };
        let binding = FileDoc {
            file_path: self.file_path.clone(),
            function_name: binding_function_name(&self.identifier),
            enums: render_enums(renderer, Template::EnumBinding, &self.binding_enums)?,
            classes: self
                .binding_classes
                .iter()
                .map(|doc| {
                    renderer
                        .render(Template::ClassBinding, doc)
                        .map(|text| ClassFragment { text })
                })
                .collect::<Result<_, _>>()?,
        };
        Ok(RenderedFile {
            artifact_name: self.artifact_name(),
            reflection: renderer.render(Template::FileRefl, &reflection)?,
            binding: renderer.render(Template::FileBinding, &binding)?,
        })
    }
}

fn render_enums<R: Renderer>(
    renderer: &R,
    template: Template,
    docs: &[EnumDoc],
) -> Result<Vec<EnumFragment>, RenderError> {
    docs.iter()
        .map(|doc| renderer.render(template, doc).map(|text| EnumFragment { text }))
        .collect()
}

/// Walks canonical trees into [`FilePlan`]s.
#[derive(Clone, Debug)]
pub struct EmissionPlanner {
    member_prefix: String,
}

impl EmissionPlanner {
    /// Planner stripping `member_prefix` (e.g. `m_`) from exposed field names.
    pub fn new(member_prefix: impl Into<String>) -> Self {
        Self {
            member_prefix: member_prefix.into(),
        }
    }

    /// Plan the fragments for `root`, the cached tree of the file at `path`.
    pub fn plan_file(&self, path: &str, root: &Node) -> FilePlan {
        let mut plan = FilePlan {
            identifier: derive_identifier(path),
            file_path: normalize_path(path),
            refl_enums: Vec::new(),
            refl_classes: Vec::new(),
            binding_enums: Vec::new(),
            binding_classes: Vec::new(),
        };
        self.walk("", root, &mut plan);
        plan
    }

    fn walk(&self, prefix: &str, node: &Node, plan: &mut FilePlan) {
        match node {
            Node::Namespace(ns) => {
                let scope = qualify(prefix, &ns.name);
                self.walk_scope(&scope, &ns.children, plan);
            }
            Node::Class(class) => {
                let scope = qualify(prefix, &class.name);
                for e in &class.enums.public {
                    if e.attrs.wants_reflection {
                        plan.refl_enums.push(enum_doc(&scope, e));
                    }
                    // A scripted class binds its enums inline.
                    if e.attrs.wants_script && !class.attrs.wants_script {
                        plan.binding_enums.push(enum_doc(&scope, e));
                    }
                }
                self.walk_scope(&scope, &class.children, plan);
                self.class_fragments(&scope, class, plan);
            }
            Node::Enum(e) => scope_enum(prefix, e, plan),
            Node::Variable(_) | Node::Function(_) | Node::Constructor(_) => {}
        }
    }

    fn walk_scope(&self, scope: &str, children: &[Node], plan: &mut FilePlan) {
        for child in children {
            if let Node::Enum(e) = child {
                scope_enum(scope, e, plan);
            }
        }
        for child in children {
            if !matches!(child, Node::Enum(_)) {
                self.walk(scope, child, plan);
            }
        }
    }

    fn class_fragments(&self, qualified: &str, class: &ClassNode, plan: &mut FilePlan) {
        if class.attrs.wants_reflection {
            plan.refl_classes.push(ClassReflDoc {
                class_name: qualified.to_owned(),
                register_name: class.name.clone(),
                properties: class
                    .fields
                    .public
                    .iter()
                    .filter(|f| f.attrs.wants_reflection)
                    .map(|f| self.field_property(qualified, &f.name))
                    .collect(),
            });
        }

        if class.attrs.wants_script {
            let fields = class
                .fields
                .public
                .iter()
                .filter(|f| f.attrs.wants_script)
                .map(|f| self.field_property(qualified, &f.name));
            let scripted: Vec<&FunctionNode> = class
                .methods
                .public
                .iter()
                .filter(|m| m.attrs.wants_script)
                .collect();
            let methods = scripted.iter().map(|m| {
                let overloaded = scripted.iter().filter(|o| o.name == m.name).count() > 1;
                PropertyDoc {
                    register_name: m.name.clone(),
                    qualified_field_name: format!("{qualified}::{}", m.name),
                    signature: overloaded.then(|| method_pointer_type(qualified, m)),
                }
            });
            // Multiple public constructors are not representable; only the first is exposed.
            let ctor = class
                .ctors
                .public
                .first()
                .filter(|c| c.attrs.wants_script)
                .map(|c| CtorDoc {
                    params: c.params.join(","),
                })
                .into_iter()
                .collect();
            plan.binding_classes.push(ClassBindingDoc {
                class_name: qualified.to_owned(),
                register_name: class.name.clone(),
                properties: fields.chain(methods).collect(),
                enums: class
                    .enums
                    .public
                    .iter()
                    .filter(|e| e.attrs.wants_script)
                    .map(|e| enum_doc(qualified, e))
                    .collect(),
                ctor,
            });
        }
    }

    fn field_property(&self, qualified: &str, name: &str) -> PropertyDoc {
        PropertyDoc {
            register_name: self.strip_member_prefix(name).to_owned(),
            qualified_field_name: format!("{qualified}::{name}"),
            signature: None,
        }
    }

    fn strip_member_prefix<'n>(&self, name: &'n str) -> &'n str {
        match name.strip_prefix(self.member_prefix.as_str()) {
            Some(rest) if !rest.is_empty() => rest,
            _ => name,
        }
    }
}

/// `R (C::*)(A...) quals` for members, `R (*)(A...)` for static functions.
///
/// Qualifiers (`const`, `&`, `noexcept`) are whatever follows the parameter
/// list in the declared type.
fn method_pointer_type(class: &str, m: &FunctionNode) -> String {
    let params = m.params.join(", ");
    if m.is_static {
        return format!("{} (*)({params})", m.return_type);
    }
    let quals = m
        .declared_type
        .rfind(')')
        .map_or("", |close| m.declared_type[close + 1..].trim());
    if quals.is_empty() {
        format!("{} ({class}::*)({params})", m.return_type)
    } else {
        format!("{} ({class}::*)({params}) {quals}", m.return_type)
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    if name.is_empty() {
        prefix.to_owned()
    } else {
        format!("{prefix}::{name}")
    }
}

fn scope_enum(scope: &str, e: &EnumNode, plan: &mut FilePlan) {
    if e.attrs.wants_reflection {
        plan.refl_enums.push(enum_doc(scope, e));
    }
    if e.attrs.wants_script {
        plan.binding_enums.push(enum_doc(scope, e));
    }
}

fn enum_doc(scope: &str, e: &EnumNode) -> EnumDoc {
    let qualified = qualify(scope, &e.name);
    EnumDoc {
        items: e
            .items
            .iter()
            .map(|item| EnumItemDoc {
                item_register_name: item.clone(),
                qualified_item_name: format!("{qualified}::{item}"),
            })
            .collect(),
        enum_name: qualified,
        register_name: e.name.clone(),
    }
}

/// Ordered list of per-file identifiers feeding the aggregate artifacts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AggregateIndex {
    identifiers: Vec<String>,
}

/// Rendered aggregate artifacts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedAggregates {
    /// `refl_generate.hpp`
    pub refl_header: String,
    /// `refl_generate.cpp`
    pub refl_impl: String,
    /// `script_binding.hpp`
    pub binding_header: String,
    /// `script_binding.cpp`
    pub binding_impl: String,
}

impl AggregateIndex {
    /// Append a file identifier.
    pub fn push(&mut self, identifier: impl Into<String>) {
        self.identifiers.push(identifier.into());
    }

    /// Identifiers in insertion order.
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    /// Reflection aggregate document.
    pub fn refl_doc(&self) -> AggregateDoc {
        self.doc(refl_function_name)
    }

    /// Binding aggregate document.
    pub fn binding_doc(&self) -> AggregateDoc {
        self.doc(binding_function_name)
    }

    fn doc(&self, function: fn(&str) -> String) -> AggregateDoc {
        AggregateDoc {
            header_files: self
                .identifiers
                .iter()
                .map(|id| HeaderEntry {
                    header_file: format!("{id}.{HEADER_EXTENSION}"),
                })
                .collect(),
            func_calls: self
                .identifiers
                .iter()
                .map(|id| CallEntry {
                    func_call: function(id),
                })
                .collect(),
        }
    }

    /// Render all four aggregate artifacts.
    pub fn render<R: Renderer>(&self, renderer: &R) -> Result<RenderedAggregates, RenderError> {
        let refl = self.refl_doc();
        let binding = self.binding_doc();
        Ok(RenderedAggregates {
            refl_header: renderer.render(Template::ReflHeader, &refl)?,
            refl_impl: renderer.render(Template::ReflImpl, &refl)?,
            binding_header: renderer.render(Template::BindingHeader, &binding)?,
            binding_impl: renderer.render(Template::BindingImpl, &binding)?,
        })
    }
}
