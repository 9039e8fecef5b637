// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Header-level scenarios: cursor fixtures through the visitor and planner.

use std::path::Path;

use nickel_refl_core::emit::{EmissionPlanner, FilePlan, PropertyDoc};
use nickel_refl_core::render::{Renderer, Template, TemplateRenderer};
use nickel_refl_core::tree::Access;
use nickel_refl_core::{FileVisitor, Node, VisitError, DEFAULT_MARKER};
use nickel_refl_dry_tests::{
    class, ctor, enum_decl, field, method, namespace, struct_decl, translation_unit,
    ScriptedAstProvider,
};

const SOURCE: &str = "#include \"nickel/refl/attr.hpp\"\nstruct NICKEL_REFL_ATTR(refl) X {};\n";

fn visit(path: &str, unit: nickel_refl_core::Cursor) -> Node {
    let provider = ScriptedAstProvider::new();
    provider.set_unit(path, unit);
    FileVisitor::new(&provider, ".", DEFAULT_MARKER)
        .visit_source(Path::new(path), SOURCE)
        .expect("visit")
}

fn plan(path: &str, root: &Node) -> FilePlan {
    EmissionPlanner::new("m_").plan_file(path, root)
}

#[test]
fn annotated_field_is_registered_without_member_prefix() {
    let unit = translation_unit("owner.hpp")
        .child(
            class("Owner")
                .annotate("nickel(refl, script)")
                .child(field("m_value", "int")),
        )
        .build();
    let root = visit("owner.hpp", unit);
    let plan = plan("owner.hpp", &root);

    let expected = vec![PropertyDoc {
        register_name: "value".into(),
        qualified_field_name: "::Owner::m_value".into(),
        signature: None,
    }];
    assert_eq!(plan.refl_classes.len(), 1);
    assert_eq!(plan.refl_classes[0].properties, expected);
    assert_eq!(plan.binding_classes.len(), 1);
    assert_eq!(plan.binding_classes[0].properties, expected);

    let renderer = TemplateRenderer::new().unwrap();
    let rendered = plan.render(&renderer).unwrap();
    assert!(rendered
        .reflection
        .contains(".Property(\"value\", &::Owner::m_value)"));
    assert!(rendered
        .binding
        .contains(".AddProperty<&::Owner::m_value>(\"value\")"));
    assert!(rendered.reflection.contains("inline void register_owner_ReflInfo()"));
    assert_eq!(rendered.artifact_name, "owner.hpp");
}

#[test]
fn vetoed_class_is_excluded_despite_namespace_opt_in() {
    let unit = translation_unit("game.hpp")
        .child(
            namespace("game")
                .annotate("nickel(refl)")
                .child(class("Hidden").annotate("nickel(norefl)").child(field("m_x", "int")))
                .child(class("Shown").child(field("m_y", "int"))),
        )
        .build();
    let root = visit("game.hpp", unit);
    let plan = plan("game.hpp", &root);

    let names: Vec<_> = plan.refl_classes.iter().map(|c| c.class_name.as_str()).collect();
    assert_eq!(names, ["::game::Shown"]);
    assert!(plan.binding_classes.is_empty());
}

#[test]
fn vetoed_class_keeps_its_other_stream() {
    let unit = translation_unit("game.hpp")
        .child(
            namespace("game").annotate("nickel(refl)").child(
                class("Scripted")
                    .annotate("nickel(norefl, script)")
                    .child(field("m_hp", "int")),
            ),
        )
        .build();
    let plan = plan("game.hpp", &visit("game.hpp", unit));
    assert!(plan.refl_classes.is_empty());
    assert_eq!(plan.binding_classes[0].class_name, "::game::Scripted");
    assert_eq!(plan.binding_classes[0].properties[0].register_name, "hp");
}

#[test]
fn declarations_from_other_files_and_system_headers_are_skipped() {
    let unit = translation_unit("main.hpp")
        .child(class("Included").file("dep.hpp").annotate("nickel(refl)"))
        .child(class("System").annotate("nickel(refl)").system_header())
        .child(class("Local").annotate("nickel(refl)"))
        .build();
    let root = visit("main.hpp", unit);
    let names: Vec<_> = root.children().iter().map(Node::name).collect();
    assert_eq!(names, ["Local"]);
}

#[test]
fn files_without_marker_never_reach_the_provider() {
    let provider = ScriptedAstProvider::new();
    let visitor = FileVisitor::new(&provider, ".", DEFAULT_MARKER);
    let root = visitor
        .visit_source(Path::new("plain.hpp"), "struct Plain { int x; };\n")
        .unwrap();
    assert_eq!(root, Node::empty_root());
    assert_eq!(provider.parse_count(), 0);
}

#[test]
fn parse_failures_are_recoverable() {
    let provider = ScriptedAstProvider::new();
    provider.set_failure("broken.hpp", "missing include");
    let err = FileVisitor::new(&provider, ".", DEFAULT_MARKER)
        .visit_source(Path::new("broken.hpp"), SOURCE)
        .unwrap_err();
    assert!(matches!(err, VisitError::Parse(_)));
    assert!(err.is_recoverable());
}

#[test]
fn reopened_namespaces_merge_and_forward_declarations_are_ignored() {
    let unit = translation_unit("ns.hpp")
        .child(namespace("game").child(struct_decl("Later").declaration_only()))
        .child(namespace("game").child(struct_decl("A").annotate("nickel(refl)")))
        .child(namespace("game").child(struct_decl("B").annotate("nickel(script)")))
        .child(namespace("empty").child(struct_decl("Plain")))
        .build();
    let root = visit("ns.hpp", unit);

    assert_eq!(root.children().len(), 1);
    let game = &root.children()[0];
    let names: Vec<_> = game.children().iter().map(Node::name).collect();
    assert_eq!(names, ["A", "B"]);
}

#[test]
fn class_enums_stay_in_the_class_partitions() {
    let unit = translation_unit("holder.hpp")
        .child(
            class("Holder")
                .child(enum_decl("Kind", &["A", "B"]).annotate("nickel(refl)"))
                .child(enum_decl("Secret", &["X"]).annotate("nickel(refl)").access(Access::Private)),
        )
        .build();
    let root = visit("holder.hpp", unit);

    let Node::Class(holder) = &root.children()[0] else {
        panic!("expected class, got {:?}", root.children()[0].kind());
    };
    assert!(holder.children.is_empty());
    assert_eq!(holder.enums.public[0].items, ["A", "B"]);
    assert_eq!(holder.enums.private.len(), 1);

    let plan = plan("holder.hpp", &root);
    assert!(plan.refl_classes.is_empty());
    let enums: Vec<_> = plan.refl_enums.iter().map(|e| e.enum_name.as_str()).collect();
    assert_eq!(enums, ["::Holder::Kind"]);
    assert_eq!(plan.refl_enums[0].items[1].qualified_item_name, "::Holder::Kind::B");
}

#[test]
fn class_without_need_still_records_needy_nested_class() {
    let unit = translation_unit("outer.hpp")
        .child(
            class("Outer").child(
                class("Inner")
                    .annotate("nickel(script)")
                    .child(method("Tick", "void", &["float"])),
            ),
        )
        .build();
    let plan = plan("outer.hpp", &visit("outer.hpp", unit));
    let names: Vec<_> = plan
        .binding_classes
        .iter()
        .map(|c| c.class_name.as_str())
        .collect();
    assert_eq!(names, ["::Outer::Inner"]);
    assert_eq!(plan.binding_classes[0].properties[0].qualified_field_name, "::Outer::Inner::Tick");
}

#[test]
fn scripted_class_exposes_first_public_constructor_and_global_enum() {
    let unit = translation_unit("vec.hpp")
        .child(enum_decl("Axis", &["X", "Y"]).annotate("nickel(refl, script)"))
        .child(
            struct_decl("Vec2")
                .annotate("nickel(script)")
                .child(ctor("Vec2", &["float", "float"]))
                .child(ctor("Vec2", &[]))
                .child(ctor("Vec2", &["int"]).access(Access::Private))
                .child(field("x", "float"))
                .child(field("m_cache", "float").access(Access::Private)),
        )
        .build();
    let root = visit("vec.hpp", unit);
    let plan = plan("vec.hpp", &root);

    assert_eq!(plan.binding_enums[0].enum_name, "::Axis");
    assert_eq!(plan.refl_enums[0].register_name, "Axis");
    let vec2 = &plan.binding_classes[0];
    assert_eq!(vec2.ctor.len(), 1);
    assert_eq!(vec2.ctor[0].params, "float,float");
    assert_eq!(vec2.properties.len(), 1);
    assert_eq!(vec2.properties[0].register_name, "x");

    let renderer = TemplateRenderer::new().unwrap();
    let text = renderer.render(Template::ClassBinding, vec2).unwrap();
    assert!(text.contains(".AddConstructor<float,float>()"));
    assert!(text.contains(".EndClass();"));
}

#[test]
fn scripted_enum_inside_unannotated_class_is_bound_on_its_own() {
    let unit = translation_unit("h.hpp")
        .child(class("Holder").child(enum_decl("Kind", &["A", "B"]).annotate("nickel(script)")))
        .build();
    let root = visit("h.hpp", unit);
    assert_eq!(root.children().len(), 1);

    let plan = plan("h.hpp", &root);
    assert!(plan.binding_classes.is_empty());
    assert!(plan.refl_enums.is_empty());
    assert_eq!(plan.binding_enums.len(), 1);
    assert_eq!(plan.binding_enums[0].enum_name, "::Holder::Kind");

    let rendered = plan.render(&TemplateRenderer::new().unwrap()).unwrap();
    assert!(rendered.binding.contains("module.AddEnum<::Holder::Kind>(\"Kind\")"));
    assert!(rendered.binding.contains(".AddItem(\"B\", ::Holder::Kind::B)"));
}

#[test]
fn storage_class_sets_the_static_flag() {
    let unit = translation_unit("counter.hpp")
        .child(
            class("Counter")
                .annotate("nickel(refl, script)")
                .child(field("s_total", "int").static_storage())
                .child(field("m_count", "int"))
                .child(method("Instances", "int", &[]).static_storage())
                .child(method("Bump", "void", &["int"])),
        )
        .build();
    let root = visit("counter.hpp", unit);
    let Node::Class(counter) = &root.children()[0] else {
        panic!("expected class, got {:?}", root.children()[0].kind());
    };

    let fields: Vec<_> = counter
        .fields
        .public
        .iter()
        .map(|f| (f.name.as_str(), f.is_static, f.is_member))
        .collect();
    assert_eq!(fields, [("s_total", true, true), ("m_count", false, true)]);
    let methods: Vec<_> = counter
        .methods
        .public
        .iter()
        .map(|m| (m.name.as_str(), m.is_static, m.declared_type.as_str()))
        .collect();
    assert_eq!(methods, [("Instances", true, "int ()"), ("Bump", false, "void (int)")]);
}

#[test]
fn overloaded_methods_render_with_a_cast() {
    let unit = translation_unit("body.hpp")
        .child(
            class("Body")
                .annotate("nickel(script)")
                .child(method("Push", "void", &["float"]))
                .child(method("Push", "void", &["float", "float"]))
                .child(method("Mass", "float", &[])),
        )
        .build();
    let plan = plan("body.hpp", &visit("body.hpp", unit));
    let text = TemplateRenderer::new()
        .unwrap()
        .render(Template::ClassBinding, &plan.binding_classes[0])
        .unwrap();
    assert!(text.contains(
        ".AddProperty<static_cast<void (::Body::*)(float, float)>(&::Body::Push)>(\"Push\")"
    ));
    assert!(text.contains(".AddProperty<&::Body::Mass>(\"Mass\")"));
}
