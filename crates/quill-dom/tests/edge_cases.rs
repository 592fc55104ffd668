//! Edge case tests for quill-dom
//!
//! Usage errors must leave the tree untouched.

use std::sync::Arc;

use quill_backend::{BackendCall, BackendMode, MemoryBackend};
use quill_dom::{
    ClassSegment, ComponentOptions, DomError, NodeId, NodeTree, StyleScopeId, StyleScopeManager,
    TreeOptions,
};

fn setup(mode: BackendMode) -> (NodeTree, MemoryBackend) {
    let backend = MemoryBackend::new(mode);
    let tree = NodeTree::with_scopes(
        Box::new(backend.clone()),
        TreeOptions::default(),
        Arc::new(StyleScopeManager::new()),
    );
    (tree, backend)
}

fn root_with_sr(tree: &mut NodeTree) -> (NodeId, NodeId) {
    let root = tree.create_root_component("app", ComponentOptions::default());
    let sr = tree.shadow_root(root).unwrap();
    (root, sr)
}

#[test]
fn test_whitespace_class_name_is_rejected() {
    let (mut tree, backend) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let node = tree.create_native(sr, "div").unwrap();
    tree.set_class_names(node, "a", ClassSegment::MAIN).unwrap();
    backend.clear_calls();

    let err = tree.toggle_class(node, "b c", None, ClassSegment::MAIN);

    assert_eq!(err, Err(DomError::ClassNameWhitespace("b c".to_string())));
    assert_eq!(tree.class_names(node, ClassSegment::MAIN).unwrap(), "a");
    assert!(backend.calls().is_empty());
}

#[test]
fn test_empty_toggle_is_noop() {
    let (mut tree, backend) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let node = tree.create_native(sr, "div").unwrap();
    backend.clear_calls();
    assert_eq!(tree.toggle_class(node, "", Some(true), ClassSegment::MAIN), Ok(false));
    assert!(backend.calls().is_empty());
}

#[test]
fn test_text_nodes_have_no_class_list() {
    let (mut tree, _) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let text = tree.create_text(sr, "x").unwrap();
    assert_eq!(
        tree.set_class_names(text, "a", ClassSegment::MAIN),
        Err(DomError::NotAnElement(text))
    );
}

#[test]
fn test_cannot_insert_ancestor() {
    let (mut tree, _) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let outer = tree.create_native(sr, "div").unwrap();
    let inner = tree.create_native(sr, "span").unwrap();
    tree.append_child(sr, outer).unwrap();
    tree.append_child(outer, inner).unwrap();

    assert_eq!(
        tree.append_child(inner, outer),
        Err(DomError::HierarchyRequest { parent: inner, child: outer })
    );
    assert_eq!(
        tree.append_child(outer, outer),
        Err(DomError::HierarchyRequest { parent: outer, child: outer })
    );
    assert_eq!(tree.get(inner).unwrap().children(), &[] as &[NodeId]);
}

#[test]
fn test_cannot_insert_host_into_own_shadow_tree() {
    let (mut tree, _) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let comp = tree.create_component(sr, "comp", ComponentOptions::default()).unwrap();
    let comp_sr = tree.shadow_root(comp).unwrap();
    let inside = tree.create_native(comp_sr, "div").unwrap();
    tree.append_child(comp_sr, inside).unwrap();
    assert!(matches!(
        tree.append_child(inside, comp),
        Err(DomError::HierarchyRequest { .. })
    ));
}

#[test]
fn test_owner_mismatch_is_rejected() {
    let (mut tree, _) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let comp = tree.create_component(sr, "comp", ComponentOptions::default()).unwrap();
    let comp_sr = tree.shadow_root(comp).unwrap();
    let foreign = tree.create_native(comp_sr, "div").unwrap();
    assert_eq!(
        tree.append_child(sr, foreign),
        Err(DomError::HierarchyRequest { parent: sr, child: foreign })
    );
}

#[test]
fn test_shadow_roots_and_root_cannot_be_inserted() {
    let (mut tree, _) = setup(BackendMode::Composed);
    let (root, sr) = root_with_sr(&mut tree);
    let div = tree.create_native(sr, "div").unwrap();
    tree.mount(root).unwrap();
    assert!(tree.append_child(div, sr).is_err());
    assert!(tree.append_child(div, root).is_err());
}

#[test]
fn test_duplicates_in_one_splice_are_rejected() {
    let (mut tree, _) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let list = tree.create_native(sr, "ul").unwrap();
    let item = tree.create_native(sr, "li").unwrap();
    assert!(matches!(
        tree.insert_children(list, 0, &[item, item]),
        Err(DomError::HierarchyRequest { .. })
    ));
    assert!(tree.get(list).unwrap().children().is_empty());
}

#[test]
fn test_splice_range_checks() {
    let (mut tree, _) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let list = tree.create_native(sr, "ul").unwrap();
    let item = tree.create_native(sr, "li").unwrap();
    tree.append_child(list, item).unwrap();
    assert_eq!(
        tree.remove_children(list, 0, 2),
        Err(DomError::IndexOutOfRange { index: 2, len: 1 })
    );
    assert_eq!(
        tree.remove_children(list, 1, usize::MAX),
        Err(DomError::IndexOutOfRange { index: usize::MAX, len: 1 })
    );
    assert_eq!(tree.get(list).unwrap().children(), &[item]);
    let text = tree.create_text(sr, "t").unwrap();
    assert_eq!(tree.append_child(text, item), Err(DomError::NotAContainer(text)));
    let stranger = tree.create_native(sr, "b").unwrap();
    assert_eq!(
        tree.remove_child(list, stranger),
        Err(DomError::NotAChild { parent: list, child: stranger })
    );
}

#[test]
fn test_moving_within_same_parent() {
    let (mut tree, backend) = setup(BackendMode::Shadow);
    let (root, sr) = root_with_sr(&mut tree);
    tree.mount(root).unwrap();
    let list = tree.create_native(sr, "ul").unwrap();
    tree.append_child(sr, list).unwrap();
    let items: Vec<NodeId> = (0..3).map(|_| tree.create_native(sr, "li").unwrap()).collect();
    tree.insert_children(list, 0, &items).unwrap();

    tree.insert_before(list, items[2], Some(items[0])).unwrap();

    assert_eq!(tree.get(list).unwrap().children(), &[items[2], items[0], items[1]]);
    let list_be = tree.get(list).unwrap().backend_element().unwrap();
    let expected: Vec<_> = [items[2], items[0], items[1]]
        .iter()
        .map(|&i| tree.get(i).unwrap().backend_element().unwrap())
        .collect();
    assert_eq!(backend.children(list_be), expected);
    assert!(backend.violations().is_empty(), "{:?}", backend.violations());
}

#[test]
fn test_inherit_slots_requires_childless_structural_node() {
    let (mut tree, _) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let native = tree.create_native(sr, "div").unwrap();
    assert_eq!(tree.set_inherit_slots(native), Err(DomError::NotStructural(native)));

    let slot = tree.create_slot(sr, "").unwrap();
    assert_eq!(tree.set_inherit_slots(slot), Err(DomError::NotStructural(slot)));

    let group = tree.create_virtual(sr, "group").unwrap();
    let child = tree.create_text(sr, "x").unwrap();
    tree.append_child(group, child).unwrap();
    assert_eq!(tree.set_inherit_slots(group), Err(DomError::HasChildren(group)));
    assert!(!tree.get(group).unwrap().is_inherit_slots());
}

#[test]
fn test_host_options_frozen_after_association() {
    let (mut tree, _) = setup(BackendMode::Shadow);
    let (_, sr) = root_with_sr(&mut tree);
    let comp = tree.create_component(sr, "comp", ComponentOptions::default()).unwrap();
    tree.add_external_class(comp, "ext").unwrap();
    tree.append_child(sr, comp).unwrap();
    assert_eq!(tree.add_external_class(comp, "late"), Err(DomError::AlreadyAssociated(comp)));
    assert_eq!(tree.set_virtual_host(comp), Err(DomError::AlreadyAssociated(comp)));
}

#[test]
fn test_alias_on_undeclared_class_fails() {
    let (mut tree, _) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let comp = tree.create_component(sr, "comp", ComponentOptions::default()).unwrap();
    assert_eq!(
        tree.set_class_alias(comp, "nope", "a"),
        Err(DomError::UnknownExternalClass { component: comp, name: "nope".to_string() })
    );
}

#[test]
fn test_alias_chains_through_nested_components() {
    let (mut tree, backend) = setup(BackendMode::Composed);
    let root = tree.create_root_component(
        "app",
        ComponentOptions {
            style_scope: StyleScopeId(1),
            ..Default::default()
        },
    );
    let outer = tree
        .create_component(
            tree.shadow_root(root).unwrap(),
            "outer",
            ComponentOptions {
                style_scope: StyleScopeId(2),
                external_classes: vec!["ext".into()],
                ..Default::default()
            },
        )
        .unwrap();
    let inner = tree
        .create_component(
            tree.shadow_root(outer).unwrap(),
            "inner",
            ComponentOptions {
                style_scope: StyleScopeId(3),
                external_classes: vec!["inner-ext".into()],
                ..Default::default()
            },
        )
        .unwrap();
    let node = tree.create_native(tree.shadow_root(inner).unwrap(), "div").unwrap();
    tree.set_class_names(node, "inner-ext", ClassSegment::MAIN).unwrap();
    tree.set_class_alias(inner, "inner-ext", "ext").unwrap();
    tree.set_class_alias(outer, "ext", "foo").unwrap();

    let elem = tree.get(node).unwrap().backend_element().unwrap();
    assert_eq!(backend.classes(elem), vec![("foo".to_string(), Some(StyleScopeId(1)))]);

    tree.set_class_alias(outer, "ext", "bar").unwrap();
    assert_eq!(backend.classes(elem), vec![("bar".to_string(), Some(StyleScopeId(1)))]);
}

#[test]
fn test_virtual_host_contributes_children_directly() {
    let (mut tree, backend) = setup(BackendMode::Composed);
    let (root, sr) = root_with_sr(&mut tree);
    tree.mount(root).unwrap();
    let wrapper = tree.create_native(sr, "div").unwrap();
    tree.append_child(sr, wrapper).unwrap();
    let comp = tree.create_component(sr, "comp", ComponentOptions::default()).unwrap();
    tree.set_virtual_host(comp).unwrap();
    let comp_sr = tree.shadow_root(comp).unwrap();
    let span = tree.create_native(comp_sr, "span").unwrap();
    tree.append_child(comp_sr, span).unwrap();

    tree.append_child(wrapper, comp).unwrap();

    let wrapper_be = tree.get(wrapper).unwrap().backend_element().unwrap();
    assert_eq!(backend.serialize_children(wrapper_be), "<span></span>");
    assert!(tree.get(comp).unwrap().backend_element().is_none());
    assert!(backend.violations().is_empty(), "{:?}", backend.violations());
}

#[test]
fn test_virtual_host_set_after_shadow_content() {
    for mode in [BackendMode::Composed, BackendMode::Domlike] {
        let (mut tree, backend) = setup(mode);
        let (root, sr) = root_with_sr(&mut tree);
        tree.mount(root).unwrap();
        let wrapper = tree.create_native(sr, "div").unwrap();
        tree.append_child(sr, wrapper).unwrap();
        let comp = tree.create_component(sr, "comp", ComponentOptions::default()).unwrap();
        let comp_sr = tree.shadow_root(comp).unwrap();
        let span = tree.create_native(comp_sr, "span").unwrap();
        tree.append_child(comp_sr, span).unwrap();

        tree.set_virtual_host(comp).unwrap();
        tree.append_child(wrapper, comp).unwrap();

        let wrapper_be = tree.get(wrapper).unwrap().backend_element().unwrap();
        assert_eq!(backend.serialize_children(wrapper_be), "<span></span>", "{mode:?}");
        assert!(backend.violations().is_empty(), "{mode:?}: {:?}", backend.violations());
    }
}

#[test]
fn test_unmounted_subtree_emits_no_composed_ops_for_structural_root() {
    let (mut tree, backend) = setup(BackendMode::Composed);
    let (_, sr) = root_with_sr(&mut tree);
    let comp = tree.create_component(sr, "comp", ComponentOptions::default()).unwrap();
    tree.set_virtual_host(comp).unwrap();
    let comp_sr = tree.shadow_root(comp).unwrap();
    backend.clear_calls();
    let span = tree.create_native(comp_sr, "span").unwrap();
    tree.append_child(comp_sr, span).unwrap();
    assert!(
        backend.calls().iter().all(|c| !matches!(c, BackendCall::AppendChild { .. })),
        "no physical parent exists yet"
    );
}
