#![forbid(unsafe_code)]

//! A small page bound end to end: text placeholders, a computed field, and
//! two-way inputs.

use std::cell::RefCell;
use std::rc::Rc;

use rvm_core::ReactiveError;
use rvm_runtime::{ReactiveRoot, Value};
use rvm_template::{Element, MODEL_ATTR, Node, bind, input, mount};
use serde_json::json;

fn page() -> Node {
    Node::from(
        Element::new("div")
            .with_attr("id", "app")
            .with_child(Element::new("h1").with_child(Node::text("Language: {{language}}")))
            .with_child(Element::new("p").with_child(Node::text("Skill: {{makeUp.one}} / {{makeUp.two}}")))
            .with_child(Element::new("p").with_child(Node::text("{{a}} + {{b}} = {{sum}}")))
            .with_child(Element::new("input").with_attr(MODEL_ATTR, "language"))
            .with_child(Element::new("input").with_attr(MODEL_ATTR, "a")),
    )
}

fn builder() -> rvm_runtime::ReactiveRootBuilder {
    ReactiveRoot::builder()
        .data(json!({
            "language": "Rust",
            "makeUp": {"one": "ownership", "two": "borrowing"},
            "a": 1,
            "b": 2
        }))
        .computed("sum", |vm| Ok(vm.get_f64("a")? + vm.get_f64("b")?))
}

fn texts(view: &Node) -> Vec<String> {
    let mut out = Vec::new();
    collect(view, &mut out);
    out
}

fn collect(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::Text(text) => out.push(text.content()),
        Node::Element(el) => el.children().iter().for_each(|c| collect(c, out)),
    }
}

#[test]
fn initial_render() {
    let view = page();
    let mounted = mount(builder(), &view).unwrap();

    assert_eq!(
        texts(&view),
        vec!["Language: Rust", "Skill: ownership / borrowing", "1 + 2 = 3"]
    );
    assert_eq!(mounted.bindings.text_count(), 3);
    assert_eq!(mounted.bindings.model_count(), 2);
    // 1 + 2 + 3 placeholders, plus 2 models.
    assert_eq!(mounted.bindings.watchers().len(), 8);
}

#[test]
fn data_write_rerenders_text() {
    let view = page();
    let mounted = mount(builder(), &view).unwrap();

    mounted.root.set("language", "Go").unwrap();
    mounted
        .root
        .set_path(&"makeUp.two".parse().unwrap(), "lifetimes")
        .unwrap();

    assert_eq!(
        texts(&view),
        vec!["Language: Go", "Skill: ownership / lifetimes", "1 + 2 = 3"]
    );
}

#[test]
fn computed_placeholder_follows_its_sources() {
    let view = page();
    let mounted = mount(builder(), &view).unwrap();

    mounted.root.set("b", 40).unwrap();
    assert_eq!(texts(&view)[2], "1 + 40 = 41");
}

#[test]
fn input_writes_back_and_rerenders() {
    let view = page();
    let mounted = mount(builder(), &view).unwrap();

    input(&view, "language", "Zig").unwrap();
    assert_eq!(mounted.root.get("language").unwrap(), Value::from("Zig"));
    assert_eq!(texts(&view)[0], "Language: Zig");
}

#[test]
fn replacing_nested_object_rerenders_through_new_chain() {
    let view = page();
    let mounted = mount(builder(), &view).unwrap();

    mounted
        .root
        .set("makeUp", json!({"one": "traits", "two": "generics"}))
        .unwrap();
    assert_eq!(texts(&view)[1], "Skill: traits / generics");
}

#[test]
fn rerender_failure_keeps_last_content() {
    let failures = Rc::new(RefCell::new(Vec::new()));
    let failures_clone = Rc::clone(&failures);
    let view = page();
    let mounted = mount(
        builder().failure_hook(move |f| failures_clone.borrow_mut().push(f.label.clone())),
        &view,
    )
    .unwrap();

    mounted.root.set("makeUp", json!({"one": "only"})).unwrap();
    assert_eq!(texts(&view)[1], "Skill: ownership / borrowing");
    assert_eq!(
        *failures.borrow(),
        vec!["text:makeUp.one".to_string(), "text:makeUp.two".to_string()]
    );
}

#[test]
fn bad_placeholder_fails_bind() {
    let vm = builder().build().unwrap();
    let view = Node::text("{{ nope }}");
    assert!(matches!(
        bind(&vm, &view),
        Err(ReactiveError::InvalidPath { .. })
    ));

    let view = Node::text("{{ a b }}");
    assert!(matches!(
        bind(&vm, &view),
        Err(ReactiveError::PathSyntax { .. })
    ));
}
