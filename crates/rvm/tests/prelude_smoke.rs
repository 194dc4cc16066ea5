#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use rvm::prelude::*;
use serde_json::json;

#[test]
fn prelude_covers_a_watch_round_trip() {
    let vm = ReactiveRoot::builder()
        .data(json!({"count": 0}))
        .computed("double", |vm| Ok(vm.get_f64("count")? * 2.0))
        .build()
        .unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = Rc::clone(&seen);
    vm.watch("double", move |v| seen_clone.borrow_mut().push(v))
        .unwrap();

    vm.set("count", 21).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::from(42)]);
}

#[cfg(feature = "template")]
#[test]
fn facade_mounts_a_view() {
    use rvm::{Element, Node, mount};

    let view = Node::from(Element::new("p").with_child(Node::text("n = {{n}}")));
    let mounted = mount(ReactiveRoot::builder().data(json!({"n": 1})), &view).unwrap();
    mounted.root.set("n", 2).unwrap();
    assert_eq!(view.text_content(), "n = 2");
}
