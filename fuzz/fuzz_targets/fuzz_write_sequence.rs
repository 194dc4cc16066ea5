#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rvm_runtime::ReactiveRoot;
use serde_json::json;

const FIELDS: [&str; 3] = ["a", "b", "c"];

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Write { field: u8, value: i32 },
    WriteNested { field: u8, value: i32 },
    ReplaceNested(i32),
    WriteString { field: u8, text: String },
    Watch { field: u8 },
}

fn field(idx: u8) -> &'static str {
    FIELDS[usize::from(idx) % FIELDS.len()]
}

fuzz_target!(|ops: Vec<FuzzOp>| {
    let Ok(vm) = ReactiveRoot::builder()
        .data(json!({"a": 0, "b": 0, "c": 0, "nested": {"a": 0, "b": 0, "c": 0}}))
        .failure_hook(|_| {})
        .computed("sum", |vm| Ok(vm.get_f64("a")? + vm.get_f64("b")?))
        .build()
    else {
        return;
    };

    for op in ops.iter().take(256) {
        let _ = match op {
            FuzzOp::Write { field: f, value } => vm.set(field(*f), *value).map(|_| ()),
            FuzzOp::WriteNested { field: f, value } => {
                vm.resolve_str("nested").and_then(|n| match n.as_node() {
                    Some(node) => node.set(field(*f), *value).map(|_| ()),
                    None => Ok(()),
                })
            }
            FuzzOp::ReplaceNested(v) => vm.set("nested", json!({ "a": v })).map(|_| ()),
            FuzzOp::WriteString { field: f, text } => {
                vm.set(field(*f), text.as_str()).map(|_| ())
            }
            FuzzOp::Watch { field: f } => vm.watch(field(*f), |_| {}).map(|_| ()),
        };
        assert!(!vm.tracker().is_capturing());
    }
});
