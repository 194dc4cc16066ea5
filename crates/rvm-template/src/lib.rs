#![forbid(unsafe_code)]

//! Template binding for rvm.
//!
//! Takes a display tree of [`Element`]s and [`Text`] nodes and keeps it in
//! sync with a [`ReactiveRoot`](rvm_runtime::ReactiveRoot): `{{ path }}`
//! placeholders in text re-render when their path changes, and `v-model`
//! elements write user input back into the data.

pub mod binder;
pub mod dom;
pub mod render;
pub mod template;

pub use binder::{Bindings, MODEL_ATTR, Mounted, bind, find_model, input, mount};
pub use dom::{Element, InputListener, Node, Text};
pub use render::render_value;
pub use template::{Segment, TextTemplate};
