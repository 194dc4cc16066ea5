#![forbid(unsafe_code)]

//! Wiring a display tree to a [`ReactiveRoot`].
//!
//! [`bind`] walks the tree depth-first, in document order:
//!
//! - An element with a `v-model="path"` attribute gets its input value from
//!   `path`, a watcher that copies later changes into the value, and an input
//!   listener that writes user input back through
//!   [`ReactiveRoot::set_path`].
//! - A text node whose source contains `{{ path }}` placeholders gets one
//!   watcher per placeholder. Any of them firing re-renders the whole text
//!   from the source template.
//!
//! Callbacks and listeners hold the root weakly; once the root is dropped
//! they do nothing.
//!
//! # Failure Modes
//!
//! - **Bad placeholder or model path** (syntax, or not resolvable at bind
//!   time): `bind` returns the error. Watchers created before the failure
//!   stay registered with the root.
//! - **Path stops resolving later**: the watcher's update fails and is
//!   reported to the root's failure hook; the text keeps its last content.

use std::rc::Rc;

use rvm_core::{Path, ReactiveError, Result};
use rvm_runtime::{ReactiveRoot, ReactiveRootBuilder, Value, Watcher};

use crate::dom::{Element, Node, Text};
use crate::render::render_value;
use crate::template::TextTemplate;

/// Attribute that binds an element's input value to a path.
pub const MODEL_ATTR: &str = "v-model";

/// Handles to everything [`bind`] created.
#[derive(Debug, Default)]
pub struct Bindings {
    watchers: Vec<Rc<Watcher>>,
    texts: usize,
    models: usize,
}

impl Bindings {
    #[must_use]
    pub fn watchers(&self) -> &[Rc<Watcher>] {
        &self.watchers
    }

    /// Text nodes that contained at least one placeholder.
    #[must_use]
    pub fn text_count(&self) -> usize {
        self.texts
    }

    #[must_use]
    pub fn model_count(&self) -> usize {
        self.models
    }
}

/// Bind every placeholder and model under `node` (inclusive) to `root`.
pub fn bind(root: &ReactiveRoot, node: &Node) -> Result<Bindings> {
    let mut bindings = Bindings::default();
    bind_node(root, node, &mut bindings)?;
    tracing::debug!(
        message = "template.bound",
        texts = bindings.texts,
        models = bindings.models,
        watchers = bindings.watchers.len()
    );
    Ok(bindings)
}

fn bind_node(root: &ReactiveRoot, node: &Node, bindings: &mut Bindings) -> Result<()> {
    match node {
        Node::Element(el) => {
            if let Some(expr) = el.attr(MODEL_ATTR) {
                bind_model(root, el, &expr, bindings)?;
            }
            for child in el.children() {
                bind_node(root, &child, bindings)?;
            }
        }
        Node::Text(text) => bind_text(root, text, bindings)?,
    }
    Ok(())
}

fn bind_model(
    root: &ReactiveRoot,
    el: &Element,
    expr: &str,
    bindings: &mut Bindings,
) -> Result<()> {
    let path = Path::parse(expr)?;
    let initial = root.resolve(&path)?;
    el.set_value(render_value(&initial));

    let getter_path = path.clone();
    let target = el.clone();
    let watcher = root.watch_with(
        format!("model:{path}"),
        move |vm| vm.resolve(&getter_path),
        move |value: Value| {
            target.set_value(render_value(&value));
            Ok(())
        },
    )?;

    let weak = root.downgrade();
    el.on_input(move |text| {
        let Some(vm) = weak.upgrade() else {
            return Ok(());
        };
        tracing::trace!(message = "template.input", path = %path);
        vm.set_path(&path, text).map(|_| ())
    });

    bindings.watchers.push(watcher);
    bindings.models += 1;
    Ok(())
}

fn bind_text(root: &ReactiveRoot, text: &Text, bindings: &mut Bindings) -> Result<()> {
    let template = Rc::new(TextTemplate::parse(text.source())?);
    if !template.has_placeholders() {
        return Ok(());
    }

    for path in template.placeholders() {
        let getter_path = path.clone();
        let template = Rc::clone(&template);
        let target = text.clone();
        let weak = root.downgrade();
        let watcher = root.watch_with(
            format!("text:{path}"),
            move |vm| vm.resolve(&getter_path),
            move |_| {
                let Some(vm) = weak.upgrade() else {
                    return Ok(());
                };
                target.set_content(template.render(&vm)?);
                Ok(())
            },
        )?;
        bindings.watchers.push(watcher);
    }

    text.set_content(template.render(root)?);
    bindings.texts += 1;
    Ok(())
}

/// A root together with the bindings of the tree mounted on it.
#[derive(Debug)]
pub struct Mounted {
    pub root: ReactiveRoot,
    pub bindings: Bindings,
}

/// Build a root and bind `view` to it.
pub fn mount(builder: ReactiveRootBuilder, view: &Node) -> Result<Mounted> {
    let root = builder.build()?;
    let bindings = bind(&root, view)?;
    Ok(Mounted { root, bindings })
}

/// Find the first element under `node` (inclusive) bound to `path` with
/// `v-model`.
#[must_use]
pub fn find_model(node: &Node, path: &str) -> Option<Element> {
    match node {
        Node::Text(_) => None,
        Node::Element(el) => {
            if el.attr(MODEL_ATTR).as_deref().map(str::trim) == Some(path) {
                return Some(el.clone());
            }
            el.children().iter().find_map(|child| find_model(child, path))
        }
    }
}

/// Simulate input on the element bound to `path`.
pub fn input(node: &Node, path: &str, text: &str) -> Result<()> {
    let el = find_model(node, path).ok_or_else(|| ReactiveError::unknown(path))?;
    el.input(text)
}
