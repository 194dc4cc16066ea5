#![forbid(unsafe_code)]

//! A minimal display tree.
//!
//! [`Element`] and [`Text`] are cheap `Rc` handles, so the binder can keep a
//! clone inside a watcher callback and mutate the node the caller holds.
//! Nothing here knows about reactivity; an element only keeps a list of
//! input listeners that [`Element::input`] invokes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rvm_core::Result;

/// Called with the new input value after [`Element::input`] stores it.
pub type InputListener = Rc<dyn Fn(&str) -> Result<()>>;

/// A node of the display tree.
#[derive(Clone)]
pub enum Node {
    Element(Element),
    Text(Text),
}

impl Node {
    #[must_use]
    pub fn element(element: Element) -> Self {
        Self::Element(element)
    }

    #[must_use]
    pub fn text(source: impl Into<String>) -> Self {
        Self::Text(Text::new(source))
    }

    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            Self::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Self::Text(text) => Some(text),
            Self::Element(_) => None,
        }
    }

    /// Concatenated rendered content of every text node under `self`, in
    /// document order.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(&text.content()),
            Self::Element(el) => {
                for child in el.children() {
                    child.collect_text(out);
                }
            }
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(el) => fmt::Debug::fmt(el, f),
            Self::Text(text) => fmt::Debug::fmt(text, f),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Self::Text(text)
    }
}

// ── Element ─────────────────────────────────────────────────────────────

struct ElementInner {
    tag: String,
    attributes: RefCell<IndexMap<String, String>>,
    value: RefCell<String>,
    children: RefCell<Vec<Node>>,
    listeners: RefCell<Vec<InputListener>>,
}

/// A tagged node with attributes, an input value, and children.
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.inner.tag)
            .field("attributes", &*self.inner.attributes.borrow())
            .field("value", &*self.inner.value.borrow())
            .field("children", &*self.inner.children.borrow())
            .finish_non_exhaustive()
    }
}

impl Element {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ElementInner {
                tag: tag.into(),
                attributes: RefCell::new(IndexMap::new()),
                value: RefCell::new(String::new()),
                children: RefCell::new(Vec::new()),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Set an attribute (builder style).
    #[must_use]
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner
            .attributes
            .borrow_mut()
            .insert(name.into(), value.into());
        self
    }

    /// Append a child (builder style).
    #[must_use]
    pub fn with_child(self, child: impl Into<Node>) -> Self {
        self.inner.children.borrow_mut().push(child.into());
        self
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.inner.tag
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<String> {
        self.inner.attributes.borrow().get(name).cloned()
    }

    /// Attributes in declaration order.
    #[must_use]
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.inner
            .attributes
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        self.inner.children.borrow().clone()
    }

    #[must_use]
    pub fn value(&self) -> String {
        self.inner.value.borrow().clone()
    }

    /// Replace the input value without notifying listeners.
    pub fn set_value(&self, value: impl Into<String>) {
        *self.inner.value.borrow_mut() = value.into();
    }

    pub fn on_input(&self, listener: impl Fn(&str) -> Result<()> + 'static) {
        self.inner.listeners.borrow_mut().push(Rc::new(listener));
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Simulate user input: store `text` as the value, then run every input
    /// listener in registration order. Stops at the first listener error.
    pub fn input(&self, text: &str) -> Result<()> {
        self.set_value(text);
        let listeners = self.inner.listeners.borrow().clone();
        for listener in listeners {
            listener(text)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// ── Text ────────────────────────────────────────────────────────────────

struct TextInner {
    source: String,
    content: RefCell<String>,
}

/// A text node. `source` is the template as written; `content` is what is
/// displayed and starts out equal to `source`.
#[derive(Clone)]
pub struct Text {
    inner: Rc<TextInner>,
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Text")
            .field("source", &self.inner.source)
            .field("content", &*self.inner.content.borrow())
            .finish()
    }
}

impl Text {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            inner: Rc::new(TextInner {
                content: RefCell::new(source.clone()),
                source,
            }),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    #[must_use]
    pub fn content(&self) -> String {
        self.inner.content.borrow().clone()
    }

    pub fn set_content(&self, content: impl Into<String>) {
        *self.inner.content.borrow_mut() = content.into();
    }
}
