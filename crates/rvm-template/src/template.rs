#![forbid(unsafe_code)]

//! `{{ path }}` text templates.
//!
//! A template is split once into literal runs and placeholder paths. The
//! delimiters match non-greedily: the first `}}` after a `{{` closes it. An
//! opening `{{` with no closing `}}` is kept as literal text.

use rvm_core::{Path, Result};
use rvm_runtime::ReactiveRoot;

use crate::render::render_value;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(Path),
}

/// A parsed text template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTemplate {
    segments: Vec<Segment>,
}

impl TextTemplate {
    /// Split `source` into segments. Fails if a placeholder's contents are
    /// not a valid path (including `{{}}` and `{{  }}`).
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(start) = rest.find(OPEN) {
            let after_open = &rest[start + OPEN.len()..];
            let Some(end) = after_open.find(CLOSE) else {
                break;
            };
            literal.push_str(&rest[..start]);
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Placeholder(Path::parse(&after_open[..end])?));
            rest = &after_open[end + CLOSE.len()..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        self.placeholders().next().is_some()
    }

    /// Placeholder paths in source order, duplicates included.
    pub fn placeholders(&self) -> impl Iterator<Item = &Path> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(path) => Some(path),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder with its current value. Reads are not
    /// tracked.
    pub fn render(&self, root: &ReactiveRoot) -> Result<String> {
        root.tracker().untracked(|| {
            let mut out = String::new();
            for segment in &self.segments {
                match segment {
                    Segment::Literal(text) => out.push_str(text),
                    Segment::Placeholder(path) => out.push_str(&render_value(&root.resolve(path)?)),
                }
            }
            Ok(out)
        })
    }
}
