#![forbid(unsafe_code)]

//! Dotted field paths (`a.b.c`).
//!
//! A [`Path`] is parsed once into its segment tokens and then interpreted
//! segment by segment against the data graph. Parsing is strict: empty
//! segments, surrounding dots, and interior whitespace are rejected so that a
//! typo in a binding fails at construction instead of silently resolving to
//! nothing.

use std::fmt;
use std::str::FromStr;

use crate::error::{ReactiveError, Result};

/// A parsed, non-empty sequence of field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// Parse a dotted path. Leading and trailing whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(syntax(raw, "path is empty"));
        }

        let mut segments = Vec::new();
        for (idx, segment) in trimmed.split('.').enumerate() {
            check_segment(raw, idx, segment)?;
            segments.push(segment.to_owned());
        }
        Ok(Self { segments })
    }

    /// A single-segment path. The name follows the same rules as a segment
    /// of [`Path::parse`], so it may not contain a dot.
    pub fn field(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_segment(&name, 0, &name)?;
        Ok(Self {
            segments: vec![name],
        })
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    /// Split into the parent segments and the final field name.
    #[must_use]
    pub fn split_last(&self) -> (&[String], &str) {
        match self.segments.split_last() {
            Some((last, parent)) => (parent, last.as_str()),
            None => (&self.segments[..0], ""),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a parsed path has at least one segment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

fn check_segment(raw: &str, idx: usize, segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(syntax(raw, format!("segment {idx} is empty")));
    }
    if let Some(bad) = segment.chars().find(|c| !is_segment_char(*c)) {
        return Err(syntax(
            raw,
            format!("segment `{segment}` contains {bad:?}"),
        ));
    }
    Ok(())
}

fn is_segment_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '-')
}

fn syntax(raw: &str, reason: impl Into<String>) -> ReactiveError {
    ReactiveError::PathSyntax {
        path: raw.to_owned(),
        reason: reason.into(),
    }
}

impl FromStr for Path {
    type Err = ReactiveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
