//! Markup-tree access helpers.
//!
//! Manifests, component descriptors, and movie-clip metadata are all
//! attributed element trees. Parsing is delegated to `xmltree`; this
//! module adds the reader conventions those descriptors rely on:
//! default-valued attribute accessors, comma-separated pair/array
//! attributes (`size="W,H"`, `rect="x,y,w,h"`), and ordered child
//! iteration filtered by tag name.

pub use xmltree::Element;
use xmltree::XMLNode;

use crate::error::PackageError;

/// Parse a descriptor text into an element tree.
///
/// `name` is the archive entry name, used only for error context.
pub fn parse(name: &str, text: &str) -> Result<Element, PackageError> {
    Element::parse(text.as_bytes()).map_err(|source| PackageError::Markup {
        name: name.to_string(),
        source,
    })
}

/// Attribute and child readers used by every descriptor consumer.
pub trait ElementExt {
    /// Attribute value, if present.
    fn attr(&self, name: &str) -> Option<&str>;

    /// Boolean attribute; absent or non-`"true"` reads as `false`.
    fn attr_bool(&self, name: &str) -> bool;

    /// Integer attribute; absent or unparsable reads as 0.
    fn attr_i32(&self, name: &str) -> i32;

    /// Float attribute, if present and parsable.
    fn attr_f32(&self, name: &str) -> Option<f32>;

    /// Comma-separated float list attribute, if present.
    fn attr_array(&self, name: &str) -> Option<Vec<f32>>;

    /// Comma-separated `"W,H"` integer pair attribute, if present and
    /// fully parsable.
    fn attr_pair(&self, name: &str) -> Option<(i32, i32)>;

    /// First child element with the given tag, in document order.
    fn child(&self, tag: &str) -> Option<&Element>;

    /// Mutable variant of [`ElementExt::child`].
    fn child_mut(&mut self, tag: &str) -> Option<&mut Element>;

    /// All child elements in document order.
    fn elements(&self) -> Vec<&Element>;

    /// Child elements with the given tag, in document order.
    fn elements_named(&self, tag: &str) -> Vec<&Element>;
}

impl ElementExt for Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    fn attr_bool(&self, name: &str) -> bool {
        self.attr(name) == Some("true")
    }

    fn attr_i32(&self, name: &str) -> i32 {
        self.attr(name).and_then(|v| v.parse().ok()).unwrap_or(0)
    }

    fn attr_f32(&self, name: &str) -> Option<f32> {
        self.attr(name).and_then(|v| v.parse().ok())
    }

    fn attr_array(&self, name: &str) -> Option<Vec<f32>> {
        let raw = self.attr(name)?;
        raw.split(',')
            .map(|f| f.trim().parse().ok())
            .collect::<Option<Vec<f32>>>()
    }

    fn attr_pair(&self, name: &str) -> Option<(i32, i32)> {
        let raw = self.attr(name)?;
        let mut parts = raw.split(',');
        let w = parts.next()?.trim().parse().ok()?;
        let h = parts.next()?.trim().parse().ok()?;
        Some((w, h))
    }

    fn child(&self, tag: &str) -> Option<&Element> {
        self.get_child(tag)
    }

    fn child_mut(&mut self, tag: &str) -> Option<&mut Element> {
        self.get_mut_child(tag)
    }

    fn elements(&self) -> Vec<&Element> {
        self.children
            .iter()
            .filter_map(|node| match node {
                XMLNode::Element(el) => Some(el),
                _ => None,
            })
            .collect()
    }

    fn elements_named(&self, tag: &str) -> Vec<&Element> {
        self.elements()
            .into_iter()
            .filter(|el| el.name == tag)
            .collect()
    }
}
