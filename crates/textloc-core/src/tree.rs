//! The Tree Adapter: the capability interface the cascade needs from a host
//! document tree (ADR-style boundary — see the crate root docs).
//!
//! The core never binds to a concrete tree engine. A host — a browser DOM,
//! a parsed HTML AST, an in-memory arena like `textloc-memtree` — implements
//! [`TreeAdapter`] once and gets the full four-layer cascade for free.

use crate::path::PathExpr;

/// A contiguous text region in the host tree: `(start_node, start_offset)` to
/// `(end_node, end_offset)`, offsets counted in UTF-8 bytes into the text
/// node's payload.
///
/// This is the crate's `Range` (see the glossary in spec.md) — named
/// `TextRange` here to avoid colliding with `std::ops::Range`.
pub struct TextRange<A: TreeAdapter> {
    pub start_node: A::TextNode,
    pub start_offset: usize,
    pub end_node: A::TextNode,
    pub end_offset: usize,
}

impl<A: TreeAdapter> std::fmt::Debug for TextRange<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRange")
            .field("start_node", &self.start_node)
            .field("start_offset", &self.start_offset)
            .field("end_node", &self.end_node)
            .field("end_offset", &self.end_offset)
            .finish()
    }
}

impl<A: TreeAdapter> Clone for TextRange<A> {
    fn clone(&self) -> Self {
        Self {
            start_node: self.start_node.clone(),
            start_offset: self.start_offset,
            end_node: self.end_node.clone(),
            end_offset: self.end_offset,
        }
    }
}

impl<A: TreeAdapter> PartialEq for TextRange<A> {
    fn eq(&self, other: &Self) -> bool {
        self.start_node == other.start_node
            && self.start_offset == other.start_offset
            && self.end_node == other.end_node
            && self.end_offset == other.end_offset
    }
}

impl<A: TreeAdapter> Eq for TextRange<A> {}

impl<A: TreeAdapter> TextRange<A> {
    pub fn new(
        start_node: A::TextNode,
        start_offset: usize,
        end_node: A::TextNode,
        end_offset: usize,
    ) -> Self {
        Self {
            start_node,
            start_offset,
            end_node,
            end_offset,
        }
    }

    pub fn is_same_node(&self) -> bool {
        self.start_node == self.end_node
    }
}

/// Capabilities the cascade needs from a host tree. Implement this once per
/// host; every layer, the serializer, and the validator go through it —
/// nothing in `textloc-core` touches the host tree directly.
///
/// Associated types are cheap-to-clone handles (an index, an `Rc`, a DOM
/// node reference) rather than owned nodes; the adapter owns the actual
/// tree storage.
pub trait TreeAdapter {
    type Element: Clone + Eq + std::hash::Hash + std::fmt::Debug;
    type TextNode: Clone + Eq + std::fmt::Debug;

    /// Look up an element by its `id` attribute, optionally scoped to a root.
    fn get_element_by_id(&self, scope: Option<&Self::Element>, id: &str) -> Option<Self::Element>;

    /// Look up the first element carrying `attr_name == value`, scoped to `scope`.
    fn query_by_attribute(
        &self,
        scope: Option<&Self::Element>,
        attr_name: &str,
        value: &str,
    ) -> Option<Self::Element>;

    /// Resolve a parsed path expression (§3.4 grammar) to an element.
    fn query_selector(
        &self,
        scope: Option<&Self::Element>,
        path: &PathExpr,
    ) -> Option<Self::Element>;

    /// All elements with the given lowercased tag name, scoped to `scope`.
    fn query_all(&self, scope: Option<&Self::Element>, tag: &str) -> Vec<Self::Element>;

    fn children(&self, element: &Self::Element) -> Vec<Self::Element>;
    fn parent(&self, element: &Self::Element) -> Option<Self::Element>;

    fn tag(&self, element: &Self::Element) -> String;
    fn id(&self, element: &Self::Element) -> Option<String>;
    fn classes(&self, element: &Self::Element) -> Vec<String>;
    fn attr(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// True if `a` precedes `b` in document order.
    fn is_before(&self, a: &Self::Element, b: &Self::Element) -> bool;
    /// True if `b` is `a` or a descendant of `a`.
    fn contains(&self, a: &Self::Element, b: &Self::Element) -> bool;

    /// Concatenated text content of the element's subtree.
    fn text_content(&self, element: &Self::Element) -> String;

    /// Text nodes under `element` in document order, paired with their
    /// payload length in bytes.
    fn walk_text_nodes(&self, element: &Self::Element) -> Vec<(Self::TextNode, usize)>;

    /// The element that owns a text node.
    fn text_node_parent(&self, text_node: &Self::TextNode) -> Self::Element;

    fn make_range(
        &self,
        start: &Self::TextNode,
        start_offset: usize,
        end: &Self::TextNode,
        end_offset: usize,
    ) -> TextRange<Self>
    where
        Self: Sized,
    {
        TextRange::new(start.clone(), start_offset, end.clone(), end_offset)
    }

    fn range_text(&self, range: &TextRange<Self>) -> String
    where
        Self: Sized;

    fn clone_range(&self, range: &TextRange<Self>) -> TextRange<Self>
    where
        Self: Sized,
    {
        range.clone()
    }
}

/// Find the `(text_node, local_offset)` that a character offset measured
/// from the start of `element`'s concatenated text content lands on.
///
/// Shared by the serializer (computing anchor offsets) and by L1/L2/L3/L4
/// (resolving stored offsets back to a concrete position). See spec.md
/// §4.4 step 3 for the exact boundary rules this implements:
/// - `offset == total_length` returns the last text node at its full length.
/// - `offset > total_length` (content shrank) degrades to the first
///   non-empty text node at offset 0; the caller (a layer) is expected to
///   let the Validator reject rather than silently producing garbage.
pub fn find_text_position<A: TreeAdapter>(
    adapter: &A,
    element: &A::Element,
    offset: usize,
) -> Option<(A::TextNode, usize)> {
    let nodes = adapter.walk_text_nodes(element);
    if nodes.is_empty() {
        return None;
    }

    let mut consumed = 0usize;
    for (node, len) in &nodes {
        if offset < consumed + len {
            return Some((node.clone(), offset - consumed));
        }
        consumed += len;
    }

    if offset == consumed {
        let (last_node, last_len) = nodes.last().unwrap();
        return Some((last_node.clone(), *last_len));
    }

    // Offset overflow: content was shortened since serialization. Degrade to
    // the first non-empty text node; the Validator is the backstop.
    nodes
        .iter()
        .find(|(_, len)| *len > 0)
        .map(|(node, _)| (node.clone(), 0))
        .or_else(|| nodes.first().map(|(node, _)| (node.clone(), 0)))
}

/// Total length (bytes) of `element`'s concatenated text content, derived
/// from the same text-node walk `find_text_position` uses, so the two never
/// disagree about where "the end" is.
pub fn text_content_len<A: TreeAdapter>(adapter: &A, element: &A::Element) -> usize {
    adapter
        .walk_text_nodes(element)
        .iter()
        .map(|(_, len)| len)
        .sum()
}

/// Lowest common ancestor of two elements, walking scoped to `scope` if given.
pub fn common_ancestor<A: TreeAdapter>(
    adapter: &A,
    a: &A::Element,
    b: &A::Element,
) -> Option<A::Element> {
    if adapter.contains(a, b) {
        return Some(a.clone());
    }
    if adapter.contains(b, a) {
        return Some(b.clone());
    }
    let mut ancestors_of_a = vec![a.clone()];
    let mut cur = a.clone();
    while let Some(p) = adapter.parent(&cur) {
        ancestors_of_a.push(p.clone());
        cur = p;
    }
    let mut cur = b.clone();
    loop {
        if ancestors_of_a.contains(&cur) {
            return Some(cur);
        }
        match adapter.parent(&cur) {
            Some(p) => cur = p,
            None => return None,
        }
    }
}
