//! A small arena-backed element/text tree and its [`TreeAdapter`]
//! implementation — the reference host for `textloc-core`'s cascade when
//! there is no browser DOM to bind to (parsed HTML on a server, tests,
//! benches). Not a parser: callers build the tree with the [`MemTree`]
//! builder API, the way a real adapter would build it from whatever the
//! host actually parses.

use std::collections::BTreeMap;

use textloc_core::path::{PathExpr, PathSegment};
use textloc_core::tree::{TextRange, TreeAdapter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextNodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        id: Option<String>,
        classes: Vec<String>,
        attrs: BTreeMap<String, String>,
        children: Vec<usize>,
    },
    Text {
        content: String,
    },
}

#[derive(Debug, Clone)]
struct NodeSlot {
    parent: Option<usize>,
    kind: NodeKind,
}

/// An arena tree of elements and text nodes. Index `0` is always the
/// document root element.
#[derive(Debug, Clone)]
pub struct MemTree {
    nodes: Vec<NodeSlot>,
}

impl Default for MemTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTree {
    pub fn new() -> Self {
        let root = NodeSlot {
            parent: None,
            kind: NodeKind::Element {
                tag: "root".to_string(),
                id: None,
                classes: Vec::new(),
                attrs: BTreeMap::new(),
                children: Vec::new(),
            },
        };
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    pub fn append_element(&mut self, parent: ElementId, tag: &str) -> ElementId {
        let idx = self.nodes.len();
        self.nodes.push(NodeSlot {
            parent: Some(parent.0),
            kind: NodeKind::Element {
                tag: tag.to_lowercase(),
                id: None,
                classes: Vec::new(),
                attrs: BTreeMap::new(),
                children: Vec::new(),
            },
        });
        self.push_child(parent.0, idx);
        ElementId(idx)
    }

    pub fn append_text(&mut self, parent: ElementId, content: &str) -> TextNodeId {
        let idx = self.nodes.len();
        self.nodes.push(NodeSlot {
            parent: Some(parent.0),
            kind: NodeKind::Text {
                content: content.to_string(),
            },
        });
        self.push_child(parent.0, idx);
        TextNodeId(idx)
    }

    fn push_child(&mut self, parent_idx: usize, child_idx: usize) {
        if let NodeKind::Element { children, .. } = &mut self.nodes[parent_idx].kind {
            children.push(child_idx);
        } else {
            panic!("cannot append a child to a text node");
        }
    }

    pub fn set_id(&mut self, element: ElementId, id: impl Into<String>) {
        if let NodeKind::Element { id: slot, .. } = &mut self.nodes[element.0].kind {
            *slot = Some(id.into());
        }
    }

    pub fn set_attr(&mut self, element: ElementId, name: impl Into<String>, value: impl Into<String>) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[element.0].kind {
            attrs.insert(name.into(), value.into());
        }
    }

    pub fn set_classes(&mut self, element: ElementId, classes: &[&str]) {
        if let NodeKind::Element { classes: slot, .. } = &mut self.nodes[element.0].kind {
            *slot = classes.iter().map(|c| c.to_string()).collect();
        }
    }

    fn element_data(&self, id: ElementId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    fn as_element(&self, idx: usize) -> Option<ElementId> {
        matches!(self.nodes[idx].kind, NodeKind::Element { .. }).then_some(ElementId(idx))
    }
}

/// The `TreeAdapter` binding for [`MemTree`]. Owns the tree so callers can
/// hand `&MemTreeAdapter` straight to `serialize`/`restore`.
#[derive(Debug, Clone)]
pub struct MemTreeAdapter {
    tree: MemTree,
}

impl MemTreeAdapter {
    pub fn new(tree: MemTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &MemTree {
        &self.tree
    }
}

impl TreeAdapter for MemTreeAdapter {
    type Element = ElementId;
    type TextNode = TextNodeId;

    fn get_element_by_id(&self, scope: Option<&ElementId>, id: &str) -> Option<ElementId> {
        self.find_element(scope, &|tree, el| match tree.element_data(el) {
            NodeKind::Element { id: Some(i), .. } => i == id,
            _ => false,
        })
    }

    fn query_by_attribute(
        &self,
        scope: Option<&ElementId>,
        attr_name: &str,
        value: &str,
    ) -> Option<ElementId> {
        self.find_element(scope, &|tree, el| match tree.element_data(el) {
            NodeKind::Element { attrs, .. } => attrs.get(attr_name).map(|v| v.as_str()) == Some(value),
            _ => false,
        })
    }

    fn query_selector(&self, scope: Option<&ElementId>, path: &PathExpr) -> Option<ElementId> {
        let segments = match path {
            PathExpr::Css(segments) => segments,
            PathExpr::XPath(_) => return None,
        };
        let root = scope.copied().unwrap_or_else(|| self.tree.root());
        resolve_css_chain(&self.tree, root, segments)
    }

    fn query_all(&self, scope: Option<&ElementId>, tag: &str) -> Vec<ElementId> {
        let mut out = Vec::new();
        let root = scope.copied().unwrap_or_else(|| self.tree.root());
        self.collect_all(root, tag, &mut out);
        out
    }

    fn children(&self, element: &ElementId) -> Vec<ElementId> {
        match self.tree.element_data(*element) {
            NodeKind::Element { children, .. } => children
                .iter()
                .filter_map(|idx| self.tree.as_element(*idx))
                .collect(),
            NodeKind::Text { .. } => Vec::new(),
        }
    }

    fn parent(&self, element: &ElementId) -> Option<ElementId> {
        self.tree.nodes[element.0]
            .parent
            .and_then(|idx| self.tree.as_element(idx))
    }

    fn tag(&self, element: &ElementId) -> String {
        match self.tree.element_data(*element) {
            NodeKind::Element { tag, .. } => tag.clone(),
            NodeKind::Text { .. } => String::new(),
        }
    }

    fn id(&self, element: &ElementId) -> Option<String> {
        match self.tree.element_data(*element) {
            NodeKind::Element { id, .. } => id.clone(),
            NodeKind::Text { .. } => None,
        }
    }

    fn classes(&self, element: &ElementId) -> Vec<String> {
        match self.tree.element_data(*element) {
            NodeKind::Element { classes, .. } => classes.clone(),
            NodeKind::Text { .. } => Vec::new(),
        }
    }

    fn attr(&self, element: &ElementId, name: &str) -> Option<String> {
        match self.tree.element_data(*element) {
            NodeKind::Element { attrs, .. } => attrs.get(name).cloned(),
            NodeKind::Text { .. } => None,
        }
    }

    fn is_before(&self, a: &ElementId, b: &ElementId) -> bool {
        if a == b {
            return false;
        }
        let mut order = Vec::new();
        self.document_order(self.tree.root(), &mut order);
        let pos_a = order.iter().position(|e| e == a);
        let pos_b = order.iter().position(|e| e == b);
        match (pos_a, pos_b) {
            (Some(pa), Some(pb)) => pa < pb,
            _ => false,
        }
    }

    fn contains(&self, a: &ElementId, b: &ElementId) -> bool {
        if a == b {
            return true;
        }
        let mut current = self.parent(b);
        while let Some(p) = current {
            if &p == a {
                return true;
            }
            current = self.parent(&p);
        }
        false
    }

    fn text_content(&self, element: &ElementId) -> String {
        let mut out = String::new();
        self.collect_text(*element, &mut out);
        out
    }

    fn walk_text_nodes(&self, element: &ElementId) -> Vec<(TextNodeId, usize)> {
        let mut out = Vec::new();
        self.collect_text_nodes(*element, &mut out);
        out
    }

    fn text_node_parent(&self, text_node: &TextNodeId) -> ElementId {
        let parent_idx = self.tree.nodes[text_node.0]
            .parent
            .expect("text node always has a parent");
        self.tree
            .as_element(parent_idx)
            .expect("text node's parent is an element")
    }

    fn range_text(&self, range: &TextRange<Self>) -> String
    where
        Self: Sized,
    {
        if range.start_node == range.end_node {
            let content = self.text_of(range.start_node);
            return slice_chars(content, range.start_offset, range.end_offset);
        }

        let mut out = String::new();
        let start_parent = self.text_node_parent(&range.start_node);
        let nodes = self.walk_text_nodes(&start_parent);

        // Gather every text node between start_node and end_node in
        // document order, which may span multiple elements if the
        // descriptor's anchors live in different ancestors: walk the whole
        // tree's text nodes, not just one element's.
        let mut global = Vec::new();
        self.collect_text_nodes(self.tree.root(), &mut global);

        let start_pos = global.iter().position(|(n, _)| *n == range.start_node);
        let end_pos = global.iter().position(|(n, _)| *n == range.end_node);
        let (Some(start_pos), Some(end_pos)) = (start_pos, end_pos) else {
            let _ = nodes;
            return out;
        };

        for (node, _) in &global[start_pos..=end_pos] {
            let content = self.text_of(*node);
            let (from, to) = if *node == range.start_node && *node == range.end_node {
                (range.start_offset, range.end_offset)
            } else if *node == range.start_node {
                (range.start_offset, content.len())
            } else if *node == range.end_node {
                (0, range.end_offset)
            } else {
                (0, content.len())
            };
            out.push_str(&slice_chars(content, from, to));
        }
        out
    }
}

/// Round `idx` down to the nearest UTF-8 char boundary `<= idx`. Offsets
/// reaching this function come from byte-length bookkeeping upstream
/// (normalized-match mapping, the Validator's single-character backoff)
/// and aren't guaranteed to land on a boundary; rounding down yields the
/// wrong text rather than a panic, and the Validator rejects wrong text
/// the same as it rejects anything else.
fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn slice_chars(s: &str, from: usize, to: usize) -> String {
    let from = floor_char_boundary(s, from);
    let to = floor_char_boundary(s, to);
    if from >= to {
        return String::new();
    }
    s[from..to].to_string()
}

impl MemTreeAdapter {
    fn text_of(&self, node: TextNodeId) -> &str {
        match &self.tree.nodes[node.0].kind {
            NodeKind::Text { content } => content,
            NodeKind::Element { .. } => "",
        }
    }

    fn find_element(
        &self,
        scope: Option<&ElementId>,
        pred: &dyn Fn(&MemTree, ElementId) -> bool,
    ) -> Option<ElementId> {
        let root = scope.copied().unwrap_or_else(|| self.tree.root());
        let mut stack = vec![root];
        while let Some(el) = stack.pop() {
            if pred(&self.tree, el) {
                return Some(el);
            }
            if let NodeKind::Element { children, .. } = self.tree.element_data(el) {
                for idx in children.iter().rev() {
                    if let Some(child) = self.tree.as_element(*idx) {
                        stack.push(child);
                    }
                }
            }
        }
        None
    }

    fn collect_all(&self, scope: ElementId, tag: &str, out: &mut Vec<ElementId>) {
        if let NodeKind::Element { tag: t, children, .. } = self.tree.element_data(scope) {
            if t == tag {
                out.push(scope);
            }
            for idx in children {
                if let Some(child) = self.tree.as_element(*idx) {
                    self.collect_all(child, tag, out);
                }
            }
        }
    }

    fn collect_text(&self, scope: ElementId, out: &mut String) {
        if let NodeKind::Element { children, .. } = self.tree.element_data(scope) {
            for idx in children {
                match &self.tree.nodes[*idx].kind {
                    NodeKind::Text { content } => out.push_str(content),
                    NodeKind::Element { .. } => {
                        self.collect_text(ElementId(*idx), out);
                    }
                }
            }
        }
    }

    fn collect_text_nodes(&self, scope: ElementId, out: &mut Vec<(TextNodeId, usize)>) {
        if let NodeKind::Element { children, .. } = self.tree.element_data(scope) {
            for idx in children {
                match &self.tree.nodes[*idx].kind {
                    NodeKind::Text { content } => out.push((TextNodeId(*idx), content.len())),
                    NodeKind::Element { .. } => {
                        self.collect_text_nodes(ElementId(*idx), out);
                    }
                }
            }
        }
    }

    fn document_order(&self, scope: ElementId, out: &mut Vec<ElementId>) {
        out.push(scope);
        if let NodeKind::Element { children, .. } = self.tree.element_data(scope) {
            for idx in children {
                if let Some(child) = self.tree.as_element(*idx) {
                    self.document_order(child, out);
                }
            }
        }
    }
}

fn resolve_css_chain(tree: &MemTree, scope: ElementId, segments: &[PathSegment]) -> Option<ElementId> {
    let mut current = scope;
    for segment in segments {
        current = find_direct_child_matching(tree, current, segment)?;
    }
    Some(current)
}

fn find_direct_child_matching(
    tree: &MemTree,
    parent: ElementId,
    segment: &PathSegment,
) -> Option<ElementId> {
    // A leading bare `#id` segment can match the scope root itself too (the
    // "short form" of §3.4), not only its children.
    if segment.tag.is_empty() && segment.classes.is_empty() {
        if let Some(id) = &segment.id {
            if matches_id(tree, parent, id) {
                return Some(parent);
            }
        }
    }

    let NodeKind::Element { children, .. } = tree.element_data(parent) else {
        return None;
    };
    let candidates: Vec<ElementId> = children
        .iter()
        .filter_map(|idx| tree.as_element(*idx))
        .filter(|el| segment_matches(tree, *el, segment))
        .collect();

    if let Some(n) = segment.nth_of_type {
        let same_tag: Vec<ElementId> = children
            .iter()
            .filter_map(|idx| tree.as_element(*idx))
            .filter(|el| matches!(tree.element_data(*el), NodeKind::Element { tag, .. } if *tag == segment.tag))
            .collect();
        return same_tag.get(n.saturating_sub(1)).copied().filter(|el| candidates.contains(el));
    }

    candidates.into_iter().next()
}

fn matches_id(tree: &MemTree, el: ElementId, id: &str) -> bool {
    matches!(tree.element_data(el), NodeKind::Element { id: Some(i), .. } if i == id)
}

fn segment_matches(tree: &MemTree, el: ElementId, segment: &PathSegment) -> bool {
    let NodeKind::Element {
        tag, id, classes, ..
    } = tree.element_data(el)
    else {
        return false;
    };
    if !segment.tag.is_empty() && tag != &segment.tag {
        return false;
    }
    if let Some(want_id) = &segment.id {
        if id.as_deref() != Some(want_id.as_str()) {
            return false;
        }
    }
    segment
        .classes
        .iter()
        .all(|c| classes.iter().any(|have| have == c))
}
