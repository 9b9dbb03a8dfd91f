//! Given a live selection, produce a [`Descriptor`] (spec.md §4.1). The
//! descriptor is the only thing that crosses a process/storage boundary;
//! everything downstream (the four layers) is reconstructed from it.

use crate::config::LocatorConfig;
use crate::descriptor::{
    Descriptor, ElementAnchor, Fingerprint, IdentityAnchors, MultiAnchor, ParentChainEntry,
    PathAnchors, SiblingInfo, SiblingPattern, TextContext, TextPosition, MULTI_ANCHOR_ATTRIBUTES,
    PARENT_CHAIN_DEPTH,
};
use crate::path::build_path;
use crate::tree::{common_ancestor, TextRange, TreeAdapter};

#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Characters of context captured before/after the selection (§3.7).
    pub context_length: usize,
    /// Explicit id for the descriptor; a `uuid` v4 is generated if absent.
    pub id: Option<String>,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            context_length: 50,
            id: None,
        }
    }
}

pub struct Serializer<'a> {
    config: &'a LocatorConfig,
}

impl<'a> Serializer<'a> {
    pub fn new(config: &'a LocatorConfig) -> Self {
        Self { config }
    }

    /// Returns `None` if the selection is collapsed or whitespace-only
    /// (spec.md §4.1 "Error conditions").
    pub fn serialize<A: TreeAdapter>(
        &self,
        adapter: &A,
        range: &TextRange<A>,
        options: SerializeOptions,
    ) -> Option<Descriptor> {
        let text = adapter.range_text(range);
        if text.trim().is_empty() {
            return None;
        }

        let start_element = adapter.text_node_parent(&range.start_node);
        let end_element = adapter.text_node_parent(&range.end_node);

        let anchors = self.build_identity_anchors(adapter, range, &start_element, &end_element);
        let paths = self.build_path_anchors(adapter, range, &start_element, &end_element);
        let multi = self.build_multi_anchor(adapter, &start_element, &end_element);
        let fingerprint = self.build_fingerprint(adapter, &start_element);
        let context = self.build_text_context(adapter, range, &start_element, options.context_length);

        Some(Descriptor {
            id: options.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            text,
            anchors,
            paths,
            multi,
            fingerprint,
            context,
        })
    }

    /// Walk up from an element to the nearest ancestor (inclusive) whose id
    /// (or configured custom-id attribute) is non-null and accepted by the
    /// id filter (spec.md §4.1 "anchors").
    fn nearest_identified_ancestor<A: TreeAdapter>(
        &self,
        adapter: &A,
        start: &A::Element,
    ) -> Option<(A::Element, Option<String>, Option<String>)> {
        let mut current = Some(start.clone());
        while let Some(el) = current {
            let custom_id = self
                .config
                .custom_id_attribute()
                .and_then(|attr| adapter.attr(&el, attr));
            let standard_id = adapter.id(&el);

            let custom_ok = custom_id.as_deref().is_some_and(|id| self.config.accepts_id(id));
            let standard_ok = standard_id.as_deref().is_some_and(|id| self.config.accepts_id(id));

            if custom_ok || standard_ok {
                return Some((
                    el,
                    if standard_ok { standard_id } else { None },
                    if custom_ok { custom_id } else { None },
                ));
            }
            current = adapter.parent(&el);
        }
        None
    }

    fn offset_within_anchor<A: TreeAdapter>(
        &self,
        adapter: &A,
        anchor: &A::Element,
        text_node: &A::TextNode,
        local_offset: usize,
    ) -> usize {
        let mut consumed = 0usize;
        for (node, len) in adapter.walk_text_nodes(anchor) {
            if node == *text_node {
                return consumed + local_offset;
            }
            consumed += len;
        }
        consumed
    }

    fn build_identity_anchors<A: TreeAdapter>(
        &self,
        adapter: &A,
        range: &TextRange<A>,
        start_element: &A::Element,
        end_element: &A::Element,
    ) -> IdentityAnchors {
        let start = self.nearest_identified_ancestor(adapter, start_element);
        let end = self.nearest_identified_ancestor(adapter, end_element);

        let (start_anchor, start_id, start_custom_id) = match &start {
            Some((el, id, custom)) => (Some(el.clone()), id.clone(), custom.clone()),
            None => (None, None, None),
        };
        let (end_anchor, end_id, end_custom_id) = match &end {
            Some((el, id, custom)) => (Some(el.clone()), id.clone(), custom.clone()),
            None => (None, None, None),
        };

        let start_offset = start_anchor
            .as_ref()
            .map(|anchor| self.offset_within_anchor(adapter, anchor, &range.start_node, range.start_offset))
            .unwrap_or(0);
        let end_offset = end_anchor
            .as_ref()
            .map(|anchor| self.offset_within_anchor(adapter, anchor, &range.end_node, range.end_offset))
            .unwrap_or(0);

        IdentityAnchors {
            start_id,
            end_id,
            start_offset,
            end_offset,
            start_custom_id,
            end_custom_id,
            custom_id_attribute: self.config.custom_id_attribute().map(str::to_string),
        }
    }

    fn build_path_anchors<A: TreeAdapter>(
        &self,
        adapter: &A,
        range: &TextRange<A>,
        start_element: &A::Element,
        end_element: &A::Element,
    ) -> PathAnchors {
        let start_path = build_path(adapter, start_element).to_string();
        let end_path = build_path(adapter, end_element).to_string();

        let start_offset =
            self.offset_within_anchor(adapter, start_element, &range.start_node, range.start_offset);
        let end_offset =
            self.offset_within_anchor(adapter, end_element, &range.end_node, range.end_offset);

        PathAnchors {
            start_path,
            end_path,
            start_offset,
            end_offset,
            start_text_offset: start_offset,
            end_text_offset: end_offset,
        }
    }

    fn element_anchor<A: TreeAdapter>(&self, adapter: &A, element: &A::Element) -> ElementAnchor {
        let attributes = MULTI_ANCHOR_ATTRIBUTES
            .iter()
            .filter_map(|name| adapter.attr(element, name).map(|v| (name.to_string(), v)))
            .collect();
        ElementAnchor {
            tag: adapter.tag(element),
            class_string: adapter.classes(element).join(" "),
            id: adapter.id(element),
            attributes,
        }
    }

    fn build_multi_anchor<A: TreeAdapter>(
        &self,
        adapter: &A,
        start_element: &A::Element,
        end_element: &A::Element,
    ) -> MultiAnchor {
        let start_anchor = self.element_anchor(adapter, start_element);
        let end_anchor = self.element_anchor(adapter, end_element);

        let common_parent =
            common_ancestor(adapter, start_element, end_element).map(|el| build_path(adapter, &el).to_string());

        let sibling_info = adapter.parent(start_element).and_then(|start_parent| {
            let end_parent = adapter.parent(end_element)?;
            if start_parent != end_parent {
                return None;
            }
            let siblings = adapter.children(&start_parent);
            let start_idx = siblings.iter().position(|e| e == start_element)?;
            let end_idx = siblings.iter().position(|e| e == end_element)?;
            let (lo, hi) = (start_idx.min(end_idx), start_idx.max(end_idx));
            let tag_pattern = siblings[lo..=hi]
                .iter()
                .map(|el| adapter.tag(el))
                .collect::<Vec<_>>()
                .join(",");
            Some(SiblingInfo {
                index: start_idx,
                total: siblings.len(),
                tag_pattern,
            })
        });

        MultiAnchor {
            start_anchor,
            end_anchor,
            common_parent,
            sibling_info,
        }
    }

    fn build_fingerprint<A: TreeAdapter>(&self, adapter: &A, start_element: &A::Element) -> Fingerprint {
        let attributes = MULTI_ANCHOR_ATTRIBUTES
            .iter()
            .filter_map(|name| adapter.attr(start_element, name).map(|v| (name.to_string(), v)))
            .collect();

        let text_length = adapter.text_content(start_element).chars().count();
        let child_count = adapter.children(start_element).len();

        let mut depth = 0usize;
        let mut parent_chain = Vec::new();
        let mut current = adapter.parent(start_element);
        while let Some(el) = current {
            depth += 1;
            if parent_chain.len() < PARENT_CHAIN_DEPTH {
                parent_chain.push(ParentChainEntry {
                    tag: adapter.tag(&el),
                    class_string: adapter.classes(&el).join(" "),
                    id: adapter.id(&el),
                });
            }
            current = adapter.parent(&el);
        }

        let sibling_pattern = adapter.parent(start_element).and_then(|parent| {
            let siblings = adapter.children(&parent);
            let position = siblings.iter().position(|e| e == start_element)?;
            let before_tags = siblings[..position]
                .iter()
                .rev()
                .take(2)
                .map(|e| adapter.tag(e))
                .collect::<Vec<_>>();
            let after_tags = siblings[position + 1..]
                .iter()
                .take(2)
                .map(|e| adapter.tag(e))
                .collect::<Vec<_>>();
            Some(SiblingPattern {
                position,
                total: siblings.len(),
                before_tags,
                after_tags,
            })
        });

        Fingerprint {
            tag: adapter.tag(start_element),
            class_string: adapter.classes(start_element).join(" "),
            attributes,
            text_length,
            child_count,
            depth,
            parent_chain,
            sibling_pattern,
        }
    }

    fn build_text_context<A: TreeAdapter>(
        &self,
        adapter: &A,
        range: &TextRange<A>,
        start_element: &A::Element,
        context_length: usize,
    ) -> TextContext {
        let start_text = full_text_node_content(adapter, &range.start_node);

        let preceding_text = take_last_chars(&start_text[..range.start_offset.min(start_text.len())], context_length);
        let following_text = take_first_chars(&start_text[range.start_offset.min(start_text.len())..], context_length);

        let raw_parent_text = adapter.text_content(start_element);
        let parent_text = normalize_whitespace(&raw_parent_text);

        let sel_start = parent_text_index_of(&raw_parent_text, &parent_text, range.start_offset);
        let sel_len = adapter.range_text(range).chars().count();

        TextContext {
            preceding_text,
            following_text,
            parent_text: parent_text.clone(),
            text_position: TextPosition {
                start: sel_start,
                end: sel_start + sel_len,
                total_length: parent_text.chars().count(),
            },
        }
    }
}

/// The payload of a single text node, reconstructed from its parent's
/// concatenated text content at the byte range this node occupies within
/// it (the adapter exposes only per-node lengths, not per-node slices).
fn full_text_node_content<A: TreeAdapter>(adapter: &A, node: &A::TextNode) -> String {
    let parent = adapter.text_node_parent(node);
    let full = adapter.text_content(&parent);
    let mut consumed = 0usize;
    for (n, len) in adapter.walk_text_nodes(&parent) {
        if n == *node {
            return full.get(consumed..consumed + len).unwrap_or("").to_string();
        }
        consumed += len;
    }
    String::new()
}

fn take_last_chars(s: &str, n: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    let start = chars.len().saturating_sub(n);
    chars[start..].iter().collect()
}

fn take_first_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out.trim().to_string()
}

/// Best-effort mapping of a raw byte offset in `raw` to a char index in the
/// whitespace-normalized `normalized`, used only for the context's
/// `text_position` (a UI hint, not something the Validator checks).
fn parent_text_index_of(raw: &str, normalized: &str, raw_offset: usize) -> usize {
    let raw_prefix_chars = raw.get(..raw_offset.min(raw.len())).unwrap_or("").chars().count();
    raw_prefix_chars.min(normalized.chars().count())
}
