//! L1 — Identity Anchor (spec.md §4.4): exact restoration via stable element
//! identifiers plus in-element text offsets, with offset-overflow repair
//! for the cross-element case.

use crate::descriptor::Descriptor;
use crate::error::{LayerError, LayerResult};
use crate::tree::{common_ancestor, find_text_position, TextRange, TreeAdapter};
use crate::validator;

pub fn restore<A: TreeAdapter>(
    descriptor: &Descriptor,
    adapter: &A,
    scope: Option<&A::Element>,
) -> LayerResult<TextRange<A>> {
    let start_element = resolve_identity(adapter, scope, &descriptor.anchors, Side::Start)
        .ok_or(LayerError::MissingAnchor)?;
    let end_element = resolve_identity(adapter, scope, &descriptor.anchors, Side::End)
        .ok_or(LayerError::MissingAnchor)?;

    if descriptor.is_same_element_by_id() {
        let range = build_same_element_range(
            adapter,
            &start_element,
            descriptor.anchors.start_offset,
            descriptor.anchors.end_offset,
        )
        .ok_or(LayerError::OffsetMismatch)?;
        return validator::validate(adapter, range, &descriptor.text);
    }

    restore_cross_element(descriptor, adapter, &start_element, &end_element)
}

enum Side {
    Start,
    End,
}

fn resolve_identity<A: TreeAdapter>(
    adapter: &A,
    scope: Option<&A::Element>,
    anchors: &crate::descriptor::IdentityAnchors,
    side: Side,
) -> Option<A::Element> {
    let (id, custom_id) = match side {
        Side::Start => (&anchors.start_id, &anchors.start_custom_id),
        Side::End => (&anchors.end_id, &anchors.end_custom_id),
    };

    if let (Some(attr), Some(value)) = (&anchors.custom_id_attribute, custom_id) {
        if let Some(el) = adapter.query_by_attribute(scope, attr, value) {
            return Some(el);
        }
    }
    let id = id.as_deref()?;
    adapter.get_element_by_id(scope, id)
}

fn build_same_element_range<A: TreeAdapter>(
    adapter: &A,
    element: &A::Element,
    start_offset: usize,
    end_offset: usize,
) -> Option<TextRange<A>> {
    let (start_node, start_local) = find_text_position(adapter, element, start_offset)?;
    let (end_node, end_local) = find_text_position(adapter, element, end_offset)?;
    Some(adapter.make_range(&start_node, start_local, &end_node, end_local))
}

fn restore_cross_element<A: TreeAdapter>(
    descriptor: &Descriptor,
    adapter: &A,
    start_element: &A::Element,
    end_element: &A::Element,
) -> LayerResult<TextRange<A>> {
    let anchors = &descriptor.anchors;

    // 1. Raw stored offsets.
    if let Some(range) = build_cross_range(adapter, start_element, anchors.start_offset, end_element, anchors.end_offset) {
        if let Ok(validated) = validator::validate(adapter, range, &descriptor.text) {
            return Ok(validated);
        }
    }

    // 2. Offset repair: search the concatenation of both elements' text for
    // the literal descriptor text, then map the found span back to
    // element-local offsets.
    if let Some(range) = repair_by_concatenation(adapter, start_element, end_element, &descriptor.text) {
        if let Ok(validated) = validator::validate(adapter, range, &descriptor.text) {
            return Ok(validated);
        }
    }

    // 3. Common-ancestor precise walk, with up to 5 single-character
    // end-offset backoffs.
    if let Some(ancestor) = common_ancestor(adapter, start_element, end_element) {
        if let Some(range) = precise_walk(adapter, &ancestor, &descriptor.text) {
            if let Ok(validated) = validator::validate(adapter, range, &descriptor.text) {
                return Ok(validated);
            }
        }
    }

    Err(LayerError::OffsetMismatch)
}

fn build_cross_range<A: TreeAdapter>(
    adapter: &A,
    start_element: &A::Element,
    start_offset: usize,
    end_element: &A::Element,
    end_offset: usize,
) -> Option<TextRange<A>> {
    let (start_node, start_local) = find_text_position(adapter, start_element, start_offset)?;
    let (end_node, end_local) = find_text_position(adapter, end_element, end_offset)?;
    Some(adapter.make_range(&start_node, start_local, &end_node, end_local))
}

/// spec.md §4.4 step 5: "concatenate start_element.text_content +
/// end_element.text_content, search for the literal descriptor.text in
/// this concatenation. If found, map the found indices back into (start,
/// end) element-local offsets according to where the concatenation
/// boundary falls."
fn repair_by_concatenation<A: TreeAdapter>(
    adapter: &A,
    start_element: &A::Element,
    end_element: &A::Element,
    text: &str,
) -> Option<TextRange<A>> {
    let start_text = adapter.text_content(start_element);
    let end_text = adapter.text_content(end_element);
    let concatenation = format!("{start_text}{end_text}");

    let found_at = concatenation.find(text)?;
    let found_end = found_at + text.len();
    let boundary = start_text.len();

    // Map the concatenation's found span back to (element, local offset)
    // pairs depending on where the boundary between the two elements' text
    // falls within the match.
    let start_side = if found_at < boundary {
        find_text_position(adapter, start_element, found_at)?
    } else {
        find_text_position(adapter, end_element, found_at - boundary)?
    };
    let end_side = if found_end <= boundary {
        find_text_position(adapter, start_element, found_end)?
    } else {
        find_text_position(adapter, end_element, found_end - boundary)?
    };

    Some(adapter.make_range(&start_side.0, start_side.1, &end_side.0, end_side.1))
}

/// spec.md §4.4 step 6: search the lowest common ancestor's full text for
/// `text`, walk its text nodes to place start/end precisely, then try up
/// to 5 single-character end-offset backoffs if the exact span still
/// mismatches (the Validator applies a similar tolerance independently;
/// this is the layer's own attempt to land on an exact span first).
fn precise_walk<A: TreeAdapter>(adapter: &A, ancestor: &A::Element, text: &str) -> Option<TextRange<A>> {
    let ancestor_text = adapter.text_content(ancestor);
    let found_at = ancestor_text.find(text)?;

    for backoff in 0..=5usize {
        let end_at = found_at + text.len().saturating_sub(backoff);
        if end_at < found_at {
            break;
        }
        if let (Some((n1, o1)), Some((n2, o2))) = (
            find_text_position(adapter, ancestor, found_at),
            find_text_position(adapter, ancestor, end_at),
        ) {
            return Some(adapter.make_range(&n1, o1, &n2, o2));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocatorConfig;
    use textloc_memtree::{MemTree, MemTreeAdapter};

    #[test]
    fn same_element_restore_via_id() {
        let mut tree = MemTree::new();
        let root = tree.root();
        let div = tree.append_element(root, "div");
        tree.set_id(div, "a");
        let p = tree.append_element(div, "p");
        tree.set_id(p, "b");
        tree.append_text(p, "Hello World");
        let adapter = MemTreeAdapter::new(tree);

        let descriptor = Descriptor {
            id: "x".to_string(),
            text: "World".to_string(),
            anchors: crate::descriptor::IdentityAnchors {
                start_id: Some("b".to_string()),
                end_id: Some("b".to_string()),
                start_offset: 6,
                end_offset: 11,
                ..Default::default()
            },
            paths: Default::default(),
            multi: Default::default(),
            fingerprint: Default::default(),
            context: Default::default(),
        };

        let result = restore(&descriptor, &adapter, None).unwrap();
        assert_eq!(adapter.range_text(&result), "World");
    }

    #[test]
    fn survives_reparenting_s1() {
        // Tree before: <div id="a"><p id="b">Hello World</p></div>
        let mut before = MemTree::new();
        let root = before.root();
        let div = before.append_element(root, "div");
        before.set_id(div, "a");
        let p = before.append_element(div, "p");
        before.set_id(p, "b");
        before.append_text(p, "Hello World");
        let before_adapter = MemTreeAdapter::new(before);
        let range = {
            let nodes = before_adapter.walk_text_nodes(&p);
            let (t, _) = nodes[0].clone();
            before_adapter.make_range(&t, 6, &t, 11)
        };
        let config = LocatorConfig::new();
        let serializer = crate::serializer::Serializer::new(&config);
        let descriptor = serializer
            .serialize(&before_adapter, &range, crate::serializer::SerializeOptions::default())
            .unwrap();

        // Tree after: #b moved inside a new <section> wrapper, id preserved.
        let mut after = MemTree::new();
        let root = after.root();
        let section = after.append_element(root, "section");
        let p2 = after.append_element(section, "p");
        after.set_id(p2, "b");
        after.append_text(p2, "Hello World");
        let after_adapter = MemTreeAdapter::new(after);

        let result = restore(&descriptor, &after_adapter, None).unwrap();
        assert_eq!(after_adapter.range_text(&result), "World");
    }

    #[test]
    fn missing_anchor_yields_to_next_layer() {
        let mut tree = MemTree::new();
        let root = tree.root();
        let p = tree.append_element(root, "p");
        tree.append_text(p, "no id here");
        let adapter = MemTreeAdapter::new(tree);

        let descriptor = Descriptor {
            id: "x".to_string(),
            text: "no id here".to_string(),
            anchors: crate::descriptor::IdentityAnchors {
                start_id: Some("missing".to_string()),
                end_id: Some("missing".to_string()),
                start_offset: 0,
                end_offset: 10,
                ..Default::default()
            },
            paths: Default::default(),
            multi: Default::default(),
            fingerprint: Default::default(),
            context: Default::default(),
        };

        assert_eq!(
            restore(&descriptor, &adapter, None),
            Err(LayerError::MissingAnchor)
        );
    }
}
