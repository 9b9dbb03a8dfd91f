//! L2 — Structural Path (spec.md §4.5): re-locate elements by their stored
//! CSS-like path expressions and reapply the original offsets. No text
//! search fallback — a mismatch here is a hard failure, not a degrade, so
//! its failure signal stays meaningful to L3/L4.

use crate::descriptor::Descriptor;
use crate::error::{LayerError, LayerResult};
use crate::path::{self, PathExpr};
use crate::tree::{find_text_position, TextRange, TreeAdapter};
use crate::validator;

pub fn restore<A: TreeAdapter>(
    descriptor: &Descriptor,
    adapter: &A,
    scope: Option<&A::Element>,
) -> LayerResult<TextRange<A>> {
    let paths = &descriptor.paths;
    if paths.start_path.is_empty() || paths.end_path.is_empty() || descriptor.text.is_empty() {
        return Err(LayerError::InvalidInput);
    }

    let start_expr = path::parse_path(&paths.start_path).ok_or(LayerError::InvalidInput)?;
    let end_expr = path::parse_path(&paths.end_path).ok_or(LayerError::InvalidInput)?;

    let start_element = resolve(adapter, scope, &start_expr).ok_or(LayerError::MissingAnchor)?;
    let end_element = resolve(adapter, scope, &end_expr).ok_or(LayerError::MissingAnchor)?;

    let start_offset = preferred_offset(paths.start_text_offset, paths.start_offset);
    let end_offset = preferred_offset(paths.end_text_offset, paths.end_offset);

    let (start_node, start_local) =
        find_text_position(adapter, &start_element, start_offset).ok_or(LayerError::OffsetMismatch)?;
    let (end_node, end_local) =
        find_text_position(adapter, &end_element, end_offset).ok_or(LayerError::OffsetMismatch)?;

    let range = adapter.make_range(&start_node, start_local, &end_node, end_local);
    validator::validate(adapter, range, &descriptor.text)
}

/// spec.md §4.5 step 4: "using `start_text_offset`/`end_text_offset`
/// (falling back to `start_offset`/`end_offset`)". A stored `0` is
/// ambiguous with "not populated" for older descriptors, so the richer
/// `*_offset` field wins whenever it is non-zero.
fn preferred_offset(text_offset: usize, offset: usize) -> usize {
    if text_offset > 0 {
        text_offset
    } else {
        offset
    }
}

fn resolve<A: TreeAdapter>(adapter: &A, scope: Option<&A::Element>, expr: &PathExpr) -> Option<A::Element> {
    path::resolve(adapter, scope, expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PathAnchors;
    use textloc_memtree::{MemTree, MemTreeAdapter};

    fn descriptor_for(text: &str, start_path: &str, end_path: &str, start_offset: usize, end_offset: usize) -> Descriptor {
        Descriptor {
            id: "x".to_string(),
            text: text.to_string(),
            anchors: Default::default(),
            paths: PathAnchors {
                start_path: start_path.to_string(),
                end_path: end_path.to_string(),
                start_offset,
                end_offset,
                start_text_offset: start_offset,
                end_text_offset: end_offset,
            },
            multi: Default::default(),
            fingerprint: Default::default(),
            context: Default::default(),
        }
    }

    #[test]
    fn restores_after_ids_stripped_s2() {
        // S2: ids stripped but structure/classes preserved.
        let mut tree = MemTree::new();
        let root = tree.root();
        let main = tree.append_element(root, "main");
        tree.set_classes(main, &["app"]);
        let section = tree.append_element(main, "section");
        tree.set_classes(section, &["content"]);
        let article = tree.append_element(section, "article");
        let h2 = tree.append_element(article, "h2");
        tree.set_classes(h2, &["title"]);
        tree.append_text(h2, "Article Title");
        let adapter = MemTreeAdapter::new(tree);

        let path = "main.app > section.content > article > h2.title";
        let descriptor = descriptor_for("Article", path, path, 0, 7);

        let result = restore(&descriptor, &adapter, None).unwrap();
        assert_eq!(adapter.range_text(&result), "Article");
    }

    #[test]
    fn empty_path_fails_fast() {
        let mut tree = MemTree::new();
        let root = tree.root();
        tree.append_text(root, "hello");
        let adapter = MemTreeAdapter::new(tree);

        let descriptor = descriptor_for("hello", "", "", 0, 5);
        assert_eq!(restore(&descriptor, &adapter, None), Err(LayerError::InvalidInput));
    }

    #[test]
    fn missing_element_yields_to_next_layer() {
        let mut tree = MemTree::new();
        let root = tree.root();
        tree.append_text(root, "hello");
        let adapter = MemTreeAdapter::new(tree);

        let descriptor = descriptor_for("hello", "section.gone", "section.gone", 0, 5);
        assert_eq!(
            restore(&descriptor, &adapter, None),
            Err(LayerError::MissingAnchor)
        );
    }

    #[test]
    fn mismatched_text_is_rejected_not_degraded() {
        let mut tree = MemTree::new();
        let root = tree.root();
        let p = tree.append_element(root, "p");
        tree.append_text(p, "Completely different content");
        let adapter = MemTreeAdapter::new(tree);

        let descriptor = descriptor_for("Article", "p", "p", 0, 7);
        assert_eq!(
            restore(&descriptor, &adapter, None),
            Err(LayerError::TextMismatch)
        );
    }
}
