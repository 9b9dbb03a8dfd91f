//! L3 — Multi-Anchor (spec.md §4.6): locate start/end elements by their
//! tag/class/attribute signature rather than a path, then search their
//! common ancestor for the exact selection text via the intelligent text
//! matcher.

use crate::descriptor::{Descriptor, ElementAnchor};
use crate::error::{LayerError, LayerResult};
use crate::textmatch;
use crate::tree::{common_ancestor, find_text_position, TextRange, TreeAdapter};
use crate::validator;

/// spec.md §4.6: "K₁ ≈ 20" / "K₂ ≈ 10" text-hint prefix lengths.
const K1: usize = 20;
const K2: usize = 10;
/// "Keep up to M₁ ≈ 30 start candidates."
const M1: usize = 30;
/// "Iterate the top M₂ ≈ 10 start candidates."
const M2: usize = 10;

pub fn restore<A: TreeAdapter>(
    descriptor: &Descriptor,
    adapter: &A,
    scope: Option<&A::Element>,
) -> LayerResult<TextRange<A>> {
    if descriptor.text.is_empty() {
        return Err(LayerError::InvalidInput);
    }

    let multi = &descriptor.multi;
    let start_candidates = rank_candidates(adapter, scope, &multi.start_anchor, &descriptor.text);
    let end_candidates = rank_candidates(adapter, scope, &multi.end_anchor, &descriptor.text);
    if start_candidates.is_empty() || end_candidates.is_empty() {
        return Err(LayerError::NoCandidates);
    }

    let start_top: Vec<A::Element> = start_candidates.into_iter().take(M1).collect();
    let end_top: Vec<A::Element> = end_candidates.into_iter().take(M1).collect();

    for start in start_top.iter().take(M2) {
        for end in &end_top {
            if start != end && !adapter.is_before(start, end) {
                continue;
            }
            let Some(range) = build_pair_range(adapter, start, end, &descriptor.text) else {
                continue;
            };
            if let Ok(validated) = validator::validate(adapter, range, &descriptor.text) {
                return Ok(validated);
            }
        }
    }

    Err(LayerError::TextMismatch)
}

/// Rank all candidates sharing `anchor.tag`, descending by
/// `text_score * 2 + structural_score` (spec.md §4.6 step 3).
fn rank_candidates<A: TreeAdapter>(
    adapter: &A,
    scope: Option<&A::Element>,
    anchor: &ElementAnchor,
    text: &str,
) -> Vec<A::Element> {
    let candidates: Vec<A::Element> = adapter
        .query_all(scope, &anchor.tag)
        .into_iter()
        .filter(|el| !has_excluded_ancestor(adapter, el))
        .collect();

    let mut scored: Vec<(f64, A::Element)> = candidates
        .into_iter()
        .map(|el| {
            let structural = structural_score(adapter, &el, anchor);
            let text_score = text_hint_score(adapter, &el, text);
            (text_score * 2.0 + structural, el)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, el)| el).collect()
}

/// Explicit opt-out (spec.md §4.6 step 1): skip any candidate whose
/// ancestor chain (inclusive) carries `data-range-exclude`.
fn has_excluded_ancestor<A: TreeAdapter>(adapter: &A, element: &A::Element) -> bool {
    let mut current = Some(element.clone());
    while let Some(el) = current {
        if adapter.attr(&el, "data-range-exclude").is_some() {
            return true;
        }
        current = adapter.parent(&el);
    }
    false
}

/// "1 point each for tag match and id match; for class names, the
/// BEM-aware class similarity" (spec.md §4.6 step 2).
fn structural_score<A: TreeAdapter>(adapter: &A, candidate: &A::Element, anchor: &ElementAnchor) -> f64 {
    let mut score = 0.0;
    if adapter.tag(candidate) == anchor.tag {
        score += 1.0;
    }
    if anchor.id.is_some() && adapter.id(candidate) == anchor.id {
        score += 1.0;
    }
    let candidate_classes = adapter.classes(candidate).join(" ");
    score += textmatch::bem_class_similarity(&anchor.class_string, &candidate_classes);
    score
}

/// "1.0 if the element contains the first K₁ characters of text; 0.8 if
/// it contains the first K₂ characters; otherwise a character-overlap
/// fraction computed on a prefix window" (spec.md §4.6 step 2).
fn text_hint_score<A: TreeAdapter>(adapter: &A, candidate: &A::Element, text: &str) -> f64 {
    let content = adapter.text_content(candidate);
    let prefix20: String = text.chars().take(K1).collect();
    let prefix10: String = text.chars().take(K2).collect();

    if !prefix20.is_empty() && content.contains(&prefix20) {
        return 1.0;
    }
    if !prefix10.is_empty() && content.contains(&prefix10) {
        return 0.8;
    }
    overlap_fraction(&content, &prefix20)
}

fn overlap_fraction(content: &str, needle_prefix: &str) -> f64 {
    if needle_prefix.is_empty() {
        return 0.0;
    }
    let window: String = content.chars().take(needle_prefix.chars().count()).collect();
    let matches = needle_prefix
        .chars()
        .zip(window.chars())
        .filter(|(a, b)| a == b)
        .count();
    matches as f64 / needle_prefix.chars().count() as f64
}

fn build_pair_range<A: TreeAdapter>(
    adapter: &A,
    start: &A::Element,
    end: &A::Element,
    text: &str,
) -> Option<TextRange<A>> {
    if start == end {
        return find_text_in_element(adapter, start, text);
    }

    let ancestor = common_ancestor(adapter, start, end)?;
    let ancestor_text = adapter.text_content(&ancestor);
    let (found_at, found_end) = textmatch::find(&ancestor_text, text)?;

    let (start_node, start_local) = find_text_position(adapter, &ancestor, found_at)?;
    let (end_node, end_local) = find_text_position(adapter, &ancestor, found_end)?;
    Some(adapter.make_range(&start_node, start_local, &end_node, end_local))
}

fn find_text_in_element<A: TreeAdapter>(adapter: &A, element: &A::Element, text: &str) -> Option<TextRange<A>> {
    let content = adapter.text_content(element);
    let (found_at, found_end) = textmatch::find(&content, text)?;

    let (start_node, start_local) = find_text_position(adapter, element, found_at)?;
    let (end_node, end_local) = find_text_position(adapter, element, found_end)?;
    Some(adapter.make_range(&start_node, start_local, &end_node, end_local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MultiAnchor;
    use textloc_memtree::{MemTree, MemTreeAdapter};

    fn descriptor_for(text: &str, start_anchor: ElementAnchor, end_anchor: ElementAnchor) -> Descriptor {
        Descriptor {
            id: "x".to_string(),
            text: text.to_string(),
            anchors: Default::default(),
            paths: Default::default(),
            multi: MultiAnchor {
                start_anchor,
                end_anchor,
                common_parent: None,
                sibling_info: None,
            },
            fingerprint: Default::default(),
            context: Default::default(),
        }
    }

    fn anchor(tag: &str, class_string: &str) -> ElementAnchor {
        ElementAnchor {
            tag: tag.to_string(),
            class_string: class_string.to_string(),
            id: None,
            attributes: Vec::new(),
        }
    }

    #[test]
    fn cross_element_tag_sequence_survives_rewrite_s3() {
        // S3: ids/classes changed after restructuring, but the h3,p tag
        // sequence under a new common ancestor is preserved.
        let mut tree = MemTree::new();
        let root = tree.root();
        let article = tree.append_element(root, "article");
        tree.set_classes(article, &["x"]);
        let h3 = tree.append_element(article, "h3");
        tree.set_classes(h3, &["pt-new"]);
        tree.append_text(h3, "Title");
        let p = tree.append_element(article, "p");
        tree.set_classes(p, &["pe-new"]);
        tree.append_text(p, "Excerpt");
        let adapter = MemTreeAdapter::new(tree);

        let descriptor = descriptor_for("TitleExcerpt", anchor("h3", "pt"), anchor("p", "pe"));
        let result = restore(&descriptor, &adapter, None).unwrap();
        assert_eq!(adapter.range_text(&result), "TitleExcerpt");
    }

    #[test]
    fn same_element_candidate_uses_direct_text_match() {
        let mut tree = MemTree::new();
        let root = tree.root();
        let p = tree.append_element(root, "p");
        tree.set_classes(p, &["body"]);
        tree.append_text(p, "Hello World");
        let adapter = MemTreeAdapter::new(tree);

        let descriptor = descriptor_for("World", anchor("p", "body"), anchor("p", "body"));
        let result = restore(&descriptor, &adapter, None).unwrap();
        assert_eq!(adapter.range_text(&result), "World");
    }

    #[test]
    fn no_tag_match_yields_no_candidates() {
        let mut tree = MemTree::new();
        let root = tree.root();
        tree.append_text(root, "Hello World");
        let adapter = MemTreeAdapter::new(tree);

        let descriptor = descriptor_for("World", anchor("h3", "pt"), anchor("p", "pe"));
        assert_eq!(
            restore(&descriptor, &adapter, None),
            Err(LayerError::NoCandidates)
        );
    }

    #[test]
    fn excluded_ancestor_is_skipped() {
        let mut tree = MemTree::new();
        let root = tree.root();
        let aside = tree.append_element(root, "aside");
        tree.set_attr(aside, "data-range-exclude", "true");
        let p_excluded = tree.append_element(aside, "p");
        tree.append_text(p_excluded, "World wide decoy");
        let p_real = tree.append_element(root, "p");
        tree.append_text(p_real, "World");
        let adapter = MemTreeAdapter::new(tree);

        let descriptor = descriptor_for("World", anchor("p", ""), anchor("p", ""));
        let result = restore(&descriptor, &adapter, None).unwrap();
        assert_eq!(adapter.range_text(&result), "World");
    }
}
