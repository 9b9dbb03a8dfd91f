//! L4 — Structural Fingerprint (spec.md §4.7): locate the start element by
//! weighted structural similarity to the stored fingerprint, then fall back
//! to exact text search (with cross-element range assembly) once a
//! plausible candidate is found. The last and most forgiving layer in the
//! cascade — and the most expensive.

use std::collections::HashSet;

use crate::descriptor::{Descriptor, Fingerprint, ParentChainEntry};
use crate::error::{LayerError, LayerResult};
use crate::textmatch;
use crate::tree::{common_ancestor, find_text_position, TextRange, TreeAdapter};
use crate::validator;

/// spec.md §4.7 step 1: "try thresholds in order".
const THRESHOLDS: &[f64] = &[0.8, 0.6, 0.4, 0.2];
/// "Take the top K ≈ 10 candidates."
const TOP_K: usize = 10;
/// Penalty applied to a candidate found only via semantic-tag expansion.
const EXPANSION_PENALTY: f64 = 0.9;
/// Sum of the per-feature weights in the similarity table, used to
/// normalize the raw weighted sum to `[0, 1]`.
const WEIGHT_TOTAL: f64 = 10.0;
const PARENT_CHAIN_CAP: usize = 6;

pub fn restore<A: TreeAdapter>(
    descriptor: &Descriptor,
    adapter: &A,
    scope: Option<&A::Element>,
) -> LayerResult<TextRange<A>> {
    if descriptor.text.is_empty() {
        return Err(LayerError::InvalidInput);
    }

    let fingerprint = &descriptor.fingerprint;
    let (candidates, via_expansion) = collect_candidates(adapter, scope, &fingerprint.tag);
    if candidates.is_empty() {
        return Err(LayerError::NoCandidates);
    }

    let cross_element = descriptor.multi.start_anchor.tag != descriptor.multi.end_anchor.tag;
    let start_tag = descriptor.multi.start_anchor.tag.as_str();

    let mut scored: Vec<(f64, A::Element)> = candidates
        .into_iter()
        .map(|el| {
            let mut sim = similarity(adapter, &el, fingerprint);
            if via_expansion {
                sim *= EXPANSION_PENALTY;
            }
            if adapter.text_content(&el).contains(&descriptor.context.parent_text)
                && !descriptor.context.parent_text.is_empty()
            {
                sim = (sim + 0.15).min(1.0);
            }
            (sim, el)
        })
        .collect();

    scored.sort_by(|a, b| {
        let a_bias = adapter.tag(&a.1) == start_tag;
        let b_bias = adapter.tag(&b.1) == start_tag;
        b_bias
            .cmp(&a_bias)
            .then(b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal))
    });

    for threshold in THRESHOLDS {
        for (_, candidate) in scored.iter().filter(|(sim, _)| *sim >= *threshold).take(TOP_K) {
            if cross_element {
                if let Some(range) = try_cross_element(adapter, scope, candidate, descriptor) {
                    if let Ok(validated) = validator::validate(adapter, range, &descriptor.text) {
                        return Ok(validated);
                    }
                }
            }
            if let Some(range) = find_text_in_element(adapter, candidate, &descriptor.text) {
                if let Ok(validated) = validator::validate(adapter, range, &descriptor.text) {
                    return Ok(validated);
                }
            }
        }
    }

    Err(LayerError::TextMismatch)
}

/// spec.md §4.7 "Semantic-tag expansion": if the exact tag yields no
/// candidates, expand to the curated compatible-tag set. Returns whether
/// the expansion path was taken, so the caller can apply the 0.9 penalty.
fn collect_candidates<A: TreeAdapter>(
    adapter: &A,
    scope: Option<&A::Element>,
    tag: &str,
) -> (Vec<A::Element>, bool) {
    let direct = adapter.query_all(scope, tag);
    if !direct.is_empty() {
        return (direct, false);
    }

    let mut expanded = Vec::new();
    for candidate_tag in textmatch::semantic_tag_group(tag) {
        if candidate_tag == tag {
            continue;
        }
        expanded.extend(adapter.query_all(scope, &candidate_tag));
    }
    (expanded, true)
}

fn similarity<A: TreeAdapter>(adapter: &A, candidate: &A::Element, fp: &Fingerprint) -> f64 {
    let mut score = 0.0;

    if adapter.tag(candidate) == fp.tag {
        score += 2.0;
    }

    let candidate_classes: HashSet<String> = adapter.classes(candidate).into_iter().collect();
    let fp_classes: HashSet<String> = fp.class_string.split_whitespace().map(str::to_string).collect();
    score += set_match_score(&candidate_classes, &fp_classes);

    let la = adapter.text_content(candidate).chars().count();
    let lb = fp.text_length;
    if la > 0 && lb > 0 {
        let (mn, mx) = (la.min(lb) as f64, la.max(lb) as f64);
        score += 3.0 * mn / mx;
    }

    let da = depth_of(adapter, candidate);
    let db = fp.depth;
    let delta = da.abs_diff(db) as f64;
    score += (1.0 - delta / 10.0).max(0.0);

    let ca = adapter.children(candidate).len();
    let cb = fp.child_count;
    if ca == cb {
        score += 1.0;
    } else {
        let delta = ca.abs_diff(cb) as f64;
        score += (1.0 - delta / 5.0).max(0.0);
    }

    score += 2.0 * parent_chain_similarity(adapter, candidate, &fp.parent_chain);

    score / WEIGHT_TOTAL
}

fn set_match_score(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a == b {
        return 1.0;
    }
    let denom = a.len().max(b.len());
    if denom == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / denom as f64
}

fn depth_of<A: TreeAdapter>(adapter: &A, element: &A::Element) -> usize {
    let mut depth = 0;
    let mut current = adapter.parent(element);
    while let Some(el) = current {
        depth += 1;
        current = adapter.parent(&el);
    }
    depth
}

/// "Per-level tag match 0.7 + class-set match 0.3, averaged over
/// `max(len_a, len_b)` up to 6" (spec.md §4.7).
fn parent_chain_similarity<A: TreeAdapter>(
    adapter: &A,
    candidate: &A::Element,
    expected: &[ParentChainEntry],
) -> f64 {
    let mut actual: Vec<(String, HashSet<String>)> = Vec::new();
    let mut current = adapter.parent(candidate);
    while let Some(el) = current {
        if actual.len() >= PARENT_CHAIN_CAP {
            break;
        }
        actual.push((adapter.tag(&el), adapter.classes(&el).into_iter().collect()));
        current = adapter.parent(&el);
    }

    let len = actual.len().max(expected.len()).min(PARENT_CHAIN_CAP);
    if len == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..len {
        let (Some((tag, classes)), Some(entry)) = (actual.get(i), expected.get(i)) else {
            continue;
        };
        let mut level = 0.0;
        if *tag == entry.tag {
            level += 0.7;
        }
        let entry_classes: HashSet<String> = entry.class_string.split_whitespace().map(str::to_string).collect();
        level += 0.3 * set_match_score(classes, &entry_classes);
        total += level;
    }
    total / len as f64
}

/// spec.md §4.7 step 3: cross-element range construction from a start
/// candidate — locate end-element candidates via tag compatibility and
/// search the common ancestor's text, with a split-in-half fallback.
fn try_cross_element<A: TreeAdapter>(
    adapter: &A,
    scope: Option<&A::Element>,
    start_candidate: &A::Element,
    descriptor: &Descriptor,
) -> Option<TextRange<A>> {
    let end_tags = textmatch::semantic_tag_group(&descriptor.multi.end_anchor.tag);
    let end_class = &descriptor.multi.end_anchor.class_string;

    let mut end_candidates: Vec<A::Element> = Vec::new();
    for tag in &end_tags {
        end_candidates.extend(adapter.query_all(scope, tag));
    }
    end_candidates.retain(|el| {
        el != start_candidate
            && adapter.is_before(start_candidate, el)
            && class_compatible(adapter, el, end_class)
    });

    for end in &end_candidates {
        let Some(ancestor) = common_ancestor(adapter, start_candidate, end) else {
            continue;
        };
        let ancestor_text = adapter.text_content(&ancestor);
        if let Some(range) = find_in_halves(adapter, &ancestor, &ancestor_text, &descriptor.text) {
            return Some(range);
        }
    }
    None
}

fn class_compatible<A: TreeAdapter>(adapter: &A, element: &A::Element, anchor_class_string: &str) -> bool {
    if anchor_class_string.trim().is_empty() {
        return true;
    }
    let classes = adapter.classes(element);
    anchor_class_string.split_whitespace().any(|c| classes.iter().any(|have| have == c))
}

/// Search the whole of `ancestor_text` for `text`; if that fails, retry
/// against the first half and then the second half, in case the direct
/// search was defeated by noise concentrated in only one side of the
/// ancestor's content (spec.md §4.7 step 3).
fn find_in_halves<A: TreeAdapter>(
    adapter: &A,
    ancestor: &A::Element,
    ancestor_text: &str,
    text: &str,
) -> Option<TextRange<A>> {
    if let Some((found_at, found_end)) = textmatch::find(ancestor_text, text) {
        return build_range(adapter, ancestor, found_at, found_end);
    }

    let mid = ancestor_text.len() / 2;
    let boundary = ancestor_text
        .char_indices()
        .map(|(idx, _)| idx)
        .take_while(|idx| *idx <= mid)
        .last()
        .unwrap_or(0);

    if let Some((found_at, found_end)) = textmatch::find(&ancestor_text[..boundary], text) {
        return build_range(adapter, ancestor, found_at, found_end);
    }
    if let Some((rel_start, rel_end)) = textmatch::find(&ancestor_text[boundary..], text) {
        return build_range(adapter, ancestor, boundary + rel_start, boundary + rel_end);
    }
    None
}

fn build_range<A: TreeAdapter>(
    adapter: &A,
    ancestor: &A::Element,
    start_offset: usize,
    end_offset: usize,
) -> Option<TextRange<A>> {
    let (start_node, start_local) = find_text_position(adapter, ancestor, start_offset)?;
    let (end_node, end_local) = find_text_position(adapter, ancestor, end_offset)?;
    Some(adapter.make_range(&start_node, start_local, &end_node, end_local))
}

fn find_text_in_element<A: TreeAdapter>(adapter: &A, element: &A::Element, text: &str) -> Option<TextRange<A>> {
    let content = adapter.text_content(element);
    let (found_at, found_end) = textmatch::find(&content, text)?;
    build_range(adapter, element, found_at, found_end)
}
