//! Intelligent text matching (spec.md §4.8), BEM-aware class similarity
//! (§4.6), and the semantic-tag expansion table (§4.7). Shared by L3 and L4.

use std::collections::HashSet;

/// Four-stage normalized substring search. Returns the byte span
/// `(start, end)` in `haystack` that `needle` matched, mapped back from
/// whatever normalization stage found it, or `None` if no stage matches.
///
/// The span's end is never assumed to be `start + needle.len()`: a folded
/// character (e.g. a fullwidth `＜`) can occupy a different number of
/// bytes in `haystack` than its ASCII equivalent in `needle`, so stages
/// 2-4 map the end of the match back through normalization the same way
/// they map the start.
pub fn find(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    if needle.is_empty() {
        return None;
    }

    // 1. Direct search.
    if let Some(idx) = haystack.find(needle) {
        return Some((idx, idx + needle.len()));
    }

    // 2. Whitespace-collapsed search, mapped back to the original span.
    if let Some(span) = find_whitespace_normalized(haystack, needle) {
        return Some(span);
    }

    // 3. Punctuation/digit-folding search.
    if let Some(span) = find_enhanced_normalized(haystack, needle) {
        return Some(span);
    }

    // 4. Fuzzy word-sequence match.
    find_fuzzy_word_sequence(haystack, needle)
}

/// Whether `actual` is textually equivalent to `expected` under the same
/// normalization stages `find` uses to locate a match (spec.md §4.8). The
/// Validator uses this instead of raw equality so a span L3/L4 located via
/// whitespace-collapsing or punctuation-folding isn't rejected for not
/// being byte-identical to the text that was originally selected.
pub fn normalized_equal(actual: &str, expected: &str) -> bool {
    if actual == expected {
        return true;
    }
    if collapse_whitespace(actual) == collapse_whitespace(expected) {
        return true;
    }
    enhanced_normalize(actual) == enhanced_normalize(expected)
}

fn collapse_whitespace(s: &str) -> String {
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

fn find_whitespace_normalized(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let norm_haystack = collapse_whitespace(haystack);
    let norm_needle = collapse_whitespace(needle);
    let norm_start = norm_haystack.find(&norm_needle)?;
    let norm_end = norm_start + norm_needle.len();
    map_normalized_span(haystack, &norm_haystack, norm_start, norm_end, |c| c.is_whitespace())
}

/// Map a `[start, end)` byte span in a normalized string back to the
/// original string it was derived from, by converting each normalized byte
/// offset to a character count and walking the original to the matching
/// position. Both ends are mapped independently so the matched span's
/// original byte length can differ from the normalized needle's.
fn map_normalized_span(
    original: &str,
    norm_text: &str,
    norm_start_byte: usize,
    norm_end_byte: usize,
    is_skippable: impl Fn(char) -> bool,
) -> Option<(usize, usize)> {
    let start_char = norm_text.get(..norm_start_byte)?.chars().count();
    let end_char = norm_text.get(..norm_end_byte)?.chars().count();
    let start = map_normalized_index(original, start_char, &is_skippable)?;
    let end = map_normalized_index(original, end_char, &is_skippable)?;
    Some((start, end))
}

/// Map a character-count position in a whitespace/punctuation-normalized
/// string back to the original string by walking the original and
/// tracking how many "significant" (non-skippable) characters have been
/// consumed, skipping whitespace runs the same way the normalizer
/// collapsed them.
fn map_normalized_index(original: &str, target_norm_idx: usize, is_skippable: impl Fn(char) -> bool) -> Option<usize> {
    let mut norm_pos = 0usize;
    let mut in_run = false;
    let mut leading = true;
    for (byte_idx, ch) in original.char_indices() {
        if is_skippable(ch) {
            if leading {
                continue;
            }
            if !in_run {
                if norm_pos == target_norm_idx {
                    return Some(byte_idx);
                }
                norm_pos += 1;
                in_run = true;
            }
            continue;
        }
        leading = false;
        in_run = false;
        if norm_pos == target_norm_idx {
            return Some(byte_idx);
        }
        norm_pos += 1;
    }
    if norm_pos == target_norm_idx {
        return Some(original.len());
    }
    None
}

/// Fullwidth-digit/CJK-punctuation folding, brand-token lowercasing,
/// thousands-separator stripping, and "space before %" removal
/// (spec.md §4.8 step 3).
fn enhanced_normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars: Vec<char> = s.chars().collect();

    // Strip thousands separators inside digit runs (e.g. "1,000" -> "1000").
    let mut i = 0;
    let mut digits_stripped = Vec::with_capacity(chars.len());
    while i < chars.len() {
        let c = chars[i];
        if c == ','
            && i > 0
            && i + 1 < chars.len()
            && chars[i - 1].is_ascii_digit()
            && chars[i + 1].is_ascii_digit()
        {
            i += 1;
            continue;
        }
        digits_stripped.push(c);
        i += 1;
    }
    chars = digits_stripped;

    // Remove spaces before '%'.
    let mut despaced = Vec::with_capacity(chars.len());
    i = 0;
    while i < chars.len() {
        if chars[i] == ' ' && i + 1 < chars.len() && chars[i + 1] == '%' {
            i += 1;
            continue;
        }
        despaced.push(chars[i]);
        i += 1;
    }
    chars = despaced;

    for ch in chars {
        let folded = fold_char(ch);
        out.push(folded);
    }

    let out = lowercase_brand_tokens(&out);
    collapse_whitespace(&out)
}

fn fold_char(ch: char) -> char {
    match ch {
        // Fullwidth digits U+FF10..U+FF19 -> ASCII 0-9.
        '\u{FF10}'..='\u{FF19}' => {
            let offset = ch as u32 - '\u{FF10}' as u32;
            char::from_u32('0' as u32 + offset).unwrap_or(ch)
        }
        '\u{FF08}' => '(', // fullwidth (
        '\u{FF09}' => ')', // fullwidth )
        '\u{FF1C}' => '<', // fullwidth <
        '\u{FF1E}' => '>', // fullwidth >
        '\u{FF06}' => '&', // fullwidth &
        '\u{3001}' => ',', // ideographic comma
        '\u{3002}' => '.', // ideographic full stop
        '\u{FF0C}' => ',', // fullwidth comma
        '\u{FF0E}' => '.', // fullwidth full stop
        '\u{FF1A}' => ':', // fullwidth colon
        '\u{FF1B}' => ';', // fullwidth semicolon
        other => other,
    }
}

const BRAND_TOKENS: &[&str] = &["chatgpt", "gpt-4", "gpt4", "openai", "google"];

fn lowercase_brand_tokens(s: &str) -> String {
    let mut result = s.to_string();
    for token in BRAND_TOKENS {
        let lower = token.to_lowercase();
        let mut search_from = 0;
        loop {
            let hay_lower = result.to_lowercase();
            match hay_lower[search_from..].find(&lower) {
                Some(rel_idx) => {
                    let idx = search_from + rel_idx;
                    result.replace_range(idx..idx + token.len(), &lower);
                    search_from = idx + token.len();
                }
                None => break,
            }
        }
    }
    result
}

fn find_enhanced_normalized(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let norm_haystack = enhanced_normalize(haystack);
    let norm_needle = enhanced_normalize(needle);
    if norm_needle.is_empty() {
        return None;
    }
    let norm_start = norm_haystack.find(&norm_needle)?;
    let norm_end = norm_start + norm_needle.len();
    // Equivalence-respecting walk: treat folded/stripped characters as
    // skippable the same way whitespace is, for the purposes of mapping the
    // span back.
    map_normalized_span(haystack, &norm_haystack, norm_start, norm_end, |c| {
        c.is_whitespace() || c == ','
    })
}

fn tokenize(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (idx, ch) in s.char_indices() {
        let is_word = ch.is_alphanumeric() || is_cjk(ch);
        match (is_word, start) {
            (true, None) => start = Some(idx),
            (false, Some(s_idx)) => {
                tokens.push(&s[s_idx..idx]);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s_idx) = start {
        tokens.push(&s[s_idx..]);
    }
    tokens
}

fn is_cjk(ch: char) -> bool {
    matches!(ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0xAC00..=0xD7AF)
}

/// Tokenize both sides; for each window the size of the needle's token
/// count, accept if at least 80% of tokens substring-contain their paired
/// needle token. Returns the haystack byte span from the first accepted
/// window's first token through its last token.
fn find_fuzzy_word_sequence(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle_tokens = tokenize(needle);
    if needle_tokens.is_empty() {
        return None;
    }
    let haystack_tokens_with_idx: Vec<(usize, &str)> = {
        let mut out = Vec::new();
        let mut start = None;
        for (idx, ch) in haystack.char_indices() {
            let is_word = ch.is_alphanumeric() || is_cjk(ch);
            match (is_word, start) {
                (true, None) => start = Some(idx),
                (false, Some(s_idx)) => {
                    out.push((s_idx, &haystack[s_idx..idx]));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s_idx) = start {
            out.push((s_idx, &haystack[s_idx..]));
        }
        out
    };

    if haystack_tokens_with_idx.len() < needle_tokens.len() {
        return None;
    }

    let window_len = needle_tokens.len();
    let needed = ((window_len as f64) * 0.8).ceil() as usize;

    for window in haystack_tokens_with_idx.windows(window_len) {
        let mut matched = 0;
        for (pair, needle_tok) in window.iter().zip(needle_tokens.iter()) {
            let (_, hay_tok) = pair;
            if hay_tok.to_lowercase().contains(&needle_tok.to_lowercase()) {
                matched += 1;
            }
        }
        if matched >= needed {
            let (start_idx, _) = window[0];
            let (last_idx, last_tok) = window[window.len() - 1];
            return Some((start_idx, last_idx + last_tok.len()));
        }
    }
    None
}

/// BEM-aware class-string similarity (spec.md §4.6), in `[0, 1]`.
pub fn bem_class_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for token_a in &tokens_a {
        let best = tokens_b
            .iter()
            .map(|token_b| bem_token_similarity(token_a, token_b))
            .fold(0.0_f64, f64::max);
        let weight = if is_utility_class(token_a) { 0.3 } else { 1.0 };
        total += best * weight;
    }
    total / tokens_a.len() as f64
}

fn is_utility_class(token: &str) -> bool {
    token.starts_with("js-")
        || token.starts_with("is-")
        || token.starts_with("has-")
        || token.starts_with("u-")
}

struct BemParts<'a> {
    block: &'a str,
    element: Option<&'a str>,
    modifier: Option<&'a str>,
}

fn parse_bem(token: &str) -> BemParts<'_> {
    let (block_and_element, modifier) = match token.split_once("--") {
        Some((b, m)) => (b, Some(m)),
        None => (token, None),
    };
    let (block, element) = match block_and_element.split_once("__") {
        Some((b, e)) => (b, Some(e)),
        None => (block_and_element, None),
    };
    BemParts {
        block,
        element,
        modifier,
    }
}

fn bem_token_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let pa = parse_bem(a);
    let pb = parse_bem(b);

    let mut score = 0.0;
    let mut weight_present = 0.0;

    weight_present += 0.5;
    if pa.block == pb.block {
        score += 0.5;
    }

    if pa.element.is_some() || pb.element.is_some() {
        weight_present += 0.3;
        if pa.element == pb.element {
            score += 0.3;
        }
    }

    if pa.modifier.is_some() || pb.modifier.is_some() {
        weight_present += 0.2;
        if pa.modifier == pb.modifier {
            score += 0.2;
        }
    }

    if weight_present == 0.0 {
        return 0.0;
    }
    score / weight_present
}

/// Semantically compatible tag groups for L4's expansion (spec.md §4.7 and
/// the Open Question in §9: "implementers should treat it as a
/// configuration table and reproduce the table verbatim from the
/// reference"). This is the reproduced table.
const SEMANTIC_TAG_GROUPS: &[&[&str]] = &[
    &["p", "div", "section", "li", "dd"],
    &["h1", "h2", "h3", "h4", "h5", "h6", "div"],
    &["strong", "em", "i", "b", "mark"],
];

/// Tags considered interchangeable with `tag` for L4's expansion search,
/// including `tag` itself.
pub fn semantic_tag_group(tag: &str) -> HashSet<String> {
    let mut set = HashSet::new();
    set.insert(tag.to_string());
    for group in SEMANTIC_TAG_GROUPS {
        if group.contains(&tag) {
            for t in *group {
                set.insert(t.to_string());
            }
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_match() {
        assert_eq!(find("Hello World", "World"), Some((6, 11)));
    }

    #[test]
    fn whitespace_normalized_match() {
        let haystack = "Hello\n   World  there";
        // The match spans "Hello\n   World" in the original, not just the
        // 11 bytes of the normalized needle — the collapsed whitespace run
        // is wider than the single space it folds down to.
        assert_eq!(find(haystack, "Hello World"), Some((0, 14)));
    }

    #[test]
    fn fullwidth_and_ampersand_folding() {
        let haystack = "Price: \u{FF1C} $100 \u{FF06} \u{FF1E} $50";
        let (start, end) = find(haystack, "< $100 & > $50").expect("expected enhanced-normalized match to be found");
        // Fullwidth punctuation is 3 bytes each vs. 1 byte ASCII, so the
        // matched original span is longer than the 14-byte needle.
        assert_eq!(start, 7);
        assert_eq!(end, haystack.len());
        assert!(haystack.is_char_boundary(start));
        assert!(haystack.is_char_boundary(end));
    }

    #[test]
    fn fuzzy_word_sequence_match() {
        // "the" vs "pretty" is the one mismatched token out of five (80%,
        // right at the threshold); direct/whitespace/enhanced stages all
        // fail since the wording genuinely differs.
        let haystack = "Somewhere the quick brown fox jumped around";
        let needle = "pretty quick brown fox jumped";
        assert!(find(haystack, needle).is_some());
    }

    #[test]
    fn fuzzy_word_sequence_rejects_below_threshold() {
        let haystack = "Somewhere completely different text entirely here";
        let needle = "pretty quick brown fox jumped";
        assert_eq!(find(haystack, needle), None);
    }

    #[test]
    fn bem_identical_is_one() {
        assert_eq!(bem_class_similarity("card card--active", "card card--active"), 1.0);
    }

    #[test]
    fn bem_partial_block_element_modifier() {
        let sim = bem_class_similarity("card__header--sticky", "card__header--fixed");
        // block + element match (0.8 of weight), modifier differs.
        assert!((sim - 0.8).abs() < 1e-9);
    }

    #[test]
    fn utility_classes_down_weighted() {
        let sim_utility = bem_class_similarity("js-toggle", "card");
        let sim_plain = bem_class_similarity("toggle", "card");
        assert!(sim_utility <= sim_plain);
    }

    #[test]
    fn semantic_tag_expansion_groups() {
        let group = semantic_tag_group("h2");
        assert!(group.contains("h3"));
        assert!(group.contains("div"));
        assert!(!group.contains("span"));
    }

    #[test]
    fn normalized_equal_tolerates_fullwidth_folding() {
        let actual = "\u{FF1C} $100 \u{FF06} \u{FF1E} $50";
        assert!(normalized_equal(actual, "< $100 & > $50"));
    }

    #[test]
    fn normalized_equal_rejects_genuinely_different_text() {
        assert!(!normalized_equal("hello world", "goodbye world"));
    }
}
