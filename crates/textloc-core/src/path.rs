//! The CSS-like path expression grammar used by `PathAnchors` (spec.md §3.4)
//! and resolved by L2 (§4.5). Also the expression the serializer emits when
//! it ascends from an element to the document root (§4.1).
//!
//! Grammar, informally:
//!
//! ```text
//! path       := leading_id? segment (">" segment)*
//! leading_id := "#" ident
//! segment    := tag ("." class)* ("#" id)? (":nth-of-type(" n ")")?
//! ```
//!
//! A path that begins with `/` or `.//` is legacy XPath compatibility
//! (spec.md §4.5 step 2) and is not interpreted by this parser — L2 passes
//! it through to the host's own XPath-capable adapter unchanged, which a
//! minimal host is free to reject.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub tag: String,
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub nth_of_type: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    /// Parsed CSS-like segment chain, descending from the scope root.
    Css(Vec<PathSegment>),
    /// Opaque legacy XPath string (spec.md §4.5 step 2), resolved by the
    /// host adapter if it chooses to support it. `textloc-core` never
    /// interprets it.
    XPath(String),
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathExpr::XPath(s) => write!(f, "{s}"),
            PathExpr::Css(segments) => {
                let rendered: Vec<String> = segments.iter().map(render_segment).collect();
                write!(f, "{}", rendered.join(" > "))
            }
        }
    }
}

fn render_segment(seg: &PathSegment) -> String {
    let mut out = seg.tag.clone();
    for class in &seg.classes {
        out.push('.');
        out.push_str(class);
    }
    if let Some(id) = &seg.id {
        out.push('#');
        out.push_str(id);
    }
    if let Some(n) = seg.nth_of_type {
        out.push_str(&format!(":nth-of-type({n})"));
    }
    out
}

/// Parse a path expression string produced by the serializer (or handed in
/// from a `Descriptor` loaded off the wire).
///
/// Returns `None` on empty input; per spec.md §4.5 step 1, an empty path is
/// L2's first failure condition, not a parse error.
pub fn parse_path(raw: &str) -> Option<PathExpr> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') || trimmed.starts_with(".//") {
        return Some(PathExpr::XPath(trimmed.to_string()));
    }

    let mut segments = Vec::new();
    for raw_segment in trimmed.split('>') {
        let raw_segment = raw_segment.trim();
        if raw_segment.is_empty() {
            continue;
        }
        segments.push(parse_segment(raw_segment)?);
    }
    if segments.is_empty() {
        return None;
    }
    Some(PathExpr::Css(segments))
}

fn parse_segment(raw: &str) -> Option<PathSegment> {
    // Leading `#id` short form (spec.md §3.4): the whole segment is just an id.
    if let Some(rest) = raw.strip_prefix('#') {
        let (id, nth) = split_nth_of_type(rest);
        return Some(PathSegment {
            tag: String::new(),
            classes: Vec::new(),
            id: Some(id.to_string()),
            nth_of_type: nth,
        });
    }

    let (body, nth) = split_nth_of_type(raw);

    let mut tag = String::new();
    let mut classes = Vec::new();
    let mut id = None;
    let mut chars = body.char_indices().peekable();
    let mut cursor = 0usize;

    while let Some(&(idx, ch)) = chars.peek() {
        if ch == '.' || ch == '#' {
            break;
        }
        tag.push(ch);
        cursor = idx + ch.len_utf8();
        chars.next();
    }
    let mut rest = &body[cursor..];
    while !rest.is_empty() {
        let marker = rest.chars().next().unwrap();
        let tail = &rest[marker.len_utf8()..];
        let end = tail.find(['.', '#']).unwrap_or(tail.len());
        let token = &tail[..end];
        match marker {
            '.' => classes.push(token.to_string()),
            '#' => id = Some(token.to_string()),
            _ => unreachable!(),
        }
        rest = &tail[end..];
    }

    if tag.is_empty() && id.is_none() && classes.is_empty() {
        return None;
    }

    Some(PathSegment {
        tag: tag.to_lowercase(),
        classes,
        id,
        nth_of_type: nth,
    })
}

fn split_nth_of_type(raw: &str) -> (&str, Option<usize>) {
    if let Some(start) = raw.find(":nth-of-type(") {
        let after = &raw[start + ":nth-of-type(".len()..];
        if let Some(close) = after.find(')') {
            if let Ok(n) = after[..close].trim().parse::<usize>() {
                return (&raw[..start], Some(n));
            }
        }
    }
    (raw, None)
}

/// Build the path expression for `element` by ascending to the document
/// root (or to the first ancestor carrying an id, per spec.md §4.1: "stop
/// ascending when an id is found"), via the adapter's navigation and
/// sibling-tag inspection for `:nth-of-type`.
pub fn build_path<A: crate::tree::TreeAdapter>(adapter: &A, element: &A::Element) -> PathExpr {
    let mut segments = Vec::new();
    let mut current = Some(element.clone());

    while let Some(el) = current {
        let tag = adapter.tag(&el);
        let id = adapter.id(&el);
        let classes = adapter.classes(&el);
        let nth = nth_of_type(adapter, &el, &tag);

        segments.push(PathSegment {
            tag,
            classes,
            id: id.clone(),
            nth_of_type: nth,
        });

        if id.is_some() {
            break;
        }
        current = adapter.parent(&el);
    }

    segments.reverse();
    PathExpr::Css(segments)
}

fn nth_of_type<A: crate::tree::TreeAdapter>(
    adapter: &A,
    element: &A::Element,
    tag: &str,
) -> Option<usize> {
    let parent = adapter.parent(element)?;
    let siblings = adapter.children(&parent);
    let same_tag: Vec<&A::Element> = siblings
        .iter()
        .filter(|s| adapter.tag(s) == tag)
        .collect();
    if same_tag.len() <= 1 {
        return None;
    }
    same_tag
        .iter()
        .position(|s| *s == element)
        .map(|idx| idx + 1)
}

/// Resolve a parsed CSS-like path to an element via the adapter's own
/// `query_selector`. XPath expressions are passed through untouched
/// (spec.md §4.5 step 2 — legacy compatibility, not implemented by core).
pub fn resolve<A: crate::tree::TreeAdapter>(
    adapter: &A,
    scope: Option<&A::Element>,
    path: &PathExpr,
) -> Option<A::Element> {
    adapter.query_selector(scope, path)
}
