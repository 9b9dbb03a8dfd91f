//! The serialized form of a selection (spec.md §3.2–§3.7): immutable once
//! produced by [`crate::serializer::Serializer`], consumed by
//! [`crate::restorer::Restorer`]. Every field round-trips through `serde` so
//! a `Descriptor` can cross a process boundary as JSON (§6.3); readers must
//! tolerate missing optional fields, so every Option is `#[serde(default)]`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub id: String,
    pub text: String,
    pub anchors: IdentityAnchors,
    pub paths: PathAnchors,
    pub multi: MultiAnchor,
    pub fingerprint: Fingerprint,
    pub context: TextContext,
}

impl Descriptor {
    /// `start_id == end_id` (or their custom-id equivalents match) — spec.md
    /// §3.3 invariant distinguishing same-element from cross-element anchors.
    pub fn is_same_element_by_id(&self) -> bool {
        let by_custom = match (
            &self.anchors.start_custom_id,
            &self.anchors.end_custom_id,
        ) {
            (Some(s), Some(e)) => Some(s == e),
            _ => None,
        };
        if let Some(same) = by_custom {
            return same;
        }
        match (&self.anchors.start_id, &self.anchors.end_id) {
            (Some(s), Some(e)) => s == e,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityAnchors {
    #[serde(default)]
    pub start_id: Option<String>,
    #[serde(default)]
    pub end_id: Option<String>,
    pub start_offset: usize,
    pub end_offset: usize,
    #[serde(default)]
    pub start_custom_id: Option<String>,
    #[serde(default)]
    pub end_custom_id: Option<String>,
    #[serde(default)]
    pub custom_id_attribute: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathAnchors {
    pub start_path: String,
    pub end_path: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_text_offset: usize,
    pub end_text_offset: usize,
}

/// A small whitelist of attributes kept for candidate identification
/// (spec.md §3.5). Anything outside this list is deliberately dropped: the
/// descriptor is meant to be small and stable, not a full attribute dump.
pub const MULTI_ANCHOR_ATTRIBUTES: &[&str] =
    &["data-id", "data-key", "data-testid", "role", "type", "name"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementAnchor {
    pub tag: String,
    pub class_string: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiblingInfo {
    pub index: usize,
    pub total: usize,
    pub tag_pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiAnchor {
    pub start_anchor: ElementAnchor,
    pub end_anchor: ElementAnchor,
    #[serde(default)]
    pub common_parent: Option<String>,
    #[serde(default)]
    pub sibling_info: Option<SiblingInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParentChainEntry {
    pub tag: String,
    pub class_string: String,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiblingPattern {
    pub position: usize,
    pub total: usize,
    pub before_tags: Vec<String>,
    pub after_tags: Vec<String>,
}

/// Structural signature of the start element, used by L4 (spec.md §3.6).
/// `parent_chain` is capped at `PARENT_CHAIN_DEPTH`.
pub const PARENT_CHAIN_DEPTH: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub tag: String,
    pub class_string: String,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    pub text_length: usize,
    pub child_count: usize,
    pub depth: usize,
    #[serde(default)]
    pub parent_chain: Vec<ParentChainEntry>,
    #[serde(default)]
    pub sibling_pattern: Option<SiblingPattern>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextPosition {
    pub start: usize,
    pub end: usize,
    pub total_length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContext {
    pub preceding_text: String,
    pub following_text: String,
    pub parent_text: String,
    pub text_position: TextPosition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let descriptor = Descriptor {
            id: "sel-1".to_string(),
            text: "World".to_string(),
            anchors: IdentityAnchors {
                start_id: Some("b".to_string()),
                end_id: Some("b".to_string()),
                start_offset: 6,
                end_offset: 11,
                ..Default::default()
            },
            paths: PathAnchors::default(),
            multi: MultiAnchor::default(),
            fingerprint: Fingerprint::default(),
            context: TextContext::default(),
        };

        let json = serde_json::to_string(&descriptor).unwrap();
        let parsed: Descriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(descriptor, parsed);
        assert!(parsed.is_same_element_by_id());
    }

    #[test]
    fn tolerates_missing_optional_fields() {
        // A descriptor written by an older core that never populated
        // `sibling_info` or `custom_id_attribute` must still deserialize.
        let json = serde_json::json!({
            "id": "sel-2",
            "text": "Hello",
            "anchors": {"start_offset": 0, "end_offset": 5},
            "paths": {
                "start_path": "", "end_path": "",
                "start_offset": 0, "end_offset": 0,
                "start_text_offset": 0, "end_text_offset": 0
            },
            "multi": {
                "start_anchor": {"tag": "", "class_string": ""},
                "end_anchor": {"tag": "", "class_string": ""}
            },
            "fingerprint": {
                "tag": "", "class_string": "",
                "text_length": 0, "child_count": 0, "depth": 0
            },
            "context": {
                "preceding_text": "", "following_text": "", "parent_text": "",
                "text_position": {"start": 0, "end": 0, "total_length": 0}
            }
        });
        let parsed: Descriptor = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.anchors.custom_id_attribute, None);
        assert_eq!(parsed.multi.sibling_info, None);
        assert!(parsed.fingerprint.parent_chain.is_empty());
    }
}
