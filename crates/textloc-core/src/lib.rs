//! Durable text-range anchoring: serialize a user's selection over a
//! structured document tree into a portable [`descriptor::Descriptor`], then
//! restore an equivalent selection after the tree has mutated.
//!
//! The crate never touches a concrete tree engine directly — every layer, the
//! [`serializer::Serializer`] and the [`restorer::Restorer`] are written
//! against [`tree::TreeAdapter`], a capability trait a host implements once.
//! `textloc-memtree` is the reference implementation, used by this crate's
//! own tests and benches; a browser DOM or a parsed-HTML tree would implement
//! the same trait.
//!
//! Restoration runs a four-layer cascade (L1 → L2 → L3 → L4), each layer
//! strictly cheaper and more exact than the next one it falls back to:
//!
//! 1. [`layers::l1_identity`] — stable element id plus stored offset.
//! 2. [`layers::l2_path`] — a structural CSS-like path, re-walked.
//! 3. [`layers::l3_multi_anchor`] — tag/class/attribute candidate scoring.
//! 4. [`layers::l4_fingerprint`] — weighted structural similarity.
//!
//! Every candidate a layer proposes passes through [`validator::validate`]
//! before it's accepted — an exact text match, or nothing.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod layers;
pub mod metrics;
pub mod path;
pub mod restorer;
pub mod serializer;
pub mod textmatch;
pub mod tree;
pub mod validator;

pub use config::LocatorConfig;
pub use descriptor::Descriptor;
pub use error::{LayerError, LayerResult};
pub use restorer::{ContainerConfig, RestoreResult, Restorer};
pub use serializer::{SerializeOptions, Serializer};
pub use tree::{TextRange, TreeAdapter};
