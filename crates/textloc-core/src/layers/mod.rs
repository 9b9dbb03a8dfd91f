//! The four cascaded restoration strategies (spec.md §4.4–§4.7), tried in
//! order by [`crate::restorer::Restorer::restore`]. Each module exposes a
//! single `restore` function with the same shape: descriptor in, a
//! validated range or a [`crate::error::LayerError`] out.

pub mod l1_identity;
pub mod l2_path;
pub mod l3_multi_anchor;
pub mod l4_fingerprint;
