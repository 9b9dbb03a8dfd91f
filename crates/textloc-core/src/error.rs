//! Internal error taxonomy (spec.md §7). None of these cross the public
//! `serialize`/`restore` boundary as a propagated `Err` — the cascade
//! controller catches every layer's `Result` and folds it into a
//! [`crate::restorer::RestoreResult`] (spec.md: "the cascade always returns
//! a result object; it never throws"). The enum exists so each layer's
//! internals read the way the teacher's `IoError`/config errors do, with
//! `thiserror` doing the `Display` boilerplate.

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("no anchor could be resolved to an element")]
    MissingAnchor,
    #[error("element resolved but the stored offset did not reproduce the text")]
    OffsetMismatch,
    #[error("candidate range text did not equal the expected text")]
    TextMismatch,
    #[error("required descriptor field was empty")]
    InvalidInput,
    #[error("no candidate element was found")]
    NoCandidates,
}

pub type LayerResult<T> = Result<T, LayerError>;
