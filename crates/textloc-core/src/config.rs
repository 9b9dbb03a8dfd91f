//! The only configuration the core carries (spec.md §3.8): an optional id
//! filter and an optional custom-id attribute name. Both live as explicit
//! fields on a value the caller owns, rather than process-wide globals —
//! see the redesign rationale in spec.md §9.

/// Shared by [`crate::serializer::Serializer`] (which consults the id
/// filter when choosing an anchor, and the custom id attribute when reading
/// it) and [`crate::restorer::Restorer`] (which needs the same attribute
/// name to resolve `start_custom_id`/`end_custom_id` during L1).
#[derive(Default)]
pub struct LocatorConfig {
    id_filter: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
    custom_id_attribute: Option<String>,
}

impl std::fmt::Debug for LocatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocatorConfig")
            .field("id_filter", &self.id_filter.is_some())
            .field("custom_id_attribute", &self.custom_id_attribute)
            .finish()
    }
}

impl LocatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate that may reject a candidate identifier from
    /// serialization (e.g. to skip framework-generated ids like `react-19`).
    pub fn register_id_filter(&mut self, filter: impl Fn(&str) -> bool + Send + Sync + 'static) {
        self.id_filter = Some(Box::new(filter));
    }

    pub fn clear_id_filter(&mut self) {
        self.id_filter = None;
    }

    pub fn set_custom_id_attribute(&mut self, name: Option<String>) {
        self.custom_id_attribute = name;
    }

    pub fn custom_id_attribute(&self) -> Option<&str> {
        self.custom_id_attribute.as_deref()
    }

    /// True if `id` is acceptable as an anchor identifier: no filter
    /// registered, or the filter accepts it.
    pub fn accepts_id(&self, id: &str) -> bool {
        match &self.id_filter {
            Some(filter) => filter(id),
            None => true,
        }
    }
}
