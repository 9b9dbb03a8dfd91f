//! The Restorer / Cascade Controller (spec.md §4.2): runs L1 → L2 → L3 → L4
//! strictly in order, catches every layer's failure (and any internal
//! panic-turned-error) and folds it into a [`RestoreResult`] that is never
//! itself an `Err` — per spec.md §7, "the cascade always returns a result
//! object; it never throws."

use std::time::{Duration, Instant};

use crate::config::LocatorConfig;
use crate::descriptor::Descriptor;
use crate::error::LayerError;
use crate::layers::{l1_identity, l2_path, l3_multi_anchor, l4_fingerprint};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::tree::TextRange;
use crate::tree::TreeAdapter;

/// The message surfaced when every layer fails (spec.md §4.2 and the
/// terminal `AllLayersExhausted` case in §7).
pub const CONTENT_CHANGED_MESSAGE: &str = "content changed; reselect required";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    L1,
    L2,
    L3,
    L4,
}

impl Layer {
    pub fn index(self) -> Option<usize> {
        Some(match self {
            Layer::L1 => 0,
            Layer::L2 => 1,
            Layer::L3 => 2,
            Layer::L4 => 3,
        })
    }

    pub fn number(self) -> u8 {
        self.index().unwrap() as u8 + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            Layer::L1 => "identity anchor",
            Layer::L2 => "structural path",
            Layer::L3 => "multi-anchor",
            Layer::L4 => "structural fingerprint",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContainerConfig {
    pub root_id: Option<String>,
}

/// Outcome of a single `restore` call (spec.md §4.2). `layer` is `0` on
/// failure, matching the "numeric layer field retained only for metrics
/// reporting" note in spec.md §9 — the discriminated outcome itself is
/// `range.is_some()` vs. `error.is_some()`.
#[derive(Debug, Clone)]
pub struct RestoreResult<A: TreeAdapter> {
    pub success: bool,
    pub layer: u8,
    pub layer_name: String,
    pub elapsed: Duration,
    pub range: Option<TextRange<A>>,
    pub error: Option<String>,
}

pub struct Restorer {
    config: LocatorConfig,
    metrics: Metrics,
}

impl Default for Restorer {
    fn default() -> Self {
        Self::new(LocatorConfig::new())
    }
}

impl Restorer {
    pub fn new(config: LocatorConfig) -> Self {
        Self {
            config,
            metrics: Metrics::new(),
        }
    }

    pub fn config_mut(&mut self) -> &mut LocatorConfig {
        &mut self.config
    }

    pub fn enable_metrics(&mut self) {
        self.metrics.enable();
    }

    pub fn disable_metrics(&mut self) {
        self.metrics.disable();
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    pub fn metrics_report(&self) -> String {
        self.metrics.report()
    }

    pub fn restore<A: TreeAdapter>(
        &mut self,
        descriptor: &Descriptor,
        adapter: &A,
        container: &ContainerConfig,
    ) -> RestoreResult<A> {
        let scope = self.resolve_scope(adapter, container);

        for layer in [Layer::L1, Layer::L2, Layer::L3, Layer::L4] {
            let start = Instant::now();
            let outcome = run_layer(layer, descriptor, adapter, scope.as_ref(), &self.config);
            let elapsed = start.elapsed();

            let success = outcome.is_ok();
            self.metrics.record_attempt(layer, success, elapsed);

            if let Ok(range) = outcome {
                self.metrics.record_restore(true);
                return RestoreResult {
                    success: true,
                    layer: layer.number(),
                    layer_name: layer.name().to_string(),
                    elapsed,
                    range: Some(range),
                    error: None,
                };
            }
        }

        self.metrics.record_restore(false);
        RestoreResult {
            success: false,
            layer: 0,
            layer_name: "restore failed".to_string(),
            elapsed: Duration::ZERO,
            range: None,
            error: Some(CONTENT_CHANGED_MESSAGE.to_string()),
        }
    }

    fn resolve_scope<A: TreeAdapter>(
        &self,
        adapter: &A,
        container: &ContainerConfig,
    ) -> Option<A::Element> {
        let root_id = container.root_id.as_deref()?;
        match adapter.get_element_by_id(None, root_id) {
            Some(el) => Some(el),
            None => {
                eprintln!(
                    "textloc-core: configured root_id {root_id:?} not found in tree, falling back to whole-tree search"
                );
                None
            }
        }
    }
}

/// Invoke one layer, converting any internal error into a layer failure.
/// Rust has no catchable panics-as-values the way the source's try/catch
/// does, so "an internal panic is caught at the cascade boundary" (spec.md
/// §9) is expressed here as every layer returning `Result` rather than
/// panicking; `std::panic::catch_unwind` is deliberately not used — layers
/// are expected to be panic-free and return `LayerError` for every failure
/// mode instead.
fn run_layer<A: TreeAdapter>(
    layer: Layer,
    descriptor: &Descriptor,
    adapter: &A,
    scope: Option<&A::Element>,
    config: &LocatorConfig,
) -> Result<TextRange<A>, LayerError> {
    match layer {
        Layer::L1 => l1_identity::restore(descriptor, adapter, scope),
        Layer::L2 => l2_path::restore(descriptor, adapter, scope),
        Layer::L3 => l3_multi_anchor::restore(descriptor, adapter, scope),
        Layer::L4 => l4_fingerprint::restore(descriptor, adapter, scope),
    }
}
