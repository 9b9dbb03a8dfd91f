//! Per-layer and overall restoration metrics (spec.md §4.9). Owned by a
//! [`crate::restorer::Restorer`] value rather than a process-wide global —
//! see the Design Notes redesign in spec.md §9 ("Metrics move to an
//! optional observer object the caller opts in to").

use std::fmt::Write as _;
use std::time::Duration;

use crate::restorer::Layer;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerMetrics {
    pub attempts: u64,
    pub successes: u64,
    pub total_time: Duration,
    pub min_time: Option<Duration>,
    pub max_time: Option<Duration>,
}

impl LayerMetrics {
    pub fn avg_time(&self) -> Duration {
        if self.attempts == 0 {
            Duration::ZERO
        } else {
            self.total_time / self.attempts as u32
        }
    }

    fn record(&mut self, success: bool, elapsed: Duration) {
        self.attempts += 1;
        if success {
            self.successes += 1;
        }
        self.total_time += elapsed;
        self.min_time = Some(self.min_time.map_or(elapsed, |m| m.min(elapsed)));
        self.max_time = Some(self.max_time.map_or(elapsed, |m| m.max(elapsed)));
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub layers: [LayerMetrics; 4],
    pub total_restores: u64,
    pub total_successes: u64,
}

impl MetricsSnapshot {
    pub fn success_rate(&self) -> f64 {
        if self.total_restores == 0 {
            0.0
        } else {
            self.total_successes as f64 / self.total_restores as f64
        }
    }

    pub fn avg_time(&self) -> Duration {
        let total: Duration = self.layers.iter().map(|l| l.total_time).sum();
        let attempts: u64 = self.layers.iter().map(|l| l.attempts).sum();
        if attempts == 0 {
            Duration::ZERO
        } else {
            total / attempts as u32
        }
    }
}

/// Per-process (here: per-`Restorer`) counter record. `enabled` gates every
/// `record_*` call to a no-op, per spec.md §4.9: "Collection can be enabled
/// and disabled at runtime; when disabled, record operations are no-ops."
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    enabled: bool,
    layers: [LayerMetrics; 4],
    total_restores: u64,
    total_successes: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn reset(&mut self) {
        let enabled = self.enabled;
        *self = Self::default();
        self.enabled = enabled;
    }

    pub(crate) fn record_attempt(&mut self, layer: Layer, success: bool, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        if let Some(idx) = layer.index() {
            self.layers[idx].record(success, elapsed);
        }
    }

    pub(crate) fn record_restore(&mut self, success: bool) {
        if !self.enabled {
            return;
        }
        self.total_restores += 1;
        if success {
            self.total_successes += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            layers: self.layers,
            total_restores: self.total_restores,
            total_successes: self.total_successes,
        }
    }

    pub fn report(&self) -> String {
        let snap = self.snapshot();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "restores={} successes={} rate={:.1}% avg={:?}",
            snap.total_restores,
            snap.total_successes,
            snap.success_rate() * 100.0,
            snap.avg_time(),
        );
        for (idx, layer) in snap.layers.iter().enumerate() {
            let _ = writeln!(
                out,
                "L{}: attempts={} successes={} avg={:?} min={:?} max={:?}",
                idx + 1,
                layer.attempts,
                layer.successes,
                layer.avg_time(),
                layer.min_time.unwrap_or_default(),
                layer.max_time.unwrap_or_default(),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn disabled_metrics_are_noop() {
        let mut m = Metrics::new();
        m.disable();
        m.record_attempt(Layer::L1, true, Duration::from_millis(5));
        m.record_restore(true);
        let snap = m.snapshot();
        assert_eq!(snap.total_restores, 0);
        assert_eq!(snap.layers[0].attempts, 0);
    }

    #[test]
    fn conserves_attempts_and_successes() {
        let mut m = Metrics::new();
        m.record_attempt(Layer::L1, false, Duration::from_millis(1));
        m.record_attempt(Layer::L2, false, Duration::from_millis(2));
        m.record_attempt(Layer::L3, true, Duration::from_millis(3));
        m.record_restore(true);

        let snap = m.snapshot();
        let total_attempts: u64 = snap.layers.iter().map(|l| l.attempts).sum();
        let total_successes: u64 = snap.layers.iter().map(|l| l.successes).sum();
        assert_eq!(total_attempts, 3);
        assert_eq!(total_successes, 1);
        assert_eq!(snap.total_restores, 1);
        assert_eq!(snap.total_successes, 1);
    }

    #[test]
    fn reset_preserves_enabled_flag() {
        let mut m = Metrics::new();
        m.disable();
        m.reset();
        assert!(!m.is_enabled());
    }

    /// `report()`'s human-readable format is a stable contract other tools
    /// may parse (dashboards, CLI output) — pin its shape the way the
    /// teacher pins its own rendered output with `insta`.
    #[test]
    fn report_format_is_stable() {
        let mut m = Metrics::new();
        m.record_attempt(Layer::L1, true, Duration::ZERO);
        m.record_restore(true);

        insta::assert_snapshot!(m.report(), @r###"
        restores=1 successes=1 rate=100.0% avg=0ns
        L1: attempts=1 successes=1 avg=0ns min=0ns max=0ns
        L2: attempts=0 successes=0 avg=0ns min=0ns max=0ns
        L3: attempts=0 successes=0 avg=0ns min=0ns max=0ns
        L4: attempts=0 successes=0 avg=0ns min=0ns max=0ns
        "###);
    }
}
