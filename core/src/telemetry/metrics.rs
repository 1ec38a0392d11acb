use serde::Serialize;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

/// Counter values at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cursor_mutations: usize,
    pub timeline_reloads: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_load(&self, loaded: usize, skipped: usize) {
        self.update(|m| {
            m.rows_loaded += loaded;
            m.rows_skipped += skipped;
        });
    }

    pub fn record_cache(&self, hit: bool) {
        self.update(|m| {
            if hit {
                m.cache_hits += 1;
            } else {
                m.cache_misses += 1;
            }
        });
    }

    pub fn record_cursor_mutation(&self) {
        self.update(|m| m.cursor_mutations += 1);
    }

    pub fn record_reload(&self) {
        self.update(|m| m.timeline_reloads += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
