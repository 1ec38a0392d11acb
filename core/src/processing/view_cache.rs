use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::processing::aggregate::AggregatedWindow;
use crate::processing::window::WindowSpec;
use crate::timeline::TimelineId;

/// Memoization key for one aggregated window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub timeline: TimelineId,
    pub cursor_index: usize,
    pub spec: WindowSpec,
    pub view: String,
}

/// Bounded memo of built windows. Entries belong to a single timeline;
/// seeing a different timeline id drops everything.
pub struct ViewCache {
    timeline: Option<TimelineId>,
    entries: HashMap<ViewKey, Arc<AggregatedWindow>>,
    order: VecDeque<ViewKey>,
    max_capacity: usize,
}

impl ViewCache {
    pub fn with_capacity(max_capacity: usize) -> Self {
        Self {
            timeline: None,
            entries: HashMap::with_capacity(max_capacity),
            order: VecDeque::with_capacity(max_capacity),
            max_capacity,
        }
    }

    /// Returns the cached window or builds and stores it. The flag is true
    /// on a hit.
    pub fn get_or_build<F>(&mut self, key: ViewKey, build: F) -> (Arc<AggregatedWindow>, bool)
    where
        F: FnOnce() -> AggregatedWindow,
    {
        if self.timeline != Some(key.timeline) {
            self.invalidate();
            self.timeline = Some(key.timeline);
        }

        if let Some(window) = self.entries.get(&key) {
            return (Arc::clone(window), true);
        }

        let window = Arc::new(build());
        if self.max_capacity == 0 {
            return (window, false);
        }
        while self.entries.len() >= self.max_capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, Arc::clone(&window));
        (window, false)
    }

    pub fn invalidate(&mut self) {
        if !self.entries.is_empty() {
            debug!("dropping {} cached windows", self.entries.len());
        }
        self.entries.clear();
        self.order.clear();
        self.timeline = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::MergedTimeline;

    fn key(timeline: TimelineId, cursor_index: usize) -> ViewKey {
        ViewKey {
            timeline,
            cursor_index,
            spec: WindowSpec::All,
            view: "segmentation".into(),
        }
    }

    fn empty() -> AggregatedWindow {
        AggregatedWindow::empty(vec!["a".into()])
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let id = MergedTimeline::empty().id();
        let mut cache = ViewCache::with_capacity(4);
        let (_, hit) = cache.get_or_build(key(id, 0), empty);
        assert!(!hit);
        let (_, hit) = cache.get_or_build(key(id, 0), || panic!("should be cached"));
        assert!(hit);
    }

    #[test]
    fn new_timeline_invalidates_entries() {
        let first = MergedTimeline::empty().id();
        let second = MergedTimeline::empty().id();
        let mut cache = ViewCache::with_capacity(4);
        cache.get_or_build(key(first, 0), empty);
        cache.get_or_build(key(first, 1), empty);
        assert_eq!(cache.len(), 2);
        cache.get_or_build(key(second, 0), empty);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let id = MergedTimeline::empty().id();
        let mut cache = ViewCache::with_capacity(2);
        for idx in 0..3 {
            cache.get_or_build(key(id, idx), empty);
        }
        assert_eq!(cache.len(), 2);
        let (_, hit) = cache.get_or_build(key(id, 0), empty);
        assert!(!hit);
    }

    #[test]
    fn zero_capacity_never_stores() {
        let id = MergedTimeline::empty().id();
        let mut cache = ViewCache::with_capacity(0);
        cache.get_or_build(key(id, 0), empty);
        assert!(cache.is_empty());
    }
}
