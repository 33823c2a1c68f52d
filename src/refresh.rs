//! Per-entry refresh policy engine.
//!
//! Each cached entry owns one engine. The engine listens on the change bus,
//! latches a sticky dirty flag when a changed path matches its patterns,
//! and combines that with a time-based expiry. Lifecycle events from the
//! owning cache store detach it from the bus exactly once; a subscription
//! that is never released leaks for the remainder of the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use metrics::counter;
use time::OffsetDateTime;
use tracing::debug;

use crate::bus::{ChangeBus, ChangeListener, SubscriptionId};
use crate::error::CacheError;
use crate::pattern;
use crate::resolver::CacheConfiguration;

const METRIC_ENTRIES_DIRTIED: &str = "rendercache_entries_dirtied_total";
const METRIC_LISTENERS_DETACHED: &str = "rendercache_listeners_detached_total";

/// Lifecycle event delivered by the owning cache store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntryEvent {
    Added { key: String },
    Updated { key: String },
    Removed { key: String },
    Flushed(FlushScope),
}

/// Scope of a flush event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushScope {
    /// One entry, addressed by key.
    Entry(String),
    /// Every entry whose key matches a raw pattern.
    Group(String),
    /// The whole cache.
    Whole,
}

/// Refresh policy bound 1:1 to a cache entry.
pub struct RefreshPolicyEngine {
    entry_key: String,
    created_at: OffsetDateTime,
    configuration: CacheConfiguration,
    dirty: AtomicBool,
    detached: AtomicBool,
    bus: Arc<ChangeBus>,
    subscription: OnceLock<SubscriptionId>,
}

impl RefreshPolicyEngine {
    /// Bind a new engine to a cache entry and subscribe it to the bus.
    ///
    /// Fails when the entry key is blank: an engine must always be
    /// identifiable for lifecycle matching.
    pub fn bind(
        bus: Arc<ChangeBus>,
        entry_key: impl Into<String>,
        configuration: CacheConfiguration,
    ) -> Result<Arc<Self>, CacheError> {
        let entry_key = entry_key.into();
        if entry_key.trim().is_empty() {
            return Err(CacheError::BlankEntryKey);
        }

        let engine = Arc::new(Self {
            entry_key,
            created_at: OffsetDateTime::now_utc(),
            configuration,
            dirty: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            bus,
            subscription: OnceLock::new(),
        });

        let id = engine
            .bus
            .subscribe(Arc::clone(&engine) as Arc<dyn ChangeListener>);
        let _ = engine.subscription.set(id);
        Ok(engine)
    }

    pub fn entry_key(&self) -> &str {
        &self.entry_key
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn configuration(&self) -> &CacheConfiguration {
        &self.configuration
    }

    /// Whether a matching change notification has been observed.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Whether the engine has detached from the change bus.
    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// The entry is stale once a matching change arrived or its age reached
    /// the time-to-live. A dirty result is permanent regardless of age.
    pub fn needs_refresh(&self, entry_age_seconds: u64) -> bool {
        self.is_dirty() || entry_age_seconds >= u64::from(self.configuration.time_to_live_seconds)
    }

    /// Convenience form of [`needs_refresh`](Self::needs_refresh) deriving
    /// the age from the entry's creation timestamp.
    pub fn needs_refresh_now(&self) -> bool {
        let age = (OffsetDateTime::now_utc() - self.created_at)
            .whole_seconds()
            .max(0) as u64;
        self.needs_refresh(age)
    }

    /// Handle a lifecycle event from the owning cache store.
    ///
    /// Entry-scoped events apply only when the key matches this entry;
    /// group flushes match the entry key against the flush pattern; a
    /// whole-cache flush always applies. Applicable events detach the
    /// engine; late or repeated events are no-ops.
    pub fn handle(&self, event: &CacheEntryEvent) {
        let applies = match event {
            CacheEntryEvent::Added { key }
            | CacheEntryEvent::Updated { key }
            | CacheEntryEvent::Removed { key } => key == &self.entry_key,
            CacheEntryEvent::Flushed(FlushScope::Entry(key)) => key == &self.entry_key,
            CacheEntryEvent::Flushed(FlushScope::Group(raw)) => {
                pattern::full_match(raw, &self.entry_key)
            }
            CacheEntryEvent::Flushed(FlushScope::Whole) => true,
        };
        if applies {
            self.detach();
        }
    }

    /// Unsubscribe from the change bus; the side effect runs at most once
    /// no matter how many lifecycle callbacks race here.
    pub fn detach(&self) {
        if self.detached.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(id) = self.subscription.get() {
            self.bus.unsubscribe(*id);
        }
        counter!(METRIC_LISTENERS_DETACHED).increment(1);
        debug!(entry_key = %self.entry_key, "Refresh engine detached from change bus");
    }
}

impl ChangeListener for RefreshPolicyEngine {
    /// Sticky: once any call returned true, every later call returns true
    /// without re-evaluating patterns.
    fn on_change_notification(&self, path: &str) -> bool {
        if self.is_dirty() {
            return true;
        }
        if self
            .configuration
            .patterns
            .iter()
            .any(|pattern| pattern.matches(path))
        {
            if !self.dirty.swap(true, Ordering::AcqRel) {
                counter!(METRIC_ENTRIES_DIRTIED).increment(1);
                debug!(entry_key = %self.entry_key, path, "Cache entry marked dirty");
            }
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::pattern::InvalidationPattern;

    fn configuration(ttl: u32, patterns: Vec<InvalidationPattern>) -> CacheConfiguration {
        CacheConfiguration {
            resource_type: "myapp/components/comp".to_string(),
            time_to_live_seconds: ttl,
            cache_level: -1,
            resource_type_path: Some("/apps/myapp/components/comp".to_string()),
            patterns,
        }
    }

    fn engine_with_pattern(bus: &Arc<ChangeBus>, ttl: u32) -> Arc<RefreshPolicyEngine> {
        RefreshPolicyEngine::bind(
            Arc::clone(bus),
            "/apps/myapp/components/comp/content/site",
            configuration(
                ttl,
                vec![InvalidationPattern::anchored("/content/site/en/page")],
            ),
        )
        .expect("engine binds")
    }

    #[test]
    fn bind_rejects_blank_entry_key() {
        let bus = Arc::new(ChangeBus::new());
        let result = RefreshPolicyEngine::bind(bus.clone(), "   ", configuration(60, Vec::new()));
        assert!(matches!(result, Err(CacheError::BlankEntryKey)));
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn bind_subscribes_to_bus() {
        let bus = Arc::new(ChangeBus::new());
        let _engine = engine_with_pattern(&bus, 60);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn matching_notification_latches_dirty() {
        let bus = Arc::new(ChangeBus::new());
        let engine = engine_with_pattern(&bus, 60);

        assert!(!engine.on_change_notification("/content/other/page"));
        assert!(!engine.is_dirty());

        assert!(engine.on_change_notification("/content/site/en/page/jcr:content"));
        assert!(engine.is_dirty());

        // sticky: non-matching paths now also report true
        assert!(engine.on_change_notification("/content/other/page"));
        assert!(engine.needs_refresh(0));
    }

    #[test]
    fn needs_refresh_honors_ttl_without_notifications() {
        let bus = Arc::new(ChangeBus::new());
        let engine = engine_with_pattern(&bus, 60);

        assert!(!engine.needs_refresh(0));
        assert!(!engine.needs_refresh(59));
        assert!(engine.needs_refresh(60));
        assert!(engine.needs_refresh(61));
    }

    #[test]
    fn needs_refresh_now_uses_creation_timestamp() {
        let bus = Arc::new(ChangeBus::new());
        let fresh = engine_with_pattern(&bus, 3600);
        assert!(!fresh.needs_refresh_now());

        let expired = RefreshPolicyEngine::bind(
            Arc::clone(&bus),
            "/apps/myapp/components/comp",
            configuration(0, Vec::new()),
        )
        .expect("engine binds");
        assert!(expired.needs_refresh_now());
    }

    #[test]
    fn entry_events_for_other_keys_are_ignored() {
        let bus = Arc::new(ChangeBus::new());
        let engine = engine_with_pattern(&bus, 60);

        engine.handle(&CacheEntryEvent::Removed {
            key: "/apps/other".to_string(),
        });
        assert!(!engine.is_detached());
        assert_eq!(bus.listener_count(), 1);

        engine.handle(&CacheEntryEvent::Removed {
            key: engine.entry_key().to_string(),
        });
        assert!(engine.is_detached());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn whole_cache_flush_always_detaches() {
        let bus = Arc::new(ChangeBus::new());
        let engine = engine_with_pattern(&bus, 60);

        engine.handle(&CacheEntryEvent::Flushed(FlushScope::Whole));
        assert!(engine.is_detached());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn group_flush_detaches_on_key_match_only() {
        let bus = Arc::new(ChangeBus::new());
        let engine = engine_with_pattern(&bus, 60);

        engine.handle(&CacheEntryEvent::Flushed(FlushScope::Group(
            "/apps/other/.*".to_string(),
        )));
        assert!(!engine.is_detached());

        engine.handle(&CacheEntryEvent::Flushed(FlushScope::Group(
            "/apps/myapp/.*".to_string(),
        )));
        assert!(engine.is_detached());
    }

    #[test]
    fn invalid_group_flush_pattern_is_absorbed() {
        let bus = Arc::new(ChangeBus::new());
        let engine = engine_with_pattern(&bus, 60);

        engine.handle(&CacheEntryEvent::Flushed(FlushScope::Group(
            "/apps/[".to_string(),
        )));
        assert!(!engine.is_detached());
    }

    #[test]
    fn repeated_lifecycle_events_detach_once() {
        let bus = Arc::new(ChangeBus::new());
        let engine = engine_with_pattern(&bus, 60);
        let key = engine.entry_key().to_string();

        engine.handle(&CacheEntryEvent::Updated { key: key.clone() });
        engine.handle(&CacheEntryEvent::Flushed(FlushScope::Whole));
        engine.handle(&CacheEntryEvent::Removed { key });
        engine.detach();

        assert!(engine.is_detached());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn racing_detach_runs_side_effect_at_most_once() {
        let bus = Arc::new(ChangeBus::new());
        let engine = engine_with_pattern(&bus, 60);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    engine.handle(&CacheEntryEvent::Flushed(FlushScope::Whole));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(engine.is_detached());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn racing_notifications_only_reach_true() {
        let bus = Arc::new(ChangeBus::new());
        let engine = engine_with_pattern(&bus, 60);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for _ in 0..100 {
                        engine.on_change_notification("/content/site/en/page/jcr:content");
                        assert!(engine.is_dirty());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(engine.is_dirty());
        assert!(engine.needs_refresh(0));
    }
}
