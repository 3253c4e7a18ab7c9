use crate::constants::*;
use crate::events::*;
use log::*;
use std::any::Any;
use std::collections::HashMap;

struct CacheEntry {
    inserted_at: u32,
    ttl: u32,
    value: Box<dyn Any + Send + Sync>,
}

impl CacheEntry {
    fn has_expired(&self, now: u32) -> bool {
        now < self.inserted_at || now - self.inserted_at > self.ttl
    }
}

/// Process lifetime memoization. Entries carry a time-to-live in ticks; an entry older than its TTL reads
/// as absent. Nothing here is persisted, so a server restart starts empty.
#[derive(Default)]
pub struct ServerCache {
    time: u32,
    entries: HashMap<String, CacheEntry>,
}

impl ServerCache {
    pub fn new() -> ServerCache {
        ServerCache::default()
    }

    pub fn time(&self) -> u32 {
        self.time
    }

    /// Advances the cache clock. Called once at tick start.
    pub fn refresh(&mut self, now: u32) {
        self.time = now;
    }

    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.entries
            .get(key)
            .filter(|entry| !entry.has_expired(self.time))
            .and_then(|entry| entry.value.downcast_ref::<T>())
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.get(key).map(|entry| !entry.has_expired(self.time)).unwrap_or(false)
    }

    pub fn insert<T>(&mut self, key: &str, ttl: u32, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                inserted_at: self.time,
                ttl,
                value: Box::new(value),
            },
        );
    }

    pub fn get_or_insert_with<T, F>(&mut self, key: &str, ttl: u32, f: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get::<T>(key) {
            return value;
        }

        let value = f();

        self.insert(key, ttl, value.clone());

        value
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evict_expired(&mut self) -> usize {
        let now = self.time;
        let before = self.entries.len();

        self.entries.retain(|_, entry| !entry.has_expired(now));

        before - self.entries.len()
    }
}

pub fn register_cache_hooks(bus: &mut EventBus) {
    bus.subscribe(EventKind::TickStart, "cache_refresh", |_, context| {
        context.cache.refresh(context.time);
    });

    bus.subscribe(EventKind::HardReset, "cache_clear", |_, context| {
        context.cache.clear();
    });

    bus.subscribe(EventKind::TickEnd, "cache_evict", |_, context| {
        if context.time % CACHE_EVICT_INTERVAL == 0 {
            let evicted = context.cache.evict_expired();

            if evicted > 0 {
                debug!("Evicted {} expired cache entries", evicted);
            }
        }
    });
}
