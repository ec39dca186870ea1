//! Read cache for employee and ticket views
//!
//! A TTL cache over point reads, keyed by id. It is never consulted for
//! authorization decisions and every write invalidates the affected keys
//! after the transaction commits.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::CacheConfig;
use crate::models::{EmployeePublic, TicketView};

/// Cache entry with expiration tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Invalidation state of one key, captured before a read-through load
///
/// A value loaded after taking the snapshot is only stored if no
/// invalidation touched the key in between.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generation {
    epoch: u64,
    key: u64,
}

#[derive(Debug)]
struct Slots<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    generations: HashMap<K, u64>,
    epoch: u64,
}

impl<K: Eq + Hash, V> Slots<K, V> {
    fn generation(&self, key: &K) -> Generation {
        Generation {
            epoch: self.epoch,
            key: self.generations.get(key).copied().unwrap_or(0),
        }
    }
}

/// Generic cache storage with TTL support
#[derive(Debug)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    slots: RwLock<Slots<K, V>>,
    max_entries: usize,
    default_ttl: Duration,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            slots: RwLock::new(Slots {
                entries: HashMap::new(),
                generations: HashMap::new(),
                epoch: 0,
            }),
            max_entries,
            default_ttl,
        }
    }

    /// Get a value from cache if it exists and is not expired
    pub async fn get(&self, key: &K) -> Option<V> {
        let slots = self.slots.read().await;
        slots
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.data.clone())
    }

    pub async fn generation(&self, key: &K) -> Generation {
        self.slots.read().await.generation(key)
    }

    pub async fn set(&self, key: K, value: V) {
        let mut slots = self.slots.write().await;
        self.insert(&mut slots, key, value);
    }

    /// Store `value` unless `key` was invalidated since `seen` was taken
    pub async fn set_if_current(&self, key: K, value: V, seen: Generation) -> bool {
        let mut slots = self.slots.write().await;
        if slots.generation(&key) != seen {
            return false;
        }
        self.insert(&mut slots, key, value);
        true
    }

    fn insert(&self, slots: &mut Slots<K, V>, key: K, value: V) {
        if slots.entries.len() >= self.max_entries {
            slots.entries.retain(|_, entry| !entry.is_expired());
        }

        // Still full: drop the oldest entry
        if slots.entries.len() >= self.max_entries {
            let oldest = slots
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                slots.entries.remove(&oldest);
            }
        }

        slots
            .entries
            .insert(key, CacheEntry::new(value, self.default_ttl));
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut slots = self.slots.write().await;
        *slots.generations.entry(key.clone()).or_insert(0) += 1;
        slots.entries.remove(key).map(|e| e.data)
    }

    pub async fn clear(&self) {
        let mut slots = self.slots.write().await;
        slots.entries.clear();
        slots.generations.clear();
        slots.epoch += 1;
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.entries.len()
    }
}

/// Employee and ticket view caches; both are absent when caching is disabled
#[derive(Debug, Default)]
pub struct ViewCache {
    employees: Option<Cache<i64, EmployeePublic>>,
    tickets: Option<Cache<i64, TicketView>>,
}

impl ViewCache {
    pub fn new(config: &CacheConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }

        let ttl = Duration::from_secs(config.ttl_secs);
        Self {
            employees: Some(Cache::new(config.max_entries, ttl)),
            tickets: Some(Cache::new(config.max_entries, ttl)),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.employees.is_some()
    }

    pub async fn employee(&self, id: i64) -> Option<EmployeePublic> {
        let hit = self.employees.as_ref()?.get(&id).await;
        if hit.is_some() {
            debug!("Cache hit: employee {}", id);
        }
        hit
    }

    pub async fn employee_generation(&self, id: i64) -> Generation {
        match &self.employees {
            Some(cache) => cache.generation(&id).await,
            None => Generation::default(),
        }
    }

    pub async fn put_employee(&self, view: &EmployeePublic, seen: Generation) {
        if let Some(cache) = &self.employees {
            if !cache.set_if_current(view.id, view.clone(), seen).await {
                debug!("Skipped caching employee {}: invalidated during load", view.id);
            }
        }
    }

    /// Drop an employee view and every ticket view (they embed assignee names)
    pub async fn invalidate_employee(&self, id: i64) {
        if let Some(cache) = &self.employees {
            cache.remove(&id).await;
        }
        if let Some(cache) = &self.tickets {
            cache.clear().await;
        }
    }

    /// Role changes alter the role list embedded in every employee view
    pub async fn invalidate_all_employees(&self) {
        if let Some(cache) = &self.employees {
            cache.clear().await;
        }
    }

    pub async fn ticket(&self, id: i64) -> Option<TicketView> {
        let hit = self.tickets.as_ref()?.get(&id).await;
        if hit.is_some() {
            debug!("Cache hit: ticket {}", id);
        }
        hit
    }

    pub async fn ticket_generation(&self, id: i64) -> Generation {
        match &self.tickets {
            Some(cache) => cache.generation(&id).await,
            None => Generation::default(),
        }
    }

    pub async fn put_ticket(&self, view: &TicketView, seen: Generation) {
        if let Some(cache) = &self.tickets {
            if !cache.set_if_current(view.id, view.clone(), seen).await {
                debug!("Skipped caching ticket {}: invalidated during load", view.id);
            }
        }
    }

    pub async fn invalidate_ticket(&self, id: i64) {
        if let Some(cache) = &self.tickets {
            cache.remove(&id).await;
        }
    }
}
