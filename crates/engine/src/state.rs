//! `StateManager` — the mutable state shared by every node in a single
//! execution: variables, the accumulator, the counter, a TTL-indexed
//! cache with a soft size cap, and context constants/variables.
//!
//! Locking follows the teacher's pattern: `parking_lot::RwLock`, never
//! held across an `.await` point — every method here does its work and
//! drops the guard before returning.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;

use nodes::NodeError;

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(t) if t <= now)
    }
}

pub struct StateManager {
    variables: RwLock<HashMap<String, Value>>,
    accumulator: RwLock<Value>,
    counter: RwLock<f64>,
    cache: RwLock<HashMap<String, CacheEntry>>,
    cache_cap: usize,
    context_constants: RwLock<HashMap<String, Value>>,
    context_variables: RwLock<HashMap<String, Value>>,
}

impl StateManager {
    pub fn new(cache_cap: usize) -> Self {
        StateManager {
            variables: RwLock::new(HashMap::new()),
            accumulator: RwLock::new(Value::Null),
            counter: RwLock::new(0.0),
            cache: RwLock::new(HashMap::new()),
            cache_cap,
            context_constants: RwLock::new(HashMap::new()),
            context_variables: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.variables.read().get(name).cloned()
    }

    pub fn set_variable(&self, name: &str, value: Value) {
        self.variables.write().insert(name.to_owned(), value);
    }

    pub fn variable_count(&self) -> usize {
        self.variables.read().len()
    }

    pub fn get_accumulator(&self) -> Value {
        self.accumulator.read().clone()
    }

    pub fn set_accumulator(&self, value: Value) {
        *self.accumulator.write() = value;
    }

    pub fn get_counter(&self) -> f64 {
        *self.counter.read()
    }

    pub fn set_counter(&self, value: f64) {
        *self.counter.write() = value;
    }

    pub fn cache_get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let cache = self.cache.read();
        match cache.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            _ => None,
        }
    }

    pub fn cache_set(&self, key: &str, value: Value, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut cache = self.cache.write();

        cache.retain(|_, entry| !entry.is_expired(now));

        if cache.len() >= self.cache_cap && !cache.contains_key(key) {
            if let Some(oldest_key) = cache.iter().min_by_key(|(_, e)| e.inserted_at).map(|(k, _)| k.clone()) {
                cache.remove(&oldest_key);
            }
        }

        cache.insert(
            key.to_owned(),
            CacheEntry { value, expires_at: ttl.map(|d| now + d), inserted_at: now },
        );
    }

    pub fn cache_delete(&self, key: &str) {
        self.cache.write().remove(key);
    }

    pub fn context_constant_get(&self, name: &str) -> Option<Value> {
        self.context_constants.read().get(name).cloned()
    }

    pub fn context_constant_set(&self, name: &str, value: Value) -> Result<(), NodeError> {
        let mut constants = self.context_constants.write();
        if constants.contains_key(name) {
            return Err(NodeError::BadConfig(format!("context constant '{name}' is already set")));
        }
        constants.insert(name.to_owned(), value);
        Ok(())
    }

    pub fn context_variable_get(&self, name: &str) -> Option<Value> {
        self.context_variables.read().get(name).cloned()
    }

    pub fn context_variable_set(&self, name: &str, value: Value) {
        self.context_variables.write().insert(name.to_owned(), value);
    }
}
