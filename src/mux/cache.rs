use memchr::memmem;
use serde_json::Value;

use std::{
    collections::HashMap,
    sync::RwLock,
    time::{
        Duration,
        Instant,
    },
};

struct CacheEntry {
    value: Value,
    expires: u128, // micros since the cache epoch
}

/// Time bounded memo of prior results, keyed by caller supplied strings.
///
/// Purely an optimization, a miss only costs a provider round trip. Expired
/// entries are evicted lazily on lookup, there is no background sweep.
pub struct ResponseCache {
    entries: RwLock<HashMap<[u8; 32], CacheEntry>>,
    epoch: Instant,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            epoch: Instant::now(),
        }
    }

    fn now_micros(&self) -> u128 {
        self.epoch.elapsed().as_micros()
    }

    pub fn lookup(&self, key: &str) -> Option<Value> {
        // If no-cache feature is on, nothing is ever fresh
        #[cfg(feature = "no-cache")]
        return None;

        let key = *blake3::hash(key.as_bytes()).as_bytes();
        let now = self.now_micros();

        {
            let entries = self.entries.read().unwrap();
            match entries.get(&key) {
                Some(entry) if now < entry.expires => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Past expiry, treat as absent and evict on the way out
        self.entries.write().unwrap().remove(&key);
        None
    }

    // A ttl of zero disables caching for the call. Same key overwrites.
    pub fn store(&self, key: &str, value: Value, ttl: Duration) {
        #[cfg(feature = "no-cache")]
        return;

        if ttl.is_zero() {
            return;
        }

        let entry = CacheEntry {
            value,
            expires: self.now_micros() + ttl.as_micros(),
        };

        self.entries
            .write()
            .unwrap()
            .insert(*blake3::hash(key.as_bytes()).as_bytes(), entry);
    }
}

// Results that smell like upstream errors don't get cached, a node having a
// bad moment shouldn't poison the memo for everyone else.
//
// The default rust string contains does not use SIMD extensions,
// memchr::memmem is way faster because it uses them.
pub fn cache_result(rx: &str) -> bool {
    #[cfg(feature = "no-cache")]
    return false;

    let blacklist = ["error", "-32", "null"];

    for item in blacklist.iter() {
        if memmem::find(rx.as_bytes(), item.as_bytes()).is_some() {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_roundtrip() {
        let cache = ResponseCache::new();

        cache.store("bal:infura:0xabc", json!("1.0"), Duration::from_millis(1000));
        assert_eq!(cache.lookup("bal:infura:0xabc").unwrap(), json!("1.0"));

        // Unknown keys are absent
        assert_eq!(cache.lookup("bal:infura:0xdef"), None);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = ResponseCache::new();

        cache.store("k", json!(1), Duration::from_millis(10));
        assert!(cache.lookup("k").is_some());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.lookup("k"), None);
    }

    #[test]
    fn test_zero_ttl_disables_caching() {
        let cache = ResponseCache::new();

        cache.store("k", json!(1), Duration::ZERO);
        assert_eq!(cache.lookup("k"), None);
    }

    #[test]
    fn test_same_key_overwrites() {
        let cache = ResponseCache::new();

        cache.store("k", json!(1), Duration::from_millis(1000));
        cache.store("k", json!(2), Duration::from_millis(1000));
        assert_eq!(cache.lookup("k").unwrap(), json!(2));
    }

    #[test]
    fn test_cache_result_blacklist() {
        assert!(cache_result("{\"wei\":\"1000\",\"balance\":\"0.000000000000001\"}"));
        assert!(!cache_result("{\"error\":\"upstream fell over\"}"));
        assert!(!cache_result("{\"code\":-32601,\"message\":\"method not found\"}"));
        assert!(!cache_result("null"));
    }
}
