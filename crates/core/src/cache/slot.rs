use chrono::{DateTime, Duration, Utc};
use std::future::Future;

/// A value handed out by [`TtlSlot`], with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Memoized<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
    pub from_cache: bool,
}

#[derive(Debug, Clone)]
struct SlotEntry<K, V> {
    key: K,
    stored_at: DateTime<Utc>,
    value: V,
}

/// Single-entry memoizer. An entry answers lookups for an equal key while
/// `now - stored_at < ttl`; storing a new key replaces it.
#[derive(Debug, Clone)]
pub struct TtlSlot<K, V> {
    ttl: Duration,
    entry: Option<SlotEntry<K, V>>,
}

impl<K: PartialEq, V: Clone> TtlSlot<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<Memoized<V>> {
        let entry = self.entry.as_ref()?;
        if entry.key != *key || now - entry.stored_at >= self.ttl {
            return None;
        }
        Some(Memoized {
            value: entry.value.clone(),
            stored_at: entry.stored_at,
            from_cache: true,
        })
    }

    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.entry = Some(SlotEntry {
            key,
            stored_at: now,
            value,
        });
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    /// Returns the fresh entry for `key`, or awaits `produce` and stores its output.
    pub async fn get_or_insert_with<F, Fut>(
        &mut self,
        key: K,
        now: DateTime<Utc>,
        produce: F,
    ) -> Memoized<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(hit) = self.get(&key, now) {
            return hit;
        }

        let value = produce().await;
        self.insert(key, value.clone(), now);
        Memoized {
            value,
            stored_at: now,
            from_cache: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap()
    }

    #[test]
    fn fresh_until_ttl_elapses() {
        let mut slot = TtlSlot::new(Duration::seconds(300));
        slot.insert("k", 1, t0());

        assert_eq!(slot.get(&"k", t0()).unwrap().value, 1);
        assert!(slot.get(&"k", t0() + Duration::seconds(299)).is_some());
        assert!(slot.get(&"k", t0() + Duration::seconds(300)).is_none());
    }

    #[test]
    fn different_key_misses_and_replaces() {
        let mut slot = TtlSlot::new(Duration::seconds(300));
        slot.insert("a", 1, t0());
        assert!(slot.get(&"b", t0()).is_none());

        slot.insert("b", 2, t0());
        assert!(slot.get(&"a", t0()).is_none());
        assert_eq!(slot.get(&"b", t0()).unwrap().value, 2);
    }

    #[test]
    fn invalidate_drops_entry_regardless_of_age() {
        let mut slot = TtlSlot::new(Duration::seconds(300));
        slot.insert("k", 1, t0());
        slot.invalidate();
        assert!(slot.is_empty());
        assert!(slot.get(&"k", t0()).is_none());
    }

    #[tokio::test]
    async fn produces_once_within_window() {
        let mut slot = TtlSlot::new(Duration::seconds(300));
        let mut calls = 0;

        let first = slot
            .get_or_insert_with("k", t0(), || {
                calls += 1;
                async { 7 }
            })
            .await;
        assert!(!first.from_cache);

        let second = slot
            .get_or_insert_with("k", t0() + Duration::seconds(10), || {
                calls += 1;
                async { 8 }
            })
            .await;
        assert!(second.from_cache);
        assert_eq!(second.value, 7);
        assert_eq!(second.stored_at, t0());

        let third = slot
            .get_or_insert_with("k", t0() + Duration::seconds(301), || {
                calls += 1;
                async { 9 }
            })
            .await;
        assert!(!third.from_cache);
        assert_eq!(third.value, 9);
        assert_eq!(calls, 2);
    }
}
