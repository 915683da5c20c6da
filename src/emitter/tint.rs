//! Bounded cache for tinted emitter sprites.
//!
//! Tinting a sprite is a two-pass composite (multiply the tint over the
//! sprite, then mask by the sprite's own alpha), which is wasteful to
//! redo every frame. The cache is an explicit service constructed once
//! per editor session and passed by reference; there is no global
//! state. Values are opaque handles produced by the painter.

use std::collections::HashMap;

use crate::model::layer::CellColor;

/// Cache key: source sprite, tint quantized to 5 bits per channel, and
/// the rendered size in whole pixels.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TintKey {
    pub source_id: String,
    pub tint: (u8, u8, u8),
    pub size: (u32, u32),
}

impl TintKey {
    pub fn new(source_id: impl Into<String>, tint: CellColor, size: (u32, u32)) -> Self {
        Self {
            source_id: source_id.into(),
            tint: quantize_tint(tint),
            size,
        }
    }
}

/// Quantize a unit-range tint to 5 bits per channel so near-identical
/// tints share one cache entry.
pub fn quantize_tint(tint: CellColor) -> (u8, u8, u8) {
    let q = |v: f64| (v.clamp(0.0, 1.0) * 31.0).round() as u8;
    (q(tint.r), q(tint.g), q(tint.b))
}

#[derive(Clone, Copy, Debug)]
pub struct TintCacheOpts {
    pub capacity: usize,
}

impl Default for TintCacheOpts {
    fn default() -> Self {
        Self { capacity: 128 }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TintCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Entry<T> {
    value: T,
    last_used: u64,
}

/// Least-recently-used cache over tinted-sprite handles.
pub struct TintCache<T> {
    opts: TintCacheOpts,
    stats: TintCacheStats,
    tick: u64,
    entries: HashMap<TintKey, Entry<T>>,
}

impl<T> TintCache<T> {
    pub fn new(opts: TintCacheOpts) -> Self {
        Self {
            opts,
            stats: TintCacheStats::default(),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    pub fn stats(&self) -> TintCacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch the handle for `key`, producing it with `make` on a miss.
    /// When the cache is full the least-recently-used entry is evicted
    /// first.
    pub fn get_or_insert_with(&mut self, key: TintKey, make: impl FnOnce() -> T) -> &T {
        self.tick += 1;
        let tick = self.tick;

        if self.entries.contains_key(&key) {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            if self.opts.capacity > 0 && self.entries.len() >= self.opts.capacity {
                self.evict_lru();
            }
        }

        let entry = self.entries.entry(key).or_insert_with(|| Entry {
            value: make(),
            last_used: tick,
        });
        entry.last_used = tick;
        &entry.value
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| k.clone());
        if let Some(k) = victim {
            self.entries.remove(&k);
            self.stats.evictions += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str, r: f64) -> TintKey {
        TintKey::new(id, CellColor::new(r, 0.0, 0.0), (16, 16))
    }

    #[test]
    fn hit_reuses_the_cached_handle() {
        let mut cache: TintCache<u32> = TintCache::new(TintCacheOpts::default());
        assert_eq!(*cache.get_or_insert_with(key("spark", 1.0), || 7), 7);
        assert_eq!(*cache.get_or_insert_with(key("spark", 1.0), || 99), 7);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn quantization_folds_near_identical_tints() {
        let mut cache: TintCache<u32> = TintCache::new(TintCacheOpts::default());
        cache.get_or_insert_with(key("spark", 0.500), || 1);
        cache.get_or_insert_with(key("spark", 0.501), || 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn eviction_removes_least_recently_used() {
        let mut cache: TintCache<u32> = TintCache::new(TintCacheOpts { capacity: 2 });
        cache.get_or_insert_with(key("a", 1.0), || 1);
        cache.get_or_insert_with(key("b", 1.0), || 2);
        // Touch "a" so "b" becomes the LRU entry.
        cache.get_or_insert_with(key("a", 1.0), || 1);
        cache.get_or_insert_with(key("c", 1.0), || 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);
        // "a" survived, "b" was evicted.
        cache.get_or_insert_with(key("a", 1.0), || 10);
        assert_eq!(cache.stats().hits, 2);
        cache.get_or_insert_with(key("b", 1.0), || 20);
        assert_eq!(cache.stats().misses, 4);
    }
}
