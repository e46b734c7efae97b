use lru::LruCache;
use std::hash::{BuildHasher, Hash, Hasher};
use std::num::NonZeroUsize;

/// Triangulated immediate-mode polygons, keyed by a hash of their input contours.
pub(crate) struct Cache {
    tessellation_cache: LruCache<u64, Vec<f32>>,
}

impl Cache {
    pub(crate) fn new(size: NonZeroUsize) -> Self {
        Self {
            tessellation_cache: LruCache::new(size),
        }
    }

    pub fn len(&self) -> usize {
        self.tessellation_cache.len()
    }

    pub(crate) fn get_triangles(&mut self, cache_key: &u64) -> Option<Vec<f32>> {
        self.tessellation_cache.get(cache_key).cloned()
    }

    pub(crate) fn insert_triangles(&mut self, cache_key: u64, triangles: Vec<f32>) {
        self.tessellation_cache.put(cache_key, triangles);
    }

    pub(crate) fn clear(&mut self) {
        self.tessellation_cache.clear();
    }
}

/// Hash of contour payloads; float bits are hashed so `-0.0` and `0.0` are distinct keys.
pub(crate) fn contours_key(contours: &[Vec<f32>], stride: usize) -> u64 {
    let mut hasher =
        ahash::RandomState::with_seeds(0x5eed, 0xface, 0xcafe, 0xbeef).build_hasher();
    stride.hash(&mut hasher);
    for contour in contours {
        contour.len().hash(&mut hasher);
        for value in contour {
            value.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}
