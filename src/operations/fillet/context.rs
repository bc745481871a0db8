//! Bounded caches shared across the stations of one or more fillet requests.
//!
//! The context is owned by the caller and passed into the solver explicitly.
//! It is not shared between threads; batch callers give each worker its own.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::math::Point3;
use crate::mesh::MeshSource;

use super::sampler::{FaceSample, FaceSampler};

/// Capacity limits of a [`FilletContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Face samplers kept, keyed by solid identity and face name.
    ///
    /// Default: `16`
    pub max_faces: usize,
    /// Projected points kept, keyed by face and quantized position.
    ///
    /// Default: `4096`
    pub max_points: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            max_faces: 16,
            max_points: 4096,
        }
    }
}

impl CachePolicy {
    /// A policy that caches nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_faces: 0,
            max_points: 0,
        }
    }

    #[must_use]
    pub fn with_max_faces(mut self, faces: usize) -> Self {
        self.max_faces = faces;
        self
    }

    #[must_use]
    pub fn with_max_points(mut self, points: usize) -> Self {
        self.max_points = points;
        self
    }
}

/// Least-recently-used map with a fixed capacity. A capacity of zero
/// stores nothing.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    capacity: usize,
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            tick: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up `key`, marking it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.tick += 1;
        let tick = self.tick;
        let Some(entry) = self.entries.get_mut(key) else {
            self.misses += 1;
            return None;
        };
        self.hits += 1;
        self.order.remove(&entry.1);
        self.order.insert(tick, key.clone());
        entry.1 = tick;
        Some(&entry.0)
    }

    /// Inserts `value`, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: K, value: V) {
        if self.capacity == 0 {
            return;
        }
        self.tick += 1;
        if let Some((_, stamp)) = self.entries.remove(&key) {
            self.order.remove(&stamp);
        } else if self.entries.len() >= self.capacity {
            if let Some((_, oldest)) = self.order.pop_first() {
                self.entries.remove(&oldest);
            }
        }
        self.order.insert(self.tick, key.clone());
        self.entries.insert(key, (value, self.tick));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// `(hits, misses)` since creation.
    #[must_use]
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

/// Cache counters of a [`FilletContext`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub sampler_hits: u64,
    pub sampler_misses: u64,
    pub point_hits: u64,
    pub point_misses: u64,
}

type PointKey = (String, [i64; 3]);

/// Explicit cache context for fillet construction.
#[derive(Debug, Clone)]
pub struct FilletContext {
    policy: CachePolicy,
    samplers: LruCache<String, Arc<FaceSampler>>,
    points: LruCache<PointKey, FaceSample>,
}

impl Default for FilletContext {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl FilletContext {
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            samplers: LruCache::new(policy.max_faces),
            points: LruCache::new(policy.max_points),
        }
    }

    #[must_use]
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Sampler for `face` of `source`, built on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingFace`](crate::error::ValidationError::MissingFace)
    /// if the face has no usable triangles.
    pub fn sampler(&mut self, source: &dyn MeshSource, face: &str) -> Result<Arc<FaceSampler>> {
        let key = face_key(source, face);
        if let Some(sampler) = self.samplers.get(&key) {
            return Ok(Arc::clone(sampler));
        }
        trace!(%key, "building face sampler");
        let sampler = Arc::new(FaceSampler::new(face, &source.face_triangles(face))?);
        self.samplers.insert(key, Arc::clone(&sampler));
        Ok(sampler)
    }

    /// Projects `p` onto the sampler's face, reusing earlier projections of
    /// points in the same `quantum`-sized cell.
    pub fn project(&mut self, source: &dyn MeshSource, sampler: &FaceSampler, p: &Point3, quantum: f64) -> FaceSample {
        let key = (face_key(source, sampler.name()), quantize(p, quantum));
        if let Some(hit) = self.points.get(&key) {
            return *hit;
        }
        let sample = sampler.closest(p, quantum);
        self.points.insert(key, sample);
        sample
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let (sampler_hits, sampler_misses) = self.samplers.stats();
        let (point_hits, point_misses) = self.points.stats();
        CacheStats {
            sampler_hits,
            sampler_misses,
            point_hits,
            point_misses,
        }
    }

    pub fn clear(&mut self) {
        self.samplers.clear();
        self.points.clear();
    }
}

fn face_key(source: &dyn MeshSource, face: &str) -> String {
    format!("{}/{face}", source.identity())
}

#[allow(clippy::cast_possible_truncation)]
fn quantize(p: &Point3, quantum: f64) -> [i64; 3] {
    let q = quantum.max(1e-12);
    [
        (p.x / q).round() as i64,
        (p.y / q).round() as i64,
        (p.z / q).round() as i64,
    ]
}
