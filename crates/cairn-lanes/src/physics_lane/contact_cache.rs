// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use ahash::AHashMap;
use cairn_core::physics::{BodyHandle, CachedImpulse};

/// Identifies the contact between one shape of each body of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManifoldKey {
    /// First body, in canonical pair order.
    pub body_a: BodyHandle,
    /// Second body, in canonical pair order.
    pub body_b: BodyHandle,
    /// Index of the shape on the first body.
    pub shape_a: u32,
    /// Index of the shape on the second body.
    pub shape_b: u32,
}

/// Accumulated contact impulses carried from one step to the next.
#[derive(Debug, Clone, Default)]
pub struct ContactCache {
    manifolds: AHashMap<ManifoldKey, Vec<CachedImpulse>>,
}

impl ContactCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached manifolds.
    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    /// The impulses cached for `key`; empty if the manifold is new.
    pub fn get(&self, key: &ManifoldKey) -> &[CachedImpulse] {
        self.manifolds.get(key).map_or(&[], Vec::as_slice)
    }

    /// Stores the impulses of one manifold, replacing any previous entry.
    pub fn insert(&mut self, key: ManifoldKey, impulses: Vec<CachedImpulse>) {
        self.manifolds.insert(key, impulses);
    }

    /// Keeps only the manifolds for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&ManifoldKey) -> bool) {
        self.manifolds.retain(|key, _| keep(key));
    }

    /// Drops every manifold involving `handle`.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        self.retain(|key| key.body_a != handle && key.body_b != handle);
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.manifolds.clear();
    }
}

impl Extend<(ManifoldKey, Vec<CachedImpulse>)> for ContactCache {
    fn extend<I: IntoIterator<Item = (ManifoldKey, Vec<CachedImpulse>)>>(&mut self, iter: I) {
        self.manifolds.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::math::Vec3;

    fn handle(index: u32) -> BodyHandle {
        BodyHandle {
            index,
            generation: 0,
        }
    }

    fn key(a: u32, b: u32) -> ManifoldKey {
        ManifoldKey {
            body_a: handle(a),
            body_b: handle(b),
            shape_a: 0,
            shape_b: 0,
        }
    }

    fn impulse(normal_impulse: f32) -> CachedImpulse {
        CachedImpulse {
            local_a: Vec3::ZERO,
            local_b: Vec3::ZERO,
            normal_impulse,
            tangent_impulse: Vec3::ZERO,
        }
    }

    #[test]
    fn missing_manifolds_read_as_empty() {
        let mut cache = ContactCache::new();
        assert!(cache.get(&key(0, 1)).is_empty());
        cache.insert(key(0, 1), vec![impulse(2.0)]);
        assert_eq!(cache.get(&key(0, 1))[0].normal_impulse, 2.0);
        assert!(cache.get(&key(0, 2)).is_empty());
    }

    #[test]
    fn removing_a_body_drops_its_manifolds() {
        let mut cache = ContactCache::new();
        cache.extend([
            (key(0, 1), vec![impulse(1.0)]),
            (key(1, 2), vec![impulse(1.0)]),
            (key(2, 3), vec![impulse(1.0)]),
        ]);
        cache.remove_body(handle(1));
        assert_eq!(cache.len(), 1);
        assert!(!cache.get(&key(2, 3)).is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }
}
