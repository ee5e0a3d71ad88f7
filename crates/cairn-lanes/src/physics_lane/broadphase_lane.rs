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
use cairn_core::math::{Aabb, Vec3};
use cairn_core::physics::{
    Arena, BodyHandle, DynamicTree, Geometry, ProxyId, RigidBody,
};

/// A pair of bodies whose bounding volumes overlap, ordered by handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    /// The smaller handle of the pair.
    pub body_a: BodyHandle,
    /// The larger handle of the pair.
    pub body_b: BodyHandle,
}

impl CollisionPair {
    /// Creates a pair with its handles in canonical order.
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        if a <= b {
            Self {
                body_a: a,
                body_b: b,
            }
        } else {
            Self {
                body_a: b,
                body_b: a,
            }
        }
    }
}

/// The Broadphase Lane prunes body pairs whose bounding volumes do not overlap.
///
/// Bounded bodies live in a persistent dynamic AABB tree whose fattened leaves
/// absorb small motions between steps. Bodies carrying an unbounded shape
/// (planes) are kept aside and tested against every bounded body through a
/// half-space test.
#[derive(Debug)]
pub struct BroadphaseLane {
    tree: DynamicTree<BodyHandle>,
    proxies: AHashMap<BodyHandle, ProxyId>,
    unbounded: Vec<BodyHandle>,
    margin: f32,
}

impl Default for BroadphaseLane {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl BroadphaseLane {
    /// Creates a lane whose tree leaves are fattened by `margin`.
    pub fn new(margin: f32) -> Self {
        Self {
            tree: DynamicTree::new(margin),
            proxies: AHashMap::new(),
            unbounded: Vec::new(),
            margin,
        }
    }

    /// Number of bodies tracked in the tree.
    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    /// Number of bodies tracked as unbounded.
    pub fn unbounded_count(&self) -> usize {
        self.unbounded.len()
    }

    /// Stops tracking `handle`.
    pub fn remove(&mut self, handle: BodyHandle) {
        if let Some(proxy) = self.proxies.remove(&handle) {
            self.tree.destroy_proxy(proxy);
        }
        self.unbounded.retain(|h| *h != handle);
    }

    /// Synchronises the tree with `bodies` and returns the candidate pairs,
    /// sorted and free of duplicates. Pairs of two static bodies are skipped.
    pub fn sync(&mut self, bodies: &Arena<RigidBody>, dt: f32) -> Vec<CollisionPair> {
        self.forget_removed(bodies);

        let mut bounded: Vec<(BodyHandle, Aabb)> = Vec::with_capacity(bodies.len());
        for (handle, body) in bodies.iter() {
            if body.has_unbounded_shape() {
                self.remove(handle);
                self.unbounded.push(handle);
                continue;
            }
            let Some(aabb) = body.compute_aabb() else {
                self.remove(handle);
                continue;
            };
            bounded.push((handle, aabb));
            let displacement = body.linear_velocity() * dt;
            match self.proxies.get(&handle) {
                Some(&proxy) => {
                    self.tree.move_proxy(proxy, aabb, displacement);
                }
                None => {
                    log::trace!("Broadphase proxy created for body {handle}.");
                    let proxy = self.tree.create_proxy(aabb, handle);
                    self.proxies.insert(handle, proxy);
                }
            }
        }
        self.unbounded.sort_unstable();
        self.unbounded.dedup();

        let is_dynamic = |h: BodyHandle| bodies.get(h).is_some_and(RigidBody::is_dynamic);
        let mut pairs = Vec::new();
        self.tree.query_pairs(|a, b| {
            if is_dynamic(a) || is_dynamic(b) {
                pairs.push(CollisionPair::new(a, b));
            }
        });

        for &plane_handle in &self.unbounded {
            let Some(plane_body) = bodies.get(plane_handle) else {
                continue;
            };
            for &(handle, aabb) in &bounded {
                if !(plane_body.is_dynamic() || is_dynamic(handle)) {
                    continue;
                }
                if Self::touches(plane_body, &aabb.expanded(self.margin)) {
                    pairs.push(CollisionPair::new(plane_handle, handle));
                }
            }
        }

        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    fn forget_removed(&mut self, bodies: &Arena<RigidBody>) {
        let stale: Vec<BodyHandle> = self
            .proxies
            .keys()
            .copied()
            .filter(|h| !bodies.contains(*h))
            .collect();
        for handle in stale {
            log::trace!("Broadphase proxy released for body {handle}.");
            self.remove(handle);
        }
        self.unbounded.retain(|h| bodies.contains(*h));
    }

    /// Returns `true` if any shape of an unbounded body may touch `aabb`.
    fn touches(body: &RigidBody, aabb: &Aabb) -> bool {
        body.shapes().iter().any(|shape| {
            let pose = shape.world_pose(body.pose());
            match shape.geometry() {
                Geometry::Plane => {
                    // The plane occupies x <= 0 of its frame; test the box corner
                    // deepest along the outward normal.
                    let normal = pose.transform_vector(Vec3::X);
                    let reach = aabb.half_extents().dot(normal.abs());
                    normal.dot(aabb.center() - pose.position) - reach <= 0.0
                }
                geometry => geometry
                    .compute_aabb(&pose)
                    .is_some_and(|own| own.intersects_aabb(aabb)),
            }
        })
    }
}
