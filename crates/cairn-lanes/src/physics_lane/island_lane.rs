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
use cairn_core::physics::{Arena, BodyHandle, RigidBody};

use super::broadphase_lane::CollisionPair;

/// A set of dynamic bodies connected through candidate pairs, together with the
/// static bodies they may touch.
///
/// Islands never share a dynamic body, so they can be solved in parallel.
/// Static bodies are read-only and may appear in several islands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Island {
    /// Dynamic members, in slot order.
    pub bodies: Vec<BodyHandle>,
    /// Static bodies touched by the members, sorted.
    pub statics: Vec<BodyHandle>,
    /// Candidate pairs inside the island, in broad-phase order.
    pub pairs: Vec<CollisionPair>,
}

impl Island {
    /// Returns `true` if every member is asleep.
    pub fn is_asleep(&self, bodies: &Arena<RigidBody>) -> bool {
        self.bodies
            .iter()
            .all(|h| bodies.get(*h).is_some_and(RigidBody::is_sleeping))
    }
}

/// The Island Lane partitions dynamic bodies into independent islands.
///
/// Bodies are joined when they form a candidate pair; static bodies never join
/// two islands together. The island order is deterministic: islands are sorted
/// by their lowest member slot.
#[derive(Debug, Default)]
pub struct IslandLane {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl IslandLane {
    /// Creates an empty lane.
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&mut self, mut i: u32) -> u32 {
        while self.parent[i as usize] != i {
            let grandparent = self.parent[self.parent[i as usize] as usize];
            self.parent[i as usize] = grandparent;
            i = grandparent;
        }
        i
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra as usize].cmp(&self.rank[rb as usize]) {
            std::cmp::Ordering::Less => self.parent[ra as usize] = rb,
            std::cmp::Ordering::Greater => self.parent[rb as usize] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb as usize] = ra;
                self.rank[ra as usize] += 1;
            }
        }
    }

    /// Builds the islands for this step.
    pub fn build(&mut self, bodies: &Arena<RigidBody>, pairs: &[CollisionPair]) -> Vec<Island> {
        let dynamic: Vec<BodyHandle> = bodies
            .iter()
            .filter(|(_, b)| b.is_dynamic())
            .map(|(h, _)| h)
            .collect();
        let index: AHashMap<BodyHandle, u32> = dynamic
            .iter()
            .enumerate()
            .map(|(i, h)| (*h, i as u32))
            .collect();

        self.parent.clear();
        self.parent.extend(0..dynamic.len() as u32);
        self.rank.clear();
        self.rank.resize(dynamic.len(), 0);

        for pair in pairs {
            if let (Some(&a), Some(&b)) = (index.get(&pair.body_a), index.get(&pair.body_b)) {
                self.union(a, b);
            }
        }

        // Dense island ids, assigned in slot order of the first member.
        let mut island_of_root: AHashMap<u32, usize> = AHashMap::new();
        let mut islands: Vec<Island> = Vec::new();
        for (i, handle) in dynamic.iter().enumerate() {
            let root = self.find(i as u32);
            let id = *island_of_root.entry(root).or_insert_with(|| {
                islands.push(Island::default());
                islands.len() - 1
            });
            islands[id].bodies.push(*handle);
        }

        for pair in pairs {
            let member = index
                .get(&pair.body_a)
                .or_else(|| index.get(&pair.body_b))
                .copied();
            let Some(member) = member else {
                continue;
            };
            let root = self.find(member);
            let Some(&id) = island_of_root.get(&root) else {
                continue;
            };
            let island = &mut islands[id];
            island.pairs.push(*pair);
            for handle in [pair.body_a, pair.body_b] {
                if !index.contains_key(&handle) {
                    island.statics.push(handle);
                }
            }
        }
        for island in &mut islands {
            island.statics.sort_unstable();
            island.statics.dedup();
        }
        islands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::math::{Pose, Vec3};

    fn dynamic(arena: &mut Arena<RigidBody>) -> BodyHandle {
        arena.insert(RigidBody::new_dynamic(Pose::IDENTITY).unwrap())
    }

    #[test]
    fn connected_bodies_share_an_island() {
        let mut arena = Arena::new();
        let a = dynamic(&mut arena);
        let b = dynamic(&mut arena);
        let c = dynamic(&mut arena);
        let d = dynamic(&mut arena);

        let pairs = vec![CollisionPair::new(a, c), CollisionPair::new(c, d)];
        let islands = IslandLane::new().build(&arena, &pairs);

        assert_eq!(islands.len(), 2);
        assert_eq!(islands[0].bodies, vec![a, c, d]);
        assert_eq!(islands[0].pairs.len(), 2);
        assert_eq!(islands[1].bodies, vec![b]);
        assert!(islands[1].pairs.is_empty());
    }

    #[test]
    fn statics_do_not_merge_islands() {
        let mut arena = Arena::new();
        let ground = arena.insert(RigidBody::new_static(Pose::from_position(Vec3::ZERO)).unwrap());
        let a = dynamic(&mut arena);
        let b = dynamic(&mut arena);

        let pairs = vec![CollisionPair::new(ground, a), CollisionPair::new(ground, b)];
        let islands = IslandLane::new().build(&arena, &pairs);

        assert_eq!(islands.len(), 2);
        for island in &islands {
            assert_eq!(island.statics, vec![ground]);
            assert_eq!(island.pairs.len(), 1);
        }
    }

    #[test]
    fn every_dynamic_body_is_in_exactly_one_island() {
        let mut arena = Arena::new();
        let handles: Vec<_> = (0..20).map(|_| dynamic(&mut arena)).collect();
        let pairs: Vec<_> = handles
            .windows(2)
            .step_by(3)
            .map(|w| CollisionPair::new(w[0], w[1]))
            .collect();

        let islands = IslandLane::new().build(&arena, &pairs);
        let mut seen: Vec<BodyHandle> = islands.iter().flat_map(|i| i.bodies.clone()).collect();
        seen.sort();
        assert_eq!(seen, handles);
    }
}
