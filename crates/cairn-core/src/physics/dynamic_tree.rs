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

//! # Dynamic AABB Tree
//!
//! An incrementally balanced binary tree of fattened AABBs used by the broad
//! phase. Leaves hold a small `Copy` payload (a body handle in practice);
//! internal nodes hold the union of their children.

use crate::math::{Aabb, Vec3};

const NULL_NODE: u32 = u32::MAX;

/// Identifier of a leaf in a [`DynamicTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyId(u32);

#[derive(Debug, Clone)]
struct Node<T: Copy> {
    /// Fattened box for leaves, union of children otherwise.
    aabb: Aabb,
    payload: Option<T>,
    /// Parent index, or the next free node while on the free list.
    parent: u32,
    children: [u32; 2],
    /// 0 for leaves.
    height: i32,
}

impl<T: Copy> Node<T> {
    #[inline]
    fn is_leaf(&self) -> bool {
        self.children[0] == NULL_NODE
    }
}

/// A dynamic AABB tree for broad-phase pair finding.
#[derive(Debug, Clone)]
pub struct DynamicTree<T: Copy> {
    root: u32,
    nodes: Vec<Node<T>>,
    free_list: u32,
    leaf_count: usize,
    fat_margin: f32,
    displacement_scale: f32,
}

impl<T: Copy> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl<T: Copy> DynamicTree<T> {
    /// Creates an empty tree whose leaves are fattened by `fat_margin`.
    pub fn new(fat_margin: f32) -> Self {
        Self {
            root: NULL_NODE,
            nodes: Vec::new(),
            free_list: NULL_NODE,
            leaf_count: 0,
            fat_margin,
            displacement_scale: 2.0,
        }
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaf_count
    }

    /// Returns `true` if the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Height of the tree (0 for a single leaf or an empty tree).
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.node(self.root).height
        }
    }

    #[inline]
    fn node(&self, index: u32) -> &Node<T> {
        &self.nodes[index as usize]
    }

    #[inline]
    fn node_mut(&mut self, index: u32) -> &mut Node<T> {
        &mut self.nodes[index as usize]
    }

    /// Inserts a leaf for `aabb`, fattened by the tree margin.
    pub fn create_proxy(&mut self, aabb: Aabb, payload: T) -> ProxyId {
        let leaf = self.allocate_node();
        {
            let node = self.node_mut(leaf);
            node.payload = Some(payload);
            node.height = 0;
        }
        let fat = aabb.expanded(self.fat_margin);
        self.node_mut(leaf).aabb = fat;
        self.insert_leaf(leaf);
        self.leaf_count += 1;
        ProxyId(leaf)
    }

    /// Removes a leaf. Unknown or already removed proxies are ignored.
    pub fn destroy_proxy(&mut self, proxy: ProxyId) {
        if !self.is_live_leaf(proxy) {
            return;
        }
        self.remove_leaf(proxy.0);
        self.deallocate_node(proxy.0);
        self.leaf_count -= 1;
    }

    /// Moves a leaf to `aabb`, predicting motion by `displacement`.
    ///
    /// Returns `false` (and leaves the tree untouched) while the new box still
    /// fits inside the stored fat box.
    pub fn move_proxy(&mut self, proxy: ProxyId, aabb: Aabb, displacement: Vec3) -> bool {
        if !self.is_live_leaf(proxy) {
            return false;
        }
        if self.node(proxy.0).aabb.contains_aabb(&aabb) {
            return false;
        }

        self.remove_leaf(proxy.0);

        let mut fat = aabb.expanded(self.fat_margin);
        let reach = displacement * self.displacement_scale;
        for axis in 0..3 {
            if reach[axis] < 0.0 {
                fat.min[axis] += reach[axis];
            } else {
                fat.max[axis] += reach[axis];
            }
        }

        self.node_mut(proxy.0).aabb = fat;
        self.insert_leaf(proxy.0);
        true
    }

    /// The payload stored in a leaf.
    pub fn payload(&self, proxy: ProxyId) -> Option<T> {
        self.nodes.get(proxy.0 as usize).and_then(|n| n.payload)
    }

    /// The fat box stored in a leaf.
    pub fn fat_aabb(&self, proxy: ProxyId) -> Option<Aabb> {
        self.is_live_leaf(proxy).then(|| self.node(proxy.0).aabb)
    }

    fn is_live_leaf(&self, proxy: ProxyId) -> bool {
        self.nodes
            .get(proxy.0 as usize)
            .is_some_and(|n| n.is_leaf() && n.payload.is_some())
    }

    /// Calls `callback` once for every pair of leaves whose fat boxes overlap.
    pub fn query_pairs<F>(&self, mut callback: F)
    where
        F: FnMut(T, T),
    {
        if self.root == NULL_NODE {
            return;
        }

        // Every overlapping pair shares exactly one lowest common ancestor, so
        // testing the two subtrees of each internal node visits each pair once.
        let mut stack: Vec<u32> = Vec::with_capacity(256);
        stack.push(self.root);
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            if node.is_leaf() {
                continue;
            }
            let [left, right] = node.children;
            self.overlap_subtrees(left, right, &mut callback);
            stack.push(left);
            stack.push(right);
        }
    }

    fn overlap_subtrees<F>(&self, a: u32, b: u32, callback: &mut F)
    where
        F: FnMut(T, T),
    {
        let node_a = self.node(a);
        let node_b = self.node(b);
        if !node_a.aabb.intersects_aabb(&node_b.aabb) {
            return;
        }
        match (node_a.is_leaf(), node_b.is_leaf()) {
            (true, true) => {
                if let (Some(pa), Some(pb)) = (node_a.payload, node_b.payload) {
                    callback(pa, pb);
                }
            }
            (true, false) => {
                self.overlap_subtrees(a, node_b.children[0], callback);
                self.overlap_subtrees(a, node_b.children[1], callback);
            }
            (false, true) => {
                self.overlap_subtrees(node_a.children[0], b, callback);
                self.overlap_subtrees(node_a.children[1], b, callback);
            }
            (false, false) => {
                for &ca in &node_a.children {
                    for &cb in &node_b.children {
                        self.overlap_subtrees(ca, cb, callback);
                    }
                }
            }
        }
    }

    /// Calls `callback` for every leaf overlapping `aabb`; stop early by returning `false`.
    pub fn query<F>(&self, aabb: &Aabb, mut callback: F)
    where
        F: FnMut(T) -> bool,
    {
        if self.root == NULL_NODE {
            return;
        }
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);
        while let Some(index) = stack.pop() {
            let node = self.node(index);
            if !node.aabb.intersects_aabb(aabb) {
                continue;
            }
            if node.is_leaf() {
                if let Some(payload) = node.payload {
                    if !callback(payload) {
                        return;
                    }
                }
            } else {
                stack.extend(node.children);
            }
        }
    }

    // --- Leaf insertion and removal ---

    /// Cost of descending into `child` when inserting `leaf_aabb` (surface area heuristic).
    fn descent_cost(&self, child: u32, leaf_aabb: &Aabb, inheritance: f32) -> f32 {
        let node = self.node(child);
        let grown = node.aabb.merge(leaf_aabb).surface_area();
        if node.is_leaf() {
            grown + inheritance
        } else {
            grown - node.aabb.surface_area() + inheritance
        }
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.node_mut(leaf).parent = NULL_NODE;
            return;
        }

        let leaf_aabb = self.node(leaf).aabb;
        let mut index = self.root;
        while !self.node(index).is_leaf() {
            let node = self.node(index);
            let [child1, child2] = node.children;
            let area = node.aabb.surface_area();
            let combined_area = node.aabb.merge(&leaf_aabb).surface_area();

            let cost = 2.0 * combined_area;
            let inheritance = 2.0 * (combined_area - area);
            let cost1 = self.descent_cost(child1, &leaf_aabb, inheritance);
            let cost2 = self.descent_cost(child2, &leaf_aabb, inheritance);

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { child1 } else { child2 };
        }

        let sibling = index;
        let old_parent = self.node(sibling).parent;
        let new_parent = self.allocate_node();
        let sibling_aabb = self.node(sibling).aabb;
        let sibling_height = self.node(sibling).height;
        {
            let parent = self.node_mut(new_parent);
            parent.parent = old_parent;
            parent.payload = None;
            parent.aabb = leaf_aabb.merge(&sibling_aabb);
            parent.height = sibling_height + 1;
            parent.children = [sibling, leaf];
        }
        self.node_mut(sibling).parent = new_parent;
        self.node_mut(leaf).parent = new_parent;

        if old_parent == NULL_NODE {
            self.root = new_parent;
        } else {
            self.replace_child(old_parent, sibling, new_parent);
        }

        self.refit_ancestors(new_parent);
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.node(leaf).parent;
        let grand_parent = self.node(parent).parent;
        let [c0, c1] = self.node(parent).children;
        let sibling = if c0 == leaf { c1 } else { c0 };

        if grand_parent == NULL_NODE {
            self.root = sibling;
            self.node_mut(sibling).parent = NULL_NODE;
            self.deallocate_node(parent);
            return;
        }

        self.replace_child(grand_parent, parent, sibling);
        self.node_mut(sibling).parent = grand_parent;
        self.deallocate_node(parent);
        self.refit_ancestors(grand_parent);
    }

    fn replace_child(&mut self, parent: u32, old_child: u32, new_child: u32) {
        let node = self.node_mut(parent);
        if node.children[0] == old_child {
            node.children[0] = new_child;
        } else {
            node.children[1] = new_child;
        }
    }

    /// Walks from `index` to the root, rebalancing and refreshing bounds.
    fn refit_ancestors(&mut self, mut index: u32) {
        while index != NULL_NODE {
            index = self.balance(index);
            self.refresh(index);
            index = self.node(index).parent;
        }
    }

    fn refresh(&mut self, index: u32) {
        let [c0, c1] = self.node(index).children;
        let aabb = self.node(c0).aabb.merge(&self.node(c1).aabb);
        let height = 1 + self.node(c0).height.max(self.node(c1).height);
        let node = self.node_mut(index);
        node.aabb = aabb;
        node.height = height;
    }

    // --- Node allocation ---

    fn allocate_node(&mut self) -> u32 {
        if self.free_list != NULL_NODE {
            let index = self.free_list;
            self.free_list = self.node(index).parent;
            let node = self.node_mut(index);
            node.parent = NULL_NODE;
            node.children = [NULL_NODE, NULL_NODE];
            node.height = 0;
            node.payload = None;
            return index;
        }
        let index = self.nodes.len() as u32;
        self.nodes.push(Node {
            aabb: Aabb::INVALID,
            payload: None,
            parent: NULL_NODE,
            children: [NULL_NODE, NULL_NODE],
            height: 0,
        });
        index
    }

    fn deallocate_node(&mut self, index: u32) {
        let free_list = self.free_list;
        let node = self.node_mut(index);
        node.parent = free_list;
        node.payload = None;
        node.children = [NULL_NODE, NULL_NODE];
        node.height = -1;
        self.free_list = index;
    }

    // --- Balancing (tree rotations) ---

    /// Rotates the taller grandchild up if the subtree at `a` is unbalanced.
    /// Returns the index of the subtree's new root.
    fn balance(&mut self, a: u32) -> u32 {
        let node_a = self.node(a);
        if node_a.is_leaf() || node_a.height < 2 {
            return a;
        }
        let [b, c] = node_a.children;
        let skew = self.node(c).height - self.node(b).height;
        if skew > 1 {
            self.rotate_up(a, c, 1)
        } else if skew < -1 {
            self.rotate_up(a, b, 0)
        } else {
            a
        }
    }

    /// Promotes `child` (stored in slot `slot` of `a`) above `a`, handing its
    /// shorter grandchild down to `a`.
    fn rotate_up(&mut self, a: u32, child: u32, slot: usize) -> u32 {
        let [f, g] = self.node(child).children;
        let a_parent = self.node(a).parent;

        self.node_mut(child).children[0] = a;
        self.node_mut(child).parent = a_parent;
        self.node_mut(a).parent = child;

        if a_parent == NULL_NODE {
            self.root = child;
        } else {
            self.replace_child(a_parent, a, child);
        }

        let (keep, give) = if self.node(f).height > self.node(g).height {
            (f, g)
        } else {
            (g, f)
        };
        self.node_mut(child).children[1] = keep;
        self.node_mut(a).children[slot] = give;
        self.node_mut(give).parent = a;

        self.refresh(a);
        self.refresh(child);
        child
    }
}
