//! Arena-backed AVL tree map
//!
//! Nodes live in a dense `Vec` and link to each other by index, so rotations
//! are plain index reassignments. Removal swap-removes the freed slot and
//! patches the links of the node that moved into it.
//!
//! Rebalancing walks from the modified node toward the root, recomputing cached
//! heights and applying a tri-node restructure wherever child heights differ by
//! more than one. When the taller child's own children are tied, the grandchild
//! on the same side as that child is chosen, so the tie resolves to a single
//! rotation. Elsewhere ties go left, which keeps tree shape reproducible.

use std::borrow::Borrow;
use std::cmp::Ordering;

type NodeId = usize;

#[derive(Debug, Clone)]
struct Node<K, V> {
    key: K,
    value: V,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    /// Leaf height is 1, an absent child counts as 0
    height: usize,
}

/// Ordered key → value map with O(log n) get/put/remove and O(log n + m) range scans
#[derive(Debug, Clone)]
pub struct OrderedIndex<K, V> {
    nodes: Vec<Node<K, V>>,
    root: Option<NodeId>,
}

impl<K, V> Default for OrderedIndex<K, V> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
        }
    }
}

impl<K: Ord, V> OrderedIndex<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Height of the whole tree (0 when empty)
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).ok().map(|id| &self.nodes[id].value)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.find(key) {
            Ok(id) => Some(&mut self.nodes[id].value),
            Err(_) => None,
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_ok()
    }

    /// Insert or replace. Returns the previous value when the key existed.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let parent = match self.find(&key) {
            Ok(id) => return Some(std::mem::replace(&mut self.nodes[id].value, value)),
            Err(parent) => parent,
        };

        let id = self.nodes.len();
        let as_left = parent.map(|p| key < self.nodes[p].key);
        // Height 0 so the rebalance walk sees the new leaf as a change
        self.nodes.push(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 0,
        });

        match (parent, as_left) {
            (Some(p), Some(true)) => self.nodes[p].left = Some(id),
            (Some(p), _) => self.nodes[p].right = Some(id),
            (None, _) => self.root = Some(id),
        }

        self.rebalance_from(Some(id));
        None
    }

    /// Remove a key, returning its value. Two-child nodes take their in-order
    /// successor's entry and the successor node is unlinked instead.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut target = self.find(key).ok()?;

        if let (Some(_), Some(right)) = (self.nodes[target].left, self.nodes[target].right) {
            let successor = self.subtree_first(right);
            self.swap_entries(target, successor);
            target = successor;
        }

        let parent = self.nodes[target].parent;
        let child = self.nodes[target].left.or(self.nodes[target].right);
        if let Some(c) = child {
            self.nodes[c].parent = parent;
        }
        self.replace_child(parent, target, child);

        let (removed, parent) = self.release(target, parent);
        self.rebalance_from(parent);
        Some(removed.value)
    }

    /// Ascending iteration over all entries
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            index: self,
            next: self.root.map(|r| self.subtree_first(r)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    /// Entries with `lo <= key < hi`, in key order.
    ///
    /// Descends once to the leftmost qualifying node, then follows successor
    /// links until the upper bound, so only matching entries are visited.
    pub fn range(&self, lo: &K, hi: &K) -> Range<'_, K, V>
    where
        K: Clone,
    {
        let mut walk = self.root;
        let mut start = None;
        while let Some(id) = walk {
            if *lo <= self.nodes[id].key {
                start = Some(id);
                walk = self.nodes[id].left;
            } else {
                walk = self.nodes[id].right;
            }
        }

        Range {
            inner: Iter {
                index: self,
                next: start,
            },
            hi: hi.clone(),
        }
    }

    /// `Ok(node)` when the key is present, otherwise `Err(last node visited)`
    fn find<Q>(&self, key: &Q) -> Result<NodeId, Option<NodeId>>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut walk = self.root;
        let mut parent = None;
        while let Some(id) = walk {
            match key.cmp(self.nodes[id].key.borrow()) {
                Ordering::Equal => return Ok(id),
                Ordering::Less => {
                    parent = Some(id);
                    walk = self.nodes[id].left;
                }
                Ordering::Greater => {
                    parent = Some(id);
                    walk = self.nodes[id].right;
                }
            }
        }
        Err(parent)
    }

    fn subtree_first(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.nodes[id].left {
            id = left;
        }
        id
    }

    fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(right) = self.nodes[id].right {
            return Some(self.subtree_first(right));
        }
        let mut current = id;
        let mut parent = self.nodes[id].parent;
        while let Some(p) = parent {
            if self.nodes[p].right != Some(current) {
                break;
            }
            current = p;
            parent = self.nodes[p].parent;
        }
        parent
    }

    fn height_of(&self, id: Option<NodeId>) -> usize {
        id.map_or(0, |i| self.nodes[i].height)
    }

    fn update_height(&mut self, id: NodeId) {
        let left = self.height_of(self.nodes[id].left);
        let right = self.height_of(self.nodes[id].right);
        self.nodes[id].height = 1 + left.max(right);
    }

    fn is_balanced(&self, id: NodeId) -> bool {
        let left = self.height_of(self.nodes[id].left);
        let right = self.height_of(self.nodes[id].right);
        left.abs_diff(right) <= 1
    }

    /// Ties go to the left child when `prefer_left`, otherwise to the right
    fn taller_child(&self, id: NodeId, prefer_left: bool) -> Option<NodeId> {
        let node = &self.nodes[id];
        match self.height_of(node.left).cmp(&self.height_of(node.right)) {
            Ordering::Greater => node.left,
            Ordering::Less => node.right,
            Ordering::Equal if prefer_left => node.left,
            Ordering::Equal => node.right,
        }
    }

    /// Grandchild of unbalanced `z` to restructure around. A tie under the
    /// taller child picks the outer grandchild, which needs a single rotation.
    fn restructure_target(&self, z: NodeId) -> Option<NodeId> {
        let y = self.taller_child(z, true)?;
        let y_is_left = self.nodes[z].left == Some(y);
        self.taller_child(y, y_is_left)
    }

    fn relink(&mut self, parent: NodeId, child: Option<NodeId>, as_left: bool) {
        if let Some(c) = child {
            self.nodes[c].parent = Some(parent);
        }
        if as_left {
            self.nodes[parent].left = child;
        } else {
            self.nodes[parent].right = child;
        }
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) if self.nodes[p].left == Some(old) => self.nodes[p].left = new,
            Some(p) => self.nodes[p].right = new,
        }
    }

    /// Rotate `x` above its parent
    fn rotate(&mut self, x: NodeId) {
        let Some(y) = self.nodes[x].parent else {
            return;
        };

        match self.nodes[y].parent {
            None => {
                self.root = Some(x);
                self.nodes[x].parent = None;
            }
            Some(z) => {
                let y_was_left = self.nodes[z].left == Some(y);
                self.relink(z, Some(x), y_was_left);
            }
        }

        if self.nodes[y].left == Some(x) {
            let moved = self.nodes[x].right;
            self.relink(y, moved, true);
            self.relink(x, Some(y), false);
        } else {
            let moved = self.nodes[x].left;
            self.relink(y, moved, false);
            self.relink(x, Some(y), true);
        }
    }

    /// Tri-node restructure around grandchild `x`; returns the new subtree root
    fn restructure(&mut self, x: NodeId) -> NodeId {
        let (Some(y), Some(z)) = (
            self.nodes[x].parent,
            self.nodes[x].parent.and_then(|y| self.nodes[y].parent),
        ) else {
            return x;
        };

        let y_is_left = self.nodes[z].left == Some(y);
        let x_is_left = self.nodes[y].left == Some(x);
        if y_is_left == x_is_left {
            self.rotate(y);
            y
        } else {
            self.rotate(x);
            self.rotate(x);
            x
        }
    }

    fn rebalance_from(&mut self, start: Option<NodeId>) {
        let mut walk = start;
        while let Some(mut id) = walk {
            let old_height = self.nodes[id].height;
            self.update_height(id);

            if !self.is_balanced(id) {
                if let Some(x) = self.restructure_target(id) {
                    id = self.restructure(x);
                    if let Some(left) = self.nodes[id].left {
                        self.update_height(left);
                    }
                    if let Some(right) = self.nodes[id].right {
                        self.update_height(right);
                    }
                    self.update_height(id);
                }
            }

            if self.nodes[id].height == old_height {
                break;
            }
            walk = self.nodes[id].parent;
        }
    }

    fn swap_entries(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(hi);
        let (x, y) = (&mut head[lo], &mut tail[0]);
        std::mem::swap(&mut x.key, &mut y.key);
        std::mem::swap(&mut x.value, &mut y.value);
    }

    /// Free an already-unlinked node. The last arena node moves into its slot;
    /// `tracked` is translated if it pointed at the moved node.
    fn release(&mut self, id: NodeId, tracked: Option<NodeId>) -> (Node<K, V>, Option<NodeId>) {
        let last = self.nodes.len() - 1;
        let removed = self.nodes.swap_remove(id);

        if id != last {
            let (parent, left, right) = {
                let moved = &self.nodes[id];
                (moved.parent, moved.left, moved.right)
            };
            match parent {
                None => self.root = Some(id),
                Some(p) if self.nodes[p].left == Some(last) => self.nodes[p].left = Some(id),
                Some(p) => self.nodes[p].right = Some(id),
            }
            for child in [left, right].into_iter().flatten() {
                self.nodes[child].parent = Some(id);
            }
        }

        let tracked = tracked.map(|t| if t == last { id } else { t });
        (removed, tracked)
    }
}

/// In-order iterator over `(key, value)` pairs
pub struct Iter<'a, K, V> {
    index: &'a OrderedIndex<K, V>,
    next: Option<NodeId>,
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.index.successor(id);
        let node = &self.index.nodes[id];
        Some((&node.key, &node.value))
    }
}

/// Bounded in-order iterator produced by [`OrderedIndex::range`]
pub struct Range<'a, K, V> {
    inner: Iter<'a, K, V>,
    hi: K,
}

impl<'a, K: Ord, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.inner.next?;
        if self.inner.index.nodes[id].key >= self.hi {
            self.inner.next = None;
            return None;
        }
        self.inner.next()
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a OrderedIndex<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    /// Verifies links, cached heights, AVL balance and key order; returns height
    fn check_subtree<K: Ord + std::fmt::Debug, V>(
        index: &OrderedIndex<K, V>,
        id: Option<NodeId>,
        parent: Option<NodeId>,
    ) -> usize {
        let Some(id) = id else {
            return 0;
        };
        let node = &index.nodes[id];
        assert_eq!(node.parent, parent, "broken parent link at {:?}", node.key);

        if let Some(l) = node.left {
            assert!(index.nodes[l].key < node.key);
        }
        if let Some(r) = node.right {
            assert!(index.nodes[r].key > node.key);
        }

        let lh = check_subtree(index, node.left, Some(id));
        let rh = check_subtree(index, node.right, Some(id));
        assert!(lh.abs_diff(rh) <= 1, "unbalanced at {:?}: {} vs {}", node.key, lh, rh);
        assert_eq!(node.height, 1 + lh.max(rh), "stale height at {:?}", node.key);
        node.height
    }

    fn check_structure<K: Ord + std::fmt::Debug, V>(index: &OrderedIndex<K, V>) {
        check_subtree(index, index.root, None);
        let keys: Vec<&K> = index.keys().collect();
        assert_eq!(keys.len(), index.len());
        assert!(keys.windows(2).all(|w| w[0] < w[1]), "keys not strictly increasing");
    }

    fn root_key<K: Copy, V>(index: &OrderedIndex<K, V>) -> K {
        index.nodes[index.root.unwrap()].key
    }

    #[test]
    fn test_put_get_replace() {
        let mut index = OrderedIndex::new();
        assert_eq!(index.put(5, "five"), None);
        assert_eq!(index.put(3, "three"), None);
        assert_eq!(index.put(5, "FIVE"), Some("five"));

        assert_eq!(index.get(&5), Some(&"FIVE"));
        assert_eq!(index.get(&3), Some(&"three"));
        assert_eq!(index.get(&4), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_missing_key_is_absent_not_error() {
        let mut index: OrderedIndex<i64, u32> = OrderedIndex::new();
        assert_eq!(index.get(&1), None);
        assert_eq!(index.remove(&1), None);
        assert!(index.is_empty());
        assert_eq!(index.height(), 0);
    }

    #[test]
    fn test_ascending_inserts_stay_balanced() {
        let mut index = OrderedIndex::new();
        for k in 0..1024 {
            index.put(k, k * 2);
        }
        check_structure(&index);
        // A perfectly packed AVL over 1024 keys has height 11
        assert_eq!(index.height(), 11);
    }

    #[test]
    fn test_single_rotation_shape() {
        let mut index = OrderedIndex::new();
        for k in [3, 2, 1] {
            index.put(k, ());
        }
        assert_eq!(root_key(&index), 2);
        check_structure(&index);
    }

    #[test]
    fn test_tied_grandchildren_use_single_rotation() {
        // 2 → (1, 4 → (3, 5)); removing 1 leaves 4's children tied, so the
        // outer grandchild 5 is chosen and 4 rotates up to the root.
        let mut index = OrderedIndex::new();
        for k in [2, 1, 4, 3, 5] {
            index.put(k, ());
        }
        assert_eq!(root_key(&index), 2);

        index.remove(&1);
        assert_eq!(root_key(&index), 4);
        check_structure(&index);
        assert_eq!(index.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_delete_with_tied_grandchildren_stays_balanced() {
        // Builds 7 → (3 → (-, 6), 11 → (9 → (8), 19 → (12))); dropping 3
        // unbalances 7 while 11's children are tied at height 2.
        let mut index = OrderedIndex::new();
        for k in [9, 19, 11, 7, 3, 6, 12, 8] {
            index.put(k, ());
            check_structure(&index);
        }
        assert_eq!(root_key(&index), 7);

        index.remove(&3);
        check_structure(&index);
        assert_eq!(root_key(&index), 11);
        assert_eq!(index.height(), 4);
        assert_eq!(
            index.keys().copied().collect::<Vec<_>>(),
            vec![6, 7, 8, 9, 11, 12, 19]
        );
    }

    #[test]
    fn test_remove_two_child_node_uses_successor() {
        let mut index = OrderedIndex::new();
        for k in [50, 30, 70, 20, 40, 60, 80] {
            index.put(k, k.to_string());
        }
        assert_eq!(index.remove(&50), Some("50".to_string()));
        assert_eq!(root_key(&index), 60);
        assert_eq!(index.get(&50), None);
        check_structure(&index);
    }

    #[test]
    fn test_range_half_open() {
        let mut index = OrderedIndex::new();
        for k in (0..100).step_by(10) {
            index.put(k, k);
        }
        let hits: Vec<i32> = index.range(&15, &50).map(|(_, v)| *v).collect();
        assert_eq!(hits, vec![20, 30, 40]);

        let exact: Vec<i32> = index.range(&20, &21).map(|(k, _)| *k).collect();
        assert_eq!(exact, vec![20]);

        assert_eq!(index.range(&50, &50).count(), 0);
        assert_eq!(index.range(&60, &10).count(), 0);
        assert_eq!(index.range(&1000, &2000).count(), 0);
        assert_eq!(index.range(&-5, &1000).count(), 10);
    }

    #[test]
    fn test_string_keys_borrow_lookup() {
        let mut index: OrderedIndex<String, Vec<usize>> = OrderedIndex::new();
        index.put("ETH".to_string(), vec![1]);
        index.put("BTC".to_string(), vec![0, 2]);

        assert_eq!(index.get("BTC"), Some(&vec![0, 2]));
        index.get_mut("ETH").unwrap().push(3);
        assert_eq!(index.get("ETH"), Some(&vec![1, 3]));
        assert!(index.contains_key("ETH"));
        assert_eq!(index.first_key_value().map(|(k, _)| k.as_str()), Some("BTC"));
    }

    #[test]
    fn test_random_operations_match_btreemap() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut index = OrderedIndex::new();
        let mut model = BTreeMap::new();

        for step in 0..5_000 {
            let key: i64 = rng.gen_range(0..400);
            if rng.gen_bool(0.6) {
                assert_eq!(index.put(key, step), model.insert(key, step));
            } else {
                assert_eq!(index.remove(&key), model.remove(&key));
            }
            check_structure(&index);
        }

        let ours: Vec<(i64, i32)> = index.iter().map(|(k, v)| (*k, *v)).collect();
        let theirs: Vec<(i64, i32)> = model.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(ours, theirs);

        let ranged: Vec<i64> = index.range(&100, &200).map(|(k, _)| *k).collect();
        let expected: Vec<i64> = model.range(100..200).map(|(k, _)| *k).collect();
        assert_eq!(ranged, expected);
    }

    #[test]
    fn test_drain_to_empty() {
        let mut index = OrderedIndex::new();
        for k in 0..64 {
            index.put(k, ());
        }
        for k in (0..64).rev().step_by(2).chain((0..64).step_by(2)) {
            index.remove(&k);
            check_structure(&index);
        }
        assert!(index.is_empty());
        assert_eq!(index.root, None);
    }
}
