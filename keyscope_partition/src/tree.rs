// Copyright 2025 the Keyscope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pooled quadrant tree: node arena, element arena, split/join and queries.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use crate::error::PartitionError;
use crate::types::{ElementKey, NodeId, PartitionConfig, Quad};

#[derive(Clone, Debug)]
enum Contents {
    Leaf(Vec<ElementKey>),
    Internal([NodeId; 4]),
}

#[derive(Clone, Debug)]
struct Node {
    quad: Quad,
    parent: Option<NodeId>,
    depth: u32,
    contents: Contents,
    live: bool,
}

#[derive(Clone, Debug)]
struct Element<P> {
    generation: u32,
    x: f64,
    y: f64,
    payload: P,
    owner: Option<NodeId>,
    /// Placement order; equal-distance picks go to the smaller stamp.
    stamp: u64,
}

/// Query parameters shared by every step of a closest-element descent.
#[derive(Copy, Clone, Debug)]
struct Probe {
    x: f64,
    y: f64,
    radius: f64,
    radius_sq: f64,
    scale_x: f64,
    scale_y: f64,
}

/// Read-only view of a live node, as returned by [`PartitionTree::node`] and
/// [`PartitionTree::visit`].
#[derive(Copy, Clone, Debug)]
pub struct NodeView<'a> {
    /// The node's arena slot.
    pub id: NodeId,
    /// The node's rectangle.
    pub quad: Quad,
    /// Parent node, `None` for the root.
    pub parent: Option<NodeId>,
    /// Distance from the root.
    pub depth: u32,
    /// Leaf bucket or children.
    pub kind: NodeKind<'a>,
}

/// Either state of a node. The two are mutually exclusive.
#[derive(Copy, Clone, Debug)]
pub enum NodeKind<'a> {
    /// Elements held directly, in placement order.
    Leaf(&'a [ElementKey]),
    /// Children covering quadrants 0..4.
    Internal([NodeId; 4]),
}

impl<'a> NodeView<'a> {
    /// Whether this node holds elements directly.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// The leaf bucket; empty for internal nodes.
    pub fn bucket(&self) -> &'a [ElementKey] {
        match self.kind {
            NodeKind::Leaf(bucket) => bucket,
            NodeKind::Internal(_) => &[],
        }
    }

    /// The four children of an internal node.
    pub fn children(&self) -> Option<[NodeId; 4]> {
        match self.kind {
            NodeKind::Leaf(_) => None,
            NodeKind::Internal(children) => Some(children),
        }
    }
}

/// An adaptive quadrant tree indexing points with `Copy` payloads.
///
/// The tree owns two arenas: partition nodes (slot 0 is always the root) and
/// elements. Cross references are slot handles: elements point at the leaf that
/// holds them, nodes point at their parent. Nodes freed by a join or a
/// [`clear`](Self::clear) go to a free-list and are reused by later splits.
///
/// Elements are either *placed* (in exactly one leaf bucket) or *evicted* (in
/// none). Evicted elements keep their key, position and payload, which is what
/// an interactive drag needs: evict, move, [`reinsert`](Self::reinsert).
pub struct PartitionTree<P: Copy + Debug> {
    config: PartitionConfig,
    nodes: Vec<Node>,
    reclaimed: Vec<NodeId>,
    elements: Vec<Option<Element<P>>>,
    generations: Vec<u32>, // last generation per element slot (persists across frees)
    free_elements: Vec<usize>,
    next_stamp: u64,
}

impl<P: Copy + Debug> Debug for PartitionTree<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let alive = self.elements.iter().filter(|e| e.is_some()).count();
        f.debug_struct("PartitionTree")
            .field("bounds", &self.bounds())
            .field("config", &self.config)
            .field("nodes_total", &self.nodes.len())
            .field("nodes_reclaimed", &self.reclaimed.len())
            .field("elements_alive", &alive)
            .field("elements_placed", &self.len())
            .finish_non_exhaustive()
    }
}

impl<P: Copy + Debug> PartitionTree<P> {
    /// Create an empty tree covering `bounds` with the default configuration.
    pub fn new(bounds: Quad) -> Self {
        Self::with_config(bounds, PartitionConfig::default())
    }

    /// Create an empty tree covering `bounds`.
    ///
    /// The root never grows, so size `bounds` generously: inserts outside of it
    /// are rejected with [`PartitionError::OutOfBounds`].
    pub fn with_config(bounds: Quad, config: PartitionConfig) -> Self {
        Self {
            config: config.normalized(),
            nodes: vec![Node {
                quad: bounds,
                parent: None,
                depth: 0,
                contents: Contents::Leaf(Vec::new()),
                live: true,
            }],
            reclaimed: Vec::new(),
            elements: Vec::new(),
            generations: Vec::new(),
            free_elements: Vec::new(),
            next_stamp: 0,
        }
    }

    /// The root rectangle.
    pub fn bounds(&self) -> Quad {
        self.nodes[NodeId::ROOT.idx()].quad
    }

    /// The tree's configuration.
    pub fn config(&self) -> PartitionConfig {
        self.config
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Insert a new element at `(x, y)` and place it in the leaf that owns that
    /// position, splitting full leaves on the way.
    pub fn insert(&mut self, x: f64, y: f64, payload: P) -> Result<ElementKey, PartitionError> {
        self.check_bounds(x, y)?;
        let key = self.alloc_element(x, y, payload);
        self.stamp(key);
        self.place_from(NodeId::ROOT, key, x, y);
        Ok(key)
    }

    /// Take a placed element out of its leaf, keeping it alive in the evicted
    /// state. Ancestors whose subtrees became small enough collapse into leaves.
    pub fn evict(&mut self, key: ElementKey) -> Result<(), PartitionError> {
        self.detach(key)
    }

    /// Place an evicted element back into the tree at its stored position.
    /// Returns the leaf that accepted it.
    pub fn reinsert(&mut self, key: ElementKey) -> Result<NodeId, PartitionError> {
        let e = self.element(key)?;
        if e.owner.is_some() {
            return Err(PartitionError::AlreadyPlaced(key));
        }
        let (x, y) = (e.x, e.y);
        self.check_bounds(x, y)?;
        self.stamp(key);
        Ok(self.place_from(NodeId::ROOT, key, x, y))
    }

    /// Move an element.
    ///
    /// A placed element is detached and placed again at the new position; if the
    /// new position is out of bounds nothing changes and an error is returned.
    /// An evicted element only records the new position, which is validated on
    /// [`reinsert`](Self::reinsert).
    pub fn set_position(&mut self, key: ElementKey, x: f64, y: f64) -> Result<(), PartitionError> {
        let placed = self.element(key)?.owner.is_some();
        if placed {
            self.check_bounds(x, y)?;
            self.detach(key)?;
        }
        let e = self.element_mut(key)?;
        e.x = x;
        e.y = y;
        if placed {
            self.place_from(NodeId::ROOT, key, x, y);
        }
        Ok(())
    }

    /// Remove an element for good, returning its payload. The key becomes stale.
    pub fn remove(&mut self, key: ElementKey) -> Result<P, PartitionError> {
        if self.element(key)?.owner.is_some() {
            self.detach(key)?;
        }
        let payload = self.element(key)?.payload;
        self.elements[key.idx()] = None;
        self.free_elements.push(key.idx());
        Ok(payload)
    }

    /// Find the placed element nearest to the query point whose *scaled* position
    /// lies within `radius` of it.
    ///
    /// Element positions are multiplied by `(scale_x, scale_y)` before measuring,
    /// so a single tree answers queries at any zoom level. The query point and
    /// `radius` are in scaled units. On equal distances the element inserted (or
    /// reinserted) first wins, whichever leaves the candidates sit in.
    pub fn closest(
        &self,
        x: f64,
        y: f64,
        radius: f64,
        scale_x: f64,
        scale_y: f64,
    ) -> Option<(ElementKey, P)> {
        let probe = Probe {
            x,
            y,
            radius,
            radius_sq: radius * radius,
            scale_x,
            scale_y,
        };
        let mut best = None;
        self.closest_in(NodeId::ROOT, &probe, &mut best);
        let (key, ..) = best?;
        Some((key, self.payload(key)?))
    }

    /// Empty the tree: every node below the root goes to the free-list, the root
    /// becomes an empty leaf and every element key becomes stale.
    pub fn clear(&mut self) {
        let contents = core::mem::replace(
            &mut self.nodes[NodeId::ROOT.idx()].contents,
            Contents::Leaf(Vec::new()),
        );
        if let Contents::Internal(children) = contents {
            let mut scratch = Vec::new();
            for child in children {
                self.drain_subtree(child, &mut scratch);
            }
        }
        for (idx, slot) in self.elements.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.free_elements.push(idx);
            }
        }
    }

    /// Number of placed elements (evicted elements are not counted).
    pub fn len(&self) -> usize {
        self.subtree_len(NodeId::ROOT)
    }

    /// Whether no element is placed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the leaf bucket sizes below `node` (0 for a reclaimed node).
    pub fn subtree_len(&self, node: NodeId) -> usize {
        match self.nodes.get(node.idx()) {
            Some(n) if n.live => match &n.contents {
                Contents::Leaf(bucket) => bucket.len(),
                Contents::Internal(children) => {
                    children.iter().map(|&c| self.subtree_len(c)).sum()
                }
            },
            _ => 0,
        }
    }

    /// Whether `key` names a live element (placed or evicted).
    pub fn contains(&self, key: ElementKey) -> bool {
        self.element(key).is_ok()
    }

    /// Whether the element is currently placed in a leaf.
    pub fn is_placed(&self, key: ElementKey) -> bool {
        self.owner(key).is_some()
    }

    /// The leaf holding the element, `None` if evicted or stale.
    pub fn owner(&self, key: ElementKey) -> Option<NodeId> {
        self.element(key).ok()?.owner
    }

    /// The element's stored (unscaled) position.
    pub fn position(&self, key: ElementKey) -> Option<(f64, f64)> {
        self.element(key).ok().map(|e| (e.x, e.y))
    }

    /// The element's payload.
    pub fn payload(&self, key: ElementKey) -> Option<P> {
        self.element(key).ok().map(|e| e.payload)
    }

    /// A read-only view of a live node.
    pub fn node(&self, id: NodeId) -> Option<NodeView<'_>> {
        let n = self.nodes.get(id.idx())?;
        n.live.then(|| Self::view(id, n))
    }

    /// Number of live nodes (root included).
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.reclaimed.len()
    }

    /// Number of nodes waiting in the free-list.
    pub fn reclaimed_nodes(&self) -> usize {
        self.reclaimed.len()
    }

    /// The leaf whose rectangle owns `(x, y)`, following the same quadrant
    /// descent as inserts. `None` outside the root.
    pub fn leaf_at(&self, x: f64, y: f64) -> Option<NodeId> {
        if !self.bounds().contains_point(x, y) {
            return None;
        }
        let mut id = NodeId::ROOT;
        loop {
            let n = &self.nodes[id.idx()];
            match &n.contents {
                Contents::Leaf(_) => return Some(id),
                Contents::Internal(children) => id = children[n.quad.quadrant_of(x, y)],
            }
        }
    }

    /// Visit every live node reachable from the root, parents before children
    /// and children in quadrant order.
    pub fn visit(&self, mut f: impl FnMut(NodeView<'_>)) {
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let n = &self.nodes[id.idx()];
            if let Contents::Internal(children) = &n.contents {
                stack.extend(children.iter().rev().copied());
            }
            f(Self::view(id, n));
        }
    }

    /// Walk the whole tree and verify its structural invariants: children tile
    /// their parent and point back at it, every bucketed element is live and
    /// owned by its leaf, every placed element sits in exactly one bucket, and
    /// every node is either reachable or reclaimed.
    pub fn check_invariants(&self) -> Result<(), PartitionError> {
        let mut reachable = 0_usize;
        let mut bucketed = 0_usize;
        let mut stack = vec![NodeId::ROOT];
        while let Some(id) = stack.pop() {
            let n = self
                .nodes
                .get(id.idx())
                .ok_or(PartitionError::Corrupted("child slot out of range"))?;
            if !n.live {
                return Err(PartitionError::Corrupted("reachable node is reclaimed"));
            }
            reachable += 1;
            match &n.contents {
                Contents::Leaf(bucket) => {
                    for &key in bucket {
                        let e = self.element(key)?;
                        if e.owner != Some(id) {
                            return Err(PartitionError::Corrupted(
                                "bucketed element points at another leaf",
                            ));
                        }
                    }
                    bucketed += bucket.len();
                }
                Contents::Internal(children) => {
                    for (i, &c) in children.iter().enumerate() {
                        let child = self
                            .nodes
                            .get(c.idx())
                            .ok_or(PartitionError::Corrupted("child slot out of range"))?;
                        if child.parent != Some(id) {
                            return Err(PartitionError::Corrupted("child does not point at parent"));
                        }
                        if child.quad != n.quad.child(i) {
                            return Err(PartitionError::Corrupted("children do not tile parent"));
                        }
                        stack.push(c);
                    }
                }
            }
        }
        let placed = self
            .elements
            .iter()
            .flatten()
            .filter(|e| e.owner.is_some())
            .count();
        if placed != bucketed {
            return Err(PartitionError::Corrupted(
                "placed elements and bucket sizes disagree",
            ));
        }
        if reachable + self.reclaimed.len() != self.nodes.len() {
            return Err(PartitionError::Corrupted("node leaked from the free-list"));
        }
        Ok(())
    }

    fn view(id: NodeId, n: &Node) -> NodeView<'_> {
        NodeView {
            id,
            quad: n.quad,
            parent: n.parent,
            depth: n.depth,
            kind: match &n.contents {
                Contents::Leaf(bucket) => NodeKind::Leaf(bucket),
                Contents::Internal(children) => NodeKind::Internal(*children),
            },
        }
    }

    fn check_bounds(&self, x: f64, y: f64) -> Result<(), PartitionError> {
        if self.bounds().contains_point(x, y) {
            Ok(())
        } else {
            tracing::warn!(x, y, "rejected out-of-bounds partition element");
            Err(PartitionError::OutOfBounds { x, y })
        }
    }

    fn element(&self, key: ElementKey) -> Result<&Element<P>, PartitionError> {
        match self.elements.get(key.idx()) {
            Some(Some(e)) if e.generation == key.generation() => Ok(e),
            _ => Err(PartitionError::StaleKey(key)),
        }
    }

    fn element_mut(&mut self, key: ElementKey) -> Result<&mut Element<P>, PartitionError> {
        match self.elements.get_mut(key.idx()) {
            Some(Some(e)) if e.generation == key.generation() => Ok(e),
            _ => Err(PartitionError::StaleKey(key)),
        }
    }

    fn coords(&self, key: ElementKey) -> Option<(f64, f64)> {
        self.element(key).ok().map(|e| (e.x, e.y))
    }

    fn alloc_element(&mut self, x: f64, y: f64, payload: P) -> ElementKey {
        let (idx, generation) = if let Some(idx) = self.free_elements.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            (idx, generation)
        } else {
            self.elements.push(None);
            self.generations.push(1);
            (self.elements.len() - 1, 1)
        };
        self.elements[idx] = Some(Element {
            generation,
            x,
            y,
            payload,
            owner: None,
            stamp: 0,
        });
        ElementKey::new(idx, generation)
    }

    fn stamp(&mut self, key: ElementKey) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        if let Ok(e) = self.element_mut(key) {
            e.stamp = stamp;
        }
    }

    fn alloc_node(&mut self, quad: Quad, parent: NodeId, depth: u32) -> NodeId {
        let node = Node {
            quad,
            parent: Some(parent),
            depth,
            contents: Contents::Leaf(Vec::new()),
            live: true,
        };
        if let Some(id) = self.reclaimed.pop() {
            self.nodes[id.idx()] = node;
            id
        } else {
            self.nodes.push(node);
            NodeId::new(self.nodes.len() - 1)
        }
    }

    fn reclaim(&mut self, id: NodeId) {
        let n = &mut self.nodes[id.idx()];
        n.quad = Quad::ZERO;
        n.parent = None;
        n.depth = 0;
        n.contents = Contents::Leaf(Vec::new());
        n.live = false;
        self.reclaimed.push(id);
    }

    /// Descend from `start` to the leaf owning `(x, y)` and append `key` there.
    fn place_from(&mut self, start: NodeId, key: ElementKey, x: f64, y: f64) -> NodeId {
        let mut id = start;
        loop {
            let n = &self.nodes[id.idx()];
            match &n.contents {
                Contents::Internal(children) => id = children[n.quad.quadrant_of(x, y)],
                Contents::Leaf(bucket) => {
                    if bucket.len() >= self.config.capacity
                        && n.quad.can_halve(self.config.min_half_extent)
                    {
                        self.split(id);
                        continue;
                    }
                    if let Contents::Leaf(bucket) = &mut self.nodes[id.idx()].contents {
                        bucket.push(key);
                    }
                    if let Ok(e) = self.element_mut(key) {
                        e.owner = Some(id);
                    }
                    return id;
                }
            }
        }
    }

    /// Turn a leaf into an internal node and push its bucket down one level.
    fn split(&mut self, id: NodeId) {
        let quad = self.nodes[id.idx()].quad;
        let depth = self.nodes[id.idx()].depth + 1;
        let children: [NodeId; 4] = core::array::from_fn(|i| self.alloc_node(quad.child(i), id, depth));
        let old = core::mem::replace(
            &mut self.nodes[id.idx()].contents,
            Contents::Internal(children),
        );
        tracing::debug!(node = ?id, depth, "split partition");
        if let Contents::Leaf(bucket) = old {
            for key in bucket {
                let Some((x, y)) = self.coords(key) else {
                    continue;
                };
                self.place_from(id, key, x, y);
            }
        }
    }

    /// Take `key` out of its leaf and join upward.
    fn detach(&mut self, key: ElementKey) -> Result<(), PartitionError> {
        let owner = self.element(key)?.owner.ok_or(PartitionError::NotPlaced(key))?;
        let node = self
            .nodes
            .get_mut(owner.idx())
            .ok_or(PartitionError::Corrupted("owner slot out of range"))?;
        let missing = PartitionError::MissingFromBucket { key, node: owner };
        let Contents::Leaf(bucket) = &mut node.contents else {
            return Err(missing);
        };
        let Some(pos) = bucket.iter().position(|&k| k == key) else {
            return Err(missing);
        };
        // Order-preserving: buckets stay in placement order.
        bucket.remove(pos);
        let parent = node.parent;
        self.element_mut(key)?.owner = None;
        if let Some(parent) = parent {
            self.join(parent);
        }
        Ok(())
    }

    /// Collapse `start` and its ancestors while their subtrees hold fewer than
    /// `capacity` elements.
    fn join(&mut self, start: NodeId) {
        let mut current = Some(start);
        while let Some(id) = current {
            if !matches!(self.nodes[id.idx()].contents, Contents::Internal(_))
                || self.subtree_len(id) >= self.config.capacity
            {
                break;
            }
            self.collapse(id);
            current = self.nodes[id.idx()].parent;
        }
    }

    fn collapse(&mut self, id: NodeId) {
        let mut gathered = Vec::new();
        if let Contents::Internal(children) = self.nodes[id.idx()].contents {
            for child in children {
                self.drain_subtree(child, &mut gathered);
            }
        }
        gathered.sort_by_key(|&key| self.element(key).map_or(u64::MAX, |e| e.stamp));
        for &key in &gathered {
            if let Ok(e) = self.element_mut(key) {
                e.owner = Some(id);
            }
        }
        tracing::debug!(node = ?id, elements = gathered.len(), "joined partition");
        self.nodes[id.idx()].contents = Contents::Leaf(gathered);
    }

    /// Move every element below `id` into `out` (quadrant order) and reclaim the
    /// subtree's nodes.
    fn drain_subtree(&mut self, id: NodeId, out: &mut Vec<ElementKey>) {
        let contents = core::mem::replace(
            &mut self.nodes[id.idx()].contents,
            Contents::Leaf(Vec::new()),
        );
        match contents {
            Contents::Leaf(mut bucket) => out.append(&mut bucket),
            Contents::Internal(children) => {
                for child in children {
                    self.drain_subtree(child, out);
                }
            }
        }
        self.reclaim(id);
    }

    fn closest_in(&self, id: NodeId, probe: &Probe, best: &mut Option<(ElementKey, f64, u64)>) {
        let n = &self.nodes[id.idx()];
        if !n
            .quad
            .reaches(probe.x, probe.y, probe.radius, probe.scale_x, probe.scale_y)
        {
            return;
        }
        match &n.contents {
            // No early exit: a closer element may sit across a quadrant boundary.
            Contents::Internal(children) => {
                for &child in children {
                    self.closest_in(child, probe, best);
                }
            }
            Contents::Leaf(bucket) => {
                for &key in bucket {
                    let Ok(e) = self.element(key) else {
                        continue;
                    };
                    let dx = e.x * probe.scale_x - probe.x;
                    let dy = e.y * probe.scale_y - probe.y;
                    let d = dx * dx + dy * dy;
                    if d <= probe.radius_sq
                        && best.is_none_or(|(_, b, s)| d < b || (d == b && e.stamp < s))
                    {
                        *best = Some((key, d, e.stamp));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_5000() -> PartitionTree<u32> {
        PartitionTree::new(Quad::from_origin_size(0.0, 0.0, 5000.0, 5000.0))
    }

    /// Structural fingerprint: (quad, leaf?, bucket) per node in visit order.
    fn shape(t: &PartitionTree<u32>) -> Vec<(Quad, bool, Vec<ElementKey>)> {
        let mut out = Vec::new();
        t.visit(|v| out.push((v.quad, v.is_leaf(), v.bucket().to_vec())));
        out
    }

    fn ancestors(t: &PartitionTree<u32>, mut id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        while let Some(p) = t.node(id).and_then(|v| v.parent) {
            out.push(p);
            id = p;
        }
        out
    }

    #[derive(Clone)]
    struct Rng(u64);

    impl Rng {
        fn next_u64(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }
        fn next_f64(&mut self, max: f64) -> f64 {
            let v = self.next_u64() >> 11;
            (v as f64) / ((1_u64 << 53) as f64) * max
        }
    }

    #[test]
    fn third_insert_splits_root() {
        let mut t = tree_5000();
        let a = t.insert(0.0, 0.0, 1).unwrap();
        let b = t.insert(10.0, 0.0, 2).unwrap();
        assert!(t.node(t.root()).unwrap().is_leaf());
        let _c = t.insert(2000.0, 2000.0, 3).unwrap();

        let root = t.node(t.root()).unwrap();
        assert!(!root.is_leaf());
        assert!(root.bucket().is_empty());
        let first = root.children().unwrap()[0];

        // Both early elements share a leaf under the (0,0) quadrant.
        assert_eq!(t.owner(a), t.owner(b));
        assert!(ancestors(&t, t.owner(a).unwrap()).contains(&first));
        assert_eq!(t.len(), 3);
        t.check_invariants().unwrap();

        // Equidistant: the first inserted wins.
        assert_eq!(t.closest(5.0, 0.0, 20.0, 1.0, 1.0), Some((a, 1)));
    }

    #[test]
    fn removing_down_to_one_collapses_to_leaf() {
        let mut t = tree_5000();
        let a = t.insert(100.0, 100.0, 1).unwrap();
        let b = t.insert(3000.0, 100.0, 2).unwrap();
        let c = t.insert(100.0, 3000.0, 3).unwrap();
        assert!(!t.node(t.root()).unwrap().is_leaf());
        assert_eq!(t.reclaimed_nodes(), 0);

        t.remove(a).unwrap();
        // Two left: inside the hysteresis band, stays split.
        assert!(!t.node(t.root()).unwrap().is_leaf());
        assert_eq!(t.len(), 2);

        t.remove(b).unwrap();
        let root = t.node(t.root()).unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.bucket(), &[c]);
        assert_eq!(t.owner(c), Some(t.root()));
        assert_eq!(t.len(), 1);
        assert_eq!(t.reclaimed_nodes(), 4);
        t.check_invariants().unwrap();
    }

    #[test]
    fn insert_then_remove_restores_shape() {
        let mut t = tree_5000();
        for (i, (x, y)) in [(10.0, 10.0), (3000.0, 10.0), (10.0, 4000.0), (4000.0, 4000.0)]
            .into_iter()
            .enumerate()
        {
            t.insert(x, y, i as u32).unwrap();
        }
        let before = shape(&t);
        let k = t.insert(2600.0, 2600.0, 99).unwrap();
        t.remove(k).unwrap();
        assert_eq!(shape(&t), before);
        t.check_invariants().unwrap();
    }

    #[test]
    fn insert_that_splits_is_not_undone_by_remove() {
        let mut t = tree_5000();
        let a = t.insert(10.0, 10.0, 0).unwrap();
        let b = t.insert(3000.0, 10.0, 1).unwrap();
        assert_eq!(t.node_count(), 1);

        let k = t.insert(10.0, 4000.0, 2).unwrap();
        assert_eq!(t.node_count(), 5);
        t.remove(k).unwrap();
        // Two elements sit inside the hysteresis band: the split stays.
        assert_eq!(t.node_count(), 5);
        assert!(!t.node(t.root()).unwrap().is_leaf());
        assert_eq!(t.len(), 2);
        assert_eq!(t.closest(10.0, 10.0, 1.0, 1.0, 1.0), Some((a, 0)));
        assert_eq!(t.closest(3000.0, 10.0, 1.0, 1.0, 1.0), Some((b, 1)));
        t.check_invariants().unwrap();
    }

    #[test]
    fn counts_track_random_insert_remove() {
        let mut rng = Rng(0x9e37_79b9_7f4a_7c15);
        let mut t = tree_5000();
        let mut live = Vec::new();
        for step in 0..600_u32 {
            if live.is_empty() || rng.next_u64() % 3 != 0 {
                let x = rng.next_f64(5000.0);
                let y = rng.next_f64(5000.0);
                live.push(t.insert(x, y, step).unwrap());
            } else {
                let i = (rng.next_u64() as usize) % live.len();
                let k = live.swap_remove(i);
                t.remove(k).unwrap();
            }
            assert_eq!(t.len(), live.len());
        }
        t.check_invariants().unwrap();
    }

    #[test]
    fn every_element_is_reachable_with_tight_radius() {
        let mut rng = Rng(42);
        let mut t = tree_5000();
        let mut keys = Vec::new();
        for i in 0..200 {
            let x = rng.next_f64(5000.0);
            let y = rng.next_f64(5000.0);
            keys.push((t.insert(x, y, i).unwrap(), x, y));
        }
        for &(k, x, y) in &keys {
            let (hit, _) = t.closest(x, y, 1e-6, 1.0, 1.0).unwrap();
            assert_eq!(hit, k);
        }
    }

    #[test]
    fn closest_respects_radius_and_scale() {
        let mut t = tree_5000();
        let k = t.insert(100.0, 10.0, 7).unwrap();
        assert_eq!(t.closest(100.0, 10.0, 1.0, 1.0, 1.0), Some((k, 7)));
        assert_eq!(t.closest(104.0, 10.0, 3.0, 1.0, 1.0), None);
        // At 2x horizontal zoom the element sits at (200, 10) in query space.
        assert_eq!(t.closest(200.0, 10.0, 1.0, 2.0, 1.0), Some((k, 7)));
        assert_eq!(t.closest(100.0, 10.0, 1.0, 2.0, 1.0), None);
        // Empty neighbourhood.
        assert_eq!(t.closest(4000.0, 4000.0, 50.0, 1.0, 1.0), None);
    }

    #[test]
    fn closest_picks_nearest_across_quadrants() {
        let mut t = tree_5000();
        // Straddle the root's vertical split line at x = 2500.
        let left = t.insert(2490.0, 100.0, 1).unwrap();
        let right = t.insert(2503.0, 100.0, 2).unwrap();
        t.insert(10.0, 10.0, 3).unwrap();
        t.insert(4000.0, 4000.0, 4).unwrap();
        assert!(!t.node(t.root()).unwrap().is_leaf());
        assert_eq!(t.closest(2499.0, 100.0, 20.0, 1.0, 1.0), Some((right, 2)));
        assert_eq!(t.closest(2494.0, 100.0, 20.0, 1.0, 1.0), Some((left, 1)));
    }

    #[test]
    fn equidistant_tie_goes_to_first_inserted_across_leaves() {
        let mut t = tree_5000();
        let right = t.insert(2510.0, 100.0, 0).unwrap();
        let left = t.insert(2490.0, 100.0, 1).unwrap();
        t.insert(4000.0, 4000.0, 2).unwrap();
        // The split put the two candidates in different quadrants.
        assert_ne!(t.owner(right), t.owner(left));
        assert_eq!(t.closest(2500.0, 100.0, 20.0, 1.0, 1.0), Some((right, 0)));

        // A reinsert counts as a fresh insert.
        t.evict(right).unwrap();
        t.reinsert(right).unwrap();
        assert_eq!(t.closest(2500.0, 100.0, 20.0, 1.0, 1.0), Some((left, 1)));
    }

    #[test]
    fn equidistant_tie_survives_a_join() {
        let mut t = PartitionTree::with_config(
            Quad::from_origin_size(0.0, 0.0, 5000.0, 5000.0),
            PartitionConfig {
                capacity: 3,
                min_half_extent: 8.0,
            },
        );
        let right = t.insert(2510.0, 100.0, 0).unwrap();
        let left = t.insert(2490.0, 100.0, 1).unwrap();
        let x = t.insert(4000.0, 4000.0, 2).unwrap();
        let y = t.insert(4000.0, 4100.0, 3).unwrap();
        assert!(!t.node(t.root()).unwrap().is_leaf());

        t.remove(x).unwrap();
        t.remove(y).unwrap();
        let root = t.node(t.root()).unwrap();
        assert!(root.is_leaf());
        // Joined buckets keep placement order, not quadrant order.
        assert_eq!(root.bucket(), &[right, left]);
        assert_eq!(t.closest(2500.0, 100.0, 20.0, 1.0, 1.0), Some((right, 0)));
        t.check_invariants().unwrap();
    }

    #[test]
    fn minimum_size_leaves_overflow_instead_of_splitting() {
        let mut t = tree_5000();
        let keys: Vec<_> = (0..10).map(|i| t.insert(7.0, 7.0, i).unwrap()).collect();
        assert_eq!(t.len(), 10);
        let leaf = t.owner(keys[0]).unwrap();
        let view = t.node(leaf).unwrap();
        assert!(!view.quad.can_halve(t.config().min_half_extent));
        assert_eq!(view.bucket().len(), 10);
        assert!(keys.iter().all(|&k| t.owner(k) == Some(leaf)));
        // Ties inside a bucket resolve to the first inserted.
        assert_eq!(t.closest(7.0, 7.0, 1.0, 1.0, 1.0), Some((keys[0], 0)));
        t.check_invariants().unwrap();
    }

    #[test]
    fn out_of_bounds_insert_is_rejected() {
        let mut t = tree_5000();
        assert_eq!(
            t.insert(6000.0, 10.0, 1),
            Err(PartitionError::OutOfBounds { x: 6000.0, y: 10.0 })
        );
        assert!(matches!(
            t.insert(f64::NAN, 10.0, 1),
            Err(PartitionError::OutOfBounds { .. })
        ));
        assert!(t.is_empty());
        // The max edge belongs to the root.
        assert!(t.insert(5000.0, 5000.0, 2).is_ok());
    }

    #[test]
    fn evict_and_reinsert_protocol() {
        let mut t = tree_5000();
        let k = t.insert(50.0, 50.0, 5).unwrap();
        t.evict(k).unwrap();
        assert!(!t.is_placed(k));
        assert!(t.contains(k));
        assert_eq!(t.closest(50.0, 50.0, 5.0, 1.0, 1.0), None);
        assert_eq!(t.evict(k), Err(PartitionError::NotPlaced(k)));

        t.set_position(k, 900.0, 40.0).unwrap();
        assert!(!t.is_placed(k));
        t.reinsert(k).unwrap();
        assert_eq!(t.closest(900.0, 40.0, 1.0, 1.0, 1.0), Some((k, 5)));
        assert!(matches!(t.reinsert(k), Err(PartitionError::AlreadyPlaced(_))));
        t.check_invariants().unwrap();
    }

    #[test]
    fn set_position_moves_placed_elements() {
        let mut t = tree_5000();
        let a = t.insert(10.0, 10.0, 1).unwrap();
        t.insert(4000.0, 10.0, 2).unwrap();
        t.insert(10.0, 4000.0, 3).unwrap();
        t.set_position(a, 4000.0, 4000.0).unwrap();
        assert!(t.is_placed(a));
        assert_eq!(t.position(a), Some((4000.0, 4000.0)));
        assert_eq!(t.closest(10.0, 10.0, 5.0, 1.0, 1.0), None);
        assert_eq!(t.closest(4000.0, 4000.0, 1.0, 1.0, 1.0), Some((a, 1)));
        // Out of bounds leaves the element where it was.
        assert!(t.set_position(a, -1.0, 0.0).is_err());
        assert_eq!(t.position(a), Some((4000.0, 4000.0)));
        assert!(t.is_placed(a));
        t.check_invariants().unwrap();
    }

    #[test]
    fn stale_keys_are_reported() {
        let mut t = tree_5000();
        let k = t.insert(1.0, 1.0, 1).unwrap();
        assert_eq!(t.remove(k), Ok(1));
        assert_eq!(t.evict(k), Err(PartitionError::StaleKey(k)));
        let reused = t.insert(1.0, 1.0, 2).unwrap();
        assert_ne!(reused, k);
        assert_eq!(t.payload(k), None);
        assert_eq!(t.payload(reused), Some(2));
    }

    #[test]
    fn clear_recycles_nodes() {
        let mut rng = Rng(7);
        let mut t = tree_5000();
        for i in 0..64 {
            t.insert(rng.next_f64(5000.0), rng.next_f64(5000.0), i).unwrap();
        }
        let old = t.insert(1.0, 1.0, 0).unwrap();
        let allocated = t.nodes.len();
        assert!(allocated > 1);
        t.clear();
        assert!(t.is_empty());
        assert!(t.node(t.root()).unwrap().is_leaf());
        assert_eq!(t.reclaimed_nodes(), allocated - 1);
        assert!(!t.contains(old));

        let mut rng = Rng(7);
        for i in 0..64 {
            t.insert(rng.next_f64(5000.0), rng.next_f64(5000.0), i).unwrap();
        }
        // Every node of the rebuilt shape came from the free-list.
        assert_eq!(t.nodes.len(), allocated);
        assert_eq!(t.node_count() + t.reclaimed_nodes(), allocated);
        t.check_invariants().unwrap();
    }

    #[test]
    fn reclaimed_nodes_are_reset() {
        let mut t = tree_5000();
        let keys: Vec<_> = [(10.0, 10.0), (3000.0, 10.0), (10.0, 3000.0)]
            .into_iter()
            .enumerate()
            .map(|(i, (x, y))| t.insert(x, y, i as u32).unwrap())
            .collect();
        t.remove(keys[0]).unwrap();
        t.remove(keys[1]).unwrap();
        for id in t.reclaimed.clone() {
            let n = &t.nodes[id.idx()];
            assert!(!n.live);
            assert_eq!(n.quad, Quad::ZERO);
            assert!(n.parent.is_none());
            assert!(matches!(&n.contents, Contents::Leaf(b) if b.is_empty()));
            assert!(t.node(id).is_none());
        }
    }

    #[test]
    fn corrupted_bucket_is_surfaced() {
        let mut t = tree_5000();
        let k = t.insert(10.0, 10.0, 1).unwrap();
        if let Contents::Leaf(bucket) = &mut t.nodes[0].contents {
            bucket.clear();
        }
        assert_eq!(
            t.evict(k),
            Err(PartitionError::MissingFromBucket {
                key: k,
                node: t.root()
            })
        );
        assert!(t.check_invariants().is_err());
    }

    #[test]
    fn leaf_at_follows_insert_descent() {
        let mut t = tree_5000();
        let a = t.insert(10.0, 10.0, 1).unwrap();
        t.insert(4000.0, 10.0, 2).unwrap();
        t.insert(10.0, 4000.0, 3).unwrap();
        assert_eq!(t.leaf_at(10.0, 10.0), t.owner(a));
        assert_eq!(t.leaf_at(-5.0, 10.0), None);
        let mut leaves = 0;
        t.visit(|v| {
            if v.is_leaf() {
                leaves += 1;
            }
        });
        assert_eq!(leaves, 4);
    }
}
