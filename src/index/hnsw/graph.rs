//! Core hierarchical navigable small-world graph.
//!
//! Distances are tracked in an internal, always-lower-is-closer convention
//! so the graph traversal code stays metric-agnostic even though
//! [`crate::distance::DistanceMetric`] mixes higher-is-better metrics
//! (cosine, dot) with lower-is-better ones (euclidean, manhattan):
//! `internal = if metric.higher_is_better() { -raw } else { raw }`.
//! The conversion back to a public, higher-is-better score happens once,
//! at [`super::HnswIndex::search`].

use super::layer::{Layer, NodeId};
use crate::distance::DistanceMetric;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};

#[derive(Debug, Clone, Copy)]
struct OrderedFloat(f32);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for OrderedFloat {}
impl PartialOrd for OrderedFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for OrderedFloat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Tunable construction/search parameters, mirroring [`crate::config::HnswConfig`].
pub(super) struct GraphParams {
    pub m: usize,
    pub m_max: usize,
    pub m_max_0: usize,
    pub ef_construction: usize,
    pub ml: f64,
    pub seed: u64,
}

/// The graph itself: layered adjacency lists over a flat vector store.
///
/// Deletes are tombstones — a deleted node's slot stays allocated (and is
/// still traversed as a bridge during search) but is excluded from result
/// sets, so concurrent readers never observe a half-unlinked node.
pub(super) struct Graph {
    metric: DistanceMetric,
    params: GraphParams,
    vectors: RwLock<Vec<Vec<f32>>>,
    deleted: RwLock<Vec<bool>>,
    layers: RwLock<Vec<Layer>>,
    entry_point: RwLock<Option<NodeId>>,
    max_layer: AtomicUsize,
    live_count: AtomicUsize,
    rng_state: AtomicU64,
}

impl Graph {
    pub(super) fn new(metric: DistanceMetric, params: GraphParams) -> Self {
        let seed = if params.seed == 0 { 1 } else { params.seed };
        Self {
            metric,
            params,
            vectors: RwLock::new(Vec::new()),
            deleted: RwLock::new(Vec::new()),
            layers: RwLock::new(vec![Layer::new(0)]),
            entry_point: RwLock::new(None),
            max_layer: AtomicUsize::new(0),
            live_count: AtomicUsize::new(0),
            rng_state: AtomicU64::new(seed),
        }
    }

    pub(super) fn live_count(&self) -> usize {
        self.live_count.load(AtomicOrdering::Relaxed)
    }

    fn to_internal(&self, raw: f32) -> f32 {
        if self.metric.higher_is_better() {
            -raw
        } else {
            raw
        }
    }

    fn internal_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        self.to_internal(self.metric.calculate(a, b))
    }

    /// Converts an internal (lower-is-closer) distance back to a raw
    /// metric value and then to the public higher-is-better score.
    pub(super) fn internal_to_score(&self, internal: f32) -> f32 {
        let raw = if self.metric.higher_is_better() {
            -internal
        } else {
            internal
        };
        self.metric.to_score(raw)
    }

    fn get_vector(&self, node_id: NodeId) -> Vec<f32> {
        self.vectors.read()[node_id].clone()
    }

    fn is_deleted(&self, node_id: NodeId) -> bool {
        self.deleted.read().get(node_id).copied().unwrap_or(true)
    }

    /// Inserts `values` as a brand-new node and returns its internal id.
    /// Callers (the mappings layer) are responsible for id uniqueness.
    pub(super) fn insert(&self, values: Vec<f32>) -> NodeId {
        let node_id = {
            let mut vectors = self.vectors.write();
            let id = vectors.len();
            vectors.push(values);
            let mut deleted = self.deleted.write();
            deleted.push(false);
            id
        };

        let node_layer = self.random_layer();
        {
            let mut layers = self.layers.write();
            while layers.len() <= node_layer {
                layers.push(Layer::new(node_id + 1));
            }
            for layer in layers.iter_mut() {
                layer.ensure_capacity(node_id);
            }
        }

        let entry_point = *self.entry_point.read();
        if let Some(ep) = entry_point {
            let mut current_ep = ep;
            let max_layer = self.max_layer.load(AtomicOrdering::Relaxed);
            let query = self.get_vector(node_id);

            for layer_idx in (node_layer + 1..=max_layer).rev() {
                current_ep = self.search_layer_single(&query, current_ep, layer_idx);
            }

            for layer_idx in (0..=node_layer.min(max_layer)).rev() {
                let candidates =
                    self.search_layer(&query, vec![current_ep], self.params.ef_construction, layer_idx);
                let max_conn = if layer_idx == 0 {
                    self.params.m_max_0
                } else {
                    self.params.m_max
                };
                let selected = self.select_neighbors(&candidates, max_conn);
                self.layers.read()[layer_idx].set_neighbors(node_id, selected.clone());
                for &neighbor in &selected {
                    self.add_bidirectional_connection(node_id, neighbor, layer_idx, max_conn);
                }
                if !candidates.is_empty() {
                    current_ep = candidates[0].0;
                }
            }

            if node_layer > max_layer {
                self.max_layer.store(node_layer, AtomicOrdering::Relaxed);
                *self.entry_point.write() = Some(node_id);
            }
        } else {
            *self.entry_point.write() = Some(node_id);
            self.max_layer.store(node_layer, AtomicOrdering::Relaxed);
        }

        self.live_count.fetch_add(1, AtomicOrdering::Relaxed);
        node_id
    }

    /// Tombstones `node_id`. The node's edges are left in place as
    /// traversal bridges; it is simply excluded from future result sets.
    pub(super) fn delete(&self, node_id: NodeId) {
        if let Some(slot) = self.deleted.write().get_mut(node_id) {
            if !*slot {
                *slot = true;
                self.live_count.fetch_sub(1, AtomicOrdering::Relaxed);
            }
        }
    }

    /// Returns up to `k` nearest live nodes by ascending internal distance.
    pub(super) fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<(NodeId, f32)> {
        let Some(ep) = *self.entry_point.read() else {
            return Vec::new();
        };
        if self.live_count() == 0 {
            return Vec::new();
        }

        let max_layer = self.max_layer.load(AtomicOrdering::Relaxed);
        let mut current_ep = ep;
        for layer_idx in (1..=max_layer).rev() {
            current_ep = self.search_layer_single(query, current_ep, layer_idx);
        }

        let ef = ef_search.max(k);
        let candidates = self.search_layer(query, vec![current_ep], ef, 0);
        candidates.into_iter().take(k).collect()
    }

    fn random_layer(&self) -> usize {
        let mut state = self.rng_state.load(AtomicOrdering::Relaxed);
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        self.rng_state.store(state, AtomicOrdering::Relaxed);

        let uniform = (state as f64) / (u64::MAX as f64);
        let uniform = uniform.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON);
        let level = (-uniform.ln() * self.params.ml).floor();
        (level as usize).min(15)
    }

    fn search_layer_single(&self, query: &[f32], entry: NodeId, layer: usize) -> NodeId {
        let mut best = entry;
        let mut best_dist = self.internal_distance(query, &self.get_vector(entry));

        loop {
            let neighbors = self.layers.read()[layer].get_neighbors(best);
            let mut improved = false;
            for neighbor in neighbors {
                let dist = self.internal_distance(query, &self.get_vector(neighbor));
                if dist < best_dist {
                    best = neighbor;
                    best_dist = dist;
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }
        best
    }

    fn search_layer(
        &self,
        query: &[f32],
        entry_points: Vec<NodeId>,
        ef: usize,
        layer: usize,
    ) -> Vec<(NodeId, f32)> {
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        let mut candidates: BinaryHeap<Reverse<(OrderedFloat, NodeId)>> = BinaryHeap::new();
        let mut results: BinaryHeap<(OrderedFloat, NodeId)> = BinaryHeap::new();

        let vectors = self.vectors.read();
        for ep in entry_points {
            let dist = self.internal_distance(query, &vectors[ep]);
            candidates.push(Reverse((OrderedFloat(dist), ep)));
            if !self.is_deleted(ep) {
                results.push((OrderedFloat(dist), ep));
            }
            visited.insert(ep);
        }

        while let Some(Reverse((OrderedFloat(c_dist), c_node))) = candidates.pop() {
            let furthest_dist = results.peek().map_or(f32::MAX, |r| r.0 .0);
            if c_dist > furthest_dist && results.len() >= ef {
                break;
            }

            let neighbors = self.layers.read()[layer].get_neighbors(c_node);
            for neighbor in neighbors {
                if visited.insert(neighbor) {
                    let dist = self.internal_distance(query, &vectors[neighbor]);
                    let furthest = results.peek().map_or(f32::MAX, |r| r.0 .0);

                    if dist < furthest || results.len() < ef {
                        candidates.push(Reverse((OrderedFloat(dist), neighbor)));
                        if !self.is_deleted(neighbor) {
                            results.push((OrderedFloat(dist), neighbor));
                            if results.len() > ef {
                                results.pop();
                            }
                        }
                    }
                }
            }
        }

        let mut result_vec: Vec<(NodeId, f32)> =
            results.into_iter().map(|(d, n)| (n, d.0)).collect();
        result_vec.sort_by(|a, b| a.1.total_cmp(&b.1));
        result_vec
    }

    /// VAMANA-style alpha=1.0 diversified selection (standard HNSW heuristic).
    fn select_neighbors(&self, candidates: &[(NodeId, f32)], max_neighbors: usize) -> Vec<NodeId> {
        if candidates.is_empty() {
            return Vec::new();
        }
        if candidates.len() <= max_neighbors {
            return candidates.iter().map(|(id, _)| *id).collect();
        }

        let mut selected: Vec<NodeId> = Vec::with_capacity(max_neighbors);
        let mut selected_vecs: Vec<Vec<f32>> = Vec::with_capacity(max_neighbors);

        for &(candidate_id, candidate_dist) in candidates {
            if selected.len() >= max_neighbors {
                break;
            }
            let candidate_vec = self.get_vector(candidate_id);
            let is_diverse = selected_vecs
                .iter()
                .all(|s| self.internal_distance(&candidate_vec, s) >= candidate_dist);
            if is_diverse || selected.is_empty() {
                selected.push(candidate_id);
                selected_vecs.push(candidate_vec);
            }
        }

        if selected.len() < max_neighbors {
            for &(candidate_id, _) in candidates {
                if selected.len() >= max_neighbors {
                    break;
                }
                if !selected.contains(&candidate_id) {
                    selected.push(candidate_id);
                }
            }
        }
        selected
    }

    /// Lock order: `vectors` -> `layers` -> per-node neighbor lock, matching
    /// [`Self::search_layer`]; never hold `layers` while reading `vectors`.
    fn add_bidirectional_connection(
        &self,
        new_node: NodeId,
        neighbor: NodeId,
        layer: usize,
        max_conn: usize,
    ) {
        let neighbor_vec = self.get_vector(neighbor);
        let current_neighbors = self.layers.read()[layer].get_neighbors(neighbor);

        if current_neighbors.len() < max_conn {
            let mut neighbors = current_neighbors;
            neighbors.push(new_node);
            self.layers.read()[layer].set_neighbors(neighbor, neighbors);
        } else {
            let mut all_neighbors = current_neighbors;
            all_neighbors.push(new_node);
            let neighbor_vecs: Vec<(NodeId, Vec<f32>)> = all_neighbors
                .iter()
                .map(|&n| (n, self.get_vector(n)))
                .collect();

            let mut with_dist: Vec<(NodeId, f32)> = neighbor_vecs
                .iter()
                .map(|(n, v)| (*n, self.internal_distance(&neighbor_vec, v)))
                .collect();
            with_dist.sort_by(|a, b| a.1.total_cmp(&b.1));
            let pruned: Vec<NodeId> = with_dist.into_iter().take(max_conn).map(|(n, _)| n).collect();

            self.layers.read()[layer].set_neighbors(neighbor, pruned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> GraphParams {
        GraphParams {
            m: 8,
            m_max: 8,
            m_max_0: 16,
            ef_construction: 32,
            ml: 1.0 / (8f64).ln(),
            seed: 42,
        }
    }

    #[test]
    fn finds_nearest_among_basis_vectors() {
        let graph = Graph::new(DistanceMetric::Cosine, params());
        let a = graph.insert(vec![1.0, 0.0, 0.0, 0.0]);
        let _b = graph.insert(vec![0.0, 1.0, 0.0, 0.0]);
        let _c = graph.insert(vec![0.0, 0.0, 1.0, 0.0]);

        let results = graph.search(&[0.9, 0.1, 0.0, 0.0], 1, 32);
        assert_eq!(results[0].0, a);
    }

    #[test]
    fn tombstoned_node_excluded_from_results_but_graph_stays_connected() {
        let graph = Graph::new(DistanceMetric::Euclidean, params());
        let a = graph.insert(vec![0.0, 0.0]);
        let b = graph.insert(vec![1.0, 0.0]);
        let c = graph.insert(vec![2.0, 0.0]);

        graph.delete(b);
        assert_eq!(graph.live_count(), 2);

        let results = graph.search(&[0.0, 0.0], 2, 32);
        let ids: Vec<NodeId> = results.iter().map(|(id, _)| *id).collect();
        assert!(ids.contains(&a));
        assert!(ids.contains(&c));
        assert!(!ids.contains(&b));
    }

    #[test]
    fn empty_graph_search_returns_nothing() {
        let graph = Graph::new(DistanceMetric::Cosine, params());
        assert!(graph.search(&[1.0, 0.0], 5, 32).is_empty());
    }
}
