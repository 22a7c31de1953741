//! Bidirectional mapping between caller-facing string ids and the dense
//! internal node ids the graph operates on.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub(super) struct HnswMappings {
    id_to_idx: HashMap<String, usize>,
    idx_to_id: HashMap<usize, String>,
    next_idx: usize,
}

impl HnswMappings {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Registers `id`, returning its new internal index, or `None` if
    /// the id is already registered.
    pub(super) fn register(&mut self, id: &str) -> Option<usize> {
        if self.id_to_idx.contains_key(id) {
            return None;
        }
        let idx = self.next_idx;
        self.next_idx += 1;
        self.id_to_idx.insert(id.to_string(), idx);
        self.idx_to_id.insert(idx, id.to_string());
        Some(idx)
    }

    /// Removes `id`, returning its internal index if it was present.
    pub(super) fn remove(&mut self, id: &str) -> Option<usize> {
        if let Some(idx) = self.id_to_idx.remove(id) {
            self.idx_to_id.remove(&idx);
            Some(idx)
        } else {
            None
        }
    }

    pub(super) fn get_idx(&self, id: &str) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    pub(super) fn get_id(&self, idx: usize) -> Option<String> {
        self.idx_to_id.get(&idx).cloned()
    }

    pub(super) fn len(&self) -> usize {
        self.id_to_idx.len()
    }
}
