//! Ordered id bucket stored under each index key

use serde::{Deserialize, Serialize};

/// Record ids sharing one index key, in insertion order.
///
/// Always a sequence, even for a single id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket(Vec<usize>);

impl Bucket {
    pub fn single(id: usize) -> Self {
        Self(vec![id])
    }

    pub fn push(&mut self, id: usize) {
        self.0.push(id);
    }

    /// Remove `id`, keeping the remaining order. Returns false when absent.
    pub fn remove_id(&mut self, id: usize) -> bool {
        match self.0.iter().position(|&existing| existing == id) {
            Some(pos) => {
                self.0.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: usize) -> bool {
        self.0.contains(&id)
    }

    pub fn ids(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
