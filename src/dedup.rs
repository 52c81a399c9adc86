// src/dedup.rs
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Ids of coins we have already alerted on.
///
/// Entries are never evicted, so the set grows for as long as the process
/// runs. The listing only ever yields a bounded number of fresh ids per scan,
/// which keeps this small in practice.
#[derive(Debug, Default)]
pub struct SeenProjects {
    ids: RwLock<HashSet<String>>,
}

impl SeenProjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.ids.read().await.contains(id)
    }

    /// Returns `true` if the id was not seen before.
    pub async fn insert(&self, id: &str) -> bool {
        self.ids.write().await.insert(id.to_string())
    }

    pub async fn len(&self) -> usize {
        self.ids.read().await.len()
    }
}
