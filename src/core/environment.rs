use crate::domain::model::{Node, NodeId};
use crate::domain::ports::NodeEnvironment;
use crate::utils::error::Result;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory node store.
///
/// Ids are UUIDv5 under a per-store namespace, so the same input always maps
/// to the same node id. Creating a node with an existing id replaces it.
pub struct MemoryEnvironment {
    namespace: Uuid,
    nodes: Mutex<NodeTable>,
}

#[derive(Default)]
struct NodeTable {
    order: Vec<Node>,
    index: HashMap<NodeId, usize>,
}

impl MemoryEnvironment {
    pub fn new(seed: &str) -> Self {
        Self {
            namespace: Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()),
            nodes: Mutex::new(NodeTable::default()),
        }
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> Vec<Node> {
        self.table().order.clone()
    }

    pub fn get(&self, id: &str) -> Option<Node> {
        let table = self.table();
        table.index.get(id).map(|&pos| table.order[pos].clone())
    }

    pub fn len(&self) -> usize {
        self.table().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self) -> std::sync::MutexGuard<'_, NodeTable> {
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryEnvironment {
    fn default() -> Self {
        Self::new("prismic-nodes")
    }
}

impl NodeEnvironment for MemoryEnvironment {
    fn create_node(&self, node: Node) -> Result<()> {
        let mut table = self.table();
        let id = node.id().to_string();

        match table.index.get(&id).copied() {
            Some(pos) => {
                tracing::debug!("Replacing node {}", id);
                table.order[pos] = node;
            }
            None => {
                let pos = table.order.len();
                table.order.push(node);
                table.index.insert(id, pos);
            }
        }
        Ok(())
    }

    fn create_node_id(&self, input: &str) -> NodeId {
        Uuid::new_v5(&self.namespace, input.as_bytes()).to_string()
    }

    fn create_content_digest(&self, input: &Value) -> String {
        content_digest(input)
    }
}

/// Hex SHA-256 of the value's JSON encoding.
pub fn content_digest(input: &Value) -> String {
    let mut hasher = Sha256::new();
    match input {
        Value::String(s) => hasher.update(s.as_bytes()),
        other => hasher.update(other.to_string().as_bytes()),
    }
    hex::encode(hasher.finalize())
}
