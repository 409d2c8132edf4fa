//! Graph store contract and in-memory reference implementation.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    future::Future,
};

use parking_lot::RwLock;

use super::{Filter, matches_filter};
use crate::{
    error::{Result, StoreError},
    scalar::Properties,
};

/// A labelled node with free-form properties.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// Opaque unique identifier.
    pub id: String,
    /// Labels attached to the node (e.g. `"Memory"`, a category name).
    pub labels: Vec<String>,
    /// Free-form properties.
    pub properties: Properties,
}

/// A typed, directed edge between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRelationship {
    /// Opaque unique identifier.
    pub id: String,
    /// Id of the source node.
    pub source_id: String,
    /// Id of the target node.
    pub target_id: String,
    /// Relationship type, e.g. `RELATED_TO`, `SUPERSEDES`, `DERIVED_FROM`.
    pub rel_type: String,
    /// Free-form properties.
    pub properties: Properties,
}

/// Stores labelled nodes and typed directed relationships between them.
///
/// # Implementation requirements
///
/// - [`delete_node`](GraphStore::delete_node) cascades: every relationship
///   incident to the node (as either source or target) is removed too.
/// - [`find_connected`](GraphStore::find_connected) performs a bounded
///   breadth-first traversal up to `max_depth` hops, treats relationships as
///   directed, uses a visited-set to tolerate cycles, and visits
///   deterministically — in relationship creation order.
pub trait GraphStore: Send + Sync {
    /// Creates a new node with the given labels and properties, returning
    /// its generated id.
    fn create_node(
        &self,
        labels: Vec<String>,
        properties: Properties,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Creates a directed relationship from `source_id` to `target_id`.
    fn create_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        rel_type: &str,
        properties: Properties,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Fetches a node by id.
    fn get_node(&self, id: &str) -> impl Future<Output = Result<Option<GraphNode>>> + Send;

    /// Finds nodes carrying `label`, additionally matching `prop_filter`
    /// (an equality conjunction; an empty filter matches any node with the
    /// label).
    fn find_nodes_by_label(
        &self,
        label: &str,
        prop_filter: &Filter,
    ) -> impl Future<Output = Result<Vec<GraphNode>>> + Send;

    /// Finds nodes reachable from `node_id` within `max_depth` directed
    /// hops, optionally restricted to relationships of type `rel_type`
    /// (`None` means any type). Does not include `node_id` itself.
    fn find_connected(
        &self,
        node_id: &str,
        rel_type: Option<&str>,
        max_depth: usize,
    ) -> impl Future<Output = Result<Vec<GraphNode>>> + Send;

    /// Replaces a node's properties.
    fn update_node(
        &self,
        id: &str,
        properties: Properties,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Deletes a node, cascading to every incident relationship. Idempotent.
    fn delete_node(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Deletes a single relationship by id. Idempotent.
    fn delete_relationship(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Releases any resources held by the store. Idempotent.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

#[derive(Default)]
struct State {
    nodes: HashMap<String, GraphNode>,
    relationships: HashMap<String, GraphRelationship>,
    /// Outgoing relationship ids per source node, in creation order.
    outgoing: HashMap<String, Vec<String>>,
    next_node_id: u64,
    next_rel_id: u64,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("nodes", &self.nodes.len())
            .field("relationships", &self.relationships.len())
            .finish()
    }
}

/// A simple in-memory [`GraphStore`] guarded by a single `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: RwLock<State>,
}

impl InMemoryGraphStore {
    /// Creates an empty graph store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for InMemoryGraphStore {
    async fn create_node(&self, labels: Vec<String>, properties: Properties) -> Result<String> {
        let mut state = self.state.write();
        state.next_node_id += 1;
        let id = format!("node-{}", state.next_node_id);
        state.nodes.insert(
            id.clone(),
            GraphNode {
                id: id.clone(),
                labels,
                properties,
            },
        );
        Ok(id)
    }

    async fn create_relationship(
        &self,
        source_id: &str,
        target_id: &str,
        rel_type: &str,
        properties: Properties,
    ) -> Result<String> {
        let mut state = self.state.write();
        if !state.nodes.contains_key(source_id) {
            return Err(StoreError::NotFound(source_id.to_string()));
        }
        if !state.nodes.contains_key(target_id) {
            return Err(StoreError::NotFound(target_id.to_string()));
        }

        state.next_rel_id += 1;
        let id = format!("rel-{}", state.next_rel_id);
        state.relationships.insert(
            id.clone(),
            GraphRelationship {
                id: id.clone(),
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
                rel_type: rel_type.to_string(),
                properties,
            },
        );
        state
            .outgoing
            .entry(source_id.to_string())
            .or_default()
            .push(id.clone());
        Ok(id)
    }

    async fn get_node(&self, id: &str) -> Result<Option<GraphNode>> {
        Ok(self.state.read().nodes.get(id).cloned())
    }

    async fn find_nodes_by_label(
        &self,
        label: &str,
        prop_filter: &Filter,
    ) -> Result<Vec<GraphNode>> {
        let state = self.state.read();
        Ok(state
            .nodes
            .values()
            .filter(|node| {
                node.labels.iter().any(|l| l == label)
                    && matches_filter(&node.properties, prop_filter)
            })
            .cloned()
            .collect())
    }

    async fn find_connected(
        &self,
        node_id: &str,
        rel_type: Option<&str>,
        max_depth: usize,
    ) -> Result<Vec<GraphNode>> {
        let state = self.state.read();
        if !state.nodes.contains_key(node_id) {
            return Ok(Vec::new());
        }

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(node_id.to_string());
        let mut frontier: VecDeque<(String, usize)> = VecDeque::new();
        frontier.push_back((node_id.to_string(), 0));
        let mut ordered: Vec<GraphNode> = Vec::new();

        while let Some((current, depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }
            let Some(rel_ids) = state.outgoing.get(&current) else {
                continue;
            };
            for rel_id in rel_ids {
                let Some(rel) = state.relationships.get(rel_id) else {
                    continue;
                };
                if let Some(wanted) = rel_type {
                    if rel.rel_type != wanted {
                        continue;
                    }
                }
                if visited.contains(&rel.target_id) {
                    continue;
                }
                visited.insert(rel.target_id.clone());
                if let Some(node) = state.nodes.get(&rel.target_id) {
                    ordered.push(node.clone());
                    frontier.push_back((rel.target_id.clone(), depth + 1));
                }
            }
        }

        Ok(ordered)
    }

    async fn update_node(&self, id: &str, properties: Properties) -> Result<()> {
        let mut state = self.state.write();
        let node = state
            .nodes
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        node.properties = properties;
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<()> {
        let mut state = self.state.write();
        if state.nodes.remove(id).is_none() {
            return Ok(());
        }
        state.outgoing.remove(id);
        for rels in state.outgoing.values_mut() {
            rels.retain(|rel_id| {
                state
                    .relationships
                    .get(rel_id)
                    .is_some_and(|r| r.target_id != id)
            });
        }
        state
            .relationships
            .retain(|_, rel| rel.source_id != id && rel.target_id != id);
        Ok(())
    }

    async fn delete_relationship(&self, id: &str) -> Result<()> {
        let mut state = self.state.write();
        if let Some(rel) = state.relationships.remove(id) {
            if let Some(outgoing) = state.outgoing.get_mut(&rel.source_id) {
                outgoing.retain(|rel_id| rel_id != id);
            }
        }
        Ok(())
    }

    async fn close(&self) {
        let mut state = self.state.write();
        state.nodes.clear();
        state.relationships.clear();
        state.outgoing.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_node_cascades_relationships() {
        let store = InMemoryGraphStore::new();
        let a = store.create_node(vec!["Memory".into()], Properties::new()).await.unwrap();
        let b = store.create_node(vec!["Memory".into()], Properties::new()).await.unwrap();
        store
            .create_relationship(&a, &b, "RELATED_TO", Properties::new())
            .await
            .unwrap();

        store.delete_node(&a).await.unwrap();
        assert!(store.get_node(&a).await.unwrap().is_none());
        let connected = store.find_connected(&b, None, 5).await.unwrap();
        assert!(connected.is_empty());
    }

    #[tokio::test]
    async fn find_connected_honors_max_depth() {
        let store = InMemoryGraphStore::new();
        let a = store.create_node(vec![], Properties::new()).await.unwrap();
        let b = store.create_node(vec![], Properties::new()).await.unwrap();
        let c = store.create_node(vec![], Properties::new()).await.unwrap();
        store.create_relationship(&a, &b, "RELATED_TO", Properties::new()).await.unwrap();
        store.create_relationship(&b, &c, "RELATED_TO", Properties::new()).await.unwrap();

        let one_hop = store.find_connected(&a, None, 1).await.unwrap();
        assert_eq!(one_hop.len(), 1);
        assert_eq!(one_hop[0].id, b);

        let two_hop = store.find_connected(&a, None, 2).await.unwrap();
        assert_eq!(two_hop.len(), 2);
        assert!(two_hop.iter().any(|n| n.id == c));
    }

    #[tokio::test]
    async fn find_connected_handles_cycles() {
        let store = InMemoryGraphStore::new();
        let a = store.create_node(vec![], Properties::new()).await.unwrap();
        let b = store.create_node(vec![], Properties::new()).await.unwrap();
        store.create_relationship(&a, &b, "RELATED_TO", Properties::new()).await.unwrap();
        store.create_relationship(&b, &a, "RELATED_TO", Properties::new()).await.unwrap();

        let connected = store.find_connected(&a, None, 10).await.unwrap();
        assert_eq!(connected.len(), 1);
        assert_eq!(connected[0].id, b);
    }

    #[tokio::test]
    async fn find_connected_filters_by_rel_type() {
        let store = InMemoryGraphStore::new();
        let a = store.create_node(vec![], Properties::new()).await.unwrap();
        let b = store.create_node(vec![], Properties::new()).await.unwrap();
        let c = store.create_node(vec![], Properties::new()).await.unwrap();
        store.create_relationship(&a, &b, "RELATED_TO", Properties::new()).await.unwrap();
        store.create_relationship(&a, &c, "SUPERSEDES", Properties::new()).await.unwrap();

        let related = store.find_connected(&a, Some("RELATED_TO"), 3).await.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, b);
    }
}
