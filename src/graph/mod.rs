pub mod models;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub use models::{EdgeType, Entity, NodeId, NodeType, Relationship, parse_year};

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("failed to read graph file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed graph JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    #[error("edge {from} -> {to} references missing node {missing}")]
    DanglingEdge {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// On-disk node-link layout. Edges may be called `links` or `edges`.
#[derive(Deserialize)]
struct GraphFile {
    nodes: Vec<Entity>,
    #[serde(default, alias = "edges")]
    links: Vec<Relationship>,
}

/// The loaded knowledge graph: entity table, relationship table, adjacency.
#[derive(Debug)]
pub struct KnowledgeGraph {
    entities: BTreeMap<NodeId, Entity>,
    relationships: Vec<Relationship>,
    outgoing: HashMap<NodeId, Vec<usize>>,
    incoming: HashMap<NodeId, Vec<usize>>,
}

impl KnowledgeGraph {
    /// Read and validate a graph file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let graph = Self::from_json_str(&contents)?;
        log::info!(
            "Loaded {} nodes and {} edges from {}",
            graph.entities.len(),
            graph.relationships.len(),
            path.display()
        );
        Ok(graph)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: GraphFile = serde_json::from_str(json)?;
        Self::from_parts(file.nodes, file.links)
    }

    /// Build a graph, rejecting duplicate keys and edges to unknown nodes.
    pub fn from_parts(nodes: Vec<Entity>, relationships: Vec<Relationship>) -> Result<Self> {
        let mut entities = BTreeMap::new();
        for node in nodes {
            let id = node.id;
            if entities.insert(id, node).is_some() {
                return Err(GraphError::DuplicateNode(id));
            }
        }

        let mut outgoing: HashMap<NodeId, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<NodeId, Vec<usize>> = HashMap::new();
        for (i, rel) in relationships.iter().enumerate() {
            for end in [rel.source, rel.target] {
                if !entities.contains_key(&end) {
                    return Err(GraphError::DanglingEdge {
                        from: rel.source,
                        to: rel.target,
                        missing: end,
                    });
                }
            }
            outgoing.entry(rel.source).or_default().push(i);
            incoming.entry(rel.target).or_default().push(i);
        }

        Ok(Self {
            entities,
            relationships,
            outgoing,
            incoming,
        })
    }

    pub fn entity(&self, id: NodeId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entities.contains_key(&id)
    }

    /// All entities in key order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn node_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.relationships.len()
    }

    /// Edges leaving `id`, in input order.
    pub fn outgoing(&self, id: NodeId) -> impl Iterator<Item = &Relationship> {
        self.outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&i| &self.relationships[i])
    }

    /// Edges arriving at `id`, in input order.
    pub fn incoming(&self, id: NodeId) -> impl Iterator<Item = &Relationship> {
        self.incoming
            .get(&id)
            .into_iter()
            .flatten()
            .map(|&i| &self.relationships[i])
    }

    /// Songs and albums, in key order.
    pub fn works(&self) -> impl Iterator<Item = &Entity> {
        self.entities().filter(|e| e.node_type.is_work())
    }

    /// People and musical groups, in key order.
    pub fn artists(&self) -> impl Iterator<Item = &Entity> {
        self.entities().filter(|e| e.node_type.is_artist())
    }

    /// Release year of a work node.
    pub fn work_year(&self, id: NodeId) -> Option<i32> {
        self.entity(id)
            .filter(|e| e.node_type.is_work())
            .and_then(Entity::year)
    }

    /// Earliest and latest release year across all works.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let mut years = self.works().filter_map(Entity::year);
        let first = years.next()?;
        Some(years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y))))
    }

    /// Node counts per type, sorted by type name.
    pub fn node_type_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for e in self.entities() {
            *counts.entry(e.node_type.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Edge counts per type, sorted by type name.
    pub fn edge_type_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.relationships {
            *counts.entry(r.edge_type.to_string()).or_insert(0) += 1;
        }
        counts
    }
}
