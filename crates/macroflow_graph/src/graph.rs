//! Graph structure, builder API and persisted document format.
//!
//! A [`Graph`] is an ordered list of [`Node`]s plus a `connections` map from
//! a source node to its default successor. Branch targets for `condition`
//! and `loop` nodes live in the node parameters, not in `connections`.
//!
//! The model guarantees nothing about connectivity. Orphaned nodes, cycles and
//! references to deleted nodes are all valid inputs; the engine handles them
//! at run time. [`Graph::validate`] reports them for tooling.

use core::fmt;

use hashbrown::{HashMap, HashSet};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeId};

/// A user-authored automation script.
///
/// # Example
///
/// ```
/// use macroflow_graph::{Graph, Node, NodeKind};
///
/// let mut graph = Graph::new("s1", "demo");
/// graph
///     .add_node(Node::new("a", NodeKind::Key).with_param("key", "space"))
///     .add_node(Node::new("b", NodeKind::Sleep))
///     .connect("a", "b");
///
/// assert_eq!(graph.successor(&"a".into()), Some(&"b".into()));
/// assert!(graph.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Script identifier.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Nodes in authoring order. The first node is the default start.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Default successor of each source node.
    #[serde(default)]
    pub connections: IndexMap<NodeId, NodeId>,
    /// Editor groupings (ignored by the engine).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub groups: IndexMap<String, Vec<NodeId>>,
}

impl Graph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Parses a graph document.
    ///
    /// # Errors
    ///
    /// Returns the underlying JSON error for malformed documents or unknown node types.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serializes the graph as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter value cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builder API
    // ─────────────────────────────────────────────────────────────────────────

    /// Appends a node.
    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    /// Sets the default successor of `from`, replacing any previous one.
    pub fn connect(&mut self, from: impl Into<NodeId>, to: impl Into<NodeId>) -> &mut Self {
        self.connections.insert(from.into(), to.into());
        self
    }

    /// Removes the default successor of `from`.
    pub fn disconnect(&mut self, from: &str) -> Option<NodeId> {
        self.connections.shift_remove(from)
    }

    /// Adds a node to an editor group.
    pub fn group(&mut self, name: impl Into<String>, node: impl Into<NodeId>) -> &mut Self {
        self.groups.entry(name.into()).or_default().push(node.into());
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Looks a node up by ID. With duplicate IDs the first match wins.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == *id)
    }

    /// Returns the first node in authoring order.
    #[must_use]
    pub fn first_node(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Returns the default successor of `id`, if one is connected.
    #[must_use]
    pub fn successor(&self, id: &NodeId) -> Option<&NodeId> {
        self.connections.get(id)
    }

    /// Returns all nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the name used to address this graph in a library:
    /// `name`, else `id`, else `"Unnamed"`.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.id.is_empty() {
            &self.id
        } else {
            "Unnamed"
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Validation API
    // ─────────────────────────────────────────────────────────────────────────

    /// Lints the graph structure.
    ///
    /// None of the reported issues stop the engine from running the graph;
    /// they flag constructs that will end a run early (dangling references)
    /// or resolve ambiguously (duplicate IDs).
    ///
    /// # Errors
    ///
    /// Returns every issue found, in node order.
    pub fn validate(&self) -> Result<(), Vec<GraphIssue>> {
        let mut issues = Vec::new();
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.nodes.len());

        for node in &self.nodes {
            if node.id.is_empty() {
                issues.push(GraphIssue::EmptyId);
            } else if !seen.insert(node.id.as_str()) {
                issues.push(GraphIssue::DuplicateId(node.id.clone()));
            }
        }

        for (from, to) in &self.connections {
            if !seen.contains(to.as_str()) {
                issues.push(GraphIssue::DanglingConnection {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        }

        for node in &self.nodes {
            for (param, target) in node.branch_targets() {
                if !seen.contains(target.as_str()) {
                    issues.push(GraphIssue::DanglingBranch {
                        node: node.id.clone(),
                        param,
                        target,
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Duplication
    // ─────────────────────────────────────────────────────────────────────────

    /// Copies the graph under a new identity with fresh node IDs.
    ///
    /// Nodes are renumbered `node_1..node_n` in authoring order. Connections,
    /// branch parameters and groups are rewritten to the new IDs; references
    /// to IDs that do not exist in the graph are kept as they are.
    #[must_use]
    pub fn duplicate(&self, id: impl Into<String>, name: impl Into<String>) -> Graph {
        let mapping: HashMap<&NodeId, NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (&node.id, NodeId::new(format!("node_{}", i + 1))))
            .collect();
        let remap = |id: &NodeId| mapping.get(id).cloned().unwrap_or_else(|| id.clone());

        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                let mut copy = node.clone();
                copy.id = remap(&node.id);
                for (param, target) in node.branch_targets() {
                    copy.params.insert(param, remap(&target).as_str());
                }
                copy
            })
            .collect();

        let connections = self
            .connections
            .iter()
            .map(|(from, to)| (remap(from), remap(to)))
            .collect();

        let groups = self
            .groups
            .iter()
            .map(|(name, members)| (name.clone(), members.iter().map(remap).collect()))
            .collect();

        Graph {
            id: id.into(),
            name: name.into(),
            nodes,
            connections,
            groups,
        }
    }
}

/// A structural problem reported by [`Graph::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    /// A node has an empty ID.
    EmptyId,
    /// More than one node shares an ID; lookups resolve to the first.
    DuplicateId(NodeId),
    /// A connection points at a node that does not exist.
    DanglingConnection {
        /// Source node.
        from: NodeId,
        /// Missing destination.
        to: NodeId,
    },
    /// A branch parameter names a node that does not exist.
    DanglingBranch {
        /// The branching node.
        node: NodeId,
        /// Parameter holding the target (`next_true`, `next_body`, ...).
        param: &'static str,
        /// Missing target.
        target: NodeId,
    },
}

impl fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphIssue::EmptyId => write!(f, "node with empty id"),
            GraphIssue::DuplicateId(id) => write!(f, "duplicate node id: {id}"),
            GraphIssue::DanglingConnection { from, to } => {
                write!(f, "connection {from} -> {to} targets a missing node")
            }
            GraphIssue::DanglingBranch {
                node,
                param,
                target,
            } => write!(f, "{param} of node {node} targets a missing node: {target}"),
        }
    }
}

impl core::error::Error for GraphIssue {}
