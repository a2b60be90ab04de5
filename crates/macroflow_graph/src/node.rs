//! Node types for automation graphs.
//!
//! Nodes are the vertices of a script: a typed, parameterized step. The
//! engine reads `id`, `kind` and `params`; `position`, `outputs` and
//! `comment` belong to the editor and are carried through untouched.

use core::borrow::Borrow;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::params::Params;

/// Identifier of a node, unique within its graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the empty ID used in run-level failure notifications.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The closed set of node types the engine knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Clicks the center of a labeled detection.
    Click,
    /// Presses a key.
    Key,
    /// Waits, observing cancellation.
    Sleep,
    /// Succeeds if a color range is present in the frame.
    FindColor,
    /// Succeeds if a template was detected with enough confidence.
    FindImage,
    /// Checks a color near a detected template.
    VerifyImageColor,
    /// Binary branch on a label or color predicate.
    Condition,
    /// Bounded repetition of a body branch.
    Loop,
}

impl NodeKind {
    /// Every node kind, in declaration order.
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Click,
        NodeKind::Key,
        NodeKind::Sleep,
        NodeKind::FindColor,
        NodeKind::FindImage,
        NodeKind::VerifyImageColor,
        NodeKind::Condition,
        NodeKind::Loop,
    ];

    /// Returns the name used in the persisted format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Click => "click",
            NodeKind::Key => "key",
            NodeKind::Sleep => "sleep",
            NodeKind::FindColor => "find_color",
            NodeKind::FindImage => "find_image",
            NodeKind::VerifyImageColor => "verify_image_color",
            NodeKind::Condition => "condition",
            NodeKind::Loop => "loop",
        }
    }

    /// Parameter keys that name other nodes (explicit branch targets).
    #[must_use]
    pub fn branch_params(&self) -> &'static [&'static str] {
        match self {
            NodeKind::Condition => &["next_true", "next_false"],
            NodeKind::Loop => &["next_body", "next_after"],
            _ => &[],
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editor canvas position, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub f64, pub f64);

/// A single typed, parameterized step in an automation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the graph.
    pub id: NodeId,
    /// Node type; selects the executor.
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Type-specific parameters.
    #[serde(default)]
    pub params: Params,
    /// Canvas position (ignored by the engine).
    #[serde(default)]
    pub position: Position,
    /// Output port labels (ignored by the engine).
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Node {
    /// Creates a node with no parameters.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            params: Params::new(),
            position: Position::default(),
            outputs: Vec::new(),
            comment: None,
        }
    }

    /// Replaces the parameter map.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// Sets a single parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    /// Sets the canvas position.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position(x, y);
        self
    }

    /// Attaches a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Returns the explicit branch targets named in this node's parameters.
    pub fn branch_targets(&self) -> impl Iterator<Item = (&'static str, NodeId)> + '_ {
        self.kind
            .branch_params()
            .iter()
            .filter_map(|key| self.params.node_ref(key).map(|target| (*key, target)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_borrows_as_str() {
        let mut map = hashbrown::HashMap::new();
        map.insert(NodeId::new("a"), 1);
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(NodeId::from("a"), "a");
    }

    #[test]
    fn kind_round_trips_through_snake_case() {
        for kind in NodeKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let back: NodeKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result: Result<NodeKind, _> = serde_json::from_str("\"teleport\"");
        assert!(result.is_err());
    }

    #[test]
    fn missing_optional_fields_default() {
        let node: Node = serde_json::from_str(r#"{"id":"n1","type":"sleep"}"#).unwrap();
        assert_eq!(node.id, "n1");
        assert_eq!(node.kind, NodeKind::Sleep);
        assert!(node.params.is_empty());
        assert_eq!(node.position, Position(0.0, 0.0));
        assert!(node.outputs.is_empty());
        assert!(node.comment.is_none());
    }

    #[test]
    fn comment_is_omitted_when_absent() {
        let node = Node::new("n1", NodeKind::Key).at(10.0, 20.0);
        let json = serde_json::to_value(&node).unwrap();
        assert!(json.get("comment").is_none());
        assert_eq!(json["position"], serde_json::json!([10.0, 20.0]));
    }

    #[test]
    fn branch_targets_skip_empty_values() {
        let node = Node::new("c", NodeKind::Condition)
            .with_param("next_true", "b")
            .with_param("next_false", "");
        let targets: Vec<_> = node.branch_targets().collect();
        assert_eq!(targets, vec![("next_true", NodeId::new("b"))]);
    }
}
