//! Legacy linear action sequences.
//!
//! Before graphs, scripts were flat lists of actions run top to bottom with
//! no branching. They are still accepted and can be exported as Markdown for
//! review. See [`Engine::run_sequence`](crate::Engine::run_sequence) for the runner.

use core::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::node::NodeKind;
use crate::params::Params;

fn default_kind() -> NodeKind {
    NodeKind::Click
}

fn default_sequence_name() -> String {
    "Imported Sequence".to_string()
}

/// A single step of a legacy sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action type; defaults to `click` when absent.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: NodeKind,
    /// Type-specific parameters.
    #[serde(default)]
    pub params: Params,
}

impl Action {
    /// Creates an action.
    #[must_use]
    pub fn new(kind: NodeKind, params: Params) -> Self {
        Self { kind, params }
    }
}

/// An ordered list of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSequence {
    /// Sequence name.
    #[serde(default = "default_sequence_name")]
    pub name: String,
    /// Actions in execution order.
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Default for ActionSequence {
    fn default() -> Self {
        Self {
            name: "Unnamed Sequence".to_string(),
            actions: Vec::new(),
        }
    }
}

impl ActionSequence {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Appends an action, chaining.
    #[must_use]
    pub fn with_action(mut self, kind: NodeKind, params: Params) -> Self {
        self.actions.push(Action::new(kind, params));
        self
    }

    /// Parses a sequence document. A missing name becomes `"Imported Sequence"`.
    ///
    /// # Errors
    ///
    /// Returns the JSON error for malformed documents.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serializes the sequence as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter value cannot be serialized.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Renders a Markdown report: summary, action table and the raw document.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence cannot be serialized.
    pub fn to_markdown(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "# Action Sequence: {}", self.name);
        let _ = writeln!(out);
        let _ = writeln!(out, "## Summary");
        let _ = writeln!(out, "- Name: `{}`", self.name);
        let _ = writeln!(out, "- Actions: **{}**", self.actions.len());
        let _ = writeln!(out);
        let _ = writeln!(out, "## Actions");
        let _ = writeln!(out);
        let _ = writeln!(out, "| # | Type | Params |");
        let _ = writeln!(out, "|---|------|--------|");
        for (idx, action) in self.actions.iter().enumerate() {
            let params = serde_json::to_string(&action.params)?.replace('|', "\\|");
            let _ = writeln!(out, "| {} | `{}` | `{}` |", idx + 1, action.kind, params);
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "## Raw JSON");
        let _ = writeln!(out);
        let _ = writeln!(out, "```json");
        let _ = writeln!(out, "{}", self.to_json()?);
        let _ = writeln!(out, "```");
        Ok(out)
    }
}
