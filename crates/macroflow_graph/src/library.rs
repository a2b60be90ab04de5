//! Multi-script library documents.
//!
//! A library file holds every script of a project:
//!
//! ```json
//! { "version": "1.0", "scripts": [ { "id": "...", "name": "...", ... } ] }
//! ```
//!
//! Scripts are addressed by [`Graph::display_name`]. When two scripts share a
//! name the later one wins. Saving writes scripts sorted by name.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// Document version written by [`ScriptLibrary::to_json`].
pub const LIBRARY_VERSION: &str = "1.0";

/// Errors from loading or saving graph documents.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The file could not be read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the format.
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    /// No script with the given name exists in the library.
    #[error("no script named '{0}'")]
    UnknownScript(String),

    /// A script with the given name already exists.
    #[error("a script named '{0}' already exists")]
    NameTaken(String),
}

#[derive(Serialize, Deserialize)]
struct LibraryDocument {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    scripts: Vec<Graph>,
}

fn default_version() -> String {
    LIBRARY_VERSION.to_string()
}

/// Named collection of scripts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptLibrary {
    version: String,
    scripts: IndexMap<String, Graph>,
}

impl ScriptLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: default_version(),
            scripts: IndexMap::new(),
        }
    }

    /// Reads a library file.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Io`] if the file cannot be read and
    /// [`DocumentError::Json`] if it is not a library document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let library = Self::from_json(&text)?;
        tracing::debug!(path = %path.display(), scripts = library.len(), "loaded script library");
        Ok(library)
    }

    /// Writes the library to a file.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let text = self.to_json()?;
        std::fs::write(path, text).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses a library document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Json`] for malformed documents.
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        let document: LibraryDocument = serde_json::from_str(text)?;
        let mut library = Self {
            version: document.version,
            scripts: IndexMap::with_capacity(document.scripts.len()),
        };
        for graph in document.scripts {
            library.insert(graph);
        }
        Ok(library)
    }

    /// Serializes the library, scripts sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Json`] if a script cannot be serialized.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        let mut names: Vec<&String> = self.scripts.keys().collect();
        names.sort();
        let document = LibraryDocument {
            version: LIBRARY_VERSION.to_string(),
            scripts: names
                .into_iter()
                .filter_map(|name| self.scripts.get(name).cloned())
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Document version as read from disk.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Adds a script under its display name, returning the one it replaced.
    pub fn insert(&mut self, graph: Graph) -> Option<Graph> {
        let name = graph.display_name().to_string();
        self.scripts.insert(name, graph)
    }

    /// Looks a script up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Graph> {
        self.scripts.get(name)
    }

    /// Looks a script up by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Graph> {
        self.scripts.get_mut(name)
    }

    /// Removes a script.
    pub fn remove(&mut self, name: &str) -> Option<Graph> {
        self.scripts.shift_remove(name)
    }

    /// Renames a script, keeping its position.
    ///
    /// # Errors
    ///
    /// Fails if `from` does not exist or `to` is already taken.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), DocumentError> {
        if from == to {
            return Ok(());
        }
        if self.scripts.contains_key(to) {
            return Err(DocumentError::NameTaken(to.to_string()));
        }
        let index = self
            .scripts
            .get_index_of(from)
            .ok_or_else(|| DocumentError::UnknownScript(from.to_string()))?;
        let Some((_, mut graph)) = self.scripts.shift_remove_index(index) else {
            return Err(DocumentError::UnknownScript(from.to_string()));
        };
        graph.name = to.to_string();
        self.scripts.shift_insert(index, to.to_string(), graph);
        Ok(())
    }

    /// Copies `base` under `name` with fresh node IDs (see [`Graph::duplicate`]).
    ///
    /// # Errors
    ///
    /// Fails if `base` does not exist or `name` is already taken.
    pub fn duplicate(&mut self, base: &str, name: &str) -> Result<&Graph, DocumentError> {
        if self.scripts.contains_key(name) {
            return Err(DocumentError::NameTaken(name.to_string()));
        }
        let copy = self
            .scripts
            .get(base)
            .ok_or_else(|| DocumentError::UnknownScript(base.to_string()))?
            .duplicate(name, name);
        let (index, _) = self.scripts.insert_full(name.to_string(), copy);
        self.scripts
            .get_index(index)
            .map(|(_, graph)| graph)
            .ok_or_else(|| DocumentError::UnknownScript(name.to_string()))
    }

    /// Script names in library order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scripts.keys().map(String::as_str)
    }

    /// Iterates over `(name, script)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Graph)> {
        self.scripts.iter().map(|(name, graph)| (name.as_str(), graph))
    }

    /// Number of scripts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Returns `true` if the library holds no scripts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};

    fn script(id: &str, name: &str) -> Graph {
        let mut graph = Graph::new(id, name);
        graph
            .add_node(Node::new("n1", NodeKind::Key).with_param("key", "space"))
            .add_node(Node::new("n2", NodeKind::Sleep))
            .connect("n1", "n2");
        graph
    }

    #[test]
    fn scripts_are_keyed_by_display_name() {
        let text = r#"{"version":"1.0","scripts":[
            {"id":"a","name":"Alpha","nodes":[]},
            {"id":"b","name":"","nodes":[]},
            {"nodes":[]}
        ]}"#;
        let library = ScriptLibrary::from_json(text).unwrap();
        let names: Vec<&str> = library.names().collect();
        assert_eq!(names, ["Alpha", "b", "Unnamed"]);
    }

    #[test]
    fn later_script_replaces_same_name() {
        let mut library = ScriptLibrary::new();
        assert!(library.insert(script("1", "x")).is_none());
        let old = library.insert(script("2", "x")).unwrap();
        assert_eq!(old.id, "1");
        assert_eq!(library.get("x").unwrap().id, "2");
    }

    #[test]
    fn saved_document_is_sorted_and_versioned() {
        let mut library = ScriptLibrary::new();
        library.insert(script("z", "zeta"));
        library.insert(script("a", "alpha"));
        let value: serde_json::Value = serde_json::from_str(&library.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["scripts"][0]["name"], "alpha");
        assert_eq!(value["scripts"][1]["name"], "zeta");
    }

    #[test]
    fn missing_scripts_key_is_empty() {
        let library = ScriptLibrary::from_json("{}").unwrap();
        assert!(library.is_empty());
        assert_eq!(library.version(), LIBRARY_VERSION);
    }

    #[test]
    fn invalid_document_is_an_error() {
        assert!(matches!(
            ScriptLibrary::from_json("[1, 2]"),
            Err(DocumentError::Json(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ScriptLibrary::load("/nonexistent/macroflow/library.json").unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
    }

    #[test]
    fn rename_keeps_position() {
        let mut library = ScriptLibrary::new();
        library.insert(script("1", "one"));
        library.insert(script("2", "two"));
        library.rename("one", "uno").unwrap();
        let names: Vec<&str> = library.names().collect();
        assert_eq!(names, ["uno", "two"]);
        assert_eq!(library.get("uno").unwrap().name, "uno");
        assert!(matches!(
            library.rename("uno", "two"),
            Err(DocumentError::NameTaken(_))
        ));
        assert!(matches!(
            library.rename("missing", "x"),
            Err(DocumentError::UnknownScript(_))
        ));
    }

    #[test]
    fn duplicate_adds_renumbered_copy() {
        let mut library = ScriptLibrary::new();
        library.insert(script("1", "base"));
        let copy = library.duplicate("base", "copy").unwrap();
        assert_eq!(copy.id, "copy");
        assert_eq!(copy.nodes[0].id, "node_1");
        assert_eq!(library.len(), 2);
        assert!(library.duplicate("base", "copy").is_err());
    }
}
