//! Graph persistence: the portable record and format dispatch
//!
//! A saved graph is a `GraphRecord` with ordered `nodes` and `edges`. Formats
//! implement [`GraphFormat`] and are looked up by file extension through the
//! [`FormatRegistry`].

use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::geometry::Boundaries;
use crate::model::GraphModel;

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input was not a valid graph record
    #[error("parse error: {0}")]
    Parse(String),

    /// The record could not be serialized
    #[error("write error: {0}")]
    Write(String),
}

/// Result type for persistence operations
pub type IoResult<T> = Result<T, IoError>;

/// A saved node. Position is optional; absent nodes are placed randomly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(deserialize_with = "coerce_string")]
    pub id: String,
    #[serde(default, deserialize_with = "coerce_optional_string")]
    pub label: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "finite_coordinate"
    )]
    pub x: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "finite_coordinate"
    )]
    pub y: Option<f64>,
}

/// A saved edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    #[serde(deserialize_with = "coerce_string")]
    pub source: String,
    #[serde(deserialize_with = "coerce_string")]
    pub target: String,
    #[serde(default, deserialize_with = "coerce_optional_string")]
    pub label: String,
}

/// Portable graph document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphRecord {
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

/// Counts reported after a record is loaded into a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub nodes: usize,
    pub edges: usize,
    /// Edges whose endpoints were missing
    pub dropped_edges: usize,
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} nodes, {} edges", self.nodes, self.edges)?;
        if self.dropped_edges > 0 {
            write!(f, " ({} dangling edges dropped)", self.dropped_edges)?;
        }
        Ok(())
    }
}

impl GraphRecord {
    /// Capture the model's nodes (with positions) and edges in order
    pub fn from_model(model: &GraphModel) -> Self {
        Self {
            nodes: model
                .nodes()
                .iter()
                .map(|node| NodeRecord {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    x: Some(node.x),
                    y: Some(node.y),
                })
                .collect(),
            edges: model
                .edges()
                .iter()
                .map(|edge| EdgeRecord {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    label: edge.label.clone(),
                })
                .collect(),
        }
    }

    /// Replace the model's contents with this record.
    ///
    /// Nodes are added in order; a node with both `x` and `y` keeps that
    /// position, otherwise it is placed randomly inside `spawn_area`. Edges
    /// referencing absent nodes are dropped.
    pub fn load_into(&self, model: &mut GraphModel, spawn_area: &Boundaries) -> LoadSummary {
        model.clear();

        for node in &self.nodes {
            model.add_node(&node.id, &node.label, spawn_area);
            if let (Some(x), Some(y)) = (node.x, node.y) {
                model.set_position(&node.id, x, y);
            }
        }

        let mut dropped_edges = 0;
        for edge in &self.edges {
            if !model.add_edge(&edge.source, &edge.target, &edge.label) {
                dropped_edges += 1;
            }
        }

        LoadSummary {
            nodes: model.len(),
            edges: model.edge_count(),
            dropped_edges,
        }
    }
}

/// A serialization format for [`GraphRecord`]
pub trait GraphFormat {
    /// Parse a record from text
    fn decode(&self, text: &str) -> IoResult<GraphRecord>;

    /// Serialize a record to text
    fn encode(&self, record: &GraphRecord) -> IoResult<String>;

    /// File extensions this format can handle (e.g., ["yaml", "yml"])
    fn supported_extensions(&self) -> &[&str];

    /// Check if this format can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Pretty-printed JSON with two-space indentation
pub struct JsonFormat;

impl GraphFormat for JsonFormat {
    fn decode(&self, text: &str) -> IoResult<GraphRecord> {
        serde_json::from_str(text).map_err(|e| IoError::Parse(e.to_string()))
    }

    fn encode(&self, record: &GraphRecord) -> IoResult<String> {
        serde_json::to_string_pretty(record).map_err(|e| IoError::Write(e.to_string()))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

pub struct YamlFormat;

impl GraphFormat for YamlFormat {
    fn decode(&self, text: &str) -> IoResult<GraphRecord> {
        serde_yaml::from_str(text).map_err(|e| IoError::Parse(e.to_string()))
    }

    fn encode(&self, record: &GraphRecord) -> IoResult<String> {
        serde_yaml::to_string(record).map_err(|e| IoError::Write(e.to_string()))
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

/// Registry of available graph formats
pub struct FormatRegistry {
    formats: Vec<Box<dyn GraphFormat>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Create a registry with JSON and YAML registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(JsonFormat));
        registry.register(Box::new(YamlFormat));
        registry
    }

    pub fn register(&mut self, format: Box<dyn GraphFormat>) {
        self.formats.push(format);
    }

    /// Find a format for the given file extension
    pub fn format_for_extension(&self, ext: &str) -> Option<&dyn GraphFormat> {
        self.formats
            .iter()
            .find(|f| f.supports_extension(ext))
            .map(|f| f.as_ref())
    }

    /// Find a format for the given path based on its extension
    pub fn format_for_path(&self, path: &Path) -> IoResult<&dyn GraphFormat> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;
        self.format_for_extension(ext)
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }

    /// Extract the file extension from a path
    pub fn extension_from_path(path: &Path) -> Option<&str> {
        path.extension().and_then(|e| e.to_str())
    }

    /// Read and parse a graph file
    pub fn read_graph(&self, path: &Path) -> IoResult<GraphRecord> {
        let format = self.format_for_path(path)?;
        let text = fs::read_to_string(path)?;
        format.decode(&text)
    }

    /// Serialize and write a graph file
    pub fn write_graph(&self, path: &Path, record: &GraphRecord) -> IoResult<()> {
        let format = self.format_for_path(path)?;
        let text = format.encode(record)?;
        fs::write(path, text)?;
        Ok(())
    }
}

/// Scalar accepted where a string is expected
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(s) => s,
            Scalar::Integer(n) => n.to_string(),
            Scalar::Unsigned(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn coerce_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(String::from)
}

fn coerce_optional_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?
        .map(String::from)
        .unwrap_or_default())
}

/// Coordinates must be finite; `.nan` and `.inf` are rejected
fn finite_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<f64>::deserialize(deserializer)? {
        Some(value) if !value.is_finite() => Err(D::Error::custom(format!(
            "coordinate must be a finite number, got {value}"
        ))),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn spawn() -> Boundaries {
        Boundaries::new(80.0, 720.0, 80.0, 520.0)
    }

    fn reference_model() -> GraphModel {
        let mut model = GraphModel::with_seed(5);
        model.add_node("1", "A", &spawn());
        model.add_node("2", "B", &spawn());
        model.set_position("1", 10.0, 20.0);
        model.set_position("2", 30.0, 40.0);
        model.add_edge("1", "2", "knows");
        model
    }

    #[test]
    fn save_load_round_trip() {
        let record = GraphRecord::from_model(&reference_model());
        let text = JsonFormat.encode(&record).unwrap();

        let mut fresh = GraphModel::with_seed(99);
        let summary = JsonFormat.decode(&text).unwrap().load_into(&mut fresh, &spawn());

        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.edges, 1);
        let one = fresh.node("1").unwrap();
        assert_eq!((one.label.as_str(), one.x, one.y), ("A", 10.0, 20.0));
        let two = fresh.node("2").unwrap();
        assert_eq!((two.label.as_str(), two.x, two.y), ("B", 30.0, 40.0));
        assert_eq!(fresh.edges()[0].source, "1");
        assert_eq!(fresh.edges()[0].target, "2");
        assert_eq!(fresh.edges()[0].label, "knows");
    }

    #[test]
    fn yaml_round_trip_preserves_record() {
        let record = GraphRecord::from_model(&reference_model());
        let text = YamlFormat.encode(&record).unwrap();
        assert_eq!(YamlFormat.decode(&text).unwrap(), record);
    }

    #[test]
    fn json_layout_matches_expected_document() {
        let record = GraphRecord::from_model(&reference_model());
        let value: serde_json::Value = serde_json::from_str(&JsonFormat.encode(&record).unwrap()).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "nodes": [
                    {"id": "1", "label": "A", "x": 10.0, "y": 20.0},
                    {"id": "2", "label": "B", "x": 30.0, "y": 40.0}
                ],
                "edges": [{"source": "1", "target": "2", "label": "knows"}]
            })
        );
    }

    #[test]
    fn numeric_ids_and_labels_are_coerced() {
        let record = JsonFormat
            .decode(r#"{"nodes": [{"id": 1, "label": 2.5}, {"id": true}], "edges": [{"source": 1, "target": "true", "label": null}]}"#)
            .unwrap();

        assert_eq!(record.nodes[0].id, "1");
        assert_eq!(record.nodes[0].label, "2.5");
        assert_eq!(record.nodes[1].id, "true");
        assert_eq!(record.nodes[1].label, "");
        assert_eq!(record.edges[0].label, "");
    }

    #[test]
    fn integer_ids_beyond_i64_keep_every_digit() {
        let record = JsonFormat
            .decode(r#"{"nodes": [{"id": 18446744073709551615, "label": -7}]}"#)
            .unwrap();

        assert_eq!(record.nodes[0].id, "18446744073709551615");
        assert_eq!(record.nodes[0].label, "-7");
    }

    #[test]
    fn non_finite_coordinates_are_parse_errors() {
        for text in [
            "nodes:\n  - id: a\n    x: .nan\n    y: 100\n",
            "nodes:\n  - id: a\n    x: 10\n    y: .inf\n",
            "nodes:\n  - id: a\n    x: -.inf\n    y: 0\n",
        ] {
            match YamlFormat.decode(text) {
                Err(IoError::Parse(message)) => assert!(message.contains("finite"), "{message}"),
                other => panic!("Expected parse error for {text:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_positions_fall_back_to_random_placement() {
        let record = JsonFormat
            .decode(r#"{"nodes": [{"id": "a", "label": "A"}, {"id": "b", "label": "A", "x": 5}], "edges": []}"#)
            .unwrap();
        let mut model = GraphModel::with_seed(1);

        record.load_into(&mut model, &spawn());

        for node in model.nodes() {
            assert!(spawn().contains_circle(node.x, node.y, 0.0), "{node:?}");
        }
    }

    #[test]
    fn dangling_edges_are_dropped_on_load() {
        let record = JsonFormat
            .decode(r#"{"nodes": [{"id": "1", "label": "A"}], "edges": [{"source": "1", "target": "99", "label": "x"}]}"#)
            .unwrap();
        let mut model = GraphModel::with_seed(1);

        let summary = record.load_into(&mut model, &spawn());

        assert_eq!(summary.edges, 0);
        assert_eq!(summary.dropped_edges, 1);
        assert_eq!(summary.to_string(), "1 nodes, 0 edges (1 dangling edges dropped)");
    }

    #[test]
    fn edges_list_is_optional() {
        let record = JsonFormat.decode(r#"{"nodes": []}"#).unwrap();
        assert!(record.edges.is_empty());
    }

    #[test]
    fn malformed_records_are_parse_errors() {
        for text in [
            "not json",
            r#"{"edges": []}"#,
            r#"{"nodes": [{"id": "a", "x": "left"}]}"#,
            r#"{"nodes": [{"label": "no id"}]}"#,
        ] {
            assert!(
                matches!(JsonFormat.decode(text), Err(IoError::Parse(_))),
                "{text} should not parse"
            );
        }
    }

    #[test]
    fn registry_finds_format_by_extension() {
        let registry = FormatRegistry::with_defaults();

        assert!(registry.format_for_extension("json").is_some());
        assert!(registry.format_for_extension("YML").is_some());
        assert!(registry.format_for_extension("ttl").is_none());
    }

    #[test]
    fn registry_format_for_path_errors() {
        let registry = FormatRegistry::with_defaults();

        assert!(registry.format_for_path(&PathBuf::from("graph.yaml")).is_ok());
        assert!(matches!(
            registry.format_for_path(&PathBuf::from("graph.xyz")),
            Err(IoError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            registry.format_for_path(&PathBuf::from("graph")),
            Err(IoError::UnknownExtension(_))
        ));
    }

    #[test]
    fn registry_reads_and_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let registry = FormatRegistry::with_defaults();
        let record = GraphRecord::from_model(&reference_model());

        registry.write_graph(&path, &record).unwrap();
        assert_eq!(registry.read_graph(&path).unwrap(), record);
    }

    #[test]
    fn missing_file_is_io_error() {
        let registry = FormatRegistry::with_defaults();
        assert!(matches!(
            registry.read_graph(Path::new("does/not/exist.json")),
            Err(IoError::Io(_))
        ));
    }

    #[test]
    fn io_error_display() {
        let err = IoError::UnsupportedFormat("xyz".to_string());
        assert_eq!(err.to_string(), "unsupported format: xyz");

        let err = IoError::Parse("invalid syntax".to_string());
        assert_eq!(err.to_string(), "parse error: invalid syntax");
    }
}
