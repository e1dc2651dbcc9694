//! Node and edge tables with text filtering
//!
//! Rows are computed from the model; filtering only changes row visibility
//! and emphasis, never the graph itself.

use std::fmt;

use serde::Serialize;

use crate::model::GraphModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeRow {
    pub id: String,
    pub label: String,
    pub visible: bool,
    /// Matched by the filter, directly or through a matching edge
    pub emphasized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRow {
    /// Index into the edge list, used for hover highlighting
    pub index: usize,
    pub source: String,
    pub target: String,
    pub label: String,
    pub visible: bool,
    pub emphasized: bool,
}

/// Both inspector tables, filtered by `query`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InspectorTables {
    pub query: String,
    pub nodes: Vec<NodeRow>,
    pub edges: Vec<EdgeRow>,
}

impl InspectorTables {
    /// Build the tables in enumeration order and apply `query`.
    ///
    /// Matching is a case-insensitive substring test on a node's id or label
    /// and on an edge's source, target or label. A matching edge also reveals
    /// and emphasizes both endpoint rows. An empty query shows every row
    /// without emphasis.
    pub fn build(model: &GraphModel, query: &str) -> Self {
        let needle = query.trim().to_lowercase();
        let matches = |text: &str| text.to_lowercase().contains(&needle);
        let filtering = !needle.is_empty();

        let mut nodes: Vec<NodeRow> = model
            .nodes()
            .iter()
            .map(|node| {
                let hit = filtering && (matches(&node.id) || matches(&node.label));
                NodeRow {
                    id: node.id.clone(),
                    label: node.label.clone(),
                    visible: !filtering || hit,
                    emphasized: hit,
                }
            })
            .collect();

        let edges: Vec<EdgeRow> = model
            .edges()
            .iter()
            .enumerate()
            .map(|(index, edge)| {
                let hit = filtering
                    && (matches(&edge.source) || matches(&edge.target) || matches(&edge.label));
                EdgeRow {
                    index,
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    label: edge.label.clone(),
                    visible: !filtering || hit,
                    emphasized: hit,
                }
            })
            .collect();

        for edge in edges.iter().filter(|e| e.emphasized) {
            for row in nodes
                .iter_mut()
                .filter(|row| row.id == edge.source || row.id == edge.target)
            {
                row.visible = true;
                row.emphasized = true;
            }
        }

        Self {
            query: query.to_string(),
            nodes,
            edges,
        }
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &NodeRow> {
        self.nodes.iter().filter(|row| row.visible)
    }

    pub fn visible_edges(&self) -> impl Iterator<Item = &EdgeRow> {
        self.edges.iter().filter(|row| row.visible)
    }
}

/// Plain-text rendering used by the CLI. Hidden rows are omitted and
/// emphasized rows are starred.
impl fmt::Display for InspectorTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = |emphasized: bool| if emphasized { '*' } else { ' ' };

        write!(
            f,
            "Nodes ({} of {})",
            self.visible_nodes().count(),
            self.nodes.len()
        )?;
        for row in self.visible_nodes() {
            write!(f, "\n{} {}  {}", marker(row.emphasized), row.id, row.label)?;
        }

        write!(
            f,
            "\nEdges ({} of {})",
            self.visible_edges().count(),
            self.edges.len()
        )?;
        for row in self.visible_edges() {
            write!(
                f,
                "\n{} {} -> {}",
                marker(row.emphasized),
                row.source,
                row.target
            )?;
            if !row.label.is_empty() {
                write!(f, "  {}", row.label)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Boundaries;
    use pretty_assertions::assert_eq;

    fn model() -> GraphModel {
        let area = Boundaries::new(0.0, 100.0, 0.0, 100.0);
        let mut model = GraphModel::with_seed(1);
        model.add_node("alice", "Person", &area);
        model.add_node("bob", "Person", &area);
        model.add_node("acme", "Company", &area);
        model.add_edge("alice", "acme", "works_at");
        model.add_edge("alice", "bob", "knows");
        model
    }

    fn visible_ids(tables: &InspectorTables) -> Vec<&str> {
        tables.visible_nodes().map(|row| row.id.as_str()).collect()
    }

    #[test]
    fn empty_query_shows_everything_without_emphasis() {
        let tables = InspectorTables::build(&model(), "");

        assert_eq!(visible_ids(&tables), ["alice", "bob", "acme"]);
        assert_eq!(tables.visible_edges().count(), 2);
        assert!(tables.nodes.iter().all(|row| !row.emphasized));
        assert!(tables.edges.iter().all(|row| !row.emphasized));
    }

    #[test]
    fn node_rows_match_id_or_label_case_insensitively() {
        let tables = InspectorTables::build(&model(), "COMPANY");

        assert_eq!(visible_ids(&tables), ["acme"]);
        assert!(tables.nodes[2].emphasized);
        assert_eq!(tables.visible_edges().count(), 0);
    }

    #[test]
    fn matching_edge_reveals_its_endpoints() {
        let tables = InspectorTables::build(&model(), "works");

        assert_eq!(visible_ids(&tables), ["alice", "acme"]);
        assert!(tables.nodes[0].emphasized && tables.nodes[2].emphasized);
        assert!(!tables.nodes[1].visible);

        let edges: Vec<_> = tables.visible_edges().map(|row| row.index).collect();
        assert_eq!(edges, [0]);
    }

    #[test]
    fn edge_matches_on_endpoint_ids() {
        let tables = InspectorTables::build(&model(), "bob");

        assert_eq!(visible_ids(&tables), ["alice", "bob"]);
        let edges: Vec<_> = tables.visible_edges().map(|row| row.label.as_str()).collect();
        assert_eq!(edges, ["knows"]);
    }

    #[test]
    fn filtering_does_not_touch_the_model() {
        let model = model();
        let before = (model.len(), model.edge_count());

        let _ = InspectorTables::build(&model, "zzz");

        assert_eq!((model.len(), model.edge_count()), before);
    }

    #[test]
    fn text_rendering_unfiltered() {
        let tables = InspectorTables::build(&model(), "");
        insta::assert_snapshot!(tables.to_string(), @r"
        Nodes (3 of 3)
          alice  Person
          bob  Person
          acme  Company
        Edges (2 of 2)
          alice -> acme  works_at
          alice -> bob  knows
        ");
    }

    #[test]
    fn text_rendering_filtered() {
        let tables = InspectorTables::build(&model(), "knows");
        insta::assert_snapshot!(tables.to_string(), @r"
        Nodes (2 of 3)
        * alice  Person
        * bob  Person
        Edges (1 of 2)
        * alice -> bob  knows
        ");
    }
}
