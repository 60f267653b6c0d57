//! Node-link lineage documents.
//!
//! The document layout follows the common node-link convention (`directed`,
//! `multigraph`, `graph`, `nodes`, `links`) so that graph tooling can load it
//! directly. Nodes are catalog tables keyed by table id. Links carry the edge
//! id as `key`, which makes the document a lossless rendition of the edge
//! rows it was built from.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use dwlineage_core::ids::parse_table_id;
use dwlineage_core::{
    CatalogRead, DetailEdge, StatementKind, SummaryEdge, TableIdentity, TableKind,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ExportError;

/// Which lineage layer to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Statement-level edges, temporary tables included.
    Detail,
    /// Script-level edges between entity tables.
    Summary,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detail => "detail",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "detail" => Ok(Self::Detail),
            "summary" => Ok(Self::Summary),
            _ => Err(format!("unknown lineage layer '{value}'")),
        }
    }
}

/// Which scripts contribute edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Script(String),
    All,
}

impl Scope {
    fn script_id(&self) -> Option<&str> {
        match self {
            Self::Script(id) => Some(id),
            Self::All => None,
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::Script(id) => id,
            Self::All => "all",
        }
    }
}

/// How a link was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Statement,
    Script,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GraphAttributes {
    pub layer: Layer,
    /// A script id, or `all`.
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    pub id: String,
    pub schema_name: String,
    pub table_name: String,
    pub node_type: TableKind,
    pub is_entity: bool,
    /// Owning script of a temporary table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_script_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub key: String,
    pub edge_type: EdgeType,
    pub script_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement_type: Option<StatementKind>,
    /// Summary only: detail paths contracted into the link and their length range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_hops: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_hops: Option<u32>,
}

/// A lineage layer as a node-link graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NodeLinkDocument {
    pub directed: bool,
    pub multigraph: bool,
    pub graph: GraphAttributes,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl NodeLinkDocument {
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        let document: Self = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Every link must join two listed nodes.
    fn validate(&self) -> Result<(), ExportError> {
        let known: std::collections::HashSet<&str> =
            self.nodes.iter().map(|n| n.id.as_str()).collect();
        for link in &self.links {
            for end in [&link.source, &link.target] {
                if !known.contains(end.as_str()) {
                    return Err(ExportError::InvalidDocument(format!(
                        "link {} refers to unknown node {end}",
                        link.key
                    )));
                }
            }
        }
        Ok(())
    }

    /// Rebuilds the detail edges a detail document was exported from.
    pub fn detail_edges(&self) -> Result<Vec<DetailEdge>, ExportError> {
        self.expect_layer(Layer::Detail)?;
        let mut edges = self
            .links
            .iter()
            .map(|link| {
                let statement_id = link.statement_id.clone().ok_or_else(|| {
                    ExportError::InvalidDocument(format!("link {} has no statement", link.key))
                })?;
                Ok(DetailEdge {
                    id: link.key.clone(),
                    source_table_id: link.source.clone(),
                    target_table_id: link.target.clone(),
                    script_id: link.script_id.clone(),
                    statement_id,
                })
            })
            .collect::<Result<Vec<_>, ExportError>>()?;
        edges.sort();
        Ok(edges)
    }

    /// Rebuilds the summary edges a summary document was exported from.
    pub fn summary_edges(&self) -> Result<Vec<SummaryEdge>, ExportError> {
        self.expect_layer(Layer::Summary)?;
        let mut edges = self
            .links
            .iter()
            .map(|link| {
                let (Some(path_count), Some(min_hops), Some(max_hops)) =
                    (link.path_count, link.min_hops, link.max_hops)
                else {
                    return Err(ExportError::InvalidDocument(format!(
                        "link {} has no path statistics",
                        link.key
                    )));
                };
                Ok(SummaryEdge {
                    id: link.key.clone(),
                    source_table_id: link.source.clone(),
                    target_table_id: link.target.clone(),
                    script_id: link.script_id.clone(),
                    path_count,
                    min_hops,
                    max_hops,
                })
            })
            .collect::<Result<Vec<_>, ExportError>>()?;
        edges.sort();
        Ok(edges)
    }

    fn expect_layer(&self, layer: Layer) -> Result<(), ExportError> {
        if self.graph.layer == layer {
            Ok(())
        } else {
            Err(ExportError::InvalidDocument(format!(
                "expected a {layer} document, found {}",
                self.graph.layer
            )))
        }
    }
}

/// Builds the node-link document of one lineage layer.
///
/// Fails with [`ExportError::UnknownScript`] when a scoped script is not in
/// the catalog. A known script without edges yields an empty graph.
pub fn export_lineage<C>(
    catalog: &C,
    layer: Layer,
    scope: &Scope,
) -> Result<NodeLinkDocument, ExportError>
where
    C: CatalogRead + ?Sized,
{
    if let Some(id) = scope.script_id() {
        if catalog.script(id)?.is_none() {
            return Err(ExportError::UnknownScript(id.to_string()));
        }
    }

    let links = match layer {
        Layer::Detail => detail_links(catalog, scope)?,
        Layer::Summary => catalog
            .summary_edges(scope.script_id())?
            .into_iter()
            .map(|edge| Link {
                source: edge.source_table_id,
                target: edge.target_table_id,
                key: edge.id,
                edge_type: EdgeType::Script,
                script_id: edge.script_id,
                statement_id: None,
                statement_index: None,
                statement_type: None,
                path_count: Some(edge.path_count),
                min_hops: Some(edge.min_hops),
                max_hops: Some(edge.max_hops),
            })
            .collect(),
    };

    let mut nodes = BTreeMap::new();
    for link in &links {
        for id in [&link.source, &link.target] {
            if !nodes.contains_key(id) {
                nodes.insert(id.clone(), node_for(catalog, id)?);
            }
        }
    }

    Ok(NodeLinkDocument {
        directed: true,
        multigraph: true,
        graph: GraphAttributes {
            layer,
            scope: scope.label().to_string(),
            exported_at: Some(Utc::now().to_rfc3339()),
        },
        nodes: nodes.into_values().collect(),
        links,
    })
}

fn detail_links<C>(catalog: &C, scope: &Scope) -> Result<Vec<Link>, ExportError>
where
    C: CatalogRead + ?Sized,
{
    let edges = catalog.detail_edges(scope.script_id())?;

    let mut statements = HashMap::new();
    let script_ids: Vec<String> = match scope {
        Scope::Script(id) => vec![id.clone()],
        Scope::All => catalog.scripts()?.into_iter().map(|s| s.id).collect(),
    };
    for script_id in script_ids {
        for statement in catalog.statements(&script_id)? {
            statements.insert(statement.id.clone(), statement);
        }
    }

    Ok(edges
        .into_iter()
        .map(|edge| {
            let statement = statements.get(&edge.statement_id);
            Link {
                source: edge.source_table_id,
                target: edge.target_table_id,
                key: edge.id,
                edge_type: EdgeType::Statement,
                script_id: edge.script_id,
                statement_index: statement.map(|s| s.index),
                statement_type: statement.map(|s| s.kind),
                statement_id: Some(edge.statement_id),
                path_count: None,
                min_hops: None,
                max_hops: None,
            }
        })
        .collect())
}

fn node_for<C>(catalog: &C, id: &str) -> Result<Node, ExportError>
where
    C: CatalogRead + ?Sized,
{
    if let Some(definition) = catalog.table(id)? {
        let table = definition.table;
        return Ok(Node {
            id: table.id.clone(),
            schema_name: table.schema_name().to_string(),
            table_name: table.table_name().to_string(),
            node_type: table.kind,
            is_entity: table.identity.is_entity(),
            table_script_id: table.owner_script_id(),
        });
    }

    // edge endpoint without a catalog row; describe it from the id alone
    let identity = parse_table_id(id)
        .ok_or_else(|| ExportError::InvalidDocument(format!("malformed table id {id}")))?;
    let node_type = match identity {
        TableIdentity::Entity { .. } => TableKind::Table,
        TableIdentity::Temporary { .. } => TableKind::Temp,
    };
    Ok(Node {
        id: id.to_string(),
        schema_name: identity.schema().to_string(),
        table_name: identity.name().to_string(),
        node_type,
        is_entity: identity.is_entity(),
        table_script_id: identity.owner_script_id(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwlineage_core::{EngineConfig, MemoryCatalog, ProcessMode, ScriptSource, UpdateCoordinator};

    fn catalog_with(scripts: &[(&str, &str)]) -> MemoryCatalog {
        let catalog = MemoryCatalog::new();
        let coordinator = UpdateCoordinator::new(&catalog, EngineConfig::default());
        for (name, sql) in scripts {
            let outcome = coordinator.process(&ScriptSource::new(*name, *sql), ProcessMode::Clear);
            assert!(outcome.is_success(), "{:?}", outcome.error);
        }
        catalog
    }

    const CHAIN: &str = "CREATE TABLE vt AS SELECT id FROM src.orders;
                         INSERT INTO dw.orders SELECT id FROM vt;";

    #[test]
    fn detail_document_includes_temporaries_and_statement_attributes() {
        let catalog = catalog_with(&[("load", CHAIN)]);
        let doc = export_lineage(&catalog, Layer::Detail, &Scope::Script("LOAD".into())).unwrap();

        assert!(doc.directed);
        assert_eq!(doc.graph.scope, "LOAD");
        assert_eq!(doc.nodes.len(), 3);
        let temp = doc.nodes.iter().find(|n| !n.is_entity).unwrap();
        assert_eq!(temp.node_type, TableKind::Temp);
        assert_eq!(temp.table_script_id.as_deref(), Some("LOAD"));

        assert_eq!(doc.links.len(), 2);
        let second = doc.links.iter().find(|l| l.statement_index == Some(2)).unwrap();
        assert_eq!(second.edge_type, EdgeType::Statement);
        assert_eq!(second.statement_type, Some(StatementKind::Insert));
    }

    #[test]
    fn summary_document_has_only_entities() {
        let catalog = catalog_with(&[("load", CHAIN)]);
        let doc = export_lineage(&catalog, Layer::Summary, &Scope::All).unwrap();

        assert_eq!(doc.graph.scope, "all");
        assert!(doc.nodes.iter().all(|n| n.is_entity));
        assert_eq!(doc.links.len(), 1);
        assert_eq!(doc.links[0].edge_type, EdgeType::Script);
        assert_eq!(doc.links[0].statement_id, None);
    }

    #[test]
    fn summary_links_carry_path_statistics() {
        let catalog = catalog_with(&[(
            "diamond",
            "CREATE TABLE vt1 AS SELECT id FROM src.a;
             CREATE TABLE vt2 AS SELECT id FROM src.a;
             INSERT INTO dw.t (id) SELECT v1.id FROM vt1 v1 JOIN vt2 v2 ON v1.id = v2.id;
             INSERT INTO dw.t (id) SELECT id FROM src.a;",
        )]);
        let doc = export_lineage(&catalog, Layer::Summary, &Scope::Script("DIAMOND".into()))
            .unwrap();

        assert_eq!(doc.links.len(), 1);
        let link = &doc.links[0];
        assert_eq!(link.path_count, Some(3));
        assert_eq!(link.min_hops, Some(1));
        assert_eq!(link.max_hops, Some(2));

        let json: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(json["links"][0]["path_count"], 3);

        let detail = export_lineage(&catalog, Layer::Detail, &Scope::All).unwrap();
        assert!(detail.links.iter().all(|l| l.path_count.is_none()));
    }

    #[test]
    fn unknown_script_is_an_error() {
        let catalog = MemoryCatalog::new();
        let err = export_lineage(&catalog, Layer::Summary, &Scope::Script("NOPE".into()))
            .unwrap_err();
        assert!(matches!(err, ExportError::UnknownScript(id) if id == "NOPE"));
    }

    #[test]
    fn document_round_trips_to_the_same_edges() {
        let catalog = catalog_with(&[
            ("load", CHAIN),
            ("fan", "INSERT INTO dw.a SELECT id FROM src.s; INSERT INTO dw.b SELECT id FROM src.s;"),
        ]);

        let detail = export_lineage(&catalog, Layer::Detail, &Scope::All).unwrap();
        let parsed = NodeLinkDocument::from_json(&detail.to_json().unwrap()).unwrap();
        assert_eq!(parsed.detail_edges().unwrap(), catalog.detail_edges(None).unwrap());

        let summary = export_lineage(&catalog, Layer::Summary, &Scope::All).unwrap();
        let parsed = NodeLinkDocument::from_json(&summary.to_json().unwrap()).unwrap();
        assert_eq!(parsed.summary_edges().unwrap(), catalog.summary_edges(None).unwrap());
        assert!(parsed.detail_edges().is_err());
    }

    #[test]
    fn dangling_link_is_rejected() {
        let json = r#"{
            "directed": true, "multigraph": true,
            "graph": {"layer": "summary", "scope": "all"},
            "nodes": [],
            "links": [{"source": "A", "target": "B", "key": "k", "edge_type": "script", "script_id": "S"}]
        }"#;
        assert!(matches!(
            NodeLinkDocument::from_json(json),
            Err(ExportError::InvalidDocument(_))
        ));
    }

    #[test]
    fn layer_names_parse() {
        assert_eq!("Detail".parse::<Layer>(), Ok(Layer::Detail));
        assert_eq!("summary".parse::<Layer>(), Ok(Layer::Summary));
        assert!("graph".parse::<Layer>().is_err());
    }
}
