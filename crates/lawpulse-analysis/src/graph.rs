use std::collections::HashMap;

use lawpulse_config::GraphConfig;
use lawpulse_core::{CanonicalStance, SampleItem, Snapshot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::context::QueryContext;
use crate::range::RangeError;
use crate::ranking::{RankPolicy, rank_top_n};

const MIN_NODE_SIZE: f64 = 8.0;
const MAX_NODE_SIZE: f64 = 36.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphLimits {
    pub max_laws: usize,
    pub max_incidents_per_law: usize,
    pub samples_per_stance: usize,
}

impl Default for GraphLimits {
    fn default() -> Self {
        Self::from(&GraphConfig::default())
    }
}

impl From<&GraphConfig> for GraphLimits {
    fn from(config: &GraphConfig) -> Self {
        Self {
            max_laws: config.max_laws,
            max_incidents_per_law: config.max_incidents_per_law,
            samples_per_stance: config.samples_per_stance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Law,
    Incident,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StanceSample {
    pub stance: CanonicalStance,
    #[serde(flatten)]
    pub item: SampleItem,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub weight: u64,
    /// Display hint: square-root scale of `weight` into 8..=36.
    pub size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<StanceSample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RelationGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub representative: Option<String>,
}

impl RelationGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn to_petgraph(&self) -> DiGraph<GraphNode, u64> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        let mut indices = HashMap::<&str, NodeIndex>::new();
        for node in &self.nodes {
            let index = graph.add_node(node.clone());
            indices.insert(node.id.as_str(), index);
        }
        for edge in &self.edges {
            if let (Some(source), Some(target)) = (
                indices.get(edge.source.as_str()),
                indices.get(edge.target.as_str()),
            ) {
                graph.add_edge(*source, *target, edge.weight);
            }
        }
        graph
    }
}

struct IncidentRecord<'a> {
    law: &'a str,
    theme: &'a str,
    name: &'a str,
    label: String,
    count: u64,
    samples: Vec<StanceSample>,
}

/// Law to incident graph over the selected buckets. Laws and their
/// incidents are both ranked by count and capped by `limits`.
pub fn build_relation_graph(
    snapshot: &Snapshot,
    context: &QueryContext,
    limits: GraphLimits,
) -> Result<RelationGraph, RangeError> {
    context.selected_keys(snapshot, context.metric)?;

    let mut records = Vec::new();
    for domain in context.present_domains(snapshot) {
        for bucket in context.buckets(domain)? {
            for (theme, incident) in bucket.incidents() {
                let mut samples = Vec::new();
                for stance in CanonicalStance::CANONICAL {
                    samples.extend(
                        incident
                            .stance
                            .samples
                            .for_stance(stance)
                            .iter()
                            .take(limits.samples_per_stance)
                            .map(|item| StanceSample {
                                stance,
                                item: item.clone(),
                            }),
                    );
                }
                records.push(IncidentRecord {
                    law: incident.law_label(theme),
                    theme: theme.name.as_str(),
                    name: incident.name.as_str(),
                    label: incident.display_label(theme),
                    count: incident.count,
                    samples,
                });
            }
        }
    }

    let laws = rank_top_n(
        records.iter(),
        |record| record.law,
        |record| record.count as f64,
        limits.max_laws,
        RankPolicy::default(),
    );

    let mut graph = RelationGraph::default();
    for law in &laws {
        let law_id = law.label.to_owned();
        graph.nodes.push(GraphNode {
            id: law_id.clone(),
            label: law.label.to_owned(),
            kind: NodeKind::Law,
            weight: law.total as u64,
            size: 0.0,
            theme: None,
            samples: Vec::new(),
        });

        let members = records
            .iter()
            .filter(|record| record.law == law.label)
            .collect::<Vec<_>>();
        let incidents = rank_top_n(
            members.iter().copied(),
            |record| (record.theme, record.name),
            |record| record.count as f64,
            limits.max_incidents_per_law,
            RankPolicy::default(),
        );

        for ranked in incidents {
            let (theme, name) = ranked.label;
            let occurrences = members
                .iter()
                .filter(|record| record.theme == theme && record.name == name)
                .collect::<Vec<_>>();
            let label = occurrences
                .first()
                .map(|record| record.label.clone())
                .unwrap_or_else(|| name.to_owned());
            let samples = occurrences
                .iter()
                .flat_map(|record| record.samples.iter().cloned())
                .collect::<Vec<_>>();
            let weight = ranked.total as u64;
            let id = format!("{law_id}::{theme}::{name}");
            graph.edges.push(GraphEdge {
                source: law_id.clone(),
                target: id.clone(),
                weight,
            });
            graph.nodes.push(GraphNode {
                id,
                label,
                kind: NodeKind::Incident,
                weight,
                size: 0.0,
                theme: Some(theme.to_owned()),
                samples,
            });
        }
    }

    let max_weight = graph.nodes.iter().map(|node| node.weight).max().unwrap_or(0);
    for node in &mut graph.nodes {
        node.size = node_size(node.weight, max_weight);
    }

    let mut representative: Option<&GraphNode> = None;
    for node in graph.nodes.iter().filter(|node| node.kind == NodeKind::Incident) {
        if representative.is_none_or(|current| node.weight > current.weight) {
            representative = Some(node);
        }
    }
    graph.representative = representative.map(|node| node.id.clone());

    tracing::debug!(
        laws = laws.len(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "built relation graph"
    );
    Ok(graph)
}

fn node_size(weight: u64, max_weight: u64) -> f64 {
    if max_weight == 0 {
        return MIN_NODE_SIZE;
    }
    let ratio = (weight as f64 / max_weight as f64).sqrt();
    MIN_NODE_SIZE + ratio * (MAX_NODE_SIZE - MIN_NODE_SIZE)
}
