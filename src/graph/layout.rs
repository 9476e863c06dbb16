//! Node placement for the learning-path view.
//!
//! Steps are stacked vertically, auxiliary nodes sit to the right of their
//! parent step, and a fixed number of pairwise repulsion passes pushes apart
//! any boxes that still overlap. There is no attraction and no convergence
//! check; dense clusters may keep some residual overlap.
use crate::indexer::edges::Edge;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

fn default_node_width() -> f64 {
    220.0
}

fn default_node_height() -> f64 {
    60.0
}

fn default_min_gap() -> f64 {
    24.0
}

fn default_iterations() -> usize {
    8
}

fn default_step_spacing() -> f64 {
    120.0
}

fn default_aux_offset() -> f64 {
    280.0
}

fn default_aux_spacing() -> f64 {
    80.0
}

fn default_max_auxiliary() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LayoutConfig {
    #[serde(default = "default_node_width")]
    pub node_width: f64,

    #[serde(default = "default_node_height")]
    pub node_height: f64,

    /// Extra clearance required between two boxes on each axis.
    #[serde(default = "default_min_gap")]
    pub min_gap: f64,

    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Vertical distance between consecutive steps.
    #[serde(default = "default_step_spacing")]
    pub step_spacing: f64,

    /// Horizontal distance from a step to its auxiliary nodes.
    #[serde(default = "default_aux_offset")]
    pub aux_offset: f64,

    /// Vertical distance between auxiliary nodes of the same step.
    #[serde(default = "default_aux_spacing")]
    pub aux_spacing: f64,

    /// Auxiliary nodes attached to a single step at most.
    #[serde(default = "default_max_auxiliary")]
    pub max_auxiliary: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: default_node_width(),
            node_height: default_node_height(),
            min_gap: default_min_gap(),
            iterations: default_iterations(),
            step_spacing: default_step_spacing(),
            aux_offset: default_aux_offset(),
            aux_spacing: default_aux_spacing(),
            max_auxiliary: default_max_auxiliary(),
        }
    }
}

/// A positioned node; `(x, y)` is the centre of its box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Initial placement. `auxiliary` holds `(parent_id, node_id)` pairs; pairs
/// whose parent is not a step, or whose id is already placed, are skipped.
pub fn initial_positions(
    steps: &[String],
    auxiliary: &[(String, String)],
    config: &LayoutConfig,
) -> Vec<LayoutNode> {
    let mut nodes: Vec<LayoutNode> = Vec::with_capacity(steps.len() + auxiliary.len());
    let mut placed = HashSet::new();

    for step in steps {
        if !placed.insert(step.as_str()) {
            continue;
        }
        nodes.push(LayoutNode {
            id: step.clone(),
            x: 0.0,
            y: nodes.len() as f64 * config.step_spacing,
            parent: None,
        });
    }
    let step_count = nodes.len();

    for (parent, id) in auxiliary {
        let Some(anchor) = nodes[..step_count].iter().find(|n| n.id == *parent) else {
            debug!("auxiliary node {id} has no step {parent}");
            continue;
        };
        if !placed.insert(id.as_str()) {
            continue;
        }
        let siblings = nodes[step_count..]
            .iter()
            .filter(|n| n.parent.as_deref() == Some(parent.as_str()))
            .count();
        let (x, y) = (
            anchor.x + config.aux_offset,
            anchor.y + siblings as f64 * config.aux_spacing,
        );
        nodes.push(LayoutNode {
            id: id.clone(),
            x,
            y,
            parent: Some(parent.clone()),
        });
    }

    nodes
}

/// Bounded de-overlap: `config.iterations` passes over all pairs. Each
/// overlapping pair is split apart along its axis of least overlap, half the
/// distance each.
pub fn resolve_overlaps(nodes: &mut [LayoutNode], config: &LayoutConfig) {
    let span_x = config.node_width + config.min_gap;
    let span_y = config.node_height + config.min_gap;

    for _ in 0..config.iterations {
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let dx = nodes[j].x - nodes[i].x;
                let dy = nodes[j].y - nodes[i].y;
                let overlap_x = span_x - dx.abs();
                let overlap_y = span_y - dy.abs();
                if overlap_x <= 0.0 || overlap_y <= 0.0 {
                    continue;
                }

                // Coincident nodes: the later one moves right/down.
                if overlap_x < overlap_y {
                    let push = overlap_x / 2.0 * direction(dx);
                    nodes[i].x -= push;
                    nodes[j].x += push;
                } else {
                    let push = overlap_y / 2.0 * direction(dy);
                    nodes[i].y -= push;
                    nodes[j].y += push;
                }
            }
        }
    }
}

fn direction(delta: f64) -> f64 {
    if delta < 0.0 { -1.0 } else { 1.0 }
}

/// Pairs whose boxes (with the gap) still overlap on both axes.
pub fn count_overlaps(nodes: &[LayoutNode], config: &LayoutConfig) -> usize {
    let span_x = config.node_width + config.min_gap;
    let span_y = config.node_height + config.min_gap;
    let mut count = 0;
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let overlap_x = span_x - (nodes[j].x - nodes[i].x).abs();
            let overlap_y = span_y - (nodes[j].y - nodes[i].y).abs();
            if overlap_x > 0.0 && overlap_y > 0.0 {
                count += 1;
            }
        }
    }
    count
}

/// Lays out an ordered learning path. Each step's direct imports that are
/// not steps themselves become its auxiliary nodes.
pub fn layout_learning_path(steps: &[String], edges: &[Edge], config: &LayoutConfig) -> Vec<LayoutNode> {
    let step_set: HashSet<&str> = steps.iter().map(String::as_str).collect();

    let mut auxiliary = Vec::new();
    for step in steps {
        auxiliary.extend(
            edges
                .iter()
                .filter(|e| e.source == *step && !step_set.contains(e.target.as_str()))
                .take(config.max_auxiliary)
                .map(|e| (step.clone(), e.target.clone())),
        );
    }

    let mut nodes = initial_positions(steps, &auxiliary, config);
    resolve_overlaps(&mut nodes, config);
    debug!(
        nodes = nodes.len(),
        residual = count_overlaps(&nodes, config),
        "learning path laid out"
    );
    nodes
}
