use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use log::{debug, error};
use replay_common::{GenerationSnapshot, Member, NodeType, Vec2};
use std::collections::{BTreeMap, HashMap};

use crate::colors;
use crate::fonts::Fonts;

pub const EDGE_MIN_WIDTH: f32 = 1.0;
pub const EDGE_MAX_WIDTH: f32 = 3.0;
/// Edge width gained per unit of absolute weight, before clamping.
pub const EDGE_WIDTH_PER_WEIGHT: f32 = 1.0;

pub const POSITIVE_EDGE: Rgba<u8> = Rgba([30, 150, 60, 255]);
pub const NEGATIVE_EDGE: Rgba<u8> = Rgba([200, 40, 40, 255]);

const NODE_RADIUS: f32 = 6.0;
const MARGIN: f32 = 16.0;
const ARROW_LENGTH: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Circle,
    Square,
    Diamond,
    Ring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStyle {
    pub shape: NodeShape,
    pub fill: Rgba<u8>,
}

pub fn node_style(kind: NodeType) -> NodeStyle {
    match kind {
        NodeType::Input => NodeStyle { shape: NodeShape::Circle, fill: Rgba([50, 110, 220, 255]) },
        NodeType::Output => NodeStyle { shape: NodeShape::Square, fill: Rgba([235, 140, 20, 255]) },
        NodeType::Bias => NodeStyle { shape: NodeShape::Diamond, fill: Rgba([120, 120, 130, 255]) },
        NodeType::Hidden => NodeStyle { shape: NodeShape::Ring, fill: Rgba([30, 30, 30, 255]) },
    }
}

pub fn edge_color(weight: f64) -> Rgba<u8> {
    if weight > 0.0 {
        POSITIVE_EDGE
    } else {
        NEGATIVE_EDGE
    }
}

pub fn edge_width(weight: f64) -> f32 {
    (weight.abs() as f32 * EDGE_WIDTH_PER_WEIGHT).clamp(EDGE_MIN_WIDTH, EDGE_MAX_WIDTH)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramNode {
    pub id: u32,
    pub kind: NodeType,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramEdge {
    /// Index into [`NetworkDiagram::nodes`].
    pub from: usize,
    pub to: usize,
    pub weight: f64,
    pub color: Rgba<u8>,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetworkDiagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

/// Lays `genome` out left to right: inputs and bias first, outputs last, hidden
/// nodes in between by their longest path from the inputs.
///
/// Only enabled connections become edges.
pub fn layout_network(genome: &Member, width: u32, height: u32) -> NetworkDiagram {
    let index_of: HashMap<u32, usize> = genome.nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
    let links: Vec<(usize, usize, f64)> = genome
        .enabled_connections()
        .filter_map(|c| match (index_of.get(&c.in_id), index_of.get(&c.out_id)) {
            (Some(&from), Some(&to)) => Some((from, to, c.weight)),
            _ => {
                debug!("Skipping connection {} -> {} with unknown endpoint", c.in_id, c.out_id);
                None
            }
        })
        .collect();

    let layers = assign_layers(genome, &links);
    let last_layer = layers.iter().copied().max().unwrap_or(0).max(1);

    let mut columns: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &layer) in layers.iter().enumerate() {
        columns.entry(layer).or_default().push(i);
    }

    let usable_w = (width as f32 - 2.0 * MARGIN).max(1.0);
    let usable_h = (height as f32 - 2.0 * MARGIN).max(1.0);
    let mut positions = vec![Vec2::zero(); genome.nodes.len()];
    for (layer, members) in columns.iter_mut() {
        members.sort_by_key(|&i| genome.nodes[i].id);
        let x = MARGIN + usable_w * (*layer as f32 / last_layer as f32);
        let slots = members.len() as f32 + 1.0;
        for (slot, &i) in members.iter().enumerate() {
            positions[i] = Vec2::new(x, MARGIN + usable_h * ((slot as f32 + 1.0) / slots));
        }
    }

    NetworkDiagram {
        nodes: genome
            .nodes
            .iter()
            .zip(positions)
            .map(|(node, position)| DiagramNode { id: node.id, kind: node.kind, position })
            .collect(),
        edges: links
            .into_iter()
            .map(|(from, to, weight)| DiagramEdge {
                from,
                to,
                weight,
                color: edge_color(weight),
                width: edge_width(weight),
            })
            .collect(),
    }
}

/// Column per node. Relaxation is capped at the node count so recurrent links terminate.
fn assign_layers(genome: &Member, links: &[(usize, usize, f64)]) -> Vec<usize> {
    let n = genome.nodes.len();
    let mut depth = vec![0usize; n];
    for _ in 0..n {
        let mut changed = false;
        for &(from, to, _) in links {
            let is_source = matches!(genome.nodes[to].kind, NodeType::Input | NodeType::Bias);
            if from != to && !is_source && depth[to] < depth[from] + 1 && depth[from] + 1 < n.max(2) {
                depth[to] = depth[from] + 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let deepest_hidden = genome
        .nodes
        .iter()
        .zip(&depth)
        .filter(|(node, _)| node.kind == NodeType::Hidden)
        .map(|(_, &d)| d.max(1))
        .max()
        .unwrap_or(0);
    let output_layer = deepest_hidden + 1;

    genome
        .nodes
        .iter()
        .zip(depth)
        .map(|(node, d)| match node.kind {
            NodeType::Input | NodeType::Bias => 0,
            NodeType::Output => output_layer,
            NodeType::Hidden => d.clamp(1, output_layer - 1),
        })
        .collect()
}

/// Draws the champion genome of `snapshot`, or a labelled placeholder when the
/// snapshot does not identify one.
pub fn render_network(snapshot: &GenerationSnapshot, fonts: &Fonts, width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, colors::BACKGROUND);
    let champion = match snapshot.champion() {
        Ok(champion) => champion,
        Err(err) => {
            error!("Cannot draw champion network: {}", err);
            fonts.draw_centered(&mut image, colors::TEXT, (width / 2) as i32, (height / 2) as i32, 14.0, "champion unavailable");
            return image;
        }
    };

    let diagram = layout_network(champion, width, height);
    for edge in &diagram.edges {
        let from = diagram.nodes[edge.from].position;
        let to = diagram.nodes[edge.to].position;
        if edge.from == edge.to {
            let loop_center = (from.x.round() as i32, (from.y - NODE_RADIUS * 1.5).round() as i32);
            draw_hollow_circle_mut(&mut image, loop_center, NODE_RADIUS as i32, edge.color);
        } else {
            draw_edge(&mut image, from, to, edge.width, edge.color);
        }
    }
    for node in &diagram.nodes {
        draw_node(&mut image, node);
    }
    fonts.draw(&mut image, colors::TEXT, 4, 2, 12.0, &format!("Champion (gen {})", snapshot.generation));
    image
}

fn to_point(v: Vec2) -> Point<i32> {
    Point::new(v.x.round() as i32, v.y.round() as i32)
}

fn fill_polygon(image: &mut RgbaImage, corners: &[Vec2], color: Rgba<u8>) {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(corners.len());
    for &c in corners {
        let p = to_point(c);
        if !points.contains(&p) {
            points.push(p);
        }
    }
    if points.len() >= 3 {
        draw_polygon_mut(image, &points, color);
    }
}

fn draw_edge(image: &mut RgbaImage, from: Vec2, to: Vec2, width: f32, color: Rgba<u8>) {
    let dir = (to - from).normalize_or_zero();
    if dir == Vec2::zero() {
        return;
    }
    // Stop at the node rim so the arrowhead stays visible
    let tip = to - dir * NODE_RADIUS;
    let start = from + dir * NODE_RADIUS;
    let across = dir.perpendicular();

    if width <= EDGE_MIN_WIDTH {
        draw_line_segment_mut(image, (start.x, start.y), (tip.x, tip.y), color);
    } else {
        let half = across * (width / 2.0);
        fill_polygon(image, &[start + half, tip + half, tip - half, start - half], color);
    }

    let back = tip - dir * ARROW_LENGTH;
    let wing = across * (ARROW_LENGTH / 2.0);
    fill_polygon(image, &[tip, back + wing, back - wing], color);
}

fn draw_node(image: &mut RgbaImage, node: &DiagramNode) {
    let style = node_style(node.kind);
    let center = (node.position.x.round() as i32, node.position.y.round() as i32);
    let r = NODE_RADIUS;
    match style.shape {
        NodeShape::Circle => draw_filled_circle_mut(image, center, r as i32, style.fill),
        NodeShape::Square => {
            let side = (r * 2.0) as u32;
            draw_filled_rect_mut(image, Rect::at(center.0 - r as i32, center.1 - r as i32).of_size(side, side), style.fill);
        }
        NodeShape::Diamond => {
            let p = node.position;
            fill_polygon(
                image,
                &[
                    Vec2::new(p.x, p.y - r),
                    Vec2::new(p.x + r, p.y),
                    Vec2::new(p.x, p.y + r),
                    Vec2::new(p.x - r, p.y),
                ],
                style.fill,
            );
        }
        NodeShape::Ring => {
            draw_filled_circle_mut(image, center, r as i32, colors::BACKGROUND);
            draw_hollow_circle_mut(image, center, r as i32, style.fill);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replay_common::{Connection, Node, Species};

    fn node(id: u32, kind: NodeType) -> Node {
        Node { id, kind }
    }

    fn link(in_id: u32, out_id: u32, weight: f64, is_enabled: bool) -> Connection {
        Connection { in_id, out_id, weight, is_enabled, innov_id: None }
    }

    fn two_node_genome() -> Member {
        Member {
            nodes: vec![node(1, NodeType::Input), node(2, NodeType::Output)],
            connections: vec![link(1, 2, 0.5, true), link(1, 2, -2.0, false)],
            fitness: None,
        }
    }

    #[test]
    fn disabled_connections_are_omitted() {
        let diagram = layout_network(&two_node_genome(), 300, 120);
        assert_eq!(diagram.edges.len(), 1);
        let edge = &diagram.edges[0];
        assert_eq!(edge.color, POSITIVE_EDGE);
        assert_eq!(edge.width, EDGE_MIN_WIDTH);
        assert_eq!(diagram.nodes[edge.from].id, 1);
        assert_eq!(diagram.nodes[edge.to].id, 2);
    }

    #[test]
    fn edge_width_is_clamped_linear_in_weight() {
        assert_eq!(edge_width(0.2), EDGE_MIN_WIDTH);
        assert_eq!(edge_width(-2.0), 2.0);
        assert_eq!(edge_width(9.0), EDGE_MAX_WIDTH);
        assert_eq!(edge_color(0.0), NEGATIVE_EDGE);
        assert_eq!(edge_color(-0.1), NEGATIVE_EDGE);
    }

    #[test]
    fn every_node_type_has_its_own_style() {
        let styles = [NodeType::Input, NodeType::Output, NodeType::Hidden, NodeType::Bias].map(node_style);
        for i in 0..styles.len() {
            for j in (i + 1)..styles.len() {
                assert_ne!(styles[i].shape, styles[j].shape);
            }
        }
    }

    #[test]
    fn hidden_nodes_sit_between_inputs_and_outputs() {
        let genome = Member {
            nodes: vec![
                node(0, NodeType::Input),
                node(1, NodeType::Bias),
                node(2, NodeType::Output),
                node(5, NodeType::Hidden),
                node(6, NodeType::Hidden),
            ],
            connections: vec![
                link(0, 5, 1.0, true),
                link(5, 6, 1.0, true),
                link(6, 2, 1.0, true),
                link(6, 5, 1.0, true),
                link(1, 2, 1.0, true),
            ],
            fitness: None,
        };
        let diagram = layout_network(&genome, 400, 200);
        let x = |id: u32| diagram.nodes.iter().find(|n| n.id == id).unwrap().position.x;
        assert_eq!(x(0), x(1));
        assert!(x(0) < x(5));
        assert!(x(5) < x(6));
        assert!(x(6) < x(2));
    }

    #[test]
    fn unknown_endpoints_are_skipped() {
        let mut genome = two_node_genome();
        genome.connections.push(link(1, 42, 1.0, true));
        assert_eq!(layout_network(&genome, 300, 120).edges.len(), 1);
    }

    #[test]
    fn empty_champion_species_renders_placeholder() {
        let mut snapshot: GenerationSnapshot = serde_json::from_str("{}").unwrap();
        snapshot.champ_species = Some(0);
        snapshot.species = vec![Species { id: 1, members: Vec::new() }];
        let image = render_network(&snapshot, &Fonts::none(), 120, 80);
        assert!(image.pixels().all(|p| *p == colors::BACKGROUND));
    }

    #[test]
    fn renders_champion_edges() {
        let mut snapshot: GenerationSnapshot = serde_json::from_str("{}").unwrap();
        snapshot.champ_species = Some(0);
        snapshot.species = vec![Species { id: 1, members: vec![two_node_genome()] }];
        let image = render_network(&snapshot, &Fonts::none(), 300, 120);
        assert!(image.pixels().any(|p| *p == POSITIVE_EDGE));
        assert!(!image.pixels().any(|p| *p == NEGATIVE_EDGE));
    }
}
