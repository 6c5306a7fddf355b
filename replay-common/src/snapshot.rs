use serde::{Deserialize, Serialize};

use crate::error::ChampionError;
use crate::vecmath::{heading_to_vec, Vec2};

fn default_rocket_base() -> f32 {
    40.0
}

fn default_rocket_height() -> f32 {
    70.0
}

/// Run-wide constants written once by the trainer (`constants.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constants {
    /// Environment width in world units.
    #[serde(rename = "ENV_WIDTH")]
    pub env_width: f32,
    /// Environment height in world units. World y grows upwards from 0 to this value.
    #[serde(rename = "ENV_HEIGHT")]
    pub env_height: f32,
    #[serde(rename = "TARGET_RADIUS")]
    pub target_radius: f32,
    /// Width of the agent triangle's base.
    #[serde(rename = "ROCKET_BASE", default = "default_rocket_base")]
    pub rocket_base: f32,
    /// Distance from the agent triangle's base to its tip.
    #[serde(rename = "ROCKET_HEIGHT", default = "default_rocket_height")]
    pub rocket_height: f32,
}

/// The recorded state of one evolutionary generation (`gen_<N>.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSnapshot {
    /// Generation index. Filled in from the file name when the record omits it.
    #[serde(alias = "genNum", default)]
    pub generation: u32,
    pub avg_raw_fit: Option<f64>,
    pub best_raw_fit: Option<f64>,
    pub best_adj_fit: Option<f64>,
    pub worst_raw_fit: Option<f64>,
    pub worst_adj_fit: Option<f64>,
    /// Species id of the best performing species.
    pub best_species: Option<u32>,
    /// Species id of the worst performing species.
    pub worst_species: Option<u32>,
    pub gens_since_innovation: Option<u32>,
    /// Index into `species` (not a species id) of the champion's species.
    pub champ_species: Option<usize>,
    /// The champion's trajectory, one entry per simulated time step.
    #[serde(default)]
    pub replay: Vec<ReplayFrame>,
    #[serde(default)]
    pub species: Vec<Species>,
}

impl GenerationSnapshot {
    /// The champion genome: the first member of the champion species.
    ///
    /// The trainer stores its champion at member index 0 of its species; a snapshot
    /// that breaks this shape is reported instead of indexed blindly.
    pub fn champion(&self) -> Result<&Member, ChampionError> {
        let index = self.champ_species.ok_or(ChampionError::NoChampionIndex {
            generation: self.generation,
        })?;
        let species = self
            .species
            .get(index)
            .ok_or(ChampionError::SpeciesOutOfRange {
                generation: self.generation,
                index,
                count: self.species.len(),
            })?;
        species.members.first().ok_or(ChampionError::EmptySpecies {
            generation: self.generation,
            species_id: species.id,
        })
    }

    pub fn frame(&self, index: usize) -> Option<&ReplayFrame> {
        self.replay.get(index)
    }

    pub fn frame_count(&self) -> usize {
        self.replay.len()
    }

    pub fn population(&self) -> usize {
        self.species.iter().map(|s| s.members.len()).sum()
    }
}

/// One simulated time step of the champion's run, in bottom-origin world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayFrame {
    #[serde(default)]
    pub frame: Option<u32>,
    /// Heading in math degrees (90 points up).
    #[serde(default)]
    pub rotation: f32,
    pub rocket_x: f32,
    pub rocket_y: f32,
    pub target_x: f32,
    pub target_y: f32,
    /// Triangle vertices as recorded by the trainer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<[[f32; 2]; 3]>,
}

impl ReplayFrame {
    pub fn rocket(&self) -> Vec2 {
        Vec2::new(self.rocket_x, self.rocket_y)
    }

    pub fn target(&self) -> Vec2 {
        Vec2::new(self.target_x, self.target_y)
    }

    /// The agent triangle in world coordinates.
    ///
    /// Uses the recorded vertices when present, otherwise rebuilds the triangle from
    /// position and heading: tip half a height ahead, base half a height behind.
    pub fn agent_vertices(&self, constants: &Constants) -> [Vec2; 3] {
        if let Some(v) = self.vertices {
            return v.map(|[x, y]| Vec2::new(x, y));
        }
        let heading = heading_to_vec(self.rotation);
        let across = heading.perpendicular();
        let half_height = constants.rocket_height / 2.0;
        let half_base = constants.rocket_base / 2.0;
        let center = self.rocket();
        let base_center = center - heading * half_height;
        [
            center + heading * half_height,
            base_center + across * half_base,
            base_center - across * half_base,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub id: u32,
    #[serde(default)]
    pub members: Vec<Member>,
}

/// A genome: nodes plus weighted, directed connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<f64>,
}

impl Member {
    pub fn enabled_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(|c| c.is_enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: NodeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "NodeTypeRepr")]
pub enum NodeType {
    Input,
    Output,
    Hidden,
    Bias,
}

/// Node types arrive either as the trainer's integer tag or as a name.
#[derive(Deserialize)]
#[serde(untagged)]
enum NodeTypeRepr {
    Tag(u8),
    Name(String),
}

impl TryFrom<NodeTypeRepr> for NodeType {
    type Error = String;

    fn try_from(repr: NodeTypeRepr) -> Result<Self, Self::Error> {
        match repr {
            NodeTypeRepr::Tag(0) => Ok(NodeType::Input),
            NodeTypeRepr::Tag(1) => Ok(NodeType::Output),
            NodeTypeRepr::Tag(2) => Ok(NodeType::Hidden),
            NodeTypeRepr::Tag(3) => Ok(NodeType::Bias),
            NodeTypeRepr::Tag(other) => Err(format!("unknown node type tag {}", other)),
            NodeTypeRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "input" => Ok(NodeType::Input),
                "output" => Ok(NodeType::Output),
                "hidden" => Ok(NodeType::Hidden),
                "bias" => Ok(NodeType::Bias),
                _ => Err(format!("unknown node type '{}'", name)),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub in_id: u32,
    pub out_id: u32,
    pub weight: f64,
    #[serde(alias = "enabled")]
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub innov_id: Option<u32>,
}
