use image::RgbaImage;
use replay_common::GenerationSnapshot;
use std::fmt::Display;

use crate::colors;
use crate::fonts::Fonts;

/// Shown in place of a statistic the trainer did not record.
pub const PLACEHOLDER: &str = "N/A";

const TEXT_PX: f32 = 18.0;
const LINE_SPACING: f32 = 1.6;

fn field<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| v.to_string())
}

fn fitness(value: Option<f64>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_string(), |v| format!("{:.3}", v))
}

/// The generation header followed by the nine recorded statistics, top to bottom.
pub fn stats_lines(snapshot: &GenerationSnapshot) -> Vec<String> {
    // champSpecies is an index; show the id it points at
    let champion_species = snapshot
        .champ_species
        .and_then(|index| snapshot.species.get(index))
        .map(|species| species.id);
    vec![
        format!("Generation: {}", snapshot.generation),
        format!("Avg raw fitness: {}", fitness(snapshot.avg_raw_fit)),
        format!("Best raw fitness: {}", fitness(snapshot.best_raw_fit)),
        format!("Best adj fitness: {}", fitness(snapshot.best_adj_fit)),
        format!("Worst raw fitness: {}", fitness(snapshot.worst_raw_fit)),
        format!("Worst adj fitness: {}", fitness(snapshot.worst_adj_fit)),
        format!("Best species: {}", field(snapshot.best_species)),
        format!("Worst species: {}", field(snapshot.worst_species)),
        format!("Gens since improvement: {}", field(snapshot.gens_since_innovation)),
        format!("Champion species: {}", field(champion_species)),
    ]
}

/// Renders the statistics as centered lines, leaving room above for the FPS readout.
pub fn render_stats(fonts: &Fonts, snapshot: &GenerationSnapshot, width: u32, height: u32) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, colors::BACKGROUND);
    let lines = stats_lines(snapshot);
    let line_height = TEXT_PX * LINE_SPACING;
    let block = line_height * lines.len() as f32;
    let top = ((height as f32 - block) / 2.0).max(TEXT_PX * 2.0);
    let center_x = (width / 2) as i32;
    for (i, line) in lines.iter().enumerate() {
        let y = (top + i as f32 * line_height) as i32;
        fonts.draw_centered(&mut image, colors::TEXT, center_x, y, TEXT_PX, line);
    }
    image
}
