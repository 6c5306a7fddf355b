use image::Rgba;
use palette::{FromColor, Hsv, Srgb};

pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const FRAME_BACKGROUND: Rgba<u8> = Rgba([236, 236, 240, 255]);
pub const BORDER: Rgba<u8> = Rgba([40, 40, 48, 255]);
pub const TEXT: Rgba<u8> = Rgba([20, 20, 24, 255]);
pub const TARGET: Rgba<u8> = Rgba([220, 40, 40, 255]);
pub const AGENT: Rgba<u8> = Rgba([40, 70, 220, 255]);

pub const FPS_GOOD: Rgba<u8> = Rgba([20, 170, 40, 255]);
pub const FPS_FAIR: Rgba<u8> = Rgba([210, 170, 0, 255]);
pub const FPS_POOR: Rgba<u8> = Rgba([210, 30, 30, 255]);

/// Number of distinct species hues before colors repeat.
pub const SPECIES_HUES: usize = 8;

/// Readout color for a frames-per-second value.
pub fn fps_color(fps: f32) -> Rgba<u8> {
    if fps >= 60.0 {
        FPS_GOOD
    } else if fps >= 30.0 {
        FPS_FAIR
    } else {
        FPS_POOR
    }
}

/// Color for the species at `rank` among the unique ids on screen.
///
/// Keyed by rank, not id, so a handful of species always gets well separated hues.
pub fn species_color(rank: usize) -> [u8; 3] {
    let hue = (rank % SPECIES_HUES) as f32 * (360.0 / SPECIES_HUES as f32);
    // Alternate brightness once the hues wrap so repeats stay distinguishable
    let value = if (rank / SPECIES_HUES) % 2 == 0 { 0.85 } else { 0.6 };
    let rgb = Srgb::from_color(Hsv::new(hue, 0.75, value));
    [
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8,
    ]
}
