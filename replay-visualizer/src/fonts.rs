use ab_glyph::{FontRef, PxScale};
use anyhow::{Context, Result};
use fontdb::{Database, Family, Query};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use log::{info, warn};
use plotters::style::FontStyle;
use std::path::Path;
use std::sync::OnceLock;

/// Family name the chart panels ask plotters for.
pub const PLOT_FONT_FAMILY: &str = "sans-serif";

/// System families tried in order before any installed face is accepted.
const SYSTEM_FAMILIES: &[&str] = &["DejaVu Sans", "Liberation Sans", "Noto Sans", "Arial", "Helvetica", "Verdana"];

static SYSTEM_FACE: OnceLock<Option<(&'static [u8], u32)>> = OnceLock::new();

/// The single typeface shared by every panel.
///
/// Without one, panels still render but omit their text.
#[derive(Clone, Default)]
pub struct Fonts {
    face: Option<FontRef<'static>>,
}

impl Fonts {
    pub fn none() -> Self {
        Fonts { face: None }
    }

    /// The configured font if it loads, else an installed sans-serif face, else no text.
    pub fn resolve(path: Option<&Path>) -> Self {
        if let Some(path) = path {
            match Fonts::load(path) {
                Ok(fonts) => return fonts,
                Err(e) => warn!("{:#}; falling back to a system font", e),
            }
        }
        match Fonts::system() {
            Some(fonts) => fonts,
            None => {
                warn!("No usable font found; panels will be drawn without text");
                Fonts::none()
            }
        }
    }

    /// Loads a TTF/OTF file and registers it with plotters under [`PLOT_FONT_FAMILY`].
    ///
    /// The font bytes live for the rest of the process.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file: {}", path.display()))?;
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        let fonts = Fonts::from_bytes(bytes, 0, &path.display().to_string())?;
        info!("Loaded font from {}", path.display());
        Ok(fonts)
    }

    /// An installed sans-serif face found through the system font database.
    ///
    /// The database is scanned once per process.
    pub fn system() -> Option<Self> {
        let (bytes, index) = (*SYSTEM_FACE.get_or_init(find_system_face))?;
        match Fonts::from_bytes(bytes, index, "system font") {
            Ok(fonts) => Some(fonts),
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        }
    }

    fn from_bytes(bytes: &'static [u8], index: u32, label: &str) -> Result<Self> {
        let face = FontRef::try_from_slice_and_index(bytes, index)
            .map_err(|e| anyhow::anyhow!("Failed to parse font '{}': {}", label, e))?;
        plotters::style::register_font(PLOT_FONT_FAMILY, FontStyle::Normal, bytes)
            .map_err(|_| anyhow::anyhow!("Failed to register font '{}' for charts", label))?;
        Ok(Fonts { face: Some(face) })
    }

    pub fn has_text(&self) -> bool {
        self.face.is_some()
    }

    pub fn text_width(&self, size_px: f32, text: &str) -> u32 {
        match &self.face {
            Some(face) => text_size(PxScale::from(size_px), face, text).0,
            None => 0,
        }
    }

    pub fn draw(&self, image: &mut RgbaImage, color: Rgba<u8>, x: i32, y: i32, size_px: f32, text: &str) {
        if let Some(face) = &self.face {
            draw_text_mut(image, color, x, y, PxScale::from(size_px), face, text);
        }
    }

    /// Draws `text` horizontally centered on `center_x`.
    pub fn draw_centered(&self, image: &mut RgbaImage, color: Rgba<u8>, center_x: i32, y: i32, size_px: f32, text: &str) {
        let half = (self.text_width(size_px, text) / 2) as i32;
        self.draw(image, color, center_x - half, y, size_px, text);
    }
}

fn find_system_face() -> Option<(&'static [u8], u32)> {
    let mut db = Database::new();
    db.load_system_fonts();
    let families: Vec<Family<'_>> = SYSTEM_FAMILIES
        .iter()
        .map(|&name| Family::Name(name))
        .chain(std::iter::once(Family::SansSerif))
        .collect();
    let query = Query {
        families: &families,
        ..Query::default()
    };
    let id = db.query(&query).or_else(|| db.faces().next().map(|face| face.id))?;
    let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
    info!("Using system font {:?} for panel text", db.face(id).map(|face| face.post_script_name.as_str()));
    Some((Box::leak(bytes.into_boxed_slice()), index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_file_falls_back() {
        let fonts = Fonts::resolve(Some(Path::new("/nonexistent/font.ttf")));
        assert_eq!(fonts.has_text(), Fonts::system().is_some());
    }

    #[test]
    fn no_font_measures_nothing() {
        let fonts = Fonts::none();
        assert_eq!(fonts.text_width(16.0, "FPS: 60"), 0);
        let mut image = RgbaImage::new(20, 10);
        fonts.draw(&mut image, Rgba([255, 0, 0, 255]), 0, 0, 12.0, "x");
        assert!(image.pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn system_font_draws_text() {
        let Some(fonts) = Fonts::system() else {
            eprintln!("no system font installed; skipping");
            return;
        };
        assert!(fonts.text_width(16.0, "Generation") > 0);
        let mut image = RgbaImage::from_pixel(120, 30, Rgba([255, 255, 255, 255]));
        fonts.draw(&mut image, Rgba([0, 0, 0, 255]), 2, 2, 18.0, "Generation");
        assert!(image.pixels().any(|p| p.0 != [255, 255, 255, 255]));
    }
}
