use image::imageops::overlay;
use image::RgbaImage;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use log::debug;
use replay_common::{ConnectivitySample, Constants, GenerationSnapshot, HistorySeries};

use crate::colors;
use crate::environment::render_environment;
use crate::fitness::render_fitness_chart;
use crate::fonts::Fonts;
use crate::network::render_network;
use crate::scatter::render_species_scatter;
use crate::stats::render_stats;

const BORDER_PX: u32 = 2;
const FPS_TEXT_PX: f32 = 16.0;

/// Top-left corner and size of one panel inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Three columns: environment, stats, and the stacked charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub frame_width: u32,
    pub frame_height: u32,
    pub environment: PanelRect,
    pub stats: PanelRect,
    pub fitness: PanelRect,
    pub scatter: PanelRect,
    pub network: PanelRect,
}

fn round_up_even(v: u32) -> u32 {
    v + (v % 2)
}

impl Layout {
    /// Sizes every panel from the environment size. Frame dimensions are even so
    /// the frame can be encoded as YUV420.
    pub fn from_constants(constants: &Constants) -> Self {
        let w = (constants.env_width.round() as u32).max(2);
        let h = (constants.env_height.round() as u32).max(3);
        let stats_w = (w / 2).max(1);
        let chart_h = h / 3;
        let chart_x = w + stats_w;
        Layout {
            frame_width: round_up_even(chart_x + w),
            frame_height: round_up_even(h),
            environment: PanelRect { x: 0, y: 0, width: w, height: h },
            stats: PanelRect { x: w, y: 0, width: stats_w, height: h },
            fitness: PanelRect { x: chart_x, y: 0, width: w, height: chart_h },
            scatter: PanelRect { x: chart_x, y: chart_h, width: w, height: chart_h },
            network: PanelRect { x: chart_x, y: 2 * chart_h, width: w, height: h - 2 * chart_h },
        }
    }
}

/// Everything a frame is drawn from.
pub struct PanelInputs<'a> {
    pub snapshot: &'a GenerationSnapshot,
    pub frame_index: usize,
    pub series: &'a HistorySeries,
    pub samples: &'a [ConnectivitySample],
    pub show_legend: bool,
    pub fps: f32,
}

/// Chart panels survive across ticks until the generation or legend changes.
#[derive(Default)]
struct PanelCache {
    generation: Option<u32>,
    legend: Option<bool>,
    fitness: Option<RgbaImage>,
    scatter: Option<RgbaImage>,
    network: Option<RgbaImage>,
}

/// Lays panel images into one frame buffer.
pub struct FrameCompositor {
    constants: Constants,
    layout: Layout,
    fonts: Fonts,
    cache: PanelCache,
    frame: RgbaImage,
    chart_renders: u64,
}

impl FrameCompositor {
    pub fn new(constants: Constants, fonts: Fonts) -> Self {
        let layout = Layout::from_constants(&constants);
        let frame = RgbaImage::from_pixel(layout.frame_width, layout.frame_height, colors::FRAME_BACKGROUND);
        FrameCompositor {
            constants,
            layout,
            fonts,
            cache: PanelCache::default(),
            frame,
            chart_renders: 0,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// How many times the chart column has been redrawn.
    pub fn chart_renders(&self) -> u64 {
        self.chart_renders
    }

    /// Draws one frame and returns it.
    pub fn compose(&mut self, inputs: &PanelInputs<'_>) -> &RgbaImage {
        self.refresh_charts(inputs);
        let layout = self.layout;

        for pixel in self.frame.pixels_mut() {
            *pixel = colors::FRAME_BACKGROUND;
        }
        self.draw_borders();

        let environment = render_environment(
            &self.constants,
            inputs.snapshot,
            inputs.frame_index,
            layout.environment.width,
            layout.environment.height,
        );
        blit(&mut self.frame, &environment, layout.environment);

        let stats = render_stats(&self.fonts, inputs.snapshot, layout.stats.width, layout.stats.height);
        blit(&mut self.frame, &stats, layout.stats);

        if let Some(image) = &self.cache.fitness {
            blit(&mut self.frame, image, layout.fitness);
        }
        if let Some(image) = &self.cache.scatter {
            blit(&mut self.frame, image, layout.scatter);
        }
        if let Some(image) = &self.cache.network {
            blit(&mut self.frame, image, layout.network);
        }

        let fps_text = format!("FPS: {:.0}", inputs.fps);
        self.fonts.draw(
            &mut self.frame,
            colors::fps_color(inputs.fps),
            (layout.stats.x + 8) as i32,
            (layout.stats.y + 6) as i32,
            FPS_TEXT_PX,
            &fps_text,
        );
        &self.frame
    }

    fn refresh_charts(&mut self, inputs: &PanelInputs<'_>) {
        let layout = self.layout;
        let generation_changed = self.cache.generation != Some(inputs.snapshot.generation);
        if generation_changed {
            debug!("Rendering chart panels for generation {}", inputs.snapshot.generation);
            self.cache.fitness = render_fitness_chart(inputs.series, &self.fonts, layout.fitness.width, layout.fitness.height);
            self.cache.network = Some(render_network(inputs.snapshot, &self.fonts, layout.network.width, layout.network.height));
            self.cache.generation = Some(inputs.snapshot.generation);
            self.chart_renders += 1;
        }
        if generation_changed || self.cache.legend != Some(inputs.show_legend) {
            self.cache.scatter = render_species_scatter(
                inputs.samples,
                inputs.show_legend,
                &self.fonts,
                layout.scatter.width,
                layout.scatter.height,
            );
            self.cache.legend = Some(inputs.show_legend);
        }
    }

    fn draw_borders(&mut self) {
        let l = self.layout;
        let h = l.frame_height;
        for x in [l.stats.x, l.fitness.x] {
            let left = x.saturating_sub(BORDER_PX / 2) as i32;
            draw_filled_rect_mut(&mut self.frame, Rect::at(left, 0).of_size(BORDER_PX, h), colors::BORDER);
        }
        for y in [l.scatter.y, l.network.y] {
            let top = y.saturating_sub(BORDER_PX / 2) as i32;
            draw_filled_rect_mut(
                &mut self.frame,
                Rect::at(l.fitness.x as i32, top).of_size(l.fitness.width, BORDER_PX),
                colors::BORDER,
            );
        }
    }
}

/// Copies `panel` into `frame`, inset by the border so the layout lines stay visible.
fn blit(frame: &mut RgbaImage, panel: &RgbaImage, rect: PanelRect) {
    let inset = if rect.x == 0 { 0 } else { BORDER_PX / 2 };
    overlay(frame, panel, (rect.x + inset) as i64, rect.y as i64);
}
