use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use replay_common::{Constants, GenerationSnapshot, ReplayFrame, Vec2};

use crate::colors;

/// One replay frame projected into top-origin panel pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentScene {
    pub target_center: Vec2,
    pub target_radius: f32,
    pub agent: [Vec2; 3],
}

/// Projects `frame` onto a `width x height` panel showing the whole environment.
///
/// The trainer records y upwards from the floor; the panel draws y downwards.
pub fn project_frame(constants: &Constants, frame: &ReplayFrame, width: u32, height: u32) -> EnvironmentScene {
    let sx = width as f32 / constants.env_width;
    let sy = height as f32 / constants.env_height;
    let to_panel = |p: Vec2| {
        let flipped = p.flip_y(constants.env_height);
        Vec2::new(flipped.x * sx, flipped.y * sy)
    };
    EnvironmentScene {
        target_center: to_panel(frame.target()),
        target_radius: constants.target_radius * sx.min(sy),
        agent: frame.agent_vertices(constants).map(to_panel),
    }
}

/// Renders the environment at `frame_index` of `snapshot`.
///
/// An out-of-range index (playback past the last frame) leaves only the bounds.
pub fn render_environment(
    constants: &Constants,
    snapshot: &GenerationSnapshot,
    frame_index: usize,
    width: u32,
    height: u32,
) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(width, height, colors::BACKGROUND);
    if width > 1 && height > 1 {
        draw_hollow_rect_mut(&mut image, Rect::at(0, 0).of_size(width, height), colors::BORDER);
    }

    if let Some(frame) = snapshot.frame(frame_index) {
        let scene = project_frame(constants, frame, width, height);
        let center = (
            scene.target_center.x.round() as i32,
            scene.target_center.y.round() as i32,
        );
        draw_filled_circle_mut(&mut image, center, scene.target_radius.round().max(1.0) as i32, colors::TARGET);
        fill_triangle(&mut image, &scene.agent, colors::AGENT);
    }
    image
}

fn fill_triangle(image: &mut RgbaImage, vertices: &[Vec2; 3], color: Rgba<u8>) {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(3);
    for v in vertices {
        let p = Point::new(v.x.round() as i32, v.y.round() as i32);
        if !points.contains(&p) {
            points.push(p);
        }
    }
    // draw_polygon_mut rejects polygons whose first and last points coincide
    if points.len() == 3 {
        draw_polygon_mut(image, &points, color);
    }
}
