use image::RgbaImage;
use plotters::prelude::*;
use replay_common::ConnectivitySample;
use std::collections::BTreeMap;

use crate::colors::{species_color, SPECIES_HUES};
use crate::fonts::{Fonts, PLOT_FONT_FAMILY};
use crate::plot::{padded_range, render_plot};

const POINT_SIZE: i32 = 3;
const CENTROID_SIZE: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Circle,
    Triangle,
    Cross,
}

/// Every sample of one species plus its centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesGroup {
    pub species_id: u32,
    /// Position among the unique species ids present, ascending.
    pub rank: usize,
    /// `(node count, connection count)` per genome.
    pub points: Vec<(f64, f64)>,
    pub centroid: (f64, f64),
}

impl SpeciesGroup {
    pub fn color(&self) -> RGBColor {
        let [r, g, b] = species_color(self.rank);
        RGBColor(r, g, b)
    }

    /// Shape changes each time the hues wrap around.
    pub fn shape(&self) -> MarkerShape {
        match (self.rank / SPECIES_HUES) % 3 {
            0 => MarkerShape::Circle,
            1 => MarkerShape::Triangle,
            _ => MarkerShape::Cross,
        }
    }
}

/// Groups `samples` by species id, in ascending id order.
pub fn species_groups(samples: &[ConnectivitySample]) -> Vec<SpeciesGroup> {
    let mut by_species: BTreeMap<u32, Vec<(f64, f64)>> = BTreeMap::new();
    for sample in samples {
        by_species
            .entry(sample.species_id)
            .or_default()
            .push((sample.node_count as f64, sample.connection_count as f64));
    }
    by_species
        .into_iter()
        .enumerate()
        .map(|(rank, (species_id, points))| {
            let n = points.len() as f64;
            let (sum_x, sum_y) = points.iter().fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
            SpeciesGroup {
                species_id,
                rank,
                centroid: (sum_x / n, sum_y / n),
                points,
            }
        })
        .collect()
}

/// Node count vs. connection count for every genome of the current generation.
///
/// Returns `None` when the generation has no genomes.
pub fn render_species_scatter(
    samples: &[ConnectivitySample],
    show_legend: bool,
    fonts: &Fonts,
    width: u32,
    height: u32,
) -> Option<RgbaImage> {
    if samples.is_empty() {
        return None;
    }
    let groups = species_groups(samples);
    let (x_min, x_max) = padded_range(samples.iter().map(|s| s.node_count as f64));
    let (y_min, y_max) = padded_range(samples.iter().map(|s| s.connection_count as f64));
    let labelled = fonts.has_text();

    Some(render_plot("species scatter", width, height, |area| {
        let mut builder = ChartBuilder::on(area);
        builder.margin(8);
        if labelled {
            builder
                .caption("Species connectivity", (PLOT_FONT_FAMILY, 16))
                .x_label_area_size(24)
                .y_label_area_size(40);
        }
        let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        if labelled {
            chart
                .configure_mesh()
                .x_desc("nodes")
                .y_desc("connections")
                .label_style((PLOT_FONT_FAMILY, 11))
                .x_labels(6)
                .y_labels(5)
                .draw()?;
        }

        for group in &groups {
            let color = group.color();
            let style = color.filled();
            let points = group.points.iter().copied();
            let anno = match group.shape() {
                MarkerShape::Circle => {
                    chart.draw_series(points.map(|p| Circle::new(p, POINT_SIZE, style)))?
                }
                MarkerShape::Triangle => {
                    chart.draw_series(points.map(|p| TriangleMarker::new(p, POINT_SIZE + 1, style)))?
                }
                MarkerShape::Cross => {
                    chart.draw_series(points.map(|p| Cross::new(p, POINT_SIZE, style)))?
                }
            };
            anno.label(format!("species {}", group.species_id))
                .legend(move |(x, y)| Circle::new((x + 6, y), POINT_SIZE, color.filled()));
        }

        // Centroids go on top so they stay visible over dense clusters
        for group in &groups {
            let color = group.color();
            chart.draw_series(std::iter::once(Circle::new(
                group.centroid,
                CENTROID_SIZE,
                BLACK.stroke_width(2),
            )))?;
            chart.draw_series(std::iter::once(Circle::new(group.centroid, CENTROID_SIZE - 2, color.filled())))?;
            if labelled {
                chart.draw_series(std::iter::once(Text::new(
                    group.species_id.to_string(),
                    group.centroid,
                    (PLOT_FONT_FAMILY, 12).into_font().color(&BLACK),
                )))?;
            }
        }

        if show_legend && labelled {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .label_font((PLOT_FONT_FAMILY, 11))
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }
        Ok(())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(species_id: u32, node_count: usize, connection_count: usize) -> ConnectivitySample {
        ConnectivitySample { species_id, node_count, connection_count }
    }

    #[test]
    fn centroid_is_mean_of_current_members() {
        let samples = [
            sample(9, 8, 12),
            sample(3, 10, 20),
            sample(9, 10, 16),
            sample(3, 12, 22),
            sample(9, 12, 14),
        ];
        let groups = species_groups(&samples);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].species_id, 3);
        assert_eq!(groups[0].centroid, (11.0, 21.0));
        assert_eq!(groups[1].species_id, 9);
        assert_eq!(groups[1].points.len(), 3);
        assert_eq!(groups[1].centroid, (10.0, 14.0));
    }

    #[test]
    fn colors_follow_rank_not_id() {
        let low = species_groups(&[sample(1000, 1, 1), sample(5000, 1, 1)]);
        let high = species_groups(&[sample(2, 1, 1), sample(3, 1, 1)]);
        assert_eq!(low[0].rank, 0);
        assert_eq!(low[1].rank, 1);
        assert_eq!(low[0].color(), high[0].color());
        assert_eq!(low[1].color(), high[1].color());
        assert_eq!(low[0].shape(), MarkerShape::Circle);
    }

    #[test]
    fn shapes_change_after_hues_wrap() {
        let samples: Vec<_> = (0..(SPECIES_HUES as u32 + 1)).map(|id| sample(id, 1, 1)).collect();
        let groups = species_groups(&samples);
        assert_eq!(groups[SPECIES_HUES].shape(), MarkerShape::Triangle);
    }

    #[test]
    fn empty_samples_have_no_chart() {
        assert!(render_species_scatter(&[], true, &Fonts::none(), 200, 100).is_none());
    }

    #[test]
    fn legend_and_labels_need_a_font() {
        let Some(fonts) = Fonts::system() else {
            eprintln!("no system font installed; skipping");
            return;
        };
        let samples = [sample(1, 5, 6), sample(1, 6, 8), sample(2, 7, 9)];
        let with_legend = render_species_scatter(&samples, true, &fonts, 320, 160).unwrap();
        let without_legend = render_species_scatter(&samples, false, &fonts, 320, 160).unwrap();
        assert_ne!(with_legend, without_legend);

        let unlabelled = render_species_scatter(&samples, false, &Fonts::none(), 320, 160).unwrap();
        assert_ne!(without_legend, unlabelled);
    }

    #[test]
    fn legend_toggle_renders_both_ways() {
        let samples = [sample(1, 5, 6), sample(2, 7, 9)];
        for legend in [true, false] {
            let image = render_species_scatter(&samples, legend, &Fonts::none(), 200, 100).unwrap();
            assert_eq!(image.dimensions(), (200, 100));
        }
    }
}
