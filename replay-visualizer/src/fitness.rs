use image::RgbaImage;
use plotters::prelude::*;
use replay_common::HistorySeries;

use crate::fonts::{Fonts, PLOT_FONT_FAMILY};
use crate::plot::{padded_range, render_plot};

const AVG_COLOR: RGBColor = RGBColor(30, 90, 200);
const BEST_COLOR: RGBColor = RGBColor(220, 120, 20);

/// `(generation, value)` points with unrecorded values dropped.
pub fn series_points(generations: &[u32], values: &[f64]) -> Vec<(f64, f64)> {
    generations
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_finite())
        .map(|(g, v)| (*g as f64, *v))
        .collect()
}

/// Average and best raw fitness against generation id.
///
/// Returns `None` until at least one generation has been recorded.
pub fn render_fitness_chart(series: &HistorySeries, fonts: &Fonts, width: u32, height: u32) -> Option<RgbaImage> {
    if series.is_empty() {
        return None;
    }
    let avg = series_points(series.generations(), series.avg_fitness());
    let best = series_points(series.generations(), series.best_fitness());
    let (x_min, x_max) = match (series.generations().first(), series.generations().last()) {
        (Some(&first), Some(&last)) if last > first => (first as f64, last as f64),
        (Some(&first), _) => (first as f64 - 0.5, first as f64 + 0.5),
        _ => (0.0, 1.0),
    };
    let (y_min, y_max) = padded_range(avg.iter().chain(best.iter()).map(|p| p.1));
    let labelled = fonts.has_text();

    Some(render_plot("fitness", width, height, |area| {
        let mut builder = ChartBuilder::on(area);
        builder.margin(8);
        if labelled {
            builder
                .caption("Fitness", (PLOT_FONT_FAMILY, 16))
                .x_label_area_size(24)
                .y_label_area_size(40);
        }
        let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        if labelled {
            chart
                .configure_mesh()
                .x_desc("generation")
                .label_style((PLOT_FONT_FAMILY, 11))
                .x_labels(6)
                .y_labels(5)
                .draw()?;
        }

        chart
            .draw_series(LineSeries::new(avg, &AVG_COLOR))?
            .label("average")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], AVG_COLOR));
        chart
            .draw_series(LineSeries::new(best, &BEST_COLOR))?
            .label("best")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], BEST_COLOR));

        if labelled {
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
    use replay_common::{GenerationSnapshot, HistoryAggregator};

    fn snapshot(generation: u32, avg: Option<f64>, best: Option<f64>) -> GenerationSnapshot {
        let mut snap: GenerationSnapshot = serde_json::from_str("{}").unwrap();
        snap.generation = generation;
        snap.avg_raw_fit = avg;
        snap.best_raw_fit = best;
        snap
    }

    #[test]
    fn empty_history_has_no_chart() {
        let history = HistoryAggregator::new();
        assert!(render_fitness_chart(history.series(), &Fonts::none(), 300, 120).is_none());
    }

    #[test]
    fn chart_has_requested_size() {
        let mut history = HistoryAggregator::new();
        history.on_generation_changed(&snapshot(0, Some(1.0), Some(2.0)));
        history.on_generation_changed(&snapshot(20, Some(1.5), Some(4.0)));
        let image = render_fitness_chart(history.series(), &Fonts::none(), 300, 120).unwrap();
        assert_eq!(image.dimensions(), (300, 120));
    }

    #[test]
    fn unrecorded_values_are_skipped() {
        let points = series_points(&[0, 20, 40], &[1.0, f64::NAN, 3.0]);
        assert_eq!(points, vec![(0.0, 1.0), (40.0, 3.0)]);
    }
}
