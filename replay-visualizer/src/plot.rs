use image::{DynamicImage, RgbImage, RgbaImage};
use log::warn;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_bitmap::{BitMapBackend, BitMapBackendError};

pub(crate) type PlotResult = Result<(), DrawingAreaErrorKind<BitMapBackendError>>;

/// Rasterizes a plotters chart into an RGBA panel.
///
/// Plotting failures are logged and leave a blank panel.
pub(crate) fn render_plot<F>(name: &str, width: u32, height: u32, draw: F) -> RgbaImage
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> PlotResult,
{
    let mut buffer = vec![255u8; width as usize * height as usize * 3];
    {
        let area = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        let result = area
            .fill(&WHITE)
            .and_then(|_| draw(&area))
            .and_then(|_| area.present());
        if let Err(err) = result {
            warn!("{} panel failed to render: {:?}", name, err);
        }
    }
    match RgbImage::from_raw(width, height, buffer) {
        Some(rgb) => DynamicImage::ImageRgb8(rgb).to_rgba8(),
        None => RgbaImage::new(width, height),
    }
}

/// Axis range covering `values` with a small margin; degenerate input gets a unit span.
pub(crate) fn padded_range<I: IntoIterator<Item = f64>>(values: I) -> (f64, f64) {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    if span <= f64::EPSILON {
        return (min - 0.5, max + 0.5);
    }
    let pad = span * 0.05;
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_range_skips_nan() {
        let (lo, hi) = padded_range([f64::NAN, 0.0, 10.0]);
        assert!((lo + 0.5).abs() < 1e-9);
        assert!((hi - 10.5).abs() < 1e-9);
    }

    #[test]
    fn padded_range_handles_single_value() {
        assert_eq!(padded_range([3.0]), (2.5, 3.5));
        assert_eq!(padded_range(Vec::<f64>::new()), (0.0, 1.0));
    }
}
