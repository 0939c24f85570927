//! Line chart rendering and overlay alignment metadata
//!
//! The web page draws an interactive overlay (crosshair, markers) on top of
//! the server-rendered PNG. For that to line up, the client needs to know
//! where the data rectangle sits inside the image and which data range it
//! spans. Both are read from the chart object that drew the image.

use image::{ImageFormat, RgbImage};
use plotters::coord::ranged1d::Ranged;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::ops::Range;

use crate::error::RenderError;
use crate::frequency::frequency_dir_name;
use crate::glyph::GlyphBackend;
use crate::series::Series;

/// 6.2 x 4.0 inches at 140 dpi
pub const CANVAS: (u32, u32) = (868, 560);

const LINE_COLOR: RGBColor = RGBColor(0x1f, 0x7a, 0x8c);
const LINE_WIDTH: u32 = 2;

const MARGIN: u32 = 14;
const X_LABEL_AREA: u32 = 58;
const Y_LABEL_AREA: u32 = 84;
const TITLE_SIZE: f64 = 18.0;
const LABEL_SIZE: f64 = 14.0;
const DESC_SIZE: f64 = 15.0;
const X_TICKS: usize = 8;
const Y_TICKS: usize = 6;
const GRID_DASHES: usize = 48;

/// Fraction of the data span added on each side of the auto-scaled range
const AUTO_MARGIN: f64 = 0.05;

/// Margins around the data rectangle as fractions of the full image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Padding {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetadata {
    pub pad: Padding,
    pub xlim: [f64; 2],
    pub ylim: [f64; 2],
}

impl LayoutMetadata {
    /// Compute paddings from the data rectangle's pixel ranges on a canvas.
    ///
    /// Pixel rows grow downward, so `top` comes from the first row of the
    /// plotting area and `bottom` from the last.
    pub fn from_pixels(
        canvas: (u32, u32),
        x_px: Range<i32>,
        y_px: Range<i32>,
        xlim: [f64; 2],
        ylim: [f64; 2],
    ) -> Self {
        let width = (canvas.0 as f64).max(1.0);
        let height = (canvas.1 as f64).max(1.0);
        let clamp = |v: f64| v.clamp(0.0, 1.0);

        let pad = Padding {
            left: clamp(x_px.start as f64 / width),
            right: clamp(1.0 - x_px.end as f64 / width),
            top: clamp(y_px.start as f64 / height),
            bottom: clamp(1.0 - y_px.end as f64 / height),
        };
        Self { pad, xlim, ylim }
    }
}

/// PNG bytes plus the metadata describing the same render
#[derive(Debug, Clone)]
pub struct RenderedPlot {
    pub png: Vec<u8>,
    pub meta: LayoutMetadata,
}

/// Data range widened by a small margin; a flat range is opened up around its value.
///
/// Works from the midpoint and half-span so extreme but finite data does not
/// overflow. The result can still be unplottable (see `check_limits`).
pub fn auto_limits(values: &[f64]) -> (f64, f64) {
    let (min, max) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    if !min.is_finite() {
        return (-0.5, 0.5);
    }
    let half = max / 2.0 - min / 2.0;
    if half > 0.0 {
        let mid = min / 2.0 + max / 2.0;
        let widened = half * (1.0 + 2.0 * AUTO_MARGIN);
        (mid - widened, mid + widened)
    } else {
        let delta = if min != 0.0 { min.abs() * AUTO_MARGIN } else { 0.5 };
        (min - delta, max + delta)
    }
}

/// Axis ranges whose bounds or width are not finite make tick generation diverge.
fn check_limits(axis: &str, (lo, hi): (f64, f64)) -> Result<(f64, f64), RenderError> {
    if lo.is_finite() && hi.is_finite() && (hi - lo).is_finite() && hi > lo {
        Ok((lo, hi))
    } else {
        Err(RenderError::Range(format!("{} axis spans {}..{}", axis, lo, hi)))
    }
}

/// Chart title; the frequency is written the way export folders are named
pub fn title_for(y_label: &str, freq_ghz: Option<f64>) -> String {
    match freq_ghz {
        Some(f) => format!("{} - {} GHz", y_label, frequency_dir_name(Some(f))),
        None => y_label.to_string(),
    }
}

fn backend_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Backend(e.to_string())
}

/// Evenly spaced dash segments between two values
fn dashes(from: f64, to: f64) -> impl Iterator<Item = (f64, f64)> {
    let step = (to - from) / (GRID_DASHES * 2) as f64;
    (0..GRID_DASHES).map(move |i| {
        let start = from + step * (2 * i) as f64;
        (start, start + step)
    })
}

/// Render a series to PNG and describe where its axes landed.
///
/// Callers must not pass an empty series; that case is reported upstream as no data.
pub fn render(series: &Series, freq_ghz: Option<f64>) -> Result<RenderedPlot, RenderError> {
    let (x0, x1) = check_limits("x", auto_limits(&series.xs))?;
    let (y0, y1) = check_limits("y", auto_limits(&series.ys))?;
    let points: Vec<(f64, f64)> = series
        .points()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();

    let (width, height) = CANVAS;
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    let title = title_for(series.y_label, freq_ghz);

    let meta = {
        let root = GlyphBackend::new(BitMapBackend::with_buffer(&mut buffer, CANVAS)).into_drawing_area();
        root.fill(&WHITE).map_err(backend_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, ("sans-serif", TITLE_SIZE))
            .margin(MARGIN)
            .x_label_area_size(X_LABEL_AREA)
            .y_label_area_size(Y_LABEL_AREA)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(backend_err)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(X_TICKS)
            .y_labels(Y_TICKS)
            .x_desc(series.x_label)
            .y_desc(series.y_label)
            .label_style(("sans-serif", LABEL_SIZE))
            .axis_desc_style(("sans-serif", DESC_SIZE))
            .draw()
            .map_err(backend_err)?;

        // Light dashed grid on the same key points as the tick labels
        let grid = BLACK.mix(0.25).stroke_width(1);
        let x_keys = chart.as_coord_spec().x_spec().key_points(X_TICKS);
        let y_keys = chart.as_coord_spec().y_spec().key_points(Y_TICKS);
        for x in x_keys {
            chart
                .draw_series(dashes(y0, y1).map(|(a, b)| PathElement::new(vec![(x, a), (x, b)], grid)))
                .map_err(backend_err)?;
        }
        for y in y_keys {
            chart
                .draw_series(dashes(x0, x1).map(|(a, b)| PathElement::new(vec![(a, y), (b, y)], grid)))
                .map_err(backend_err)?;
        }

        chart
            .draw_series(LineSeries::new(points, LINE_COLOR.stroke_width(LINE_WIDTH)))
            .map_err(backend_err)?;

        let (x_px, y_px) = chart.plotting_area().get_pixel_range();
        let xr = chart.plotting_area().get_x_range();
        let yr = chart.plotting_area().get_y_range();
        let meta = LayoutMetadata::from_pixels(CANVAS, x_px, y_px, [xr.start, xr.end], [yr.start, yr.end]);

        root.present().map_err(backend_err)?;
        meta
    };

    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| RenderError::Backend("canvas buffer size mismatch".to_string()))?;
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

    Ok(RenderedPlot { png, meta })
}
