//! Column selection: which values of a numeric row are x and y, and what they mean

use crate::error::NoData;
use crate::kind::y_label_for;
use crate::parse::NumericRows;

pub const FREQUENCY_AXIS: &str = "Frequency (GHz)";
pub const ANGLE_AXIS: &str = "Angle (degrees)";

/// Header lines inspected for column hints
const HEADER_LINES: usize = 3;

/// Far-field exports list theta, phi and then the magnitude columns
const MAGNITUDE_MARKERS: [&str; 3] = ["abs(gain)", "abs(theta)", "abs(phi)"];

/// An (x, y) series extracted from one export file
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub x_label: &'static str,
    pub y_label: &'static str,
}

impl Series {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }
}

/// Column layout decided from the header and row widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub x: usize,
    pub y: usize,
    pub x_label: &'static str,
}

impl Columns {
    pub fn detect(header: &str, widest_row: usize) -> Self {
        let header = header.to_lowercase();
        let x_label = if header.contains("theta") || header.contains("angle") {
            ANGLE_AXIS
        } else {
            FREQUENCY_AXIS
        };
        let magnitude = MAGNITUDE_MARKERS.iter().any(|m| header.contains(m));
        let y = if magnitude && widest_row >= 3 { 2 } else { 1 };
        Self { x: 0, y, x_label }
    }
}

/// Build a series from export text. `name` is the file name (or kind) used for the y label.
pub fn select_series(text: &str, name: &str) -> Result<Series, NoData> {
    let view = NumericRows::new(text);
    let header = view.head(HEADER_LINES).collect::<Vec<_>>().join(" ");
    let rows: Vec<_> = view.rows().collect();

    let widest = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let columns = Columns::detect(&header, widest);
    let needed = columns.x.max(columns.y);

    let (xs, ys): (Vec<f64>, Vec<f64>) = rows
        .iter()
        .filter(|row| row.len() > needed)
        .map(|row| (row.values()[columns.x], row.values()[columns.y]))
        // Overflowing literals such as 1e999 parse to infinity
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();

    if xs.is_empty() {
        return Err(NoData(name.to_string()));
    }

    Ok(Series {
        xs,
        ys,
        x_label: columns.x_label,
        y_label: y_label_for(name),
    })
}
