//! Numeric row extraction from simulator export text
//!
//! CST and AWR both export "text" files that are really whitespace or tab
//! separated tables with free-form headers, unit annotations and the odd
//! separator line. Only lines that carry at least two numbers are kept.

use once_cell::sync::Lazy;
use regex::Regex;

static FLOAT_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-+]?(?:\d*\.\d+|\d+)(?:[eE][-+]?\d+)?").expect("float token pattern is valid")
});

/// Numbers parsed from one line of text, in appearance order. Always at least two values.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericRow(Vec<f64>);

impl NumericRow {
    /// Parse a single line. Returns `None` when the line has no digit or fewer than two tokens.
    pub fn from_line(line: &str) -> Option<Self> {
        if !line.bytes().any(|b| b.is_ascii_digit()) {
            return None;
        }

        let values: Vec<f64> = FLOAT_TOKEN
            .find_iter(line)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .collect();

        if values.len() < 2 {
            return None;
        }
        Some(Self(values))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a constructed row; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }
}

/// Restartable view over the numeric rows of a text blob.
///
/// Nothing is parsed until `rows()` is iterated, and every call to `rows()`
/// starts again from the first line.
#[derive(Debug, Clone, Copy)]
pub struct NumericRows<'a> {
    text: &'a str,
}

impl<'a> NumericRows<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    pub fn rows(&self) -> impl Iterator<Item = NumericRow> + 'a {
        self.text.lines().filter_map(NumericRow::from_line)
    }

    /// The first `n` raw lines, used as the header candidate.
    pub fn head(&self, n: usize) -> impl Iterator<Item = &'a str> + 'a {
        self.text.lines().take(n)
    }
}

impl<'a> IntoIterator for NumericRows<'a> {
    type Item = NumericRow;
    type IntoIter = Box<dyn Iterator<Item = NumericRow> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.rows())
    }
}
