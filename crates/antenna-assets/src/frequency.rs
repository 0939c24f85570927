//! Supported frequencies, simulation sources and per-source folder naming
//!
//! Each tool names its per-frequency export folders its own way: CST uses a
//! decimal point and usually a "GHZ" suffix, AWR uses a decimal comma. Older
//! exports were filed under slightly different labels, so every frequency maps
//! to an ordered list of candidates rather than one name.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseKeyError;

/// One of the operating frequencies reference data exists for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrequencyKey {
    F1_8,
    F2_2,
    F2_3,
    F2_4,
    F3_3,
}

impl FrequencyKey {
    pub const ALL: [FrequencyKey; 5] = [
        FrequencyKey::F1_8,
        FrequencyKey::F2_2,
        FrequencyKey::F2_3,
        FrequencyKey::F2_4,
        FrequencyKey::F3_3,
    ];

    pub fn ghz(&self) -> f64 {
        match self {
            FrequencyKey::F1_8 => 1.8,
            FrequencyKey::F2_2 => 2.2,
            FrequencyKey::F2_3 => 2.3,
            FrequencyKey::F2_4 => 2.4,
            FrequencyKey::F3_3 => 3.3,
        }
    }

    /// Exact match against the closed set; nothing is rounded to a neighbour.
    pub fn from_ghz(value: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| (k.ghz() - value).abs() < 1e-9)
    }

    /// "2.4" -> "2_4", the suffix used by the per-frequency page images
    pub fn image_suffix(&self) -> String {
        self.to_string().replace('.', "_")
    }
}

impl fmt::Display for FrequencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.ghz())
    }
}

impl FromStr for FrequencyKey {
    type Err = ParseKeyError;

    /// Accepts "2.4", "2,4", "2_4" and an optional "GHz" suffix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned = s.trim().to_lowercase();
        let cleaned = cleaned.trim_end_matches("ghz").trim().replace([',', '_'], ".");
        cleaned
            .parse::<f64>()
            .ok()
            .and_then(Self::from_ghz)
            .ok_or_else(|| ParseKeyError::Frequency(s.to_string()))
    }
}

impl Serialize for FrequencyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.ghz())
    }
}

/// Simulation tool that produced an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    #[serde(rename = "CST")]
    Cst,
    #[serde(rename = "AWR")]
    Awr,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Cst, Source::Awr];

    /// Top-level folder name in the export collection
    pub fn folder(&self) -> &'static str {
        match self {
            Source::Cst => "CST",
            Source::Awr => "AWR",
        }
    }

    pub fn directory_table(&self) -> &'static DirectoryTable {
        match self {
            Source::Cst => &CST_DIRECTORIES,
            Source::Awr => &AWR_DIRECTORIES,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

impl FromStr for Source {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CST" => Ok(Source::Cst),
            "AWR" => Ok(Source::Awr),
            _ => Err(ParseKeyError::Source(s.to_string())),
        }
    }
}

// ===========================

/// Static frequency -> folder-name candidates for one source
#[derive(Debug)]
pub struct DirectoryTable {
    entries: &'static [(FrequencyKey, &'static [&'static str])],
}

impl DirectoryTable {
    pub const fn new(entries: &'static [(FrequencyKey, &'static [&'static str])]) -> Self {
        Self { entries }
    }

    /// Candidates in the order they should be tried, `None` when the frequency is unmapped
    pub fn candidates(&self, freq: FrequencyKey) -> Option<&'static [&'static str]> {
        self.entries
            .iter()
            .find(|(key, _)| *key == freq)
            .map(|(_, dirs)| *dirs)
            .filter(|dirs| !dirs.is_empty())
    }
}

pub static CST_DIRECTORIES: DirectoryTable = DirectoryTable::new(&[
    (FrequencyKey::F1_8, &["1.8 GHZ", "1.8 GHz", "1.8"]),
    (FrequencyKey::F2_2, &["2.2 GHZ", "2.2 GHz", "2.2"]),
    (FrequencyKey::F2_3, &["2.3 GHZ", "2.3 GHz", "2.3"]),
    (FrequencyKey::F2_4, &["2.4 GHZ", "2.4 GHz", "2.4", "2.45 GHZ"]),
    (FrequencyKey::F3_3, &["3.3 GHZ", "3.3 GHz", "3.3"]),
]);

pub static AWR_DIRECTORIES: DirectoryTable = DirectoryTable::new(&[
    (FrequencyKey::F1_8, &["1,8 GHz", "1,8 GHZ", "1,8"]),
    (FrequencyKey::F2_2, &["2,2 GHz", "2,2 GHZ", "2,2"]),
    (FrequencyKey::F2_3, &["2,3 GHz", "2,3 GHZ", "2,3"]),
    (FrequencyKey::F2_4, &["2,4 GHz", "2,4 GHZ", "2,4"]),
    (FrequencyKey::F3_3, &["3,3 GHz", "3,3 GHZ", "3,3", "3,30 GHz"]),
]);

/// Resolve the folder prefixes (`"<source>/<dir>"`) to try for a frequency
pub fn resolve_directories(freq: FrequencyKey, source: Source) -> Option<Vec<String>> {
    source.directory_table().candidates(freq).map(|dirs| {
        dirs.iter()
            .map(|dir| format!("{}/{}", source.folder(), dir))
            .collect()
    })
}

// ===========================

static PATH_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("path number pattern is valid"));

/// Frequency of an export inferred from its path: the last number, comma or point decimal
pub fn frequency_from_path(path: &str) -> Option<f64> {
    PATH_NUMBER
        .find_iter(path)
        .last()
        .and_then(|m| m.as_str().replace(',', ".").parse().ok())
}

/// Output folder name for a frequency: one decimal when it sits on a tenth,
/// otherwise the shortest representation, "unknown" when absent.
pub fn frequency_dir_name(freq: Option<f64>) -> String {
    match freq {
        None => "unknown".to_string(),
        Some(f) => {
            let rounded = (f * 10.0).round() / 10.0;
            if (f - rounded).abs() < 1e-9 {
                format!("{:.1}", rounded)
            } else {
                format!("{}", f)
            }
        }
    }
}
