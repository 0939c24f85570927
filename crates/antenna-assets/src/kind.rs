//! Measurement kinds and the file-name keyword table
//!
//! Export file names are not consistent between tools or between exports of
//! the same tool ("Gain_2.4.txt", "S-Parameter S1,1.txt", "rl_awr.txt"), so the
//! quantity a file holds is recognised by keyword. The table is ordered: the
//! first entry whose keyword appears in the lowercased name wins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseKeyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Gain,
    Vswr,
    ReturnLoss,
    Pola,
}

/// "rl" must stay below "gain" and "vswr": "gain_rl_compare" is a gain file.
const KIND_KEYWORDS: &[(&[&str], DataKind)] = &[
    (&["gain"], DataKind::Gain),
    (&["vswr"], DataKind::Vswr),
    (&["return", "rl", "sparameter"], DataKind::ReturnLoss),
    (&["pola"], DataKind::Pola),
];

impl DataKind {
    pub const ALL: [DataKind; 4] = [DataKind::Gain, DataKind::ReturnLoss, DataKind::Vswr, DataKind::Pola];

    /// Classify a file name (or stem) by the keyword table.
    ///
    /// Longer keywords also match with separators removed, so CST's
    /// "S-Parameter" counts as "sparameter".
    pub fn classify(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        let compact: String = name.chars().filter(|c| !matches!(c, '-' | '_' | ' ')).collect();
        KIND_KEYWORDS
            .iter()
            .find(|(keywords, _)| {
                keywords
                    .iter()
                    .any(|k| name.contains(k) || (k.len() > 2 && compact.contains(k)))
            })
            .map(|(_, kind)| *kind)
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        KIND_KEYWORDS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(keywords, _)| *keywords)
            .unwrap_or(&[])
    }

    /// Y-axis label, also used as the chart title prefix
    pub fn axis_label(&self) -> &'static str {
        match self {
            DataKind::Gain => "Gain (dBi)",
            DataKind::Vswr => "VSWR",
            DataKind::ReturnLoss => "Return Loss (dB)",
            DataKind::Pola => "Pola (dB)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Gain => "gain",
            DataKind::Vswr => "vswr",
            DataKind::ReturnLoss => "return_loss",
            DataKind::Pola => "pola",
        }
    }
}

/// Y-axis label for a file name, "Value" when no keyword matches.
pub fn y_label_for(name: &str) -> &'static str {
    DataKind::classify(name).map(|k| k.axis_label()).unwrap_or("Value")
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gain" => Ok(DataKind::Gain),
            "vswr" => Ok(DataKind::Vswr),
            "return_loss" | "return-loss" | "rl" | "s11" => Ok(DataKind::ReturnLoss),
            "pola" => Ok(DataKind::Pola),
            _ => Err(ParseKeyError::Kind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_keyword() {
        assert_eq!(DataKind::classify("Gain_01"), Some(DataKind::Gain));
        assert_eq!(DataKind::classify("VSWR"), Some(DataKind::Vswr));
        assert_eq!(DataKind::classify("return_loss"), Some(DataKind::ReturnLoss));
        assert_eq!(DataKind::classify("SParameter S1,1"), Some(DataKind::ReturnLoss));
        assert_eq!(DataKind::classify("rl_awr"), Some(DataKind::ReturnLoss));
        assert_eq!(DataKind::classify("pola radiasi"), Some(DataKind::Pola));
        assert_eq!(DataKind::classify("efficiency"), None);
    }

    #[test]
    fn test_classify_cst_sparameter_export() {
        assert_eq!(DataKind::classify("S-Parameter S1,1"), Some(DataKind::ReturnLoss));
        assert_eq!(DataKind::classify("S-Parameter"), Some(DataKind::ReturnLoss));
        assert_eq!(DataKind::classify("s_parameter"), Some(DataKind::ReturnLoss));
        // Two-letter keywords only match the raw name
        assert_eq!(DataKind::classify("Power L"), None);
    }

    #[test]
    fn test_table_order_wins() {
        assert_eq!(DataKind::classify("gain_rl_compare"), Some(DataKind::Gain));
        assert_eq!(DataKind::classify("vswr_return"), Some(DataKind::Vswr));
    }

    #[test]
    fn test_y_labels() {
        assert_eq!(y_label_for("return_loss.txt"), "Return Loss (dB)");
        assert_eq!(y_label_for("gain.txt"), "Gain (dBi)");
        assert_eq!(y_label_for("impedance.txt"), "Value");
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("return_loss".parse::<DataKind>().unwrap(), DataKind::ReturnLoss);
        assert_eq!("GAIN".parse::<DataKind>().unwrap(), DataKind::Gain);
        assert!("smith".parse::<DataKind>().is_err());
    }

    #[test]
    fn test_keywords_lookup() {
        assert_eq!(DataKind::ReturnLoss.keywords(), &["return", "rl", "sparameter"]);
    }
}
