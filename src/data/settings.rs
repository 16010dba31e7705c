use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::CellValue;

// ---------------------------------------------------------------------------
// Input formats
// ---------------------------------------------------------------------------

/// Embedded settings documents, one per supported search engine.
const ALPHAPEPT_SETTINGS: &str = include_str!("../../settings/alphapept.json");
const MAXQUANT_SETTINGS: &str = include_str!("../../settings/maxquant.json");

/// The search engines whose exports can be benchmarked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    AlphaPept,
    MaxQuant,
}

impl InputFormat {
    pub const ALL: [InputFormat; 2] = [InputFormat::AlphaPept, InputFormat::MaxQuant];

    pub fn label(&self) -> &'static str {
        match self {
            InputFormat::AlphaPept => "AlphaPept",
            InputFormat::MaxQuant => "MaxQuant",
        }
    }

    /// Parse the embedded settings document for this format.
    pub fn settings(&self) -> Result<ParseSettings> {
        let text = match self {
            InputFormat::AlphaPept => ALPHAPEPT_SETTINGS,
            InputFormat::MaxQuant => MAXQUANT_SETTINGS,
        };
        ParseSettings::from_json(text)
            .with_context(|| format!("parsing embedded {} settings", self.label()))
    }
}

// ---------------------------------------------------------------------------
// ParseSettings – everything the preparation pipeline is parameterized by
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Substring marking contaminant entries in the protein field.
    pub contaminant_flag: String,
    /// Value of the decoy column identifying decoy hits. Kept as JSON so a
    /// boolean column (AlphaPept) and a string marker (MaxQuant "+") both
    /// configure the same way.
    pub decoy_flag: JsonValue,
    /// A row matching more than this many species is ambiguous and dropped.
    pub min_count_multispec: usize,
}

/// Per-species configuration: how to recognize the species in a protein
/// identifier and which intensity ratio the experimental design dictates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesSettings {
    pub flag: String,
    /// Expected ratio of the first over the second replicate group.
    pub expected_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseSettings {
    /// Vendor column name → canonical column name.
    pub mapper: BTreeMap<String, String>,
    /// Raw file name → replicate group (many raw files to one group).
    pub replicate_mapper: BTreeMap<String, String>,
    /// Species name → recognition flag and expected ratio.
    pub species: BTreeMap<String, SpeciesSettings>,
    /// The (numerator, denominator) replicate groups of the benchmark ratio.
    pub ratio_groups: (String, String),
    pub general: GeneralSettings,
}

impl ParseSettings {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing settings JSON")
    }

    /// The configured decoy flag as a table cell, for row comparison.
    pub fn decoy_flag_value(&self) -> CellValue {
        CellValue::from_json(&self.general.decoy_flag)
    }

    /// Number of raw files a consistently observed peptidoform must cover.
    /// Derived from the replicate mapping, so configuration changes
    /// propagate instead of silently breaking a hardcoded count.
    pub fn expected_raw_files(&self) -> usize {
        self.replicate_mapper.len()
    }

    /// Inverse of `replicate_mapper`: replicate group → sorted raw files.
    pub fn replicate_to_raw(&self) -> BTreeMap<String, Vec<String>> {
        let mut inverse: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (raw_file, group) in &self.replicate_mapper {
            inverse.entry(group.clone()).or_default().push(raw_file.clone());
        }
        inverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphapept_settings_parse() {
        let settings = InputFormat::AlphaPept.settings().unwrap();
        assert_eq!(settings.mapper["shortname"], "Raw file");
        assert_eq!(settings.mapper["ms1_int_sum_apex_dn"], "Intensity");
        assert_eq!(settings.expected_raw_files(), 6);
        assert_eq!(settings.decoy_flag_value(), CellValue::Bool(true));
        assert_eq!(settings.species["YEAST"].expected_ratio, 0.5);
        assert_eq!(settings.ratio_groups.0, "1");
    }

    #[test]
    fn maxquant_settings_use_string_decoy_marker() {
        let settings = InputFormat::MaxQuant.settings().unwrap();
        assert_eq!(settings.decoy_flag_value(), CellValue::String("+".into()));
        assert_eq!(settings.general.contaminant_flag, "CON__");
    }

    #[test]
    fn replicate_inverse_groups_raw_files() {
        let settings = InputFormat::AlphaPept.settings().unwrap();
        let inverse = settings.replicate_to_raw();
        assert_eq!(inverse.len(), 2);
        assert_eq!(inverse["1"].len(), 3);
        assert_eq!(inverse["2"].len(), 3);
        assert!(inverse["1"][0] < inverse["1"][1]);
    }
}
