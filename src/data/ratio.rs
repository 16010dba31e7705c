use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use super::model::CellValue;
use super::prepare::{INTENSITY, PEPTIDOFORM, Prepared, RAW_FILE};
use super::settings::ParseSettings;

// ---------------------------------------------------------------------------
// RatioTable – per-peptidoform condition ratios
// ---------------------------------------------------------------------------

/// One quantified peptidoform: mean intensity per replicate group, the
/// group ratio, and the deviation from the expected ratio of its species.
#[derive(Debug, Clone, Serialize)]
pub struct RatioRow {
    pub peptidoform: String,
    pub species: String,
    pub mean_numerator: f64,
    pub mean_denominator: f64,
    pub ratio: f64,
    pub log2_ratio: f64,
    /// Observed log2 ratio minus the expected log2 ratio.
    pub epsilon: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RatioTable {
    pub rows: Vec<RatioRow>,
    /// Peptidoforms skipped for lack of a unique species or a usable ratio.
    pub skipped: usize,
}

/// Compute per-peptidoform intensity ratios between the two configured
/// replicate groups of an already prepared table.
///
/// A peptidoform is skipped (counted, not an error) when its rows match no
/// single species or when the denominator group has no positive intensity.
pub fn compute_ratios(prepared: &Prepared, settings: &ParseSettings) -> Result<RatioTable> {
    let (numerator_group, denominator_group) = &settings.ratio_groups;
    let numerator_files = prepared
        .replicate_to_raw
        .get(numerator_group)
        .with_context(|| format!("replicate group '{numerator_group}' is not configured"))?;
    let denominator_files = prepared
        .replicate_to_raw
        .get(denominator_group)
        .with_context(|| format!("replicate group '{denominator_group}' is not configured"))?;

    // peptidoform → raw file → summed intensity, plus species flags.
    let mut intensities: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    let mut species_of: BTreeMap<String, Option<String>> = BTreeMap::new();

    for row in &prepared.table.rows {
        let Some(peptidoform) = row.get(PEPTIDOFORM).map(CellValue::to_string) else {
            continue;
        };
        let raw_file = row.get(RAW_FILE).map(CellValue::to_string).unwrap_or_default();
        let intensity = row.get(INTENSITY).and_then(CellValue::as_f64).unwrap_or(0.0);
        *intensities
            .entry(peptidoform.clone())
            .or_default()
            .entry(raw_file)
            .or_default() += intensity;

        species_of.entry(peptidoform).or_insert_with(|| {
            let mut matching = settings
                .species
                .keys()
                .filter(|name| row.get(name.as_str()) == Some(&CellValue::Bool(true)));
            match (matching.next(), matching.next()) {
                (Some(name), None) => Some(name.clone()),
                _ => None,
            }
        });
    }

    let mut table = RatioTable::default();

    for (peptidoform, per_raw) in &intensities {
        let Some(Some(species)) = species_of.get(peptidoform) else {
            table.skipped += 1;
            continue;
        };
        let mean_numerator = group_mean(per_raw, numerator_files);
        let mean_denominator = group_mean(per_raw, denominator_files);
        if mean_denominator <= 0.0 || mean_numerator <= 0.0 {
            table.skipped += 1;
            continue;
        }

        let ratio = mean_numerator / mean_denominator;
        let log2_ratio = ratio.log2();
        let expected = settings.species[species].expected_ratio;
        table.rows.push(RatioRow {
            peptidoform: peptidoform.clone(),
            species: species.clone(),
            mean_numerator,
            mean_denominator,
            ratio,
            log2_ratio,
            epsilon: log2_ratio - expected.log2(),
        });
    }

    Ok(table)
}

fn group_mean(per_raw: &BTreeMap<String, f64>, raw_files: &[String]) -> f64 {
    if raw_files.is_empty() {
        return 0.0;
    }
    let sum: f64 = raw_files
        .iter()
        .map(|raw_file| per_raw.get(raw_file).copied().unwrap_or(0.0))
        .sum();
    sum / raw_files.len() as f64
}

impl RatioTable {
    /// Render the ratio table as CSV for the download button.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record([
                "peptidoform",
                "species",
                "mean_numerator",
                "mean_denominator",
                "ratio",
                "log2_ratio",
                "epsilon",
            ])
            .context("writing CSV header")?;
        for row in &self.rows {
            let record = [
                row.peptidoform.clone(),
                row.species.clone(),
                row.mean_numerator.to_string(),
                row.mean_denominator.to_string(),
                row.ratio.to_string(),
                row.log2_ratio.to_string(),
                row.epsilon.to_string(),
            ];
            writer.write_record(&record).context("writing CSV row")?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flushing CSV writer: {e}"))?;
        String::from_utf8(bytes).context("CSV output is not UTF-8")
    }
}

// ---------------------------------------------------------------------------
// Datapoint – one benchmark run, as submitted to the results repository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Datapoint {
    pub id: String,
    pub search_engine: String,
    pub software_version: String,
    /// Match-between-runs enabled in the search.
    pub mbr: bool,
    pub timestamp: String,
    pub n_peptidoforms: usize,
    /// Mean absolute epsilon per species.
    pub species_error: BTreeMap<String, f64>,
    /// Species errors weighted by their peptidoform counts.
    pub weighted_mean_abs_epsilon: f64,
}

impl Datapoint {
    /// Summarize one benchmark run. `timestamp` is supplied by the caller
    /// (the UI stamps it at submission time).
    pub fn from_ratios(
        ratios: &RatioTable,
        search_engine: &str,
        software_version: &str,
        mbr: bool,
        timestamp: String,
    ) -> Self {
        let mut abs_sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for row in &ratios.rows {
            let entry = abs_sums.entry(row.species.clone()).or_default();
            entry.0 += row.epsilon.abs();
            entry.1 += 1;
        }

        let species_error: BTreeMap<String, f64> = abs_sums
            .iter()
            .map(|(species, (sum, count))| (species.clone(), sum / *count as f64))
            .collect();

        let total: usize = abs_sums.values().map(|(_, count)| count).sum();
        let weighted_mean_abs_epsilon = if total == 0 {
            0.0
        } else {
            abs_sums.values().map(|(sum, _)| sum).sum::<f64>() / total as f64
        };

        Datapoint {
            id: format!("{search_engine}-{software_version}-{mbr}-{timestamp}"),
            search_engine: search_engine.to_string(),
            software_version: software_version.to_string(),
            mbr,
            timestamp,
            n_peptidoforms: ratios.rows.len(),
            species_error,
            weighted_mean_abs_epsilon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ResultRow, ResultTable};
    use crate::data::prepare::{prepare_table, CHARGE, DECOY, PROTEINS, SEQUENCE};
    use crate::data::settings::{GeneralSettings, SpeciesSettings};
    use serde_json::json;

    const RAW_FILES: [&str; 6] = [
        "Condition_A_01",
        "Condition_A_02",
        "Condition_A_03",
        "Condition_B_01",
        "Condition_B_02",
        "Condition_B_03",
    ];

    fn test_settings() -> ParseSettings {
        let mut replicate_mapper = BTreeMap::new();
        for raw_file in &RAW_FILES[..3] {
            replicate_mapper.insert(raw_file.to_string(), "1".to_string());
        }
        for raw_file in &RAW_FILES[3..] {
            replicate_mapper.insert(raw_file.to_string(), "2".to_string());
        }

        let mut species = BTreeMap::new();
        species.insert(
            "HUMAN".to_string(),
            SpeciesSettings {
                flag: "_HUMAN".to_string(),
                expected_ratio: 1.0,
            },
        );
        species.insert(
            "YEAST".to_string(),
            SpeciesSettings {
                flag: "_YEAST".to_string(),
                expected_ratio: 0.5,
            },
        );

        ParseSettings {
            mapper: BTreeMap::new(),
            replicate_mapper,
            species,
            ratio_groups: ("1".to_string(), "2".to_string()),
            general: GeneralSettings {
                contaminant_flag: "Cont_".to_string(),
                decoy_flag: json!(true),
                min_count_multispec: 1,
            },
        }
    }

    fn observation(protein: &str, sequence: &str, raw_file: &str, intensity: f64) -> ResultRow {
        let mut row = ResultRow::new();
        row.insert(PROTEINS, CellValue::String(protein.to_string()));
        row.insert(SEQUENCE, CellValue::String(sequence.to_string()));
        row.insert(CHARGE, CellValue::Integer(2));
        row.insert(RAW_FILE, CellValue::String(raw_file.to_string()));
        row.insert(INTENSITY, CellValue::Float(intensity));
        row.insert(DECOY, CellValue::Bool(false));
        row
    }

    fn prepared_with(rows: Vec<ResultRow>) -> Prepared {
        prepare_table(ResultTable::from_rows(rows), &test_settings()).unwrap()
    }

    #[test]
    fn ratio_of_twofold_peptidoform_is_two() {
        let mut rows = Vec::new();
        for raw_file in &RAW_FILES[..3] {
            rows.push(observation("sp|P1_HUMAN", "PEPTIDEK", raw_file, 2000.0));
        }
        for raw_file in &RAW_FILES[3..] {
            rows.push(observation("sp|P1_HUMAN", "PEPTIDEK", raw_file, 1000.0));
        }

        let ratios = compute_ratios(&prepared_with(rows), &test_settings()).unwrap();
        assert_eq!(ratios.rows.len(), 1);
        let row = &ratios.rows[0];
        assert_eq!(row.species, "HUMAN");
        assert!((row.ratio - 2.0).abs() < 1e-12);
        assert!((row.log2_ratio - 1.0).abs() < 1e-12);
        // Expected HUMAN ratio is 1.0, so epsilon equals the log2 ratio.
        assert!((row.epsilon - 1.0).abs() < 1e-12);
    }

    #[test]
    fn yeast_at_expected_ratio_has_zero_epsilon() {
        let mut rows = Vec::new();
        for raw_file in &RAW_FILES[..3] {
            rows.push(observation("sp|P2_YEAST", "YEASTK", raw_file, 500.0));
        }
        for raw_file in &RAW_FILES[3..] {
            rows.push(observation("sp|P2_YEAST", "YEASTK", raw_file, 1000.0));
        }

        let ratios = compute_ratios(&prepared_with(rows), &test_settings()).unwrap();
        assert_eq!(ratios.rows.len(), 1);
        assert!(ratios.rows[0].epsilon.abs() < 1e-12);
    }

    #[test]
    fn datapoint_aggregates_species_errors() {
        let table = RatioTable {
            rows: vec![
                RatioRow {
                    peptidoform: "AK2".into(),
                    species: "HUMAN".into(),
                    mean_numerator: 2.0,
                    mean_denominator: 1.0,
                    ratio: 2.0,
                    log2_ratio: 1.0,
                    epsilon: 1.0,
                },
                RatioRow {
                    peptidoform: "BK2".into(),
                    species: "HUMAN".into(),
                    mean_numerator: 1.0,
                    mean_denominator: 2.0,
                    ratio: 0.5,
                    log2_ratio: -1.0,
                    epsilon: -1.0,
                },
                RatioRow {
                    peptidoform: "CK2".into(),
                    species: "YEAST".into(),
                    mean_numerator: 1.0,
                    mean_denominator: 2.0,
                    ratio: 0.5,
                    log2_ratio: -1.0,
                    epsilon: 0.0,
                },
            ],
            skipped: 0,
        };

        let datapoint =
            Datapoint::from_ratios(&table, "AlphaPept", "0.4.9", true, "20260806_120000".into());
        assert_eq!(datapoint.n_peptidoforms, 3);
        assert!((datapoint.species_error["HUMAN"] - 1.0).abs() < 1e-12);
        assert!(datapoint.species_error["YEAST"].abs() < 1e-12);
        assert!((datapoint.weighted_mean_abs_epsilon - 2.0 / 3.0).abs() < 1e-12);
        assert!(datapoint.id.starts_with("AlphaPept-0.4.9-true-"));
    }

    #[test]
    fn ratio_csv_has_header_and_rows() {
        let table = RatioTable {
            rows: vec![RatioRow {
                peptidoform: "AK2".into(),
                species: "HUMAN".into(),
                mean_numerator: 2.0,
                mean_denominator: 1.0,
                ratio: 2.0,
                log2_ratio: 1.0,
                epsilon: 1.0,
            }],
            skipped: 0,
        };
        let csv = table.to_csv().unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("peptidoform,species"));
        assert!(lines.next().unwrap().starts_with("AK2,HUMAN"));
        assert!(lines.next().is_none());
    }
}
