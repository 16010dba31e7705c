use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use thiserror::Error;

use super::model::{CellValue, ResultRow, ResultTable};
use super::settings::ParseSettings;

// ---------------------------------------------------------------------------
// Canonical column names
// ---------------------------------------------------------------------------

pub const RAW_FILE: &str = "Raw file";
pub const PROTEINS: &str = "Proteins";
pub const SEQUENCE: &str = "Modified sequence";
pub const CHARGE: &str = "Charge";
pub const DECOY: &str = "Reverse";
pub const INTENSITY: &str = "Intensity";

pub const CONTAMINANT: &str = "contaminant";
pub const MULTI_SPEC: &str = "MULTI_SPEC";
pub const REPLICATE: &str = "replicate";
pub const PEPTIDOFORM: &str = "peptidoform";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Structural failures of the preparation pipeline. Anything else (I/O,
/// malformed files) arrives as an `anyhow` error from the loader.
#[derive(Error, Debug)]
pub enum PrepareError {
    #[error("required column '{0}' is missing after mapping")]
    MissingColumn(&'static str),
    #[error("row {0}: column '{1}' holds '{2}', expected a number")]
    NonNumericIntensity(usize, &'static str, String),
}

// ---------------------------------------------------------------------------
// Prepared – the pipeline output
// ---------------------------------------------------------------------------

/// The filtered per-replicate intensity table plus the replicate → raw-files
/// inverse mapping the ratio computation groups by.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub table: ResultTable,
    pub replicate_to_raw: BTreeMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// The preparation pipeline
// ---------------------------------------------------------------------------

/// Reshape a raw search-engine export into the benchmark input table:
///
/// 1. rename vendor columns to the canonical schema,
/// 2. drop decoy hits,
/// 3. flag contaminants and per-species membership, drop ambiguous
///    multi-species rows,
/// 4. assign replicate groups and one-hot encode raw file identity,
/// 5. keep only peptidoforms with positive summed intensity in every
///    configured raw file.
///
/// All-or-nothing: the first structural problem aborts the run.
pub fn prepare_table(table: ResultTable, settings: &ParseSettings) -> Result<Prepared> {
    let table = table.rename_columns(&settings.mapper);
    let decoy_flag = settings.decoy_flag_value();

    let mut rows: Vec<ResultRow> = Vec::with_capacity(table.len());
    for mut row in table.rows {
        let decoy = row
            .get(DECOY)
            .ok_or(PrepareError::MissingColumn(DECOY))?;
        if flag_matches(decoy, &decoy_flag) {
            continue;
        }

        let protein = row
            .get(PROTEINS)
            .ok_or(PrepareError::MissingColumn(PROTEINS))?
            .as_str()
            .unwrap_or_default()
            .to_string();
        row.insert(
            CONTAMINANT,
            CellValue::Bool(protein.contains(&settings.general.contaminant_flag)),
        );

        let mut species_hits = 0usize;
        for (species, spec) in &settings.species {
            let hit = protein.contains(&spec.flag);
            if hit {
                species_hits += 1;
            }
            row.insert(species.clone(), CellValue::Bool(hit));
        }
        let multi_spec = species_hits > settings.general.min_count_multispec;
        row.insert(MULTI_SPEC, CellValue::Bool(multi_spec));
        if multi_spec {
            continue;
        }

        let raw_file = row
            .get(RAW_FILE)
            .ok_or(PrepareError::MissingColumn(RAW_FILE))?
            .to_string();
        // Unmapped raw files propagate silently as Null.
        let replicate = settings
            .replicate_mapper
            .get(&raw_file)
            .map(|group| CellValue::String(group.clone()))
            .unwrap_or(CellValue::Null);
        row.insert(REPLICATE, replicate);

        let sequence = row
            .get(SEQUENCE)
            .ok_or(PrepareError::MissingColumn(SEQUENCE))?;
        let charge = row
            .get(CHARGE)
            .ok_or(PrepareError::MissingColumn(CHARGE))?;
        row.insert(
            PEPTIDOFORM,
            CellValue::String(format!("{sequence}{charge}")),
        );

        rows.push(row);
    }

    // One indicator column per distinct raw file value.
    let raw_files: BTreeSet<String> = rows
        .iter()
        .filter_map(|row| row.get(RAW_FILE).map(CellValue::to_string))
        .collect();
    for row in &mut rows {
        let own = row.get(RAW_FILE).map(CellValue::to_string).unwrap_or_default();
        for raw_file in &raw_files {
            row.insert(raw_file.clone(), CellValue::Bool(*raw_file == own));
        }
    }

    // Per (peptidoform, raw file) intensity sums; missing intensities count
    // as zero, non-numeric cells abort.
    let mut sums: BTreeMap<(String, String), f64> = BTreeMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let intensity = row
            .get(INTENSITY)
            .ok_or(PrepareError::MissingColumn(INTENSITY))?;
        let intensity = match intensity {
            CellValue::Null => 0.0,
            other => other.as_f64().ok_or_else(|| {
                PrepareError::NonNumericIntensity(idx, INTENSITY, other.to_string())
            })?,
        };
        let peptidoform = row
            .get(PEPTIDOFORM)
            .map(CellValue::to_string)
            .unwrap_or_default();
        let raw_file = row.get(RAW_FILE).map(CellValue::to_string).unwrap_or_default();
        *sums.entry((peptidoform, raw_file)).or_default() += intensity;
    }

    // A peptidoform is kept when the count of raw files with a positive sum
    // equals the number of raw files the replicate mapping expects.
    let mut positive_counts: BTreeMap<String, usize> = BTreeMap::new();
    for ((peptidoform, _raw_file), sum) in &sums {
        if *sum > 0.0 {
            *positive_counts.entry(peptidoform.clone()).or_default() += 1;
        }
    }
    let expected = settings.expected_raw_files();
    let allowed: BTreeSet<&String> = positive_counts
        .iter()
        .filter(|(_, count)| **count == expected)
        .map(|(peptidoform, _)| peptidoform)
        .collect();

    let rows: Vec<ResultRow> = rows
        .into_iter()
        .filter(|row| {
            row.get(PEPTIDOFORM)
                .map(|pf| allowed.contains(&pf.to_string()))
                .unwrap_or(false)
        })
        .collect();

    Ok(Prepared {
        table: ResultTable::from_rows(rows),
        replicate_to_raw: settings.replicate_to_raw(),
    })
}

/// Compare a decoy cell against the configured flag. Exact cell equality,
/// plus a case-insensitive textual fallback so a boolean flag still matches
/// exports that spell it "True"/"False".
fn flag_matches(cell: &CellValue, flag: &CellValue) -> bool {
    if cell == flag {
        return true;
    }
    if matches!(cell, CellValue::Null) || matches!(flag, CellValue::Null) {
        return false;
    }
    cell.to_string().eq_ignore_ascii_case(&flag.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
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
        for (name, flag, expected_ratio) in [
            ("YEAST", "_YEAST", 0.5),
            ("ECOLI", "_ECOLI", 1.5),
            ("HUMAN", "_HUMAN", 1.0),
        ] {
            species.insert(
                name.to_string(),
                SpeciesSettings {
                    flag: flag.to_string(),
                    expected_ratio,
                },
            );
        }

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

    fn observation(
        protein: &str,
        sequence: &str,
        charge: i64,
        raw_file: &str,
        intensity: f64,
        decoy: bool,
    ) -> ResultRow {
        let mut row = ResultRow::new();
        row.insert(PROTEINS, CellValue::String(protein.to_string()));
        row.insert(SEQUENCE, CellValue::String(sequence.to_string()));
        row.insert(CHARGE, CellValue::Integer(charge));
        row.insert(RAW_FILE, CellValue::String(raw_file.to_string()));
        row.insert(INTENSITY, CellValue::Float(intensity));
        row.insert(DECOY, CellValue::Bool(decoy));
        row
    }

    /// One observation of the peptidoform in every configured raw file.
    fn consistent_rows(protein: &str, sequence: &str) -> Vec<ResultRow> {
        RAW_FILES
            .iter()
            .map(|raw_file| observation(protein, sequence, 2, raw_file, 1000.0, false))
            .collect()
    }

    #[test]
    fn decoy_rows_are_excluded() {
        let mut rows = consistent_rows("sp|P1_HUMAN", "PEPTIDEK");
        rows.push(observation("sp|P2_HUMAN", "DECOYK", 2, RAW_FILES[0], 500.0, true));

        let prepared = prepare_table(ResultTable::from_rows(rows), &test_settings()).unwrap();
        assert!(prepared
            .table
            .rows
            .iter()
            .all(|row| row.get(SEQUENCE) != Some(&CellValue::String("DECOYK".into()))));
        assert_eq!(prepared.table.len(), 6);
    }

    #[test]
    fn multi_species_rows_are_excluded() {
        let mut rows = consistent_rows("sp|P1_HUMAN", "PEPTIDEK");
        // Matches two species flags with threshold 1.
        rows.extend(consistent_rows("sp|P3_YEAST_ECOLI", "AMBIGK"));

        let prepared = prepare_table(ResultTable::from_rows(rows), &test_settings()).unwrap();
        assert!(prepared
            .table
            .rows
            .iter()
            .all(|row| row.get(SEQUENCE) != Some(&CellValue::String("AMBIGK".into()))));
    }

    #[test]
    fn contaminants_are_flagged_but_kept() {
        let rows = consistent_rows("Cont_sp|P9_HUMAN", "KERATINK");
        let prepared = prepare_table(ResultTable::from_rows(rows), &test_settings()).unwrap();
        assert_eq!(prepared.table.len(), 6);
        assert!(prepared
            .table
            .rows
            .iter()
            .all(|row| row.get(CONTAMINANT) == Some(&CellValue::Bool(true))));
    }

    #[test]
    fn peptidoform_missing_in_one_raw_file_is_excluded() {
        let mut rows = consistent_rows("sp|P1_HUMAN", "PEPTIDEK");
        // Second peptidoform: zero intensity in one of the six raw files.
        for (i, raw_file) in RAW_FILES.iter().enumerate() {
            let intensity = if i == 3 { 0.0 } else { 800.0 };
            rows.push(observation("sp|P4_YEAST", "YEASTK", 3, raw_file, intensity, false));
        }

        let prepared = prepare_table(ResultTable::from_rows(rows), &test_settings()).unwrap();
        let peptidoforms: BTreeSet<String> = prepared
            .table
            .rows
            .iter()
            .map(|row| row.get(PEPTIDOFORM).unwrap().to_string())
            .collect();
        assert!(peptidoforms.contains("PEPTIDEK2"));
        assert!(!peptidoforms.contains("YEASTK3"));
    }

    #[test]
    fn unmapped_raw_file_yields_null_replicate_and_fails_consistency() {
        let mut rows = consistent_rows("sp|P1_HUMAN", "PEPTIDEK");
        rows.push(observation("sp|P5_HUMAN", "STRAYK", 2, "Unknown_07", 900.0, false));

        let prepared = prepare_table(ResultTable::from_rows(rows), &test_settings()).unwrap();
        // The stray peptidoform is positive in one raw file, not six.
        assert!(prepared
            .table
            .rows
            .iter()
            .all(|row| row.get(SEQUENCE) != Some(&CellValue::String("STRAYK".into()))));
        // A consistent peptidoform seen in an extra unmapped raw file now
        // covers seven raw files and is excluded as well.
        let mut rows = consistent_rows("sp|P1_HUMAN", "PEPTIDEK");
        rows.push(observation("sp|P1_HUMAN", "PEPTIDEK", 2, "Unknown_07", 900.0, false));
        let prepared = prepare_table(ResultTable::from_rows(rows), &test_settings()).unwrap();
        assert!(prepared.table.is_empty());
    }

    #[test]
    fn replicate_groups_and_one_hot_columns_are_added() {
        let rows = consistent_rows("sp|P1_HUMAN", "PEPTIDEK");
        let prepared = prepare_table(ResultTable::from_rows(rows), &test_settings()).unwrap();

        assert_eq!(prepared.replicate_to_raw["1"].len(), 3);
        assert_eq!(prepared.replicate_to_raw["2"].len(), 3);

        let first = &prepared.table.rows[0];
        let own_raw = first.get(RAW_FILE).unwrap().to_string();
        assert_eq!(
            first.get(REPLICATE),
            Some(&CellValue::String(
                test_settings().replicate_mapper[&own_raw].clone()
            ))
        );
        for raw_file in RAW_FILES {
            let expected = CellValue::Bool(raw_file == own_raw);
            assert_eq!(first.get(raw_file), Some(&expected));
        }
    }

    #[test]
    fn preparation_is_idempotent() {
        let mut rows = consistent_rows("sp|P1_HUMAN", "PEPTIDEK");
        rows.extend(consistent_rows("sp|P4_YEAST", "YEASTK"));
        rows.push(observation("sp|P2_HUMAN", "DECOYK", 2, RAW_FILES[0], 500.0, true));

        let settings = test_settings();
        let once = prepare_table(ResultTable::from_rows(rows), &settings).unwrap();
        let twice = prepare_table(once.table.clone(), &settings).unwrap();

        assert_eq!(once.table, twice.table);
        assert_eq!(once.replicate_to_raw, twice.replicate_to_raw);
    }

    #[test]
    fn missing_required_column_aborts() {
        let mut row = ResultRow::new();
        row.insert(PROTEINS, CellValue::String("sp|P1_HUMAN".into()));
        let err = prepare_table(ResultTable::from_rows(vec![row]), &test_settings())
            .unwrap_err();
        assert!(err.to_string().contains(DECOY));
    }

    #[test]
    fn non_numeric_intensity_aborts() {
        let mut rows = consistent_rows("sp|P1_HUMAN", "PEPTIDEK");
        rows[0].insert(INTENSITY, CellValue::String("n/a".into()));
        let err = prepare_table(ResultTable::from_rows(rows), &test_settings()).unwrap_err();
        assert!(err.to_string().contains("expected a number"));
    }
}
