use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value as JsonValue;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a result table
// ---------------------------------------------------------------------------

/// A dynamically-typed table cell mirroring the dtypes found in search-engine
/// exports. Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` (intensities, charges).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Interpret the value as a boolean flag column.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON value (loader records, configured flag values).
    pub fn from_json(val: &JsonValue) -> CellValue {
        match val {
            JsonValue::String(s) => CellValue::String(s.clone()),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    CellValue::Float(f)
                } else {
                    CellValue::String(n.to_string())
                }
            }
            JsonValue::Bool(b) => CellValue::Bool(*b),
            JsonValue::Null => CellValue::Null,
            other => CellValue::String(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// ResultRow – one row of the search-engine export
// ---------------------------------------------------------------------------

/// A single search-engine result: one (peptide sequence, charge, raw file)
/// observation with its intensity and any extra vendor columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    /// Named fields: column name → value.
    pub fields: BTreeMap<String, CellValue>,
}

impl ResultRow {
    pub fn new() -> Self {
        ResultRow::default()
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.fields.insert(column.into(), value);
    }
}

// ---------------------------------------------------------------------------
// ResultTable – the complete loaded export
// ---------------------------------------------------------------------------

/// The full parsed table with pre-computed column indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    /// All result rows.
    pub rows: Vec<ResultRow>,
    /// Ordered list of column names.
    pub column_names: Vec<String>,
    /// For each column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
}

impl ResultTable {
    /// Build column indices from the given rows.
    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();

        for row in &rows {
            for (col, val) in &row.fields {
                column_names_set.insert(col.clone());
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        let column_names: Vec<String> = column_names_set.into_iter().collect();
        ResultTable {
            rows,
            column_names,
            unique_values,
        }
    }

    /// Rename columns according to `mapper` (vendor name → canonical name).
    ///
    /// Mapper entries whose source column is absent are ignored, and columns
    /// not mentioned by the mapper pass through untouched. Whether required
    /// canonical columns exist is only discovered by the preparation step
    /// that reads them.
    pub fn rename_columns(self, mapper: &BTreeMap<String, String>) -> Self {
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                let fields = row
                    .fields
                    .into_iter()
                    .map(|(col, val)| match mapper.get(&col) {
                        Some(canonical) => (canonical.clone(), val),
                        None => (col, val),
                    })
                    .collect();
                ResultRow { fields }
            })
            .collect();
        ResultTable::from_rows(rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, CellValue)]) -> ResultRow {
        let mut r = ResultRow::new();
        for (col, val) in pairs {
            r.insert(*col, val.clone());
        }
        r
    }

    #[test]
    fn rename_maps_known_and_keeps_unknown_columns() {
        let mut mapper = BTreeMap::new();
        mapper.insert("shortname".to_string(), "Raw file".to_string());
        mapper.insert("not_present".to_string(), "Ghost".to_string());

        let table = ResultTable::from_rows(vec![row(&[
            ("shortname", CellValue::String("run_01".into())),
            ("score", CellValue::Float(0.99)),
        ])]);
        let renamed = table.rename_columns(&mapper);

        assert_eq!(
            renamed.rows[0].get("Raw file"),
            Some(&CellValue::String("run_01".into()))
        );
        assert_eq!(renamed.rows[0].get("score"), Some(&CellValue::Float(0.99)));
        assert!(renamed.rows[0].get("Ghost").is_none());
        assert!(!renamed.column_names.contains(&"shortname".to_string()));
    }

    #[test]
    fn from_rows_collects_unique_values_per_column() {
        let table = ResultTable::from_rows(vec![
            row(&[("Charge", CellValue::Integer(2))]),
            row(&[("Charge", CellValue::Integer(3))]),
            row(&[("Charge", CellValue::Integer(2))]),
        ]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.unique_values["Charge"].len(), 2);
    }

    #[test]
    fn cell_value_numeric_accessors() {
        assert_eq!(CellValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(CellValue::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(CellValue::String("x".into()).as_f64(), None);
        assert_eq!(CellValue::Bool(true).as_bool(), Some(true));
    }
}
