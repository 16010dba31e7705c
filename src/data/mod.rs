/// Data layer: core types, ingestion, preparation, and ratio computation.
///
/// Architecture:
/// ```text
///  .csv / .tsv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse export → ResultTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │  ResultTable  │  Vec<ResultRow>, column index
///   └──────────────┘
///        │   + ParseSettings (settings)
///        ▼
///   ┌──────────┐
///   │ prepare   │  rename, filter decoys/contaminants/species,
///   └──────────┘  replicate mapping, consistency filter
///        │
///        ▼
///   ┌──────────┐
///   │  ratio    │  per-peptidoform condition ratios → Datapoint
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod prepare;
pub mod ratio;
pub mod settings;
