use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::color::ColorMap;
use crate::data::loader;
use crate::data::model::ResultTable;
use crate::data::prepare::{Prepared, prepare_table};
use crate::data::ratio::{Datapoint, RatioTable, compute_ratios};
use crate::data::settings::{InputFormat, ParseSettings};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The outcome of one benchmark run.
pub struct BenchResult {
    pub prepared: Prepared,
    pub ratios: RatioTable,
}

/// Submission workflow state: the confirmation checkbox gates the token
/// field and upload button.
#[derive(Default)]
pub struct SubmissionState {
    pub confirmed: bool,
    pub token: String,
    pub last_pr_url: Option<String>,
}

/// The full UI state, independent of rendering. Everything a benchmark run
/// reads or produces lives here explicitly; there is no global session store.
pub struct AppState {
    /// Loaded export (None until the user opens a file).
    pub input_path: Option<PathBuf>,
    pub raw: Option<ResultTable>,

    /// Selected search engine and its (user-editable) settings.
    pub input_format: InputFormat,
    pub settings: ParseSettings,
    /// Text buffer behind the decoy-flag field; applied on change so a
    /// boolean flag stays a boolean in the settings.
    pub decoy_flag_text: String,

    /// User-supplied run metadata for the benchmark datapoint.
    pub software_version: String,
    pub mbr: bool,

    /// Result of the latest run.
    pub result: Option<BenchResult>,

    /// Datapoints accumulated over the session, fed to the metric plot and
    /// the submission.
    pub datapoints: Vec<Datapoint>,

    /// Species colours for plots.
    pub color_map: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Whether a file loading operation is in progress.
    pub loading: bool,

    pub submission: SubmissionState,
}

impl AppState {
    pub fn new() -> Result<Self> {
        let input_format = InputFormat::AlphaPept;
        let settings = input_format.settings()?;
        let color_map = ColorMap::new(settings.species.keys());
        let decoy_flag_text = decoy_flag_text(&settings);
        Ok(Self {
            input_path: None,
            raw: None,
            input_format,
            settings,
            decoy_flag_text,
            software_version: String::new(),
            mbr: false,
            result: None,
            datapoints: Vec::new(),
            color_map,
            status_message: None,
            loading: false,
            submission: SubmissionState::default(),
        })
    }

    /// Ingest a newly loaded export. The previous result stays visible until
    /// the next run.
    pub fn set_input(&mut self, path: PathBuf, table: ResultTable) {
        log::info!(
            "Loaded {} rows with columns {:?}",
            table.len(),
            table.column_names
        );
        self.input_path = Some(path);
        self.raw = Some(table);
        self.status_message = None;
        self.loading = false;
    }

    /// Load an export file, recording failures in the status line.
    pub fn open_file(&mut self, path: &Path) {
        self.loading = true;
        match loader::load_file(path) {
            Ok(table) => self.set_input(path.to_path_buf(), table),
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
                self.loading = false;
            }
        }
    }

    /// Switch the input format and reload its settings, dropping any edits.
    pub fn set_input_format(&mut self, format: InputFormat) {
        match format.settings() {
            Ok(settings) => {
                self.color_map = ColorMap::new(settings.species.keys());
                self.decoy_flag_text = decoy_flag_text(&settings);
                self.settings = settings;
                self.input_format = format;
            }
            Err(e) => {
                log::error!("Failed to load {} settings: {e:#}", format.label());
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Run the benchmark on the loaded export with the current settings.
    /// All-or-nothing: any failure leaves the previous result untouched and
    /// is reported in the status line.
    pub fn run_benchmark(&mut self) {
        let Some(raw) = &self.raw else {
            self.status_message = Some("Open a search-engine export first.".to_string());
            return;
        };

        match self.bench(raw.clone()) {
            Ok((result, datapoint)) => {
                log::info!(
                    "Benchmark done: {} peptidoforms, {} skipped",
                    result.ratios.rows.len(),
                    result.ratios.skipped
                );
                self.result = Some(result);
                self.datapoints.push(datapoint);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Benchmark failed: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Re-type the edited decoy-flag text: "true"/"false" become booleans,
    /// anything else is a string marker.
    pub fn apply_decoy_flag_text(&mut self) {
        let text = self.decoy_flag_text.trim();
        self.settings.general.decoy_flag = if text.eq_ignore_ascii_case("true") {
            serde_json::json!(true)
        } else if text.eq_ignore_ascii_case("false") {
            serde_json::json!(false)
        } else {
            serde_json::json!(text)
        };
    }

    fn bench(&self, raw: ResultTable) -> Result<(BenchResult, Datapoint)> {
        let prepared = prepare_table(raw, &self.settings)?;
        let ratios = compute_ratios(&prepared, &self.settings)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let datapoint = Datapoint::from_ratios(
            &ratios,
            self.input_format.label(),
            &self.software_version,
            self.mbr,
            timestamp,
        );
        Ok((BenchResult { prepared, ratios }, datapoint))
    }
}

fn decoy_flag_text(settings: &ParseSettings) -> String {
    match &settings.general.decoy_flag {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
