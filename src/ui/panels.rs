use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, TextEdit, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::ResultTable;
use crate::data::prepare::{
    CHARGE, CONTAMINANT, INTENSITY, PEPTIDOFORM, RAW_FILE, REPLICATE, SEQUENCE,
};
use crate::data::settings::InputFormat;
use crate::github::{self, ResultsRepo};
use crate::state::AppState;
use crate::ui::plot;

/// How many prepared rows the results table shows.
const TABLE_HEAD: usize = 100;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(raw) = &state.raw {
            ui.label(format!("{} rows loaded", raw.len()));
        }
        if let Some(result) = &state.result {
            ui.separator();
            ui.label(format!(
                "{} rows prepared, {} peptidoforms quantified",
                result.prepared.table.len(),
                result.ratios.rows.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – input, settings, submission
// ---------------------------------------------------------------------------

/// Render the input / configuration panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Input and configuration");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Search engine selector ----
            ui.strong("Search engine");
            egui::ComboBox::from_id_salt("input_format")
                .selected_text(state.input_format.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for format in InputFormat::ALL {
                        if ui
                            .selectable_label(state.input_format == format, format.label())
                            .clicked()
                        {
                            state.set_input_format(format);
                        }
                    }
                });
            if let Some(path) = &state.input_path {
                ui.label(path.display().to_string());
            }
            ui.separator();

            // ---- Additional parameters ----
            egui::CollapsingHeader::new(RichText::new("Additional parameters").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    egui::Grid::new("general_settings").num_columns(2).show(
                        ui,
                        |ui: &mut Ui| {
                            ui.label("Software version");
                            ui.add(TextEdit::singleline(&mut state.software_version));
                            ui.end_row();

                            ui.label("Match between runs");
                            ui.checkbox(&mut state.mbr, "");
                            ui.end_row();

                            ui.label("Decoy flag");
                            if ui
                                .add(TextEdit::singleline(&mut state.decoy_flag_text))
                                .changed()
                            {
                                state.apply_decoy_flag_text();
                            }
                            ui.end_row();

                            ui.label("Contaminant flag");
                            ui.add(TextEdit::singleline(
                                &mut state.settings.general.contaminant_flag,
                            ));
                            ui.end_row();

                            ui.label("Max species matches");
                            ui.add(DragValue::new(
                                &mut state.settings.general.min_count_multispec,
                            ));
                            ui.end_row();
                        },
                    );

                    ui.add_space(4.0);
                    ui.strong("Species");
                    egui::Grid::new("species_settings").num_columns(3).show(
                        ui,
                        |ui: &mut Ui| {
                            ui.label("name");
                            ui.label("flag");
                            ui.label("expected ratio");
                            ui.end_row();
                            for (name, spec) in state.settings.species.iter_mut() {
                                ui.colored_label(state.color_map.color_for(name), name);
                                ui.label(&spec.flag);
                                ui.add(DragValue::new(&mut spec.expected_ratio).speed(0.05));
                                ui.end_row();
                            }
                        },
                    );
                });

            ui.add_space(4.0);
            if ui.button("Parse and bench").clicked() {
                state.run_benchmark();
            }
            ui.separator();

            // ---- Download ----
            if state.result.is_some() {
                if ui.button("Download calculated ratios…").clicked() {
                    save_ratios_dialog(state);
                }
                ui.separator();
            }

            // ---- Submission ----
            if !state.datapoints.is_empty() {
                ui.strong("Add results to online repository");
                ui.checkbox(
                    &mut state.submission.confirmed,
                    "I confirm that the metadata is correct",
                );
                if state.submission.confirmed {
                    ui.add(
                        TextEdit::singleline(&mut state.submission.token)
                            .hint_text("GitHub token")
                            .password(true),
                    );
                    if ui.button("I really want to upload it").clicked() {
                        submit_results(state);
                    }
                }
                if let Some(url) = &state.submission.last_pr_url {
                    ui.hyperlink(url);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Central panel – results
// ---------------------------------------------------------------------------

/// Render the results view: prepared-table head plus the two plots.
pub fn central_panel(ui: &mut Ui, state: &AppState) {
    let Some(result) = &state.result else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open an export (File → Open…) and press Parse and bench");
        });
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Results");
            ui.label(format!(
                "{} peptidoforms quantified, {} skipped",
                result.ratios.rows.len(),
                result.ratios.skipped
            ));

            egui::CollapsingHeader::new(RichText::new("Sample of the prepared table").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    results_table(ui, &result.prepared.table, state);
                });

            egui::CollapsingHeader::new(RichText::new("Ratio between conditions").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.set_min_height(260.0);
                    plot::ratio_plot(ui, &result.ratios, &state.color_map, &state.settings);
                });

            egui::CollapsingHeader::new(RichText::new("Mean error between conditions").strong())
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.set_min_height(260.0);
                    plot::metric_plot(ui, &state.datapoints);
                });
        });
}

/// Head of the prepared table: the canonical columns plus species flags.
fn results_table(ui: &mut Ui, table: &ResultTable, state: &AppState) {
    let mut columns: Vec<&str> = vec![
        RAW_FILE,
        SEQUENCE,
        CHARGE,
        INTENSITY,
        REPLICATE,
        PEPTIDOFORM,
        CONTAMINANT,
    ];
    let species: Vec<&String> = state.settings.species.keys().collect();
    columns.extend(species.iter().map(|name| name.as_str()));

    let n_rows = table.len().min(TABLE_HEAD);

    TableBuilder::new(ui)
        .striped(true)
        .columns(Column::auto().resizable(true), columns.len())
        .header(20.0, |mut header| {
            for col in &columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(*col);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, n_rows, |mut row| {
                let table_row = &table.rows[row.index()];
                for col in &columns {
                    row.col(|ui: &mut Ui| {
                        let text = table_row
                            .get(col)
                            .map(|cell| cell.to_string())
                            .unwrap_or_default();
                        ui.label(text);
                    });
                }
            });
        });
}

// ---------------------------------------------------------------------------
// Dialogs and submission
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open search-engine export")
        .add_filter("Supported files", &["csv", "tsv", "txt", "json", "parquet", "pq"])
        .add_filter("Delimited text", &["csv", "tsv", "txt"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_file(&path);
    }
}

fn save_ratios_dialog(state: &mut AppState) {
    let Some(result) = &state.result else {
        return;
    };
    let default_name = state
        .datapoints
        .last()
        .map(|datapoint| format!("{}.csv", datapoint.id))
        .unwrap_or_else(|| "ratios.csv".to_string());

    let file = rfd::FileDialog::new()
        .set_title("Save calculated ratios")
        .set_file_name(default_name)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        let outcome = result
            .ratios
            .to_csv()
            .and_then(|csv| std::fs::write(&path, csv).map_err(Into::into));
        match outcome {
            Ok(()) => log::info!("Wrote ratio table to {}", path.display()),
            Err(e) => {
                log::error!("Failed to write ratio table: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

fn submit_results(state: &mut AppState) {
    let Some(datapoint) = state.datapoints.last() else {
        return;
    };
    let branch_name = datapoint.id.replace(['.', ' '], "_");

    match github::submit_datapoints(
        &ResultsRepo::default(),
        &state.submission.token,
        &state.datapoints,
        &branch_name,
    ) {
        Ok(url) => {
            state.submission.last_pr_url = Some(url);
            state.status_message = None;
        }
        Err(e) => {
            log::error!("Submission failed: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
