use eframe::egui::Ui;
use egui_plot::{HLine, Legend, LineStyle, Plot, PlotPoints, Points};

use crate::color::ColorMap;
use crate::data::ratio::{Datapoint, RatioTable};
use crate::data::settings::ParseSettings;

// ---------------------------------------------------------------------------
// Ratio plot – log2 ratio per peptidoform, coloured by species
// ---------------------------------------------------------------------------

/// One marker per quantified peptidoform: mean log2 intensity against the
/// observed log2 ratio, with a dashed line at each species' expected ratio.
pub fn ratio_plot(ui: &mut Ui, ratios: &RatioTable, color_map: &ColorMap, settings: &ParseSettings) {
    Plot::new("ratio_plot")
        .legend(Legend::default())
        .x_axis_label("log2 mean intensity")
        .y_axis_label("log2 ratio")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for (species, spec) in &settings.species {
                let color = color_map.color_for(species);

                let points: PlotPoints = ratios
                    .rows
                    .iter()
                    .filter(|row| row.species == *species)
                    .map(|row| {
                        let mean = (row.mean_numerator + row.mean_denominator) / 2.0;
                        [mean.log2(), row.log2_ratio]
                    })
                    .collect();

                plot_ui.points(Points::new(points).name(species).color(color).radius(2.0));
                plot_ui.hline(
                    HLine::new(spec.expected_ratio.log2())
                        .color(color)
                        .style(LineStyle::dashed_loose()),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Metric plot – accumulated benchmark datapoints
// ---------------------------------------------------------------------------

/// One marker per benchmark run: quantified peptidoforms against the
/// weighted mean absolute error versus the expected ratios.
pub fn metric_plot(ui: &mut Ui, datapoints: &[Datapoint]) {
    Plot::new("metric_plot")
        .legend(Legend::default())
        .x_axis_label("quantified peptidoforms")
        .y_axis_label("mean |epsilon|")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for datapoint in datapoints {
                let point: PlotPoints = vec![[
                    datapoint.n_peptidoforms as f64,
                    datapoint.weighted_mean_abs_epsilon,
                ]]
                .into();
                plot_ui.points(Points::new(point).name(&datapoint.id).radius(4.0));
            }
        });
}
