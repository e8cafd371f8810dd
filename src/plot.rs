/// Scatter plots of the pooled regression pairs with each fitted line.
use std::error::Error;
use std::path::Path;

use plotters::prelude::*;

use crate::model::{BootstrapRegressor, RegressionDataset};
use crate::stats::TrackedStat;

/// Draws a 2x2 grid, one panel per statistic, and saves it as a PNG.
/// input: pooled pairs and the fitted models
/// logic: split the drawing area; per panel draw X against Y as dots and the
/// fitted line over [0, 1]
pub fn plot_regressions(
    path: &Path,
    dataset: &RegressionDataset,
    regressor: &BootstrapRegressor,
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (1200, 1000)).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((2, 2));

    for (area, stat) in panels.iter().zip(TrackedStat::ALL) {
        let model = regressor.model(stat);
        let mut chart = ChartBuilder::on(area)
            .caption(
                format!("{} (adj R² {:.3}, n = {})", stat, model.adjusted_r_squared(), model.n_obs()),
                ("sans-serif", 20),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..1.0_f64, 0.0..1.0_f64)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("average entering fight")
            .y_desc("average entering next fight")
            .draw()?;

        chart.draw_series(
            dataset
                .pairs(stat)
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 2, BLUE.mix(0.3).filled())),
        )?;

        chart.draw_series(LineSeries::new(
            (0..=100).map(|i| {
                let x = i as f64 / 100.0;
                (x, model.predict(x))
            }),
            &RED,
        ))?;
    }

    root.present()?;
    Ok(())
}
