/// Linear regression models used to impute the average a fighter carried into
/// their first recorded fight.
use linfa::prelude::*;
use linfa_linear::{FittedLinearRegression, LinearRegression};
use ndarray::{Array1, Array2};
use tracing::{info, warn};

use crate::error::{FeatureError, Result};
use crate::stats::{PerStat, TrackedStat};
use crate::timeline::FighterTimeline;
use crate::trailing::TrailingAverages;

/// Fighters need this many fights before they contribute regression pairs.
pub const MIN_FIGHTS_FOR_REGRESSION: usize = 3;

/// Pooled `(X, Y)` pairs per statistic, where X is the trailing average
/// entering one fight and Y the trailing average entering the next.
#[derive(Debug, Clone, Default)]
pub struct RegressionDataset {
    pairs: PerStat<Vec<(f64, f64)>>,
    fighters: usize,
}

impl RegressionDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_timelines<'a>(timelines: impl IntoIterator<Item = &'a FighterTimeline>) -> Result<Self> {
        let mut dataset = Self::new();
        for timeline in timelines {
            dataset.add_timeline(timeline)?;
        }
        Ok(dataset)
    }

    /// Adds the fighter's transitions if they have enough fights. Returns
    /// whether the fighter contributed.
    pub fn add_timeline(&mut self, timeline: &FighterTimeline) -> Result<bool> {
        if timeline.len() < MIN_FIGHTS_FOR_REGRESSION {
            return Ok(false);
        }
        for stat in TrackedStat::ALL {
            let avgs = TrailingAverages::build(timeline.series(stat)?)?;
            self.pairs.get_mut(stat).extend(avgs.transitions());
        }
        self.fighters += 1;
        Ok(true)
    }

    pub fn pairs(&self, stat: TrackedStat) -> &[(f64, f64)] {
        self.pairs.get(stat)
    }

    /// Number of fighters pooled.
    pub fn fighters(&self) -> usize {
        self.fighters
    }
}

/// OLS fit of `Y ~ 1 + X` for one statistic. Immutable once fit.
#[derive(Debug, Clone)]
pub struct StatRegression {
    stat: TrackedStat,
    model: FittedLinearRegression<f64>,
    x: Array2<f64>,
    y: Array1<f64>,
}

impl StatRegression {
    pub fn fit(stat: TrackedStat, pairs: &[(f64, f64)]) -> Result<Self> {
        let mut xs: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
        xs.sort_by(f64::total_cmp);
        xs.dedup();
        if xs.len() < 2 {
            return Err(FeatureError::InsufficientRegressionData { stat, distinct: xs.len() });
        }

        let n = pairs.len();
        let x = Array2::from_shape_fn((n, 1), |(i, _)| pairs[i].0);
        let y = Array1::from_iter(pairs.iter().map(|(_, y)| *y));
        let ds = Dataset::new(x.clone(), y.clone());
        let model = LinearRegression::new()
            .fit(&ds)
            .map_err(|source| FeatureError::Regression { stat, source })?;

        Ok(StatRegression { stat, model, x, y })
    }

    pub fn stat(&self) -> TrackedStat {
        self.stat
    }

    pub fn intercept(&self) -> f64 {
        self.model.intercept()
    }

    pub fn slope(&self) -> f64 {
        self.model.params()[0]
    }

    pub fn n_obs(&self) -> usize {
        self.y.len()
    }

    /// Fitted mean at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept() + self.slope() * x
    }

    /// In-sample predictions for the training X values, via the fitted model.
    pub fn fitted_values(&self) -> Array1<f64> {
        self.model.predict(&self.x)
    }

    pub fn r_squared(&self) -> f64 {
        let mean = self.y.mean().unwrap_or(0.0);
        let fitted = self.fitted_values();
        let ss_res: f64 = self.y.iter().zip(fitted.iter()).map(|(y, f)| (y - f).powi(2)).sum();
        let ss_tot: f64 = self.y.iter().map(|y| (y - mean).powi(2)).sum();
        if ss_tot <= f64::EPSILON {
            // constant target: a flat line explains it fully
            return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
        }
        1.0 - ss_res / ss_tot
    }

    /// Adjusted R² for one regressor; equals R² when there are too few points.
    pub fn adjusted_r_squared(&self) -> f64 {
        let r2 = self.r_squared();
        let n = self.n_obs() as f64;
        if n <= 2.0 {
            return r2;
        }
        1.0 - (1.0 - r2) * (n - 1.0) / (n - 2.0)
    }
}

/// Estimates the trailing average a fighter carried into their first recorded
/// fight, given the average entering their second.
pub trait FirstFightImputer {
    fn impute(&self, stat: TrackedStat, entering_second_fight: f64) -> f64;
}

/// One regression per tracked statistic. The models are fit on forward
/// transitions (earlier average -> later average) and applied backwards to
/// synthesise the average before any recorded fight.
#[derive(Debug, Clone)]
pub struct BootstrapRegressor {
    models: PerStat<StatRegression>,
}

impl BootstrapRegressor {
    /// Fits all four models; any one failing aborts the run.
    pub fn fit(dataset: &RegressionDataset) -> Result<Self> {
        let models = PerStat::try_from_fn(|stat| {
            let model = StatRegression::fit(stat, dataset.pairs(stat))?;
            info!(
                stat = %stat,
                n = model.n_obs(),
                intercept = model.intercept(),
                slope = model.slope(),
                "fitted imputation model"
            );
            Ok::<_, FeatureError>(model)
        })?;
        Ok(BootstrapRegressor { models })
    }

    pub fn model(&self, stat: TrackedStat) -> &StatRegression {
        self.models.get(stat)
    }

    pub fn models(&self) -> &PerStat<StatRegression> {
        &self.models
    }

    /// Statistics whose adjusted R² falls below `min_adjusted_r2`, warning
    /// for each.
    pub fn check_fit(&self, min_adjusted_r2: f64) -> Vec<TrackedStat> {
        let mut weak = Vec::new();
        for (stat, model) in self.models.iter() {
            let adj = model.adjusted_r_squared();
            if adj < min_adjusted_r2 {
                warn!(
                    stat = %stat,
                    adjusted_r2 = adj,
                    threshold = min_adjusted_r2,
                    "imputation model explains the data poorly"
                );
                weak.push(stat);
            } else {
                info!(stat = %stat, adjusted_r2 = adj, "imputation model fit ok");
            }
        }
        weak
    }
}

impl FirstFightImputer for BootstrapRegressor {
    fn impute(&self, stat: TrackedStat, entering_second_fight: f64) -> f64 {
        self.model(stat).predict(entering_second_fight)
    }
}
