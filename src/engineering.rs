//! Per-fighter feature engineering.
//!
//! Every fighter's timeline is turned into `(row, corner, stat, value)`
//! writes by a pure function; the writes are merged into a new table at the
//! end. Regression models are fit once, before any writes are produced.

use tracing::{debug, info};

use crate::error::{FeatureError, Result};
use crate::io::FightTable;
use crate::model::{BootstrapRegressor, FirstFightImputer, RegressionDataset};
use crate::stats::{Corner, CornerPair, PerStat, TrackedStat};
use crate::timeline::{require_corner, FighterIndex, FighterTimeline};
use crate::trailing::TrailingAverages;

/// Run parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineeringOptions {
    /// Adjusted R² below which an imputation model is reported as weak.
    pub min_adjusted_r2: f64,
}

impl Default for EngineeringOptions {
    fn default() -> Self {
        EngineeringOptions { min_adjusted_r2: 0.3 }
    }
}

/// How a fighter's history is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FighterState {
    /// One fight or fewer: nothing to average.
    Skip,
    /// Exactly two fights: the first pre-fight average is imputed from the
    /// second, and the fighter contributes nothing to the regressions.
    Bootstrap,
    /// Three or more fights: expanding means, first value still imputed.
    Normal,
}

impl FighterState {
    pub fn from_fights(fights: usize) -> Self {
        match fights {
            0 | 1 => FighterState::Skip,
            2 => FighterState::Bootstrap,
            _ => FighterState::Normal,
        }
    }
}

/// A single derived value destined for `<corner>_<stat>_average` of `row`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageWrite {
    pub row: usize,
    pub corner: Corner,
    pub stat: TrackedStat,
    pub value: f64,
}

/// Pure per-fighter step: pre-fight averages for each fight, with fight 0
/// filled in by `imputer`.
pub fn fighter_writes<I: FirstFightImputer + ?Sized>(
    table: &FightTable,
    timeline: &FighterTimeline,
    imputer: &I,
) -> Result<Vec<AverageWrite>> {
    if FighterState::from_fights(timeline.len()) == FighterState::Skip {
        return Ok(Vec::new());
    }

    let averages = PerStat::try_from_fn(|stat| TrailingAverages::build(timeline.series(stat)?))?;
    let imputed = averages.map(|stat, avgs| imputer.impute(stat, avgs.entering_second()));

    let fighter = timeline.fighter();
    let mut writes = Vec::with_capacity(timeline.len() * TrackedStat::ALL.len());
    for (i, entry) in timeline.entries().iter().enumerate() {
        // re-check the row before writing into one of its corners
        let fight = table.fights().get(entry.row).ok_or_else(|| FeatureError::CornerAmbiguity {
            fighter: fighter.to_string(),
            row: entry.row,
            found: "neither",
        })?;
        let corner = require_corner(fight, fighter, entry.row)?;
        if corner != entry.corner {
            return Err(FeatureError::CornerMismatch {
                fighter: fighter.to_string(),
                row: entry.row,
                expected: entry.corner,
            });
        }

        for (stat, avgs) in averages.iter() {
            let value = avgs.pre(i).unwrap_or(*imputed.get(stat));
            writes.push(AverageWrite {
                row: entry.row,
                corner: entry.corner,
                stat,
                value,
            });
        }
    }
    Ok(writes)
}

/// Counts gathered over one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub fighters: usize,
    pub skipped: usize,
    pub bootstrapped: usize,
    pub normal: usize,
    pub regression_fighters: usize,
    pub writes: usize,
    pub complete_rows: usize,
    pub weak_models: Vec<TrackedStat>,
}

/// The input table plus one optional average per row, corner and statistic.
#[derive(Debug, Clone)]
pub struct EngineeredTable {
    base: FightTable,
    averages: Vec<CornerPair<PerStat<Option<f64>>>>,
    summary: RunSummary,
}

impl EngineeredTable {
    /// Merge `writes` into a fresh table. Writing the same cell twice means
    /// two fighters claimed one corner of a row, which is an integrity error.
    pub fn merge(base: FightTable, writes: &[AverageWrite]) -> Result<Self> {
        let mut averages = vec![CornerPair::<PerStat<Option<f64>>>::default(); base.len()];
        for w in writes {
            let slot = averages[w.row].get_mut(w.corner).get_mut(w.stat);
            if slot.is_some() {
                return Err(FeatureError::DuplicateWrite {
                    row: w.row,
                    corner: w.corner,
                    stat: w.stat,
                });
            }
            *slot = Some(w.value);
        }
        Ok(EngineeredTable {
            base,
            averages,
            summary: RunSummary::default(),
        })
    }

    pub fn base(&self) -> &FightTable {
        &self.base
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Record the statistics whose imputation model was reported as weak.
    pub fn with_weak_models(mut self, weak: Vec<TrackedStat>) -> Self {
        self.summary.weak_models = weak;
        self
    }

    pub fn average(&self, row: usize, corner: Corner, stat: TrackedStat) -> Option<f64> {
        self.averages.get(row).and_then(|pair| *pair.get(corner).get(stat))
    }

    /// Whether both corners of `row` carry every average.
    pub fn is_complete(&self, row: usize) -> bool {
        self.averages.get(row).is_some_and(|pair| {
            Corner::BOTH
                .into_iter()
                .all(|corner| pair.get(corner).iter().all(|(_, v)| v.is_some()))
        })
    }

    pub fn complete_rows(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_complete(row)).count()
    }

    /// Keep only rows where both fighters have every average, as model
    /// training requires.
    pub fn drop_incomplete(self) -> Self {
        let keep: Vec<bool> = (0..self.len()).map(|row| self.is_complete(row)).collect();
        let EngineeredTable { base, averages, summary } = self;
        let dropped = keep.iter().filter(|k| !**k).count();
        let averages: Vec<_> = averages
            .into_iter()
            .zip(&keep)
            .filter(|(_, keep_row)| **keep_row)
            .map(|(pair, _)| pair)
            .collect();
        let base = base.retain_rows(&keep);
        info!(dropped, kept = base.len(), "dropped rows without complete averages");
        EngineeredTable { base, averages, summary }
    }
}

/// Timelines and the pooled regression data for a table, ready to fit and apply.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    table: FightTable,
    timelines: Vec<FighterTimeline>,
    dataset: RegressionDataset,
}

impl FeaturePipeline {
    pub fn new(table: FightTable) -> Result<Self> {
        let index = FighterIndex::new(&table);
        let timelines = index
            .iter()
            .map(|(fighter, rows)| FighterTimeline::from_rows(&table, fighter, rows, &TrackedStat::ALL))
            .collect::<Result<Vec<_>>>()?;
        let dataset = RegressionDataset::from_timelines(&timelines)?;
        info!(
            fighters = timelines.len(),
            regression_fighters = dataset.fighters(),
            "built fighter timelines"
        );
        Ok(FeaturePipeline { table, timelines, dataset })
    }

    pub fn table(&self) -> &FightTable {
        &self.table
    }

    pub fn timelines(&self) -> &[FighterTimeline] {
        &self.timelines
    }

    pub fn dataset(&self) -> &RegressionDataset {
        &self.dataset
    }

    pub fn fit(&self) -> Result<BootstrapRegressor> {
        BootstrapRegressor::fit(&self.dataset)
    }

    /// Produce every fighter's writes with `imputer` and merge them.
    pub fn apply<I: FirstFightImputer + ?Sized>(self, imputer: &I) -> Result<EngineeredTable> {
        let mut summary = RunSummary {
            fighters: self.timelines.len(),
            regression_fighters: self.dataset.fighters(),
            ..RunSummary::default()
        };
        let mut writes = Vec::new();
        for timeline in &self.timelines {
            match FighterState::from_fights(timeline.len()) {
                FighterState::Skip => summary.skipped += 1,
                FighterState::Bootstrap => summary.bootstrapped += 1,
                FighterState::Normal => summary.normal += 1,
            }
            let produced = fighter_writes(&self.table, timeline, imputer)?;
            debug!(fighter = timeline.fighter(), writes = produced.len(), "fighter averages");
            writes.extend(produced);
        }
        summary.writes = writes.len();

        let mut out = EngineeredTable::merge(self.table, &writes)?;
        summary.complete_rows = out.complete_rows();
        info!(
            fighters = summary.fighters,
            skipped = summary.skipped,
            bootstrapped = summary.bootstrapped,
            normal = summary.normal,
            writes = summary.writes,
            complete_rows = summary.complete_rows,
            "feature engineering finished"
        );
        out.summary = summary;
        Ok(out)
    }
}

/// Fit the imputation models on `table` and append every trailing-average column.
pub fn run_feature_engineering(table: FightTable, options: &EngineeringOptions) -> Result<EngineeredTable> {
    let pipeline = FeaturePipeline::new(table)?;
    let regressor = pipeline.fit()?;
    let weak = regressor.check_fit(options.min_adjusted_r2);
    Ok(pipeline.apply(&regressor)?.with_weak_models(weak))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{FightRecord, FightTable};
    use crate::timeline::build_timeline;
    use crate::timeline::tests::fight;

    /// Imputer returning a fixed value per call, to observe where fight 0 lands.
    struct Fixed(f64);

    impl FirstFightImputer for Fixed {
        fn impute(&self, _stat: TrackedStat, _entering_second_fight: f64) -> f64 {
            self.0
        }
    }

    fn writes_for(writes: &[AverageWrite], stat: TrackedStat) -> Vec<(usize, Corner, f64)> {
        writes
            .iter()
            .filter(|w| w.stat == stat)
            .map(|w| (w.row, w.corner, w.value))
            .collect()
    }

    #[test]
    fn state_boundaries() {
        assert_eq!(FighterState::from_fights(1), FighterState::Skip);
        assert_eq!(FighterState::from_fights(2), FighterState::Bootstrap);
        assert_eq!(FighterState::from_fights(3), FighterState::Normal);
    }

    #[test]
    fn single_fight_produces_no_writes() {
        let table = FightTable::from_fights(vec![fight((2020, 1, 1), "A", "B", 0.5, 0.5)]);
        let tl = build_timeline(&table, "A", &TrackedStat::ALL).unwrap();
        assert!(fighter_writes(&table, &tl, &Fixed(0.9)).unwrap().is_empty());

        let out = EngineeredTable::merge(table, &[]).unwrap();
        for corner in Corner::BOTH {
            for stat in TrackedStat::ALL {
                assert_eq!(out.average(0, corner, stat), None);
            }
        }
    }

    #[test]
    fn writes_follow_corner_of_each_row() {
        // X: red, blue, red
        let table = FightTable::from_fights(vec![
            fight((2020, 1, 1), "X", "P", 0.40, 0.0),
            fight((2020, 2, 1), "Q", "X", 0.0, 0.60),
            fight((2020, 3, 1), "X", "R", 0.50, 0.0),
        ]);
        let tl = build_timeline(&table, "X", &TrackedStat::ALL).unwrap();
        let writes = fighter_writes(&table, &tl, &Fixed(0.9)).unwrap();
        assert_eq!(writes.len(), 3 * 4);
        let sig = writes_for(&writes, TrackedStat::SigStrAccuracy);
        assert_eq!(sig[0], (0, Corner::Red, 0.9));
        assert_eq!(sig[1], (1, Corner::Blue, 0.40));
        assert_eq!((sig[2].0, sig[2].1), (2, Corner::Red));
        assert!((sig[2].2 - 0.50).abs() < 1e-12);

        for w in &writes {
            let expected = if table.fights()[w.row].fighter(Corner::Red) == "X" { Corner::Red } else { Corner::Blue };
            assert_eq!(w.corner, expected);
        }
    }

    #[test]
    fn bootstrap_fighter_imputes_from_second_fight_average() {
        let table = FightTable::from_fights(vec![
            fight((2020, 1, 1), "Y", "P", 0.30, 0.0),
            fight((2020, 2, 1), "Q", "Y", 0.0, 0.70),
        ]);
        let tl = build_timeline(&table, "Y", &TrackedStat::ALL).unwrap();

        struct Echo;
        impl FirstFightImputer for Echo {
            fn impute(&self, _stat: TrackedStat, x: f64) -> f64 {
                x * 2.0
            }
        }
        let writes = fighter_writes(&table, &tl, &Echo).unwrap();
        let td = writes_for(&writes, TrackedStat::TakedownAccuracy);
        assert_eq!(td, vec![(0, Corner::Red, 0.60), (1, Corner::Blue, 0.30)]);
    }

    #[test]
    fn stale_timeline_is_an_integrity_error() {
        let table = FightTable::from_fights(vec![
            fight((2020, 1, 1), "X", "P", 0.4, 0.0),
            fight((2020, 2, 1), "X", "Q", 0.6, 0.0),
        ]);
        let tl = build_timeline(&table, "X", &TrackedStat::ALL).unwrap();
        // same shape of table, but X is no longer in row 1
        let other = FightTable::from_fights(vec![
            fight((2020, 1, 1), "X", "P", 0.4, 0.0),
            fight((2020, 2, 1), "Z", "Q", 0.6, 0.0),
        ]);
        let err = fighter_writes(&other, &tl, &Fixed(0.5)).unwrap_err();
        assert!(matches!(err, FeatureError::CornerAmbiguity { row: 1, found: "neither", .. }));

        // X moved to the blue corner of row 1
        let swapped = FightTable::from_fights(vec![
            fight((2020, 1, 1), "X", "P", 0.4, 0.0),
            fight((2020, 2, 1), "Q", "X", 0.0, 0.6),
        ]);
        let err = fighter_writes(&swapped, &tl, &Fixed(0.5)).unwrap_err();
        assert!(matches!(err, FeatureError::CornerMismatch { row: 1, expected: Corner::Red, .. }));
    }

    #[test]
    fn duplicate_writes_are_rejected() {
        let table = FightTable::from_fights(vec![fight((2020, 1, 1), "A", "B", 0.5, 0.5)]);
        let w = AverageWrite { row: 0, corner: Corner::Red, stat: TrackedStat::TakedownAccuracy, value: 0.1 };
        let err = EngineeredTable::merge(table, &[w, w]).unwrap_err();
        assert!(matches!(err, FeatureError::DuplicateWrite { row: 0, corner: Corner::Red, .. }));
    }

    fn league() -> Vec<FightRecord> {
        // A and B fight often enough to feed the regressions, C twice, D once
        let schedule = [
            ((2019, 1, 5), "A", "B", 0.40, 0.30),
            ((2019, 3, 9), "B", "A", 0.55, 0.60),
            ((2019, 6, 1), "A", "C", 0.50, 0.20),
            ((2019, 9, 14), "C", "B", 0.45, 0.35),
            ((2020, 1, 18), "B", "A", 0.65, 0.70),
            ((2020, 5, 2), "A", "B", 0.20, 0.50),
            ((2020, 8, 8), "D", "A", 0.10, 0.45),
        ];
        schedule
            .iter()
            .map(|&(d, r, b, rv, bv)| fight(d, r, b, rv, bv))
            .collect()
    }

    #[test]
    fn full_run_fills_every_multi_fight_fighter() {
        let table = FightTable::from_fights(league());
        let out = run_feature_engineering(table, &EngineeringOptions::default()).unwrap();
        let summary = out.summary();
        assert_eq!(summary.fighters, 4);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.bootstrapped, 1);
        assert_eq!(summary.normal, 2);
        assert_eq!(summary.regression_fighters, 2);
        // A: 6 fights, B: 5, C: 2, D: 0 writes; 4 stats each
        assert_eq!(summary.writes, (6 + 5 + 2) * 4);

        // D's corner of the last row stays empty, A's is set
        assert_eq!(out.average(6, Corner::Red, TrackedStat::SigStrAccuracy), None);
        assert!(out.average(6, Corner::Blue, TrackedStat::SigStrAccuracy).is_some());
        assert!(!out.is_complete(6));
        assert_eq!(summary.complete_rows, 6);

        // A's series: 0.40, 0.60, 0.50, 0.70, 0.20 -> entering row 5 fight is mean of first four
        let a_row5 = out.average(5, Corner::Red, TrackedStat::TakedownAccuracy).unwrap();
        assert!((a_row5 - 0.55).abs() < 1e-12);

        let trimmed = out.drop_incomplete();
        assert_eq!(trimmed.len(), 6);
        assert_eq!(trimmed.complete_rows(), 6);
    }

    #[test]
    fn bootstrap_value_matches_fitted_model() {
        let pipeline = FeaturePipeline::new(FightTable::from_fights(league())).unwrap();
        let regressor = pipeline.fit().unwrap();
        let expected = regressor.model(TrackedStat::TakedownAccuracy).predict(0.20);
        let out = pipeline.apply(&regressor).unwrap();
        // C fights from blue in row 2 with 0.20, then red in row 3
        let c_first = out.average(2, Corner::Blue, TrackedStat::TakedownAccuracy).unwrap();
        assert_eq!(c_first, expected);
        assert_eq!(out.average(3, Corner::Red, TrackedStat::TakedownAccuracy), Some(0.20));
    }

    #[test]
    fn too_little_history_fails_the_run() {
        let table = FightTable::from_fights(vec![
            fight((2020, 1, 1), "A", "B", 0.4, 0.3),
            fight((2020, 2, 1), "A", "B", 0.5, 0.3),
        ]);
        let err = run_feature_engineering(table, &EngineeringOptions::default()).unwrap_err();
        assert!(matches!(err, FeatureError::InsufficientRegressionData { distinct: 0, .. }));
    }
}
