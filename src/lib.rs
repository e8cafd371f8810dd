//! Fight-form feature engineering for MMA outcome prediction.
//!
//! Reads the clean fight table, rebuilds every fighter's history across both
//! corners, and appends the trailing average of each tracked percentage
//! statistic going into each fight. A fighter's first fight has no history,
//! so its value is imputed with a per-statistic linear regression fit on the
//! fighters with at least three fights.

pub mod engineering;
pub mod error;
pub mod io;
pub mod model;
#[cfg(feature = "plot")]
pub mod plot;
pub mod stats;
pub mod timeline;
pub mod trailing;

pub use engineering::{
    fighter_writes, run_feature_engineering, AverageWrite, EngineeredTable, EngineeringOptions,
    FeaturePipeline, FighterState, RunSummary,
};
pub use error::{FeatureError, Result};
pub use io::{write_csv, FightRecord, FightTable};
pub use model::{BootstrapRegressor, FirstFightImputer, RegressionDataset, StatRegression};
pub use stats::{Corner, CornerPair, PerStat, TrackedStat};
pub use timeline::{build_timeline, build_timeline_by_name, resolve_corner, CornerMatch, FighterTimeline};
pub use trailing::TrailingAverages;
