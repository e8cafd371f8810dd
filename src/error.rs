use thiserror::Error;

use crate::stats::{Corner, TrackedStat};

pub type Result<T, E = FeatureError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum FeatureError {
    #[error("schema error: required column '{0}' is missing")]
    MissingColumn(String),

    #[error("schema error: '{0}' is not a tracked statistic")]
    UnknownStat(String),

    #[error("schema error: statistic '{stat}' was not extracted for fighter '{fighter}'")]
    StatNotExtracted { fighter: String, stat: TrackedStat },

    #[error("schema error: fighter identifier must not be empty")]
    EmptyFighterId,

    #[error("schema error at line {line}: {message}")]
    InvalidValue { line: u64, message: String },

    #[error("fighter '{0}' does not appear in the dataset")]
    UnknownFighter(String),

    #[error("trailing averages need at least 2 fights, got {len}")]
    InsufficientHistory { len: usize },

    #[error("cannot fit regression for '{stat}': need at least 2 distinct X values, got {distinct}")]
    InsufficientRegressionData { stat: TrackedStat, distinct: usize },

    #[error("regression fit failed for '{stat}': {source}")]
    Regression {
        stat: TrackedStat,
        #[source]
        source: linfa_linear::LinearError<f64>,
    },

    #[error("corner ambiguity: fighter '{fighter}' matches {found} corner(s) in row {row}")]
    CornerAmbiguity { fighter: String, row: usize, found: &'static str },

    #[error("corner mismatch: fighter '{fighter}' expected in {expected} corner of row {row}")]
    CornerMismatch { fighter: String, row: usize, expected: Corner },

    #[error("average '{stat}' for the {corner} corner of row {row} was written twice")]
    DuplicateWrite { row: usize, corner: Corner, stat: TrackedStat },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
