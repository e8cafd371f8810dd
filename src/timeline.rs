//! Per-fighter fight history.
//!
//! A fighter shows up in the red corner of some rows and the blue corner of
//! others. A timeline collects those rows in date order and resolves each
//! tracked statistic to the column of the corner the fighter actually held.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::trace;

use crate::error::{FeatureError, Result};
use crate::io::{FightRecord, FightTable};
use crate::stats::{Corner, PerStat, TrackedStat};

/// Outcome of checking which corner of a row a fighter occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CornerMatch {
    Red,
    Blue,
    Neither,
    Both,
}

impl CornerMatch {
    pub fn corner(self) -> Option<Corner> {
        match self {
            CornerMatch::Red => Some(Corner::Red),
            CornerMatch::Blue => Some(Corner::Blue),
            CornerMatch::Neither | CornerMatch::Both => None,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            CornerMatch::Red => "red",
            CornerMatch::Blue => "blue",
            CornerMatch::Neither => "neither",
            CornerMatch::Both => "both",
        }
    }
}

/// The only place corner membership is decided. Exact identifier equality.
pub fn resolve_corner(fight: &FightRecord, fighter: &str) -> CornerMatch {
    let red = fight.fighter(Corner::Red) == fighter;
    let blue = fight.fighter(Corner::Blue) == fighter;
    match (red, blue) {
        (true, false) => CornerMatch::Red,
        (false, true) => CornerMatch::Blue,
        (false, false) => CornerMatch::Neither,
        (true, true) => CornerMatch::Both,
    }
}

/// Resolve to a single corner or fail with a corner-ambiguity error.
pub fn require_corner(fight: &FightRecord, fighter: &str, row: usize) -> Result<Corner> {
    let found = resolve_corner(fight, fighter);
    found.corner().ok_or_else(|| FeatureError::CornerAmbiguity {
        fighter: fighter.to_string(),
        row,
        found: found.describe(),
    })
}

/// One fight in a timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEntry {
    /// Row index into the master table.
    pub row: usize,
    pub date: NaiveDate,
    pub corner: Corner,
}

#[derive(Debug, Clone)]
pub struct FighterTimeline {
    fighter: String,
    entries: Vec<TimelineEntry>,
    requested: Vec<TrackedStat>,
    series: PerStat<Vec<f64>>,
}

impl FighterTimeline {
    /// Build from rows already known to involve `fighter`. Rows are re-sorted
    /// by date; equal dates keep their table order.
    pub fn from_rows(
        table: &FightTable,
        fighter: &str,
        rows: &[usize],
        stats: &[TrackedStat],
    ) -> Result<Self> {
        if fighter.is_empty() {
            return Err(FeatureError::EmptyFighterId);
        }
        if rows.is_empty() {
            return Err(FeatureError::UnknownFighter(fighter.to_string()));
        }

        let fights = table.fights();
        let mut entries = rows
            .iter()
            .map(|&row| {
                let fight = &fights[row];
                let corner = require_corner(fight, fighter, row)?;
                Ok(TimelineEntry { row, date: fight.date, corner })
            })
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by_key(|e| (e.date, e.row));

        let mut requested: Vec<TrackedStat> = stats.to_vec();
        requested.sort();
        requested.dedup();

        let series = PerStat::from_fn(|stat| {
            if !requested.contains(&stat) {
                return Vec::new();
            }
            entries
                .iter()
                .map(|e| fights[e.row].stat(e.corner, stat))
                .collect()
        });

        trace!(fighter, fights = entries.len(), "built timeline");
        Ok(FighterTimeline {
            fighter: fighter.to_string(),
            entries,
            requested,
            series,
        })
    }

    pub fn fighter(&self) -> &str {
        &self.fighter
    }

    /// Number of recorded fights, always at least 1.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.entries.iter().map(|e| e.date)
    }

    pub fn stats(&self) -> &[TrackedStat] {
        &self.requested
    }

    /// Chronological values of `stat`, one per fight.
    pub fn series(&self, stat: TrackedStat) -> Result<&[f64]> {
        if !self.requested.contains(&stat) {
            return Err(FeatureError::StatNotExtracted {
                fighter: self.fighter.clone(),
                stat,
            });
        }
        let series = self.series.get(stat);
        // Every entry yields exactly one value per requested stat.
        debug_assert_eq!(series.len(), self.entries.len());
        Ok(series)
    }
}

/// Row indices per fighter, built in one pass over the table. Iteration
/// is sorted by fighter identifier.
#[derive(Debug, Clone, Default)]
pub struct FighterIndex {
    rows: BTreeMap<String, Vec<usize>>,
}

impl FighterIndex {
    pub fn new(table: &FightTable) -> Self {
        let mut rows: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (row, fight) in table.fights().iter().enumerate() {
            for corner in Corner::BOTH {
                let ids = rows.entry(fight.fighter(corner).to_string()).or_default();
                // a fighter in both corners is caught when the timeline is built
                if ids.last() != Some(&row) {
                    ids.push(row);
                }
            }
        }
        FighterIndex { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fighters(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn rows(&self, fighter: &str) -> Option<&[usize]> {
        self.rows.get(fighter).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Collect every fight of `fighter` in date order, resolving `stats` to the
/// corner they fought from.
pub fn build_timeline(
    table: &FightTable,
    fighter: &str,
    stats: &[TrackedStat],
) -> Result<FighterTimeline> {
    if fighter.is_empty() {
        return Err(FeatureError::EmptyFighterId);
    }
    let rows: Vec<usize> = table
        .fights()
        .iter()
        .enumerate()
        .filter(|(_, fight)| resolve_corner(fight, fighter) != CornerMatch::Neither)
        .map(|(row, _)| row)
        .collect();
    FighterTimeline::from_rows(table, fighter, &rows, stats)
}

/// Same as [`build_timeline`] but with statistic base names such as
/// `"td_percent"`. An unknown name is a schema error.
pub fn build_timeline_by_name<S: AsRef<str>>(
    table: &FightTable,
    fighter: &str,
    stat_names: &[S],
) -> Result<FighterTimeline> {
    let stats = stat_names
        .iter()
        .map(|name| name.as_ref().parse::<TrackedStat>())
        .collect::<Result<Vec<_>>>()?;
    build_timeline(table, fighter, &stats)
}
