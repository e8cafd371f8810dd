//! Corners and the tracked percentage statistics.
//!
//! Every fight row stores each statistic twice, once per corner
//! (`red_td_percent`, `blue_td_percent`). The types here name those columns
//! so the rest of the crate never builds column strings by hand.
use std::fmt;
use std::str::FromStr;

use crate::error::FeatureError;

/// One of the two fighter slots in a bout. Carries no seeding meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Corner {
    Red,
    Blue,
}

impl Corner {
    pub const BOTH: [Corner; 2] = [Corner::Red, Corner::Blue];

    /// Column prefix used by the dataset, without the trailing underscore.
    pub fn prefix(self) -> &'static str {
        match self {
            Corner::Red => "red",
            Corner::Blue => "blue",
        }
    }

    /// Name of the fighter-identifier column for this corner.
    pub fn fighter_column(self) -> &'static str {
        match self {
            Corner::Red => "red_fighter",
            Corner::Blue => "blue_fighter",
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// The four percentage statistics fed to the outcome classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackedStat {
    /// Significant strike accuracy
    SigStrAccuracy,
    /// Takedown accuracy
    TakedownAccuracy,
    /// Significant strike defence
    SigStrikeDefence,
    /// Takedown defence
    TakedownDefence,
}

impl TrackedStat {
    /// Fixed iteration order used everywhere output must be deterministic.
    pub const ALL: [TrackedStat; 4] = [
        TrackedStat::SigStrAccuracy,
        TrackedStat::TakedownAccuracy,
        TrackedStat::SigStrikeDefence,
        TrackedStat::TakedownDefence,
    ];

    /// Base column name, shared by both corners.
    pub fn name(self) -> &'static str {
        match self {
            TrackedStat::SigStrAccuracy => "sig_str_percent",
            TrackedStat::TakedownAccuracy => "td_percent",
            TrackedStat::SigStrikeDefence => "sig_strike_defence_percent",
            TrackedStat::TakedownDefence => "td_defence_percent",
        }
    }

    /// Base name of the derived trailing-average column.
    pub fn average_name(self) -> &'static str {
        match self {
            TrackedStat::SigStrAccuracy => "sig_str_average",
            TrackedStat::TakedownAccuracy => "td_average",
            TrackedStat::SigStrikeDefence => "sig_strike_defence_average",
            TrackedStat::TakedownDefence => "td_defence_average",
        }
    }

    pub fn column(self, corner: Corner) -> String {
        format!("{}_{}", corner.prefix(), self.name())
    }

    pub fn average_column(self, corner: Corner) -> String {
        format!("{}_{}", corner.prefix(), self.average_name())
    }
}

impl fmt::Display for TrackedStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackedStat {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackedStat::ALL
            .into_iter()
            .find(|stat| stat.name() == s)
            .ok_or_else(|| FeatureError::UnknownStat(s.to_string()))
    }
}

/// Fixed-shape record holding one value per tracked statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerStat<T> {
    pub sig_str: T,
    pub td: T,
    pub sig_strike_defence: T,
    pub td_defence: T,
}

impl<T> PerStat<T> {
    pub fn from_fn(mut f: impl FnMut(TrackedStat) -> T) -> Self {
        PerStat {
            sig_str: f(TrackedStat::SigStrAccuracy),
            td: f(TrackedStat::TakedownAccuracy),
            sig_strike_defence: f(TrackedStat::SigStrikeDefence),
            td_defence: f(TrackedStat::TakedownDefence),
        }
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(TrackedStat) -> Result<T, E>) -> Result<Self, E> {
        Ok(PerStat {
            sig_str: f(TrackedStat::SigStrAccuracy)?,
            td: f(TrackedStat::TakedownAccuracy)?,
            sig_strike_defence: f(TrackedStat::SigStrikeDefence)?,
            td_defence: f(TrackedStat::TakedownDefence)?,
        })
    }

    pub fn get(&self, stat: TrackedStat) -> &T {
        match stat {
            TrackedStat::SigStrAccuracy => &self.sig_str,
            TrackedStat::TakedownAccuracy => &self.td,
            TrackedStat::SigStrikeDefence => &self.sig_strike_defence,
            TrackedStat::TakedownDefence => &self.td_defence,
        }
    }

    pub fn get_mut(&mut self, stat: TrackedStat) -> &mut T {
        match stat {
            TrackedStat::SigStrAccuracy => &mut self.sig_str,
            TrackedStat::TakedownAccuracy => &mut self.td,
            TrackedStat::SigStrikeDefence => &mut self.sig_strike_defence,
            TrackedStat::TakedownDefence => &mut self.td_defence,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(TrackedStat, &T) -> U) -> PerStat<U> {
        PerStat::from_fn(|stat| f(stat, self.get(stat)))
    }

    /// Iterates in `TrackedStat::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (TrackedStat, &T)> + '_ {
        TrackedStat::ALL.into_iter().map(move |stat| (stat, self.get(stat)))
    }
}

/// A value held once per corner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CornerPair<T> {
    pub red: T,
    pub blue: T,
}

impl<T> CornerPair<T> {
    pub fn get(&self, corner: Corner) -> &T {
        match corner {
            Corner::Red => &self.red,
            Corner::Blue => &self.blue,
        }
    }

    pub fn get_mut(&mut self, corner: Corner) -> &mut T {
        match corner {
            Corner::Red => &mut self.red,
            Corner::Blue => &mut self.blue,
        }
    }
}
