// Module for loading and writing the fight dataset. It reads the clean csv, validates the
// headers the feature engineering needs, and writes the table back out with the averages.
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::engineering::EngineeredTable;
use crate::error::{FeatureError, Result};
use crate::stats::{Corner, CornerPair, PerStat, TrackedStat};

mod date_format {
    use chrono::{NaiveDate, NaiveDateTime};
    use serde::{self, Deserialize, Deserializer};

    // pandas writes plain dates, or full timestamps once a column held datetimes
    const DATE_FMTS: [&str; 2] = ["%Y-%m-%d", "%B %d, %Y"];
    const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        DATE_FMTS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
            .or_else(|| NaiveDateTime::parse_from_str(s, DATETIME_FMT).ok().map(|dt| dt.date()))
    }

    pub fn deserialize<'de, D>(d: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("unrecognised date '{}'", s)))
    }
}

/// The columns of one clean row that feature engineering reads.
/// Any other column is carried through untouched by `FightTable`.
#[derive(Debug, Deserialize)]
struct FightRow {
    #[serde(deserialize_with = "date_format::deserialize")]
    date: NaiveDate,
    red_fighter: String,
    blue_fighter: String,
    red_sig_str_percent: f64,
    blue_sig_str_percent: f64,
    red_td_percent: f64,
    blue_td_percent: f64,
    red_sig_strike_defence_percent: f64,
    blue_sig_strike_defence_percent: f64,
    red_td_defence_percent: f64,
    blue_td_defence_percent: f64,
}

impl From<FightRow> for FightRecord {
    fn from(row: FightRow) -> Self {
        FightRecord {
            date: row.date,
            fighters: CornerPair {
                red: row.red_fighter,
                blue: row.blue_fighter,
            },
            stats: CornerPair {
                red: PerStat {
                    sig_str: row.red_sig_str_percent,
                    td: row.red_td_percent,
                    sig_strike_defence: row.red_sig_strike_defence_percent,
                    td_defence: row.red_td_defence_percent,
                },
                blue: PerStat {
                    sig_str: row.blue_sig_str_percent,
                    td: row.blue_td_percent,
                    sig_strike_defence: row.blue_sig_strike_defence_percent,
                    td_defence: row.blue_td_defence_percent,
                },
            },
        }
    }
}

/// One fight: date, both corner identifiers and every tracked statistic per corner.
#[derive(Debug, Clone, PartialEq)]
pub struct FightRecord {
    pub date: NaiveDate,
    pub fighters: CornerPair<String>,
    pub stats: CornerPair<PerStat<f64>>,
}

impl FightRecord {
    pub fn fighter(&self, corner: Corner) -> &str {
        self.fighters.get(corner)
    }

    pub fn stat(&self, corner: Corner, stat: TrackedStat) -> f64 {
        *self.stats.get(corner).get(stat)
    }
}

/// The clean dataset: typed fight records plus the raw rows they came from,
/// so columns the core does not use survive the round trip.
#[derive(Debug, Clone)]
pub struct FightTable {
    headers: StringRecord,
    raw: Vec<StringRecord>,
    fights: Vec<FightRecord>,
}

/// Every column the core needs, in schema order.
pub fn required_columns() -> Vec<String> {
    let mut cols = vec![
        "date".to_string(),
        Corner::Red.fighter_column().to_string(),
        Corner::Blue.fighter_column().to_string(),
    ];
    for stat in TrackedStat::ALL {
        for corner in Corner::BOTH {
            cols.push(stat.column(corner));
        }
    }
    cols
}

impl FightTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading clean fight data");
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b',')
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        // Grab and own the header row
        let headers = rdr.headers()?.clone();
        let present: HashSet<&str> = headers.iter().collect();
        if let Some(missing) = required_columns().into_iter().find(|c| !present.contains(c.as_str())) {
            return Err(FeatureError::MissingColumn(missing));
        }
        let expected_len = headers.len();

        let mut raw_rows = Vec::new();
        let mut fights = Vec::new();
        for result in rdr.records() {
            let raw: StringRecord = result?;
            let line = raw.position().map(|p| p.line()).unwrap_or(0);

            // Skip completely empty lines
            if raw.iter().all(|f| f.trim().is_empty()) {
                debug!(line, "skipping empty line");
                continue;
            }

            if raw.len() != expected_len {
                return Err(FeatureError::InvalidValue {
                    line,
                    message: format!("expected {} fields, found {}", expected_len, raw.len()),
                });
            }

            let row: FightRow = raw
                .deserialize(Some(&headers))
                .map_err(|e| FeatureError::InvalidValue { line, message: e.to_string() })?;
            let fight = FightRecord::from(row);
            validate_fight(&fight, line)?;

            fights.push(fight);
            raw_rows.push(raw);
        }

        info!(fights = fights.len(), "loaded fight data");
        Ok(FightTable { headers, raw: raw_rows, fights })
    }

    /// Build a table straight from records, e.g. for synthetic data. Only the
    /// required columns are carried.
    pub fn from_fights(fights: Vec<FightRecord>) -> Self {
        let headers = StringRecord::from(required_columns());
        let raw = fights.iter().map(fight_to_raw).collect();
        FightTable { headers, raw, fights }
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn fights(&self) -> &[FightRecord] {
        &self.fights
    }

    pub fn raw_rows(&self) -> &[StringRecord] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.fights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fights.is_empty()
    }

    /// Keep the rows whose flag in `keep` is set, preserving order.
    pub fn retain_rows(self, keep: &[bool]) -> Self {
        let FightTable { headers, raw, fights } = self;
        let (raw, fights): (Vec<StringRecord>, Vec<FightRecord>) = raw
            .into_iter()
            .zip(fights)
            .zip(keep)
            .filter(|(_, keep_row)| **keep_row)
            .map(|(row, _)| row)
            .unzip();
        FightTable { headers, raw, fights }
    }
}

fn fight_to_raw(fight: &FightRecord) -> StringRecord {
    let mut fields = vec![
        fight.date.format("%Y-%m-%d").to_string(),
        fight.fighters.red.clone(),
        fight.fighters.blue.clone(),
    ];
    for stat in TrackedStat::ALL {
        for corner in Corner::BOTH {
            fields.push(fight.stat(corner, stat).to_string());
        }
    }
    StringRecord::from(fields)
}

fn validate_fight(fight: &FightRecord, line: u64) -> Result<()> {
    for corner in Corner::BOTH {
        if fight.fighter(corner).trim().is_empty() {
            return Err(FeatureError::InvalidValue {
                line,
                message: format!("empty {}", corner.fighter_column()),
            });
        }
        for stat in TrackedStat::ALL {
            let value = fight.stat(corner, stat);
            if !value.is_finite() {
                return Err(FeatureError::InvalidValue {
                    line,
                    message: format!("{} is not a finite number", stat.column(corner)),
                });
            }
            if !(0.0..=1.0).contains(&value) {
                warn!(line, column = %stat.column(corner), value, "percentage outside [0, 1]");
            }
        }
    }
    Ok(())
}

/// Write the engineered table: input columns (minus stale average columns)
/// followed by `red_<s>_average`, `blue_<s>_average` for each statistic.
/// Missing averages are written as empty fields.
pub fn write_csv<P: AsRef<Path>>(path: P, table: &EngineeredTable) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_to(file, table)?;
    info!(path = %path.display(), rows = table.len(), "wrote training data");
    Ok(())
}

pub fn write_to<W: Write>(writer: W, table: &EngineeredTable) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);

    let average_cols: Vec<(TrackedStat, Corner, String)> = TrackedStat::ALL
        .into_iter()
        .flat_map(|stat| Corner::BOTH.into_iter().map(move |corner| (stat, corner, stat.average_column(corner))))
        .collect();
    let stale: HashSet<&str> = average_cols.iter().map(|(_, _, name)| name.as_str()).collect();

    let base = table.base();
    let keep: Vec<usize> = base
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, h)| !stale.contains(h))
        .map(|(i, _)| i)
        .collect();

    let mut header: Vec<&str> = keep.iter().map(|&i| &base.headers()[i]).collect();
    header.extend(average_cols.iter().map(|(_, _, name)| name.as_str()));
    wtr.write_record(&header)?;

    for (row, raw) in base.raw_rows().iter().enumerate() {
        let mut fields: Vec<String> = keep.iter().map(|&i| raw[i].to_string()).collect();
        for (stat, corner, _) in &average_cols {
            fields.push(table.average(row, *corner, *stat).map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&fields)?;
    }
    wtr.flush()?;
    Ok(())
}
