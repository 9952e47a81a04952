//! Long form: one `(timestamp, key, value)` triple per series position.

use std::sync::Arc;

use crate::collection::{Series, TimeSeriesCollection};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::index::{DateTimeIndex, TimeIndex};
use crate::table::{Cell, Table};
use crate::Timestamp;

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub timestamp: Timestamp,
    pub key: String,
    pub value: f64,
}

impl Observation {
    pub fn new<K: Into<String>>(timestamp: Timestamp, key: K, value: f64) -> Self {
        Self {
            timestamp,
            key: key.into(),
            value,
        }
    }
}

impl TimeSeriesCollection {
    /// One observation per (key, position). NaN values are kept.
    pub fn to_observations(&self) -> Dataset<Observation> {
        let index = self.index();
        self.series().flat_map(|s| {
            index
                .iter()
                .zip(&s.values)
                .map(|(timestamp, value)| Observation::new(timestamp, s.key.clone(), *value))
                .collect::<Vec<_>>()
        })
    }

    pub fn to_observations_table(&self, ts_col: &str, key_col: &str, value_col: &str) -> Table {
        let rows = self.to_observations().map(|obs| {
            vec![
                Cell::Timestamp(obs.timestamp),
                Cell::Text(obs.key.clone()),
                Cell::Float(obs.value),
            ]
        });
        Table::new(
            vec![ts_col.to_string(), key_col.to_string(), value_col.to_string()],
            rows,
        )
    }

    /// Rebuilds series from observations aligned to `index`.
    ///
    /// Positions with no observation are NaN. Keys come out sorted, spread
    /// over as many partitions as `observations` has.
    ///
    /// # Errors
    /// * [`Error::UnknownTimestamp`] if an observation's timestamp is not in
    ///   `index`.
    /// * [`Error::DuplicateObservation`] if a (key, timestamp) pair repeats.
    pub fn from_observations(index: DateTimeIndex, observations: &Dataset<Observation>) -> Result<Self> {
        let placed = observations.try_map_partitions(|_, part| {
            part.iter()
                .map(|obs| match index.position_of(obs.timestamp) {
                    Some(position) => Ok((obs.key.clone(), (position, obs.timestamp, obs.value))),
                    None => Err(Error::UnknownTimestamp {
                        key: obs.key.clone(),
                        timestamp: obs.timestamp,
                    }),
                })
                .collect::<Result<Vec<_>>>()
        })?;

        let size = index.size();
        let series = placed
            .group_by_key(observations.partition_count())
            .try_map_partitions(|_, part| {
                part.iter()
                    .map(|(key, entries)| {
                        let mut values = vec![f64::NAN; size];
                        let mut seen = vec![false; size];
                        for &(position, timestamp, value) in entries {
                            if std::mem::replace(&mut seen[position], true) {
                                return Err(Error::DuplicateObservation {
                                    key: key.clone(),
                                    timestamp,
                                });
                            }
                            values[position] = value;
                        }
                        Ok(Series::new(key.clone(), values))
                    })
                    .collect::<Result<Vec<_>>>()
            })?;

        tracing::debug!(
            observations = observations.len(),
            keys = series.len(),
            "rebuilt collection from observations"
        );
        Ok(Self::from_parts(Arc::new(index), series))
    }

    /// [`from_observations`](Self::from_observations) over a table with the
    /// named timestamp, key and value columns.
    ///
    /// # Errors
    /// * Those of [`Table::to_observations`] and
    ///   [`from_observations`](Self::from_observations).
    pub fn from_observations_table(
        index: DateTimeIndex,
        table: &Table,
        ts_col: &str,
        key_col: &str,
        value_col: &str,
    ) -> Result<Self> {
        let observations = table.to_observations(ts_col, key_col, value_col)?;
        Self::from_observations(index, &observations)
    }
}

impl Table {
    /// Reads one observation per row from the named columns, keeping the
    /// table's partitioning.
    ///
    /// # Arguments
    /// * `ts_col` - Column of timestamps.
    /// * `key_col` - Column of series keys.
    /// * `value_col` - Column of values.
    ///
    /// # Errors
    /// * [`Error::MissingColumn`] if a named column is absent.
    /// * [`Error::ColumnType`] if a cell in one of those columns has the wrong type.
    pub fn to_observations(&self, ts_col: &str, key_col: &str, value_col: &str) -> Result<Dataset<Observation>> {
        let ts = self.column_position(ts_col)?;
        let key = self.column_position(key_col)?;
        let value = self.column_position(value_col)?;

        let wrong = |column: &str, expected: &'static str| Error::ColumnType {
            column: column.to_string(),
            expected,
        };
        self.rows().try_map_partitions(|_, rows| {
            rows.iter()
                .map(|row| {
                    let timestamp = match row.get(ts) {
                        Some(Cell::Timestamp(t)) => *t,
                        _ => return Err(wrong(ts_col, "timestamp")),
                    };
                    let key = match row.get(key) {
                        Some(Cell::Text(k)) => k.clone(),
                        _ => return Err(wrong(key_col, "text")),
                    };
                    let value = match row.get(value) {
                        Some(Cell::Float(v)) => *v,
                        _ => return Err(wrong(value_col, "float")),
                    };
                    Ok(Observation::new(timestamp, key, value))
                })
                .collect::<Result<Vec<_>>>()
        })
    }
}
