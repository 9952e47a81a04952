//! The partitioned time-series collection.
//!
//! A [`TimeSeriesCollection`] holds one [`Series`] per key inside a
//! [`Dataset`], and a single [`DateTimeIndex`] shared by every partition
//! through an `Arc`. Position `i` of every series is the value at
//! `index.timestamp_at(i)`, and every operation keeps it that way: a transform
//! that changes the index rebuilds every vector in the same pass and returns a
//! new collection.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::fill::FillMethod;
use crate::index::{DateTimeIndex, TimeIndex};
use crate::table::{Cell, Table};
use crate::utils::format_timestamp;
use crate::Timestamp;

/// One key and its values, aligned to the collection's index.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub key: String,
    pub values: Vec<f64>,
}

impl Series {
    /// Pairs `key` with `values`; alignment is checked when the series joins a
    /// collection.
    pub fn new<K: Into<String>>(key: K, values: Vec<f64>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }
}

/// The values of every key at one timestamp, in the collection's key order.
#[derive(Debug, Clone, PartialEq)]
pub struct Instant {
    pub timestamp: Timestamp,
    pub values: Vec<f64>,
}

/// Series keyed by string, all aligned to one shared [`DateTimeIndex`].
#[derive(Debug, Clone)]
pub struct TimeSeriesCollection {
    index: Arc<DateTimeIndex>,
    series: Dataset<Series>,
}

impl TimeSeriesCollection {
    /// Builds a collection, checking every series against the index.
    ///
    /// # Errors
    /// * [`Error::DimensionMismatch`] if a series length differs from the
    ///   index size.
    pub fn new(index: DateTimeIndex, series: Dataset<Series>) -> Result<Self> {
        let expected = index.size();
        series
            .partitions()
            .par_iter()
            .flat_map_iter(|part| part.iter())
            .try_for_each(|s| {
                if s.values.len() == expected {
                    Ok(())
                } else {
                    Err(Error::DimensionMismatch {
                        key: s.key.clone(),
                        expected,
                        actual: s.values.len(),
                    })
                }
            })?;
        Ok(Self::from_parts(Arc::new(index), series))
    }

    /// Builds a collection from entries that each carry their own index.
    ///
    /// # Errors
    /// * [`Error::IndexMismatch`] if an entry's index differs from `index`.
    /// * [`Error::DimensionMismatch`] as for [`new`](Self::new).
    pub fn from_tagged(
        index: DateTimeIndex,
        tagged: Dataset<(String, DateTimeIndex, Vec<f64>)>,
    ) -> Result<Self> {
        let series = tagged.try_map_partitions(|_, part| {
            part.iter()
                .map(|(key, own, values)| {
                    if *own != index {
                        return Err(Error::IndexMismatch(format!(
                            "series {key:?} is tagged with a different index than the collection"
                        )));
                    }
                    Ok(Series::new(key.clone(), values.clone()))
                })
                .collect::<Result<Vec<_>>>()
        })?;
        Self::new(index, series)
    }

    pub(crate) fn from_parts(index: Arc<DateTimeIndex>, series: Dataset<Series>) -> Self {
        Self { index, series }
    }

    /// The index every series is aligned to.
    pub fn index(&self) -> &DateTimeIndex {
        &self.index
    }

    /// The underlying partitioned series.
    pub fn series(&self) -> &Dataset<Series> {
        &self.series
    }

    /// Number of series.
    pub fn count(&self) -> usize {
        self.series.len()
    }

    /// Number of partitions the series are spread over.
    pub fn partition_count(&self) -> usize {
        self.series.partition_count()
    }

    /// Keys in collection order: partition by partition.
    pub fn keys(&self) -> Vec<String> {
        self.series.iter().map(|s| s.key.clone()).collect()
    }

    /// Copies every series out, in [`keys`](Self::keys) order.
    pub fn collect(&self) -> Vec<Series> {
        self.series.iter().cloned().collect()
    }

    /// Copies every series out keyed by name. When a key repeats, the last
    /// series in collection order wins.
    pub fn collect_as_map(&self) -> BTreeMap<String, Vec<f64>> {
        self.series
            .iter()
            .map(|s| (s.key.clone(), s.values.clone()))
            .collect()
    }

    /// Values of the first series called `key`.
    pub fn find_series(&self, key: &str) -> Option<Vec<f64>> {
        self.series
            .partitions()
            .par_iter()
            .find_map_first(|part| part.iter().find(|s| s.key == key))
            .map(|s| s.values.clone())
    }

    fn empty_like(&self) -> Self {
        let partitions = vec![Vec::new(); self.partition_count()];
        Self::from_parts(Arc::clone(&self.index), Dataset::from_partitions(partitions))
    }

    /// Restricts the index and every series to `[from, to]`.
    ///
    /// `from > to` gives an empty index and empty vectors, not an error.
    ///
    /// # Arguments
    /// * `from` - First timestamp to keep, inclusive.
    /// * `to` - Last timestamp to keep, inclusive.
    ///
    /// # Returns
    /// * `TimeSeriesCollection` - Same keys and partitions over the sliced index.
    pub fn slice(&self, from: Timestamp, to: Timestamp) -> Self {
        let range = self.index.slice_positions_by_date(from, to);
        let index = self.index.sub_range(range.clone());
        tracing::debug!(
            from = %format_timestamp(&from),
            to = %format_timestamp(&to),
            kept = range.len(),
            "slicing collection"
        );
        let series = self.series.map(|s| Series {
            key: s.key.clone(),
            values: s.values[range.clone()].to_vec(),
        });
        Self::from_parts(Arc::new(index), series)
    }

    /// Everything if the index ends strictly after `t`, else nothing.
    ///
    /// The test looks at the shared index, not at individual series, so the
    /// result is all-or-nothing.
    pub fn filter_ending_after(&self, t: Timestamp) -> Self {
        match self.index.last() {
            Some(last) if last > t => self.clone(),
            _ => self.empty_like(),
        }
    }

    /// Everything if the index starts strictly before `t`, else nothing.
    pub fn filter_starting_before(&self, t: Timestamp) -> Self {
        match self.index.first() {
            Some(first) if first < t => self.clone(),
            _ => self.empty_like(),
        }
    }

    /// Keeps the series whose key satisfies `pred`.
    pub fn filter<F>(&self, pred: F) -> Self
    where
        F: Fn(&str) -> bool + Sync + Send,
    {
        Self::from_parts(Arc::clone(&self.index), self.series.filter(|s| pred(&s.key)))
    }

    /// Moves every series onto `index`.
    ///
    /// Values follow their timestamps; timestamps of `index` the old index
    /// lacks become NaN and old timestamps absent from `index` are dropped.
    pub fn with_index(&self, index: DateTimeIndex) -> Self {
        let sources: Vec<Option<usize>> = index.iter().map(|t| self.index.position_of(t)).collect();
        let series = self.series.map(|s| Series {
            key: s.key.clone(),
            values: sources
                .iter()
                .map(|src| src.map_or(f64::NAN, |i| s.values[i]))
                .collect(),
        });
        Self::from_parts(Arc::new(index), series)
    }

    /// Fills NaNs in every series independently.
    pub fn fill(&self, method: FillMethod) -> Self {
        let series = self.series.map(|s| {
            let mut values = s.values.clone();
            method.apply(&mut values);
            Series {
                key: s.key.clone(),
                values,
            }
        });
        Self::from_parts(Arc::clone(&self.index), series)
    }

    /// Drops every instant at which any series holds NaN.
    ///
    /// The same positions leave the index and all vectors. The new index is
    /// irregular unless the surviving positions are evenly spaced.
    pub fn remove_instants_with_nans(&self) -> Self {
        let n = self.index.size();
        let nan_mask = self.series.aggregate(
            || vec![false; n],
            |mut mask, s| {
                for (m, v) in mask.iter_mut().zip(&s.values) {
                    *m |= v.is_nan();
                }
                mask
            },
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x |= y;
                }
                a
            },
        );
        let keep: Vec<usize> = (0..n).filter(|&i| !nan_mask[i]).collect();
        if keep.len() == n {
            return self.clone();
        }
        tracing::debug!(removed = n - keep.len(), kept = keep.len(), "removing NaN instants");

        let index = self.index.select_sorted(&keep);
        let series = self.series.map(|s| Series {
            key: s.key.clone(),
            values: keep.iter().map(|&i| s.values[i]).collect(),
        });
        Self::from_parts(Arc::new(index), series)
    }

    // Shuffles column chunks by position; each group lists one chunk per
    // source partition in partition order, which fixes the key order.
    pub(crate) fn instants_by_position(&self) -> Dataset<(usize, Instant)> {
        let n = self.index.size();
        let timestamps = self.index.to_vec();
        let chunks = self.series.map_partitions(|_, part| {
            (0..n)
                .map(|i| (i, part.iter().map(|s| s.values[i]).collect::<Vec<f64>>()))
                .collect()
        });
        chunks
            .group_by_key(self.partition_count())
            .map(|(position, chunks)| {
                (
                    *position,
                    Instant {
                        timestamp: timestamps[*position],
                        values: chunks.concat(),
                    },
                )
            })
    }

    /// One record per index position, in index order, holding every key's
    /// value at that instant in [`keys`](Self::keys) order.
    pub fn to_instants(&self) -> Dataset<Instant> {
        self.instants_by_position().map(|(_, instant)| instant.clone())
    }

    /// Instants as a table: column `instant`, then one column per key.
    pub fn to_instants_table(&self) -> Table {
        let mut columns = vec!["instant".to_string()];
        columns.extend(self.keys());
        let rows = self.to_instants().map(|instant| {
            let mut row = Vec::with_capacity(instant.values.len() + 1);
            row.push(Cell::Timestamp(instant.timestamp));
            row.extend(instant.values.iter().map(|v| Cell::Float(*v)));
            row
        });
        Table::new(columns, rows)
    }
}
