//! Saving and loading a collection as a directory.
//!
//! Layout:
//! * `index.idx` holds the shared [`DateTimeIndex`] encoded with `bincode`.
//! * `part-NNNNN.csv` holds one partition, one headerless row per series:
//!   `key, first timestamp, descriptor token, value_0 .. value_{n-1}`.
//!
//! The token is the frequency descriptor (`1D`, `3B`, ...) for a uniform index
//! and `irregular` otherwise. The first timestamp and the token are repeated on
//! every row so a partition file can be checked against `index.idx` on its own.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::collection::{Series, TimeSeriesCollection};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::index::{DateTimeIndex, TimeIndex};
use crate::utils::{format_timestamp, format_value, parse_timestamp, parse_value};

pub const INDEX_FILE: &str = "index.idx";
const IRREGULAR_TOKEN: &str = "irregular";

fn partition_file(id: usize) -> String {
    format!("part-{id:05}.csv")
}

fn is_partition_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with("part-") && name.ends_with(".csv"))
}

fn descriptor_token(index: &DateTimeIndex) -> String {
    match index {
        DateTimeIndex::Uniform(u) => u.frequency().to_string(),
        DateTimeIndex::Irregular(_) => IRREGULAR_TOKEN.to_string(),
    }
}

/// Serializes the index with `bincode` into `dir/index.idx`.
fn save_index(index: &DateTimeIndex, dir: &Path) -> Result<()> {
    let data = bincode::serialize(index)?;
    std::fs::write(dir.join(INDEX_FILE), data)?;
    Ok(())
}

/// Reads the index written by [`save_index`].
pub fn load_index<P: AsRef<Path>>(dir: P) -> Result<DateTimeIndex> {
    let data = std::fs::read(dir.as_ref().join(INDEX_FILE))?;
    Ok(bincode::deserialize(&data)?)
}

fn ensure_empty_dir(dir: &Path) -> Result<()> {
    if dir.exists() && std::fs::read_dir(dir)?.next().is_some() {
        return Err(Error::AlreadyExists(dir.to_path_buf()));
    }
    std::fs::create_dir_all(dir)?;
    Ok(())
}

fn write_partition(path: &Path, series: &[Series], first: &str, token: &str) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    for s in series {
        let mut record = Vec::with_capacity(s.values.len() + 3);
        record.push(s.key.clone());
        record.push(first.to_string());
        record.push(token.to_string());
        record.extend(s.values.iter().map(|v| format_value(*v)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_partition(path: &Path, index: &DateTimeIndex, token: &str) -> Result<Vec<Series>> {
    let file = std::fs::File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Vec::new());
    }
    // SAFETY: the map is read-only and dropped before this function returns;
    // partition files are not modified while a load is in progress.
    let mmap = unsafe { memmap2::Mmap::map(&file)? };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(&mmap[..]);

    let expected_first = index.first();
    let size = index.size();
    let mut series = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        let key = field(0).to_string();

        let first = match field(1) {
            "" => None,
            text => Some(parse_timestamp(text)?),
        };
        if first != expected_first {
            return Err(Error::IndexMismatch(format!(
                "{}: series {key:?} starts at {:?}, index starts at {:?}",
                path.display(),
                field(1),
                expected_first.as_ref().map(format_timestamp),
            )));
        }
        if field(2) != token {
            return Err(Error::IndexMismatch(format!(
                "{}: series {key:?} has descriptor {:?}, index has {token:?}",
                path.display(),
                field(2),
            )));
        }
        let values = record
            .iter()
            .skip(3)
            .map(parse_value)
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != size {
            return Err(Error::IndexMismatch(format!(
                "{}: series {key:?} has {} values, index has {size} positions",
                path.display(),
                values.len(),
            )));
        }
        series.push(Series::new(key, values));
    }
    Ok(series)
}

impl TimeSeriesCollection {
    /// Writes the collection to `dir`, one file per partition.
    ///
    /// # Errors
    /// * [`Error::AlreadyExists`] if `dir` exists and is not empty.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        ensure_empty_dir(dir)?;
        save_index(self.index(), dir)?;

        let first = self.index().first().map(|t| format_timestamp(&t)).unwrap_or_default();
        let token = descriptor_token(self.index());
        self.series()
            .partitions()
            .par_iter()
            .enumerate()
            .try_for_each(|(id, part)| write_partition(&dir.join(partition_file(id)), part, &first, &token))?;

        tracing::info!(
            dir = %dir.display(),
            partitions = self.partition_count(),
            series = self.count(),
            "saved collection"
        );
        Ok(())
    }

    /// Reads a collection written by [`save`](Self::save).
    ///
    /// Partition files are read in parallel and ordered by file name, so keys
    /// come back in the order they were saved.
    ///
    /// # Errors
    /// * [`Error::IndexMismatch`] if a row disagrees with `index.idx`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let index = load_index(dir)?;
        let token = descriptor_token(&index);

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_partition_file(path))
            .collect();
        paths.sort();

        let partitions = paths
            .par_iter()
            .map(|path| read_partition(path, &index, &token))
            .collect::<Result<Vec<_>>>()?;

        tracing::info!(
            dir = %dir.display(),
            partitions = partitions.len(),
            "loaded collection"
        );
        Self::new(index, Dataset::from_partitions(partitions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::Frequency;
    use crate::Timestamp;
    use chrono::Duration;

    fn start() -> Timestamp {
        parse_timestamp("2015-04-09").unwrap()
    }

    fn values_bits(coll: &TimeSeriesCollection) -> Vec<(String, Vec<u64>)> {
        coll.collect()
            .into_iter()
            .map(|s| (s.key, s.values.iter().map(|v| v.to_bits()).collect()))
            .collect()
    }

    #[test]
    fn round_trip_is_bit_exact() {
        let index = DateTimeIndex::uniform(start(), 4, Frequency::business_days(1).unwrap()).unwrap();
        let series = vec![
            Series::new("plain", vec![0.1, -2.5e-300, 1.0 / 3.0, 42.0]),
            Series::new("odd, key", vec![f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.0]),
            Series::new("third", vec![1.0, 2.0, 3.0, 4.0]),
        ];
        let coll = TimeSeriesCollection::new(index, Dataset::parallelize(series, 2)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("coll");
        coll.save(&target).unwrap();
        assert!(target.join(INDEX_FILE).exists());
        assert!(target.join("part-00001.csv").exists());

        let back = TimeSeriesCollection::load(&target).unwrap();
        assert_eq!(back.index(), coll.index());
        assert!(back.index().is_uniform());
        assert_eq!(back.partition_count(), 2);
        assert_eq!(values_bits(&back), values_bits(&coll));
    }

    #[test]
    fn irregular_and_empty_partitions() {
        let index = DateTimeIndex::irregular([start(), start() + Duration::hours(5)]).unwrap();
        let series = vec![Series::new("only", vec![1.0, 2.0])];
        let coll = TimeSeriesCollection::new(index, Dataset::parallelize(series, 3)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        coll.save(dir.path()).unwrap();
        let back = TimeSeriesCollection::load(dir.path()).unwrap();
        assert_eq!(back.index(), coll.index());
        assert!(!back.index().is_uniform());
        assert_eq!(back.partition_count(), 3);
        assert_eq!(back.collect(), coll.collect());
    }

    #[test]
    fn refuses_non_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), "x").unwrap();
        let coll = TimeSeriesCollection::new(
            DateTimeIndex::uniform(start(), 1, Frequency::days(1).unwrap()).unwrap(),
            Dataset::parallelize(vec![Series::new("a", vec![1.0])], 1),
        )
        .unwrap();
        assert!(matches!(coll.save(dir.path()), Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let index = DateTimeIndex::uniform(start(), 2, Frequency::days(1).unwrap()).unwrap();
        let coll = TimeSeriesCollection::new(
            index,
            Dataset::parallelize(vec![Series::new("a", vec![1.0, 2.0])], 1),
        )
        .unwrap();

        let cases = [
            "a,2015-04-10T00:00:00Z,1D,1,2\n",
            "a,2015-04-09T00:00:00Z,2D,1,2\n",
            "a,2015-04-09T00:00:00Z,1D,1\n",
        ];
        for row in cases {
            let dir = tempfile::tempdir().unwrap();
            coll.save(dir.path()).unwrap();
            std::fs::write(dir.path().join(partition_file(0)), row).unwrap();
            assert!(
                matches!(TimeSeriesCollection::load(dir.path()), Err(Error::IndexMismatch(_))),
                "row {row:?} should not load"
            );
        }
    }
}
