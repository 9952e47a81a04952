//! Row-matrix exports for downstream linear algebra.
//!
//! Row `i` is the instant at index position `i`; column `j` is the `j`-th key
//! in collection order.

use crate::collection::TimeSeriesCollection;
use crate::dataset::Dataset;

/// One row per index position, one column per key.
#[derive(Debug, Clone, PartialEq)]
pub struct RowMatrix {
    rows: Dataset<Vec<f64>>,
    num_cols: usize,
}

impl RowMatrix {
    /// Rows in index order.
    pub fn rows(&self) -> &Dataset<Vec<f64>> {
        &self.rows
    }

    pub fn into_rows(self) -> Dataset<Vec<f64>> {
        self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of keys in the source collection, including for a matrix with
    /// no rows.
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }
}

/// A matrix row tagged with its 0-based position in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRow {
    pub index: u64,
    pub vector: Vec<f64>,
}

/// [`RowMatrix`] whose rows carry their index position.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRowMatrix {
    rows: Dataset<IndexedRow>,
    num_cols: usize,
}

impl IndexedRowMatrix {
    pub fn rows(&self) -> &Dataset<IndexedRow> {
        &self.rows
    }

    pub fn into_rows(self) -> Dataset<IndexedRow> {
        self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// Drops the row tags.
    pub fn to_row_matrix(&self) -> RowMatrix {
        RowMatrix {
            rows: self.rows.map(|row| row.vector.clone()),
            num_cols: self.num_cols,
        }
    }
}

impl TimeSeriesCollection {
    /// Exports the per-instant vectors as matrix rows.
    ///
    /// # Returns
    /// * `RowMatrix` - `index().size()` rows of `count()` values, row `i` being
    ///   the instant at position `i`.
    pub fn to_row_matrix(&self) -> RowMatrix {
        RowMatrix {
            rows: self.to_instants().map(|instant| instant.values.clone()),
            num_cols: self.count(),
        }
    }

    /// Like [`to_row_matrix`](Self::to_row_matrix), tagging every row with its
    /// 0-based position.
    pub fn to_indexed_row_matrix(&self) -> IndexedRowMatrix {
        let rows = self.instants_by_position().map(|(position, instant)| IndexedRow {
            index: *position as u64,
            vector: instant.values.clone(),
        });
        IndexedRowMatrix {
            rows,
            num_cols: self.count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Series;
    use crate::frequency::Frequency;
    use crate::index::DateTimeIndex;
    use crate::utils::parse_timestamp;

    fn collection() -> TimeSeriesCollection {
        let index = DateTimeIndex::uniform(
            parse_timestamp("2015-04-09").unwrap(),
            4,
            Frequency::days(1).unwrap(),
        )
        .unwrap();
        let series = ["a", "b", "c", "d", "e"]
            .iter()
            .zip((0..20).step_by(4))
            .map(|(label, seed)| Series::new(*label, (seed..seed + 4).map(f64::from).collect()))
            .collect();
        TimeSeriesCollection::new(index, Dataset::parallelize(series, 3)).unwrap()
    }

    fn strided(from: i32) -> Vec<f64> {
        (from..20).step_by(4).map(f64::from).collect()
    }

    #[test]
    fn row_matrix_follows_index_order() {
        let matrix = collection().to_row_matrix();
        assert_eq!((matrix.num_rows(), matrix.num_cols()), (4, 5));
        assert_eq!(
            matrix.into_rows().collect(),
            vec![strided(0), strided(1), strided(2), strided(3)]
        );
    }

    #[test]
    fn indexed_rows_carry_positions() {
        let matrix = collection().to_indexed_row_matrix();
        let rows = matrix.rows().clone().collect();
        let indices: Vec<u64> = rows.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        let data: Vec<Vec<f64>> = rows.into_iter().map(|r| r.vector).collect();
        assert_eq!(data, vec![strided(0), strided(1), strided(2), strided(3)]);
        assert_eq!(matrix.to_row_matrix(), collection().to_row_matrix());
    }
}
