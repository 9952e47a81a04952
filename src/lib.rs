//! Partitioned collections of time series aligned to a shared calendar index.
//!
//! ```
//! use timeseries_collection::{Dataset, DateTimeIndex, Frequency, Series, TimeSeriesCollection};
//! use timeseries_collection::utils::parse_timestamp;
//!
//! let start = parse_timestamp("2015-04-09").unwrap();
//! let index = DateTimeIndex::uniform(start, 3, Frequency::days(1).unwrap()).unwrap();
//! let series = Dataset::parallelize(vec![Series::new("a", vec![1.0, f64::NAN, 3.0])], 1);
//! let collection = TimeSeriesCollection::new(index, series).unwrap();
//!
//! let cleaned = collection.remove_instants_with_nans();
//! assert_eq!(cleaned.find_series("a"), Some(vec![1.0, 3.0]));
//! ```

pub mod collection;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fill;
pub mod frequency;
pub mod index;
pub mod matrix;
pub mod observations;
pub mod persist;
pub mod table;
pub mod utils;

/// Instants are UTC date-times.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

pub use collection::{Instant, Series, TimeSeriesCollection};
pub use config::ExecutionConfig;
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use fill::FillMethod;
pub use frequency::{Frequency, FrequencyUnit};
pub use index::{DateTimeIndex, IrregularIndex, TimeIndex, UniformIndex};
pub use matrix::{IndexedRow, IndexedRowMatrix, RowMatrix};
pub use observations::Observation;
pub use table::{Cell, ColumnType, Row, Table};
