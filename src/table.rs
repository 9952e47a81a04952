//! Ordered-row tables with named columns.
//!
//! The minimal tabular form the collection produces and consumes: observation
//! tables (`timestamp, key, value`) and instant tables (`instant, key...`).

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::utils::{format_timestamp, format_value, parse_timestamp, parse_value};
use crate::Timestamp;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Timestamp(Timestamp),
    Text(String),
    Float(f64),
}

impl Cell {
    fn to_field(&self) -> String {
        match self {
            Cell::Timestamp(t) => format_timestamp(t),
            Cell::Text(s) => s.clone(),
            Cell::Float(v) => format_value(*v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Timestamp,
    Text,
    Float,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Timestamp => "timestamp",
            ColumnType::Text => "text",
            ColumnType::Float => "float",
        }
    }

    fn parse(self, field: &str) -> Result<Cell> {
        Ok(match self {
            ColumnType::Timestamp => Cell::Timestamp(parse_timestamp(field)?),
            ColumnType::Text => Cell::Text(field.to_string()),
            ColumnType::Float => Cell::Float(parse_value(field)?),
        })
    }
}

pub type Row = Vec<Cell>;

#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Dataset<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Dataset<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &Dataset<Row> {
        &self.rows
    }

    pub fn into_rows(self) -> Dataset<Row> {
        self.rows
    }

    /// Position of the column called `name`.
    ///
    /// # Errors
    /// * [`Error::MissingColumn`] when no column has that name.
    pub fn column_position(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Writes a header row followed by every row in global order.
    pub fn write_csv<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path.as_ref())?;
        writer.write_record(&self.columns)?;
        for row in self.rows.iter() {
            writer.write_record(row.iter().map(Cell::to_field))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a CSV file with a header row into a single-partition table,
    /// parsing each column with the matching entry of `types`.
    ///
    /// # Errors
    /// * [`Error::Parse`] when the header width differs from `types`.
    /// * [`Error::ColumnType`] when a field does not parse.
    pub fn read_csv<P: AsRef<std::path::Path>>(path: P, types: &[ColumnType]) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = Self::open_csv(path)?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if columns.len() != types.len() {
            return Err(Error::Parse(format!(
                "{} has {} columns, expected {}",
                path.display(),
                columns.len(),
                types.len()
            )));
        }
        Self::read_records(reader, columns, types.to_vec())
    }

    /// Like [`read_csv`](Self::read_csv), but picks each column's type from
    /// its header name, so the column order of the file does not matter.
    ///
    /// # Arguments
    /// * `path` - CSV file with a header row.
    /// * `column_type` - Type to parse the column with the given name as.
    ///
    /// # Errors
    /// * [`Error::ColumnType`] when a field does not parse.
    pub fn read_csv_by_name<P, F>(path: P, column_type: F) -> Result<Self>
    where
        P: AsRef<std::path::Path>,
        F: Fn(&str) -> ColumnType,
    {
        let mut reader = Self::open_csv(path.as_ref())?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let types = columns.iter().map(|c| column_type(c)).collect();
        Self::read_records(reader, columns, types)
    }

    fn open_csv(path: &std::path::Path) -> Result<csv::Reader<std::fs::File>> {
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?)
    }

    fn read_records(
        mut reader: csv::Reader<std::fs::File>,
        columns: Vec<String>,
        types: Vec<ColumnType>,
    ) -> Result<Self> {
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = record
                .iter()
                .zip(&types)
                .zip(&columns)
                .map(|((field, ty), column)| {
                    ty.parse(field).map_err(|_| Error::ColumnType {
                        column: column.clone(),
                        expected: ty.name(),
                    })
                })
                .collect::<Result<Row>>()?;
            rows.push(row);
        }
        Ok(Self::new(columns, Dataset::from_partitions(vec![rows])))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        let t = parse_timestamp("2015-04-09").unwrap();
        let table = Table::new(
            vec!["timestamp".into(), "key".into(), "value".into()],
            Dataset::parallelize(
                vec![
                    vec![Cell::Timestamp(t), Cell::Text("a".into()), Cell::Float(1.5)],
                    vec![Cell::Timestamp(t), Cell::Text("b,c".into()), Cell::Float(f64::NAN)],
                ],
                2,
            ),
        );
        table.write_csv(&path).unwrap();

        let types = [ColumnType::Timestamp, ColumnType::Text, ColumnType::Float];
        let back = Table::read_csv(&path, &types).unwrap();
        assert_eq!(back.columns(), table.columns());
        let rows = back.into_rows().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![Cell::Timestamp(t), Cell::Text("a".into()), Cell::Float(1.5)]);
        assert_eq!(rows[1][1], Cell::Text("b,c".into()));
        assert!(matches!(rows[1][2], Cell::Float(v) if v.is_nan()));
    }

    #[test]
    fn bad_fields_name_their_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        std::fs::write(&path, "timestamp,key,value\n2015-04-09,a,oops\n").unwrap();
        let types = [ColumnType::Timestamp, ColumnType::Text, ColumnType::Float];
        match Table::read_csv(&path, &types) {
            Err(Error::ColumnType { column, expected }) => {
                assert_eq!(column, "value");
                assert_eq!(expected, "float");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Table::read_csv(&path, &types[..2]).is_err());
    }

    #[test]
    fn types_follow_header_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        std::fs::write(&path, "value,key,timestamp\n2.5,x,2015-04-09\n").unwrap();
        let table = Table::read_csv_by_name(&path, |name| match name {
            "timestamp" => ColumnType::Timestamp,
            "value" => ColumnType::Float,
            _ => ColumnType::Text,
        })
        .unwrap();
        assert_eq!(table.columns(), ["value", "key", "timestamp"]);
        assert_eq!(
            table.into_rows().collect(),
            vec![vec![
                Cell::Float(2.5),
                Cell::Text("x".into()),
                Cell::Timestamp(parse_timestamp("2015-04-09").unwrap()),
            ]]
        );

        let all_floats = Table::read_csv_by_name(&path, |_| ColumnType::Float);
        assert!(matches!(all_floats, Err(Error::ColumnType { column, .. }) if column == "key"));
    }

    #[test]
    fn missing_column() {
        let table = Table::new(vec!["a".into()], Dataset::default());
        assert_eq!(table.column_position("a").unwrap(), 0);
        assert!(matches!(table.column_position("b"), Err(Error::MissingColumn(_))));
    }
}
