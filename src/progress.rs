use anyhow::Context;
use rayon::prelude::*;
use timeseries_collection::observations::Observation;
use timeseries_collection::{ColumnType, Dataset, Table};

/// Lists the `.csv` / `.txt` files of `input_dir`, sorted by name.
pub fn observation_files<P: AsRef<std::path::Path>>(input_dir: P) -> anyhow::Result<Vec<std::path::PathBuf>> {
    let mut paths = std::fs::read_dir(input_dir.as_ref())
        .with_context(|| format!("cannot read {}", input_dir.as_ref().display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext == "csv" || ext == "txt")
        })
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

/// Reads every observation file in parallel, one partition per file, while
/// a progress bar tracks finished files.
///
/// Each file needs a header row naming the timestamp, key and value columns;
/// other columns are read as text and ignored.
///
/// # Arguments
/// * `files` - Observation files, one partition each.
/// * `timestamp_column`, `key_column`, `value_column` - Header names to read.
///
/// # Returns
/// * `anyhow::Result<Dataset<Observation>>` - Observations in file order.
pub fn read_observations(
    files: &[std::path::PathBuf],
    timestamp_column: &str,
    key_column: &str,
    value_column: &str,
) -> anyhow::Result<Dataset<Observation>> {
    let pb = indicatif::ProgressBar::new(files.len() as u64);
    pb.set_style(
        indicatif::ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files {msg}",
        )?
        .progress_chars("=>-"),
    );

    let column_type = |name: &str| {
        if name == timestamp_column {
            ColumnType::Timestamp
        } else if name == value_column {
            ColumnType::Float
        } else {
            ColumnType::Text
        }
    };

    let partitions = files
        .par_iter()
        .map(|path| {
            let observations = Table::read_csv_by_name(path, column_type)
                .and_then(|table| table.to_observations(timestamp_column, key_column, value_column))
                .with_context(|| format!("failed to read {}", path.display()))?;
            pb.inc(1);
            tracing::debug!(file = %path.display(), rows = observations.len(), "read observation file");
            Ok(observations.collect())
        })
        .collect::<anyhow::Result<Vec<Vec<Observation>>>>()?;

    pb.finish_with_message("done");
    Ok(Dataset::from_partitions(partitions))
}
