mod cli;
mod progress;

use anyhow::Context;
use timeseries_collection::index::TimeIndex;
use timeseries_collection::utils::{format_timestamp, format_value, parse_timestamp};
use timeseries_collection::{DateTimeIndex, ExecutionConfig, TimeSeriesCollection, Timestamp};

/// Main entry point of the application.
///
/// 1. Parses command-line arguments.
/// 2. Resolves the number of threads to use.
/// 3. Runs `import` or `inspect` on the configured pool.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let total_start = std::time::Instant::now();
    let args = cli::Args::parse();
    let config = ExecutionConfig::new(args.threads, args.partitions);

    let effective_threads = config.effective_threads()?;
    println!("🚀 Using {} thread(s)", effective_threads);

    match args.command {
        cli::Command::Import(import) => {
            println!("Start import...");
            config.install(|| run_import(&import, &config))??;
            println!(
                "✅ Import completed in {:?} seconds",
                total_start.elapsed().as_secs_f64()
            );
        }
        cli::Command::Inspect(inspect) => {
            config.install(|| run_inspect(&inspect))??;
            println!(
                "✅ Reading complete in {:?} seconds",
                total_start.elapsed().as_secs_f64()
            );
        }
    }
    Ok(())
}

fn run_import(args: &cli::ImportArgs, config: &ExecutionConfig) -> anyhow::Result<()> {
    let files = progress::observation_files(&args.input)?;
    if files.is_empty() {
        return Err(anyhow::anyhow!(
            "no .csv or .txt files in {}",
            args.input.display()
        ));
    }
    println!("📄 Reading {} file(s)", files.len());

    let observations = progress::read_observations(
        &files,
        &args.timestamp_column,
        &args.key_column,
        &args.value_column,
    )?;
    let observations = match config.partitions {
        Some(n) => timeseries_collection::Dataset::parallelize(observations.collect(), n),
        None => observations,
    };

    let (min, max) = observations
        .aggregate(
            || None,
            |range: Option<(Timestamp, Timestamp)>, obs| {
                Some(match range {
                    Some((lo, hi)) => (lo.min(obs.timestamp), hi.max(obs.timestamp)),
                    None => (obs.timestamp, obs.timestamp),
                })
            },
            |a, b| match (a, b) {
                (Some((lo1, hi1)), Some((lo2, hi2))) => Some((lo1.min(lo2), hi1.max(hi2))),
                (a, None) => a,
                (None, b) => b,
            },
        )
        .ok_or_else(|| anyhow::anyhow!("input files contain no observations"))?;

    let index = match &args.frequency {
        Some(frequency) => {
            let steps = frequency.difference(min, max).with_context(|| {
                format!(
                    "{} is not a whole number of {} steps after {}",
                    format_timestamp(&max),
                    frequency,
                    format_timestamp(&min)
                )
            })?;
            DateTimeIndex::uniform(min, steps + 1, frequency.clone())?
        }
        None => DateTimeIndex::irregular(observations.iter().map(|obs| obs.timestamp))?,
    };
    println!(
        "🗓  Index: {} position(s) from {} to {}",
        index.size(),
        format_timestamp(&min),
        format_timestamp(&max)
    );

    let collection = TimeSeriesCollection::from_observations(index, &observations)?;
    collection
        .save(&args.output)
        .with_context(|| format!("failed to save into {}", args.output.display()))?;
    println!(
        "💾 Saved {} series in {} partition(s) to {}",
        collection.count(),
        collection.partition_count(),
        args.output.display()
    );
    Ok(())
}

fn run_inspect(args: &cli::InspectArgs) -> anyhow::Result<()> {
    let mut collection = TimeSeriesCollection::load(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;

    if args.from.is_some() || args.to.is_some() {
        let bound = |text: &Option<String>, default: Option<Timestamp>| -> anyhow::Result<Option<Timestamp>> {
            match text {
                Some(t) => Ok(Some(parse_timestamp(t)?)),
                None => Ok(default),
            }
        };
        let from = bound(&args.from, collection.index().first())?;
        let to = bound(&args.to, collection.index().last())?;
        if let (Some(from), Some(to)) = (from, to) {
            collection = collection.slice(from, to);
        }
    }
    if args.drop_nans {
        collection = collection.remove_instants_with_nans();
    }
    if let Some(method) = args.fill {
        collection = collection.fill(method);
    }

    let index = collection.index();
    let kind = if index.is_uniform() { "uniform" } else { "irregular" };
    match (index.first(), index.last()) {
        (Some(first), Some(last)) => println!(
            "🗓  {} index, {} position(s) from {} to {}",
            kind,
            index.size(),
            format_timestamp(&first),
            format_timestamp(&last)
        ),
        _ => println!("🗓  {} index, empty", kind),
    }
    println!(
        "📦 {} series in {} partition(s)",
        collection.count(),
        collection.partition_count()
    );

    println!("📄 First {} instant(s)", args.rows);
    println!("instant,{}", collection.keys().join(","));
    for instant in collection.to_instants().iter().take(args.rows) {
        let values: Vec<String> = instant.values.iter().map(|v| format_value(*v)).collect();
        println!("{},{}", format_timestamp(&instant.timestamp), values.join(","));
    }

    if let Some(path) = &args.export {
        collection
            .to_instants_table()
            .write_csv(path)
            .with_context(|| format!("failed to export {}", path.display()))?;
        println!("💾 Exported {} instant(s) to {}", collection.index().size(), path.display());
    }
    Ok(())
}
