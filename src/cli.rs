use timeseries_collection::{FillMethod, Frequency};

/// Options for `tscollect import`.
#[derive(Debug)]
pub struct ImportArgs {
    pub input: std::path::PathBuf,
    pub output: std::path::PathBuf,
    pub frequency: Option<Frequency>,
    pub timestamp_column: String,
    pub key_column: String,
    pub value_column: String,
}

/// Options for `tscollect inspect`.
#[derive(Debug)]
pub struct InspectArgs {
    pub input: std::path::PathBuf,
    pub from: Option<String>,
    pub to: Option<String>,
    pub drop_nans: bool,
    pub fill: Option<FillMethod>,
    pub rows: usize,
    pub export: Option<std::path::PathBuf>,
}

#[derive(Debug)]
pub enum Command {
    Import(ImportArgs),
    Inspect(InspectArgs),
}

/// Structure representing command-line arguments.
#[derive(Debug)]
pub struct Args {
    pub threads: Option<usize>,
    pub partitions: Option<usize>,
    pub command: Command,
}

impl Args {
    /// Parses command-line arguments using `clap`.
    ///
    /// Exits with a usage message when arguments are missing or invalid.
    pub fn parse() -> Self {
        let matches = clap::Command::new("tscollect")
            .version("0.1.0")
            .about("Build, save and inspect partitioned time-series collections")
            .subcommand_required(true)
            .arg(
                clap::Arg::new("threads")
                    .short('t')
                    .long("threads")
                    .help("Number of threads to use (default: all available)")
                    .global(true)
                    .num_args(1)
                    .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
            )
            .arg(
                clap::Arg::new("partitions")
                    .short('p')
                    .long("partitions")
                    .help("Number of partitions for rebuilt series (default: one per input file)")
                    .global(true)
                    .num_args(1)
                    .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
            )
            .subcommand(
                clap::Command::new("import")
                    .about("Read observation CSV files and save them as a collection")
                    .arg(
                        clap::Arg::new("input")
                            .short('i')
                            .long("input")
                            .help("Directory with observation CSV/TXT files (one partition per file)")
                            .required(true)
                            .num_args(1),
                    )
                    .arg(
                        clap::Arg::new("output")
                            .short('o')
                            .long("output")
                            .help("Directory to save the collection into (must be empty or absent)")
                            .required(true)
                            .num_args(1),
                    )
                    .arg(
                        clap::Arg::new("frequency")
                            .short('f')
                            .long("frequency")
                            .help("Build a uniform index with this step, e.g. 1D, 3B, 15m (default: irregular)")
                            .num_args(1)
                            .value_parser(clap::builder::ValueParser::new(parse_frequency)),
                    )
                    .arg(
                        clap::Arg::new("timestamp-column")
                            .long("timestamp-column")
                            .default_value("timestamp")
                            .num_args(1),
                    )
                    .arg(
                        clap::Arg::new("key-column")
                            .long("key-column")
                            .default_value("key")
                            .num_args(1),
                    )
                    .arg(
                        clap::Arg::new("value-column")
                            .long("value-column")
                            .default_value("value")
                            .num_args(1),
                    ),
            )
            .subcommand(
                clap::Command::new("inspect")
                    .about("Load a saved collection and print its first instants")
                    .arg(
                        clap::Arg::new("input")
                            .short('i')
                            .long("input")
                            .help("Directory written by `import`")
                            .required(true)
                            .num_args(1),
                    )
                    .arg(
                        clap::Arg::new("from")
                            .long("from")
                            .help("Keep instants at or after this timestamp")
                            .num_args(1),
                    )
                    .arg(
                        clap::Arg::new("to")
                            .long("to")
                            .help("Keep instants at or before this timestamp")
                            .num_args(1),
                    )
                    .arg(
                        clap::Arg::new("drop-nans")
                            .long("drop-nans")
                            .help("Remove every instant at which any series is NaN")
                            .action(clap::ArgAction::SetTrue)
                            .conflicts_with("fill"),
                    )
                    .arg(
                        clap::Arg::new("fill")
                            .long("fill")
                            .help("Fill NaNs in each series")
                            .value_parser(["zero", "previous", "next", "nearest", "linear"])
                            .num_args(1),
                    )
                    .arg(
                        clap::Arg::new("rows")
                            .short('n')
                            .long("rows")
                            .help("Number of instants to print")
                            .default_value("5")
                            .num_args(1)
                            .value_parser(clap::value_parser!(usize)),
                    )
                    .arg(
                        clap::Arg::new("export")
                            .short('e')
                            .long("export")
                            .help("Write every instant (timestamp, then one column per key) to this CSV file")
                            .num_args(1),
                    ),
            )
            .get_matches();

        let command = match matches.subcommand() {
            Some(("import", sub)) => Command::Import(ImportArgs {
                input: std::path::PathBuf::from(required(sub, "input")),
                output: std::path::PathBuf::from(required(sub, "output")),
                frequency: sub.get_one::<Frequency>("frequency").cloned(),
                timestamp_column: required(sub, "timestamp-column"),
                key_column: required(sub, "key-column"),
                value_column: required(sub, "value-column"),
            }),
            Some(("inspect", sub)) => Command::Inspect(InspectArgs {
                input: std::path::PathBuf::from(required(sub, "input")),
                from: sub.get_one::<String>("from").cloned(),
                to: sub.get_one::<String>("to").cloned(),
                drop_nans: sub.get_flag("drop-nans"),
                fill: sub
                    .get_one::<String>("fill")
                    .and_then(|name| name.parse::<FillMethod>().ok()),
                rows: sub.get_one::<usize>("rows").copied().unwrap_or(5),
                export: sub.get_one::<String>("export").map(std::path::PathBuf::from),
            }),
            _ => unreachable!("subcommand_required"),
        };

        Args {
            threads: matches.get_one::<usize>("threads").copied(),
            partitions: matches.get_one::<usize>("partitions").copied(),
            command,
        }
    }
}

// Required and defaulted arguments are always present once clap accepted them.
fn required(matches: &clap::ArgMatches, id: &str) -> String {
    matches.get_one::<String>(id).cloned().unwrap_or_default()
}

/// Validates that the number of threads is a positive integer.
fn parse_usize_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}

fn parse_frequency(s: &str) -> Result<Frequency, String> {
    s.parse::<Frequency>().map_err(|e| e.to_string())
}
