use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ppconv::{ConverterOptionsBuilder, ExtraInfo, InputData, OutputData, PandaPowerConverter, StdTypes, TableSet};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Conversion between pandapower tables and power-grid-model data.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert network tables to calculation input data
    Input(InputArgs),

    /// Convert calculation results to result tables
    Output(OutputArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Network tables (JSON)
    #[arg(required = true)]
    tables: PathBuf,

    /// Equipment type library (JSON)
    #[arg(long)]
    std_types: Option<PathBuf>,

    /// System frequency (Hz).
    #[arg(long)]
    frequency: Option<f64>,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Write the source reference of every id to this file.
    #[arg(long)]
    extra_info: Option<PathBuf>,
}

#[derive(Args)]
struct OutputArgs {
    /// Calculation input data (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Calculation results (JSON)
    #[arg(required = true)]
    result: PathBuf,

    /// Source references written by the input conversion.
    #[arg(long, required = true)]
    extra_info: PathBuf,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_level(false)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match execute(&cli) {
        Ok(_) => {
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(2);
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("writing {}", path.display()))
}

fn execute(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Input(args) => {
            let mut options = ConverterOptionsBuilder::default();
            if let Some(path) = &args.std_types {
                options.std_types(read_json::<StdTypes>(path)?);
            }
            if let Some(frequency) = args.frequency {
                options.system_frequency(frequency);
            }

            let tables: TableSet = read_json(&args.tables)?;
            let mut converter = PandaPowerConverter::new(options.build()?);
            let (data, extra_info) = converter.convert_input_with_extra_info(&tables)?;

            write_json(&args.output, &data)?;
            if let Some(path) = &args.extra_info {
                write_json(path, &extra_info)?;
            }
        }
        Commands::Output(args) => {
            let input: InputData = read_json(&args.input)?;
            let result: OutputData = read_json(&args.result)?;
            let extra_info: ExtraInfo = read_json(&args.extra_info)?;

            let mut converter = PandaPowerConverter::default();
            let tables = converter.convert_output(&input, &result, Some(&extra_info))?;
            write_json(&args.output, &tables)?;
        }
    }
    Ok(())
}
