//! mesh2nc command line tool.
//!
//! Converts simulation mesh output stored in NetCDF into a structured file of
//! interpolated point time series, and prints written files as JSON.

mod point_args;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use mesh_common::{DataType, Dimensionality, QueryPoints};
use mesh_processor::InterpolationMethod;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use conversion::{ConversionOptions, FieldMapping};

#[derive(Parser, Debug)]
#[command(name = "mesh2nc")]
#[command(about = "Interpolate simulation mesh output at points and store it as NetCDF")]
struct Args {
    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "MESH2NC_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interpolate fields of a NetCDF mesh file and write a structured file
    Convert {
        /// Source mesh file
        source: PathBuf,

        /// Target structured file
        target: PathBuf,

        /// Field to extract (repeatable)
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,

        /// Query point as `name=x,y,z` or `x,y,z` (repeatable)
        #[arg(short, long = "point")]
        points: Vec<String>,

        /// Mesh dimensionality: 1, 2, 3 or with axes such as `1:y`, `2:xz`
        #[arg(short, long, default_value = "3", value_parser = Dimensionality::parse)]
        dimensionality: Dimensionality,

        /// Interpolation method (linear or nearest)
        #[arg(short, long, env = "MESH_INTERPOLATION")]
        method: Option<String>,

        /// Read fields from cell centres instead of mesh points
        #[arg(long)]
        cell_data: bool,

        /// Neighbourhood size for scattered interpolation
        #[arg(long, env = "MESH_NEIGHBOR_COUNT")]
        neighbors: Option<usize>,

        /// Interpolate time steps in parallel
        #[arg(long, env = "MESH_PARALLEL")]
        parallel: bool,

        /// Supplemental parameter as `name=value` (repeatable)
        #[arg(long = "param")]
        params: Vec<String>,

        /// Field mapping as `source=target` or `source=a,b,c` (repeatable)
        #[arg(long = "map")]
        mappings: Vec<String>,

        /// YAML options file
        #[arg(short, long, env = "MESH2NC_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Print the contents of a structured file as JSON
    Read {
        /// Structured file
        file: PathBuf,
    },

    /// Print the supplemental parameters of a structured file as JSON
    Params {
        /// Structured file
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct ReadOutput {
    times: Vec<f64>,
    points: QueryPoints,
    series: IndexMap<String, IndexMap<String, Vec<f64>>>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    match args.command {
        Command::Convert {
            source,
            target,
            fields,
            points,
            dimensionality,
            method,
            cell_data,
            neighbors,
            parallel,
            params,
            mappings,
            config,
        } => {
            let mut options = match config {
                Some(path) => ConversionOptions::from_file(&path)
                    .with_context(|| format!("Failed to load options from {:?}", path))?,
                None => ConversionOptions::from_env(),
            };

            if let Some(method) = method {
                options.processor.interpolation = InterpolationMethod::from_str(&method);
            }
            if cell_data {
                options.processor.data_type = DataType::Cell;
            }
            if neighbors.is_some() {
                options.processor.neighbor_count = neighbors;
            }
            options.processor.parallel |= parallel;
            for param in &params {
                let (name, value) = parse_param(param)?;
                options.params.insert(name, value);
            }
            for mapping in &mappings {
                let (name, target) = parse_mapping(mapping)?;
                options.field_mapping.insert(name, target);
            }

            let query_points = point_args::parse_query_points(&points)?;

            info!(
                source = %source.display(),
                target = %target.display(),
                fields = ?fields,
                points = query_points.len(),
                "Starting conversion"
            );

            let summary = conversion::convert_file(
                &source,
                &target,
                fields.as_slice(),
                &query_points,
                dimensionality,
                &options,
            )
            .with_context(|| format!("Failed to convert {:?}", source))?;

            println!("{}", serde_json::to_string_pretty(&summary.fields)?);
        }

        Command::Read { file } => {
            let (series, times, points) = conversion::read(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let output = ReadOutput {
                times,
                points,
                series,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Params { file } => {
            let params = conversion::read_params(&file)
                .with_context(|| format!("Failed to read parameters from {:?}", file))?;
            println!("{}", serde_json::to_string_pretty(&params)?);
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn parse_param(s: &str) -> Result<(String, f64)> {
    let (name, value) = s
        .split_once('=')
        .with_context(|| format!("Parameter '{}' must look like name=value", s))?;
    let value: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("Parameter '{}' has a non-numeric value", s))?;
    Ok((name.trim().to_string(), value))
}

fn parse_mapping(s: &str) -> Result<(String, FieldMapping)> {
    let (name, targets) = s
        .split_once('=')
        .with_context(|| format!("Mapping '{}' must look like source=target", s))?;
    let targets: Vec<String> = targets.split(',').map(|t| t.trim().to_string()).collect();
    let mapping = if targets.len() == 1 {
        FieldMapping::Rename(targets[0].clone())
    } else {
        FieldMapping::Split(targets)
    };
    Ok((name.trim().to_string(), mapping))
}
