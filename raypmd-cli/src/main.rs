//! Command-line tooling for raypmd ray-trace series.
#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]

use clap::{Parser, Subcommand, ValueEnum};

use raypmd_core::{ParticleKind, Ray};
use raypmd_io::{series_info, Format, RayReader, RayWriter, StoreOptions, DEFAULT_CHUNK_SIZE};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Series error: {0}")]
    Series(#[from] raypmd_io::Error),
}

/// Container format selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// JSON container (always available)
    Json,
    /// HDF5 container (needs the `hdf5` build feature)
    Hdf5,
}

impl From<FormatArg> for Format {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => Format::Json,
            FormatArg::Hdf5 => Format::Hdf5,
        }
    }
}

/// Particle species selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SpeciesArg {
    /// Photon rays (X-ray beamlines)
    Photon,
    /// Neutron rays
    Neutron,
}

impl From<SpeciesArg> for ParticleKind {
    fn from(value: SpeciesArg) -> Self {
        match value {
            SpeciesArg::Photon => ParticleKind::Photon,
            SpeciesArg::Neutron => ParticleKind::Neutron,
        }
    }
}

/// Chunked openPMD-style ray-trace series tool.
#[derive(Parser)]
#[command(name = "raypmd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic ray series (smoke-testing and demos)
    Generate {
        /// Output file path
        output: PathBuf,

        /// Number of rays to write
        #[arg(short, long, default_value_t = 1000)]
        count: u64,

        /// Declared row bound of the series (defaults to the ray count)
        #[arg(long)]
        max_rays: Option<u64>,

        /// Particle species
        #[arg(short, long, value_enum, default_value_t = SpeciesArg::Neutron)]
        species: SpeciesArg,

        /// Container format (inferred from the extension when omitted)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Rows buffered before a commit
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Iteration index to write under
        #[arg(long, default_value_t = 1)]
        iteration: u64,

        /// Author recorded in the file
        #[arg(long, default_value = "raypmd-cli")]
        author: String,

        /// Instrument name recorded in the file
        #[arg(long, default_value = "")]
        instrument: String,

        /// Component name recorded in the file
        #[arg(long, default_value = "")]
        component: String,
    },

    /// Print the summary of a series
    Info {
        /// Input file path
        input: PathBuf,

        /// Container format (inferred from the extension when omitted)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Print rays from a series, one per line
    Dump {
        /// Input file path
        input: PathBuf,

        /// Container format (inferred from the extension when omitted)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Rays to read (0 reads everything committed)
        #[arg(short, long, default_value_t = 0)]
        count: u64,

        /// Hand out every ray this many times
        #[arg(short, long, default_value_t = 1)]
        repeat: usize,

        /// Stop printing after this many lines (0 prints everything)
        #[arg(short, long, default_value_t = 20)]
        limit: u64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            output,
            count,
            max_rays,
            species,
            format,
            chunk_size,
            iteration,
            author,
            instrument,
            component,
        } => generate(
            &output,
            count,
            max_rays.unwrap_or(count),
            species.into(),
            format.map(Into::into),
            chunk_size,
            iteration,
            author,
            instrument,
            component,
        ),
        Commands::Info { input, format } => info(&input, format.map(Into::into)),
        Commands::Dump {
            input,
            format,
            count,
            repeat,
            limit,
        } => dump(&input, format.map(Into::into), count, repeat, limit),
    }
}

#[allow(clippy::too_many_arguments)]
fn generate(
    output: &PathBuf,
    count: u64,
    max_rays: u64,
    kind: ParticleKind,
    format: Option<Format>,
    chunk_size: usize,
    iteration: u64,
    author: String,
    instrument: String,
    component: String,
) -> Result<()> {
    let options = StoreOptions {
        chunk_size,
        iteration,
        author,
        instrument_name: instrument,
        component_name: component,
        ..StoreOptions::default()
    };
    let mut writer = RayWriter::create(output, format, kind, max_rays, &options)?;
    log::debug!(
        "writing {count} rays (bound {max_rays}, chunk {chunk_size}) to {}",
        writer.path().display()
    );

    for i in 0..count {
        writer.append(&synthetic_ray(i, count))?;
    }
    let committed = writer.finish()?;
    println!("wrote {committed} rays to {}", output.display());
    Ok(())
}

/// A deterministic fan of rays: sources spread along x, all headed down z.
fn synthetic_ray(i: u64, count: u64) -> Ray {
    let fraction = if count > 1 {
        i as f64 / (count - 1) as f64
    } else {
        0.0
    };
    let mut ray = Ray::new();
    ray.set_position(fraction - 0.5, 0.0, 0.0, 10.0);
    ray.set_direction(fraction - 0.5, 0.0, 5.0, 1.0);
    #[allow(clippy::cast_possible_truncation)]
    {
        ray.wavelength = (1.0 + 4.0 * fraction) as f32;
        ray.time = (0.1 * fraction) as f32;
    }
    ray.id = i;
    ray
}

fn info(input: &PathBuf, format: Option<Format>) -> Result<()> {
    let info = series_info(input, format)?;

    println!("file:     {}", input.display());
    println!("format:   {}", info.format);
    if let Some(author) = &info.author {
        println!("author:   {author}");
    }
    match (&info.software, &info.software_version) {
        (Some(software), Some(version)) => println!("software: {software} {version}"),
        (Some(software), None) => println!("software: {software}"),
        _ => {}
    }
    println!(
        "iterations: {}",
        info.iterations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    for species in &info.species {
        let rows = species
            .num_particles
            .map_or_else(|| "?".to_string(), |n| n.to_string());
        println!(
            "  iteration {}: species {} ({} rays)",
            species.iteration, species.name, rows
        );
        for range in &species.field_ranges {
            let (Some(min), Some(max)) = (range.min, range.max) else {
                continue;
            };
            let name = match range.component {
                Some(axis) => format!("{}/{axis}", range.record),
                None => range.record.to_string(),
            };
            println!("    {name:<34} [{min:.6}, {max:.6}]");
        }
    }
    Ok(())
}

fn dump(
    input: &PathBuf,
    format: Option<Format>,
    count: u64,
    repeat: usize,
    limit: u64,
) -> Result<()> {
    let mut reader = RayReader::open(input, format, count, repeat)?;
    println!(
        "{} rays of species {} (repeat {})",
        reader.total(),
        reader.species(),
        reader.repeat()
    );

    let mut printed = 0;
    while let Some(ray) = reader.read_next()? {
        println!(
            "id {:>8}  pos [{:+.4} {:+.4} {:+.4}]  dir [{:+.4} {:+.4} {:+.4}]  \
             wavelength {:.4}  time {:.4}  weight {:.4}",
            ray.id,
            ray.position[0],
            ray.position[1],
            ray.position[2],
            ray.direction[0],
            ray.direction[1],
            ray.direction[2],
            ray.wavelength,
            ray.time,
            ray.weight,
        );
        printed += 1;
        if limit > 0 && printed >= limit {
            println!("... stopped after {limit} rays");
            break;
        }
    }
    Ok(())
}
