use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use env_logger::Builder;
use glob::glob;
use log::LevelFilter;

use lastile_core::error::{Result, TilingError};
use lastile_extractor::{BatchMode, TileExtractor};
use lastile_indexer::IndexBuilder;

#[derive(Parser, Debug)]
#[command(
    name = "lastile",
    about = "A tool for tiling LAS/LAZ point clouds and cutting areas out of them",
    version = "0.1.0"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite point files into tile-ordered blocks with a JSON sidecar index
    Index {
        #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
        input: Vec<String>,

        #[arg(short, long, required = true, value_name = "DIR")]
        output: String,

        #[arg(long, default_value_t = 200.0)]
        tile_size: f64,

        #[arg(long, default_value_t = 20000)]
        block_size: usize,

        /// Snap the grid origin to tile_size times this factor
        #[arg(long, default_value_t = 1)]
        factor: u32,

        #[arg(long, default_value_t = 0.0)]
        x_adjust: f64,

        #[arg(long, default_value_t = 0.0)]
        y_adjust: f64,

        #[arg(long, default_value_t = 0.0)]
        z_adjust: f64,

        #[arg(long)]
        min_z: Option<f64>,

        #[arg(long)]
        max_z: Option<f64>,
    },
    /// Cut a tile grid over the union extent of the indexed inputs
    Grid {
        #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
        input: Vec<String>,

        #[arg(short, long, required = true, value_name = "DIR")]
        output: String,

        #[arg(long, default_value_t = 1000.0)]
        tile_size: f64,

        /// Buffer distance added around every tile
        #[arg(long, default_value_t = 0.0)]
        margin: f64,

        #[arg(long, default_value_t = 1)]
        factor: u32,

        /// Areas per batch instead of one grid row per batch
        #[arg(long)]
        batch: Option<usize>,

        /// Copy whole blocks without the exact shape filter
        #[arg(long, default_value_t = false)]
        fast: bool,
    },
    /// Cut one polygon area out of the indexed inputs
    Polygon {
        #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
        input: Vec<String>,

        #[arg(short, long, required = true, value_name = "DIR")]
        output: String,

        /// Outline as "east,north" pairs in ring order
        #[arg(long, required = true, num_args = 3.., value_name = "E,N")]
        vertex: Vec<String>,

        #[arg(long, default_value = "area")]
        name: String,

        /// Buffer distance around the outline
        #[arg(long, default_value_t = 0.0)]
        margin: f64,

        /// Copy whole blocks without the exact shape filter
        #[arg(long, default_value_t = false)]
        fast: bool,
    },
    /// Cut the border off one indexed file
    Trim {
        #[arg(short, long, required = true, value_name = "FILE")]
        input: String,

        #[arg(short, long, required = true, value_name = "DIR")]
        output: String,

        /// Distance to cut from every side of the extent
        #[arg(long, required = true)]
        inset: f64,

        #[arg(long, default_value = "trimmed")]
        name: String,
    },
}

fn expand_globs(input_patterns: Vec<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for pattern in input_patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            for entry in glob(&pattern).expect("Failed to read glob pattern") {
                match entry {
                    Ok(path) => paths.push(path),
                    Err(e) => eprintln!("Error: {:?}", e),
                }
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    paths
}

fn parse_vertices(raw: &[String]) -> Result<Vec<(f64, f64)>> {
    let mut vertices = Vec::with_capacity(raw.len());
    for pair in raw {
        let mut parts = pair.split(',');
        let east = parts.next().and_then(|v| v.trim().parse::<f64>().ok());
        let north = parts.next().and_then(|v| v.trim().parse::<f64>().ok());
        match (east, north, parts.next()) {
            (Some(east), Some(north), None) => vertices.push((east, north)),
            _ => {
                return Err(TilingError::FormatUnsupported(format!(
                    "vertex \"{}\" is not an \"east,north\" pair",
                    pair
                )))
            }
        }
    }
    Ok(vertices)
}

#[allow(clippy::too_many_arguments)]
fn run_index(
    input: Vec<String>,
    output: String,
    tile_size: f64,
    block_size: usize,
    factor: u32,
    x_adjust: f64,
    y_adjust: f64,
    z_adjust: f64,
    min_z: Option<f64>,
    max_z: Option<f64>,
) -> Result<()> {
    let files = expand_globs(input);
    log::info!("Expanded input files: {:?}", files);
    let out_dir = PathBuf::from(output);
    std::fs::create_dir_all(&out_dir)?;

    let mut builder = IndexBuilder {
        tile_size,
        block_size,
        factor,
        x_adjust,
        y_adjust,
        z_adjust,
        min_clamp_z: min_z.unwrap_or(f64::MIN),
        max_clamp_z: max_z.unwrap_or(f64::MAX),
        ..IndexBuilder::new()
    };

    for file in &files {
        let file_name = match file.file_name() {
            Some(name) => name,
            None => {
                log::error!("skipping {}: not a file path", file.display());
                continue;
            }
        };
        let target = out_dir.join(file_name);
        if target == *file {
            log::error!(
                "skipping {}: output would overwrite the input",
                file.display()
            );
            continue;
        }
        builder.build(file, &target)?;
    }
    Ok(())
}

fn run_grid(
    input: Vec<String>,
    output: String,
    tile_size: f64,
    margin: f64,
    factor: u32,
    batch: Option<usize>,
    fast: bool,
) -> Result<()> {
    let files = expand_globs(input);
    log::info!("Expanded input files: {:?}", files);

    let mut extractor = TileExtractor {
        tile_size,
        margin,
        factor,
        exact_filter: !fast,
        ..TileExtractor::new(Path::new(&output))
    };
    if let Some(count) = batch {
        extractor.batch_mode = BatchMode::Fixed(count);
    }
    extractor.export_grid(&files)?;
    Ok(())
}

fn run_polygon(
    input: Vec<String>,
    output: String,
    vertex: Vec<String>,
    name: String,
    margin: f64,
    fast: bool,
) -> Result<()> {
    let files = expand_globs(input);
    log::info!("Expanded input files: {:?}", files);
    let vertices = parse_vertices(&vertex)?;

    let mut extractor = TileExtractor {
        margin,
        exact_filter: !fast,
        ..TileExtractor::new(Path::new(&output))
    };
    extractor.export_polygon(&files, &name, vertices)?;
    Ok(())
}

fn run_trim(input: String, output: String, inset: f64, name: String) -> Result<()> {
    let mut extractor = TileExtractor::new(Path::new(&output));
    extractor.trim(Path::new(&input), inset, &name)?;
    Ok(())
}

fn main() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .init();

    let args = Cli::parse();
    let start = std::time::Instant::now();

    let result = match args.command {
        Command::Index {
            input,
            output,
            tile_size,
            block_size,
            factor,
            x_adjust,
            y_adjust,
            z_adjust,
            min_z,
            max_z,
        } => run_index(
            input, output, tile_size, block_size, factor, x_adjust, y_adjust, z_adjust, min_z,
            max_z,
        ),
        Command::Grid {
            input,
            output,
            tile_size,
            margin,
            factor,
            batch,
            fast,
        } => run_grid(input, output, tile_size, margin, factor, batch, fast),
        Command::Polygon {
            input,
            output,
            vertex,
            name,
            margin,
            fast,
        } => run_polygon(input, output, vertex, name, margin, fast),
        Command::Trim {
            input,
            output,
            inset,
            name,
        } => run_trim(input, output, inset, name),
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }

    log::info!("Elapsed: {:?}", start.elapsed());
    log::info!("Finish processing");
}
