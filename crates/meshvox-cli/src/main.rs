//! meshvox command line: voxelize OBJ models into colored voxel files.

mod stl;

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};

use meshvox_io::{writer_for_path, ObjStream};
use meshvox_kernel::{voxelize_stream, ColorStrategy, VoxelSettings, VoxelStats};

use stl::StlDump;

/// Voxelizes triangle meshes into colored voxel models.
#[derive(Parser, Debug)]
#[command(name = "meshvox")]
#[command(about = "Converts OBJ models into colored voxel files (.vl32, .qef)")]
struct Args {
    /// Input OBJ file.
    input: PathBuf,

    /// Output voxel file; the extension selects the format.
    output: PathBuf,

    /// Edge length of the cubic voxel grid.
    #[arg(short, long)]
    resolution: u32,

    /// Color strategy: "max" keeps the dominant triangle per voxel,
    /// "blend" averages by area.
    #[arg(short, long, default_value = "max")]
    strategy: String,

    /// Axis permutation, e.g. "xzy" to swap the Y and Z axes.
    #[arg(short, long, default_value = "xyz")]
    permutation: String,

    /// Halve the output resolution with a box filter.
    #[arg(long)]
    downscale: bool,

    /// Worker thread count (default: all hardware threads).
    #[arg(long)]
    threads: Option<usize>,

    /// Write every voxelized triangle to a binary STL for debugging.
    #[arg(long, value_name = "PATH")]
    dump_stl: Option<PathBuf>,
}

/// Parse an axis permutation like "xyz" or "zxy".
fn parse_permutation(s: &str) -> Result<[usize; 3]> {
    let mut permutation = [0usize; 3];
    let mut seen = [false; 3];
    if s.len() != 3 {
        bail!("permutation must name all three axes, e.g. \"xzy\"");
    }
    for (slot, c) in s.chars().enumerate() {
        let axis = match c.to_ascii_lowercase() {
            'x' => 0,
            'y' => 1,
            'z' => 2,
            _ => bail!("\"{c}\" is not an axis, expected x, y or z"),
        };
        if seen[axis] {
            bail!("axis \"{c}\" appears twice in permutation \"{s}\"");
        }
        seen[axis] = true;
        permutation[slot] = axis;
    }
    Ok(permutation)
}

fn run(args: &Args) -> Result<VoxelStats> {
    let strategy: ColorStrategy = args.strategy.parse()?;
    let settings = VoxelSettings {
        resolution: args.resolution,
        strategy,
        permutation: parse_permutation(&args.permutation)?,
        downscale: args.downscale,
        threads: args.threads,
    };
    settings.validate()?;

    info!(
        "converting \"{}\" to \"{}\" at resolution {} with strategy {}",
        args.input.display(),
        args.output.display(),
        settings.resolution,
        settings.strategy
    );

    let mut stream = ObjStream::load(&args.input)
        .with_context(|| format!("failed to load \"{}\"", args.input.display()))?;
    let mut sink = writer_for_path(&args.output, settings.output_resolution())
        .with_context(|| format!("failed to open \"{}\"", args.output.display()))?;

    let dump = args.dump_stl.as_ref().map(|_| StlDump::new());
    let observer = dump.as_ref().map(|d| d.observer());

    let stats = voxelize_stream(&mut stream, &mut *sink, &settings, observer)?;

    if let (Some(dump), Some(path)) = (&dump, &args.dump_stl) {
        dump.write(path)
            .with_context(|| format!("failed to write \"{}\"", path.display()))?;
        info!("dumped {} triangles to \"{}\"", dump.len(), path.display());
    }

    Ok(stats)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(stats) => {
            info!(
                "done: {} voxels at resolution {} from {} triangles",
                stats.voxels, stats.resolution, stats.triangles
            );
        }
        Err(err) => {
            error!("{err:#}");
            process::exit(1);
        }
    }
}
