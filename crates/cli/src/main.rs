//! SurtGrid CLI - Grid scattered points into rasters

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geo_types::{Geometry, MultiPolygon, Rect};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wkt::TryFromWkt;

use surtgrid_algorithms::gridding::{
    Extent, ExtractOptions, GridJob, GridOptions, GridReport, LayerStatus, OutputSize,
};
use surtgrid_algorithms::interpolation::GridAlgorithm;
use surtgrid_core::io::{read_geotiff_band, write_geotiff};
use surtgrid_core::raster::{PixelType, RasterElement};
use surtgrid_core::vector::{read_geojson, VectorLayer};
use surtgrid_core::{Error, Progress, CRS};
use surtgrid_parallel::ProcessingMode;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "surtgrid")]
#[command(author, version, about = "Grid scattered points into rasters", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a gridded GeoTIFF band
    Info {
        /// Input raster file
        input: PathBuf,
        /// Band to describe (1-based)
        #[arg(short, long, default_value = "1")]
        band: usize,
    },
    /// Interpolate GeoJSON point layers onto a regular grid
    Grid(GridArgs),
}

#[derive(clap::Args)]
struct GridArgs {
    /// Input GeoJSON files, one output band each
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output GeoTIFF file
    #[arg(short, long)]
    output: PathBuf,

    /// Algorithm and parameters, e.g. invdist:power=2:radius1=100
    #[arg(short, long, default_value = "invdist")]
    algorithm: String,

    /// Output size in pixels
    #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"], conflicts_with = "tr")]
    outsize: Option<Vec<usize>>,

    /// Output resolution in georeferenced units
    #[arg(long, num_args = 2, value_names = ["XRES", "YRES"])]
    tr: Option<Vec<f64>>,

    /// Output X extent
    #[arg(long, num_args = 2, value_names = ["XMIN", "XMAX"], allow_negative_numbers = true)]
    txe: Option<Vec<f64>>,

    /// Output Y extent
    #[arg(long, num_args = 2, value_names = ["YMIN", "YMAX"], allow_negative_numbers = true)]
    tye: Option<Vec<f64>>,

    /// Only read features intersecting this rectangle
    #[arg(long, num_args = 4, value_names = ["XMIN", "YMIN", "XMAX", "YMAX"], allow_negative_numbers = true)]
    spat: Option<Vec<f64>>,

    /// Clip points: WKT geometry, "XMIN YMIN XMAX YMAX", or a GeoJSON file of polygons
    #[arg(long, num_args = 1..=4, allow_negative_numbers = true)]
    clipsrc: Option<Vec<String>>,

    /// Attribute holding the values instead of the geometry Z
    #[arg(short, long)]
    zfield: Option<String>,

    /// Added to every value
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    z_increase: f64,

    /// Multiplies every value after the increase
    #[arg(long, default_value = "1", allow_negative_numbers = true)]
    z_multiply: f64,

    /// Output pixel type: Byte, Int8, Int16, UInt16, Int32, UInt32, Float32, Float64
    #[arg(long = "ot", default_value = "Float64")]
    pixel_type: String,

    /// Nodata value of the output (defaults to the algorithm's nodata)
    #[arg(long, allow_negative_numbers = true)]
    a_nodata: Option<f64>,

    /// Spatial reference of the output, e.g. EPSG:32719
    #[arg(long)]
    a_srs: Option<String>,

    /// Worker threads per tile (0 = all cores)
    #[arg(short, long, default_value = "1")]
    threads: usize,

    /// Do not show a progress bar
    #[arg(short, long)]
    quiet: bool,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a tracing subscriber was already installed");
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(1000);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% ({eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn read_layers(paths: &[PathBuf]) -> Result<Vec<VectorLayer>> {
    let pb = spinner("Reading layers...");
    let layers = paths
        .iter()
        .map(|p| read_geojson(p).with_context(|| format!("Failed to read {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    pb.finish_and_clear();
    for layer in &layers {
        info!("Layer '{}': {} features", layer.name, layer.features.len());
    }
    Ok(layers)
}

fn pair(values: &Option<Vec<f64>>) -> Option<(f64, f64)> {
    match values.as_deref() {
        Some([a, b]) => Some((*a, *b)),
        _ => None,
    }
}

/// Clip geometry from the `--clipsrc` values
fn parse_clipsrc(values: &[String]) -> Result<Geometry<f64>> {
    match values {
        [a, b, c, d] => {
            let mut coords = [0.0; 4];
            for (slot, text) in coords.iter_mut().zip([a, b, c, d]) {
                *slot = text.parse().map_err(|_| {
                    Error::Usage(format!("invalid clipsrc bounding box value '{}'", text))
                })?;
            }
            let rect = Rect::new((coords[0], coords[1]), (coords[2], coords[3]));
            Ok(Geometry::Polygon(rect.to_polygon()))
        }
        [single] if Path::new(single).is_file() => {
            let layer = read_geojson(single)
                .with_context(|| format!("Failed to read clip source {}", single))?;
            let mut polygons = Vec::new();
            for geometry in layer.features.iter().filter_map(|f| f.geometry.as_ref()) {
                match geometry {
                    Geometry::Polygon(p) => polygons.push(p.clone()),
                    Geometry::MultiPolygon(mp) => polygons.extend(mp.0.iter().cloned()),
                    _ => {}
                }
            }
            if polygons.is_empty() {
                return Err(Error::Usage(format!("clip source {} holds no polygon", single)).into());
            }
            Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        [single] => Geometry::<f64>::try_from_wkt_str(single).map_err(|e| {
            Error::Usage(format!("clipsrc is neither a file nor valid WKT: {}", e)).into()
        }),
        _ => Err(Error::Usage("clipsrc takes a WKT geometry, a file or 4 coordinates".into()).into()),
    }
}

fn build_options(args: &GridArgs) -> Result<GridOptions> {
    let algorithm: GridAlgorithm = args.algorithm.parse()?;
    let pixel_type: PixelType = args
        .pixel_type
        .parse()
        .map_err(|_| Error::Usage(format!("unknown output type '{}'", args.pixel_type)))?;

    let size = match (&args.outsize, pair(&args.tr)) {
        (Some(_), Some(_)) => {
            return Err(Error::Usage("--outsize and --tr are mutually exclusive".into()).into())
        }
        (Some(v), None) => match v.as_slice() {
            [width, height] => OutputSize::Pixels {
                width: *width,
                height: *height,
            },
            _ => OutputSize::Default,
        },
        (None, Some((x_res, y_res))) => OutputSize::Resolution { x_res, y_res },
        (None, None) => OutputSize::Default,
    };

    let extent = match (pair(&args.txe), pair(&args.tye)) {
        (Some((x_min, x_max)), Some((y_min, y_max))) => {
            Some(Extent::new(x_min, y_min, x_max, y_max))
        }
        (None, None) => None,
        _ => return Err(Error::Usage("--txe and --tye must be given together".into()).into()),
    };
    if extent.is_none() && matches!(size, OutputSize::Resolution { .. }) {
        info!("Output extent derived from the data for --tr");
    }

    let spatial_filter = match args.spat.as_deref() {
        Some([x_min, y_min, x_max, y_max]) => Some(Rect::new((*x_min, *y_min), (*x_max, *y_max))),
        _ => None,
    };

    let clip = args.clipsrc.as_deref().map(parse_clipsrc).transpose()?;
    let crs = args.a_srs.as_deref().map(str::parse::<CRS>).transpose()?;

    Ok(GridOptions {
        size,
        extent,
        spatial_filter,
        algorithm,
        extract: ExtractOptions {
            burn_field: args.zfield.clone(),
            increase: args.z_increase,
            multiply: args.z_multiply,
            clip,
        },
        pixel_type,
        nodata: args.a_nodata,
        crs,
        mode: ProcessingMode::from_threads(args.threads),
        ..Default::default()
    })
}

/// Run `job` into an in-memory raster of `T` and save it as GeoTIFF
fn grid_to_file<T: RasterElement>(
    job: &GridJob,
    output: &Path,
    progress: &mut dyn Progress,
) -> Result<GridReport> {
    let mut sink = job.memory_sink::<T>()?;
    let report = job.run(&mut sink, progress)?;
    write_geotiff(sink.bands(), output).context("Failed to write output")?;
    Ok(report)
}

fn run_grid(args: GridArgs) -> Result<()> {
    let options = build_options(&args)?;
    let layers = read_layers(&args.inputs)?;
    let job = GridJob::new(layers, options)?;
    let geometry = *job.geometry();
    info!(
        "Output: {} x {} {} ({})",
        geometry.width,
        geometry.height,
        job.options().pixel_type,
        job.options().algorithm.name()
    );

    let pb = progress_bar(args.quiet);
    let mut on_progress = |fraction: f64, _: &str| {
        pb.set_position((fraction * 1000.0).round() as u64);
        true
    };

    let start = Instant::now();
    let report = match job.options().pixel_type {
        PixelType::Byte => grid_to_file::<u8>(&job, &args.output, &mut on_progress),
        PixelType::Int8 => grid_to_file::<i8>(&job, &args.output, &mut on_progress),
        PixelType::Int16 => grid_to_file::<i16>(&job, &args.output, &mut on_progress),
        PixelType::UInt16 => grid_to_file::<u16>(&job, &args.output, &mut on_progress),
        PixelType::Int32 => grid_to_file::<i32>(&job, &args.output, &mut on_progress),
        PixelType::UInt32 => grid_to_file::<u32>(&job, &args.output, &mut on_progress),
        PixelType::Float32 => grid_to_file::<f32>(&job, &args.output, &mut on_progress),
        PixelType::Float64 => grid_to_file::<f64>(&job, &args.output, &mut on_progress),
    };
    pb.finish_and_clear();
    let report = report?;
    let elapsed = start.elapsed();

    for layer in &report.layers {
        match &layer.status {
            LayerStatus::Gridded => {
                println!("  band {}: '{}' ({} points)", layer.band + 1, layer.layer, layer.points)
            }
            other => warn!("band {}: '{}' {}", layer.band + 1, layer.layer, other),
        }
    }
    done("Grid", &args.output, elapsed);
    Ok(())
}

fn run_info(input: &Path, band: usize) -> Result<()> {
    let index = band
        .checked_sub(1)
        .ok_or_else(|| Error::Usage("bands are numbered from 1".into()))?;
    let raster = read_geotiff_band::<f64, _>(input, index).context("Failed to read raster")?;
    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();
    let t = raster.transform();

    println!("File: {} (band {})", input.display(), band);
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Pixel size: {} x {}", t.pixel_width, t.pixel_height);
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    if let Some(crs) = raster.crs() {
        println!("CRS: {}", crs);
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    println!(
        "  Valid cells: {} ({:.1}%)",
        stats.valid_count,
        100.0 * stats.valid_count as f64 / raster.len() as f64
    );
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Exit status for a failed run: 2 for usage errors, 130 when cancelled
fn exit_code(err: &anyhow::Error) -> u8 {
    let core = err.chain().find_map(|e| e.downcast_ref::<Error>());
    match core {
        Some(e) if e.is_usage() => 2,
        Some(e) if e.is_cancelled() => 130,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Info { input, band } => run_info(&input, band),
        Commands::Grid(args) => run_grid(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code(&err);
            if code == 130 {
                eprintln!("Interrupted.");
            } else {
                eprintln!("Error: {:#}", err);
                if code == 2 {
                    eprintln!("Run with --help for usage.");
                }
            }
            ExitCode::from(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> GridArgs {
        let mut argv = vec!["surtgrid", "grid", "points.geojson", "-o", "out.tif"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Grid(args) => args,
            _ => panic!("expected grid"),
        }
    }

    #[test]
    fn test_options_from_flags() {
        let opts = build_options(&args(&[
            "-a",
            "nearest:radius1=5",
            "--txe",
            "0",
            "100",
            "--tye",
            "-50",
            "50",
            "--outsize",
            "10",
            "20",
            "--ot",
            "int16",
            "--a-srs",
            "EPSG:4326",
        ]))
        .unwrap();
        assert_eq!(opts.size, OutputSize::Pixels { width: 10, height: 20 });
        assert_eq!(opts.extent, Some(Extent::new(0.0, -50.0, 100.0, 50.0)));
        assert_eq!(opts.pixel_type, PixelType::Int16);
        assert_eq!(opts.crs.and_then(|c| c.epsg()), Some(4326));
        assert_eq!(opts.algorithm.name(), "nearest");
    }

    #[test]
    fn test_usage_errors_exit_2() {
        let err = build_options(&args(&["-a", "spline"])).unwrap_err();
        assert_eq!(exit_code(&err), 2);

        let err = build_options(&args(&["--txe", "0", "1"])).unwrap_err();
        assert_eq!(exit_code(&err), 2);

        assert!(Cli::try_parse_from([
            "surtgrid", "grid", "p.geojson", "-o", "o.tif", "--outsize", "1", "1", "--tr", "1", "1",
        ])
        .is_err());
    }

    #[test]
    fn test_clipsrc_forms() {
        let bbox = parse_clipsrc(&["0".into(), "0".into(), "10".into(), "5".into()]).unwrap();
        assert!(matches!(bbox, Geometry::Polygon(_)));

        let wkt = parse_clipsrc(&["POLYGON((0 0,1 0,1 1,0 1,0 0))".into()]).unwrap();
        assert!(matches!(wkt, Geometry::Polygon(_)));

        let err = parse_clipsrc(&["not a geometry".into()]).unwrap_err();
        assert_eq!(exit_code(&err), 2);
    }

    #[test]
    fn test_clipsrc_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.geojson");
        std::fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[2,0],[2,2],[0,2],[0,0]]]}},
                {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[5,5]}}
            ]}"#,
        )
        .unwrap();
        let clip = parse_clipsrc(&[path.to_string_lossy().into_owned()]).unwrap();
        match clip {
            Geometry::MultiPolygon(mp) => assert_eq!(mp.0.len(), 1),
            other => panic!("unexpected {:?}", other),
        }
    }
}
