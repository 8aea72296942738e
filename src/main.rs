use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::Path;

use sphproj::cli::{Args, Command};
use sphproj::{load_sample_points, CompactVariant, Geometry, ProbeConfig};

fn init_logging(args: &Args) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    if let Some(log_path) = &args.log_file {
        let log_level = match args.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        let file = std::fs::File::create(log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;
        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Respects RUST_LOG if set
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn load_geometry(path: &Path) -> Result<Geometry> {
    let cfg = ProbeConfig::from_file(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    debug!("Configuration: {:?}", cfg);
    Geometry::create(cfg.descriptor, cfg.params).context("Failed to create geometry")
}

fn print_layout(geo: &Geometry) {
    let (fw, fh) = geo.face_size();
    let (pw, ph) = geo.packed_size();
    println!("geometry:   {} (id {})", geo.geometry_type().name(), geo.geometry_type().id());
    println!("faces:      {} x {}x{}", geo.num_faces(), fw, fh);
    println!("chroma:     {:?}", geo.chroma_format());
    println!("bit depth:  {}", geo.bit_depth());
    println!("margin:     {}", geo.margin());
    println!("packed:     {}x{}", pw, ph);

    let compact = geo.descriptor().compact;
    if compact != CompactVariant::Off {
        println!("layout:     compact {:?}", compact);
        return;
    }
    let fp = geo.frame_pack_layout();
    println!("layout:     {} rows x {} cols", fp.rows, fp.cols);
    for row in 0..fp.rows {
        let cells: Vec<String> = (0..fp.cols)
            .map(|col| {
                let slot = fp.slot(row, col);
                match slot.face {
                    Some(face) => format!(
                        "{:>2}{}@{:<3}",
                        face,
                        if slot.flip { "f" } else { " " },
                        slot.rotation.degrees()
                    ),
                    None => "  --    ".to_string(),
                }
            })
            .collect();
        println!("  {}", cells.join(" "));
    }
}

fn print_points(geo: &Geometry, points: &Path, limit: Option<usize>) -> Result<()> {
    let points = load_sample_points(points)
        .with_context(|| format!("Failed to load sample points {}", points.display()))?;
    let count = limit.map_or(points.len(), |n| n.min(points.len()));
    println!("{:>10} {:>10}  {:>4} {:>10} {:>10}  {:>10} {:>10}", "lon", "lat", "face", "x", "y", "packed_x", "packed_y");
    for point in &points[..count] {
        let pos = geo.sample_position(point);
        let packed = match pos.packed {
            Some(p) => format!("{:>10.3} {:>10.3}", p.x, p.y),
            None => format!("{:>10} {:>10}", "-", "-"),
        };
        println!(
            "{:>10.4} {:>10.4}  {:>4} {:>10.3} {:>10.3}  {}",
            point.lon, point.lat, pos.face.face, pos.face.x, pos.face.y, packed
        );
    }
    if count < points.len() {
        info!("Printed {} of {} points", count, points.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    info!("sphproj {} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Command-line args: {:?}", args);

    match &args.command {
        Command::Layout { config } => {
            let geo = load_geometry(config)?;
            print_layout(&geo);
        }
        Command::Points { config, points, limit } => {
            let geo = load_geometry(config)?;
            print_points(&geo, points, *limit)?;
        }
    }
    Ok(())
}
