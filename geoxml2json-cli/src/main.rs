use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use geoxml2json::source::convert_file_as;
use geoxml2json::{GeoJsonWriter, SourceFormat, WriterConfig};
use rayon::ThreadPoolBuilder;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input KML, KMZ or GPX file, or a directory to convert recursively
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (a single file is written to stdout when omitted)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Number of worker threads for directories (default: CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Indent the GeoJSON output
    #[arg(long)]
    pretty: bool,

    /// Read the input as this format instead of guessing from the extension
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Kml,
    Kmz,
    Gpx,
}

impl From<FormatArg> for SourceFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Kml => SourceFormat::Kml,
            FormatArg::Kmz => SourceFormat::Kmz,
            FormatArg::Gpx => SourceFormat::Gpx,
        }
    }
}

fn main() -> Result<()> {
    // stdout may carry GeoJSON, logs go to stderr
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    if args.input.is_file() {
        info!("Processing file: {:?}", args.input);
        process_file(&args.input, &args)?;
    } else if args.input.is_dir() {
        info!("Processing directory: {:?}", args.input);
        let output = args
            .output
            .as_deref()
            .context("--output is required when the input is a directory")?;
        process_directory(&args.input, output, &args)?;
    } else {
        error!("Invalid input path: {:?}", args.input);
        anyhow::bail!("Input path must be a file or directory");
    }

    info!("Total processing time: {:?}", start_time.elapsed());
    Ok(())
}

fn writer_for(args: &Args) -> GeoJsonWriter {
    GeoJsonWriter::with_config(WriterConfig {
        pretty: args.pretty,
    })
}

fn format_for(path: &Path, args: &Args) -> Result<SourceFormat> {
    args.format
        .map(SourceFormat::from)
        .or_else(|| SourceFormat::from_path(path))
        .with_context(|| format!("Cannot tell the format of {:?}, pass --format", path))
}

fn process_file(path: &Path, args: &Args) -> Result<()> {
    let format = format_for(path, args)?;
    let collection = convert_file_as(path, format)
        .with_context(|| format!("Failed to convert {:?}", path))?;
    info!("Converted {:?}: {} features", path, collection.features.len());

    let writer = writer_for(args);
    match &args.output {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let output_path = dir.join(output_name(path));
            writer.write(&collection, &output_path)?;
            info!("Written GeoJSON: {:?}", output_path);
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            writer.write_to(&collection, &mut lock)?;
            lock.flush()?;
        }
    }
    Ok(())
}

fn output_name(path: &Path) -> PathBuf {
    path.with_extension("geojson")
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("output.geojson"))
}

fn process_directory(dir: &Path, output: &Path, args: &Args) -> Result<()> {
    use rayon::prelude::*;

    let input_files = collect_input_files(dir)?;
    info!("Found {} input files (KML/KMZ/GPX)", input_files.len());

    let writer = writer_for(args);
    let results: Vec<Result<()>> = input_files
        .par_iter()
        .map(|(path, format)| -> Result<()> {
            let collection = convert_file_as(path, *format)?;
            // mirror the input tree so equal file names in different
            // folders do not collide
            let relative = path.strip_prefix(dir).unwrap_or(path);
            let output_path = output.join(relative).with_extension("geojson");
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            writer.write(&collection, &output_path)?;
            info!("Written GeoJSON: {:?}", output_path);
            Ok(())
        })
        .collect();

    let mut errors = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        if let Err(e) = result {
            errors.push(format!("{}: {}", input_files[i].0.display(), e));
        }
    }

    if !errors.is_empty() {
        error!("Failed to process {} files:", errors.len());
        for err in &errors {
            error!("  {}", err);
        }
        anyhow::bail!("{} files failed to process", errors.len());
    }

    Ok(())
}

fn collect_input_files(dir: &Path) -> Result<Vec<(PathBuf, SourceFormat)>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(collect_input_files(&path)?);
        } else if let Some(format) = SourceFormat::from_path(&path) {
            files.push((path, format));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
