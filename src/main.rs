use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;
use tree_benchmark::benchmark::report::save_results;
use tree_benchmark::benchmark::runner::BenchmarkRunner;
use tree_benchmark::config::{BenchmarkConfig, PreprocessConfig};
use tree_benchmark::dataset::tree_dataset::TreeDataset;
use tree_benchmark::evaluation::metrics::{SummaryTable, summarize};
use tree_benchmark::object_detection::gemini_detector::GeminiDetector;
use tree_benchmark::object_detection::object_detection_model::Detector;
use tree_benchmark::object_detection::onnx_tree_detector::OnnxTreeDetector;
use tree_benchmark::preprocessing::resize::preprocess_dataset;
use tree_benchmark::{Error, Result};

#[derive(Parser, Debug)]
#[command(author, version, about = "Benchmark tree detectors on aerial image patches", long_about = None)]
struct Args {
    /// Settings file (defaults to ./treebench.toml when present)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resize the raw images and split the master annotation table per image.
    Preprocess,
    /// Run every available detector over the processed images and score them.
    Benchmark {
        /// Run only on the first N images
        #[clap(long)]
        limit: Option<usize>,

        /// Minimum IoU for a detection to count as finding a tree
        #[clap(long)]
        iou_threshold: Option<f64>,

        /// Gemini API key; the Gemini model is skipped without one
        #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        gemini_api_key: Option<String>,

        /// Do not run the local ONNX model
        #[clap(long)]
        skip_local: bool,
    },
    /// Print the ground truth found for the first few processed images.
    Inspect {
        /// Number of images to show
        #[clap(long, default_value_t = 3)]
        count: usize,
    },
}

fn handle_preprocess(config: Option<PathBuf>) -> Result<()> {
    let config = PreprocessConfig::load(config.as_deref())?;
    let summary = preprocess_dataset(&config)?;
    println!("Processing Complete.");
    println!("Images: {}", summary.images);
    println!("Annotated: {}", summary.annotated);
    Ok(())
}

fn build_detectors(
    config: &BenchmarkConfig,
    gemini_api_key: Option<String>,
    skip_local: bool,
) -> Result<Vec<Box<dyn Detector>>> {
    let mut detectors: Vec<Box<dyn Detector>> = Vec::new();

    if !skip_local {
        info!("Initializing {}...", config.onnx.name);
        match OnnxTreeDetector::new(&config.onnx) {
            Ok(detector) => detectors.push(Box::new(detector)),
            Err(err) => warn!("Skipping {}: {}", config.onnx.name, err),
        }
    }

    match gemini_api_key.filter(|key| !key.is_empty()) {
        Some(key) => {
            info!("Initializing {} ({})...", config.gemini.name, config.gemini.model);
            let detector = GeminiDetector::new(key, config.gemini.clone(), config.image_size)?;
            detectors.push(Box::new(detector));
        }
        None => info!("Skipping {} (No API Key)", config.gemini.name),
    }
    Ok(detectors)
}

fn handle_benchmark(
    config: Option<PathBuf>,
    limit: Option<usize>,
    iou_threshold: Option<f64>,
    gemini_api_key: Option<String>,
    skip_local: bool,
) -> Result<()> {
    let mut config = BenchmarkConfig::load(config.as_deref())?;
    if limit.is_some() {
        config.limit = limit;
    }
    if let Some(iou_threshold) = iou_threshold {
        config.iou_threshold = iou_threshold;
        config.validate()?;
    }

    let dataset = TreeDataset::new(&config.processed_dir)?;
    info!("Loaded {} images for benchmarking.", dataset.len());

    let detectors = build_detectors(&config, gemini_api_key, skip_local)?;
    if detectors.is_empty() {
        return Err(Error::InvalidConfig("no detectors could be initialized".to_string()));
    }

    let mut runner = BenchmarkRunner::new(detectors, config.iou_threshold)
        .with_limit(config.limit)
        .with_progress(true);
    let records = runner.run(&dataset)?;

    let results_path = config.results_path();
    save_results(&records, &results_path)?;
    info!("Saved {} records to {}", records.len(), results_path.display());

    let summaries = summarize(&records);
    if summaries.is_empty() {
        println!("No results generated.");
    } else {
        println!("\n=== BENCHMARK SUMMARY (Average per Image) ===");
        print!("{}", SummaryTable(&summaries));
    }
    Ok(())
}

fn handle_inspect(config: Option<PathBuf>, count: usize) -> Result<()> {
    let config = BenchmarkConfig::load(config.as_deref())?;
    let dataset = TreeDataset::new(&config.processed_dir)?;
    println!("Dataset found {} images in: {}", dataset.len(), dataset.image_dir().display());
    println!("Looking for annotations in: {}", dataset.annotation_dir().display());

    for sample in dataset.samples().take(count) {
        let sample = sample?;
        println!("\n--- Image: {} ---", sample.image_name());
        println!("Ground Truth Trees Found: {}", sample.ground_truth.len());
        let expected_csv = dataset.annotation_path(&sample.image_path);
        if expected_csv.exists() {
            println!(
                "CSV File: FOUND at {} ({} rows)",
                expected_csv.display(),
                sample.ground_truth.len()
            );
        } else {
            println!("CSV File: MISSING at {}", expected_csv.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.cmd {
        Command::Preprocess => handle_preprocess(args.config),
        Command::Benchmark {
            limit,
            iou_threshold,
            gemini_api_key,
            skip_local,
        } => handle_benchmark(args.config, limit, iou_threshold, gemini_api_key, skip_local),
        Command::Inspect { count } => handle_inspect(args.config, count),
    }
}
