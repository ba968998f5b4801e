use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use decoden_core::{Result, Summarizable};
use decoden_denoise::{Decoden, DenoiseConfig, DenoiseOutput, HSR_VALUE_SUFFIX};
use decoden_io::{
    load_blacklist_mask, load_experiment, write_bedgraph_tracks, write_bin_matrix,
    write_mixing_matrix,
};
use decoden_omics::BinMask;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "decoden",
    version,
    about = "Multi-condition denoising of binned ChIP-seq coverage",
    long_about = "Separate the background shared by control and treatment samples from \n\
                  condition-specific signal, then rescale each treatment against the control."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Denoise preprocessed coverage tracks
    #[command(subcommand)]
    Denoise(DenoiseMode),
}

#[derive(Subcommand, Debug)]
enum DenoiseMode {
    /// Pool the replicates of each condition into one normalized track
    Consolidate(DenoiseArgs),
    /// Keep one normalized track per treatment replicate
    Replicates(DenoiseArgs),
}

#[derive(Args, Debug, Clone)]
struct DenoiseArgs {
    /// JSON map from tiled track to condition label (`experiment_conditions.json`)
    #[arg(short = 'f', long)]
    files_reference: PathBuf,

    /// Label of the control/input samples
    #[arg(short = 'c', long, default_value = "control")]
    control_label: String,

    /// Output directory [default: the reference file's directory]
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// BED file of regions excluded from HSR fitting
    #[arg(short, long)]
    blacklist: Option<PathBuf>,

    /// JSON file with run parameters; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Regularisation of the signal factor
    #[arg(long)]
    alpha_w: Option<f64>,

    /// Regularisation of the mixing factor
    #[arg(long)]
    alpha_h: Option<f64>,

    /// Minimum control coverage of a training bin
    #[arg(long)]
    control_cov_threshold: Option<f64>,

    /// Number of bins sampled for training
    #[arg(long)]
    n_train_bins: Option<usize>,

    /// Bins per projection chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Floor applied before the log transform
    #[arg(long)]
    eps: Option<f64>,

    /// Fewer HSR fit bins than this raise a warning
    #[arg(long)]
    min_fit_bins: Option<usize>,
}

impl DenoiseArgs {
    /// Defaults, then the `--config` file, then individual flags.
    fn resolve_config(&self) -> Result<DenoiseConfig> {
        let mut config = match &self.config {
            Some(path) => DenoiseConfig::from_json_file(path)?,
            None => DenoiseConfig::default(),
        };
        if let Some(v) = self.alpha_w {
            config.alpha_w = v;
        }
        if let Some(v) = self.alpha_h {
            config.alpha_h = v;
        }
        if let Some(v) = self.control_cov_threshold {
            config.control_cov_threshold = v;
        }
        if let Some(v) = self.n_train_bins {
            config.n_train_bins = v;
        }
        if let Some(v) = self.chunk_size {
            config.chunk_size = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(v) = self.eps {
            config.eps = v;
        }
        if let Some(v) = self.min_fit_bins {
            config.min_fit_bins = v;
        }
        Ok(config)
    }

    fn out_dir(&self) -> PathBuf {
        self.out_dir.clone().unwrap_or_else(|| {
            self.files_reference
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        })
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match &cli.command {
        Commands::Denoise(DenoiseMode::Consolidate(args)) => run_denoise(args, false),
        Commands::Denoise(DenoiseMode::Replicates(args)) => run_denoise(args, true),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_denoise(args: &DenoiseArgs, per_replicate: bool) -> Result<()> {
    let engine = Decoden::new(args.resolve_config()?)?;
    let (coverage, layout) = load_experiment(&args.files_reference, &args.control_label)?;
    log::info!("{}", layout.summary());

    let mask = match &args.blacklist {
        Some(path) => load_blacklist_mask(path, coverage.bins())?,
        None => BinMask::all_usable(coverage.n_bins()),
    };

    let output = if per_replicate {
        engine.run_replicates(&coverage, &layout, &mask)?
    } else {
        engine.run_consolidated(&coverage, &layout, &mask)?
    };

    let out_dir = args.out_dir();
    std::fs::create_dir_all(&out_dir)?;
    write_outputs(&out_dir, &output)?;
    std::fs::write(
        out_dir.join("decoden_config.json"),
        engine.config().to_json_string()?,
    )?;
    log::info!("Results written to {}", out_dir.display());
    Ok(())
}

fn write_outputs(out_dir: &Path, output: &DenoiseOutput) -> Result<()> {
    write_mixing_matrix(out_dir.join("mixing_matrix.tsv"), &output.mixing)?;
    write_bin_matrix(out_dir.join("signal_matrix.tsv"), &output.signal)?;
    write_bin_matrix(out_dir.join("hsr_results.tsv"), &output.hsr)?;
    write_bedgraph_tracks(out_dir, &output.hsr, HSR_VALUE_SUFFIX)?;
    Ok(())
}
