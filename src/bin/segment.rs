use anyhow::{Context, Result};
use clap::Parser;
use material_segmenter_wasm::render::load_font;
use material_segmenter_wasm::{BrightnessPolicy, PanelOptions, SegmentConfig, segment_bytes};
use std::fs;
use std::path::PathBuf;

/// Split images into material and background by color clustering.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of k-means clusters
    #[arg(short = 'k', long)]
    clusters: Option<usize>,

    /// Independent k-means restarts
    #[arg(short, long)]
    attempts: Option<usize>,

    /// Iteration cap per restart
    #[arg(long)]
    max_iter: Option<usize>,

    /// Stop once no centroid moves farther than this (channel units)
    #[arg(short, long)]
    epsilon: Option<f32>,

    /// Seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// How the material cluster is chosen
    #[arg(short, long, value_enum)]
    policy: Option<BrightnessPolicy>,

    /// Re-cluster the material pixels and keep only the brighter half
    #[arg(long)]
    refine: bool,

    /// Write a three-panel PNG per input into this directory
    #[arg(short = 'd', long)]
    out_dir: Option<PathBuf>,

    /// Resize factor for the panel PNG
    #[arg(long)]
    panel_scale: Option<f32>,

    /// TrueType/OpenType font used to caption the panels with percentages
    #[arg(long)]
    font: Option<PathBuf>,

    /// Print one JSON object per input instead of text
    #[arg(long)]
    json: bool,
}

impl Args {
    fn segment_config(&self) -> Result<SegmentConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                SegmentConfig::from_json_str(&json)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => SegmentConfig::default(),
        };

        if let Some(k) = self.clusters {
            config.clusters = k;
        }
        if let Some(n) = self.attempts {
            config.attempts = n;
        }
        if let Some(n) = self.max_iter {
            config.max_iterations = n;
        }
        if let Some(eps) = self.epsilon {
            config.epsilon = eps;
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        config.seed = self.seed.or(config.seed);
        config.refine |= self.refine;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.segment_config()?;
    let font = match &args.font {
        Some(path) => {
            let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Some(load_font(bytes).with_context(|| format!("loading {}", path.display()))?)
        }
        None => None,
    };
    let panel = PanelOptions {
        scale: args.panel_scale,
        font,
    };

    for input in &args.inputs {
        let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
        let report = segment_bytes(&bytes, &config, &panel)
            .with_context(|| format!("segmenting {}", input.display()))?;

        if args.json {
            let mut value = serde_json::to_value(&report)?;
            value["input"] = serde_json::Value::from(input.display().to_string());
            println!("{value}");
        } else {
            println!(
                "{}: Material: {:.2}% | Background: {:.2}%",
                input.display(),
                report.stats.material_pct,
                report.stats.background_pct
            );
        }

        if let Some(dir) = &args.out_dir {
            let stem = input.file_stem().unwrap_or_default().to_string_lossy();
            let out_path = dir.join(format!("{stem}_segmentation.png"));
            fs::create_dir_all(dir)?;
            fs::write(&out_path, &report.panels_png)?;
            eprintln!("Saved → {}", out_path.display());
        }
    }

    Ok(())
}
