use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use heightfield::{Heightfield, HeightfieldConfig, HeightfieldGenerator, HeightfieldRenderer};

#[derive(Parser, Debug)]
#[command(name = "heightfield-cli")]
#[command(about = "Generate a Diamond-Square heightfield and render it as a greyscale map")]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subdivision level (grid side is 2^level + 1)
    #[arg(short, long)]
    level: Option<u32>,

    /// Top-left corner elevation
    #[arg(long, allow_negative_numbers = true)]
    top_left: Option<f64>,

    /// Top-right corner elevation
    #[arg(long, allow_negative_numbers = true)]
    top_right: Option<f64>,

    /// Bottom-left corner elevation
    #[arg(long, allow_negative_numbers = true)]
    bottom_left: Option<f64>,

    /// Bottom-right corner elevation
    #[arg(long, allow_negative_numbers = true)]
    bottom_right: Option<f64>,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Displacement multiplier (0 gives a smooth field)
    #[arg(short, long)]
    roughness: Option<f64>,

    /// Pixels per cell in the PNG
    #[arg(long)]
    scale: Option<u32>,

    /// PNG output path
    #[arg(short, long, default_value = "heightfield.png")]
    output: PathBuf,

    /// Also write the heightfield as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print a shaded preview to the terminal
    #[arg(long)]
    ascii: bool,
}

impl Args {
    fn resolve_config(&self) -> anyhow::Result<HeightfieldConfig> {
        let mut config = match &self.config {
            Some(path) => HeightfieldConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => HeightfieldConfig::default(),
        };

        if let Some(level) = self.level {
            config.level = level;
        }
        if let Some(v) = self.top_left {
            config.corners.top_left = v;
        }
        if let Some(v) = self.top_right {
            config.corners.top_right = v;
        }
        if let Some(v) = self.bottom_left {
            config.corners.bottom_left = v;
        }
        if let Some(v) = self.bottom_right {
            config.corners.bottom_right = v;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(roughness) = self.roughness {
            config.roughness = roughness;
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }

        config.validate()?;
        Ok(config)
    }
}

const SHADES: &[u8] = b" .:-=+*#%@";

fn print_heightfield_ascii(field: &Heightfield) {
    // Sample large grids down to terminal size
    let sample_x = (field.span / 80).max(1);
    let sample_y = (field.span / 40).max(1);

    for y in (0..field.span).step_by(sample_y) {
        let line: String = (0..field.span)
            .step_by(sample_x)
            .map(|x| {
                let brightness = HeightfieldRenderer::intensity(field.heights[y][x], field.max_height);
                let index = brightness as usize * (SHADES.len() - 1) / 255;
                SHADES[index] as char
            })
            .collect();
        println!("{}", line);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.resolve_config()?;

    let seed = config.seed.unwrap_or_else(rand::random);
    info!(seed, level = config.level, roughness = config.roughness, "generating heightfield");

    let mut generator = HeightfieldGenerator::new_with_settings(seed, config.settings());
    let field = generator.generate_level(config.level, config.corners)?;

    if args.ascii {
        print_heightfield_ascii(&field);
    }

    HeightfieldRenderer::save_png(&field, &args.output, config.scale)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!(path = %args.output.display(), "saved heightfield image");

    if let Some(path) = &args.json {
        let json = serde_json::to_string(&field)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "saved heightfield data");
    }

    Ok(())
}
