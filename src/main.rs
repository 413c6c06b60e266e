use anyhow::Context;
use clap::{Parser, Subcommand};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weighbridge_ocr::engines::{self, EngineSettings, VisionConfig};
use weighbridge_ocr::error::ErrorResponse;
use weighbridge_ocr::{OcrError, OcrProcessor, Pipeline, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "weighbridge-ocr")]
#[command(about = "Preprocess photographed tickets and plates and recognize their text")]
#[command(version)]
pub struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the preprocessing pipeline and write the binarized image
    Preprocess {
        /// Color image to read (any format the image crate decodes)
        #[arg(long)]
        input: PathBuf,

        /// Where to write the binarized image; format follows the extension
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Preprocess an image and recognize its text
    Ocr {
        /// Color image to read
        #[arg(long)]
        input: PathBuf,

        /// OCR engine to use ("vision", or "ocrs" when built with engine-ocrs)
        #[arg(long, env = "OCR_ENGINE", default_value = "vision")]
        engine: String,

        /// File holding the cloud OCR API key
        #[arg(long, env = "OCR_CREDENTIALS")]
        credentials: Option<PathBuf>,

        /// Override the cloud OCR endpoint
        #[arg(long, env = "OCR_VISION_ENDPOINT")]
        endpoint: Option<String>,

        /// Cloud OCR request timeout in seconds
        #[arg(long, env = "OCR_TIMEOUT_SECS", default_value = "30")]
        timeout_secs: u64,

        /// Model cache directory for the local engine
        #[arg(long, env = "OCR_MODEL_DIR")]
        model_dir: Option<PathBuf>,

        /// Also write the binarized image sent to the engine
        #[arg(long)]
        save_preprocessed: Option<PathBuf>,

        #[command(flatten)]
        tuning: TuningArgs,
    },
}

/// Pipeline tuning; flags override values from the config file
#[derive(clap::Args, Debug)]
pub struct TuningArgs {
    /// JSON pipeline configuration file
    #[arg(long, env = "OCR_PIPELINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Lower edge-detection threshold (default 50)
    #[arg(long)]
    pub canny_low: Option<f32>,

    /// Upper edge-detection threshold (default 150)
    #[arg(long)]
    pub canny_high: Option<f32>,

    /// Line accumulator vote threshold (default 200)
    #[arg(long)]
    pub vote_threshold: Option<u32>,

    /// Line accumulator angular resolution in degrees (default 1)
    #[arg(long)]
    pub angle_resolution: Option<f64>,

    /// Contrast tile grid rows (default 8)
    #[arg(long)]
    pub tile_rows: Option<u32>,

    /// Contrast tile grid columns (default 8)
    #[arg(long)]
    pub tile_cols: Option<u32>,

    /// Contrast clip limit (default 2.0)
    #[arg(long)]
    pub clip_limit: Option<f64>,
}

impl TuningArgs {
    fn pipeline_config(&self) -> Result<PipelineConfig, OcrError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(v) = self.canny_low {
            config.skew.canny_low = v;
        }
        if let Some(v) = self.canny_high {
            config.skew.canny_high = v;
        }
        if let Some(v) = self.vote_threshold {
            config.skew.vote_threshold = v;
        }
        if let Some(v) = self.angle_resolution {
            config.skew.angle_resolution_deg = v;
        }
        if let Some(v) = self.tile_rows {
            config.contrast.tile_rows = v;
        }
        if let Some(v) = self.tile_cols {
            config.contrast.tile_cols = v;
        }
        if let Some(v) = self.clip_limit {
            config.contrast.clip_limit = v;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing; stdout is reserved for the JSON report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(ocr_err) = err.downcast_ref::<OcrError>() {
                if let Ok(body) = serde_json::to_string(&ErrorResponse::from(ocr_err)) {
                    println!("{}", body);
                }
            }
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Preprocess {
            input,
            output,
            tuning,
        } => {
            let pipeline = Pipeline::new(tuning.pipeline_config()?)?;
            let image = load_color_image(&input)?;

            let result = pipeline.process(&image)?;
            result
                .image
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Ocr {
            input,
            engine,
            credentials,
            endpoint,
            timeout_secs,
            model_dir,
            save_preprocessed,
            tuning,
        } => {
            let pipeline = Pipeline::new(tuning.pipeline_config()?)?;

            let vision = credentials.map(|path| {
                let mut config = VisionConfig::new(path);
                if let Some(endpoint) = endpoint {
                    config.endpoint = endpoint;
                }
                config.timeout = Duration::from_secs(timeout_secs);
                config
            });
            let settings = EngineSettings { vision, model_dir };
            let processor = OcrProcessor::new(pipeline, engines::build(&engine, &settings)?);

            let image = load_color_image(&input)?;
            let outcome = processor.process(&image)?;

            if let Some(path) = save_preprocessed {
                outcome
                    .preprocessing
                    .image
                    .save(&path)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }

            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

/// Decode as three-channel color, dropping any alpha channel
fn load_color_image(path: &Path) -> anyhow::Result<DynamicImage> {
    let image =
        image::open(path).with_context(|| format!("Failed to decode {}", path.display()))?;
    tracing::info!(
        "Loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(DynamicImage::ImageRgb8(image.into_rgb8()))
}
