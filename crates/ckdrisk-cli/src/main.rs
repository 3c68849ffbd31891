//! `ckdrisk`: train, serve, query, and inspect the CKD risk model.

mod display;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use ckdrisk_core::FeatureRecord;
use ckdrisk_model::{ArtifactError, ForestParams, RiskModel, TrainConfig, artifact, trainer};
use ckdrisk_web::{DEFAULT_LISTEN, DEFAULT_MODEL_DIR, ServeConfig};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ckdrisk", version, about = "Chronic kidney disease risk classifier")]
struct Cli {
    /// Directory holding ckd_model.json and label_encoders.json.
    #[arg(long, global = true, env = "CKDRISK_MODEL_DIR", default_value = DEFAULT_MODEL_DIR)]
    model_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train on a synthetic table and write both artifacts.
    Train {
        /// Rows of synthetic data to generate.
        #[arg(long, default_value = "1000")]
        rows: usize,

        /// Trees in the forest.
        #[arg(long, default_value = "100")]
        trees: usize,

        /// Random seed for data, bootstrap, and holdout.
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Maximum tree depth; unlimited when omitted.
        #[arg(long)]
        max_depth: Option<usize>,

        /// Share of rows held out for evaluation.
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,
    },

    /// Serve the prediction form and JSON API.
    Serve {
        #[arg(long, env = "CKDRISK_LISTEN", default_value = DEFAULT_LISTEN)]
        listen: String,
    },

    /// Run one prediction and print the result.
    Predict(PredictArgs),

    /// Print every encoder column and its classes.
    Inspect,
}

#[derive(Args)]
struct PredictArgs {
    #[arg(long)]
    age: u16,
    #[arg(long)]
    bp: u16,
    #[arg(long)]
    sg: f64,
    #[arg(long)]
    al: u8,
    #[arg(long)]
    su: u8,
    #[arg(long)]
    rbc: String,
    #[arg(long)]
    pc: String,
    #[arg(long)]
    pcc: String,
    #[arg(long)]
    ba: String,
    #[arg(long)]
    htn: String,
}

impl From<PredictArgs> for FeatureRecord {
    fn from(a: PredictArgs) -> Self {
        Self {
            age: f64::from(a.age),
            bp: f64::from(a.bp),
            sg: a.sg,
            al: a.al,
            su: a.su,
            rbc: a.rbc,
            pc: a.pc,
            pcc: a.pcc,
            ba: a.ba,
            htn: a.htn,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    tracing::debug!("ckdrisk v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let model_dir = cli.model_dir;
    match cli.command {
        Command::Train {
            rows,
            trees,
            seed,
            max_depth,
            test_fraction,
        } => {
            let config = TrainConfig {
                n_rows: rows,
                test_fraction,
                forest: ForestParams {
                    n_trees: trees,
                    max_depth,
                    seed,
                    ..ForestParams::default()
                },
            };
            let report = trainer::train_and_save(&config, &model_dir)
                .with_context(|| format!("training into {}", model_dir.display()))?;
            display::print_report(&report, &model_dir);
        }

        Command::Serve { listen } => {
            ckdrisk_web::serve(ServeConfig { listen, model_dir }).await?;
        }

        Command::Predict(args) => {
            print!("{}", predict(&model_dir, &FeatureRecord::from(args))?);
        }

        Command::Inspect => match inspect(&model_dir) {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("Error loading encoders: {e}");
                return Ok(ExitCode::FAILURE);
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}

fn predict(model_dir: &Path, record: &FeatureRecord) -> anyhow::Result<String> {
    record.validate()?;
    let model = RiskModel::load(model_dir)
        .with_context(|| format!("loading model from {}", model_dir.display()))?;
    let prediction = model.predict(record)?;
    Ok(display::format_prediction(&prediction))
}

fn inspect(model_dir: &Path) -> Result<String, ArtifactError> {
    let encoders = artifact::load_encoders(&artifact::encoders_path(model_dir))?;
    Ok(display::format_encoders(&encoders))
}
