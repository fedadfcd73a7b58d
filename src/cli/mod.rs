//! Miami Housing CLI Module
//!
//! Command-line interface for training, prediction and explanation.

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::config::HousingConfig;
use crate::controls::{ControlKind, InputForm};
use crate::data::{columns_to_array2, DataLoader};
use crate::explainability::TreeExplainer;
use crate::inference::Predictor;
use crate::model::ModelArtifact;
use crate::schema::{FeatureSchema, FeatureVector};
use crate::training::{Trainer, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn bar(fraction: f64, width: usize) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn format_price(value: f64) -> String {
    let whole = value.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "miami-housing")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Miami housing sale price model: train, predict, explain")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the price model on the housing CSV
    Train {
        /// Input dataset (defaults to HOUSING_DATA_PATH)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Output artifact (defaults to HOUSING_MODEL_PATH); `.json` selects JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Random seed (defaults to HOUSING_SEED, else random)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of trees
        #[arg(long)]
        n_estimators: Option<usize>,

        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Predict the sale price of one house
    Predict {
        /// Trained model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Feature record as inline JSON or a path to a JSON file
        #[arg(short, long, conflicts_with = "set")]
        input: Option<String>,

        /// Feature value as NAME=VALUE, repeatable
        #[arg(long = "set", value_name = "NAME=VALUE")]
        set: Vec<String>,

        /// Fill unset features with the input form defaults
        #[arg(long)]
        with_defaults: bool,

        /// Predict even when a value lies outside the training range
        #[arg(long)]
        allow_out_of_range: bool,
    },

    /// Rank feature contributions over a reference dataset
    Explain {
        /// Trained model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Reference dataset (defaults to HOUSING_DATA_PATH)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Explain at most this many rows
        #[arg(long)]
        limit: Option<usize>,

        /// Number of features to show
        #[arg(long, default_value = "13")]
        top: usize,

        /// Abort after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Write the full report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the input controls derived from the training data
    Controls {
        /// Trained model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Show artifact metadata
    Info {
        /// Trained model artifact
        #[arg(short, long)]
        model: Option<PathBuf>,
    },
}

impl Cli {
    /// Run the selected command
    pub fn run(self, config: &HousingConfig) -> anyhow::Result<()> {
        let model_path = |path: Option<PathBuf>| path.unwrap_or_else(|| config.model_path.clone());

        match self.command {
            Commands::Train { data, output, seed, n_estimators, max_depth } => {
                let mut config = config.clone();
                if seed.is_some() {
                    config.seed = seed;
                }
                if let Some(n) = n_estimators {
                    config.n_estimators = n;
                }
                let data = data.unwrap_or_else(|| config.data_path.clone());
                let output = output.unwrap_or_else(|| config.model_path.clone());
                cmd_train(&config, &data, &output, max_depth)
            }
            Commands::Predict { model, input, set, with_defaults, allow_out_of_range } => cmd_predict(
                &model_path(model),
                input.as_deref(),
                &set,
                with_defaults,
                allow_out_of_range,
            ),
            Commands::Explain { model, data, limit, top, timeout_secs, output } => {
                let data = data.unwrap_or_else(|| config.data_path.clone());
                let limit = limit.or(config.explain_max_samples);
                let timeout = timeout_secs.map(Duration::from_secs).or(config.explain_timeout);
                cmd_explain(&model_path(model), &data, limit, top, timeout, output.as_deref())
            }
            Commands::Controls { model } => cmd_controls(&model_path(model)),
            Commands::Info { model } => cmd_info(&model_path(model)),
        }
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    config: &HousingConfig,
    data_path: &Path,
    output: &Path,
    max_depth: Option<usize>,
) -> anyhow::Result<()> {
    section("Train");

    let schema = FeatureSchema::miami();
    let mut forest = config.forest_config();
    if let Some(depth) = max_depth {
        forest = forest.with_max_depth(depth);
    }
    forest.validate()?;

    step_run("Loading data");
    let start = Instant::now();
    let set = DataLoader::new()
        .load_training_set(data_path, &schema, crate::schema::TARGET_COLUMN)
        .with_context(|| format!("loading {}", data_path.display()))?;
    step_done(&format!("{} rows × {} features in {:?}", set.n_samples(), set.n_features(), start.elapsed()));

    step_run(&format!("Training {} trees", forest.n_estimators.to_string().cyan()));
    let start = Instant::now();
    let trainer = Trainer::new(TrainingConfig::new(forest));
    let model = trainer.train(&set)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run("Writing artifact");
    ModelArtifact::save(&model, output)?;
    step_done(&output.display().to_string());

    let metadata = model.metadata();
    println!();
    kv("Seed", &metadata.seed.to_string());
    kv("R² (in-sample)", &format!("{:.4}", metadata.metrics.r2));
    kv("RMSE", &format_price(metadata.metrics.rmse));
    kv("MAE", &format_price(metadata.metrics.mae));
    kv("Time", &format!("{:.3}s", metadata.metrics.training_time_secs));
    println!();

    Ok(())
}

fn read_input(input: &str) -> anyhow::Result<String> {
    let path = Path::new(input);
    if path.is_file() {
        return std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()));
    }
    Ok(input.to_string())
}

fn parse_assignments(assignments: &[String]) -> anyhow::Result<BTreeMap<String, f64>> {
    let mut named = BTreeMap::new();
    for assignment in assignments {
        let (name, value) = assignment
            .split_once('=')
            .with_context(|| format!("expected NAME=VALUE, got `{}`", assignment))?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("value for {} is not a number", name))?;
        named.insert(name.trim().to_string(), value);
    }
    Ok(named)
}

pub fn cmd_predict(
    model_path: &Path,
    input: Option<&str>,
    assignments: &[String],
    with_defaults: bool,
    allow_out_of_range: bool,
) -> anyhow::Result<()> {
    section("Predict");

    let predictor = Predictor::load(model_path, &FeatureSchema::miami())?;
    let schema = predictor.schema().clone();
    let form = InputForm::for_model(predictor.model())?;

    let vector = match input {
        Some(input) => {
            let json = read_input(input)?;
            let named: BTreeMap<String, f64> = serde_json::from_str(&json).context("parsing feature JSON")?;
            FeatureVector::from_named(&schema, &named)?
        }
        None => {
            let mut named = BTreeMap::new();
            if with_defaults {
                let defaults = form.defaults()?;
                for (name, value) in schema.names().into_iter().zip(defaults.values()) {
                    named.insert(name, *value);
                }
            }
            named.extend(parse_assignments(assignments)?);
            FeatureVector::from_named(&schema, &named)?
        }
    };

    if allow_out_of_range {
        if let Err(e) = form.validate(&vector) {
            println!("  {} {}", "!".yellow(), e.to_string().yellow());
        }
    } else {
        form.validate(&vector)?;
    }

    let price = predictor.predict(&vector)?;
    step_ok("Prediction");
    println!();
    for (name, value) in schema.names().iter().zip(vector.values()) {
        kv(name, &format!("{}", value));
    }
    println!();
    println!("  {:<16} {}", muted("Sale price"), format_price(price).white().bold());
    println!();

    Ok(())
}

pub fn cmd_explain(
    model_path: &Path,
    data_path: &Path,
    limit: Option<usize>,
    top: usize,
    timeout: Option<Duration>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Explain");

    let schema = FeatureSchema::miami();
    let model = ModelArtifact::load(model_path, &schema)?;

    step_run("Loading reference data");
    let df = DataLoader::new().load_csv(data_path)?;
    let reference = columns_to_array2(&df, &schema.names())?;
    step_done(&format!("{} rows", reference.nrows()));

    let mut explainer = TreeExplainer::new(&model);
    if let Some(n) = limit {
        explainer = explainer.with_max_samples(n);
    }
    if let Some(t) = timeout {
        explainer = explainer.with_timeout(t);
    }

    step_run("Computing contributions");
    let start = Instant::now();
    let report = explainer.explain(&reference)?;
    step_done(&format!("{} samples in {:?}", report.n_samples(), start.elapsed()));

    let ranking = report.global_ranking();
    let scale = ranking.first().map_or(0.0, |r| r.mean_abs_contribution);

    println!();
    kv("Base value", &format_price(report.base_value));
    kv("Max additivity", &format!("{:.3e}", report.max_additivity_error()));
    println!();
    println!("  {:<20} {:<24} {:>12}", muted("Feature"), muted("mean |contribution|"), muted("mean"));
    println!("  {}", dim(&"─".repeat(58)));
    for item in ranking.iter().take(top) {
        let fraction = if scale > 0.0 { item.mean_abs_contribution / scale } else { 0.0 };
        println!(
            "  {:<20} {} {:>10} {:>12}",
            item.feature_name,
            accent(&bar(fraction, 12)),
            format_price(item.mean_abs_contribution),
            format_price(item.mean_contribution).truecolor(140, 140, 140),
        );
    }
    println!();

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        step_ok(&format!("Report written to {}", path.display()));
        println!();
    }

    Ok(())
}

pub fn cmd_controls(model_path: &Path) -> anyhow::Result<()> {
    section("Input controls");

    let model = ModelArtifact::load(model_path, &FeatureSchema::miami())?;
    let form = InputForm::for_model(&model)?;

    for control in form.controls() {
        let detail = match &control.kind {
            ControlKind::Slider { min, max, default, integer } => {
                let step = if *integer { "integer" } else { "continuous" };
                format!("slider [{:.2}, {:.2}] default {:.2} ({})", min, max, default, step)
            }
            ControlKind::Select { options, default } => {
                let options: Vec<String> = options.iter().map(|o| o.to_string()).collect();
                format!("select {{{}}} default {}", options.join(", "), default)
            }
        };
        println!("  {:<20} {}", control.name.white(), control.label.truecolor(140, 140, 140));
        println!("  {:<20} {}", "", dim(&detail));
    }
    println!();

    Ok(())
}

pub fn cmd_info(model_path: &Path) -> anyhow::Result<()> {
    section("Model Info");

    let metadata = ModelArtifact::read_metadata(model_path)?;

    kv("File", &model_path.display().to_string());
    kv("Name", &metadata.name);
    kv("Trained", &metadata.trained_at.to_rfc3339());
    kv("Version", &metadata.crate_version);
    kv("Samples", &metadata.n_samples.to_string());
    kv("Trees", &metadata.forest.n_estimators.to_string());
    kv("Seed", &metadata.seed.to_string());
    kv("Target", &metadata.target_name);
    let fingerprint = metadata.schema_fingerprint.as_str();
    kv("Schema", fingerprint.get(..16).unwrap_or(fingerprint));
    kv("R² (in-sample)", &format!("{:.4}", metadata.metrics.r2));
    println!();

    println!("  {:<20} {:>14} {:>14} {:>14}", muted("Feature"), muted("min"), muted("mean"), muted("max"));
    println!("  {}", dim(&"─".repeat(64)));
    for summary in &metadata.feature_summaries {
        println!(
            "  {:<20} {:>14.2} {:>14.2} {:>14.2}",
            summary.name, summary.min, summary.mean, summary.max
        );
    }
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HousingError;

    #[test]
    fn test_parse_assignments() {
        let named = parse_assignments(&["age=12".to_string(), " month_sold = 3".to_string()]).unwrap();
        assert_eq!(named["age"], 12.0);
        assert_eq!(named["month_sold"], 3.0);

        assert!(parse_assignments(&["age".to_string()]).is_err());
        assert!(parse_assignments(&["age=old".to_string()]).is_err());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1234567.4), "$1,234,567");
        assert_eq!(format_price(950.0), "$950");
        assert_eq!(format_price(-1000.0), "-$1,000");
        assert!(format_price(f64::NEG_INFINITY).starts_with("-$9,223,372"));
        assert!(format_price(-1e300).starts_with("-$"));
    }

    #[test]
    fn test_bar_width() {
        assert_eq!(bar(0.5, 10).chars().count(), 10);
        assert_eq!(bar(2.0, 4), "████");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "miami-housing", "predict", "--set", "age=10", "--set", "month_sold=2", "--with-defaults",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict { set, with_defaults, input, allow_out_of_range, .. } => {
                assert_eq!(set.len(), 2);
                assert!(with_defaults);
                assert!(input.is_none());
                assert!(!allow_out_of_range);
            }
            _ => panic!("expected predict"),
        }
    }

    fn saved_model(dir: &Path) -> PathBuf {
        use crate::data::TrainingSet;
        use crate::training::{train, ForestConfig};
        use ndarray::{Array1, Array2};

        let x = Array2::from_shape_fn((40, 13), |(i, j)| 100.0 * (j + 1) as f64 + (i % 10) as f64);
        let y: Array1<f64> = x.rows().into_iter().map(|r| 50.0 * r.sum()).collect();
        let set = TrainingSet::new(FeatureSchema::miami(), x, y).unwrap();
        let model = train(&set, ForestConfig::default().with_n_estimators(5).with_random_state(3)).unwrap();

        let path = dir.join("model.bin");
        ModelArtifact::save(&model, &path).unwrap();
        path
    }

    #[test]
    fn test_predict_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = saved_model(dir.path());
        let set = ["LND_SQFOOT=1000000000".to_string(), "age=-500".to_string()];

        let err = cmd_predict(&path, None, &set, true, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HousingError>(),
            Some(HousingError::OutOfRange { .. })
        ));

        assert!(cmd_predict(&path, None, &set, true, true).is_ok());
        assert!(cmd_predict(&path, None, &[], true, false).is_ok());
    }
}
