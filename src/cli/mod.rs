//! Menu forecast CLI
//!
//! Command-line interface for training, prediction and serving.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::export::{ArtifactStore, FsArtifactStore};
use crate::features::{parse_date, weekday_name, FeatureRecord};
use crate::inference::{PredictionResponse, Predictor};
use crate::training::{Trainer, TrainerConfig};
use crate::utils::UploadStore;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

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

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "menu-forecast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Per-menu-item serving demand forecasts")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the model for one menu item from a sales history CSV
    Train {
        /// Restaurant identifier
        #[arg(short, long)]
        restaurant: String,

        /// Menu item name
        #[arg(short, long)]
        item: String,

        /// Sales history CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Artifact root directory
        #[arg(long, env = "MODELS_DIR", default_value = "./models")]
        storage: PathBuf,

        /// Where a copy of the upload is kept for trailing averages
        #[arg(long, env = "UPLOADS_DIR", default_value = "./uploads")]
        uploads: PathBuf,

        /// Number of trees
        #[arg(long, default_value_t = 200)]
        trees: usize,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Predict servings for one menu item
    Predict {
        #[arg(short, long)]
        restaurant: String,

        #[arg(short, long)]
        item: String,

        /// Meal period, e.g. lunch
        #[arg(long)]
        meal_period: String,

        /// Weather, e.g. sunny
        #[arg(long)]
        weather: String,

        /// Weekday name, e.g. Monday
        #[arg(long, conflicts_with = "date", required_unless_present = "date")]
        day_of_week: Option<String>,

        /// Calendar date (YYYY-MM-DD); the weekday is derived from it
        #[arg(long)]
        date: Option<String>,

        /// The day is a holiday
        #[arg(long)]
        holiday: bool,

        #[arg(long, default_value_t = crate::features::DEFAULT_TEMPERATURE)]
        temperature: f64,

        /// Trailing 30-row average; computed from the stored upload when omitted
        #[arg(long)]
        avg: Option<f64>,

        #[arg(long, env = "MODELS_DIR", default_value = "./models")]
        storage: PathBuf,

        #[arg(long, env = "UPLOADS_DIR", default_value = "./uploads")]
        uploads: PathBuf,

        /// Print the raw JSON response instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List trained menu items of a restaurant
    List {
        #[arg(short, long)]
        restaurant: String,

        #[arg(long, env = "MODELS_DIR", default_value = "./models")]
        storage: PathBuf,
    },

    /// Start the HTTP server
    Serve {
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, env = "API_PORT", default_value_t = 8080)]
        port: u16,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    restaurant: &str,
    item: &str,
    data_path: &Path,
    storage: &Path,
    uploads: &Path,
    trees: usize,
    seed: u64,
) -> anyhow::Result<()> {
    section("Train");

    let store = FsArtifactStore::new(storage);
    let handle = store.locate(restaurant, item)?;

    step_run("Reading sales history");
    let bytes = std::fs::read(data_path)?;
    step_done(&format!("{} bytes", bytes.len()));

    UploadStore::new(uploads).save(restaurant, item, &bytes)?;

    step_run(&format!("Fitting {} trees", trees.to_string().cyan()));
    let start = Instant::now();
    let trainer = Trainer::new(
        TrainerConfig::default()
            .with_n_estimators(trees)
            .with_random_state(seed),
    );
    let report = trainer.train_csv_bytes(&store, &handle, &bytes)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    println!();
    kv("Menu item", &report.metadata.menu_item);
    kv("Rows", &report.metadata.rows_used.to_string());
    kv("Train MAE", &format!("{:.3}", report.train_mae));
    kv("Train R²", &format!("{:.4}", report.train_r2));
    kv("Artifact", &handle.location.display().to_string());

    if !report.feature_importances.is_empty() {
        println!();
        println!("  {}", muted("Feature importances"));
        for fi in &report.feature_importances {
            println!("    {:<20} {:.4}", fi.feature, fi.importance);
        }
    }
    println!();

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_predict(
    restaurant: &str,
    item: &str,
    meal_period: &str,
    weather: &str,
    day_of_week: Option<&str>,
    date: Option<&str>,
    holiday: bool,
    temperature: f64,
    avg: Option<f64>,
    storage: &Path,
    uploads: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let day_of_week = match (date, day_of_week) {
        (Some(date), _) => weekday_name(parse_date(date)?),
        (None, Some(day)) => day.to_string(),
        (None, None) => anyhow::bail!("either --date or --day-of-week is required"),
    };

    let avg = match avg {
        Some(avg) => avg,
        None => UploadStore::new(uploads).trailing_average(restaurant, item)?,
    };

    let record = FeatureRecord {
        day_of_week,
        meal_period: meal_period.to_string(),
        is_holiday: u8::from(holiday),
        weather: weather.to_string(),
        temperature,
        sales_last_30d_avg: avg,
    };

    let predictor = Predictor::new(Arc::new(FsArtifactStore::new(storage)));
    let result = predictor.predict(restaurant, item, &record);

    if json {
        let failed = result.is_err();
        println!("{}", serde_json::to_string(&PredictionResponse::from(result))?);
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    let prediction = result?;
    section("Predict");
    kv("Menu item", &prediction.menu_item);
    kv("Day", &record.day_of_week);
    kv("Trailing average", &format!("{:.2}", record.sales_last_30d_avg));
    println!(
        "  {:<18} {}",
        muted("Demand"),
        prediction.demand.to_string().white().bold()
    );
    kv("Id", &prediction.id);
    println!();

    Ok(())
}

pub fn cmd_list(restaurant: &str, storage: &Path) -> anyhow::Result<()> {
    let store = FsArtifactStore::new(storage);
    let items = store.list_trained(restaurant)?;

    section(&format!("Trained items · {}", restaurant));
    if items.is_empty() {
        println!("  {}", dim("none"));
    }
    for item in &items {
        let handle = store.locate(restaurant, item)?;
        match store.metadata(&handle) {
            Ok(meta) => println!(
                "  {} {:<24} {}",
                ok("●"),
                item,
                dim(&format!("{} rows · {}", meta.rows_used, meta.trained_at.to_rfc3339()))
            ),
            Err(_) => println!("  {} {}", ok("●"), item),
        }
    }
    println!();

    Ok(())
}

pub async fn cmd_serve(host: &str, port: u16) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    section("Menu forecast server");
    kv("API", &format!("http://{}:{}/api", host, port));
    kv("Health", &format!("http://{}:{}/api/health", host, port));
    println!("  {}", dim("ctrl+c to stop"));
    println!();

    let config = ServerConfig {
        host: host.to_string(),
        port,
        ..Default::default()
    };

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_predict_requires_day_or_date() {
        let parsed = Cli::try_parse_from([
            "menu-forecast", "predict", "-r", "r1", "-i", "Idli",
            "--meal-period", "lunch", "--weather", "sunny",
        ]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "menu-forecast", "predict", "-r", "r1", "-i", "Idli",
            "--meal-period", "lunch", "--weather", "sunny", "--date", "2024-03-18",
        ]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_predict_rejects_non_finite_numbers() {
        let dir = tempfile::TempDir::new().unwrap();
        let models = dir.path().join("models");
        let uploads = dir.path().join("uploads");

        let parsed = Cli::try_parse_from([
            "menu-forecast", "predict", "-r", "r1", "-i", "Idli", "--meal-period", "lunch",
            "--weather", "sunny", "--day-of-week", "Monday", "--temperature", "NaN",
        ]);
        assert!(parsed.is_ok());

        let err = cmd_predict(
            "r1", "Idli", "lunch", "sunny", Some("Monday"), None, false,
            f64::NAN, Some(40.0), &models, &uploads, false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("temperature"), "{}", err);

        let err = cmd_predict(
            "r1", "Idli", "lunch", "sunny", Some("Monday"), None, false,
            21.0, Some(f64::INFINITY), &models, &uploads, false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sales_last_30d_avg"), "{}", err);
        assert!(!models.exists());
    }
}
