//! cml-alo - CML Asset Life Optimisation
//!
//! Command-line front end for remaining-life forecasting, elimination
//! decisions and SME override management.
//!
//! # Usage
//!
//! ```bash
//! # Forecast a single CML
//! cml-alo forecast --id CML-001 --thickness 9.5 --rate 0.12 --last-inspection 2023-06-15
//!
//! # Forecast a batch (JSON array of measurements), skipping bad rows
//! cml-alo forecast --input measurements.json --skip-invalid --summary
//!
//! # Record an SME override
//! cml-alo override put --id CML-042 --decision KEEP \
//!     --reason "high-risk area" --sme-name "Dr. Smith"
//!
//! # Full elimination report from scored measurements
//! cml-alo report --input scored.json
//! ```
//!
//! # Environment Variables
//!
//! - `CML_ALO_CONFIG`: Path to the engine config TOML (default: ./cml_config.toml)
//! - `RUST_LOG`: Logging level (default: info)
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use cml_alo::config::validation::plausibility_warnings;
use cml_alo::config::{EngineConfig, StorageBackend};
use cml_alo::decision::{
    DecisionReconciler, EliminationDecisionEngine, ScoringSummary, StaticProbabilities,
};
use cml_alo::forecast::{
    assess_measurements, summarize_forecasts, BatchPolicy, RemainingLifeForecaster,
};
use cml_alo::report::{join_rows, ReportAggregator};
use cml_alo::storage::{open_store, OverrideStore};
use cml_alo::types::{CmlMeasurement, Recommendation, ScoredMeasurement, SmeOverride};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "cml-alo")]
#[command(about = "CML remaining-life forecasting and inspection elimination decisions")]
#[command(version)]
struct CliArgs {
    /// Engine config TOML (overrides the standard search order)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Override store backend (default: from config)
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    /// Override store location (default: from config)
    #[arg(long, global = true, value_name = "PATH")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Memory,
    Sled,
    JsonFile,
}

impl From<BackendArg> for StorageBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Memory => StorageBackend::Memory,
            BackendArg::Sled => StorageBackend::Sled,
            BackendArg::JsonFile => StorageBackend::JsonFile,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forecast remaining life for one CML or a JSON batch
    Forecast {
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        id: Option<String>,
        /// Current wall thickness (mm)
        #[arg(long, requires = "id")]
        thickness: Option<f64>,
        /// Average corrosion rate (mm/year)
        #[arg(long, requires = "id")]
        rate: Option<f64>,
        /// Last inspection date (YYYY-MM-DD)
        #[arg(long, requires = "id")]
        last_inspection: Option<NaiveDate>,
        /// JSON array of measurements
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Skip invalid rows instead of failing the batch
        #[arg(long, requires = "input")]
        skip_invalid: bool,
        /// Include a fleet summary with the batch output
        #[arg(long, requires = "input")]
        summary: bool,
        /// Reference date used in place of today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Turn an elimination probability into a reconciled decision
    Decide {
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        id: Option<String>,
        #[arg(long, requires = "id")]
        probability: Option<f64>,
        /// JSON array of scored measurements
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Manage SME overrides
    Override {
        #[command(subcommand)]
        action: OverrideAction,
    },

    /// Build the elimination report from scored measurements
    Report {
        /// JSON array of scored measurements
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// Reference date used in place of today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Data quality warnings for a measurement batch
    Quality {
        /// JSON array of measurements
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand, Debug)]
enum OverrideAction {
    /// Record or replace the override for a CML
    Put {
        #[arg(long)]
        id: String,
        /// KEEP or ELIMINATE
        #[arg(long)]
        decision: Recommendation,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        sme_name: String,
        /// Model recommendation at the time of override
        #[arg(long)]
        original_prediction: Option<Recommendation>,
        /// Model probability at the time of override
        #[arg(long, requires = "original_prediction")]
        original_probability: Option<f64>,
    },
    /// Show the override for a CML
    Get {
        #[arg(long)]
        id: String,
    },
    /// Remove the override for a CML
    Delete {
        #[arg(long)]
        id: String,
    },
    /// List every override
    List,
    /// Agreement statistics over all overrides
    Stats,
}

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &CliArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::load(),
    };

    if let Some(backend) = args.backend {
        config.storage.backend = backend.into();
    }
    if let Some(path) = &args.store {
        config.storage.path = path.clone();
    }

    for w in plausibility_warnings(&config) {
        warn!("{}", w);
    }

    Ok(config)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_configured_store(config: &EngineConfig) -> Result<Arc<dyn OverrideStore>> {
    open_store(&config.storage).with_context(|| {
        format!(
            "Failed to open override store at {}",
            config.storage.path.display()
        )
    })
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Serialize)]
struct BatchForecastOutput {
    #[serde(flatten)]
    batch: cml_alo::forecast::BatchForecast,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<cml_alo::forecast::ForecastSummary>,
}

#[allow(clippy::too_many_arguments)]
fn run_forecast(
    config: &EngineConfig,
    id: Option<String>,
    thickness: Option<f64>,
    rate: Option<f64>,
    last_inspection: Option<NaiveDate>,
    input: Option<PathBuf>,
    skip_invalid: bool,
    summary: bool,
    as_of: Option<NaiveDate>,
) -> Result<()> {
    let forecaster = RemainingLifeForecaster::new(config.forecast.clone());
    let today = as_of.unwrap_or_else(|| Utc::now().date_naive());

    if let Some(path) = input {
        let measurements: Vec<CmlMeasurement> = read_json(&path)?;
        let policy = if skip_invalid {
            BatchPolicy::SkipInvalid
        } else {
            BatchPolicy::FailFast
        };
        let batch = forecaster.forecast_batch_as_of(&measurements, policy, today)?;
        let summary =
            summary.then(|| summarize_forecasts(&batch.forecasts, &config.forecast, today));
        return print_json(&BatchForecastOutput { batch, summary });
    }

    let Some(id) = id else {
        bail!("either --id or --input is required");
    };
    let (Some(thickness), Some(rate)) = (thickness, rate) else {
        bail!("--thickness and --rate are required with --id");
    };
    let forecast = forecaster.forecast_as_of(&id, thickness, rate, last_inspection, today)?;
    print_json(&forecast)
}

#[derive(Serialize)]
struct DecideBatchOutput {
    decisions: Vec<cml_alo::ReconciledDecision>,
    summary: ScoringSummary,
}

fn run_decide(
    config: &EngineConfig,
    id: Option<String>,
    probability: Option<f64>,
    input: Option<PathBuf>,
) -> Result<()> {
    let engine = EliminationDecisionEngine::new(config.decision.clone());
    let reconciler = DecisionReconciler::new(open_configured_store(config)?);

    if let Some(path) = input {
        let rows: Vec<ScoredMeasurement> = read_json(&path)?;
        let model = StaticProbabilities::from_scored(path.display().to_string(), &rows);
        let results = engine.decide_batch(
            rows.iter().map(|r| r.measurement.id_number.as_str()),
            &model,
        )?;
        let summary = ScoringSummary::from_results(&results);
        let decisions = reconciler.reconcile_batch(results)?;
        return print_json(&DecideBatchOutput { decisions, summary });
    }

    let Some(id) = id else {
        bail!("either --id or --input is required");
    };
    let Some(probability) = probability else {
        bail!("--probability is required with --id");
    };
    let result = engine.decide(&id, probability)?;
    print_json(&reconciler.reconcile(result)?)
}

fn run_override(config: &EngineConfig, action: OverrideAction) -> Result<()> {
    let store = open_configured_store(config)?;

    match action {
        OverrideAction::Put {
            id,
            decision,
            reason,
            sme_name,
            original_prediction,
            original_probability,
        } => {
            let mut record = SmeOverride::new(id, decision, reason, sme_name);
            if let Some(prediction) = original_prediction {
                record = record.with_original(prediction, original_probability);
            }
            let stored = store.put_override(record)?;
            store.flush()?;
            info!(
                id_number = %stored.id_number,
                decision = %stored.sme_decision,
                backend = store.backend_name(),
                "Override saved"
            );
            print_json(&stored)
        }
        OverrideAction::Get { id } => match store.get_override(&id)? {
            Some(record) => print_json(&record),
            None => bail!("no override recorded for {id}"),
        },
        OverrideAction::Delete { id } => match store.delete_override(&id)? {
            Some(record) => {
                store.flush()?;
                info!(id_number = %id, "Override deleted");
                print_json(&record)
            }
            None => bail!("no override recorded for {id}"),
        },
        OverrideAction::List => print_json(&store.list_overrides()?),
        OverrideAction::Stats => print_json(&store.compute_statistics()?),
    }
}

fn run_report(config: &EngineConfig, input: &Path, as_of: Option<NaiveDate>) -> Result<()> {
    let today = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let rows: Vec<ScoredMeasurement> = read_json(input)?;
    let measurements: Vec<CmlMeasurement> = rows.iter().map(|r| r.measurement.clone()).collect();

    let forecaster = RemainingLifeForecaster::new(config.forecast.clone());
    let batch = forecaster.forecast_batch_as_of(&measurements, BatchPolicy::SkipInvalid, today)?;
    if !batch.rejected.is_empty() {
        warn!(
            rejected = batch.rejected.len(),
            "Some measurements could not be forecast; report rows will lack risk data"
        );
    }

    let engine = EliminationDecisionEngine::new(config.decision.clone());
    let model = StaticProbabilities::from_scored(input.display().to_string(), &rows);
    let results = engine.decide_batch(
        measurements.iter().map(|m| m.id_number.as_str()),
        &model,
    )?;

    let reconciler = DecisionReconciler::new(open_configured_store(config)?);
    let decisions = reconciler.reconcile_batch(results)?;

    let report_rows = join_rows(decisions, &batch.forecasts, &measurements);
    let report = ReportAggregator::new(config.report.clone()).build(&report_rows);
    print_json(&report)
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.json);

    let config = load_config(&args)?;

    match args.command {
        Command::Forecast {
            id,
            thickness,
            rate,
            last_inspection,
            input,
            skip_invalid,
            summary,
            as_of,
        } => run_forecast(
            &config,
            id,
            thickness,
            rate,
            last_inspection,
            input,
            skip_invalid,
            summary,
            as_of,
        ),
        Command::Decide {
            id,
            probability,
            input,
        } => run_decide(&config, id, probability, input),
        Command::Override { action } => run_override(&config, action),
        Command::Report { input, as_of } => run_report(&config, &input, as_of),
        Command::Quality { input } => {
            let measurements: Vec<CmlMeasurement> = read_json(&input)?;
            let quality = assess_measurements(&measurements);
            for w in &quality.warnings {
                warn!(id_number = %w.id_number, "{}", w.message);
            }
            print_json(&quality)
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
