//! Multi-view k-NN CLI Module
//!
//! Command-line interface for running multi-view classification and
//! inspecting view datasets.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::*;

use crate::config::MultiViewConfig;
use crate::data::DataLoader;
use crate::multiview::{MultiViewPipeline, MultiViewReport};
use crate::training::DistanceMetric;

/// Title line of the text report
pub const REPORT_TITLE: &str = "Multi-View K-Nearest Neighbors (MVKNN)";

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString    { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "mvknn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-view k-nearest-neighbour ensemble classification")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify every view and fuse the predictions
    Run(RunArgs),

    /// Describe a view dataset
    Info {
        /// Dataset file (ARFF, CSV or TSV)
        #[arg(short, long)]
        data: PathBuf,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Dataset file of one view; repeat in view order
    #[arg(short, long = "view", value_name = "FILE")]
    pub views: Vec<PathBuf>,

    /// JSON config file; command-line flags take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of cross-validation folds
    #[arg(long)]
    pub folds: Option<usize>,

    /// Random seed for folds and vote tie-breaks
    #[arg(long)]
    pub seed: Option<u64>,

    /// Distance metric (euclidean, manhattan, minkowski:<p>)
    #[arg(long)]
    pub metric: Option<DistanceMetric>,

    /// Print the full report as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Also print per-view results
    #[arg(long)]
    pub details: bool,

    /// Write the full JSON report to a file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Merge the config file (if any) with command-line overrides
pub fn resolve_config(args: &RunArgs) -> anyhow::Result<MultiViewConfig> {
    let mut config = match &args.config {
        Some(path) => MultiViewConfig::load(path)?,
        None => MultiViewConfig::default(),
    };

    if !args.views.is_empty() {
        config.views = args.views.clone();
    }
    if let Some(folds) = args.folds {
        config.n_folds = folds;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(metric) = args.metric {
        config.metric = metric;
    }

    config.validate()?;
    Ok(config)
}

// ─── Run ───────────────────────────────────────────────────────────────────────

pub fn cmd_run(args: &RunArgs) -> anyhow::Result<()> {
    let config = resolve_config(args)?;
    let report = MultiViewPipeline::new(config)?.run()?;

    if let Some(path) = &args.output {
        std::fs::write(path, report.to_json()?)?;
    }

    if args.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    print!("{}", render_report(&report));
    if args.details {
        print_details(&report);
    }
    Ok(())
}

/// Two-line text report: title, blank line, accuracy
pub fn render_report(report: &MultiViewReport) -> String {
    format!("{}\n\nAccuracy = {}\n", REPORT_TITLE, report.accuracy)
}

fn print_details(report: &MultiViewReport) {
    section("Views");
    println!(
        "  {:<6} {:<20} {:>4} {:>10} {:>10}",
        muted("View"),
        muted("Name"),
        muted("K"),
        muted("Accuracy"),
        muted("Fold std")
    );
    for view in &report.views {
        println!(
            "  {:<6} {:<20} {:>4} {:>10.2} {:>10.4}",
            view.view, view.name, view.ensemble_size, view.accuracy, view.fold_std
        );
    }

    section("Fusion");
    println!("  {:<12} {}", muted("Instances"), report.n_instances);
    println!("  {:<12} {}", muted("Classes"), report.n_classes);
    println!("  {:<12} {}", muted("Correct"), report.correct);
    println!("  {:<12} {}", muted("Accuracy"), ok(&format!("{:.2}%", report.accuracy)));
    println!("  {:<12} {}", muted("Elapsed"), dim(&format!("{:.2}s", report.elapsed_secs)));
    println!();
}

// ─── Info ──────────────────────────────────────────────────────────────────────

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("View Info");

    let summary = DataLoader::new().summarize(data_path)?;

    println!("  {:<14} {}", muted("File"), data_path.display());
    println!("  {:<14} {}", muted("Instances"), summary.n_instances);
    println!(
        "  {:<14} {} ({} nominal)",
        muted("Features"),
        summary.n_features,
        summary.n_nominal_features
    );
    println!("  {:<14} {}", muted("Class"), summary.class_name);
    println!("  {:<14} {}", muted("Ensemble size"), summary.ensemble_size);
    println!();

    println!("  {:<24} {:>8}", muted("Class value"), muted("Count"));
    println!("  {}", dim(&"─".repeat(34)));
    for (value, count) in &summary.class_counts {
        println!("  {:<24} {:>8}", value, count);
    }

    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(accuracy: f64) -> MultiViewReport {
        MultiViewReport {
            views: Vec::new(),
            n_instances: 4,
            n_classes: 2,
            fused: vec![0, 1, 1, 1],
            actual: vec![0, 1, 0, 1],
            correct: 3,
            accuracy,
            elapsed_secs: 0.0,
        }
    }

    #[test]
    fn test_render_report() {
        assert_eq!(
            render_report(&report(75.0)),
            "Multi-View K-Nearest Neighbors (MVKNN)\n\nAccuracy = 75\n"
        );
        assert!(render_report(&report(87.35)).ends_with("Accuracy = 87.35\n"));
    }

    #[test]
    fn test_cli_parses_views() {
        let cli = Cli::try_parse_from([
            "mvknn", "run", "--view", "phone.arff", "--view", "watch.arff", "--folds", "5",
            "--metric", "manhattan",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.views, vec![PathBuf::from("phone.arff"), PathBuf::from("watch.arff")]);
        assert_eq!(config.n_folds, 5);
        assert_eq!(config.seed, 1);
        assert_eq!(config.metric, DistanceMetric::Manhattan);
    }

    #[test]
    fn test_run_requires_views() {
        assert!(resolve_config(&RunArgs::default()).is_ok());
        assert!(cmd_run(&RunArgs::default()).is_err());
    }

    #[test]
    fn test_bad_metric_rejected() {
        let parsed = Cli::try_parse_from(["mvknn", "run", "--view", "a.arff", "--metric", "cosine"]);
        assert!(parsed.is_err());
    }
}
