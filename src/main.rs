/// Load the clean fight data, derive the trailing averages and write the training data.
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use fight_form::engineering::{EngineeringOptions, FeaturePipeline};
use fight_form::io::{write_csv, FightTable};
use fight_form::stats::TrackedStat;
use tracing_subscriber::EnvFilter;

/// Command line configuration
#[derive(Debug, Parser)]
#[command(name = "fight-form", about = "Append per-fighter trailing averages to the clean fight table")]
struct Cli {
    /// Clean fight data CSV
    #[arg(default_value = "data/clean_ufc_data.csv")]
    input: PathBuf,

    /// Where to write the training data
    #[arg(short, long, default_value = "data/training_data.csv")]
    output: PathBuf,

    /// Adjusted R² below which an imputation model is reported as weak
    #[arg(long, default_value_t = 0.3)]
    min_adj_r2: f64,

    /// Drop rows where either fighter lacks an average
    #[arg(long)]
    drop_incomplete: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Save a PNG of the imputation regressions
    #[cfg(feature = "plot")]
    #[arg(long)]
    plot: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> EngineeringOptions {
        EngineeringOptions {
            min_adjusted_r2: self.min_adj_r2,
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

/// load data, fit the imputation models, apply them and save
/// input: none (command line)
/// output: none (writes the training CSV)
/// logic: load and validate the clean CSV; build timelines and pooled pairs;
/// fit one model per statistic; write every fighter's averages; save
fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let options = cli.options();

    // 1) Load
    let table = FightTable::from_path(&cli.input)?;

    // 2) Fit imputation models
    let pipeline = FeaturePipeline::new(table)?;
    let regressor = pipeline.fit()?;
    let weak = regressor.check_fit(options.min_adjusted_r2);

    println!("\nImputation models:");
    println!("{:<30} {:>6} {:>10} {:>10} {:>8}", "statistic", "n", "intercept", "slope", "adj r2");
    for stat in TrackedStat::ALL {
        let m = regressor.model(stat);
        println!(
            "{:<30} {:>6} {:>10.4} {:>10.4} {:>8.4}",
            stat.name(),
            m.n_obs(),
            m.intercept(),
            m.slope(),
            m.adjusted_r_squared()
        );
    }

    #[cfg(feature = "plot")]
    {
        if let Some(path) = &cli.plot {
            fight_form::plot::plot_regressions(path, pipeline.dataset(), &regressor)?;
            println!("Wrote {}", path.display());
        }
    }

    // 3) Apply and save
    let mut engineered = pipeline.apply(&regressor)?.with_weak_models(weak);
    if cli.drop_incomplete {
        engineered = engineered.drop_incomplete();
    }
    write_csv(&cli.output, &engineered)?;

    let summary = engineered.summary();
    println!(
        "\n{} fighters ({} skipped, {} bootstrapped, {} with 3+ fights), {} averages written",
        summary.fighters, summary.skipped, summary.bootstrapped, summary.normal, summary.writes
    );
    if !summary.weak_models.is_empty() {
        let names: Vec<&str> = summary.weak_models.iter().map(|s| s.name()).collect();
        println!("Weak imputation models: {}", names.join(", "));
    }
    println!("Wrote {} rows to {}", engineered.len(), cli.output.display());

    Ok(())
}

/// the test functions
#[cfg(test)]
mod tests {
    use super::*;

    /// CLI: defaults point at the data directory
    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["fight-form"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("data/clean_ufc_data.csv"));
        assert_eq!(cli.output, PathBuf::from("data/training_data.csv"));
        assert!(!cli.drop_incomplete);
        assert_eq!(cli.options(), EngineeringOptions::default());
    }

    /// CLI: overrides are parsed
    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "fight-form",
            "in.csv",
            "-o",
            "out.csv",
            "--min-adj-r2",
            "0.5",
            "--drop-incomplete",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("in.csv"));
        assert_eq!(cli.output, PathBuf::from("out.csv"));
        assert_eq!(cli.options().min_adjusted_r2, 0.5);
        assert!(cli.drop_incomplete);
    }
}
