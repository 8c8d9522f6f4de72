//! Run an online evaluation from a YAML config

use std::path::PathBuf;

use clap::Parser;
use online_detector::observe::{init_logging, LogConfig, LogFormat, LogLevel};
use online_detector::{run_trials, LossType, OptimizerType, ResultsCache, RunConfig};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Run configuration (YAML)
    #[arg(short, long)]
    config: PathBuf,
    /// Independent trials, seeds offset by trial index
    #[arg(short, long, default_value_t = 1)]
    trials: usize,
    /// Recompute even if cached results exist
    #[arg(long)]
    no_cache: bool,
    /// Override the configured optimizer (Adam, RMSprop, SGD)
    #[arg(long)]
    optimizer: Option<OptimizerType>,
    /// Override the configured loss (CrossEntropy, MSE)
    #[arg(long)]
    loss: Option<LossType>,
    /// Override the configured seed
    #[arg(long)]
    seed: Option<u64>,
    #[arg(value_enum, long, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
    #[arg(value_enum, long, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&LogConfig {
        level: args.log_level,
        format: args.log_format,
        thread_names: args.trials > 1,
        ..Default::default()
    });

    let mut config = RunConfig::load_from(&args.config)?;
    if let Some(optimizer) = args.optimizer {
        config.optimizer_type = optimizer;
    }
    if let Some(loss) = args.loss {
        config.loss_type = loss;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let cache = ResultsCache::new(&config.cache_dir);
    let cache = (!args.no_cache).then_some(&cache);

    let reports = run_trials(&config, args.trials, cache)?;
    for (trial, report) in reports.iter().enumerate() {
        println!(
            "{} trial {}: SER {:.6} over {} blocks ({} NaN steps skipped)",
            report.method,
            trial,
            report.total_ser,
            report.ser_by_block.len(),
            report.skipped_steps
        );
    }
    if reports.len() > 1 {
        let mean = reports.iter().map(|r| r.total_ser).sum::<f64>() / reports.len() as f64;
        println!("mean SER over {} trials: {:.6}", reports.len(), mean);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_overrides_parse() {
        let args = Args::try_parse_from([
            "evaluate", "--config", "run.yaml", "--optimizer", "RMSprop", "--loss", "MSE", "--seed", "4",
        ])
        .unwrap();
        assert_eq!(args.optimizer, Some(OptimizerType::RmsProp));
        assert_eq!(args.loss, Some(LossType::Mse));
        assert_eq!(args.seed, Some(4));
        assert_eq!(args.trials, 1);
    }

    #[test]
    fn test_unknown_optimizer_rejected() {
        assert!(Args::try_parse_from(["evaluate", "--config", "run.yaml", "--optimizer", "Adagrad"]).is_err());
    }
}
