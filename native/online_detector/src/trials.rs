//! Independent trials on scoped threads
//!
//! Each trial gets its own config copy (seed offset by the trial index),
//! dataset and detector. Nothing is shared between trials except the
//! read-only base config and cache location.

use std::thread;

use tracing::info;

use crate::cache::ResultsCache;
use crate::config::RunConfig;
use crate::error::{DetectError, DetectResult};
use crate::trainer::{EvaluationReport, Trainer};

/// Run `trials` evaluations of `config` in parallel, reports in trial order
pub fn run_trials(
    config: &RunConfig,
    trials: usize,
    cache: Option<&ResultsCache>,
) -> DetectResult<Vec<EvaluationReport>> {
    config.validate()?;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..trials)
            .map(|trial| {
                let trial_config = config.for_trial(trial);
                thread::Builder::new()
                    .name(format!("trial-{}", trial))
                    .spawn_scoped(scope, move || run_one(&trial_config, trial, cache))
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(trial, handle)| match handle {
                Ok(h) => h.join().unwrap_or(Err(DetectError::TrialPanicked(trial))),
                Err(e) => Err(DetectError::Io(e)),
            })
            .collect()
    })
}

fn run_one(config: &RunConfig, trial: usize, cache: Option<&ResultsCache>) -> DetectResult<EvaluationReport> {
    let evaluate = || Trainer::new(config)?.run();
    let report = match cache {
        Some(cache) => cache.load_or_run(&config.method_name(), config.channel_type, Some(trial), evaluate)?,
        None => evaluate()?,
    };
    info!(trial, seed = config.seed, total_ser = report.total_ser, "trial finished");
    Ok(report)
}
