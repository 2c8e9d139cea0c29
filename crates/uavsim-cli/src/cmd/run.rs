use crate::output::{print_comparison, print_json};
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uavsim_core::config::{HarnessConfig, StrategyKind, WarnLevel};
use uavsim_core::result::{ComparisonReport, ScenarioResult};
use uavsim_core::scenario::{self, CATALOGUE_NAMES};
use uavsim_core::trajectory::BaseTrajectory;
use uavsim_core::{store, SimError};
use uavsim_engine::{abort_pair, Orchestrator, TrajectorySource};
use xapp_client::{build_service, XappClient};

#[derive(Args)]
pub struct RunArgs {
    /// Scenario to run; repeat for several (default: the whole catalogue)
    #[arg(long = "scenario", value_name = "NAME")]
    scenarios: Vec<String>,

    /// Decision service: xapp, rule-based, greedy, conservative, random
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// xApp base URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Results directory
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Maximum decision calls in flight
    #[arg(long)]
    workers: Option<usize>,

    /// Per-attempt timeout for one xApp call
    #[arg(long, value_name = "MS")]
    call_timeout_ms: Option<u64>,

    /// Deadline for collecting every decision of one step
    #[arg(long, value_name = "MS")]
    step_timeout_ms: Option<u64>,

    /// Retries after a failed xApp call
    #[arg(long)]
    retries: Option<u32>,

    /// Seed for synthetic trajectories and the random strategy
    #[arg(long)]
    seed: Option<u64>,

    /// Recorded base trajectory (JSON) instead of a synthetic one
    #[arg(long, value_name = "FILE")]
    trajectory: Option<PathBuf>,

    /// Override every scenario's step count
    #[arg(long)]
    steps: Option<usize>,

    /// Print results without writing them to disk
    #[arg(long)]
    no_save: bool,
}

impl RunArgs {
    /// Command-line flags win over the config file.
    fn apply(&self, cfg: &mut HarnessConfig) {
        if let Some(s) = self.strategy {
            cfg.strategy = s;
        }
        if let Some(url) = &self.endpoint {
            cfg.endpoint.url = url.clone();
        }
        if let Some(dir) = &self.output {
            cfg.results_dir = dir.clone();
        }
        if let Some(w) = self.workers {
            cfg.runner.workers = w;
        }
        if let Some(ms) = self.call_timeout_ms {
            cfg.endpoint.timeout_ms = ms;
        }
        if let Some(ms) = self.step_timeout_ms {
            cfg.runner.step_timeout_ms = ms;
        }
        if let Some(r) = self.retries {
            cfg.endpoint.max_retries = r;
        }
        if let Some(seed) = self.seed {
            cfg.seed = seed;
        }
    }

    fn scenario_names(&self) -> Vec<String> {
        if self.scenarios.is_empty() {
            CATALOGUE_NAMES.iter().map(|s| s.to_string()).collect()
        } else {
            self.scenarios.clone()
        }
    }
}

pub fn run(config_path: Option<&Path>, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let mut cfg = super::load_config(config_path)?;
    args.apply(&mut cfg);

    let warnings = cfg.validate();
    for w in &warnings {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => eprintln!("[error] {}", w.message),
        }
    }
    if HarnessConfig::has_errors(&warnings) {
        anyhow::bail!("configuration has errors; run `uavsim config validate` for details");
    }

    let names = args.scenario_names();
    for name in &names {
        scenario::find(name)?;
    }
    if let Some(n) = args.steps {
        if n == 0 {
            anyhow::bail!("--steps must be at least 1");
        }
    }

    let source = match &args.trajectory {
        Some(path) => TrajectorySource::Recorded(
            BaseTrajectory::load(path)
                .with_context(|| format!("failed to load trajectory from {}", path.display()))?,
        ),
        None => TrajectorySource::Synthetic { seed: cfg.seed },
    };

    let service = build_service(cfg.strategy, &cfg.endpoint, cfg.seed)?;

    let rt = tokio::runtime::Runtime::new()?;
    let results = rt.block_on(async {
        if cfg.strategy.is_remote() {
            let checker = XappClient::new((&cfg.endpoint).into())?;
            if !checker.health().await {
                tracing::warn!(
                    endpoint = %cfg.endpoint.url,
                    "xApp health check failed; decisions will be recorded as unavailable"
                );
            }
        }

        let (handle, signal) = abort_pair();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; stopping after the current step");
                handle.abort();
            }
        });

        let orchestrator = Orchestrator::from_config(Arc::clone(&service), &cfg).with_abort(signal);
        let results = orchestrator.run_catalogue(&names, &source, args.steps).await;
        anyhow::Ok(results)
    })?;

    if results.is_empty() {
        anyhow::bail!("no scenario produced a result");
    }

    let report = ComparisonReport::new(&results);
    let mut saved = Vec::new();
    if !args.no_save {
        for result in &results {
            saved.push(store::save_result(&cfg.results_dir, result)?);
        }
        saved.push(store::save_comparison(&cfg.results_dir, &report)?);
    }

    if json {
        print_json(&serde_json::json!({
            "strategy": cfg.strategy,
            "comparison": report,
            "summaries": results
                .iter()
                .map(|r| serde_json::json!({
                    "scenario": r.scenario.name,
                    "completion": r.completion,
                    "summary": r.summary,
                }))
                .collect::<Vec<_>>(),
            "saved": saved,
        }))?;
    } else {
        print_comparison(&report.rows);
        for path in &saved {
            println!("saved {}", path.display());
        }
    }

    match results.iter().find(|r| !r.is_complete()) {
        Some(aborted) => Err(aborted_error(aborted).into()),
        None => Ok(()),
    }
}

fn aborted_error(result: &ScenarioResult) -> SimError {
    SimError::ScenarioAborted {
        scenario: result.scenario.name.clone(),
        completed_steps: result.steps.len(),
    }
}
