use crate::output::{print_comparison, print_json};
use anyhow::Context;
use std::path::PathBuf;
use uavsim_core::result::ComparisonReport;
use uavsim_core::store;

pub fn run(
    config_path: Option<&std::path::Path>,
    output: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = super::load_config(config_path)?;
    let dir = output.unwrap_or(cfg.results_dir);

    let results = store::load_results(&dir)
        .with_context(|| format!("failed to load results from {}", dir.display()))?;
    let report = ComparisonReport::new(&results);

    if json {
        return print_json(&report);
    }
    if report.rows.is_empty() {
        println!("No results in {}.", dir.display());
        return Ok(());
    }
    print_comparison(&report.rows);
    Ok(())
}
