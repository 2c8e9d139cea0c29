use crate::error::Result;
use crate::io;
use crate::paths;
use crate::result::{ComparisonReport, ScenarioResult};
use std::path::{Path, PathBuf};

/// Persist `result` under `dir` as `<scenario>_<stamp>.json`. Returns the
/// path written.
pub fn save_result(dir: &Path, result: &ScenarioResult) -> Result<PathBuf> {
    let stamp = paths::file_stamp(result.generated_at);
    let path = paths::result_path(dir, &result.scenario.name, &stamp);
    io::write_json(&path, result)?;
    tracing::info!(path = %path.display(), "saved scenario result");
    Ok(path)
}

pub fn save_comparison(dir: &Path, report: &ComparisonReport) -> Result<PathBuf> {
    let stamp = paths::file_stamp(report.generated_at);
    let path = paths::comparison_path(dir, &stamp);
    io::write_json(&path, report)?;
    tracing::info!(path = %path.display(), "saved comparison report");
    Ok(path)
}

/// Load every scenario result in `dir`, ordered by file name. Comparison
/// reports are skipped. A missing directory yields an empty list.
pub fn load_results(dir: &Path) -> Result<Vec<ScenarioResult>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && paths::is_result_file(p))
        .collect();
    files.sort();

    files.iter().map(|p| io::read_json(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{Completion, ScenarioAccumulator};
    use crate::scenario;
    use tempfile::TempDir;

    fn result(name: &str) -> ScenarioResult {
        let s = scenario::find(name).unwrap().with_steps(3);
        ScenarioAccumulator::new(s, "greedy").finish(Completion::Completed)
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let a = result("5uav_dense");
        let b = result("2uav_coordination");
        let pa = save_result(dir.path(), &a).unwrap();
        save_result(dir.path(), &b).unwrap();
        save_comparison(dir.path(), &ComparisonReport::new(&[a.clone(), b.clone()])).unwrap();

        assert!(pa
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("5uav_dense_"));

        let loaded = load_results(dir.path()).unwrap();
        let names: Vec<_> = loaded.iter().map(|r| r.scenario.name.as_str()).collect();
        assert_eq!(names, vec!["2uav_coordination", "5uav_dense"]);
        assert_eq!(loaded[1].run_id, a.run_id);
        assert_eq!(loaded[1].summary, a.summary);
    }

    #[test]
    fn missing_dir_loads_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(load_results(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn corrupt_result_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken_20260101_000000.json"), "{not json").unwrap();
        assert!(load_results(dir.path()).is_err());
    }
}
