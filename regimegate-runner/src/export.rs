//! Artifact export: CSV summaries and the full JSON result.
//!
//! A run directory holds:
//! - `summary.csv`: `metric,baseline,agent` rows
//! - `per_regime.csv`: one row per regime segment
//! - `result.json`: the full `PipelineResult`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::optimizer::SearchOutcome;
use crate::pipeline::PipelineResult;
use crate::single::ValidatorRunResult;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `PipelineResult` to pretty JSON.
pub fn export_json(result: &PipelineResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize PipelineResult to JSON")
}

/// Deserialize a `PipelineResult` from JSON.
pub fn import_json(json: &str) -> Result<PipelineResult> {
    serde_json::from_str(json).context("failed to deserialize PipelineResult from JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Baseline vs aggregate, one metric per row.
///
/// The baseline column of `adaptive_switch_count` is always 0.
pub fn export_summary_csv(result: &PipelineResult) -> Result<String> {
    let b = &result.baseline;
    let a = &result.aggregate;
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["metric", "baseline", "agent"])?;
    let rows = [
        ("total_pnl", b.total_pnl.to_string(), a.total_pnl.to_string()),
        ("trades", b.trade_count.to_string(), a.trade_count.to_string()),
        (
            "fsr",
            b.false_signal_rate.to_string(),
            a.false_signal_rate.to_string(),
        ),
        ("sharpe_like", b.sharpe_like.to_string(), a.sharpe_like.to_string()),
        (
            "dd_recovery_ticks",
            b.drawdown_recovery_ticks.to_string(),
            a.drawdown_recovery_ticks.to_string(),
        ),
        (
            "adaptive_switch_count",
            "0".to_string(),
            a.adaptive_switch_count.to_string(),
        ),
    ];
    for (metric, baseline, agent) in &rows {
        wtr.write_record([*metric, baseline.as_str(), agent.as_str()])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Per-segment metrics in segment order.
///
/// Columns: regime, start, end, validator, total_pnl, trades, fsr,
/// sharpe_like, dd_recovery_ticks
pub fn export_per_regime_csv(result: &PipelineResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "regime",
        "start",
        "end",
        "validator",
        "total_pnl",
        "trades",
        "fsr",
        "sharpe_like",
        "dd_recovery_ticks",
    ])?;
    for run in &result.per_regime {
        let r = &run.result;
        let record = [
            run.segment.regime.clone(),
            run.segment.start.to_string(),
            run.segment.end.to_string(),
            run.decision.validator.clone(),
            r.total_pnl.to_string(),
            r.trade_count.to_string(),
            r.false_signal_rate.to_string(),
            r.sharpe_like.to_string(),
            r.drawdown_recovery_ticks.to_string(),
        ];
        wtr.write_record(&record)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `summary.csv`, `per_regime.csv` and `result.json` into
/// `output_dir`, creating it if needed. Returns the directory.
pub fn save_artifacts(result: &PipelineResult, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create artifact dir: {}", output_dir.display()))?;

    let summary = export_summary_csv(result)?;
    write(&output_dir.join("summary.csv"), &summary)?;

    let per_regime = export_per_regime_csv(result)?;
    write(&output_dir.join("per_regime.csv"), &per_regime)?;

    let json = export_json(result)?;
    write(&output_dir.join("result.json"), &json)?;

    Ok(output_dir.to_path_buf())
}

/// Load a `PipelineResult` from an artifact directory's result.json.
pub fn load_artifacts(dir: &Path) -> Result<PipelineResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Write an optimizer outcome as pretty JSON.
pub fn save_search_outcome(outcome: &SearchOutcome, path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(outcome).context("failed to serialize search outcome")?;
    write_creating_parent(path, &json)
}

/// Write a single-validator result as pretty JSON.
pub fn save_validator_run(run: &ValidatorRunResult, path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(run).context("failed to serialize validator run")?;
    write_creating_parent(path, &json)
}

fn write_creating_parent(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    write(path, contents)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
