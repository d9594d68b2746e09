//! Output files under the configured `output_dir`
//!
//! Layout: `{stem}.rows.json` (sheet), `{stem}.rows.jsonl` (one row per line),
//! `{stem}.testcases.json`, and `batch_{timestamp}.json` for batch runs.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde_json::Value;

use spectraffic_core::TestCases;
use spectraffic_core::sheet::write_rows_jsonl;
use spectraffic_synth::RowsOutput;

/// File stem used for every output of `spec`.
pub fn stem(spec: &Path) -> String {
    spec.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("spec")
        .to_string()
}

/// Output stems for a batch, distinct across `specs`.
///
/// A stem shared by several inputs falls back to the file name
/// (`a.json`, `a.yaml`). Names still shared get `-2`, `-3` in input order.
pub fn unique_stems(specs: &[PathBuf]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for spec in specs {
        *counts.entry(stem(spec)).or_default() += 1;
    }

    let mut taken = HashSet::new();
    specs
        .iter()
        .map(|spec| {
            let base = stem(spec);
            let base = if counts.get(&base).copied().unwrap_or(0) > 1 {
                spec.file_name()
                    .and_then(|s| s.to_str())
                    .map_or(base, str::to_string)
            } else {
                base
            };
            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{base}-{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Write the sheet and row stream of one specification.
///
/// Returns the sheet path.
pub fn save_rows(dir: &Path, stem: &str, rows: &RowsOutput) -> Result<PathBuf> {
    let sheet_path = dir.join(format!("{stem}.rows.json"));
    rows.sheet.write(&sheet_path)?;
    write_rows_jsonl(&rows.groups, &dir.join(format!("{stem}.rows.jsonl")))?;
    Ok(sheet_path)
}

/// Write assembled test cases as pretty JSON.
pub fn save_test_cases(dir: &Path, stem: &str, cases: &TestCases) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("{stem}.testcases.json"));
    std::fs::write(&path, serde_json::to_string_pretty(cases)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Outcome of one document in a batch.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub spec: PathBuf,
    pub result: std::result::Result<BatchSuccess, String>,
    pub duration_secs: f64,
}

#[derive(Debug, Clone)]
pub struct BatchSuccess {
    pub rows: usize,
    pub test_cases: usize,
    pub warnings: usize,
    pub unresolved: usize,
}

/// Save the execution report of a batch run.
///
/// Returns the report path.
pub fn save_report(dir: &Path, seed: u64, entries: &[BatchEntry]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!("batch_{}.json", timestamp_compact()));
    let report = report_json(seed, entries);
    std::fs::write(&path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn report_json(seed: u64, entries: &[BatchEntry]) -> Value {
    let failed = entries.iter().filter(|e| e.result.is_err()).count();
    let documents: Vec<Value> = entries
        .iter()
        .map(|entry| {
            let spec = entry.spec.display().to_string();
            match &entry.result {
                Ok(ok) => serde_json::json!({
                    "spec": spec,
                    "status": "ok",
                    "rows": ok.rows,
                    "test_cases": ok.test_cases,
                    "warnings": ok.warnings,
                    "unresolved": ok.unresolved,
                    "duration_secs": entry.duration_secs,
                }),
                Err(error) => serde_json::json!({
                    "spec": spec,
                    "status": "failed",
                    "error": error,
                    "duration_secs": entry.duration_secs,
                }),
            }
        })
        .collect();

    serde_json::json!({
        "meta": {
            "timestamp": timestamp_iso(),
            "seed": seed,
        },
        "stats": {
            "total": entries.len(),
            "ok": entries.len() - failed,
            "failed": failed,
        },
        "documents": documents,
    })
}

/// `"20260205T193000"`
fn timestamp_compact() -> String {
    let (y, mo, d, h, mi, s) = utc_now();
    format!("{y:04}{mo:02}{d:02}T{h:02}{mi:02}{s:02}")
}

/// `"2026-02-05T19:30:00Z"`
fn timestamp_iso() -> String {
    let (y, mo, d, h, mi, s) = utc_now();
    format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}Z")
}

fn utc_now() -> (i32, u32, u32, u32, u32, u32) {
    let epoch_secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let days = (epoch_secs / 86400) as i64;
    let tod = epoch_secs % 86400;
    let (y, m, d) = civil_from_days(days);
    (
        y,
        m,
        d,
        (tod / 3600) as u32,
        ((tod % 3600) / 60) as u32,
        (tod % 60) as u32,
    )
}

/// Epoch days → (year, month, day), proleptic Gregorian.
fn civil_from_days(days: i64) -> (i32, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = (z - era * 146_097) as u32;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y as i32, m, d)
}
