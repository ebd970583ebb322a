//! Persisted trial log (JSON Lines) and its offline reduction.
//!
//! One row per trial. Reading the log back and calling [`runs_from_log`]
//! rebuilds the reversal history of every run, so thresholds computed
//! offline match the ones computed while the runs were live.

use crate::aggregate::ConditionKey;
use crate::config::{StaircaseConfig, ThresholdConfig};
use crate::error::StaircaseError;
use crate::session::{RunAccuracy, RunSummary, StopReason};
use crate::threshold::ThresholdEstimator;
use hearex_core::{MaskerRelation, TrialRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialLogRow {
    pub run_id: usize,
    pub subject: String,
    pub device: String,
    pub masker: MaskerRelation,
    pub trial_index: usize,
    pub snr_db: f64,
    pub target_level_db: f64,
    pub masker_level_db: f64,
    pub step_size_db: f64,
    pub is_correct: bool,
    pub is_reversal: bool,
    pub reaction_time_s: f64,
}

impl TrialLogRow {
    pub fn from_record(run_id: usize, condition: &ConditionKey, record: &TrialRecord) -> Self {
        Self {
            run_id,
            subject: condition.subject.clone(),
            device: condition.device.clone(),
            masker: condition.masker,
            trial_index: record.trial_index,
            snr_db: record.snr_db,
            target_level_db: record.target_level_db,
            masker_level_db: record.masker_level_db,
            step_size_db: record.step_size_db,
            is_correct: record.is_correct,
            is_reversal: record.is_reversal,
            reaction_time_s: record.reaction_time_s,
        }
    }

    pub fn condition(&self) -> ConditionKey {
        ConditionKey::new(self.subject.clone(), self.device.clone(), self.masker)
    }

    pub fn record(&self) -> TrialRecord {
        TrialRecord {
            trial_index: self.trial_index,
            snr_db: self.snr_db,
            target_level_db: self.target_level_db,
            masker_level_db: self.masker_level_db,
            step_size_db: self.step_size_db,
            is_correct: self.is_correct,
            is_reversal: self.is_reversal,
            reaction_time_s: self.reaction_time_s,
        }
    }
}

/// Writes trial rows as JSON Lines
pub struct TrialLogWriter<W: Write> {
    inner: W,
    rows: usize,
}

impl<W: Write> TrialLogWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, rows: 0 }
    }

    pub fn write_row(&mut self, row: &TrialLogRow) -> io::Result<()> {
        serde_json::to_writer(&mut self.inner, row)?;
        self.inner.write_all(b"\n")?;
        self.rows += 1;
        Ok(())
    }

    pub fn write_run(&mut self, run: &RunSummary) -> io::Result<()> {
        for record in &run.trials {
            self.write_row(&TrialLogRow::from_record(run.run_id, &run.condition, record))?;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Parses a JSON Lines trial log; blank lines are skipped
pub fn read_trial_log<R: BufRead>(reader: R) -> Result<Vec<TrialLogRow>, StaircaseError> {
    let mut rows = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|err| StaircaseError::TrialLog {
            line: line_no,
            reason: err.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(&line).map_err(|err| StaircaseError::TrialLog {
            line: line_no,
            reason: err.to_string(),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Regroups logged rows into per-run summaries.
///
/// The stop reason is inferred from `config`: converged when the run holds
/// `target_reversals` reversals, capped when it reached `safety_cap` trials,
/// abandoned otherwise. Divergence warnings are not persisted and come back
/// empty.
pub fn runs_from_log(
    rows: &[TrialLogRow],
    config: &StaircaseConfig,
    threshold: &ThresholdConfig,
) -> Vec<RunSummary> {
    let estimator = ThresholdEstimator::new(threshold.clone());
    let mut grouped: BTreeMap<(ConditionKey, usize), Vec<&TrialLogRow>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry((row.condition(), row.run_id))
            .or_default()
            .push(row);
    }

    grouped
        .into_iter()
        .map(|((condition, run_id), mut run_rows)| {
            run_rows.sort_by_key(|r| r.trial_index);
            let trials: Vec<TrialRecord> = run_rows.iter().map(|r| r.record()).collect();
            let reversals: Vec<f64> = trials
                .iter()
                .filter(|t| t.is_reversal)
                .map(|t| t.snr_db)
                .collect();
            let stop_reason = if reversals.len() >= config.target_reversals {
                StopReason::Converged
            } else if trials.len() >= config.safety_cap {
                StopReason::SafetyCap
            } else {
                StopReason::Abandoned
            };
            RunSummary {
                run_id,
                condition,
                threshold: estimator.estimate(&reversals),
                accuracy: RunAccuracy::from_trials(&trials),
                trials,
                reversals,
                stop_reason,
                divergence_warnings: Vec::new(),
            }
        })
        .collect()
}
