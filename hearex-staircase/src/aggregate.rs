//! Cross-run reduction into per-condition thresholds and VGRM contrasts.
//!
//! Per-run thresholds are computed first (each run's own reversal window);
//! a condition's SRT is then the mean of its usable per-run SRTs. Reversals
//! are never pooled across runs before windowing.

use crate::session::{RunSummary, StopReason};
use crate::threshold::{ThresholdEstimate, mean_and_sample_sd};
use hearex_core::MaskerRelation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Cell of the design: subject × device condition × masker relation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConditionKey {
    pub subject: String,
    pub device: String,
    pub masker: MaskerRelation,
}

impl ConditionKey {
    pub fn new(
        subject: impl Into<String>,
        device: impl Into<String>,
        masker: MaskerRelation,
    ) -> Self {
        Self {
            subject: subject.into(),
            device: device.into(),
            masker,
        }
    }

    pub fn with_masker(&self, masker: MaskerRelation) -> Self {
        Self {
            masker,
            ..self.clone()
        }
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.subject, self.device, self.masker)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunThreshold {
    pub run_id: usize,
    pub stop_reason: StopReason,
    pub trials: usize,
    pub threshold: ThresholdEstimate,
    pub percent_correct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub key: ConditionKey,
    /// Mean of usable per-run SRTs. `std_db` is the across-run SD when two or
    /// more runs are usable, otherwise the single run's within-run SD.
    pub threshold: ThresholdEstimate,
    pub runs_total: usize,
    pub runs_used: usize,
    pub run_thresholds: Vec<RunThreshold>,
    #[serde(skip)]
    pub runs: Vec<RunSummary>,
}

/// Voice-gender release from masking for one subject and device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VgrmContrast {
    pub subject: String,
    pub device: String,
    pub same_srt_db: Option<f64>,
    pub different_srt_db: Option<f64>,
    /// SRT(same) - SRT(different); positive means the gender cue helped
    pub vgrm_db: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub conditions: Vec<ConditionSummary>,
    pub vgrm: Vec<VgrmContrast>,
}

impl ExperimentSummary {
    pub fn condition(&self, key: &ConditionKey) -> Option<&ConditionSummary> {
        self.conditions.iter().find(|c| &c.key == key)
    }

    pub fn vgrm_for(&self, subject: &str, device: &str) -> Option<&VgrmContrast> {
        self.vgrm
            .iter()
            .find(|v| v.subject == subject && v.device == device)
    }
}

/// Collects finished runs and reduces them per condition
#[derive(Debug, Clone, Default)]
pub struct MultiRunAggregator {
    runs: BTreeMap<ConditionKey, Vec<RunSummary>>,
}

impl MultiRunAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, run: RunSummary) {
        self.runs.entry(run.condition.clone()).or_default().push(run);
    }

    pub fn run_count(&self) -> usize {
        self.runs.values().map(Vec::len).sum()
    }

    pub fn summarize(&self) -> ExperimentSummary {
        let conditions: Vec<ConditionSummary> = self
            .runs
            .iter()
            .map(|(key, runs)| summarize_condition(key, runs))
            .collect();

        let pairs: BTreeSet<(&str, &str)> = conditions
            .iter()
            .map(|c| (c.key.subject.as_str(), c.key.device.as_str()))
            .collect();

        let contrasts = pairs
            .into_iter()
            .map(|(subject, device)| {
                let srt = |masker| {
                    let key = ConditionKey::new(subject, device, masker);
                    conditions
                        .iter()
                        .find(|c| c.key == key)
                        .and_then(|c| c.threshold.mean_db)
                };
                let same_srt_db = srt(MaskerRelation::SameGender);
                let different_srt_db = srt(MaskerRelation::DifferentGender);
                let vgrm_db = vgrm(same_srt_db, different_srt_db);
                if vgrm_db.is_none() {
                    log::warn!("VGRM undefined for {}/{}: missing SRT", subject, device);
                }
                VgrmContrast {
                    subject: subject.to_string(),
                    device: device.to_string(),
                    same_srt_db,
                    different_srt_db,
                    vgrm_db,
                }
            })
            .collect();

        ExperimentSummary {
            conditions,
            vgrm: contrasts,
        }
    }
}

impl Extend<RunSummary> for MultiRunAggregator {
    fn extend<I: IntoIterator<Item = RunSummary>>(&mut self, iter: I) {
        for run in iter {
            self.add(run);
        }
    }
}

impl FromIterator<RunSummary> for MultiRunAggregator {
    fn from_iter<I: IntoIterator<Item = RunSummary>>(iter: I) -> Self {
        let mut aggregator = Self::new();
        aggregator.extend(iter);
        aggregator
    }
}

/// SRT(same-gender masker) - SRT(different-gender masker)
pub fn vgrm(same_srt_db: Option<f64>, different_srt_db: Option<f64>) -> Option<f64> {
    Some(same_srt_db? - different_srt_db?)
}

/// Averages per-run estimates that have sufficient data
pub fn combine_runs(estimates: &[ThresholdEstimate]) -> ThresholdEstimate {
    let usable: Vec<&ThresholdEstimate> = estimates
        .iter()
        .filter(|e| e.sufficient_data && e.mean_db.is_some())
        .collect();
    match usable.as_slice() {
        [] => ThresholdEstimate::insufficient(),
        [single] => **single,
        many => {
            let means: Vec<f64> = many.iter().filter_map(|e| e.mean_db).collect();
            let (mean, sd) = mean_and_sample_sd(&means);
            ThresholdEstimate {
                mean_db: Some(mean),
                std_db: Some(sd),
                n_reversals_used: many.iter().map(|e| e.n_reversals_used).sum(),
                sufficient_data: true,
            }
        }
    }
}

fn summarize_condition(key: &ConditionKey, runs: &[RunSummary]) -> ConditionSummary {
    let estimates: Vec<ThresholdEstimate> = runs.iter().map(|r| r.threshold).collect();
    let threshold = combine_runs(&estimates);
    ConditionSummary {
        key: key.clone(),
        threshold,
        runs_total: runs.len(),
        runs_used: estimates.iter().filter(|e| e.sufficient_data).count(),
        run_thresholds: runs
            .iter()
            .map(|r| RunThreshold {
                run_id: r.run_id,
                stop_reason: r.stop_reason,
                trials: r.trials.len(),
                threshold: r.threshold,
                percent_correct: r.accuracy.percent_correct,
            })
            .collect(),
        runs: runs.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RunAccuracy;

    fn estimate(mean: f64, sd: f64, n: usize) -> ThresholdEstimate {
        ThresholdEstimate {
            mean_db: Some(mean),
            std_db: Some(sd),
            n_reversals_used: n,
            sufficient_data: true,
        }
    }

    fn run(run_id: usize, key: ConditionKey, threshold: ThresholdEstimate) -> RunSummary {
        RunSummary {
            run_id,
            condition: key,
            trials: Vec::new(),
            reversals: Vec::new(),
            threshold,
            stop_reason: StopReason::Converged,
            divergence_warnings: Vec::new(),
            accuracy: RunAccuracy::from_trials(&[]),
        }
    }

    #[test]
    fn vgrm_is_same_minus_different() {
        assert_eq!(vgrm(Some(-8.0), Some(-11.0)), Some(3.0));
        assert_eq!(vgrm(None, Some(-11.0)), None);
    }

    #[test]
    fn per_run_means_are_averaged() {
        let combined = combine_runs(&[
            estimate(-10.0, 1.0, 10),
            estimate(-12.0, 2.0, 10),
            ThresholdEstimate::insufficient(),
        ]);
        assert_eq!(combined.mean_db, Some(-11.0));
        assert!((combined.std_db.unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(combined.n_reversals_used, 20);
    }

    #[test]
    fn single_usable_run_keeps_its_own_spread() {
        let combined = combine_runs(&[estimate(-9.0, 0.7, 10), ThresholdEstimate::insufficient()]);
        assert_eq!(combined, estimate(-9.0, 0.7, 10));
        assert!(!combine_runs(&[]).sufficient_data);
    }

    #[test]
    fn summary_groups_conditions_and_contrasts() {
        let same = ConditionKey::new("S01", "aided", MaskerRelation::SameGender);
        let diff = same.with_masker(MaskerRelation::DifferentGender);
        let lonely = ConditionKey::new("S01", "unaided", MaskerRelation::SameGender);

        let aggregator: MultiRunAggregator = vec![
            run(1, same.clone(), estimate(-7.0, 1.0, 10)),
            run(2, same.clone(), estimate(-9.0, 1.0, 10)),
            run(3, diff.clone(), estimate(-11.0, 1.0, 10)),
            run(4, lonely.clone(), estimate(-5.0, 1.0, 10)),
        ]
        .into_iter()
        .collect();
        assert_eq!(aggregator.run_count(), 4);

        let summary = aggregator.summarize();
        assert_eq!(summary.conditions.len(), 3);
        let cell = summary.condition(&same).unwrap();
        assert_eq!(cell.threshold.mean_db, Some(-8.0));
        assert_eq!(cell.runs_used, 2);
        assert_eq!(cell.runs.len(), 2);

        let aided = summary.vgrm_for("S01", "aided").unwrap();
        assert_eq!(aided.vgrm_db, Some(3.0));
        let unaided = summary.vgrm_for("S01", "unaided").unwrap();
        assert_eq!(unaided.same_srt_db, Some(-5.0));
        assert_eq!(unaided.vgrm_db, None);
    }

    #[test]
    fn summary_serializes_without_trial_lists() {
        let key = ConditionKey::new("S02", "aided", MaskerRelation::DifferentGender);
        let summary: ExperimentSummary = std::iter::once(run(1, key, estimate(-10.0, 1.0, 10)))
            .collect::<MultiRunAggregator>()
            .summarize();
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["conditions"][0].get("runs").is_none());
        assert_eq!(json["conditions"][0]["key"]["masker"], "different_gender");
        assert_eq!(json["vgrm"][0]["vgrm_db"], serde_json::Value::Null);
    }
}
