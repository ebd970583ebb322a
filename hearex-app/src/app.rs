use crate::config::ExperimentConfig;
use anyhow::{Context, Result, anyhow};
use hearex_core::MaskerRelation;
use hearex_sim::SimulatedListener;
use hearex_staircase::{
    ConditionKey, ExperimentSummary, LogSink, MultiRunAggregator, RunSession, RunSummary,
    TrialLogWriter, read_trial_log, runs_from_log,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;

pub const TRIAL_LOG_FILE: &str = "trials.jsonl";
pub const SUMMARY_FILE: &str = "summary.json";

/// Finished simulation: every run plus the reduced summary
pub struct Simulation {
    pub runs: Vec<RunSummary>,
    pub summary: ExperimentSummary,
}

pub struct App {
    config: ExperimentConfig,
}

impl App {
    pub fn new(config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// (run id, condition) for every device × masker × repeat, in presentation order
    pub fn plan(&self) -> Vec<(usize, ConditionKey)> {
        let mut plan = Vec::new();
        for device in &self.config.devices {
            for repeat in 0..self.config.runs_per_condition {
                for masker in MaskerRelation::ALL {
                    let key =
                        ConditionKey::new(self.config.subject.clone(), device.clone(), masker);
                    tracing::trace!("planned {} repeat {}", key, repeat);
                    plan.push((plan.len() + 1, key));
                }
            }
        }
        plan
    }

    fn run_seed(&self, run_id: usize) -> u64 {
        self.config
            .seed
            .wrapping_add((run_id as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    fn run_one(&self, run_id: usize, condition: ConditionKey) -> Result<RunSummary> {
        let listener = SimulatedListener::new(
            &self.config.listener,
            condition.masker,
            StdRng::seed_from_u64(self.run_seed(run_id)),
        );
        let session = RunSession::new(
            run_id,
            condition,
            self.config.staircase.clone(),
            self.config.threshold.clone(),
            listener,
        )?
        .with_sink(LogSink);
        Ok(session.run().unwrap_or_else(|never| match never {}))
    }

    /// Runs every planned run; independent runs share the available cores
    pub fn simulate(&self) -> Result<Simulation> {
        let width = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        self.simulate_in_batches(width)
    }

    /// At most `width` runs execute concurrently, each on its own scoped thread
    fn simulate_in_batches(&self, width: usize) -> Result<Simulation> {
        let plan = self.plan();
        tracing::info!(
            "simulating {} runs for subject {} (seed {}, {} at a time)",
            plan.len(),
            self.config.subject,
            self.config.seed,
            width
        );

        let mut runs = Vec::with_capacity(plan.len());
        for batch in plan.chunks(width.max(1)) {
            let finished = thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .cloned()
                    .map(|(run_id, key)| scope.spawn(move || self.run_one(run_id, key)))
                    .collect();
                handles
                    .into_iter()
                    .map(|handle| {
                        handle
                            .join()
                            .map_err(|_| anyhow!("simulation thread panicked"))?
                    })
                    .collect::<Result<Vec<_>>>()
            })?;
            runs.extend(finished);
        }
        runs.sort_by_key(|r| r.run_id);

        let summary = runs.iter().cloned().collect::<MultiRunAggregator>().summarize();
        Ok(Simulation { runs, summary })
    }

    pub fn write_outputs(&self, out_dir: &Path, simulation: &Simulation) -> Result<()> {
        fs::create_dir_all(out_dir)?;

        let log_path = out_dir.join(TRIAL_LOG_FILE);
        let mut writer = TrialLogWriter::new(BufWriter::new(File::create(&log_path)?));
        for run in &simulation.runs {
            writer.write_run(run)?;
        }
        let rows = writer.rows_written();
        writer.into_inner()?;
        tracing::info!("wrote {} trial rows to {}", rows, log_path.display());

        write_summary(&out_dir.join(SUMMARY_FILE), &simulation.summary)
    }

    /// Offline pipeline: rebuild runs from a trial log and reduce them
    pub fn analyze(&self, log_path: &Path) -> Result<ExperimentSummary> {
        let file = File::open(log_path).with_context(|| format!("opening {}", log_path.display()))?;
        let rows = read_trial_log(BufReader::new(file))?;
        let runs = runs_from_log(&rows, &self.config.staircase, &self.config.threshold);
        tracing::info!(
            "rebuilt {} runs from {} rows in {}",
            runs.len(),
            rows.len(),
            log_path.display()
        );
        Ok(runs.into_iter().collect::<MultiRunAggregator>().summarize())
    }
}

pub fn write_summary(path: &Path, summary: &ExperimentSummary) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_summary_to(BufWriter::new(file), summary)
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!("summary saved to {}", path.display());
    Ok(())
}

/// Pretty JSON followed by an explicit flush, so a failed final write is reported
pub fn write_summary_to<W: Write>(mut writer: W, summary: &ExperimentSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.flush()?;
    Ok(())
}

fn fmt_db(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

pub fn print_summary(summary: &ExperimentSummary) {
    println!("Condition thresholds (SRT = mean reversal SNR, dB):");
    for cell in &summary.conditions {
        println!(
            "  {:<32} SRT {:>7}  SD {:>6}  runs {}/{}  reversals {}",
            cell.key.to_string(),
            fmt_db(cell.threshold.mean_db),
            fmt_db(cell.threshold.std_db),
            cell.runs_used,
            cell.runs_total,
            cell.threshold.n_reversals_used
        );
    }
    println!("VGRM (same - different):");
    for contrast in &summary.vgrm {
        println!(
            "  {}/{:<24} {:>7} dB",
            contrast.subject,
            contrast.device,
            fmt_db(contrast.vgrm_db)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ExperimentConfig {
        ExperimentConfig {
            devices: vec!["ci".to_string()],
            runs_per_condition: 2,
            seed: 99,
            ..Default::default()
        }
    }

    #[test]
    fn plan_covers_every_cell() {
        let app = App::new(ExperimentConfig::default()).unwrap();
        let plan = app.plan();
        assert_eq!(plan.len(), 2 * 2 * 2);
        assert_eq!(plan[0].0, 1);
        assert_eq!(plan[1].1.masker, MaskerRelation::DifferentGender);
    }

    #[test]
    fn simulation_is_reproducible() {
        let app = App::new(small_config()).unwrap();
        let a = app.simulate().unwrap();
        let b = app.simulate().unwrap();
        assert_eq!(a.runs, b.runs);
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.summary.conditions.len(), 2);
    }

    #[test]
    fn batch_width_does_not_change_results() {
        let app = App::new(small_config()).unwrap();
        let parallel = app.simulate().unwrap();
        for width in [1, 3] {
            let batched = app.simulate_in_batches(width).unwrap();
            assert_eq!(batched.runs, parallel.runs, "width {width}");
        }
    }

    /// Accepts writes, refuses the final flush
    struct FlushFails(Vec<u8>);

    impl Write for FlushFails {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("disk full"))
        }
    }

    #[test]
    fn summary_flush_failure_is_reported() {
        let summary = App::new(small_config()).unwrap().simulate().unwrap().summary;
        let err = write_summary_to(FlushFails(Vec::new()), &summary).unwrap_err();
        assert!(err.to_string().contains("disk full"));

        let mut out = Vec::new();
        write_summary_to(&mut out, &summary).unwrap();
        let parsed: ExperimentSummary = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.vgrm, summary.vgrm);
    }

    #[test]
    fn analyze_reproduces_simulated_summary() {
        let app = App::new(small_config()).unwrap();
        let simulation = app.simulate().unwrap();
        let dir = std::env::temp_dir().join(format!("hearex-app-{}", std::process::id()));
        app.write_outputs(&dir, &simulation).unwrap();

        let offline = app.analyze(&dir.join(TRIAL_LOG_FILE)).unwrap();
        assert_eq!(offline.conditions.len(), simulation.summary.conditions.len());
        for (live, rebuilt) in simulation.summary.conditions.iter().zip(&offline.conditions) {
            assert_eq!(live.key, rebuilt.key);
            assert_eq!(live.runs_used, rebuilt.runs_used);
            let (a, b) = (live.threshold.mean_db, rebuilt.threshold.mean_db);
            match (a, b) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9),
                (None, None) => {}
                other => panic!("threshold mismatch: {other:?}"),
            }
        }
        assert!(dir.join(SUMMARY_FILE).exists());
        let _ = fs::remove_dir_all(dir);
    }
}
