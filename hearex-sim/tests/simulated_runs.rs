//! Simulated listeners driven through the real staircase.

use hearex_core::MaskerRelation;
use hearex_sim::{ListenerProfile, SimulatedListener};
use hearex_staircase::{
    ConditionKey, MultiRunAggregator, RunSession, StaircaseConfig, StopReason, ThresholdConfig,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn run(
    run_id: usize,
    masker: MaskerRelation,
    profile: &ListenerProfile,
) -> hearex_staircase::RunSummary {
    let rng = StdRng::seed_from_u64(1000 + run_id as u64);
    let listener = SimulatedListener::new(profile, masker, rng);
    RunSession::new(
        run_id,
        ConditionKey::new("SIM", "aided", masker),
        StaircaseConfig::default(),
        ThresholdConfig::default(),
        listener,
    )
    .unwrap()
    .run()
    .unwrap()
}

#[test]
fn thresholds_track_the_simulated_srt() {
    let profile = ListenerProfile::default();
    let runs: Vec<_> = (0..40)
        .map(|i| run(i, MaskerRelation::ALL[i % 2], &profile))
        .collect();

    let converged = runs
        .iter()
        .filter(|r| r.stop_reason == StopReason::Converged)
        .count();
    assert!(converged >= 36, "only {converged} of 40 runs converged");

    let summary = runs.into_iter().collect::<MultiRunAggregator>().summarize();
    let contrast = summary.vgrm_for("SIM", "aided").unwrap();
    let same = contrast.same_srt_db.unwrap();
    let different = contrast.different_srt_db.unwrap();

    assert!((same - profile.same_gender_srt_db).abs() < 3.0, "same-gender SRT {same}");
    assert!(
        (different - profile.different_gender_srt_db).abs() < 3.0,
        "different-gender SRT {different}"
    );
    assert!(contrast.vgrm_db.unwrap() > 2.0);
}

#[test]
fn seeded_runs_are_reproducible() {
    let profile = ListenerProfile::default();
    let a = run(5, MaskerRelation::SameGender, &profile);
    let b = run(5, MaskerRelation::SameGender, &profile);
    assert_eq!(a, b);
}
