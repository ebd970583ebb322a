use crate::psychometric::PsychometricFunction;
use hearex_core::{
    CrmColor, CrmNumber, CrmToken, MaskerRelation, TalkerGender, TrialOutcome, TrialOutcomeSource,
    TrialSpec,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// Simulated listener parameters, per masker relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerProfile {
    pub same_gender_srt_db: f64,
    pub different_gender_srt_db: f64,
    pub slope_db: f64,
    pub lapse_rate: f64,
    pub reaction_time_range_s: (f64, f64),
    pub target_gender: TalkerGender,
}

impl Default for ListenerProfile {
    fn default() -> Self {
        Self {
            same_gender_srt_db: -3.0,
            different_gender_srt_db: -9.0,
            slope_db: 2.0,
            lapse_rate: 0.02,
            reaction_time_range_s: (0.8, 2.5),
            target_gender: TalkerGender::Male,
        }
    }
}

impl ListenerProfile {
    pub fn psychometric(&self, masker: MaskerRelation) -> PsychometricFunction {
        let srt = match masker {
            MaskerRelation::SameGender => self.same_gender_srt_db,
            MaskerRelation::DifferentGender => self.different_gender_srt_db,
        };
        PsychometricFunction::crm(srt, self.slope_db, self.lapse_rate)
    }
}

/// One simulated CRM presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmTrial {
    pub trial_index: usize,
    pub snr_db: f64,
    pub target: CrmToken,
    pub maskers: [CrmToken; 2],
    pub masker_gender: TalkerGender,
    pub response: CrmToken,
    pub reaction_time_s: f64,
}

/// Stands in for playback and the response screen.
///
/// Draws a target phrase and two masker phrases that share neither keyword
/// with it, decides from the psychometric function whether the listener
/// hears the target, and scores the reported colour/number pair.
pub struct SimulatedListener<R: Rng> {
    function: PsychometricFunction,
    masker_gender: TalkerGender,
    reaction_time_range_s: (f64, f64),
    rng: R,
    history: Vec<CrmTrial>,
}

impl<R: Rng> SimulatedListener<R> {
    pub fn new(profile: &ListenerProfile, masker: MaskerRelation, rng: R) -> Self {
        let (lo, hi) = profile.reaction_time_range_s;
        let lo = lo.max(0.0);
        let reaction_time_range_s = (lo, hi.max(lo));
        Self {
            function: profile.psychometric(masker),
            masker_gender: masker.masker_gender(profile.target_gender),
            reaction_time_range_s,
            rng,
            history: Vec::new(),
        }
    }

    pub fn function(&self) -> &PsychometricFunction {
        &self.function
    }

    pub fn history(&self) -> &[CrmTrial] {
        &self.history
    }

    fn random_token(&mut self) -> CrmToken {
        let color = CrmColor::ALL[self.rng.random_range(0..CrmColor::ALL.len())];
        let number = self.random_number(|_| true);
        CrmToken::new(color, number)
    }

    fn random_number(&mut self, allowed: impl Fn(u8) -> bool) -> CrmNumber {
        let choices: Vec<CrmNumber> = CrmNumber::all().filter(|n| allowed(n.get())).collect();
        choices[self.rng.random_range(0..choices.len())]
    }

    fn random_color(&mut self, allowed: impl Fn(CrmColor) -> bool) -> CrmColor {
        let choices: Vec<CrmColor> = CrmColor::ALL.into_iter().filter(|c| allowed(*c)).collect();
        choices[self.rng.random_range(0..choices.len())]
    }

    /// Two masker phrases, distinct from the target and from each other in both keywords
    fn masker_tokens(&mut self, target: CrmToken) -> [CrmToken; 2] {
        let first = CrmToken::new(
            self.random_color(|c| c != target.color),
            self.random_number(|n| n != target.number.get()),
        );
        let second = CrmToken::new(
            self.random_color(|c| c != target.color && c != first.color),
            self.random_number(|n| n != target.number.get() && n != first.number.get()),
        );
        [first, second]
    }

    /// Any token other than the target, uniformly
    fn wrong_response(&mut self, target: CrmToken) -> CrmToken {
        loop {
            let token = self.random_token();
            if !target.matches(&token) {
                return token;
            }
        }
    }

    fn reaction_time(&mut self) -> f64 {
        let (lo, hi) = self.reaction_time_range_s;
        if hi > lo { self.rng.random_range(lo..hi) } else { lo }
    }
}

impl<R: Rng> TrialOutcomeSource for SimulatedListener<R> {
    type Error = Infallible;

    fn present_trial(&mut self, spec: &TrialSpec) -> Result<TrialOutcome, Self::Error> {
        let target = self.random_token();
        let maskers = self.masker_tokens(target);
        let heard = self.rng.random::<f64>() < self.function.p_correct(spec.snr_db);
        let response = if heard { target } else { self.wrong_response(target) };
        let reaction_time_s = self.reaction_time();

        let is_correct = target.matches(&response);
        log::trace!(
            "trial {}: target {} response {} at {:.1} dB",
            spec.trial_index,
            target,
            response,
            spec.snr_db
        );
        self.history.push(CrmTrial {
            trial_index: spec.trial_index,
            snr_db: spec.snr_db,
            target,
            maskers,
            masker_gender: self.masker_gender,
            response,
            reaction_time_s,
        });
        Ok(TrialOutcome::new(is_correct, reaction_time_s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn spec(trial_index: usize, snr_db: f64) -> TrialSpec {
        TrialSpec {
            run_id: 0,
            trial_index,
            target_level_db: -15.0,
            masker_level_db: -15.0 - snr_db,
            snr_db,
        }
    }

    fn listener(seed: u64) -> SimulatedListener<StdRng> {
        SimulatedListener::new(
            &ListenerProfile::default(),
            MaskerRelation::SameGender,
            StdRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn maskers_never_share_keywords_with_target() {
        let mut l = listener(7);
        for i in 1..=200 {
            l.present_trial(&spec(i, 0.0)).unwrap();
        }
        for trial in l.history() {
            for masker in &trial.maskers {
                assert_ne!(masker.color, trial.target.color);
                assert_ne!(masker.number, trial.target.number);
            }
            assert_ne!(trial.maskers[0].color, trial.maskers[1].color);
        }
    }

    #[test]
    fn easy_snr_is_mostly_correct_and_hard_snr_mostly_wrong() {
        let mut l = listener(11);
        let easy = (1..=300)
            .filter(|&i| l.present_trial(&spec(i, 30.0)).unwrap().is_correct)
            .count();
        let hard = (301..=600)
            .filter(|&i| l.present_trial(&spec(i, -30.0)).unwrap().is_correct)
            .count();
        assert!(easy > 270, "easy: {easy}");
        assert!(hard < 30, "hard: {hard}");
    }

    #[test]
    fn same_seed_same_outcomes() {
        let mut a = listener(42);
        let mut b = listener(42);
        for i in 1..=50 {
            let snr = 10.0 - i as f64 * 0.5;
            assert_eq!(
                a.present_trial(&spec(i, snr)).unwrap(),
                b.present_trial(&spec(i, snr)).unwrap()
            );
        }
        assert_eq!(a.history(), b.history());
    }

    #[test]
    fn different_gender_maskers_get_lower_srt() {
        let profile = ListenerProfile::default();
        let same = profile.psychometric(MaskerRelation::SameGender);
        let diff = profile.psychometric(MaskerRelation::DifferentGender);
        assert!(diff.srt_db < same.srt_db);
        assert!(diff.p_correct(-6.0) > same.p_correct(-6.0));
    }

    #[test]
    fn reaction_times_fall_in_range() {
        let mut l = listener(3);
        for i in 1..=100 {
            let rt = l.present_trial(&spec(i, 0.0)).unwrap().reaction_time_s;
            assert!((0.8..2.5).contains(&rt));
        }
    }
}
